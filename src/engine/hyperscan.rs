// Hyperscan through its C API.
//
// Hyperscan has no "find the next match from here" call. A block scan
// reports every match it sees, in order of where each match ends, to a
// callback that may stop the scan. The adapter turns that into the single
// match primitive the scan loop expects: it scans the rest of the haystack
// and stops at the first reported match. Reported starts are the leftmost
// start for each end.

use std::{
    ffi::{CStr, CString},
    ptr,
};

use libc::{c_char, c_int, c_uint, c_ulonglong, c_void};

use crate::{
    engine::{Haystack, MatchResult, Matcher, Pattern, Span},
    error::{Error, MatchFailure},
};

/// A compiled Hyperscan database in block mode.
struct Database(*mut hs_database_t);

impl Database {
    fn new(
        label: &'static str,
        pattern: &Pattern,
    ) -> Result<Database, Error> {
        let expr = CString::new(pattern.as_bytes()).map_err(|err| {
            Error::compile(
                label,
                Some(err.nul_position()),
                "pattern contains a NUL byte",
            )
        })?;
        let flags = pattern.flags();
        let mut options = HS_FLAG_ALLOWEMPTY | HS_FLAG_SOM_LEFTMOST;
        if flags.case_insensitive {
            options |= HS_FLAG_CASELESS;
        }
        if flags.dot_all {
            options |= HS_FLAG_DOTALL;
        }
        if flags.multi_line {
            options |= HS_FLAG_MULTILINE;
        }
        let mut db = ptr::null_mut();
        let mut compile_err = ptr::null_mut();
        // SAFETY: The expression is NUL terminated and outlives the call. A
        // null platform selects the current host. Both out-parameters point
        // to valid locals.
        let rc = unsafe {
            hs_compile(
                expr.as_ptr(),
                options,
                HS_MODE_BLOCK,
                ptr::null(),
                &mut db,
                &mut compile_err,
            )
        };
        if rc == HS_SUCCESS {
            return Ok(Database(db));
        }
        if compile_err.is_null() {
            return Err(Error::compile(label, None, error_message(rc)));
        }
        // SAFETY: On failure Hyperscan hands us an error we must free, whose
        // message is a valid C string until then.
        let msg = unsafe {
            let msg = CStr::from_ptr((*compile_err).message)
                .to_string_lossy()
                .into_owned();
            hs_free_compile_error(compile_err);
            msg
        };
        Err(Error::compile(label, None, msg))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // SAFETY: We own the database and it is freed exactly once.
        unsafe {
            hs_free_database(self.0);
        }
    }
}

/// Scratch space for scanning with one database.
struct Scratch(*mut hs_scratch_t);

impl Scratch {
    fn new(label: &'static str, db: &Database) -> Result<Scratch, Error> {
        let mut scratch = ptr::null_mut();
        // SAFETY: 'db' is a valid database and 'scratch' starts out null, so
        // Hyperscan allocates fresh scratch space.
        let rc = unsafe { hs_alloc_scratch(db.0, &mut scratch) };
        if rc != HS_SUCCESS {
            let msg = error_message(rc);
            let msg = format!("cannot allocate scratch space: {msg}");
            return Err(Error::compile(label, None, msg));
        }
        Ok(Scratch(scratch))
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        // SAFETY: We own the scratch space and it is freed exactly once.
        unsafe {
            hs_free_scratch(self.0);
        }
    }
}

fn error_message(rc: hs_error_t) -> String {
    let name = match rc {
        HS_INVALID => "invalid parameter",
        HS_NOMEM => "memory allocation failed",
        HS_COMPILER_ERROR => "pattern compilation failed",
        HS_DB_PLATFORM_ERROR => "database is not supported on this platform",
        HS_BAD_ALIGN => "parameter is not correctly aligned",
        HS_BAD_ALLOC => "allocator returned misaligned memory",
        HS_SCRATCH_IN_USE => "scratch space is already in use",
        HS_ARCH_ERROR => "unsupported CPU architecture",
        _ => "unknown error",
    };
    format!("{name} ({rc})")
}

/// Hyperscan's block mode scanner.
pub struct Hyperscan {
    // Field order is drop order.
    scratch: Scratch,
    db: Database,
}

impl Hyperscan {
    const LABEL: &'static str = "Hyperscan";

    pub fn new(pattern: &Pattern) -> Result<Hyperscan, Error> {
        let db = Database::new(Hyperscan::LABEL, pattern)?;
        let scratch = Scratch::new(Hyperscan::LABEL, &db)?;
        Ok(Hyperscan { scratch, db })
    }

    /// Scans `bytes` and calls `on_match` with the offsets of every match,
    /// relative to the start of `bytes`, until it returns `false`.
    fn scan<F>(
        &mut self,
        bytes: &[u8],
        on_match: F,
    ) -> Result<(), MatchFailure>
    where
        F: FnMut(usize, usize) -> bool,
    {
        unsafe extern "C" fn trampoline<F>(
            _id: c_uint,
            from: c_ulonglong,
            to: c_ulonglong,
            _flags: c_uint,
            ctx: *mut c_void,
        ) -> c_int
        where
            F: FnMut(usize, usize) -> bool,
        {
            // SAFETY: 'ctx' is the closure passed to 'hs_scan' below, which
            // is alive and exclusively borrowed for the whole scan.
            let on_match = unsafe { &mut *ctx.cast::<F>() };
            // Offsets are bounded by the scanned length, which fits in a
            // c_uint.
            let keep_going = on_match(from as usize, to as usize);
            if keep_going {
                0
            } else {
                1
            }
        }

        let len = match c_uint::try_from(bytes.len()) {
            Ok(len) => len,
            Err(_) => {
                return Err(MatchFailure::new(
                    "haystack is too long for a single Hyperscan scan",
                ));
            }
        };
        let mut on_match = on_match;
        // SAFETY: The data pointer and length describe a live slice. The
        // scratch space belongs to this database and is not in use, since
        // scanning requires '&mut self'. The context is the closure that
        // 'trampoline::<F>' expects.
        let rc = unsafe {
            hs_scan(
                self.db.0,
                bytes.as_ptr().cast::<c_char>(),
                len,
                0,
                self.scratch.0,
                Some(trampoline::<F> as match_event_handler),
                (&mut on_match as *mut F).cast::<c_void>(),
            )
        };
        match rc {
            HS_SUCCESS | HS_SCAN_TERMINATED => Ok(()),
            rc => Err(MatchFailure::with_code(rc, error_message(rc))),
        }
    }
}

impl Matcher for Hyperscan {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let rest = &haystack.as_bytes()[start..];
        let mut first = None;
        let scanned = self.scan(rest, |from, to| {
            first = Some(Span::from(start + from..start + to));
            false
        });
        match (scanned, first) {
            (Err(failure), _) => MatchResult::Error(failure),
            (Ok(()), None) => MatchResult::NoMatch,
            (Ok(()), Some(span)) => MatchResult::Matched(span),
        }
    }
}

// Hyperscan FFI. Only the parts used above are declared. The library is
// found by the build script.

#[allow(non_camel_case_types)]
type hs_error_t = c_int;
#[allow(non_camel_case_types)]
type hs_database_t = c_void;
#[allow(non_camel_case_types)]
type hs_scratch_t = c_void;
#[allow(non_camel_case_types)]
type hs_platform_info_t = c_void;
#[allow(non_camel_case_types)]
type match_event_handler = unsafe extern "C" fn(
    id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
    flags: c_uint,
    context: *mut c_void,
) -> c_int;

#[allow(non_camel_case_types)]
#[repr(C)]
struct hs_compile_error_t {
    message: *mut c_char,
    _expression: c_int,
}

const HS_FLAG_CASELESS: c_uint = 1;
const HS_FLAG_DOTALL: c_uint = 2;
const HS_FLAG_MULTILINE: c_uint = 4;
const HS_FLAG_ALLOWEMPTY: c_uint = 16;
const HS_FLAG_SOM_LEFTMOST: c_uint = 256;
const HS_MODE_BLOCK: c_uint = 1;

const HS_SUCCESS: hs_error_t = 0;
const HS_INVALID: hs_error_t = -1;
const HS_NOMEM: hs_error_t = -2;
const HS_SCAN_TERMINATED: hs_error_t = -3;
const HS_COMPILER_ERROR: hs_error_t = -4;
const HS_DB_PLATFORM_ERROR: hs_error_t = -6;
const HS_BAD_ALIGN: hs_error_t = -8;
const HS_BAD_ALLOC: hs_error_t = -9;
const HS_SCRATCH_IN_USE: hs_error_t = -10;
const HS_ARCH_ERROR: hs_error_t = -11;

extern "C" {
    fn hs_compile(
        expression: *const c_char,
        flags: c_uint,
        mode: c_uint,
        platform: *const hs_platform_info_t,
        db: *mut *mut hs_database_t,
        error: *mut *mut hs_compile_error_t,
    ) -> hs_error_t;

    fn hs_free_compile_error(error: *mut hs_compile_error_t) -> hs_error_t;

    fn hs_free_database(db: *mut hs_database_t) -> hs_error_t;

    fn hs_alloc_scratch(
        db: *const hs_database_t,
        scratch: *mut *mut hs_scratch_t,
    ) -> hs_error_t;

    fn hs_free_scratch(scratch: *mut hs_scratch_t) -> hs_error_t;

    fn hs_scan(
        db: *const hs_database_t,
        data: *const c_char,
        length: c_uint,
        flags: c_uint,
        scratch: *mut hs_scratch_t,
        on_event: Option<match_event_handler>,
        context: *mut c_void,
    ) -> hs_error_t;
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::{Flags, Variant},
        search::{self, Termination},
    };

    use super::*;

    fn pattern(pat: &[u8], case_insensitive: bool) -> Pattern {
        Pattern::new(pat, Flags { case_insensitive, ..Flags::default() })
    }

    fn matched(range: std::ops::Range<usize>) -> MatchResult {
        MatchResult::Matched(Span::from(range))
    }

    /// Counts matches with a single native scan that reports every match,
    /// skipping the ones that overlap an earlier accepted match.
    fn native_count(m: &mut Hyperscan, hay: &[u8]) -> u64 {
        let (mut count, mut cursor) = (0, 0);
        m.scan(hay, |from, to| {
            if from >= cursor {
                count += 1;
                cursor = to;
            }
            true
        })
        .unwrap();
        count
    }

    #[test]
    fn first_match_from_offset() {
        let mut m = Hyperscan::new(&pattern(b"ab+", true)).unwrap();
        let haystack = Haystack::new(b"AB ab abb");
        // Matches are reported as soon as they end, so the shortest one at
        // each position comes first.
        assert_eq!(matched(0..2), m.execute(&haystack, 0));
        assert_eq!(matched(3..5), m.execute(&haystack, 2));
        assert_eq!(matched(6..8), m.execute(&haystack, 5));
        assert_eq!(MatchResult::NoMatch, m.execute(&haystack, 9));
        assert_eq!(None, m.captures());
    }

    #[test]
    fn scan_loop_agrees_with_native_scan() {
        let cases: &[(&[u8], &[u8])] = &[
            (b"foo", b"foo bar foo foofoo"),
            (b"[a-z]{3}", b"abc-defg hij"),
            (b"x", b"no match here"),
        ];
        for &(pat, hay) in cases {
            let mut m = Hyperscan::new(&pattern(pat, false)).unwrap();
            let want = native_count(&mut m, hay);
            let got = search::scan(&mut m, &Haystack::new(hay), true).unwrap();
            assert_eq!(want, got.matches, "{:?}", pattern(pat, false));
        }
    }

    #[test]
    fn global_scan_over_variant() {
        let pat = pattern(b"foo", false);
        let mut m = Variant::Hyperscan.compile(&pat).unwrap();
        let hay = Haystack::new(b"foo foo");
        let got = search::scan(&mut m, &hay, true).unwrap();
        assert_eq!(2, got.matches);
        assert_eq!(Some(Span::from(4..7)), got.last);
        assert_eq!(Termination::Exhausted, got.termination);
    }

    #[test]
    fn compile_errors() {
        let err = Hyperscan::new(&pattern(b"a(", false)).err().unwrap();
        assert!(err.is_compile());
        let err = Hyperscan::new(&pattern(b"a\0b", false)).err().unwrap();
        assert!(err.to_string().contains("pos 1"), "{err}");
    }
}
