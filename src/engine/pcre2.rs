// PCRE2 through its C API. The safe wrappers below each own exactly one
// PCRE2 allocation and free it on drop, so every early return while setting
// up a variant releases what was already acquired.

use std::ptr;

use libc::{c_int, c_void};

use crate::{
    engine::{Haystack, MatchResult, Matcher, Pattern, Span},
    error::{Error, MatchFailure},
};

/// The number of alternative matches the DFA matcher can report.
const DFA_OVECTOR_PAIRS: u32 = 32;
/// The number of ints in the DFA matcher's workspace.
const DFA_WORKSPACE_LEN: usize = 4096;
const JIT_STACK_START: usize = 32 * (1 << 10);
const JIT_STACK_MAX: usize = 1 << 20;
/// The offset PCRE2 writes for a group that did not participate.
const UNSET: usize = usize::MAX;

/// Returns PCRE2's message for the given error code.
fn error_message(code: c_int) -> String {
    let mut buf = [0u8; 256];
    // SAFETY: The buffer is valid for writes of 'buf.len()' bytes.
    let len = unsafe {
        pcre2_get_error_message_8(code, buf.as_mut_ptr(), buf.len())
    };
    match usize::try_from(len) {
        Ok(len) => String::from_utf8_lossy(&buf[..len]).into_owned(),
        Err(_) => format!("unknown PCRE2 error code {code}"),
    }
}

/// A compiled PCRE2 pattern.
struct Code(*mut code);

impl Code {
    fn new(label: &'static str, pattern: &Pattern) -> Result<Code, Error> {
        let flags = pattern.flags();
        let mut options = 0;
        if flags.case_insensitive {
            options |= PCRE2_CASELESS;
        }
        if flags.dot_all {
            options |= PCRE2_DOTALL;
        }
        if flags.multi_line {
            options |= PCRE2_MULTILINE;
        }
        let bytes = pattern.as_bytes();
        let (mut error_code, mut error_offset): (c_int, usize) = (0, 0);
        // SAFETY: The pattern pointer and length come from a live slice, and
        // the error out-parameters point to valid locals. A null compile
        // context selects the defaults.
        let code = unsafe {
            pcre2_compile_8(
                bytes.as_ptr(),
                bytes.len(),
                options,
                &mut error_code,
                &mut error_offset,
                ptr::null_mut(),
            )
        };
        if code.is_null() {
            return Err(Error::compile(
                label,
                Some(error_offset),
                format!("{} ({})", error_message(error_code), error_code),
            ));
        }
        Ok(Code(code))
    }

    fn jit_compile(&self, label: &'static str) -> Result<(), Error> {
        // SAFETY: 'self.0' is a valid compiled pattern.
        let rc = unsafe { pcre2_jit_compile_8(self.0, PCRE2_JIT_COMPLETE) };
        if rc != 0 {
            return Err(Error::compile(
                label,
                None,
                format!(
                    "JIT compilation failed: {} ({})",
                    error_message(rc),
                    rc,
                ),
            ));
        }
        Ok(())
    }
}

impl Drop for Code {
    fn drop(&mut self) {
        // SAFETY: We own the pattern and it is freed exactly once.
        unsafe { pcre2_code_free_8(self.0) }
    }
}

/// Match data holding the ovector that PCRE2 writes offsets into.
struct MatchData(*mut match_data);

impl MatchData {
    fn from_pattern(
        label: &'static str,
        code: &Code,
    ) -> Result<MatchData, Error> {
        // SAFETY: 'code' is a valid compiled pattern.
        let md = unsafe {
            pcre2_match_data_create_from_pattern_8(code.0, ptr::null_mut())
        };
        MatchData::checked(label, md)
    }

    fn with_pairs(
        label: &'static str,
        pairs: u32,
    ) -> Result<MatchData, Error> {
        // SAFETY: A null general context selects the default allocator.
        let md = unsafe { pcre2_match_data_create_8(pairs, ptr::null_mut()) };
        MatchData::checked(label, md)
    }

    fn checked(
        label: &'static str,
        md: *mut match_data,
    ) -> Result<MatchData, Error> {
        if md.is_null() {
            let msg = "cannot allocate match data";
            return Err(Error::compile(label, None, msg));
        }
        Ok(MatchData(md))
    }

    /// Returns the first `pairs` offset pairs of the ovector.
    fn ovector(&self, pairs: usize) -> &[usize] {
        // SAFETY: The ovector lives as long as the match data and has
        // 'pcre2_get_ovector_count_8' pairs, which bounds 'pairs'.
        unsafe {
            let count = pcre2_get_ovector_count_8(self.0) as usize;
            let ptr = pcre2_get_ovector_pointer_8(self.0);
            std::slice::from_raw_parts(ptr, 2 * pairs.min(count))
        }
    }
}

impl Drop for MatchData {
    fn drop(&mut self) {
        // SAFETY: We own the match data and it is freed exactly once.
        unsafe { pcre2_match_data_free_8(self.0) }
    }
}

struct MatchContext(*mut match_context);

impl MatchContext {
    fn new(label: &'static str) -> Result<MatchContext, Error> {
        // SAFETY: A null general context selects the default allocator.
        let ctx = unsafe { pcre2_match_context_create_8(ptr::null_mut()) };
        if ctx.is_null() {
            return Err(Error::compile(
                label,
                None,
                "cannot allocate match context",
            ));
        }
        Ok(MatchContext(ctx))
    }
}

impl Drop for MatchContext {
    fn drop(&mut self) {
        // SAFETY: We own the context and it is freed exactly once.
        unsafe { pcre2_match_context_free_8(self.0) }
    }
}

struct JitStack(*mut jit_stack);

impl JitStack {
    fn new(label: &'static str) -> Result<JitStack, Error> {
        // SAFETY: A null general context selects the default allocator.
        let stack = unsafe {
            pcre2_jit_stack_create_8(
                JIT_STACK_START,
                JIT_STACK_MAX,
                ptr::null_mut(),
            )
        };
        if stack.is_null() {
            let msg = "cannot allocate JIT stack";
            return Err(Error::compile(label, None, msg));
        }
        Ok(JitStack(stack))
    }
}

impl Drop for JitStack {
    fn drop(&mut self) {
        // SAFETY: We own the stack and it is freed exactly once.
        unsafe { pcre2_jit_stack_free_8(self.0) }
    }
}

/// Converts a PCRE2 result code into a match result, copying the groups of
/// a successful match into `last`.
///
/// A code of zero means the ovector was too small to hold every group. That
/// is always a failure, regardless of which matching function produced it.
fn result(
    rc: c_int,
    md: &MatchData,
    last: &mut Vec<Option<Span>>,
) -> MatchResult {
    if rc == PCRE2_ERROR_NOMATCH {
        return MatchResult::NoMatch;
    }
    if rc == 0 {
        return MatchResult::Error(MatchFailure::with_code(
            0,
            "capture size too small",
        ));
    }
    if rc < 0 {
        return MatchResult::Error(MatchFailure::with_code(
            rc,
            error_message(rc),
        ));
    }
    let ovector = md.ovector(rc as usize);
    last.clear();
    last.extend(ovector.chunks_exact(2).map(|pair| {
        if pair[0] == UNSET {
            None
        } else {
            Some(Span::from(pair[0]..pair[1]))
        }
    }));
    match last.first() {
        Some(&Some(span)) => MatchResult::Matched(span),
        _ => MatchResult::Error(MatchFailure::with_code(
            rc,
            "match reported without an overall span",
        )),
    }
}

fn captures(last: &[Option<Span>]) -> Option<&[Option<Span>]> {
    if last.is_empty() {
        None
    } else {
        Some(last)
    }
}

/// PCRE2's backtracking interpreter.
pub struct Interp {
    // Field order is drop order: the match data and context go before the
    // pattern they were created for.
    md: MatchData,
    ctx: MatchContext,
    code: Code,
    last: Vec<Option<Span>>,
}

impl Interp {
    const LABEL: &'static str = "PCRE2 interp";

    pub fn new(pattern: &Pattern) -> Result<Interp, Error> {
        let code = Code::new(Interp::LABEL, pattern)?;
        let md = MatchData::from_pattern(Interp::LABEL, &code)?;
        let ctx = MatchContext::new(Interp::LABEL)?;
        Ok(Interp { md, ctx, code, last: vec![] })
    }
}

impl Matcher for Interp {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let hay = haystack.as_bytes();
        // SAFETY: All pointers are owned by 'self' or borrowed from the
        // haystack for the duration of the call, and 'start <= hay.len()'.
        let rc = unsafe {
            pcre2_match_8(
                self.code.0,
                hay.as_ptr(),
                hay.len(),
                start,
                0,
                self.md.0,
                self.ctx.0,
            )
        };
        result(rc, &self.md, &mut self.last)
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        captures(&self.last)
    }
}

/// PCRE2's JIT compiled matcher, run through the fast path that skips
/// argument checks.
pub struct Jit {
    md: MatchData,
    ctx: MatchContext,
    // The stack must outlive the context it is assigned to.
    _stack: JitStack,
    code: Code,
    last: Vec<Option<Span>>,
}

impl Jit {
    const LABEL: &'static str = "PCRE2 JIT";

    pub fn new(pattern: &Pattern) -> Result<Jit, Error> {
        let code = Code::new(Jit::LABEL, pattern)?;
        code.jit_compile(Jit::LABEL)?;
        let md = MatchData::from_pattern(Jit::LABEL, &code)?;
        let ctx = MatchContext::new(Jit::LABEL)?;
        let stack = JitStack::new(Jit::LABEL)?;
        // SAFETY: With a null callback, PCRE2 uses the callback data as the
        // JIT stack. Both the context and the stack are valid, and the stack
        // is dropped after the context.
        unsafe {
            pcre2_jit_stack_assign_8(ctx.0, None, stack.0.cast());
        }
        Ok(Jit { md, ctx, _stack: stack, code, last: vec![] })
    }
}

impl Matcher for Jit {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let hay = haystack.as_bytes();
        // SAFETY: Same as for the interpreter. The pattern was successfully
        // JIT compiled in the constructor.
        let rc = unsafe {
            pcre2_jit_match_8(
                self.code.0,
                hay.as_ptr(),
                hay.len(),
                start,
                0,
                self.md.0,
                self.ctx.0,
            )
        };
        result(rc, &self.md, &mut self.last)
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        captures(&self.last)
    }
}

/// PCRE2's alternative DFA matcher. It finds every match length at the
/// leftmost starting position, longest first, and does not support
/// capture groups. Each reported "group" is one of those alternative
/// matches.
pub struct Dfa {
    md: MatchData,
    ctx: MatchContext,
    code: Code,
    workspace: Vec<c_int>,
    last: Vec<Option<Span>>,
}

impl Dfa {
    const LABEL: &'static str = "PCRE2 DFA";

    pub fn new(pattern: &Pattern) -> Result<Dfa, Error> {
        let code = Code::new(Dfa::LABEL, pattern)?;
        let md = MatchData::with_pairs(Dfa::LABEL, DFA_OVECTOR_PAIRS)?;
        let ctx = MatchContext::new(Dfa::LABEL)?;
        let workspace = vec![0; DFA_WORKSPACE_LEN];
        Ok(Dfa { md, ctx, code, workspace, last: vec![] })
    }
}

impl Matcher for Dfa {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let hay = haystack.as_bytes();
        // SAFETY: Same as for the interpreter, plus the workspace pointer
        // and length describe a live, exclusively borrowed buffer.
        let rc = unsafe {
            pcre2_dfa_match_8(
                self.code.0,
                hay.as_ptr(),
                hay.len(),
                start,
                0,
                self.md.0,
                self.ctx.0,
                self.workspace.as_mut_ptr(),
                self.workspace.len(),
            )
        };
        result(rc, &self.md, &mut self.last)
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        captures(&self.last)
    }
}

// PCRE2 FFI. Only the parts used above are declared. The library is found
// by the build script.

const PCRE2_CASELESS: u32 = 0x00000008;
const PCRE2_DOTALL: u32 = 0x00000020;
const PCRE2_MULTILINE: u32 = 0x00000400;
const PCRE2_JIT_COMPLETE: u32 = 0x00000001;
const PCRE2_ERROR_NOMATCH: c_int = -1;

#[allow(non_camel_case_types)]
type code = c_void;
#[allow(non_camel_case_types)]
type match_data = c_void;
#[allow(non_camel_case_types)]
type match_context = c_void;
#[allow(non_camel_case_types)]
type jit_stack = c_void;
#[allow(non_camel_case_types)]
type compile_context = c_void;
#[allow(non_camel_case_types)]
type general_context = c_void;
#[allow(non_camel_case_types)]
type jit_callback = extern "C" fn(*mut c_void) -> *mut jit_stack;

extern "C" {
    fn pcre2_compile_8(
        pattern: *const u8,
        len: usize,
        options: u32,
        error_code: *mut c_int,
        error_offset: *mut usize,
        context: *mut compile_context,
    ) -> *mut code;

    fn pcre2_code_free_8(code: *mut code);

    fn pcre2_jit_compile_8(code: *mut code, options: u32) -> c_int;

    fn pcre2_match_data_create_8(
        ovector_pairs: u32,
        context: *mut general_context,
    ) -> *mut match_data;

    fn pcre2_match_data_create_from_pattern_8(
        code: *const code,
        context: *mut general_context,
    ) -> *mut match_data;

    fn pcre2_match_data_free_8(match_data: *mut match_data);

    fn pcre2_get_ovector_count_8(match_data: *mut match_data) -> u32;

    fn pcre2_get_ovector_pointer_8(match_data: *mut match_data) -> *mut usize;

    fn pcre2_match_context_create_8(
        context: *mut general_context,
    ) -> *mut match_context;

    fn pcre2_match_context_free_8(context: *mut match_context);

    fn pcre2_jit_stack_create_8(
        start_size: usize,
        max_size: usize,
        context: *mut general_context,
    ) -> *mut jit_stack;

    fn pcre2_jit_stack_assign_8(
        context: *mut match_context,
        callback: Option<jit_callback>,
        data: *mut c_void,
    );

    fn pcre2_jit_stack_free_8(stack: *mut jit_stack);

    fn pcre2_match_8(
        code: *const code,
        subject: *const u8,
        length: usize,
        start_offset: usize,
        options: u32,
        match_data: *mut match_data,
        context: *mut match_context,
    ) -> c_int;

    fn pcre2_jit_match_8(
        code: *const code,
        subject: *const u8,
        length: usize,
        start_offset: usize,
        options: u32,
        match_data: *mut match_data,
        context: *mut match_context,
    ) -> c_int;

    fn pcre2_dfa_match_8(
        code: *const code,
        subject: *const u8,
        length: usize,
        start_offset: usize,
        options: u32,
        match_data: *mut match_data,
        context: *mut match_context,
        workspace: *mut c_int,
        workspace_len: usize,
    ) -> c_int;

    fn pcre2_get_error_message_8(
        error_code: c_int,
        buf: *mut u8,
        buf_len: usize,
    ) -> c_int;
}

#[cfg(test)]
mod tests {
    use crate::engine::{Flags, Variant};

    use super::*;

    const VARIANTS: &[Variant] =
        &[Variant::Pcre2Interp, Variant::Pcre2Jit, Variant::Pcre2Dfa];

    fn pattern(pat: &[u8], case_insensitive: bool) -> Pattern {
        Pattern::new(pat, Flags { case_insensitive, ..Flags::default() })
    }

    #[test]
    fn finds_from_offset_with_absolute_spans() {
        let pat = pattern(b"ab+", true);
        let haystack = Haystack::new(b"AB ab abb");
        for &variant in VARIANTS {
            let mut m = variant.compile(&pat).unwrap();
            assert_eq!(
                MatchResult::Matched(Span::from(0..2)),
                m.execute(&haystack, 0),
                "{}",
                variant.label(),
            );
            assert_eq!(
                MatchResult::Matched(Span::from(6..9)),
                m.execute(&haystack, 5),
                "{}",
                variant.label(),
            );
            assert_eq!(
                MatchResult::NoMatch,
                m.execute(&haystack, 9),
                "{}",
                variant.label(),
            );
        }
    }

    #[test]
    fn interp_and_jit_report_groups() {
        let pat = pattern(b"(a)(x)?(b+)", false);
        let haystack = Haystack::new(b"zabb");
        let want = vec![
            Some(Span::from(1..4)),
            Some(Span::from(1..2)),
            None,
            Some(Span::from(2..4)),
        ];
        for &variant in &[Variant::Pcre2Interp, Variant::Pcre2Jit] {
            let mut m = variant.compile(&pat).unwrap();
            m.execute(&haystack, 0);
            assert_eq!(Some(&*want), m.captures(), "{}", variant.label());
        }
    }

    #[test]
    fn dfa_reports_alternative_lengths() {
        let pat = pattern(b"ab+", false);
        let mut m = Variant::Pcre2Dfa.compile(&pat).unwrap();
        let got = m.execute(&Haystack::new(b"abbb"), 0);
        assert_eq!(MatchResult::Matched(Span::from(0..4)), got);
        let alternatives = m.captures().unwrap();
        assert_eq!(3, alternatives.len());
        assert_eq!(Some(Span::from(0..2)), alternatives[2]);
    }

    #[test]
    fn dfa_overflowing_ovector_is_an_error() {
        let pat = pattern(b"a+", false);
        let mut m = Variant::Pcre2Dfa.compile(&pat).unwrap();
        let hay = "a".repeat(DFA_OVECTOR_PAIRS as usize + 1);
        match m.execute(&Haystack::new(hay.as_bytes()), 0) {
            MatchResult::Error(failure) => assert_eq!(Some(0), failure.code()),
            got => panic!("expected error, got {got:?}"),
        }
    }

    #[test]
    fn compile_error_has_offset() {
        let pat = pattern(b"ab(c", false);
        for &variant in VARIANTS {
            let err = variant.compile(&pat).err().unwrap();
            assert!(err.is_compile(), "{}", variant.label());
            assert!(err.to_string().contains("pos 4"), "{err}");
        }
    }

    #[test]
    fn non_utf8_bytes_are_fine() {
        let pat = pattern(b"\xFF+", false);
        let mut m = Variant::Pcre2Interp.compile(&pat).unwrap();
        let got = m.execute(&Haystack::new(b"a\xFF\xFFb"), 0);
        assert_eq!(MatchResult::Matched(Span::from(1..3)), got);
    }
}
