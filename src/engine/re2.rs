// RE2 through the small C API in re2.cpp, which the build script compiles
// and links against the system's RE2.

use libc::{c_char, c_void};

use crate::{
    engine::{Haystack, MatchResult, Matcher, Pattern, Span},
    error::{Error, MatchFailure},
};

/// RE2's leftmost-first matcher. RE2 has no option for multi-line mode, so
/// every flag is given as an inline group in front of the pattern.
pub struct Re2 {
    re: *mut re2_regexp,
    /// Written by every successful search.
    spans: Vec<re2_span>,
    last: Vec<Option<Span>>,
}

impl Re2 {
    const LABEL: &'static str = "RE2";

    pub fn new(pattern: &Pattern) -> Result<Re2, Error> {
        let mut full = pattern.inline_flags().into_bytes();
        full.extend_from_slice(pattern.as_bytes());
        // SAFETY: The pattern is only read during the call.
        let re = unsafe { re2_regexp_new(re2_string::from(&*full)) };
        if re.is_null() {
            return Err(Error::compile(
                Re2::LABEL,
                None,
                "cannot allocate regexp",
            ));
        }
        // From here on, dropping 're2' frees the regexp.
        let mut re2 = Re2 { re, spans: vec![], last: vec![] };
        // SAFETY: 're2.re' is a valid regexp. Its error message lives as
        // long as the regexp, and is copied out before it is freed.
        unsafe {
            if !re2_regexp_ok(re2.re) {
                let err = re2_regexp_error(re2.re);
                let msg = String::from_utf8_lossy(err.as_bytes()).into_owned();
                return Err(Error::compile(Re2::LABEL, None, msg));
            }
            let groups = re2_regexp_groups(re2.re);
            re2.spans = vec![re2_span { start: -1, end: -1 }; groups];
        }
        Ok(re2)
    }
}

impl Drop for Re2 {
    fn drop(&mut self) {
        // SAFETY: We own the regexp and it is freed exactly once.
        unsafe { re2_regexp_free(self.re) }
    }
}

impl Matcher for Re2 {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        // SAFETY: The haystack is only read during the call, and 'spans' has
        // room for every group of the regexp.
        let matched = unsafe {
            re2_regexp_find(
                self.re,
                re2_string::from(haystack.as_bytes()),
                start,
                self.spans.as_mut_ptr(),
            )
        };
        if !matched {
            return MatchResult::NoMatch;
        }
        self.last.clear();
        self.last.extend(self.spans.iter().map(|span| {
            match (usize::try_from(span.start), usize::try_from(span.end)) {
                (Ok(start), Ok(end)) => Some(Span::from(start..end)),
                _ => None,
            }
        }));
        match self.last.first() {
            Some(&Some(span)) => MatchResult::Matched(span),
            _ => MatchResult::Error(MatchFailure::new(
                "match reported without an overall span",
            )),
        }
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        if self.last.is_empty() {
            None
        } else {
            Some(&self.last)
        }
    }
}

// RE2 FFI, matching the declarations in re2.cpp.

#[allow(non_camel_case_types)]
type re2_regexp = c_void;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy)]
#[repr(C)]
struct re2_string {
    text: *const c_char,
    len: usize,
}

impl re2_string {
    /// # Safety
    ///
    /// The string must still point into live memory.
    unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: Upheld by the caller.
        unsafe { std::slice::from_raw_parts(self.text.cast::<u8>(), self.len) }
    }
}

impl<'a> From<&'a [u8]> for re2_string {
    fn from(bytes: &'a [u8]) -> re2_string {
        re2_string { text: bytes.as_ptr().cast::<c_char>(), len: bytes.len() }
    }
}

#[allow(non_camel_case_types)]
#[derive(Clone, Copy)]
#[repr(C)]
struct re2_span {
    start: isize,
    end: isize,
}

extern "C" {
    fn re2_regexp_new(pat: re2_string) -> *mut re2_regexp;
    fn re2_regexp_free(re: *mut re2_regexp);
    fn re2_regexp_ok(re: *const re2_regexp) -> bool;
    fn re2_regexp_error(re: *const re2_regexp) -> re2_string;
    fn re2_regexp_groups(re: *const re2_regexp) -> usize;
    fn re2_regexp_find(
        re: *mut re2_regexp,
        text: re2_string,
        startpos: usize,
        spans: *mut re2_span,
    ) -> bool;
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::{Flags, Variant},
        search,
    };

    use super::*;

    fn pattern(pat: &[u8], case_insensitive: bool) -> Pattern {
        Pattern::new(pat, Flags { case_insensitive, ..Flags::default() })
    }

    fn matched(range: std::ops::Range<usize>) -> MatchResult {
        MatchResult::Matched(Span::from(range))
    }

    #[test]
    fn leftmost_first_from_offset() {
        let mut m = Variant::Re2.compile(&pattern(b"ab+", true)).unwrap();
        let haystack = Haystack::new(b"AB ab abb");
        assert_eq!(matched(0..2), m.execute(&haystack, 0));
        assert_eq!(matched(3..5), m.execute(&haystack, 2));
        assert_eq!(matched(6..9), m.execute(&haystack, 5));
        assert_eq!(MatchResult::NoMatch, m.execute(&haystack, 9));
    }

    #[test]
    fn groups_of_last_match() {
        let mut m = Re2::new(&pattern(b"(a)(x)?(b+)", false)).unwrap();
        assert_eq!(None, m.captures());
        assert_eq!(matched(1..4), m.execute(&Haystack::new(b"zabb"), 0));
        let want = vec![
            Some(Span::from(1..4)),
            Some(Span::from(1..2)),
            None,
            Some(Span::from(2..4)),
        ];
        assert_eq!(Some(&*want), m.captures());
    }

    #[test]
    fn word_boundary_sees_bytes_before_start() {
        let mut m = Re2::new(&pattern(br"\bb", false)).unwrap();
        let haystack = Haystack::new(b"ab b");
        assert_eq!(matched(3..4), m.execute(&haystack, 1));
    }

    #[test]
    fn scenario_scan() {
        let pat = pattern(b"ab+", true);
        let mut m = Variant::Re2.compile(&pat).unwrap();
        let hay = Haystack::new(b"AB ab abb");
        let got = search::scan(&mut m, &hay, true).unwrap();
        assert_eq!(3, got.matches);
        assert_eq!(Some(Span::from(6..9)), got.last);
    }

    #[test]
    fn compile_error() {
        let err = Re2::new(&pattern(b"a(", false)).err().unwrap();
        assert!(err.is_compile());
        assert_eq!(2, err.exit_code());
        assert!(err.to_string().starts_with("[error] RE2: "), "{err}");
    }
}
