use regex_automata::{
    dfa, hybrid, meta,
    nfa::thompson::{backtrack, pikevm},
    util::{captures::Captures, syntax},
    Input, Match, MatchError, Span,
};

use crate::{
    engine::{text, Haystack, MatchResult, Matcher, Pattern},
    error::{Error, MatchFailure},
};

/// Translates our flags into a syntax configuration shared by every
/// regex-automata engine.
fn syntax(pattern: &Pattern) -> syntax::Config {
    let flags = pattern.flags();
    syntax::Config::new()
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_all)
}

fn input<'h>(haystack: &Haystack<'h>, start: usize) -> Input<'h> {
    Input::new(haystack.as_bytes()).span(start..haystack.len())
}

fn from_match(result: Result<Option<Match>, MatchError>) -> MatchResult {
    match result {
        Ok(None) => MatchResult::NoMatch,
        Ok(Some(m)) => MatchResult::Matched(m.span()),
        Err(err) => MatchResult::Error(MatchFailure::new(err.to_string())),
    }
}

/// Records the groups in `caps` into `last`, reusing its allocation.
fn record(caps: &Captures, last: &mut Vec<Option<Span>>) -> MatchResult {
    match caps.get_match() {
        None => MatchResult::NoMatch,
        Some(m) => {
            last.clear();
            last.extend(caps.iter());
            MatchResult::Matched(m.span())
        }
    }
}

fn captures(last: &[Option<Span>]) -> Option<&[Option<Span>]> {
    if last.is_empty() {
        None
    } else {
        Some(last)
    }
}

/// The meta regex engine, which picks among all other engines internally.
#[derive(Debug)]
pub struct Meta {
    re: meta::Regex,
    caps: Captures,
    last: Vec<Option<Span>>,
}

impl Meta {
    const LABEL: &'static str = "Rust meta";

    pub fn new(pattern: &Pattern) -> Result<Meta, Error> {
        let re = meta::Builder::new()
            .syntax(syntax(pattern))
            .build(pattern.to_str(Meta::LABEL)?)
            .map_err(|err| {
                Error::compile(Meta::LABEL, None, err.to_string())
            })?;
        let caps = re.create_captures();
        Ok(Meta { re, caps, last: vec![] })
    }
}

impl Matcher for Meta {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        self.re.search_captures(&input(haystack, start), &mut self.caps);
        record(&self.caps, &mut self.last)
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        captures(&self.last)
    }
}

/// A fully compiled dense DFA. Only the overall match span is reported.
///
/// Unicode word boundaries are handled heuristically, so a search that sees
/// a non-ASCII byte near one fails instead of guessing.
#[derive(Debug)]
pub struct Dense {
    re: dfa::regex::Regex,
}

impl Dense {
    const LABEL: &'static str = "Rust dense DFA";

    pub fn new(pattern: &Pattern) -> Result<Dense, Error> {
        let re = dfa::regex::Builder::new()
            .syntax(syntax(pattern))
            .dense(dfa::dense::Config::new().unicode_word_boundary(true))
            .build(pattern.to_str(Dense::LABEL)?)
            .map_err(|err| {
                Error::compile(Dense::LABEL, None, err.to_string())
            })?;
        Ok(Dense { re })
    }
}

impl Matcher for Dense {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        from_match(self.re.try_search(&input(haystack, start)))
    }
}

/// A lazy DFA. Its cache persists across searches and trials.
#[derive(Debug)]
pub struct Hybrid {
    re: hybrid::regex::Regex,
    cache: hybrid::regex::Cache,
}

impl Hybrid {
    const LABEL: &'static str = "Rust lazy DFA";

    pub fn new(pattern: &Pattern) -> Result<Hybrid, Error> {
        let re = hybrid::regex::Builder::new()
            .syntax(syntax(pattern))
            .dfa(hybrid::dfa::Config::new().unicode_word_boundary(true))
            .build(pattern.to_str(Hybrid::LABEL)?)
            .map_err(|err| {
                Error::compile(Hybrid::LABEL, None, err.to_string())
            })?;
        let cache = re.create_cache();
        Ok(Hybrid { re, cache })
    }
}

impl Matcher for Hybrid {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let input = input(haystack, start);
        from_match(self.re.try_search(&mut self.cache, &input))
    }
}

#[derive(Debug)]
pub struct PikeVM {
    vm: pikevm::PikeVM,
    cache: pikevm::Cache,
    caps: Captures,
    last: Vec<Option<Span>>,
}

impl PikeVM {
    const LABEL: &'static str = "Rust PikeVM";

    pub fn new(pattern: &Pattern) -> Result<PikeVM, Error> {
        let vm = pikevm::PikeVM::builder()
            .syntax(syntax(pattern))
            .build(pattern.to_str(PikeVM::LABEL)?)
            .map_err(|err| {
                Error::compile(PikeVM::LABEL, None, err.to_string())
            })?;
        let (cache, caps) = (vm.create_cache(), vm.create_captures());
        Ok(PikeVM { vm, cache, caps, last: vec![] })
    }
}

impl Matcher for PikeVM {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let input = input(haystack, start);
        self.vm.search(&mut self.cache, &input, &mut self.caps);
        record(&self.caps, &mut self.last)
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        captures(&self.last)
    }
}

/// The bounded backtracker. Searches fail with an error when the haystack is
/// too long for its visited set.
#[derive(Debug)]
pub struct Backtrack {
    re: backtrack::BoundedBacktracker,
    cache: backtrack::Cache,
    caps: Captures,
    last: Vec<Option<Span>>,
}

impl Backtrack {
    const LABEL: &'static str = "Rust backtrack";

    pub fn new(pattern: &Pattern) -> Result<Backtrack, Error> {
        let re = backtrack::BoundedBacktracker::builder()
            .syntax(syntax(pattern))
            .build(pattern.to_str(Backtrack::LABEL)?)
            .map_err(|err| {
                Error::compile(Backtrack::LABEL, None, err.to_string())
            })?;
        let (cache, caps) = (re.create_cache(), re.create_captures());
        Ok(Backtrack { re, cache, caps, last: vec![] })
    }
}

impl Matcher for Backtrack {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let input = input(haystack, start);
        if let Err(err) =
            self.re.try_search(&mut self.cache, &input, &mut self.caps)
        {
            return MatchResult::Error(MatchFailure::new(err.to_string()));
        }
        record(&self.caps, &mut self.last)
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        captures(&self.last)
    }
}

/// The regex-lite engine. It only searches `&str`, so the haystack must be
/// valid UTF-8.
#[derive(Debug)]
pub struct Lite {
    re: regex_lite::Regex,
}

impl Lite {
    const LABEL: &'static str = "Rust regex-lite";

    pub fn new(pattern: &Pattern) -> Result<Lite, Error> {
        let flags = pattern.flags();
        let re = regex_lite::RegexBuilder::new(pattern.to_str(Lite::LABEL)?)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_all)
            .build()
            .map_err(|err| {
                Error::compile(Lite::LABEL, None, err.to_string())
            })?;
        Ok(Lite { re })
    }
}

impl Matcher for Lite {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let hay = match text(haystack) {
            Ok(hay) => hay,
            Err(failure) => return MatchResult::Error(failure),
        };
        match self.re.find_at(hay, start) {
            None => MatchResult::NoMatch,
            Some(m) => MatchResult::Matched(Span::from(m.start()..m.end())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Flags, Variant};

    use super::*;

    fn pattern(pat: &str, case_insensitive: bool) -> Pattern {
        Pattern::new(pat, Flags { case_insensitive, ..Flags::default() })
    }

    fn matched(range: std::ops::Range<usize>) -> MatchResult {
        MatchResult::Matched(Span::from(range))
    }

    fn all(
        variant: Variant,
        pat: &Pattern,
        hay: &[u8],
    ) -> Vec<(usize, usize)> {
        let mut m = variant.compile(pat).unwrap();
        let haystack = Haystack::new(hay);
        let (mut at, mut spans) = (0, vec![]);
        while let MatchResult::Matched(span) = m.execute(&haystack, at) {
            spans.push((span.start, span.end));
            at = span.end;
            if span.is_empty() || at == hay.len() {
                break;
            }
        }
        spans
    }

    const VARIANTS: &[Variant] = &[
        Variant::RustMeta,
        Variant::RustDense,
        Variant::RustHybrid,
        Variant::RustPikeVM,
        Variant::RustBacktrack,
        Variant::RustLite,
    ];

    #[test]
    fn case_insensitive_matches_everywhere() {
        let pat = pattern("ab+", true);
        for &variant in VARIANTS {
            assert_eq!(
                vec![(0, 2), (3, 5), (6, 9)],
                all(variant, &pat, b"AB ab abb"),
                "{}",
                variant.label(),
            );
        }
    }

    #[test]
    fn case_sensitive_by_default() {
        let pat = pattern("ab+", false);
        for &variant in VARIANTS {
            assert_eq!(
                vec![(3, 5), (6, 9)],
                all(variant, &pat, b"AB ab abb"),
                "{}",
                variant.label(),
            );
        }
    }

    #[test]
    fn multi_line_and_dot_all_are_on() {
        let pat = pattern("^b.c$", false);
        for &variant in VARIANTS {
            assert_eq!(
                vec![(2, 5)],
                all(variant, &pat, b"a\nb\nc\n"),
                "{}",
                variant.label(),
            );
        }
    }

    #[test]
    fn search_starts_at_offset_but_sees_context() {
        let pat = pattern(r"\bfoo", false);
        let haystack = Haystack::new(b"xfoo foo");
        for &variant in VARIANTS {
            let mut m = variant.compile(&pat).unwrap();
            assert_eq!(
                MatchResult::Matched(Span::from(5..8)),
                m.execute(&haystack, 1),
                "{}",
                variant.label(),
            );
        }
    }

    #[test]
    fn captures_of_last_match() {
        let pat = pattern(r"(a)(x)?(b+)", false);
        let haystack = Haystack::new(b"ab abb");
        let mut m = Variant::RustMeta.compile(&pat).unwrap();
        assert_eq!(None, m.captures());
        assert_eq!(matched(0..2), m.execute(&haystack, 0));
        assert_eq!(matched(3..6), m.execute(&haystack, 2));
        assert_eq!(MatchResult::NoMatch, m.execute(&haystack, 6));
        let want = vec![
            Some(Span::from(3..6)),
            Some(Span::from(3..4)),
            None,
            Some(Span::from(4..6)),
        ];
        assert_eq!(Some(&*want), m.captures());
    }

    #[test]
    fn dfa_has_no_captures() {
        let pat = pattern(r"(a)b", false);
        let mut m = Variant::RustDense.compile(&pat).unwrap();
        m.execute(&Haystack::new(b"ab"), 0);
        assert_eq!(None, m.captures());
    }

    #[test]
    fn syntax_error_is_compile_error() {
        let pat = pattern("a(b", false);
        for &variant in VARIANTS {
            let err = variant.compile(&pat).err().unwrap();
            assert!(err.is_compile(), "{}", variant.label());
        }
    }

    #[test]
    fn lite_rejects_non_utf8_haystack() {
        let pat = pattern("a", false);
        let mut m = Variant::RustLite.compile(&pat).unwrap();
        match m.execute(&Haystack::new(b"\xFFa"), 0) {
            MatchResult::Error(_) => {}
            got => panic!("expected error, got {got:?}"),
        }
    }

    #[test]
    fn backtracker_reports_haystack_too_long() {
        let pat = pattern(r"\w+z", false);
        let mut m = Variant::RustBacktrack.compile(&pat).unwrap();
        let hay = "a".repeat(1 << 22);
        match m.execute(&Haystack::new(hay.as_bytes()), 0) {
            MatchResult::Error(_) => {}
            got => panic!("expected error, got {got:?}"),
        }
    }
}
