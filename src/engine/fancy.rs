use crate::{
    engine::{text, Haystack, MatchResult, Matcher, Pattern, Span},
    error::{Error, MatchFailure},
};

/// The fancy-regex backtracking engine.
///
/// fancy-regex has no builder options for our flags, so they are prepended
/// to the pattern as an inline flag group. It also only searches `&str`.
#[derive(Debug)]
pub struct Fancy {
    re: fancy_regex::Regex,
    last: Vec<Option<Span>>,
}

impl Fancy {
    const LABEL: &'static str = "fancy-regex";

    pub fn new(pattern: &Pattern) -> Result<Fancy, Error> {
        let pat = pattern.to_str(Fancy::LABEL)?;
        let full = format!("{}{pat}", pattern.inline_flags());
        let re = fancy_regex::RegexBuilder::new(&full)
            .build()
            .map_err(|err| {
                Error::compile(Fancy::LABEL, None, err.to_string())
            })?;
        Ok(Fancy { re, last: vec![] })
    }
}

impl Matcher for Fancy {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        let hay = match text(haystack) {
            Ok(hay) => hay,
            Err(failure) => return MatchResult::Error(failure),
        };
        let caps = match self.re.captures_from_pos(hay, start) {
            Ok(None) => return MatchResult::NoMatch,
            Ok(Some(caps)) => caps,
            Err(err) => {
                return MatchResult::Error(MatchFailure::new(err.to_string()))
            }
        };
        self.last.clear();
        self.last.extend(
            (0..caps.len())
                .map(|i| caps.get(i).map(|m| Span::from(m.start()..m.end()))),
        );
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
