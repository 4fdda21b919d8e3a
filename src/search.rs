/*!
The global-match iterator.

A scan runs one trial's worth of searching. In non-global mode, it stops
after the first match. In global mode, it keeps searching from the end of the
previous match until the engine reports no match or the haystack is used up.

The scan is written as an explicit state machine:

```text
Scanning --match--> MatchedAdvance --global--> Scanning
    |                     |
    | no match / error    | first match only, or nothing left
    v                     v
   Done <-----------------+
```

In global mode, a match ending at or before the current cursor would make
the scan loop forever. Such a match, including an empty match at the cursor,
fails the scan. This bounds the number of searches by the haystack length
plus one.
*/

use crate::{
    engine::{Haystack, MatchResult, Matcher, Span},
    error::MatchFailure,
};

/// How far into the haystack a scan has progressed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ScanCursor {
    offset: usize,
    remaining: usize,
}

impl ScanCursor {
    fn new(len: usize) -> ScanCursor {
        ScanCursor { offset: 0, remaining: len }
    }

    fn advance_to(&mut self, end: usize, len: usize) {
        self.offset = end;
        self.remaining = len - end;
    }
}

/// Why a scan stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Termination {
    /// Global mode was off and the first match was found.
    FirstMatch,
    /// The engine reported no match at the cursor.
    NoMatch,
    /// A match ended at the end of the haystack, so there was nothing left
    /// to search.
    Exhausted,
}

/// The result of a scan that ran to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanOutcome {
    pub matches: u64,
    pub last: Option<Span>,
    pub termination: Termination,
    /// The number of times the engine was asked to search.
    pub searches: u64,
}

/// A scan that was cut short.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScanError {
    /// The engine itself reported an error.
    Engine(MatchFailure),
    /// The engine reported a match that violates the search protocol.
    Protocol(String),
}

enum State {
    Scanning,
    MatchedAdvance(Span),
    Done(Termination),
}

/// Runs one scan over `haystack` with a freshly reset cursor.
pub fn scan<M: Matcher + ?Sized>(
    matcher: &mut M,
    haystack: &Haystack<'_>,
    global: bool,
) -> Result<ScanOutcome, ScanError> {
    let len = haystack.len();
    let mut cursor = ScanCursor::new(len);
    let (mut matches, mut searches) = (0u64, 0u64);
    let mut last = None;
    let mut state = State::Scanning;
    let termination = loop {
        state = match state {
            State::Scanning => {
                searches += 1;
                match matcher.execute(haystack, cursor.offset) {
                    MatchResult::NoMatch => State::Done(Termination::NoMatch),
                    MatchResult::Error(failure) => {
                        return Err(ScanError::Engine(failure));
                    }
                    MatchResult::Matched(span) => {
                        check_bounds(span, &cursor, len)?;
                        matches += 1;
                        last = Some(span);
                        State::MatchedAdvance(span)
                    }
                }
            }
            State::MatchedAdvance(_) if !global => {
                State::Done(Termination::FirstMatch)
            }
            State::MatchedAdvance(span) => {
                if span.end <= cursor.offset {
                    return Err(ScanError::Protocol(format!(
                        "match {}..{} does not advance past offset {}",
                        span.start, span.end, cursor.offset,
                    )));
                }
                cursor.advance_to(span.end, len);
                if cursor.remaining == 0 {
                    State::Done(Termination::Exhausted)
                } else {
                    State::Scanning
                }
            }
            State::Done(termination) => break termination,
        };
    };
    Ok(ScanOutcome { matches, last, termination, searches })
}

/// Ensures a reported match lies within the searched part of the haystack.
fn check_bounds(
    span: Span,
    cursor: &ScanCursor,
    len: usize,
) -> Result<(), ScanError> {
    if span.start < cursor.offset || span.start > span.end || span.end > len {
        return Err(ScanError::Protocol(format!(
            "match {}..{} is outside of the searched range {}..{}",
            span.start, span.end, cursor.offset, len,
        )));
    }
    Ok(())
}
