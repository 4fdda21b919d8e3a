use std::fmt;

use crate::{engine::Span, timer, trial::TrialOutcome};

/// A single human readable report line for one engine variant.
///
/// The format is:
///
/// ```text
/// <label> <status>: <time> ms elapsed (<N> matches found, <M> repeated
/// times).
/// ```
///
/// on one line, where the status is either `no match` or `match` followed
/// by the offsets of every capture group of the last match. A group that did
/// not take part in the match is shown as `(-1, -1)`. The trailing newline
/// is not part of the `Display` output.
#[derive(Clone, Copy, Debug)]
pub struct Report<'a> {
    label: &'a str,
    outcome: &'a TrialOutcome,
}

impl<'a> Report<'a> {
    pub fn new(label: &'a str, outcome: &'a TrialOutcome) -> Report<'a> {
        Report { label, outcome }
    }
}

impl<'a> fmt::Display for Report<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.outcome;
        write!(f, "{} ", self.label)?;
        match (o.matches, o.last) {
            (0, _) | (_, None) => write!(f, "no match")?,
            (_, Some(last)) => {
                write!(f, "match")?;
                match o.captures {
                    Some(ref groups) => {
                        for group in groups.iter() {
                            write_group(f, *group)?;
                        }
                    }
                    None => write_group(f, Some(last))?,
                }
            }
        }
        write!(
            f,
            ": {:.5} ms elapsed ({} matches found, {} repeated times).",
            timer::millis(o.best),
            o.matches,
            o.trials.get(),
        )
    }
}

fn write_group(
    f: &mut fmt::Formatter<'_>,
    group: Option<Span>,
) -> fmt::Result {
    match group {
        Some(span) => write!(f, " ({}, {})", span.start, span.end),
        None => write!(f, " (-1, -1)"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{search::Termination, trial::Trials};

    use super::*;

    fn outcome(matches: u64, last: Option<Span>) -> TrialOutcome {
        TrialOutcome {
            best: Duration::from_micros(1234),
            trials: Trials::new(5).unwrap(),
            matches,
            last,
            captures: None,
            termination: Termination::NoMatch,
        }
    }

    #[test]
    fn no_match() {
        let o = outcome(0, None);
        assert_eq!(
            "PCRE2 JIT no match: 1.23400 ms elapsed \
             (0 matches found, 5 repeated times).",
            Report::new("PCRE2 JIT", &o).to_string(),
        );
    }

    #[test]
    fn match_without_groups_shows_overall_span() {
        let o = outcome(3, Some(Span::from(6..9)));
        assert_eq!(
            "Rust dense DFA match (6, 9): 1.23400 ms elapsed \
             (3 matches found, 5 repeated times).",
            Report::new("Rust dense DFA", &o).to_string(),
        );
    }

    #[test]
    fn match_with_groups() {
        let mut o = outcome(1, Some(Span::from(3..6)));
        o.captures = Some(vec![
            Some(Span::from(3..6)),
            None,
            Some(Span::from(4..6)),
        ]);
        assert_eq!(
            "PCRE2 interp match (3, 6) (-1, -1) (4, 6): 1.23400 ms elapsed \
             (1 matches found, 5 repeated times).",
            Report::new("PCRE2 interp", &o).to_string(),
        );
    }

    #[test]
    fn sub_microsecond_precision() {
        let mut o = outcome(0, None);
        o.best = Duration::from_nanos(20);
        o.trials = Trials::new(7).unwrap();
        assert_eq!(
            "x no match: 0.00002 ms elapsed \
             (0 matches found, 7 repeated times).",
            Report::new("x", &o).to_string(),
        );
    }
}
