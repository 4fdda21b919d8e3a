/*!
Repeated, timed scans of one compiled pattern.

A trial is one complete scan of the haystack bracketed by two clock reads.
The runner folds each trial's duration into a running minimum, so the number
of trials has no bearing on memory use. Match data is only kept from the last
trial, since every trial searches the same haystack with the same matcher.
*/

use std::time::Duration;

use crate::{
    engine::{Haystack, Matcher, Span},
    error::Error,
    search::{self, ScanError, ScanOutcome, Termination},
    timer::{self, Best, Clock, Timer},
};

/// The number of trials to run for each engine variant.
///
/// This is always at least one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Trials(u32);

impl Trials {
    pub const DEFAULT: Trials = Trials(5);

    /// Creates a trial count from user input. Zero and negative counts are
    /// replaced by the default. A count too big to represent is an error
    /// rather than being clamped, since the report states how many trials
    /// were run.
    pub fn new(count: i64) -> Result<Trials, Error> {
        if count <= 0 {
            return Ok(Trials::DEFAULT);
        }
        match u32::try_from(count) {
            Ok(count) => Ok(Trials(count)),
            Err(_) => Err(Error::usage(format!(
                "trial count {count} is too big (the maximum is {})",
                u32::MAX,
            ))),
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for Trials {
    fn default() -> Trials {
        Trials::DEFAULT
    }
}

/// Everything that survives a run of trials.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialOutcome {
    /// The smallest duration among all trials.
    pub best: Duration,
    /// The number of trials that were run.
    pub trials: Trials,
    /// The number of matches found in the last trial.
    pub matches: u64,
    /// The span of the last match in the last trial.
    pub last: Option<Span>,
    /// The capture groups of the last match, if the engine reports them.
    pub captures: Option<Vec<Option<Span>>>,
    pub termination: Termination,
}

/// Runs trials for one engine variant.
#[derive(Debug)]
pub struct TrialRunner<C> {
    timer: Timer<C>,
    global: bool,
    trials: Trials,
}

impl<C: Clock> TrialRunner<C> {
    pub fn new(clock: C, global: bool, trials: Trials) -> TrialRunner<C> {
        TrialRunner { timer: Timer::new(clock), global, trials }
    }

    /// Runs every trial back to back. The first error aborts the run, and
    /// none of the trials that already finished are reported.
    pub fn run<M: Matcher + ?Sized>(
        &self,
        label: &'static str,
        matcher: &mut M,
        haystack: &Haystack<'_>,
    ) -> Result<TrialOutcome, Error> {
        let mut best = Best::new();
        let mut last: Option<ScanOutcome> = None;
        for i in 0..self.trials.get() {
            let start = self.timer.start()?;
            let scanned = search::scan(&mut *matcher, haystack, self.global);
            let elapsed = self.timer.stop(start)?;
            let outcome = scanned.map_err(|err| match err {
                ScanError::Engine(failure) => {
                    Error::match_engine(label, failure)
                }
                ScanError::Protocol(msg) => Error::invariant(label, msg),
            })?;
            log::trace!(
                "{label}: trial {i}: {:.5} ms, {} matches, {} searches",
                timer::millis(elapsed),
                outcome.matches,
                outcome.searches,
            );
            best.add(elapsed);
            last = Some(outcome);
        }
        // Both are set since there is always at least one trial.
        let (best, scanned) = match (best.get(), last) {
            (Some(best), Some(scanned)) => (best, scanned),
            _ => unreachable!("trial count is always positive"),
        };
        let captures = if scanned.matches > 0 {
            matcher.captures().map(|caps| caps.to_vec())
        } else {
            None
        };
        Ok(TrialOutcome {
            best,
            trials: self.trials,
            matches: scanned.matches,
            last: scanned.last,
            captures,
            termination: scanned.termination,
        })
    }
}
