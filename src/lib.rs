/*!
A harness for measuring how long regex engines take to search a file.

A benchmark run compiles one pattern for one or more engine variants, and for
each variant runs a number of trials. A trial is a single search (or, in
global mode, a scan for every non-overlapping match) over the entire input,
timed with the process CPU clock. The smallest trial time is reported.

The pieces are layered bottom up:

* [`timer`] reads the process CPU clock and reduces trial times to the best.
* [`engine`] puts every supported regex engine behind the [`engine::Matcher`]
trait.
* [`search`] drives a matcher over a haystack, one match at a time.
* [`trial`] repeats a scan and measures each repetition.
* [`report`] formats the outcome of a run of trials as a single line.

Every failure is fatal and described by [`error::Error`].
*/

#![warn(missing_debug_implementations)]

pub mod engine;
pub mod error;
pub mod report;
pub mod search;
pub mod timer;
pub mod trial;
