use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

/// Time an operation that returns a result by packing the wall clock
/// duration into the `Ok` variant.
///
/// This is only used for diagnostics, like compile times. Trials are timed
/// with the process CPU clock instead.
pub fn timeitr<T, E>(
    run: impl FnOnce() -> Result<T, E>,
) -> Result<(T, Duration), E> {
    let start = Instant::now();
    let t = run()?;
    Ok((t, start.elapsed()))
}

/// An aligned table of key-value pairs, printed with `--verbose`.
#[derive(Debug)]
pub struct Table {
    pairs: Vec<(String, Box<dyn std::fmt::Debug>)>,
}

impl Table {
    pub fn empty() -> Table {
        Table { pairs: vec![] }
    }

    pub fn add<D: std::fmt::Debug + 'static>(
        &mut self,
        label: &str,
        value: D,
    ) {
        self.pairs.push((label.to_string(), Box::new(value)));
    }

    pub fn print<W: io::Write>(&self, wtr: W) -> io::Result<()> {
        let mut wtr = tabwriter::TabWriter::new(wtr)
            .alignment(tabwriter::Alignment::Right);
        for (label, value) in self.pairs.iter() {
            writeln!(wtr, "{label}:\t{value:?}")?;
        }
        wtr.flush()
    }
}
