use lexopt::{Arg, Parser};

use crate::args::{Configurable, Usage};

/// Flags that every command accepts.
#[derive(Debug, Default)]
pub struct Config {
    pub verbose: bool,
}

impl Configurable for Config {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Long("verbose") => {
                self.verbose = true;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[Usage::new(
            "--verbose",
            "Print a table of run details to stderr.",
            r#"
Print a table of details about the run to stderr once every variant has been
benchmarked. This includes the haystack length, the flags in effect and the
wall clock time it took to compile the pattern for each variant.

Report lines on stdout are unaffected by this flag.
"#,
        )];
        USAGES
    }
}
