use lexopt::{Arg, Parser};

use regex_bench::engine::Flags;

use crate::args::{Configurable, Usage};

/// The pattern flags that are normalized across every engine.
#[derive(Debug, Default)]
pub struct Config {
    flags: Flags,
}

impl Config {
    pub fn flags(&self) -> Flags {
        self.flags
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('i') | Arg::Long("case-insensitive") => {
                self.flags.case_insensitive = true;
            }
            Arg::Long("no-dot-all") => {
                self.flags.dot_all = false;
            }
            Arg::Long("no-multi-line") => {
                self.flags.multi_line = false;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[
            Usage::new(
                "-i, --case-insensitive",
                "Compile the pattern case insensitively.",
                r#"
Compile the pattern such that it matches case insensitively. How case folding
is done is up to each engine.
"#,
            ),
            Usage::new(
                "--no-dot-all",
                "Prevent '.' from matching '\\n'.",
                r#"
By default, '.' matches any character, including '\n'. With this flag, '.'
matches any character except for '\n'.
"#,
            ),
            Usage::new(
                "--no-multi-line",
                "Anchor '^' and '$' to the haystack boundaries.",
                r#"
By default, '^' and '$' match at the beginning and end of every line. With this
flag, they only match at the beginning and end of the haystack.
"#,
            ),
        ];
        USAGES
    }
}
