use lexopt::{Arg, Parser};

use regex_bench::trial::Trials;

use crate::args::{self, Configurable, Usage};

/// How each variant is measured.
#[derive(Debug, Default)]
pub struct Config {
    pub global: bool,
    trials: Trials,
}

impl Config {
    pub fn trials(&self) -> Trials {
        self.trials
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('g') | Arg::Long("global") => {
                self.global = true;
            }
            Arg::Long("repeat") => {
                let count: i64 = args::parse(p, "--repeat")?;
                self.trials = Trials::new(count)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[
            Usage::new(
                "-g, --global",
                "Find every non-overlapping match.",
                r#"
Instead of stopping at the first match, keep searching from the end of each
match until there are no more matches or the input is used up. The report then
includes the number of matches found and the offsets of the last one.
"#,
            ),
            Usage::new(
                "--repeat <count>",
                "The number of trials to run (default: 5).",
                r#"
The number of times to run the search for each variant. The fastest run is
reported. A count of zero or less is replaced by the default of 5. A count
above 4294967295 is an error.
"#,
            ),
        ];
        USAGES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(args: &[&str]) -> anyhow::Result<Config> {
        let mut p = Parser::from_args(args.iter().copied());
        let mut config = Config::default();
        crate::args::configure(&mut p, "usage", &mut [&mut config])?;
        Ok(config)
    }

    #[test]
    fn defaults() {
        let config = configured(&[]).unwrap();
        assert!(!config.global);
        assert_eq!(5, config.trials().get());
    }

    #[test]
    fn repeat_forms() {
        assert_eq!(7, configured(&["--repeat=7"]).unwrap().trials().get());
        assert_eq!(7, configured(&["--repeat", "7"]).unwrap().trials().get());
        assert_eq!(5, configured(&["--repeat=0"]).unwrap().trials().get());
        assert_eq!(5, configured(&["--repeat=-3"]).unwrap().trials().get());
    }

    #[test]
    fn repeat_beyond_the_trial_limit_is_rejected() {
        let err = configured(&["--repeat=4294967296"]).unwrap_err();
        let err = err.downcast_ref::<regex_bench::error::Error>().unwrap();
        assert_eq!(1, err.exit_code());
        let max = configured(&["--repeat=4294967295"]).unwrap();
        assert_eq!(u32::MAX, max.trials().get());
    }

    #[test]
    fn repeat_must_be_a_number() {
        assert!(configured(&["--repeat=lots"]).is_err());
        assert!(configured(&["--repeat"]).is_err());
    }

    #[test]
    fn global() {
        assert!(configured(&["-g"]).unwrap().global);
        assert!(configured(&["--global"]).unwrap().global);
    }
}
