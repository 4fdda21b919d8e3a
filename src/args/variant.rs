use lexopt::{Arg, Parser};

use regex_bench::{
    engine::{Family, Variant},
    error::Error,
};

use crate::args::{Configurable, Usage};

/// The engine variants selected for one family, in the order their flags
/// were first given.
#[derive(Debug)]
pub struct Config {
    family: Family,
    selected: Vec<Variant>,
}

impl Config {
    pub fn new(family: Family) -> Config {
        Config { family, selected: vec![] }
    }

    /// Returns the selected variants. A family with a single variant runs it
    /// when no flag was given. Otherwise, at least one flag is required.
    pub fn get(&self) -> Result<Vec<Variant>, Error> {
        if !self.selected.is_empty() {
            return Ok(self.selected.clone());
        }
        match self.family.variants() {
            &[only] => Ok(vec![only]),
            _ => Err(Error::usage("No engine specified.")),
        }
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        let variant = match *arg {
            Arg::Long(name) => match self.family.variant(name) {
                Some(variant) => variant,
                None => return Ok(false),
            },
            _ => return Ok(false),
        };
        if !self.selected.contains(&variant) {
            self.selected.push(variant);
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const RUST: &'static [Usage] = &[
            Usage::new(
                "--default",
                "Benchmark the meta regex engine.",
                r#"
Benchmark regex-automata's meta regex engine, which picks the fastest internal
engine it can for each search. This is what the regex crate uses.
"#,
            ),
            Usage::new(
                "--dfa",
                "Benchmark a fully compiled dense DFA.",
                r#"
Benchmark a dense DFA that is fully built before any search. Only the overall
match span is reported. Building the DFA can take a long time and a lot of
memory for large patterns.
"#,
            ),
            Usage::new(
                "--hybrid",
                "Benchmark the lazy DFA.",
                r#"
Benchmark the lazy DFA, which builds its transition table during the search.
Only the overall match span is reported.
"#,
            ),
            Usage::new(
                "--pikevm",
                "Benchmark the PikeVM.",
                r#"
Benchmark the PikeVM, an NFA simulation that reports capture groups for any
pattern and any haystack.
"#,
            ),
            Usage::new(
                "--backtrack",
                "Benchmark the bounded backtracker.",
                r#"
Benchmark the bounded backtracker. It reports capture groups, but refuses to
search haystacks that are too long for its visited set, which is reported as
an engine error.
"#,
            ),
            Usage::new(
                "--lite",
                "Benchmark regex-lite.",
                r#"
Benchmark the regex-lite crate. It only searches valid UTF-8, so a non-UTF-8
input file is rejected before the pattern is compiled.
"#,
            ),
        ];
        const PCRE2: &'static [Usage] = &[
            Usage::new(
                "--default",
                "Benchmark the PCRE2 interpreter.",
                r#"
Benchmark PCRE2's backtracking interpreter via pcre2_match.
"#,
            ),
            Usage::new(
                "--jit",
                "Benchmark the PCRE2 JIT.",
                r#"
Benchmark PCRE2's JIT compiler. The pattern is JIT compiled after it is
compiled, and searches run with a dedicated JIT stack.
"#,
            ),
            Usage::new(
                "--dfa",
                "Benchmark the PCRE2 DFA matcher.",
                r#"
Benchmark PCRE2's DFA matcher via pcre2_dfa_match. It finds every match length
at the leftmost position, and the report lists the longest one first followed
by the others. It does not support capture groups or back-references.
"#,
            ),
        ];
        const FANCY: &'static [Usage] = &[Usage::new(
            "--default",
            "Benchmark fancy-regex.",
            r#"
Benchmark the fancy-regex crate. This is the only variant, so it also runs when
no flag is given. It only searches valid UTF-8.
"#,
        )];
        const RE2: &'static [Usage] = &[Usage::new(
            "--default",
            "Benchmark RE2.",
            r#"
Benchmark RE2's leftmost-first search, which reports every capture group. This
is the only variant, so it also runs when no flag is given.
"#,
        )];
        const HYPERSCAN: &'static [Usage] = &[Usage::new(
            "--default",
            "Benchmark Hyperscan.",
            r#"
Benchmark a Hyperscan block mode scan. Hyperscan reports a match as soon as it
ends, so the first match found from any offset is the one that ends earliest,
with the leftmost start for that end. Only the overall match span is reported.
This is the only variant, so it also runs when no flag is given.
"#,
        )];
        match self.family {
            Family::Rust => RUST,
            Family::Pcre2 => PCRE2,
            Family::Re2 => RE2,
            Family::Hyperscan => HYPERSCAN,
            Family::Fancy => FANCY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(family: Family, args: &[&str]) -> anyhow::Result<Config> {
        let mut p = Parser::from_args(args.iter().copied());
        let mut config = Config::new(family);
        crate::args::configure(&mut p, "usage", &mut [&mut config])?;
        Ok(config)
    }

    #[test]
    fn flags_keep_their_order_without_duplicates() {
        let config =
            configured(Family::Pcre2, &["--jit", "--default", "--jit"])
                .unwrap();
        assert_eq!(
            vec![Variant::Pcre2Jit, Variant::Pcre2Interp],
            config.get().unwrap()
        );
    }

    #[test]
    fn one_flag_is_required_when_there_is_a_choice() {
        let err = configured(Family::Rust, &[]).unwrap().get().unwrap_err();
        assert_eq!(1, err.exit_code());
        assert_eq!("No engine specified.", err.to_string());
    }

    #[test]
    fn single_variant_family_needs_no_flag() {
        for (family, only) in [
            (Family::Fancy, Variant::Fancy),
            (Family::Re2, Variant::Re2),
            (Family::Hyperscan, Variant::Hyperscan),
        ] {
            let config = configured(family, &[]).unwrap();
            assert_eq!(vec![only], config.get().unwrap());
        }
    }

    #[test]
    fn flags_of_other_families_are_rejected() {
        assert!(configured(Family::Rust, &["--jit"]).is_err());
        assert!(configured(Family::Fancy, &["--dfa"]).is_err());
    }

    #[test]
    fn dfa_means_different_things_per_family() {
        let rust = configured(Family::Rust, &["--dfa"]).unwrap();
        assert_eq!(vec![Variant::RustDense], rust.get().unwrap());
        let pcre2 = configured(Family::Pcre2, &["--dfa"]).unwrap();
        assert_eq!(vec![Variant::Pcre2Dfa], pcre2.get().unwrap());
    }
}
