use std::io::{stderr, stdout, Write};

use {bstr::ByteSlice, lexopt::Parser};

use regex_bench::{
    engine::{Family, Haystack, Variant},
    error::Error,
    report::Report,
    timer::CpuClock,
    trial::TrialRunner,
};

use crate::{
    args,
    util::{self, Table},
};

const USAGE: &'static str = "\
A tool for measuring how fast regex engines search a file.

USAGE:
    regex-bench <engine> [options] <pattern> <input-file>

ENGINES:
    fancy      Benchmark the fancy-regex crate.
    hyperscan  Benchmark a Hyperscan block mode scan.
    pcre2      Benchmark PCRE2 via its interpreter, JIT or DFA matcher.
    re2        Benchmark RE2.
    rust       Benchmark the engines in regex-automata and regex-lite.

Engines other than 'rust' and 'fancy' link to a C or C++ library and are only
available when built with the matching 're-<engine>' feature.
";

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    let family = args::next_family(USAGE, p)?;
    run_family(p, family)
}

fn run_family(p: &mut Parser, family: Family) -> anyhow::Result<()> {
    let usage = format!(
        "\
Benchmarks a search with the {name} engine variants selected by flags.

Each selected variant compiles the pattern and searches the whole input file
once per trial. The fastest trial is reported, one line per variant, in the
order the variant flags were given.

USAGE:
    regex-bench {name} [options] <pattern> <input-file>

TIP:
    use -h for short docs and --help for long docs

OPTIONS:
%options%
",
        name = family.name(),
    );

    let mut common = args::common::Config::default();
    let mut flags = args::flags::Config::default();
    let mut bench = args::bench::Config::default();
    let mut variants = args::variant::Config::new(family);
    let mut input = args::input::Config::default();
    args::configure(
        p,
        &usage,
        &mut [
            &mut common,
            &mut flags,
            &mut bench,
            &mut variants,
            &mut input,
        ],
    )?;

    let variants = variants.get()?;
    let pattern = input.pattern(flags.flags())?;
    let contents = input.read()?;
    let haystack = Haystack::new(&contents);
    if haystack.is_empty() {
        log::warn!("the input file is empty, so only one search is timed");
    }
    check_utf8(&variants, &haystack)?;

    let mut table = Table::empty();
    table.add("haystack length", haystack.len());
    table.add("pattern", pattern.as_bstr().to_str_lossy().into_owned());
    table.add("flags", pattern.flags());
    table.add("global", bench.global);
    table.add("trials", bench.trials().get());
    let labels: Vec<&str> = variants.iter().map(|v| v.label()).collect();
    table.add("variants", labels);

    let runner =
        TrialRunner::new(CpuClock::new(), bench.global, bench.trials());
    let mut lines = vec![];
    for variant in variants.iter() {
        let label = variant.label();
        let (mut matcher, time) =
            util::timeitr(|| variant.compile(&pattern))?;
        log::debug!("{label}: compiled in {time:?}");
        table.add(&format!("{label} compile time"), time);

        let outcome = runner.run(label, &mut matcher, &haystack)?;
        // Scratch space is released before the next variant compiles.
        drop(matcher);
        log::debug!(
            "{label}: best of {} trials took {:?} ({:?})",
            outcome.trials.get(),
            outcome.best,
            outcome.termination,
        );
        lines.push(Report::new(label, &outcome).to_string());
    }

    // Nothing is printed until every variant has finished, so that a failure
    // in a later variant leaves stdout empty.
    if common.verbose {
        table.print(stderr())?;
    }
    let mut out = stdout().lock();
    for line in lines.iter() {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Rejects a non-UTF-8 haystack up front when any selected variant can only
/// search UTF-8.
fn check_utf8(
    variants: &[Variant],
    haystack: &Haystack<'_>,
) -> Result<(), Error> {
    if haystack.as_str().is_some() {
        return Ok(());
    }
    match variants.iter().find(|v| v.requires_utf8()) {
        None => Ok(()),
        Some(v) => Err(Error::usage(format!(
            "{} can only search valid UTF-8, but the input file is not",
            v.label(),
        ))),
    }
}
