use std::{fmt::Debug, io::Write, str::FromStr};

use lexopt::{Arg, Parser, ValueExt};

use regex_bench::{engine::Family, error::Error};

pub mod bench;
pub mod common;
pub mod flags;
pub mod input;
pub mod variant;

/// A group of command line flags.
///
/// Each group is offered every argument in turn and returns `true` when it
/// consumed the argument.
pub trait Configurable: Debug {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool>;

    fn usage(&self) -> &[Usage];
}

/// Parses every remaining argument by handing it to the given targets.
///
/// `-h` and `--help` turn the given usage message into an error, where the
/// `%options%` placeholder is replaced by the docs of every target. An
/// argument that no target accepts is a usage error.
pub fn configure(
    p: &mut Parser,
    usage: &str,
    targets: &mut [&mut dyn Configurable],
) -> anyhow::Result<()> {
    while let Some(arg) = p.next().map_err(usage_error)? {
        if let Arg::Short('h') | Arg::Long("help") = arg {
            let long = arg == Arg::Long("help");
            return Err(Error::usage(help(usage, targets, long)).into());
        }
        // Long flag names borrow from 'p', which the targets need mutably.
        let long_flag: Option<String> = match arg {
            Arg::Long(name) => Some(name.to_string()),
            _ => None,
        };
        let mut arg = match (long_flag.as_deref(), arg) {
            (Some(flag), _) => Arg::Long(flag),
            (None, Arg::Short(c)) => Arg::Short(c),
            (None, Arg::Value(value)) => Arg::Value(value),
            (None, Arg::Long(_)) => unreachable!(),
        };
        let mut recognized = false;
        for t in targets.iter_mut() {
            if t.configure(p, &mut arg)? {
                recognized = true;
                break;
            }
        }
        if !recognized {
            return Err(usage_error(arg.unexpected()).into());
        }
    }
    Ok(())
}

/// Renders the usage message with the docs of every target's flags, sorted
/// by their long name.
fn help(
    usage: &str,
    targets: &[&mut dyn Configurable],
    long: bool,
) -> String {
    let mut usages: Vec<Usage> =
        targets.iter().flat_map(|t| t.usage().iter().copied()).collect();
    usages.sort_by_key(|u| u.sort_key());
    let options =
        if long { Usage::long(&usages) } else { Usage::short(&usages) };
    usage.replace("%options%", &options).trim().to_string()
}

/// Parses the engine family sub-command. `-h`, `--help` or a missing command
/// turn the given usage into an error, and so does a family that was not
/// compiled into this binary.
pub fn next_family(usage: &str, p: &mut Parser) -> anyhow::Result<Family> {
    let name = match p.next().map_err(usage_error)? {
        Some(Arg::Value(name)) => name.string().map_err(usage_error)?,
        None | Some(Arg::Short('h') | Arg::Long("help")) => {
            return Err(Error::usage(usage.trim()).into());
        }
        Some(arg) => return Err(usage_error(arg.unexpected()).into()),
    };
    let family = match Family::from_name(&name) {
        Some(family) => family,
        None => anyhow::bail!(Error::usage(format!(
            "unrecognized engine '{name}'"
        ))),
    };
    if !family.is_available() {
        anyhow::bail!(Error::usage(format!(
            "support for '{name}' was not compiled into this binary \
             (rebuild with the 're-{name}' feature)",
        )));
    }
    Ok(family)
}

/// Parses the value of the given flag into `T`.
pub fn parse<T>(p: &mut Parser, flag_name: &'static str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    let value = p.value().map_err(usage_error)?;
    value
        .parse()
        .map_err(|err| Error::usage(format!("{flag_name}: {err}")))
}

fn usage_error(err: lexopt::Error) -> Error {
    Error::usage(err.to_string())
}

/// The documentation of a single flag.
///
/// `Usage::short` and `Usage::long` format a slice of these into the
/// OPTIONS section of a usage message.
#[derive(Clone, Copy, Debug)]
pub struct Usage {
    /// The format of the flag, for example, `-i, --case-insensitive`.
    pub format: &'static str,
    /// A one line description.
    pub short: &'static str,
    /// A longer description, possibly spanning multiple paragraphs.
    pub long: &'static str,
}

impl Usage {
    pub const fn new(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { format, short, long }
    }

    /// Flags with a short form sort by their long form.
    fn sort_key(&self) -> &'static str {
        match self.format.split_once(", ") {
            Some((_, long)) => long,
            None => self.format,
        }
    }

    /// Formats a two column table of flag formats and short descriptions.
    pub fn short(usages: &[Usage]) -> String {
        let mut wtr = tabwriter::TabWriter::new(vec![]).padding(2);
        for usage in usages.iter() {
            // Writes to a Vec never fail.
            let _ = writeln!(wtr, "    {}\t{}", usage.format, usage.short);
        }
        match wtr.into_inner() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }

    /// Formats each flag with its long description wrapped and indented
    /// below it. Paragraphs are separated by blank lines, and so are flags.
    pub fn long(usages: &[Usage]) -> String {
        let wrap_opts = textwrap::Options::new(79)
            .initial_indent("        ")
            .subsequent_indent("        ");
        let docs: Vec<String> = usages
            .iter()
            .map(|usage| {
                let paragraphs: Vec<String> = usage
                    .long
                    .trim()
                    .split("\n\n")
                    .map(|paragraph| {
                        let flat = paragraph.replace('\n', " ");
                        textwrap::wrap(&flat, &wrap_opts).join("\n") + "\n"
                    })
                    .collect();
                format!("    {}\n{}", usage.format, paragraphs.join("\n"))
            })
            .collect();
        docs.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USAGES: &[Usage] = &[
        Usage::new("-g, --global", "Find every match.", "Long docs."),
        Usage::new("--repeat <count>", "Number of trials.", "Longer docs."),
    ];

    #[test]
    fn short_usage_is_aligned() {
        let got = Usage::short(USAGES);
        assert_eq!(
            "    -g, --global      Find every match.\n    \
             --repeat <count>  Number of trials.\n",
            got,
        );
    }

    #[test]
    fn long_usage_is_indented() {
        let got = Usage::long(USAGES);
        assert_eq!(
            "    -g, --global\n        Long docs.\n\n    \
             --repeat <count>\n        Longer docs.\n",
            got,
        );
    }

    #[test]
    fn long_usage_separates_paragraphs() {
        let usages = &[Usage::new("--x", "x", "\nOne\nline.\n\nTwo.\n")];
        assert_eq!(
            "    --x\n        One line.\n\n        Two.\n",
            Usage::long(usages),
        );
    }

    #[test]
    fn short_flags_sort_by_long_name() {
        let mut usages = vec![
            Usage::new("--verbose", "", ""),
            Usage::new("-g, --global", "", ""),
        ];
        usages.sort_by_key(|u| u.sort_key());
        assert_eq!("-g, --global", usages[0].format);
    }

    #[test]
    fn family_is_required() {
        let mut p = Parser::from_args(Vec::<String>::new());
        let err = next_family("usage text", &mut p).unwrap_err();
        assert_eq!("usage text", err.to_string());
        assert_eq!(1, err.downcast_ref::<Error>().unwrap().exit_code());

        let mut p = Parser::from_args(["rust", "--dfa"]);
        assert_eq!(Family::Rust, next_family("usage", &mut p).unwrap());
    }

    #[test]
    fn unknown_family() {
        let mut p = Parser::from_args(["onig", "a", "file"]);
        let err = next_family("usage", &mut p).unwrap_err();
        assert_eq!("unrecognized engine 'onig'", err.to_string());
        assert_eq!(1, err.downcast_ref::<Error>().unwrap().exit_code());
    }

    #[test]
    fn unexpected_flag_is_a_usage_error() {
        let mut p = Parser::from_args(["--nope"]);
        let err = configure(&mut p, "usage", &mut []).unwrap_err();
        assert_eq!(1, err.downcast_ref::<Error>().unwrap().exit_code());
    }

    #[test]
    fn help_lists_every_target() {
        let mut p = Parser::from_args(["-h"]);
        let mut common = crate::args::common::Config::default();
        let err = configure(&mut p, "OPTIONS:\n%options%", &mut [&mut common])
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("OPTIONS:\n    --verbose  "), "{msg}");
    }
}
