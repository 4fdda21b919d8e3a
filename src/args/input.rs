use std::{
    ffi::OsString,
    io::Read,
    path::{Path, PathBuf},
};

use {
    bstr::ByteVec,
    lexopt::{Arg, Parser},
};

use regex_bench::{
    engine::{Flags, Pattern},
    error::Error,
};

use crate::args::{Configurable, Usage};

/// The two positional arguments: a pattern followed by the path of the file
/// to search.
#[derive(Debug, Default)]
pub struct Config {
    pattern: Option<OsString>,
    path: Option<PathBuf>,
}

impl Config {
    /// Returns the pattern as given on the command line, compiled later with
    /// the given flags.
    pub fn pattern(&self, flags: Flags) -> Result<Pattern, Error> {
        let pattern = self.pattern.as_ref().ok_or_else(missing)?;
        let bytes = Vec::from_os_string(pattern.clone()).map_err(|_| {
            Error::usage("pattern could not be converted to bytes")
        })?;
        Ok(Pattern::new(bytes, flags))
    }

    pub fn path(&self) -> Result<&Path, Error> {
        self.path.as_deref().ok_or_else(missing)
    }

    /// Reads the entire input file into memory.
    pub fn read(&self) -> Result<Vec<u8>, Error> {
        let path = self.path()?;
        read_all(path).map_err(|err| Error::io(Some(path.to_path_buf()), err))
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Value(ref mut v) => {
                if self.pattern.is_none() {
                    self.pattern = Some(std::mem::take(v));
                } else if self.path.is_none() {
                    self.path = Some(PathBuf::from(std::mem::take(v)));
                } else {
                    return Err(Error::usage(format!(
                        "unexpected extra argument '{}'",
                        v.to_string_lossy(),
                    ))
                    .into());
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[
            Usage::new(
                "<pattern>",
                "The pattern to search for.",
                r#"
The pattern to search for. It is passed to each engine as written, apart from
the flags set on the command line.
"#,
            ),
            Usage::new(
                "<input-file>",
                "A path to the file to search.",
                r#"
A path to the file to search. The file is read into memory in its entirety
before any trial is run, so reading it is never part of a measurement.
"#,
            ),
        ];
        USAGES
    }
}

fn missing() -> Error {
    Error::usage("a pattern and an input file are both required")
}

/// Reads all of the file at the given path, and fails if fewer bytes were
/// read than its metadata promised.
fn read_all(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    let expected = file.metadata()?.len();
    let mut contents = Vec::with_capacity(
        usize::try_from(expected).unwrap_or(0),
    );
    file.read_to_end(&mut contents)?;
    if (contents.len() as u64) < expected {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "file truncated: read {} of {} bytes",
                contents.len(),
                expected,
            ),
        ));
    }
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn configured(args: &[&str]) -> anyhow::Result<Config> {
        let mut p = Parser::from_args(args.iter().copied());
        let mut config = Config::default();
        crate::args::configure(&mut p, "usage", &mut [&mut config])?;
        Ok(config)
    }

    #[test]
    fn pattern_then_path() {
        let config = configured(&["ab+", "input.txt"]).unwrap();
        let pattern = config.pattern(Flags::default()).unwrap();
        assert_eq!(b"ab+", pattern.as_bytes());
        assert_eq!(Path::new("input.txt"), config.path().unwrap());
    }

    #[test]
    fn missing_path_is_a_usage_error() {
        let config = configured(&["ab+"]).unwrap();
        let err = config.read().unwrap_err();
        assert_eq!(1, err.exit_code());
    }

    #[test]
    fn extra_positional_is_rejected() {
        assert!(configured(&["a", "b", "c"]).is_err());
    }

    #[test]
    fn reads_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"AB ab abb").unwrap();
        file.flush().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let config = configured(&["ab+", &path]).unwrap();
        assert_eq!(b"AB ab abb".to_vec(), config.read().unwrap());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let path = path.to_str().unwrap().to_string();
        let config = configured(&["ab+", &path]).unwrap();
        let err = config.read().unwrap_err();
        assert_eq!(1, err.exit_code());
        assert!(err.to_string().contains("nope.txt"));
    }
}
