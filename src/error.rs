use std::path::PathBuf;

/// An error that aborts a benchmark run.
///
/// None of these are recoverable. A run that hits any of them is not a valid
/// data point, so the binary prints a single diagnostic and exits with the
/// code returned by [`Error::exit_code`].
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug)]
enum ErrorKind {
    Usage(String),
    Io { path: Option<PathBuf>, err: std::io::Error },
    Compile { label: &'static str, offset: Option<usize>, msg: String },
    Clock(std::io::Error),
    MatchEngine { label: &'static str, code: Option<i32>, msg: String },
    Invariant { label: &'static str, msg: String },
}

impl Error {
    pub fn usage(msg: impl Into<String>) -> Error {
        Error { kind: ErrorKind::Usage(msg.into()) }
    }

    pub fn io(path: Option<PathBuf>, err: std::io::Error) -> Error {
        Error { kind: ErrorKind::Io { path, err } }
    }

    pub fn compile(
        label: &'static str,
        offset: Option<usize>,
        msg: impl Into<String>,
    ) -> Error {
        Error { kind: ErrorKind::Compile { label, offset, msg: msg.into() } }
    }

    pub fn clock(err: std::io::Error) -> Error {
        Error { kind: ErrorKind::Clock(err) }
    }

    pub fn match_engine(label: &'static str, failure: MatchFailure) -> Error {
        Error {
            kind: ErrorKind::MatchEngine {
                label,
                code: failure.code,
                msg: failure.msg,
            },
        }
    }

    pub fn invariant(label: &'static str, msg: impl Into<String>) -> Error {
        Error { kind: ErrorKind::Invariant { label, msg: msg.into() } }
    }

    /// The process exit code that corresponds to this error.
    ///
    /// Usage and I/O problems exit with `1`. Everything that happens once a
    /// pattern is handed to an engine exits with `2`.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::Usage(_) | ErrorKind::Io { .. } => 1,
            ErrorKind::Compile { .. }
            | ErrorKind::Clock(_)
            | ErrorKind::MatchEngine { .. }
            | ErrorKind::Invariant { .. } => 2,
        }
    }

    pub fn is_compile(&self) -> bool {
        matches!(self.kind, ErrorKind::Compile { .. })
    }

    pub fn is_match_engine(&self) -> bool {
        matches!(self.kind, ErrorKind::MatchEngine { .. })
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self.kind, ErrorKind::Invariant { .. })
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::Io { ref err, .. } => Some(err),
            ErrorKind::Clock(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::Usage(ref msg) => write!(f, "{msg}"),
            ErrorKind::Io { path: Some(ref path), ref err } => {
                write!(f, "{}: {}", path.display(), err)
            }
            ErrorKind::Io { path: None, ref err } => write!(f, "{err}"),
            ErrorKind::Compile { label, offset: Some(offset), ref msg } => {
                write!(f, "[error] {label}: pos {offset}: {msg}")
            }
            ErrorKind::Compile { label, offset: None, ref msg } => {
                write!(f, "[error] {label}: {msg}")
            }
            ErrorKind::Clock(ref err) => {
                write!(f, "failed to read process CPU time: {err}")
            }
            ErrorKind::MatchEngine { label, code: Some(code), ref msg } => {
                write!(f, "{label} error: {code}: {msg}")
            }
            ErrorKind::MatchEngine { label, code: None, ref msg } => {
                write!(f, "{label} error: {msg}")
            }
            ErrorKind::Invariant { label, ref msg } => {
                write!(f, "{label} broke the search protocol: {msg}")
            }
        }
    }
}

/// A failure reported by an engine during a search.
///
/// Engines with numeric result codes (like PCRE2) provide the code. Engines
/// whose errors are typed only provide a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchFailure {
    code: Option<i32>,
    msg: String,
}

impl MatchFailure {
    pub fn new(msg: impl Into<String>) -> MatchFailure {
        MatchFailure { code: None, msg: msg.into() }
    }

    pub fn with_code(code: i32, msg: impl Into<String>) -> MatchFailure {
        MatchFailure { code: Some(code), msg: msg.into() }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl std::fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{code}: {}", self.msg),
            None => write!(f, "{}", self.msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(1, Error::usage("no engine").exit_code());
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(1, Error::io(None, err).exit_code());
        assert_eq!(2, Error::compile("PCRE2", Some(3), "oops").exit_code());
        let err = std::io::Error::new(std::io::ErrorKind::Other, "no clock");
        assert_eq!(2, Error::clock(err).exit_code());
        let failure = MatchFailure::with_code(-47, "match limit exceeded");
        assert_eq!(2, Error::match_engine("PCRE2 JIT", failure).exit_code());
        assert_eq!(2, Error::invariant("test", "stuck").exit_code());
    }

    #[test]
    fn compile_message_has_position() {
        let err = Error::compile("PCRE2 interp", Some(4), "missing )");
        assert_eq!("[error] PCRE2 interp: pos 4: missing )", err.to_string());
    }

    #[test]
    fn engine_message_has_code() {
        let failure = MatchFailure::with_code(0, "capture size too small");
        let err = Error::match_engine("PCRE2 DFA", failure);
        assert_eq!(
            "PCRE2 DFA error: 0: capture size too small",
            err.to_string()
        );
    }
}
