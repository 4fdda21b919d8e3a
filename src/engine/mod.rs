/*!
A uniform interface over the regex engines this tool can benchmark.

Each engine family lives in its own sub-module and exposes one or more
[`Variant`]s. Compiling a [`Pattern`] for a variant produces a boxed
[`Matcher`], which is the only thing the search and trial code ever sees.
Engines report their results in different shapes (offset pairs, capture
vectors, result codes), and every adapter translates its engine's shape into
a [`MatchResult`].
*/

use bstr::{BStr, BString, ByteSlice};

use crate::error::{Error, MatchFailure};

pub use regex_automata::Span;

#[cfg(feature = "re-fancy")]
mod fancy;
#[cfg(feature = "re-hyperscan")]
mod hyperscan;
#[cfg(feature = "re-pcre2")]
mod pcre2;
#[cfg(feature = "re-re2")]
mod re2;
mod rust;

/// The compile time flags that are normalized across all engines.
///
/// Every other bit of syntax is passed through to the engine as written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Flags {
    pub case_insensitive: bool,
    pub dot_all: bool,
    pub multi_line: bool,
}

impl Default for Flags {
    /// Dot-matches-newline and multi-line mode are enabled by default.
    fn default() -> Flags {
        Flags { case_insensitive: false, dot_all: true, multi_line: true }
    }
}

/// A pattern as given on the command line, along with its flags.
#[derive(Clone, Debug)]
pub struct Pattern {
    bytes: BString,
    flags: Flags,
}

impl Pattern {
    pub fn new<B: Into<Vec<u8>>>(bytes: B, flags: Flags) -> Pattern {
        Pattern { bytes: BString::from(bytes.into()), flags }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn as_bstr(&self) -> &BStr {
        self.bytes.as_bstr()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Returns the flags as an inline group like `(?ism)`, for engines that
    /// have no builder options for them. This is empty when no flag is set.
    pub fn inline_flags(&self) -> String {
        let mut letters = String::new();
        if self.flags.case_insensitive {
            letters.push('i');
        }
        if self.flags.dot_all {
            letters.push('s');
        }
        if self.flags.multi_line {
            letters.push('m');
        }
        if letters.is_empty() {
            letters
        } else {
            format!("(?{letters})")
        }
    }

    /// Returns the pattern as a string for engines that only accept UTF-8
    /// patterns. The label is used in the error.
    fn to_str(&self, label: &'static str) -> Result<&str, Error> {
        self.bytes.to_str().map_err(|err| {
            Error::compile(
                label,
                Some(err.valid_up_to()),
                "pattern is not valid UTF-8",
            )
        })
    }
}

/// The input buffer that every trial searches.
///
/// UTF-8 validity is checked once up front so that engines searching `&str`
/// never pay for it inside a timed region.
#[derive(Clone, Copy, Debug)]
pub struct Haystack<'h> {
    bytes: &'h [u8],
    text: Option<&'h str>,
}

impl<'h> Haystack<'h> {
    pub fn new(bytes: &'h [u8]) -> Haystack<'h> {
        Haystack { bytes, text: std::str::from_utf8(bytes).ok() }
    }

    pub fn as_bytes(&self) -> &'h [u8] {
        self.bytes
    }

    /// Returns the haystack as a string if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&'h str> {
        self.text
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The outcome of a single call to [`Matcher::execute`].
///
/// A successful match only carries the overall span. The capture groups of
/// the most recent successful match, when the engine reports them, are
/// available from [`Matcher::captures`]. This keeps the search loop free of
/// allocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MatchResult {
    NoMatch,
    Error(MatchFailure),
    Matched(Span),
}

/// A compiled pattern bundled with whatever scratch space its engine needs to
/// run a search.
///
/// The compiled program itself is never changed by a search. Scratch space
/// (caches, match contexts, JIT stacks) is owned by the matcher and released
/// when it is dropped.
pub trait Matcher {
    /// Search `haystack[start..]` for the leftmost match. The search sees the
    /// entire haystack, so look-around can inspect bytes before `start`.
    /// Offsets in the result are relative to the start of the haystack.
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult;

    /// Returns the capture groups of the most recent successful search,
    /// where group `0` is the overall match. `None` is returned when the
    /// engine doesn't report groups or when nothing has matched yet.
    fn captures(&self) -> Option<&[Option<Span>]> {
        None
    }
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn execute(
        &mut self,
        haystack: &Haystack<'_>,
        start: usize,
    ) -> MatchResult {
        (**self).execute(haystack, start)
    }

    fn captures(&self) -> Option<&[Option<Span>]> {
        (**self).captures()
    }
}

/// A family of engine variants. Each family is a sub-command of the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Family {
    Rust,
    Pcre2,
    Re2,
    Hyperscan,
    Fancy,
}

impl Family {
    pub const ALL: &'static [Family] = &[
        Family::Rust,
        Family::Pcre2,
        Family::Re2,
        Family::Hyperscan,
        Family::Fancy,
    ];

    pub fn from_name(name: &str) -> Option<Family> {
        Family::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Family::Rust => "rust",
            Family::Pcre2 => "pcre2",
            Family::Re2 => "re2",
            Family::Hyperscan => "hyperscan",
            Family::Fancy => "fancy",
        }
    }

    /// Whether this family was compiled into this binary.
    pub fn is_available(&self) -> bool {
        match *self {
            Family::Rust => true,
            Family::Pcre2 => cfg!(feature = "re-pcre2"),
            Family::Re2 => cfg!(feature = "re-re2"),
            Family::Hyperscan => cfg!(feature = "re-hyperscan"),
            Family::Fancy => cfg!(feature = "re-fancy"),
        }
    }

    pub fn variants(&self) -> &'static [Variant] {
        match *self {
            Family::Rust => &[
                Variant::RustMeta,
                Variant::RustDense,
                Variant::RustHybrid,
                Variant::RustPikeVM,
                Variant::RustBacktrack,
                Variant::RustLite,
            ],
            Family::Pcre2 => {
                &[Variant::Pcre2Interp, Variant::Pcre2Jit, Variant::Pcre2Dfa]
            }
            Family::Re2 => &[Variant::Re2],
            Family::Hyperscan => &[Variant::Hyperscan],
            Family::Fancy => &[Variant::Fancy],
        }
    }

    /// Looks up the variant selected by the given flag name, e.g., `jit`
    /// for `--jit`.
    pub fn variant(&self, flag: &str) -> Option<Variant> {
        self.variants().iter().copied().find(|v| v.flag() == flag)
    }
}

/// One selectable matching strategy of an engine family.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Variant {
    RustMeta,
    RustDense,
    RustHybrid,
    RustPikeVM,
    RustBacktrack,
    RustLite,
    Pcre2Interp,
    Pcre2Jit,
    Pcre2Dfa,
    Re2,
    Hyperscan,
    Fancy,
}

impl Variant {
    /// The label printed at the start of each report line.
    pub fn label(&self) -> &'static str {
        match *self {
            Variant::RustMeta => "Rust meta",
            Variant::RustDense => "Rust dense DFA",
            Variant::RustHybrid => "Rust lazy DFA",
            Variant::RustPikeVM => "Rust PikeVM",
            Variant::RustBacktrack => "Rust backtrack",
            Variant::RustLite => "Rust regex-lite",
            Variant::Pcre2Interp => "PCRE2 interp",
            Variant::Pcre2Jit => "PCRE2 JIT",
            Variant::Pcre2Dfa => "PCRE2 DFA",
            Variant::Re2 => "RE2",
            Variant::Hyperscan => "Hyperscan",
            Variant::Fancy => "fancy-regex",
        }
    }

    /// The long flag (without dashes) that selects this variant.
    pub fn flag(&self) -> &'static str {
        match *self {
            Variant::RustMeta
            | Variant::Pcre2Interp
            | Variant::Re2
            | Variant::Hyperscan
            | Variant::Fancy => "default",
            Variant::RustDense | Variant::Pcre2Dfa => "dfa",
            Variant::RustHybrid => "hybrid",
            Variant::RustPikeVM => "pikevm",
            Variant::RustBacktrack => "backtrack",
            Variant::RustLite => "lite",
            Variant::Pcre2Jit => "jit",
        }
    }

    pub fn family(&self) -> Family {
        match *self {
            Variant::RustMeta
            | Variant::RustDense
            | Variant::RustHybrid
            | Variant::RustPikeVM
            | Variant::RustBacktrack
            | Variant::RustLite => Family::Rust,
            Variant::Pcre2Interp | Variant::Pcre2Jit | Variant::Pcre2Dfa => {
                Family::Pcre2
            }
            Variant::Re2 => Family::Re2,
            Variant::Hyperscan => Family::Hyperscan,
            Variant::Fancy => Family::Fancy,
        }
    }

    /// Whether this variant can only search valid UTF-8 haystacks.
    pub fn requires_utf8(&self) -> bool {
        matches!(*self, Variant::RustLite | Variant::Fancy)
    }

    /// Compiles the pattern for this variant.
    pub fn compile(
        &self,
        pattern: &Pattern,
    ) -> Result<Box<dyn Matcher>, Error> {
        log::debug!("compiling {:?} for {}", pattern.as_bstr(), self.label());
        match *self {
            Variant::RustMeta => Ok(Box::new(rust::Meta::new(pattern)?)),
            Variant::RustDense => Ok(Box::new(rust::Dense::new(pattern)?)),
            Variant::RustHybrid => Ok(Box::new(rust::Hybrid::new(pattern)?)),
            Variant::RustPikeVM => Ok(Box::new(rust::PikeVM::new(pattern)?)),
            Variant::RustBacktrack => {
                Ok(Box::new(rust::Backtrack::new(pattern)?))
            }
            Variant::RustLite => Ok(Box::new(rust::Lite::new(pattern)?)),
            #[cfg(feature = "re-pcre2")]
            Variant::Pcre2Interp => Ok(Box::new(pcre2::Interp::new(pattern)?)),
            #[cfg(feature = "re-pcre2")]
            Variant::Pcre2Jit => Ok(Box::new(pcre2::Jit::new(pattern)?)),
            #[cfg(feature = "re-pcre2")]
            Variant::Pcre2Dfa => Ok(Box::new(pcre2::Dfa::new(pattern)?)),
            #[cfg(feature = "re-re2")]
            Variant::Re2 => Ok(Box::new(re2::Re2::new(pattern)?)),
            #[cfg(feature = "re-hyperscan")]
            Variant::Hyperscan => {
                Ok(Box::new(hyperscan::Hyperscan::new(pattern)?))
            }
            #[cfg(feature = "re-fancy")]
            Variant::Fancy => Ok(Box::new(fancy::Fancy::new(pattern)?)),
            #[allow(unreachable_patterns)]
            _ => Err(Error::usage(format!(
                "{} support was not compiled into this binary",
                self.family().name(),
            ))),
        }
    }
}

/// Returns the haystack as a string, or a failure if it isn't UTF-8. This is
/// used by engines that can only search `&str`.
fn text<'h>(haystack: &Haystack<'h>) -> Result<&'h str, MatchFailure> {
    haystack
        .as_str()
        .ok_or_else(|| MatchFailure::new("haystack is not valid UTF-8"))
}
