use std::fmt;
use std::io;

/// Errors that can occur while loading a grammar definition.
///
/// All of these are detected before any scanning happens: a grammar that
/// loads successfully can never fail at tokenization time.
#[derive(Debug)]
#[non_exhaustive]
pub enum GrammarError {
    /// An `{ "include": "#name" }` reference points to a repository entry
    /// that does not exist.
    UnresolvedInclude { group: String, include: String },

    /// A `match`, `begin` or `end` pattern failed to compile as a regex.
    InvalidPattern {
        group: String,
        pattern: String,
        error: regex::Error,
    },

    /// A repository entry contains no rules at all.
    EmptyGroup { group: String },

    /// A pattern can match the empty string. Such a rule would never let the
    /// scanner advance, so it is rejected up front rather than guarded at
    /// runtime.
    PossiblyZeroWidthPattern { group: String, pattern: String },

    /// A chain of includes returns to a group it already passed through
    /// without crossing a rule that consumes input. Expanding it would
    /// recurse forever.
    IncludeCycle { group: String },

    /// The grammar defines more rules than a rule id can address.
    TooManyRules { count: usize },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnresolvedInclude { group, include } => {
                write!(f, "unresolved include '#{include}' in '{group}'")
            }
            GrammarError::InvalidPattern {
                group,
                pattern,
                error,
            } => {
                write!(f, "invalid pattern '{pattern}' in '{group}': {error}")
            }
            GrammarError::EmptyGroup { group } => {
                write!(f, "repository entry '{group}' contains no rules")
            }
            GrammarError::PossiblyZeroWidthPattern { group, pattern } => {
                write!(
                    f,
                    "pattern '{pattern}' in '{group}' can match the empty string"
                )
            }
            GrammarError::IncludeCycle { group } => {
                write!(f, "includes starting from '{group}' form a cycle")
            }
            GrammarError::TooManyRules { count } => {
                write!(f, "grammar defines {count} rules, at most 65536 are supported")
            }
        }
    }
}

impl std::error::Error for GrammarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrammarError::InvalidPattern { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Errors that can occur during icelang-syntax usage
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred when reading a grammar file
    Io(io::Error),

    /// JSON parsing failed when loading a grammar definition
    Json(serde_json::Error),

    /// The grammar definition parsed but failed validation
    Grammar(GrammarError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Json(err) => write!(f, "JSON parsing error: {err}"),
            Error::Grammar(err) => write!(f, "grammar error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Grammar(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<GrammarError> for Error {
    fn from(err: GrammarError) -> Self {
        Error::Grammar(err)
    }
}
