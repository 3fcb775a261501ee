use std::fmt;
use std::io;

pub(crate) type LimoneResult<T> = Result<T, Error>;

/// Errors that can occur during limone usage
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred when reading a grammar file
    Io(io::Error),

    /// JSON parsing failed when loading a grammar.
    Json(serde_json::Error),

    /// Property-list parsing failed when loading a grammar.
    Plist(plist::Error),

    /// A scope was not found in the registry.
    /// Only happens when resolving a grammar by a scope that was never loaded
    /// or registered.
    ScopeNotRegistered(String),

    /// The parser exhausted its iteration budget without consuming the input.
    /// This indicates a grammar defect (a rule set that can match without
    /// ever advancing the cursor), not a property of the text being parsed.
    IterationLimit(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(err) => write!(f, "JSON parsing error: {}", err),
            Error::Plist(err) => write!(f, "property list parsing error: {}", err),
            Error::ScopeNotRegistered(scope) => {
                write!(f, "scope '{}' is not registered", scope)
            }
            Error::IterationLimit(limit) => {
                write!(f, "parse exceeded {} iterations without advancing", limit)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Plist(err) => Some(err),
            Error::ScopeNotRegistered(_) | Error::IterationLimit(_) => None,
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

impl From<plist::Error> for Error {
    fn from(err: plist::Error) -> Self {
        Error::Plist(err)
    }
}
