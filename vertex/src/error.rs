//! Error types.
//!
//! Plain enums with manual `Display`/`Error` impls, matching the rest of
//! the corpus's preference for small dependency-free error types over a
//! helper crate.

use std::fmt;
use std::path::PathBuf;

/// Something wrong with the command line.
#[derive(Debug)]
pub enum ArgError {
    /// Too few, or malformed, positional arguments.
    Usage(String),
    /// A `--ram-shm`/`--interrupt-shm` flag was given with no value.
    MissingValue(String),
    /// The log-level positional argument was not one of the known names.
    UnknownLogLevel(String),
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "{msg}"),
            Self::MissingValue(flag) => write!(f, "{flag} requires a value"),
            Self::UnknownLogLevel(level) => {
                write!(f, "unknown log level '{level}' (expected debug, info, or error)")
            }
        }
    }
}

impl std::error::Error for ArgError {}

/// A ROM file could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    UnexpectedSize {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read '{}': {source}", path.display())
            }
            Self::UnexpectedSize {
                path,
                expected,
                actual,
            } => write!(
                f,
                "'{}' is {actual} bytes, expected exactly {expected}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LoadError {}

/// A shared-memory mapping could not be opened.
#[derive(Debug)]
pub enum MapError {
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to map '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for MapError {}

/// Top-level error type, covering everything that can go wrong before or
/// during a run.
#[derive(Debug)]
pub enum VertexError {
    Arg(ArgError),
    Load(LoadError),
    Map(MapError),
}

impl fmt::Display for VertexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arg(e) => write!(f, "{e}"),
            Self::Load(e) => write!(f, "{e}"),
            Self::Map(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for VertexError {}

impl From<ArgError> for VertexError {
    fn from(e: ArgError) -> Self {
        Self::Arg(e)
    }
}

impl From<LoadError> for VertexError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<MapError> for VertexError {
    fn from(e: MapError) -> Self {
        Self::Map(e)
    }
}
