//! Crate-wide error type.

use thiserror::Error;

use crate::data::selection::ViewKind;

/// Errors surfaced by the dashboard core.
///
/// Only [`Error::DuplicateId`] is fatal (the session refuses to
/// initialize); everything else is recovered locally by the component
/// that produced it.
#[derive(Debug, Error)]
pub enum Error {
    /// A filter expression failed to parse or evaluate. The current
    /// selection is left untouched.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A requested axis or grouping attribute does not exist in the
    /// entity table. Callers fall back to a defined default attribute.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// The entity table contains the same id more than once. Structural
    /// data error; the session cannot be constructed.
    #[error("duplicate entity id '{0}'")]
    DuplicateId(String),

    /// No adapter of the given kind is registered with the session,
    /// either because it was disabled or because the table lacks the
    /// data the view needs (a map without geo coordinates).
    #[error("no adapter registered for view {0:?}")]
    UnknownView(ViewKind),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Format(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Format(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Format(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
