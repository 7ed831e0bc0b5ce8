//! Menu engine error types.
//!
//! Only configuration errors escape the engine. Source failures are absorbed
//! by the renderer and show up as missing branches plus a log line.

use thiserror::Error;

/// Errors raised while registering or resolving menu sources.
#[derive(Debug, Error)]
pub enum MenuError {
    /// A source with the same name is already registered.
    #[error("menu source '{name}': a source with this name is already registered")]
    DuplicateRegistration { name: String },

    /// Something was registered as a source but cannot produce nodes.
    #[error("menu source '{name}': not a valid source: {reason}")]
    InvalidSource { name: String, reason: String },
}

/// Errors a source may report while producing nodes.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A target path could not be resolved (e.g. routing for an attached
    /// application is not ready yet).
    #[error("no route matches '{target}'")]
    NoReverseMatch { target: String },

    /// Any other failure while fetching nodes.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SourceError {
    /// Shorthand for an unresolved-routing failure.
    pub fn no_reverse_match(target: impl Into<String>) -> Self {
        Self::NoReverseMatch {
            target: target.into(),
        }
    }
}

/// Result type alias using MenuError.
pub type MenuResult<T> = Result<T, MenuError>;
