//! Error types for the LOLOG engine.

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Every fallible call aborts cleanly on error: the running model clone
/// is dropped and the observed model is left untouched. No partial
/// frames or networks are returned.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LologError {
    /// Invalid user input (mismatched lengths, out-of-range vertices,
    /// a partial order of the wrong length, a bad rate).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A design invariant was broken (e.g. a proposed add on a dyad
    /// that already exists in node-sequential growth). Indicates a
    /// term or graph bug, not a user error.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A term produced a non-finite log-likelihood change.
    #[error("numeric error: {0}")]
    Numeric(String),

    /// The cooperative interrupt flag was set mid-call.
    #[error("interrupted")]
    Cancelled,
}

impl LologError {
    /// Shorthand for a configuration error with a formatted message.
    pub fn config(msg: impl Into<String>) -> Self {
        LologError::Configuration(msg.into())
    }
}
