//! Error types for the flow core

use thiserror::Error;

/// Errors raised at the parsing edges of the flow core
///
/// State transitions themselves never fail: redundant `enter`/`exit` calls are
/// no-ops rather than errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A flow state name did not match any known state
    #[error("unknown flow state `{0}` (expected entering, entered, exiting or exited)")]
    UnknownState(String),
}
