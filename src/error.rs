// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-02"
// driver = "Isaac Clayton"

//! Error types for integration and annotation editing.

use thiserror::Error;

use crate::id::Id;

/// Errors surfaced by [`crate::doc::Document::integrate`].
///
/// A failed batch leaves the input snapshot untouched; the caller keeps
/// the pre-batch value and may retry or drop the batch.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IntegrateError {
    /// The command carried no recognizable operation payload.
    /// This is the decoded form of an unknown wire variant.
    #[error("command {0} carries no recognizable operation")]
    InvalidCommandKind(Id),

    /// A command referenced an ID that has not been integrated yet.
    /// Under causal delivery this cannot happen; seeing it means the
    /// transport delivered a command before its dependencies.
    #[error("referenced ID {0} is not present in the character graph")]
    MissingOriginHint(Id),
}

/// Errors surfaced by [`crate::editor::AnnotationEditor`].
#[derive(Debug, Error)]
pub enum EditError {
    /// An attribute or annotation payload could not be canonicalized.
    #[error("failed to canonicalize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}
