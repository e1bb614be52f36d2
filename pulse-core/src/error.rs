//! Error types for the reactive runtime.

use std::any::Any;

use thiserror::Error;

use crate::graph::NodeId;

/// Errors surfaced by reactive reads, scheduled effects and inspection.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A memo was read from inside its own computation.
    #[error("memo {node} read itself while computing")]
    CyclicRead { node: NodeId },

    /// A user-supplied computation or effect function panicked.
    #[error("computation of {node} panicked: {message}")]
    ComputationPanicked { node: NodeId, message: String },

    /// A graph snapshot could not be serialized.
    #[error("failed to serialize graph snapshot")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
