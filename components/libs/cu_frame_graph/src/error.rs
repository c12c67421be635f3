use crate::{EdgeHandle, FrameId, VertexHandle};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameGraphError {
    #[error("Frame '{0}' does not exist")]
    UnknownFrame(FrameId),

    #[error("Frame '{0}' is already part of the graph")]
    DuplicateLabel(FrameId),

    #[error("Vertex {0} not found")]
    VertexNotFound(VertexHandle),

    #[error("No edge from {from} to {to}")]
    EdgeNotFound { from: String, to: String },

    #[error("Edge {0} not found")]
    EdgeHandleNotFound(EdgeHandle),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Frame event subscriber failed: {0}")]
    SubscriberFailure(#[source] anyhow::Error),

    #[error("Item {index} of frame '{frame}' is not a {expected}")]
    ItemTypeMismatch {
        frame: FrameId,
        index: usize,
        expected: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type FrameGraphResult<T> = Result<T, FrameGraphError>;
