use crate::document::DocumentError;
use crate::kernel::KernelOpError;
use crate::topo::EntityId;
use thiserror::Error;

/// Errors raised while generating or regenerating an infill.
#[derive(Debug, Error)]
pub enum InfillError {
    #[error("Unknown infill style '{0}'")]
    InvalidStyle(String),

    #[error("Unknown body type '{0}'")]
    InvalidBodyType(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelOpError),

    /// A tool subtraction failed partway through the lattice.
    #[error("Lattice failed after {applied} of {total} tools: {source}")]
    LatticeFailed {
        applied: usize,
        total: usize,
        source: KernelOpError,
    },

    #[error("Source body {0} no longer exists")]
    MissingSource(EntityId),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Malformed feature descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
}
