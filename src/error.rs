//! Error types shared by the decoder, the geometry pool and the pipeline.
//!
//! - [`FormatError`] means the mesh stream is truncated or structurally inconsistent.
//! - [`ResourceError`] means the backend could not create a GPU resource, or a handle
//!   was used after it had been released.
//!
//! Both abort the current mesh. Neither is retried.

use thiserror::Error;

/// The mesh byte stream could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("mesh format error at byte {offset}: {reason}")]
pub struct FormatError {
    pub reason: String,
    /// Stream position at which the problem was detected.
    pub offset: u64,
}

impl FormatError {
    pub(crate) fn new(reason: impl Into<String>, offset: u64) -> Self {
        Self {
            reason: reason.into(),
            offset,
        }
    }
}

/// A GPU-side resource could not be created or is no longer valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The backend refused to create a buffer or render target.
    #[error("failed to create {resource}: {reason}")]
    Creation {
        resource: &'static str,
        reason: String,
    },

    /// A handle was used after its resource had been released.
    #[error("stale {0} handle")]
    StaleHandle(&'static str),

    /// The backend failed while handing a frame over.
    #[error("frame submission failed: {0}")]
    Frame(String),
}

impl ResourceError {
    pub(crate) fn creation(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::Creation {
            resource,
            reason: reason.into(),
        }
    }
}

/// Any error the core can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

pub type Result<T> = std::result::Result<T, Error>;
