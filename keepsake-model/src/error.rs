use thiserror::Error;

use crate::ids::MediaId;

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("media {id} has no content source")]
    MissingContentSource { id: MediaId },

    #[error("media {id} carries both an inline payload and a remote reference")]
    AmbiguousContentSource { id: MediaId },

    #[error("inline payload could not be decoded: {0}")]
    InlineDecode(#[from] base64::DecodeError),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
