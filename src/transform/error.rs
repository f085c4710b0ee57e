use std::io;
use thiserror::Error;

/// Errors a [`super::Transform`] stage can raise.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("unknown transform: {0}")]
    UnknownTransform(String),

    #[error("unknown transform code: {0}")]
    UnknownTransformCode(u16),

    /// Surfaced as a `ProcessBlock` failure at the stream layer.
    #[error("block stream ended prematurely while decoding a transform")]
    UnexpectedEnd,

    #[error("a repetition would exceed the memory limit")]
    MemoryLimitExceeded,

    #[error("deduplication offset is zero")]
    ZeroDeduplicationOffset,

    #[error("deduplication offset is out of bounds")]
    InvalidDeduplicationOffset,

    #[error("encoding failed")]
    Encode(#[from] io::Error),
}
