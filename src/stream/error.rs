use std::io;
use thiserror::Error;

use crate::bitio::BitStreamError;
use crate::entropy::EntropyError;
use crate::transform::TransformError;

/// Every way a [`super::CompressedOutputStream`] or [`super::CompressedInputStream`]
/// can fail.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("stream is closed")]
    StreamClosed,

    #[error("no more data to read")]
    EndOfStream,

    #[error("I/O error in underlying stream")]
    InputOutput(#[from] io::Error),

    #[error("failed to write the stream header")]
    WriteHeader,

    #[error("failed to write to the underlying sink")]
    WriteFile,

    #[error("failed to process block {0}: {1}")]
    ProcessBlock(u64, String),

    #[error("invalid stream format: {0}")]
    InvalidFormat(&'static str),

    #[error(transparent)]
    BitStream(#[from] BitStreamError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> io::Error {
        io::Error::new(io::ErrorKind::Other, e)
    }
}
