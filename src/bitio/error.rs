use std::io;
use thiserror::Error;

/// Errors raised by [`super::BitWriter`] and [`super::BitReader`]:
/// `InvalidArgument`, `StreamClosed`, `EndOfStream` and `InputOutput`.
#[derive(Error, Debug)]
pub enum BitStreamError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("invalid bit count: {0} (must be in [1..64])")]
    InvalidCount(u32),

    #[error("bit stream is closed")]
    StreamClosed,

    #[error("no more data to read in the bit stream")]
    EndOfStream,

    #[error("I/O error in underlying stream")]
    InputOutput(#[from] io::Error),
}
