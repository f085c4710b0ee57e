//! The final bit-packing stage, applied after the transform pipeline.
//!
//! Unlike a [`crate::transform::Transform`], which is stateless and shared
//! across blocks, an entropy coder is constructed fresh for every block: its
//! statistics (e.g. a Rice parameter) are purely local to the bytes it is
//! given.

mod error;
mod null;
mod rice;

pub use error::EntropyError;
pub use null::{NullDecoder, NullEncoder};
pub use rice::{RiceDecoder, RiceEncoder};

use crate::bitio::{BitReader, BitWriter};
use std::io::{Read, Write};

/// Encodes one block's worth of bytes onto a shared [`BitWriter`].
///
/// `encode` must write exactly the bits needed to recover `buf` through the
/// matching [`EntropyDecoder`] and return `buf.len()` on success. Dropping
/// the encoder may flush trailing bits; callers must drop it (or otherwise
/// signal completion) before starting the next block.
pub trait EntropyEncoder<'a, W: Write> {
    fn new(writer: &'a mut BitWriter<W>) -> Self
    where
        Self: Sized;
    fn encode(&mut self, buf: &[u8]) -> Result<usize, EntropyError>;
}

/// Symmetric decoder counterpart of [`EntropyEncoder`].
pub trait EntropyDecoder<'a, R: Read> {
    fn new(reader: &'a mut BitReader<R>) -> Self
    where
        Self: Sized;
    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, EntropyError>;
}

/// The stream-format code for a named entropy coder (spec's "5-bit code").
pub fn code_for_name(name: &str) -> Result<u8, EntropyError> {
    match name {
        "NONE" => Ok(0),
        "RICE" => Ok(1),
        other => Err(EntropyError::UnknownEntropy(other.to_string())),
    }
}

pub fn name_for_code(code: u8) -> Result<&'static str, EntropyError> {
    match code {
        0 => Ok("NONE"),
        1 => Ok("RICE"),
        other => Err(EntropyError::UnknownEntropyCode(other)),
    }
}
