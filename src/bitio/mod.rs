//! Buffered bit-level I/O on top of any byte stream.
//!
//! [`BitWriter`] and [`BitReader`] are the foundation everything else in the
//! crate is built on: the stream header, the per-block mode byte, and every
//! entropy coder read and write through one of these two types. Bits are
//! numbered from the most significant bit of a 64-bit word down, and every
//! multi-byte quantity that crosses the wire is big-endian.

mod error;
mod reader;
mod writer;

pub use error::BitStreamError;
pub use reader::BitReader;
pub use writer::BitWriter;

/// Buffers must hold a whole number of 64-bit words and stay within these
/// bounds.
pub const MIN_BUFFER_SIZE: usize = 1024;
pub const MAX_BUFFER_SIZE: usize = 1 << 29;

fn check_buffer_size(size: usize) -> Result<(), BitStreamError> {
    if size < MIN_BUFFER_SIZE {
        return Err(BitStreamError::InvalidArgument(
            "buffer size must be at least 1024 bytes",
        ));
    }
    if size > MAX_BUFFER_SIZE {
        return Err(BitStreamError::InvalidArgument(
            "buffer size must be at most 536870912 bytes",
        ));
    }
    if size & 7 != 0 {
        return Err(BitStreamError::InvalidArgument(
            "buffer size must be a multiple of 8",
        ));
    }
    Ok(())
}

fn check_count(count: u32) -> Result<(), BitStreamError> {
    if count == 0 || count > 64 {
        return Err(BitStreamError::InvalidCount(count));
    }
    Ok(())
}
