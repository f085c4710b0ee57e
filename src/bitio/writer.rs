use std::io::Write;

use byteorder::{BigEndian, ByteOrder};

use super::{check_buffer_size, check_count, BitStreamError};

/// Default buffer size used when a caller doesn't pick one explicitly.
pub const DEFAULT_BUFFER_SIZE: usize = 65536;

/// A buffered, big-endian bit writer over an underlying byte sink.
///
/// Bits accumulate in a 64-bit word (`current`) from the most significant
/// bit down; once a word is full it is spilled into a byte buffer, which in
/// turn is flushed to the sink once it fills up. `written()` always reflects
/// the number of bits conceptually emitted so far, even for bits still
/// sitting in `current` and not yet spilled.
pub struct BitWriter<W: Write> {
    sink: W,
    // Allocated with 8 bytes of slack beyond `buffer_size` so that spilling
    // a full word never indexes out of bounds, even when `position` sits at
    // `buffer_size - 1`. Only the first `buffer_size` bytes are ever
    // considered "in use" for the purpose of triggering a flush.
    buffer: Vec<u8>,
    buffer_size: usize,
    position: usize,
    bit_index: i32,
    current: u64,
    written: u64,
    closed: bool,
}

impl<W: Write> BitWriter<W> {
    /// Creates a writer around `sink` with the default buffer size.
    pub fn new(sink: W) -> Result<Self, BitStreamError> {
        Self::with_buffer_size(sink, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a writer around `sink` with an explicit buffer size (must be
    /// a multiple of 8 in `[1024, 536870912]`).
    pub fn with_buffer_size(sink: W, buffer_size: usize) -> Result<Self, BitStreamError> {
        check_buffer_size(buffer_size)?;
        Ok(BitWriter {
            sink,
            buffer: vec![0u8; buffer_size + 8],
            buffer_size,
            position: 0,
            bit_index: 63,
            current: 0,
            written: 0,
            closed: false,
        })
    }

    /// Writes the least significant bit of `bit`.
    pub fn write_bit(&mut self, bit: u8) -> Result<(), BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }

        if self.bit_index <= 0 {
            self.current |= (bit & 1) as u64;
            self.push_current()?;
        } else {
            self.current |= ((bit & 1) as u64) << self.bit_index;
            self.bit_index -= 1;
        }

        Ok(())
    }

    /// Writes the low `count` bits of `value` (`count` in `[1, 64]`),
    /// returning `count` on success.
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<u32, BitStreamError> {
        check_count(count)?;

        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }

        let value = if count == 64 {
            value
        } else {
            value & ((1u64 << count) - 1)
        };

        let bi = (self.bit_index + 1) as u32;

        if count < bi {
            let remaining = bi - count;
            self.current |= value << remaining;
            self.bit_index -= count as i32;
        } else {
            let remaining = count - bi;
            self.current |= value >> remaining;
            self.push_current()?;

            if remaining != 0 {
                self.current = value << (64 - remaining);
                self.bit_index -= remaining as i32;
            }
        }

        Ok(count)
    }

    /// Number of bits written so far: bits flushed to the sink, plus whole
    /// bytes and loose bits still sitting in the internal buffer/word.
    pub fn written(&self) -> u64 {
        if self.closed {
            return self.written;
        }

        self.written + ((self.position as u64) << 3) + (63 - self.bit_index) as u64
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Flushes any partial last word, then the underlying sink. Idempotent:
    /// calling `close()` on an already-closed writer does nothing. On
    /// transient I/O failure, internal state is reverted so a retry is
    /// possible.
    pub fn close(&mut self) -> Result<(), BitStreamError> {
        if self.closed {
            return Ok(());
        }

        let saved_bit_index = self.bit_index;
        let saved_position = self.position;
        let saved_current = self.current;

        let result: Result<(), BitStreamError> = (|| {
            let lanes_in_use = (((63 - self.bit_index) + 7) >> 3) as usize;
            BigEndian::write_u64(&mut self.buffer[self.position..self.position + 8], self.current);
            self.position += lanes_in_use;
            self.bit_index = 63;
            self.current = 0;
            self.flush()
        })();

        if let Err(e) = result {
            self.bit_index = saved_bit_index;
            self.position = saved_position;
            self.current = saved_current;
            return Err(e);
        }

        self.sink.flush().map_err(BitStreamError::InputOutput)?;

        self.closed = true;
        self.position = 0;
        Ok(())
    }

    fn push_current(&mut self) -> Result<(), BitStreamError> {
        BigEndian::write_u64(&mut self.buffer[self.position..self.position + 8], self.current);
        self.bit_index = 63;
        self.current = 0;
        self.position += 8;

        if self.position >= self.buffer_size {
            self.flush()?;
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<(), BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }

        if self.position > 0 {
            self.sink.write_all(&self.buffer[..self.position])?;
            self.written += (self.position as u64) << 3;
            self.position = 0;
        }

        Ok(())
    }
}
