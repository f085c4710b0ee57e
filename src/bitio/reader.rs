use std::io::Read;

use byteorder::{BigEndian, ByteOrder};

use super::{check_buffer_size, check_count, BitStreamError};

pub const DEFAULT_BUFFER_SIZE: usize = 65536;

/// A buffered, big-endian bit reader over an underlying byte source.
///
/// Mirrors [`super::BitWriter`]: 64 bits are pulled from the source into
/// `current` at a time (`pull_current`), and bits are served from the most
/// significant bit down. Near the end of the source, fewer than 8 bytes may
/// be available; those are packed left-aligned into the high lanes of
/// `current` so that only the bits that actually exist get served.
pub struct BitReader<R: Read> {
    source: R,
    // 8 bytes of slack beyond `buffer_size`, mirroring `BitWriter`, so that
    // reading a trailing partial word never indexes out of bounds.
    buffer: Vec<u8>,
    buffer_size: usize,
    position: usize,
    max_position: i64,
    bit_index: i32,
    current: u64,
    read: u64,
    closed: bool,
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Result<Self, BitStreamError> {
        Self::with_buffer_size(source, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(source: R, buffer_size: usize) -> Result<Self, BitStreamError> {
        check_buffer_size(buffer_size)?;
        Ok(BitReader {
            source,
            buffer: vec![0u8; buffer_size + 8],
            buffer_size,
            position: 0,
            max_position: -1,
            bit_index: 63,
            current: 0,
            read: 0,
            closed: false,
        })
    }

    /// Reads a single bit (0 or 1).
    pub fn read_bit(&mut self) -> Result<u8, BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }

        if self.bit_index == 63 {
            self.pull_current()?;
        }

        let bit = ((self.current >> self.bit_index) & 1) as u8;
        self.bit_index = if self.bit_index == 0 { 63 } else { self.bit_index - 1 };
        self.read += 1;
        Ok(bit)
    }

    /// Reads `count` bits (`count` in `[1, 64]`) and returns them
    /// right-aligned in the result.
    pub fn read_bits(&mut self, count: u32) -> Result<u64, BitStreamError> {
        check_count(count)?;

        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }

        let count_i = count as i32;
        let res;

        if count_i <= self.bit_index + 1 {
            let mut shift = self.bit_index + 1 - count_i;

            if self.bit_index == 63 {
                self.pull_current()?;
                shift += self.bit_index - 63;
            }

            let mask = if count == 64 { u64::MAX } else { (1u64 << count) - 1 };
            res = (self.current >> shift) & mask;
            self.bit_index = (self.bit_index - count_i).rem_euclid(64);
        } else {
            let remaining = count_i - self.bit_index - 1;
            let mask = if self.bit_index == 63 {
                u64::MAX
            } else {
                (1u64 << (self.bit_index + 1)) - 1
            };
            let mut r = self.current & mask;
            self.pull_current()?;
            r <<= remaining;
            self.bit_index -= remaining;
            r |= self.current >> (self.bit_index + 1);
            res = r;
        }

        self.read += count as u64;
        Ok(res)
    }

    /// Number of bits read so far.
    pub fn read(&self) -> u64 {
        self.read
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// `false` once the stream is closed, or once both the buffer is
    /// exhausted and the next refill hits end of stream. Any other I/O
    /// failure is left to be reported by the next real read.
    pub fn has_more_to_read(&mut self) -> bool {
        if self.closed {
            return false;
        }

        if (self.position as i64) < self.max_position || self.bit_index != 63 {
            return true;
        }

        self.read_from_input_stream(self.buffer_size).is_ok()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    fn pull_current(&mut self) -> Result<(), BitStreamError> {
        if self.position as i64 > self.max_position {
            self.read_from_input_stream(self.buffer_size)?;
        }

        if (self.position + 7) as i64 > self.max_position {
            // Fewer than 8 bytes remain: pack them left-aligned into the
            // high lanes and shrink bit_index so only those bits are served.
            let shift = ((self.max_position - self.position as i64) << 3) as i32;
            self.bit_index = shift + 7;
            let mut val: u64 = 0;
            let mut s = shift;
            while (self.position as i64) <= self.max_position {
                val |= (self.buffer[self.position] as u64) << s;
                self.position += 1;
                s -= 8;
            }
            self.current = val;
        } else {
            self.current = BigEndian::read_u64(&self.buffer[self.position..self.position + 8]);
            self.bit_index = 63;
            self.position += 8;
        }

        Ok(())
    }

    fn read_from_input_stream(&mut self, want: usize) -> Result<usize, BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }

        let mut total = 0usize;
        while total < want {
            match self.source.read(&mut self.buffer[total..want]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.position = 0;
                    self.max_position = if total == 0 { -1 } else { total as i64 - 1 };
                    return Err(BitStreamError::InputOutput(e));
                }
            }
        }

        self.position = 0;
        self.max_position = if total == 0 { -1 } else { total as i64 - 1 };

        if total == 0 {
            return Err(BitStreamError::EndOfStream);
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::super::BitWriter;
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_back_what_writer_wrote() {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf).unwrap();
            w.write_bits(0b101, 3).unwrap();
            w.write_bits(0xDEAD_BEEFu64, 32).unwrap();
            w.write_bit(1).unwrap();
            w.close().unwrap();
        }

        let mut r = BitReader::new(Cursor::new(buf)).unwrap();
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_bits(32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_bit().unwrap(), 1);
    }

    #[test]
    fn near_eof_pull_packs_left_aligned_high_lanes() {
        // 5-byte source; a single readBits(64) should yield the 5 bytes
        // left-aligned in the high 40 bits, then report EndOfStream next.
        let data = vec![0xAAu8, 0xBB, 0xCC, 0xDD, 0xEE];
        let mut r = BitReader::new(Cursor::new(data.clone())).unwrap();
        let v = r.read_bits(64).unwrap();
        let expected = (data[0] as u64) << 56
            | (data[1] as u64) << 48
            | (data[2] as u64) << 40
            | (data[3] as u64) << 32
            | (data[4] as u64) << 24;
        assert_eq!(v, expected);

        assert!(matches!(
            r.read_bits(8),
            Err(BitStreamError::EndOfStream)
        ));
    }

    #[test]
    fn invalid_count_rejected() {
        let mut r = BitReader::new(Cursor::new(vec![0u8; 16])).unwrap();
        assert!(matches!(r.read_bits(0), Err(BitStreamError::InvalidCount(0))));
        assert!(matches!(r.read_bits(65), Err(BitStreamError::InvalidCount(65))));
    }

    #[test]
    fn has_more_to_read_goes_false_at_eof() {
        let mut r = BitReader::new(Cursor::new(vec![0u8; 8])).unwrap();
        assert!(r.has_more_to_read());
        r.read_bits(64).unwrap();
        assert!(!r.has_more_to_read());
    }

    #[test]
    fn close_then_read_fails() {
        let mut r = BitReader::new(Cursor::new(vec![0u8; 8])).unwrap();
        r.close();
        assert!(matches!(r.read_bits(1), Err(BitStreamError::StreamClosed)));
    }
}
