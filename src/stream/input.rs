use std::io::{self, Read};

use super::header::StreamHeader;
use super::{Config, StreamError, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, SMALL_BLOCK_MASK};
use crate::bitio::BitReader;
use crate::checksum::block_checksum;
use crate::entropy::{self, EntropyDecoder, NullDecoder, RiceDecoder};
use crate::transform::{self, TransformPipeline};

/// Reads a [`super::CompressedOutputStream`]'s framing back into the
/// original bytes.
///
/// Decoding is inherently sequential: a block's transform can't start until
/// its bytes have been pulled off the wire, and those bytes can't be pulled
/// until the previous block's have been — there is no parallel counterpart
/// to the encoder's worker pool to size here. `config` is validated on
/// construction for the caller's own sanity, but the actual transform,
/// entropy coder, block size and checksum flag in effect are whatever the
/// stream's own header says, not `config`'s write-side fields.
pub struct CompressedInputStream<R: Read> {
    reader: BitReader<R>,
    header: StreamHeader,
    pending: Vec<u8>,
    pending_pos: usize,
    finished: bool,
    closed: bool,
    next_block_id: u64,
}

impl<R: Read> CompressedInputStream<R> {
    pub fn new(source: R, config: Config) -> Result<Self, StreamError> {
        config.validate()?;

        let mut reader = BitReader::new(source)?;
        let header = StreamHeader::read(&mut reader)?;

        if header.block_size < MIN_BLOCK_SIZE || header.block_size > MAX_BLOCK_SIZE {
            return Err(StreamError::InvalidFormat("block size out of range"));
        }
        if header.block_size % 16 != 0 {
            return Err(StreamError::InvalidFormat("block size not a multiple of 16"));
        }
        // Validates that the header's transform/entropy codes resolve to
        // something this build knows how to decode before any block is read.
        transform::by_code(header.transform_code)?;

        Ok(CompressedInputStream {
            reader,
            header,
            pending: Vec::new(),
            pending_pos: 0,
            finished: false,
            closed: false,
            next_block_id: 0,
        })
    }

    /// Reads and decodes the next on-wire block into `self.pending`, or
    /// marks the stream finished when the end marker is seen. Returns
    /// `false` once the end marker has been consumed.
    fn read_block(&mut self) -> Result<bool, StreamError> {
        let mode = self.reader.read_bits(8)? as u8;

        if mode & SMALL_BLOCK_MASK != 0 {
            let len = (mode & 0x0F) as usize;
            if len == 0 {
                self.finished = true;
                return Ok(false);
            }

            self.next_block_id += 1;
            let block_id = self.next_block_id;

            let expected_checksum = if self.header.checksum {
                Some(self.reader.read_bits(32)? as u32)
            } else {
                None
            };

            let mut data = vec![0u8; len];
            for b in data.iter_mut() {
                *b = self.reader.read_bits(8)? as u8;
            }

            if let Some(expected) = expected_checksum {
                if block_checksum(&data) != expected {
                    return Err(StreamError::ProcessBlock(block_id, "checksum mismatch".to_string()));
                }
            }

            self.pending.extend_from_slice(&data);
            return Ok(true);
        }

        let data_size = (mode & 0x3) as u32 + 1;
        let skip_mask = (mode >> 2) & 0x0F;
        let post_len = self.reader.read_bits(data_size * 8)? as usize;

        self.next_block_id += 1;
        let block_id = self.next_block_id;

        let expected_checksum = if self.header.checksum {
            Some(self.reader.read_bits(32)? as u32)
        } else {
            None
        };

        let mut encoded = vec![0u8; post_len];
        let read = match self.header.entropy_code {
            0 => NullDecoder::new(&mut self.reader).decode(&mut encoded)?,
            1 => RiceDecoder::new(&mut self.reader).decode(&mut encoded)?,
            other => {
                return Err(StreamError::ProcessBlock(
                    block_id,
                    format!("unknown entropy code {other}"),
                ))
            }
        };
        if read != encoded.len() {
            let coder = entropy::name_for_code(self.header.entropy_code).unwrap_or("?");
            return Err(StreamError::ProcessBlock(
                block_id,
                format!("entropy decoding failed ({coder})"),
            ));
        }

        let stage = transform::by_code(self.header.transform_code)
            .map_err(|e| StreamError::ProcessBlock(block_id, e.to_string()))?;
        let pipeline = TransformPipeline::single(stage);

        let mut decoded = Vec::new();
        pipeline
            .inverse(&encoded, &mut decoded, skip_mask)
            .map_err(|e| StreamError::ProcessBlock(block_id, format!("inverse transform failed: {e}")))?;

        if let Some(expected) = expected_checksum {
            if block_checksum(&decoded) != expected {
                return Err(StreamError::ProcessBlock(block_id, "checksum mismatch".to_string()));
            }
        }

        self.pending.extend_from_slice(&decoded);
        Ok(true)
    }

    /// Idempotent; marks the reader permanently unusable.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader.close();
        Ok(())
    }
}

impl<R: Read> Read for CompressedInputStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }

        if self.pending_pos >= self.pending.len() {
            self.pending.clear();
            self.pending_pos = 0;
        }

        while self.pending_pos >= self.pending.len() && !self.finished {
            self.read_block().map_err(io::Error::from)?;
        }

        if self.pending_pos >= self.pending.len() {
            return Ok(0);
        }

        let available = &self.pending[self.pending_pos..];
        let n = std::cmp::min(buf.len(), available.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pending_pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{CompressedOutputStream, Config};
    use std::io::{Cursor, Write};

    fn roundtrip(data: &[u8], cfg: Config) -> Vec<u8> {
        let mut compressed = Vec::new();
        {
            let mut out = CompressedOutputStream::new(&mut compressed, cfg.clone()).unwrap();
            out.write_all(data).unwrap();
            out.close().unwrap();
        }

        let mut decompressed = Vec::new();
        let mut input = CompressedInputStream::new(Cursor::new(compressed), cfg).unwrap();
        input.read_to_end(&mut decompressed).unwrap();
        decompressed
    }

    #[test]
    fn empty_round_trips() {
        assert_eq!(roundtrip(b"", Config::default()), b"");
    }

    #[test]
    fn small_block_round_trips() {
        assert_eq!(roundtrip(b"ABC", Config::default()), b"ABC");
    }

    #[test]
    fn multi_block_round_trips_with_checksum() {
        let data = vec![42u8; 10_000];
        let cfg = Config::default().with_block_size(1024).with_checksum(true);
        assert_eq!(roundtrip(&data, cfg), data);
    }

    #[test]
    fn parallel_encode_round_trips() {
        let data: Vec<u8> = (0..200_000u32).map(|n| (n % 251) as u8).collect();
        let cfg = Config::default().with_block_size(4096).with_jobs(8);
        assert_eq!(roundtrip(&data, cfg), data);
    }

    #[test]
    fn jobs_do_not_affect_on_wire_bytes() {
        let data: Vec<u8> = (0..200_000u32).map(|n| ((n * 7) % 251) as u8).collect();
        let base = Config::default().with_block_size(4096).with_checksum(true);

        let mut single = Vec::new();
        {
            let mut out = CompressedOutputStream::new(&mut single, base.clone().with_jobs(1)).unwrap();
            out.write_all(&data).unwrap();
            out.close().unwrap();
        }

        for jobs in [2, 4, 8] {
            let mut multi = Vec::new();
            let mut out =
                CompressedOutputStream::new(&mut multi, base.clone().with_jobs(jobs)).unwrap();
            out.write_all(&data).unwrap();
            out.close().unwrap();
            assert_eq!(single, multi, "jobs={jobs} diverged from the jobs=1 baseline");
        }
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let data = vec![9u8; 5000];
        let cfg = Config::default().with_block_size(1024).with_checksum(true);

        let mut compressed = Vec::new();
        {
            let mut out = CompressedOutputStream::new(&mut compressed, cfg.clone()).unwrap();
            out.write_all(&data).unwrap();
            out.close().unwrap();
        }

        let last = compressed.len() - 2;
        compressed[last] ^= 0xFF;

        let mut input = CompressedInputStream::new(Cursor::new(compressed), cfg).unwrap();
        let mut out = Vec::new();
        assert!(input.read_to_end(&mut out).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = vec![0xFFu8; 16];
        assert!(CompressedInputStream::new(Cursor::new(buf), Config::default()).is_err());
    }

    #[test]
    fn double_close_is_a_no_op() {
        let mut compressed = Vec::new();
        {
            let mut out = CompressedOutputStream::new(&mut compressed, Config::default()).unwrap();
            out.write_all(b"hi").unwrap();
            out.close().unwrap();
        }
        let mut input = CompressedInputStream::new(Cursor::new(compressed), Config::default()).unwrap();
        input.close().unwrap();
        input.close().unwrap();
    }
}
