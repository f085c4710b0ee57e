use std::io::{Read, Write};

use super::{StreamError, BITSTREAM_FORMAT_VERSION, BITSTREAM_TYPE};
use crate::bitio::{BitReader, BitWriter};

/// The 96-bit header written once, before the first block.
pub struct StreamHeader {
    pub checksum: bool,
    pub entropy_code: u8,
    pub transform_code: u16,
    pub block_size: usize,
}

impl StreamHeader {
    pub fn write<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<(), StreamError> {
        writer.write_bits(BITSTREAM_TYPE as u64, 32)?;
        writer.write_bits(BITSTREAM_FORMAT_VERSION as u64, 7)?;
        writer.write_bits(self.checksum as u64, 1)?;
        writer.write_bits(self.entropy_code as u64, 5)?;
        writer.write_bits(self.transform_code as u64, 16)?;
        writer.write_bits((self.block_size / 16) as u64, 26)?;
        writer.write_bits(0, 9)?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut BitReader<R>) -> Result<Self, StreamError> {
        let magic = reader.read_bits(32)? as u32;
        if magic != BITSTREAM_TYPE {
            return Err(StreamError::InvalidFormat("bad magic"));
        }

        let version = reader.read_bits(7)? as u8;
        if version != BITSTREAM_FORMAT_VERSION {
            return Err(StreamError::InvalidFormat("unsupported version"));
        }

        let checksum = reader.read_bits(1)? != 0;
        let entropy_code = reader.read_bits(5)? as u8;
        let transform_code = reader.read_bits(16)? as u16;
        let block_size = (reader.read_bits(26)? as usize) * 16;
        let reserved = reader.read_bits(9)?;
        if reserved != 0 {
            return Err(StreamError::InvalidFormat("reserved bits set"));
        }

        Ok(StreamHeader {
            checksum,
            entropy_code,
            transform_code,
            block_size,
        })
    }
}
