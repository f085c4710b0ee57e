use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder, EntropyError};
use crate::bitio::{BitReader, BitWriter};

/// Writes bytes verbatim, 8 bits at a time, through the bit stream. Exercises
/// byte-aligned equivalence between the bit layer and a plain byte write.
pub struct NullEncoder<'a, W: Write> {
    writer: &'a mut BitWriter<W>,
}

impl<'a, W: Write> EntropyEncoder<'a, W> for NullEncoder<'a, W> {
    fn new(writer: &'a mut BitWriter<W>) -> Self {
        NullEncoder { writer }
    }

    fn encode(&mut self, buf: &[u8]) -> Result<usize, EntropyError> {
        for &b in buf {
            self.writer.write_bits(b as u64, 8)?;
        }
        Ok(buf.len())
    }
}

pub struct NullDecoder<'a, R: Read> {
    reader: &'a mut BitReader<R>,
}

impl<'a, R: Read> EntropyDecoder<'a, R> for NullDecoder<'a, R> {
    fn new(reader: &'a mut BitReader<R>) -> Self {
        NullDecoder { reader }
    }

    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, EntropyError> {
        for slot in buf.iter_mut() {
            *slot = self.reader.read_bits(8)? as u8;
        }
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_bit_stream() {
        let data = b"the null entropy coder just moves bytes";
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf).unwrap();
            let mut enc = NullEncoder::new(&mut w);
            enc.encode(data).unwrap();
            w.close().unwrap();
        }

        let mut r = BitReader::new(Cursor::new(buf)).unwrap();
        let mut out = vec![0u8; data.len()];
        let mut dec = NullDecoder::new(&mut r);
        dec.decode(&mut out).unwrap();
        assert_eq!(&out, data);
    }
}
