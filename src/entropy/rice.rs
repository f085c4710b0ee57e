use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder, EntropyError};
use crate::bitio::{BitReader, BitWriter};

/// A per-block-adaptive Rice/Golomb coder: the Rice parameter `k` is derived
/// from the block's mean byte value, written as a 3-bit header, then every
/// byte `v` is coded as `q` one-bits (`q = v >> k`), a terminating zero bit,
/// and the low `k` bits of `v` verbatim.
///
/// `k` is clamped to `[0, 7]`, which is exact for any byte value (`log2(255)
/// < 8`), so the unary quotient for any single byte never exceeds 255 bits.
pub struct RiceEncoder<'a, W: Write> {
    writer: &'a mut BitWriter<W>,
}

fn pick_k(buf: &[u8]) -> u8 {
    if buf.is_empty() {
        return 0;
    }
    let sum: u64 = buf.iter().map(|&b| b as u64).sum();
    let mean = sum / buf.len() as u64;
    if mean == 0 {
        0
    } else {
        (63 - mean.leading_zeros()).min(7) as u8
    }
}

impl<'a, W: Write> EntropyEncoder<'a, W> for RiceEncoder<'a, W> {
    fn new(writer: &'a mut BitWriter<W>) -> Self {
        RiceEncoder { writer }
    }

    fn encode(&mut self, buf: &[u8]) -> Result<usize, EntropyError> {
        let k = pick_k(buf);
        self.writer.write_bits(k as u64, 3)?;

        for &v in buf {
            let v = v as u32;
            let q = v >> k;
            for _ in 0..q {
                self.writer.write_bit(1)?;
            }
            self.writer.write_bit(0)?;
            if k > 0 {
                let remainder = v & ((1u32 << k) - 1);
                self.writer.write_bits(remainder as u64, k as u32)?;
            }
        }

        Ok(buf.len())
    }
}

pub struct RiceDecoder<'a, R: Read> {
    reader: &'a mut BitReader<R>,
}

impl<'a, R: Read> EntropyDecoder<'a, R> for RiceDecoder<'a, R> {
    fn new(reader: &'a mut BitReader<R>) -> Self {
        RiceDecoder { reader }
    }

    fn decode(&mut self, buf: &mut [u8]) -> Result<usize, EntropyError> {
        let k = self.reader.read_bits(3)? as u32;

        for slot in buf.iter_mut() {
            let mut q = 0u32;
            while self.reader.read_bit()? == 1 {
                q += 1;
            }
            let remainder = if k > 0 { self.reader.read_bits(k)? as u32 } else { 0 };
            *slot = ((q << k) | remainder) as u8;
        }

        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf).unwrap();
            let mut enc = RiceEncoder::new(&mut w);
            enc.encode(data).unwrap();
            w.close().unwrap();
        }

        let mut r = BitReader::new(Cursor::new(buf)).unwrap();
        let mut out = vec![0u8; data.len()];
        let mut dec = RiceDecoder::new(&mut r);
        dec.decode(&mut out).unwrap();
        out
    }

    #[test]
    fn round_trips_low_entropy_data() {
        let data = vec![3u8; 500];
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn round_trips_high_value_bytes() {
        let data = vec![250u8, 251, 252, 253, 254, 255, 0, 1];
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn round_trips_mixed_distribution() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn round_trips_empty() {
        assert_eq!(roundtrip(&[]), Vec::<u8>::new());
    }

    #[test]
    fn compresses_clustered_low_values() {
        let data = vec![1u8; 1000];
        let mut buf = Vec::new();
        let mut w = BitWriter::new(&mut buf).unwrap();
        let mut enc = RiceEncoder::new(&mut w);
        enc.encode(&data).unwrap();
        w.close().unwrap();
        assert!(buf.len() < data.len());
    }
}
