//! A block-parallel, lossless stream compressor.
//!
//! The crate is split into two layers that mirror how the format is laid
//! out on the wire:
//!
//! - [`bitio`] is a buffered bit-level reader/writer sitting on top of any
//!   `Read`/`Write` byte stream. Everything else in the crate is built on
//!   top of it.
//! - [`stream`] segments an input byte stream into fixed-size blocks,
//!   pipelines each block through a [`transform`] stage and an [`entropy`]
//!   stage, and writes the result to a shared [`bitio::BitWriter`] in strict
//!   block-id order, optionally in parallel across several worker threads.
//!
//! [`transform`] and [`entropy`] are plug-in points: the crate ships a
//! handful of reference implementations so the pipeline is exercisable, but
//! callers are expected to bring their own via the `Transform`/
//! `EntropyEncoder`/`EntropyDecoder` traits and the small code registries in
//! those modules.

#![forbid(unsafe_code)]

pub mod bitio;
pub mod checksum;
pub mod entropy;
pub mod listener;
pub mod stream;
pub mod transform;

pub use stream::{CompressedInputStream, CompressedOutputStream, Config, StreamError};

#[cfg(test)]
mod tests {
    use crate::stream::{CompressedInputStream, CompressedOutputStream, Config};
    use std::io::{Cursor, Read, Write};

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

    fn inverse(s: &str) {
        let decompressed = roundtrip(s.as_bytes(), Config::default());
        assert_eq!(decompressed, s.as_bytes());
    }

    #[test]
    fn shakespear() {
        inverse("to live or not to live");
        inverse("Love is a wonderful terrible thing");
        inverse("There is nothing either good or bad, but thinking makes it so.");
        inverse("I burn, I pine, I perish.");
    }

    #[test]
    fn save_the_pandas() {
        inverse("To cute to die! Save the red panda!");
        inverse("You are 60% water. Save 60% of yourself!");
        inverse("Save water, it doesn't grow on trees.");
        inverse("The panda bear has an amazing black-and-white fur.");
        inverse("The average panda eats as much as 9 to 14 kg of bamboo shoots a day.");
        inverse("The Empress Dowager Bo was buried with a panda skull in her vault");
    }

    #[test]
    fn not_compressible() {
        inverse("as6yhol.;jrew5tyuikbfewedfyjltre22459ba");
        inverse("jhflkdjshaf9p8u89ybkvjsdbfkhvg4ut08yfrr");
    }

    #[test]
    fn short() {
        inverse("ahhd");
        inverse("ahd");
        inverse("x-29");
        inverse("x");
        inverse("k");
        inverse(".");
        inverse("ajsdh");
    }

    #[test]
    fn empty_string() {
        inverse("");
    }

    #[test]
    fn nulls() {
        inverse("\0\0\0\0\0\0\0\0\0\0\0\0\0");
    }

    #[test]
    fn compression_works_with_lz_transform() {
        let s = "The Read trait allows for reading bytes from a source. Implementors of the Read trait are called 'readers'. Readers are defined by one required method, read().".repeat(4);
        let cfg = Config::default()
            .with_transform("LZ")
            .with_entropy("NONE");
        let decompressed = roundtrip(s.as_bytes(), cfg.clone());
        assert_eq!(decompressed, s.as_bytes());

        let mut compressed = Vec::new();
        let mut out = CompressedOutputStream::new(&mut compressed, cfg).unwrap();
        out.write_all(s.as_bytes()).unwrap();
        out.close().unwrap();
        assert!(compressed.len() < s.len());
    }

    #[test]
    fn big_compression() {
        let mut s = Vec::with_capacity(2_000_000);

        for n in 0..2_000_000u32 {
            s.push((n as u8).wrapping_mul(0xA).wrapping_add(33) ^ 0xA2);
        }

        let cfg = Config::default().with_block_size(64 * 1024).with_jobs(4);
        assert_eq!(roundtrip(&s, cfg), s);
    }
}
