#![no_main]
use libfuzzer_sys::fuzz_target;
use parablock::{CompressedInputStream, CompressedOutputStream, Config};
use std::io::{Cursor, Read, Write};

const TRANSFORMS: [&str; 3] = ["NONE", "RLE", "LZ"];
const ENTROPIES: [&str; 2] = ["NONE", "RICE"];

// Exercises every transform/entropy/jobs/checksum combination this crate
// ships against arbitrary payloads, picking the combination from the first
// three fuzz bytes so libFuzzer can still shrink and corpus-minimize freely.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let (header, payload) = data.split_at(3);

    let cfg = Config::default()
        .with_transform(TRANSFORMS[header[0] as usize % TRANSFORMS.len()])
        .with_entropy(ENTROPIES[header[1] as usize % ENTROPIES.len()])
        .with_checksum(header[2] & 1 != 0)
        .with_jobs(1 + (header[2] as usize >> 1) % 4)
        .with_block_size(1024);

    let mut compressed = Vec::new();
    {
        let mut out = CompressedOutputStream::new(&mut compressed, cfg.clone()).unwrap();
        out.write_all(payload).unwrap();
        out.close().unwrap();
    }

    let mut decompressed = Vec::new();
    let mut input = CompressedInputStream::new(Cursor::new(compressed), cfg).unwrap();
    input
        .read_to_end(&mut decompressed)
        .expect("failed to decompress data this crate just compressed");

    assert_eq!(payload, decompressed.as_slice());
});
