#![no_main]
use libfuzzer_sys::fuzz_target;
use parablock::{CompressedInputStream, CompressedOutputStream, Config};
use std::io::{Cursor, Read, Write};

// Default config (NONE transform, NONE entropy, checksum on, jobs=1) must
// round-trip arbitrary input byte-for-byte.
fuzz_target!(|data: &[u8]| {
    let cfg = Config::default().with_block_size(1024);

    let mut compressed = Vec::new();
    {
        let mut out = CompressedOutputStream::new(&mut compressed, cfg.clone()).unwrap();
        out.write_all(data).unwrap();
        out.close().unwrap();
    }

    let mut decompressed = Vec::new();
    let mut input = CompressedInputStream::new(Cursor::new(compressed), cfg).unwrap();
    input
        .read_to_end(&mut decompressed)
        .expect("failed to decompress data this crate just compressed");

    assert_eq!(data, decompressed.as_slice());
});
