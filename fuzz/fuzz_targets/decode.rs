#![no_main]
use libfuzzer_sys::fuzz_target;
use parablock::{CompressedInputStream, Config};
use std::io::{Cursor, Read};

// Arbitrary bytes fed straight into the decoder must never panic, only ever
// return a decode error or a (possibly empty) byte vector.
fuzz_target!(|data: &[u8]| {
    if let Ok(mut reader) = CompressedInputStream::new(Cursor::new(data), Config::default()) {
        let mut buf = vec![0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }
});
