use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::header::StreamHeader;
use super::{Config, StreamError, SMALL_BLOCK_MASK, SMALL_BLOCK_SIZE};
use crate::bitio::BitWriter;
use crate::checksum::block_checksum;
use crate::entropy::{self, EntropyEncoder, NullEncoder, RiceEncoder};
use crate::listener::{BlockEvent, BlockEventKind, BlockListener};
use crate::transform::{self, TransformPipeline};

/// Smallest number of big-endian bytes that can hold `len`, in `[1, 4]`
/// (the mode byte only has two bits to spend on `dataSize - 1`).
fn size_bytes(len: usize) -> Option<u32> {
    for k in 1..=4u32 {
        if (len as u64) < (1u64 << (8 * k)) {
            return Some(k);
        }
    }
    None
}

/// One block's worth of work, carried from the accumulator to the wire.
///
/// Holds only borrowed/shared handles to the writer, the ordering counter
/// and the listener snapshot — the two buffers it owns (`data` and whatever
/// it produces) are the only state exclusive to this task.
struct EncodingTask<W: Write + Send> {
    block_id: u64,
    data: Vec<u8>,
    transform_code: u16,
    entropy_code: u8,
    checksum: bool,
    writer: Arc<Mutex<BitWriter<W>>>,
    processed_block_id: Arc<AtomicU64>,
    listeners: Arc<Vec<Arc<dyn BlockListener>>>,
}

impl<W: Write + Send> EncodingTask<W> {
    fn notify(&self, kind: BlockEventKind, size: usize, checksum: Option<u32>) {
        if self.listeners.is_empty() {
            return;
        }
        let event = BlockEvent {
            block_id: self.block_id,
            kind,
            size,
            checksum,
            hashing_enabled: self.checksum,
        };
        for l in self.listeners.iter() {
            l.on_block(event.clone());
        }
    }

    /// Small blocks are copied verbatim; everything else runs the transform
    /// pipeline and returns the mode byte's skip-mask/size-class bits along
    /// with the post-transform bytes.
    fn prepare(&self) -> Result<(u8, Vec<u8>, usize), StreamError> {
        if self.data.len() <= SMALL_BLOCK_SIZE {
            return Ok((
                SMALL_BLOCK_MASK | self.data.len() as u8,
                self.data.clone(),
                self.data.len(),
            ));
        }

        let stage = transform::by_code(self.transform_code)
            .map_err(|e| StreamError::ProcessBlock(self.block_id, e.to_string()))?;
        let pipeline = TransformPipeline::single(stage);
        let max_len = pipeline.max_encoded_len(self.data.len());
        let mut output = Vec::with_capacity(max_len);
        let mask = pipeline
            .forward(&self.data, &mut output)
            .map_err(|e| StreamError::ProcessBlock(self.block_id, format!("transform failed: {e}")))?;

        let post_len = output.len();
        let data_size = size_bytes(post_len).ok_or_else(|| {
            StreamError::ProcessBlock(self.block_id, "invalid post-transform length".to_string())
        })?;

        let mode = (mask << 2) | (data_size as u8 - 1);
        Ok((mode, output, post_len))
    }

    /// Ordering barrier: spins until this task's `block_id` is the next one
    /// allowed to touch the writer. Short waits (the common case — a sibling
    /// block just ahead in the pipeline) stay on CPU via `spin_loop`; once a
    /// wait runs long enough that the holder is plausibly blocked on its own
    /// transform or I/O, this falls back to `yield_now` so it stops pegging
    /// a core for no benefit.
    fn wait_for_turn(&self) {
        const SPIN_LIMIT: u32 = 1_000;
        let target = self.block_id - 1;
        let mut spins = 0u32;
        while self.processed_block_id.load(Ordering::Acquire) != target {
            if spins < SPIN_LIMIT {
                std::hint::spin_loop();
                spins += 1;
            } else {
                std::thread::yield_now();
            }
        }
    }

    /// Writes mode/length/checksum bits, then — for a normal (non-small)
    /// block — fires `BEFORE_ENTROPY` and dispatches to the entropy coder.
    fn write(
        &self,
        writer: &mut BitWriter<W>,
        mode: u8,
        payload: &[u8],
        recorded_len: usize,
        checksum: Option<u32>,
    ) -> Result<(), StreamError> {
        writer.write_bits(mode as u64, 8)?;

        if mode & SMALL_BLOCK_MASK == 0 {
            let data_size = (mode & 0x3) as u32 + 1;
            writer.write_bits(recorded_len as u64, data_size * 8)?;
        }

        if let Some(c) = checksum {
            writer.write_bits(c as u64, 32)?;
        }

        if mode & SMALL_BLOCK_MASK != 0 {
            for &b in payload {
                writer.write_bits(b as u64, 8)?;
            }
            return Ok(());
        }

        self.notify(BlockEventKind::BeforeEntropy, payload.len(), checksum);

        let written = match self.entropy_code {
            0 => NullEncoder::new(writer).encode(payload)?,
            1 => RiceEncoder::new(writer).encode(payload)?,
            other => {
                return Err(StreamError::ProcessBlock(
                    self.block_id,
                    format!("unknown entropy code {other}"),
                ))
            }
        };

        if written != payload.len() {
            let coder = entropy::name_for_code(self.entropy_code).unwrap_or("?");
            return Err(StreamError::ProcessBlock(
                self.block_id,
                format!("entropy coding failed ({coder})"),
            ));
        }

        Ok(())
    }

    /// Runs the full per-block pipeline (§4.3.2): checksum, transform,
    /// ordering barrier, write, unconditional barrier release.
    ///
    /// The barrier is always entered and `processed_block_id` is always
    /// incremented, even when `prepare` failed — a task that fails before
    /// ever touching the barrier still has to let block `id + 1` through,
    /// or the whole pipeline deadlocks on its spin-wait.
    fn run(self) -> Result<(), StreamError> {
        let checksum = if self.checksum {
            Some(block_checksum(&self.data))
        } else {
            None
        };

        self.notify(BlockEventKind::BeforeTransform, self.data.len(), checksum);

        let prepared = self.prepare();
        if let Ok((_, ref payload, _)) = prepared {
            self.notify(BlockEventKind::AfterTransform, payload.len(), checksum);
        }

        self.wait_for_turn();

        let write_result = match &prepared {
            Ok((mode, payload, recorded_len)) => {
                let mut writer = self.writer.lock().unwrap();
                self.write(&mut writer, *mode, payload, *recorded_len, checksum)
            }
            Err(_) => Ok(()),
        };

        self.processed_block_id.fetch_add(1, Ordering::Release);

        let (_, payload, _) = prepared?;
        write_result?;

        self.notify(BlockEventKind::AfterEntropy, payload.len(), checksum);
        Ok(())
    }
}

/// Segments writes into fixed-size blocks, pipelines each through a
/// transform and an entropy coder, and emits them to the underlying sink in
/// strict block-id order — fanning block processing out across
/// `config.jobs` worker threads when `jobs > 1`.
///
/// The shared [`BitWriter`] sits behind a [`Mutex`], but contention on that
/// lock is never the thing that serializes writers: only the task whose
/// `block_id` matches `processed_block_id + 1` ever attempts to take it, so
/// the mutex is held only by the one task allowed to proceed. Ordering comes
/// from the spin-wait on `processed_block_id`, not from lock acquisition
/// order.
pub struct CompressedOutputStream<W: Write + Send> {
    writer: Arc<Mutex<BitWriter<W>>>,
    config: Config,
    transform_code: u16,
    entropy_code: u8,
    header_written: bool,
    staging: Vec<u8>,
    next_block_id: u64,
    processed_block_id: Arc<AtomicU64>,
    listeners: Vec<Arc<dyn BlockListener>>,
    closed: bool,
    sticky_error: Option<String>,
}

impl<W: Write + Send> CompressedOutputStream<W> {
    pub fn new(sink: W, config: Config) -> Result<Self, StreamError> {
        config.validate()?;
        let transform_code = transform::by_name(&config.transform)?.code();
        let entropy_code = entropy::code_for_name(&config.entropy)?;

        Ok(CompressedOutputStream {
            writer: Arc::new(Mutex::new(BitWriter::new(sink)?)),
            config,
            transform_code,
            entropy_code,
            header_written: false,
            staging: Vec::new(),
            next_block_id: 0,
            processed_block_id: Arc::new(AtomicU64::new(0)),
            listeners: Vec::new(),
            closed: false,
            sticky_error: None,
        })
    }

    pub fn add_listener(&mut self, listener: Arc<dyn BlockListener>) {
        self.listeners.push(listener);
    }

    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    fn check_usable(&self) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::StreamClosed);
        }
        if let Some(msg) = &self.sticky_error {
            return Err(StreamError::ProcessBlock(0, msg.clone()));
        }
        Ok(())
    }

    fn ensure_header_written(&mut self) -> Result<(), StreamError> {
        if self.header_written {
            return Ok(());
        }
        let header = StreamHeader {
            checksum: self.config.checksum,
            entropy_code: self.entropy_code,
            transform_code: self.transform_code,
            block_size: self.config.block_size,
        };
        let mut writer = self.writer.lock().unwrap();
        header.write(&mut writer).map_err(|_| StreamError::WriteHeader)?;
        drop(writer);
        self.header_written = true;
        Ok(())
    }

    /// Partitions `data` into up to `config.jobs` blocks of `config.block_size`
    /// bytes (the last possibly short), assigns consecutive block ids and
    /// dispatches them — synchronously when `jobs == 1`, across a scoped
    /// thread per block otherwise.
    fn dispatch(&mut self, data: Vec<u8>) -> Result<(), StreamError> {
        if data.is_empty() {
            return Ok(());
        }

        self.ensure_header_written()?;

        let pieces: Vec<Vec<u8>> = data.chunks(self.config.block_size).map(|c| c.to_vec()).collect();
        let first_block_id = self.next_block_id;
        self.next_block_id += pieces.len() as u64;

        let listeners = Arc::new(self.listeners.clone());
        let checksum = self.config.checksum;
        let transform_code = self.transform_code;
        let entropy_code = self.entropy_code;
        let jobs = self.config.jobs;
        let writer_arc = Arc::clone(&self.writer);
        let processed_arc = Arc::clone(&self.processed_block_id);

        let make_task = |block_id: u64, piece: Vec<u8>| EncodingTask {
            block_id,
            data: piece,
            transform_code,
            entropy_code,
            checksum,
            writer: Arc::clone(&writer_arc),
            processed_block_id: Arc::clone(&processed_arc),
            listeners: Arc::clone(&listeners),
        };

        if jobs == 1 {
            for (i, piece) in pieces.into_iter().enumerate() {
                let task = make_task(first_block_id + i as u64 + 1, piece);
                task.run()?;
            }
            return Ok(());
        }

        let result: Result<(), StreamError> = std::thread::scope(|scope| {
            let handles: Vec<_> = pieces
                .into_iter()
                .enumerate()
                .map(|(i, piece)| {
                    let task = make_task(first_block_id + i as u64 + 1, piece);
                    scope.spawn(move || task.run())
                })
                .collect();

            let mut first_err = None;
            for h in handles {
                if let Err(e) = h.join().expect("encoding task panicked") {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
            match first_err {
                Some(e) => Err(e),
                None => Ok(()),
            }
        });

        result
    }

    fn drain_full_chunks(&mut self) -> Result<(), StreamError> {
        let chunk = self.config.block_size * self.config.jobs;
        while self.staging.len() >= chunk {
            let rest = self.staging.split_off(chunk);
            let ready = std::mem::replace(&mut self.staging, rest);
            self.dispatch(ready)?;
        }
        Ok(())
    }

    /// Flushes residual staged bytes, writes the end marker, then closes the
    /// underlying [`BitWriter`] (cascading a flush of the sink). Idempotent.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if self.closed {
            return Ok(());
        }

        let result = (|| -> Result<(), StreamError> {
            if !self.staging.is_empty() {
                let residual = std::mem::take(&mut self.staging);
                self.dispatch(residual)?;
            } else {
                self.ensure_header_written()?;
            }

            let mut writer = self.writer.lock().unwrap();
            writer.write_bits(SMALL_BLOCK_MASK as u64, 8)?;
            writer.close()?;
            Ok(())
        })();

        self.closed = true;
        result
    }
}

impl<W: Write + Send> Write for CompressedOutputStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_usable()?;
        self.staging.extend_from_slice(buf);
        if let Err(e) = self.drain_full_chunks() {
            self.sticky_error = Some(e.to_string());
            return Err(e.into());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::BlockEventKind;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn empty_stream_is_header_plus_end_marker() {
        let mut buf = Vec::new();
        let mut out = CompressedOutputStream::new(&mut buf, Config::default().with_checksum(false)).unwrap();
        out.close().unwrap();
        // 96 header bits + 8 end-marker bits = 104 bits -> 13 bytes.
        assert_eq!(buf.len(), 13);
        assert_eq!(buf[12], SMALL_BLOCK_MASK);
    }

    #[test]
    fn small_input_uses_passthrough_mode_byte() {
        let mut buf = Vec::new();
        let cfg = Config::default()
            .with_checksum(false)
            .with_transform("NONE")
            .with_entropy("NONE");
        let mut out = CompressedOutputStream::new(&mut buf, cfg).unwrap();
        out.write_all(b"ABC").unwrap();
        out.close().unwrap();

        // header(12 bytes) + mode(0x83) + "ABC" + end marker(0x80)
        assert_eq!(buf[12], 0x83);
        assert_eq!(&buf[13..16], b"ABC");
        assert_eq!(buf[16], SMALL_BLOCK_MASK);
    }

    #[test]
    fn listener_sees_every_block() {
        struct Counter(StdMutex<usize>);
        impl BlockListener for Counter {
            fn on_block(&self, event: BlockEvent) {
                if event.kind == BlockEventKind::AfterEntropy {
                    *self.0.lock().unwrap() += 1;
                }
            }
        }

        let counter = Arc::new(Counter(StdMutex::new(0)));
        let mut buf = Vec::new();
        let mut out = CompressedOutputStream::new(&mut buf, Config::default().with_block_size(1024)).unwrap();
        out.add_listener(counter.clone());
        out.write_all(&vec![7u8; 5000]).unwrap();
        out.close().unwrap();

        assert!(*counter.0.lock().unwrap() >= 1);
    }

    #[test]
    fn double_close_is_a_no_op() {
        let mut buf = Vec::new();
        let mut out = CompressedOutputStream::new(&mut buf, Config::default()).unwrap();
        out.close().unwrap();
        out.close().unwrap();
    }

    #[test]
    fn write_after_close_fails() {
        let mut buf = Vec::new();
        let mut out = CompressedOutputStream::new(&mut buf, Config::default()).unwrap();
        out.close().unwrap();
        assert!(out.write_all(b"x").is_err());
    }
}
