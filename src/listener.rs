//! Observability hook for block-level events.
//!
//! There is no metrics or logging crate wired into the block pipeline
//! itself; callers that want visibility into per-block progress register a
//! [`BlockListener`] instead. `processEvent`-style listener interfaces are
//! common in block compressors; this is the same seam expressed as a Rust
//! trait instead of a callback interface.

/// Which point in a block's pipeline a [`BlockEvent`] was fired from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockEventKind {
    BeforeTransform,
    AfterTransform,
    BeforeEntropy,
    AfterEntropy,
}

/// A single notification delivered to a [`BlockListener`].
///
/// `size` is the current size at this point in the pipeline (input size
/// pre-transform for `BeforeTransform`, output size post-transform for
/// `AfterTransform`, and so on).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockEvent {
    pub block_id: u64,
    pub kind: BlockEventKind,
    pub size: usize,
    pub checksum: Option<u32>,
    pub hashing_enabled: bool,
}

/// Receives notifications as blocks are processed.
///
/// Implementations must be `Send + Sync`: under `jobs > 1` the same listener
/// is shared across worker threads and notified concurrently, once per
/// completed block, in whatever order those blocks finish (not necessarily
/// the order they land on the wire).
pub trait BlockListener: Send + Sync {
    fn on_block(&self, event: BlockEvent);
}

/// The default listener: discards every event.
#[derive(Default, Clone, Copy)]
pub struct NullListener;

impl BlockListener for NullListener {
    fn on_block(&self, _event: BlockEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<BlockEvent>>);

    impl BlockListener for Recording {
        fn on_block(&self, event: BlockEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn sample_event() -> BlockEvent {
        BlockEvent {
            block_id: 0,
            kind: BlockEventKind::AfterTransform,
            size: 10,
            checksum: None,
            hashing_enabled: false,
        }
    }

    #[test]
    fn null_listener_drops_everything() {
        let l = NullListener;
        l.on_block(sample_event());
    }

    #[test]
    fn recording_listener_keeps_events() {
        let l = Recording(Mutex::new(Vec::new()));
        let mut event = sample_event();
        event.block_id = 3;
        l.on_block(event);
        let events = l.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].block_id, 3);
    }
}
