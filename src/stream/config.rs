use super::{StreamError, MAX_BLOCK_SIZE, MAX_JOBS, MIN_BLOCK_SIZE, MIN_JOBS};
use crate::{entropy, transform};

/// Configuration shared by [`super::CompressedOutputStream`] and
/// [`super::CompressedInputStream`].
///
/// On the read side, the actual transform/entropy/block size in effect come
/// from the stream's own header — `transform`/`entropy`/`block_size` here
/// only matter for the write side. `jobs` applies to the write side only;
/// decoding a block's transform is inherently sequential with reading its
/// bytes off the wire, so there is no parallel decode path to size.
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) entropy: String,
    pub(crate) transform: String,
    pub(crate) block_size: usize,
    pub(crate) checksum: bool,
    pub(crate) jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            entropy: "NONE".to_string(),
            transform: "NONE".to_string(),
            block_size: 1024 * 1024,
            checksum: true,
            jobs: 1,
        }
    }
}

impl Config {
    pub fn with_entropy(mut self, name: &str) -> Self {
        self.entropy = name.to_string();
        self
    }

    pub fn with_transform(mut self, name: &str) -> Self {
        self.transform = name.to_string();
        self
    }

    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.checksum = enabled;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StreamError> {
        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err(StreamError::InvalidArgument(
                "block size must be between 1024 bytes and 1 GiB",
            ));
        }
        if self.block_size % 16 != 0 {
            return Err(StreamError::InvalidArgument(
                "block size must be a multiple of 16",
            ));
        }
        if self.jobs < MIN_JOBS || self.jobs > MAX_JOBS {
            return Err(StreamError::InvalidArgument("jobs must be between 1 and 16"));
        }

        transform::by_name(&self.transform)?;
        entropy::code_for_name(&self.entropy)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_undersized_block() {
        let cfg = Config::default().with_block_size(15);
        assert!(matches!(cfg.validate(), Err(StreamError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_block_size_not_multiple_of_16() {
        let cfg = Config::default().with_block_size(1025);
        assert!(matches!(cfg.validate(), Err(StreamError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_out_of_range_jobs() {
        assert!(Config::default().with_jobs(0).validate().is_err());
        assert!(Config::default().with_jobs(17).validate().is_err());
    }

    #[test]
    fn rejects_unknown_transform_or_entropy() {
        assert!(Config::default().with_transform("BWT").validate().is_err());
        assert!(Config::default().with_entropy("HUFFMAN").validate().is_err());
    }
}
