use thiserror::Error;

use crate::bitio::BitStreamError;

#[derive(Error, Debug)]
pub enum EntropyError {
    #[error("unknown entropy coder: {0}")]
    UnknownEntropy(String),

    #[error("unknown entropy coder code: {0}")]
    UnknownEntropyCode(u8),

    #[error(transparent)]
    BitStream(#[from] BitStreamError),
}
