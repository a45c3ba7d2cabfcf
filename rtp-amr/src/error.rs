use thiserror::Error;

use crate::codec::AmrVariant;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported {variant} frame type {frame_type}")]
    UnsupportedFrameType { variant: AmrVariant, frame_type: u8 },
    #[error("Truncated payload, expecting {needed} bits, {available} remain")]
    TruncatedPayload { needed: usize, available: usize },
    #[error("Output unavailable: {0}")]
    SinkUnavailable(#[from] std::io::Error),
    #[error("Invalid AMR variant: {0}")]
    InvalidVariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
