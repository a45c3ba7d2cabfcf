pub mod codec;
mod error;
pub mod format;
pub mod rtp;
pub mod storage;

pub use codec::{bit_length_for, AmrVariant, CODEC_TYPE_AMR, CODEC_TYPE_AMRWB};
pub use error::{Error, Result};
pub use format::AmrStorageReader;
pub use rtp::{transcode, FrameHeader, ParsedHeader, StorageFrame, Transcoded};
pub use storage::{Stats, StorageWriter};

const AMR_SAMPLE_RATE: u32 = 8000;
const AMR_BUFFER_SIZE: u64 = AMR_SAMPLE_RATE as u64 / 50;
const AMRWB_SAMPLE_RATE: u32 = 16000;
const AMRWB_BUFFER_SIZE: u64 = AMRWB_SAMPLE_RATE as u64 / 50;
