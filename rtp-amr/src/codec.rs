use std::fmt;
use std::str::FromStr;

use symphonia_core::codecs::{decl_codec_type, CodecType};

use crate::error::Error;
use crate::{AMRWB_BUFFER_SIZE, AMRWB_SAMPLE_RATE, AMR_BUFFER_SIZE, AMR_SAMPLE_RATE};

pub const CODEC_TYPE_AMR: CodecType = decl_codec_type(b"amr");
pub const CODEC_TYPE_AMRWB: CodecType = decl_codec_type(b"amrwb");

pub const AMR_MIME_MAGIC: &[u8] = b"#!AMR\n";
pub const AMRWB_MIME_MAGIC: &[u8] = b"#!AMR-WB\n";

/// Speech bits per frame type index, 3GPP TS 26.101. Index 8 is AMR SID.
const AMR_PAYLOAD_BE_BIT_SIZES: &[usize] = &[95, 103, 118, 134, 148, 159, 204, 244, 39];
/// Speech bits per frame type index, 3GPP TS 26.201. Index 9 is AMR-WB SID.
const AMRWB_PAYLOAD_BE_BIT_SIZES: &[usize] = &[132, 177, 253, 285, 317, 365, 397, 461, 477, 40];

/// AMR codec variant, fixed for a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AmrVariant {
    #[default]
    NarrowBand,
    WideBand,
}

impl AmrVariant {
    /// Bit length table indexed by frame type.
    pub fn bit_sizes(&self) -> &'static [usize] {
        match self {
            Self::NarrowBand => AMR_PAYLOAD_BE_BIT_SIZES,
            Self::WideBand => AMRWB_PAYLOAD_BE_BIT_SIZES,
        }
    }

    /// Number of speech bits carried by `frame_type`, `None` for reserved or
    /// unsupported codes.
    pub fn bit_length_for(&self, frame_type: u8) -> Option<usize> {
        self.bit_sizes().get(frame_type as usize).copied()
    }

    /// Storage format file header, RFC 4867 section 5.1
    pub fn magic(&self) -> &'static [u8] {
        match self {
            Self::NarrowBand => AMR_MIME_MAGIC,
            Self::WideBand => AMRWB_MIME_MAGIC,
        }
    }

    pub fn from_magic(data: &[u8]) -> Option<Self> {
        if data.starts_with(AMR_MIME_MAGIC) {
            Some(Self::NarrowBand)
        } else if data.starts_with(AMRWB_MIME_MAGIC) {
            Some(Self::WideBand)
        } else {
            None
        }
    }

    pub fn codec_type(&self) -> CodecType {
        match self {
            Self::NarrowBand => CODEC_TYPE_AMR,
            Self::WideBand => CODEC_TYPE_AMRWB,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::NarrowBand => AMR_SAMPLE_RATE,
            Self::WideBand => AMRWB_SAMPLE_RATE,
        }
    }

    /// Samples covered by one 20ms frame
    pub fn samples_per_frame(&self) -> u64 {
        match self {
            Self::NarrowBand => AMR_BUFFER_SIZE,
            Self::WideBand => AMRWB_BUFFER_SIZE,
        }
    }
}

impl fmt::Display for AmrVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NarrowBand => f.write_str("nb"),
            Self::WideBand => f.write_str("wb"),
        }
    }
}

impl FromStr for AmrVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nb" => Ok(Self::NarrowBand),
            "wb" => Ok(Self::WideBand),
            _ => Err(Error::InvalidVariant(s.to_string())),
        }
    }
}

pub fn bit_length_for(variant: AmrVariant, frame_type: u8) -> Option<usize> {
    variant.bit_length_for(frame_type)
}
