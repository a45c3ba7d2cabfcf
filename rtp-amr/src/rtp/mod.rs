//! RTP bandwidth-efficient payload to storage frame conversion, RFC 4867
//! sections 4.3 and 5.3.

use bitvec::prelude::*;

use crate::codec::AmrVariant;
use crate::error::{Error, Result};

/// CMR(4) F(1) FT(4) Q(1)
const BE_HEADER_BITS: usize = 10;

/// Header fields of a single-frame bandwidth-efficient payload.
///
/// ```text
///  0 1 2 3 4 5 6 7 8 9
/// +-+-+-+-+-+-+-+-+-+-+
/// |  CMR  |F|  FT   |Q|
/// +-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParsedHeader {
    /// Codec mode request, not used here
    pub cmr: u8,
    /// Followed by another speech frame, not used here
    pub followed: bool,
    pub frame_type: u8,
    pub quality: bool,
}

impl ParsedHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let bits = data.view_bits::<Msb0>();
        if bits.len() < BE_HEADER_BITS {
            return Err(Error::TruncatedPayload {
                needed: BE_HEADER_BITS,
                available: bits.len(),
            });
        }

        Ok(Self {
            cmr: bits[0..4].load_be::<u8>(),
            followed: bits[4],
            frame_type: bits[5..9].load_be::<u8>(),
            quality: bits[9],
        })
    }
}

/// Storage format frame header, `P | FT | Q | P P`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameHeader(pub u8);

impl FrameHeader {
    pub fn new(frame_type: u8, quality: bool) -> Self {
        Self(((frame_type & 0x0f) << 3) | ((quality as u8) << 2))
    }

    pub fn frame_type(&self) -> u8 {
        (self.0 >> 3) & 0b01111
    }

    pub fn quality(&self) -> bool {
        ((self.0 >> 2) & 0b1) == 1
    }
}

impl From<ParsedHeader> for FrameHeader {
    fn from(hdr: ParsedHeader) -> Self {
        Self::new(hdr.frame_type, hdr.quality)
    }
}

/// One octet-aligned storage frame, header byte followed by the speech bits
/// padded with zeros up to the next byte boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageFrame(Vec<u8>);

impl StorageFrame {
    pub fn new(hdr: FrameHeader, speech: &BitSlice<u8, Msb0>) -> Self {
        let mut data = vec![0u8; 1 + (speech.len() + 7) / 8];
        data[0] = hdr.0;
        data[1..].view_bits_mut::<Msb0>()[..speech.len()].copy_from_bitslice(speech);
        Self(data)
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader(self.0[0])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

/// Outcome of converting one RTP payload.
#[derive(Debug)]
pub enum Transcoded {
    Accepted(StorageFrame),
    /// Frame type has no entry in the codec table
    Skipped { frame_type: u8 },
    /// Payload ended before the declared header or speech bits
    Failed(Error),
}

impl Transcoded {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn into_frame(self) -> Option<StorageFrame> {
        match self {
            Self::Accepted(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn into_result(self, variant: AmrVariant) -> Result<StorageFrame> {
        match self {
            Self::Accepted(frame) => Ok(frame),
            Self::Skipped { frame_type } => Err(Error::UnsupportedFrameType {
                variant,
                frame_type,
            }),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Convert a single-frame bandwidth-efficient RTP payload into a storage
/// frame. Never panics on malformed input.
pub fn transcode(variant: AmrVariant, payload: &[u8]) -> Transcoded {
    let hdr = match ParsedHeader::parse(payload) {
        Ok(hdr) => hdr,
        Err(err) => return Transcoded::Failed(err),
    };

    let Some(bit_len) = variant.bit_length_for(hdr.frame_type) else {
        return Transcoded::Skipped {
            frame_type: hdr.frame_type,
        };
    };

    let bits = payload.view_bits::<Msb0>();
    let end = BE_HEADER_BITS + bit_len;
    if bits.len() < end {
        return Transcoded::Failed(Error::TruncatedPayload {
            needed: end,
            available: bits.len(),
        });
    }

    Transcoded::Accepted(StorageFrame::new(hdr.into(), &bits[BE_HEADER_BITS..end]))
}
