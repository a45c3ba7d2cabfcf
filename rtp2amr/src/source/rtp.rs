use byteorder::{BigEndian, ReadBytesExt};

const RTP_VERSION: u8 = 2;
const RTP_HEADER_SIZE: usize = 12;

/// RTP packet view, RFC 3550 section 5.1
#[derive(Clone, Copy, Debug)]
pub struct RtpPacket<'a>(&'a [u8]);

impl<'a> RtpPacket<'a> {
    pub fn new(data: &'a [u8]) -> Option<Self> {
        if data.len() < RTP_HEADER_SIZE || (data[0] >> 6) != RTP_VERSION {
            return None;
        }
        Some(Self(data))
    }

    pub fn padding(&self) -> bool {
        ((self.0[0] >> 5) & 1) == 1
    }

    pub fn extension(&self) -> bool {
        ((self.0[0] >> 4) & 1) == 1
    }

    pub fn csrc_count(&self) -> usize {
        (self.0[0] & 0x0f) as usize
    }

    pub fn payload_type(&self) -> u8 {
        self.0[1] & 0x7f
    }

    /// RTCP SR/RR/SDES/BYE/APP multiplexed on the RTP port, RFC 5761 section 4
    pub fn is_rtcp(&self) -> bool {
        (200..=204).contains(&self.0[1])
    }

    pub fn seq(&self) -> u16 {
        (&self.0[2..]).read_u16::<BigEndian>().unwrap_or_default()
    }

    /// Payload with CSRC list, header extension and padding removed. `None`
    /// when the header claims more bytes than the packet holds.
    pub fn payload(&self) -> Option<&'a [u8]> {
        let mut offset = RTP_HEADER_SIZE + 4 * self.csrc_count();
        if self.extension() {
            let mut ext_len = self.0.get(offset + 2..offset + 4)?;
            let words = ext_len.read_u16::<BigEndian>().ok()? as usize;
            offset += 4 + 4 * words;
        }

        let mut end = self.0.len();
        if self.padding() {
            end = end.checked_sub(*self.0.last()? as usize)?;
        }
        self.0.get(offset..end)
    }
}
