use std::io::{ErrorKind, Read, Seek};
use std::net::Ipv4Addr;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use binrw::{BinRead, BinResult};
use log::{debug, trace, warn};

use super::rtp::RtpPacket;

pub const MAGIC: &[u8] = b"#!rtpplay1.0 ";

const RD_HEADER_SIZE: usize = 8;

#[binrw::parser(reader)]
fn parse_src_ip() -> BinResult<Ipv4Addr> {
    let pos = reader.stream_position()?;
    let ip: &mut [u8] = &mut [0; 16];
    let mut len = 0;

    for c in ip.iter_mut() {
        let char = &mut [0];
        reader.read_exact(char)?;
        if char[0] == b'/' {
            break;
        }
        *c = char[0];
        len += 1;
    }

    Ipv4Addr::from_str(&String::from_utf8_lossy(&ip[..len])).map_err(|e| binrw::Error::Custom {
        pos,
        err: Box::new(e),
    })
}

#[binrw::parser(reader)]
fn parse_src_port() -> BinResult<u16> {
    let pos = reader.stream_position()?;
    let port: &mut [u8] = &mut [0; 6];
    let mut len = 0;

    for c in port.iter_mut() {
        let char = &mut [0];
        reader.read_exact(char)?;
        if char[0] == b'\n' {
            break;
        }
        *c = char[0];
        len += 1;
    }

    String::from_utf8_lossy(&port[..len])
        .parse::<u16>()
        .map_err(|e| binrw::Error::Custom {
            pos,
            err: Box::new(e),
        })
}

/// `#!rtpplay1.0 address/port\n` followed by RD_hdr_t
#[derive(BinRead, Clone, Copy, Debug)]
#[br(big, magic = b"#!rtpplay1.0 ")]
pub struct FileHeader {
    #[br(parse_with = parse_src_ip)]
    pub ip: Ipv4Addr,
    #[br(parse_with = parse_src_port)]
    pub port: u16,
    pub start_sec: u32,
    pub start_usec: u32,
    pub ip2: u32,
    pub port2: u16,
    pub padding: u16,
}

#[derive(BinRead, Clone, Copy, Debug, Default)]
#[br(big)]
pub struct RDPacket {
    /// length of packet, including this header (may be smaller than plen if not whole packet recorded)
    pub len: u16,
    /// actual header+payload length for RTP, 0 for RTCP
    pub org_len: u16,
    /// milliseconds since the start of recording
    pub offset: u32,
}

/// RTP payloads of an rtpdump file, RTCP records skipped.
pub struct RtpdumpPayloads<R> {
    reader: R,
    header: FileHeader,
    pkt_cnt: usize,
    done: bool,
}

impl<R: Read + Seek> RtpdumpPayloads<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let header = FileHeader::read(&mut reader)
            .map_err(|e| anyhow!("Failed to decode rtpdump header: {}", e))?;

        Ok(Self {
            reader,
            header,
            pkt_cnt: 0,
            done: false,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    fn read_record(&mut self) -> Result<Option<(RDPacket, Vec<u8>)>> {
        let rd = match RDPacket::read(&mut self.reader) {
            Ok(rd) => rd,
            Err(e) if e.is_eof() => return Ok(None),
            Err(e) => return Err(anyhow!("Failed to decode rtpdump record: {}", e)),
        };

        let body_len = (rd.len as usize)
            .checked_sub(RD_HEADER_SIZE)
            .ok_or_else(|| anyhow!("Invalid rtpdump record length {}", rd.len))?;
        let mut body = vec![0; body_len];
        match self.reader.read_exact(&mut body) {
            Ok(()) => Ok(Some((rd, body))),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!("record {}: truncated, {} bytes expected", self.pkt_cnt, body_len);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: Read + Seek> Iterator for RtpdumpPayloads<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let (rd, body) = match self.read_record() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let idx = self.pkt_cnt;
            self.pkt_cnt += 1;

            if rd.org_len == 0 {
                debug!("record {}: RTCP, skip", idx);
                continue;
            }
            let Some(pkt) = RtpPacket::new(&body) else {
                debug!("record {}: not an RTP packet, skip", idx);
                continue;
            };
            match pkt.payload() {
                Some(payload) => {
                    trace!(
                        "record {}: seq {}, pt {}, {} bytes",
                        idx,
                        pkt.seq(),
                        pkt.payload_type(),
                        payload.len()
                    );
                    return Some(Ok(payload.to_vec()));
                }
                None => debug!("record {}: malformed RTP header, skip", idx),
            }
        }
    }
}
