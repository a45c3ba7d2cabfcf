use std::io::{ErrorKind, Read};

use anyhow::{anyhow, bail, Result};
use etherparse::{SlicedPacket, TransportSlice};
use log::{debug, trace, warn};
use pcap_file::pcap::PcapReader;
use pcap_file::pcapng::{Block, PcapNgReader};
use pcap_file::{DataLink, PcapError};

use super::rtp::RtpPacket;

pub const MAGICS: &[&[u8]] = &[
    &[0xd4, 0xc3, 0xb2, 0xa1],
    &[0xa1, 0xb2, 0xc3, 0xd4],
    &[0x4d, 0x3c, 0xb2, 0xa1],
    &[0xa1, 0xb2, 0x3c, 0x4d],
];

/// Section header block type
pub const NG_MAGIC: &[u8] = &[0x0a, 0x0d, 0x0d, 0x0a];

enum Capture<R: Read> {
    Pcap(PcapReader<R>),
    PcapNg(PcapNgReader<R>),
}

impl<R: Read> Capture<R> {
    /// Next captured frame with the link type it was recorded on.
    fn next_frame(&mut self) -> Result<Option<(DataLink, Vec<u8>)>> {
        match self {
            Self::Pcap(reader) => {
                let datalink = reader.header().datalink;
                match reader.next_packet() {
                    Some(Ok(pkt)) => Ok(Some((datalink, pkt.data.into_owned()))),
                    Some(Err(e)) => Err(e.into()),
                    None => Ok(None),
                }
            }
            Self::PcapNg(reader) => loop {
                let (interface_id, data) = match reader.next_block() {
                    Some(Ok(Block::EnhancedPacket(epb))) => {
                        (epb.interface_id, epb.data.into_owned())
                    }
                    Some(Ok(Block::SimplePacket(spb))) => (0, spb.data.into_owned()),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(None),
                };
                let Some(idb) = reader.interfaces().get(interface_id as usize) else {
                    bail!("Packet on undeclared pcapng interface {}", interface_id);
                };
                return Ok(Some((idb.linktype, data)));
            },
        }
    }
}

/// Capture cut off in the middle of a record, as left by an interrupted tcpdump.
fn is_truncation(e: &anyhow::Error) -> bool {
    match e.downcast_ref::<PcapError>() {
        Some(PcapError::IncompleteBuffer) => true,
        Some(PcapError::IoError(e)) => e.kind() == ErrorKind::UnexpectedEof,
        _ => false,
    }
}

/// UDP datagram body of a captured frame. Ethernet (VLAN tagged or not),
/// Linux cooked and raw IP captures are understood.
fn udp_payload(datalink: DataLink, frame: &[u8]) -> Option<&[u8]> {
    let sliced = match datalink {
        DataLink::ETHERNET => SlicedPacket::from_ethernet(frame).ok()?,
        DataLink::RAW | DataLink::IPV4 | DataLink::IPV6 => SlicedPacket::from_ip(frame).ok()?,
        DataLink::LINUX_SLL => SlicedPacket::from_linux_sll(frame).ok()?,
        _ => return None,
    };
    match sliced.transport? {
        TransportSlice::Udp(udp) => Some(udp.payload()),
        _ => None,
    }
}

/// RTP payloads of a pcap or pcapng capture. Frames that do not carry an
/// RTP packet over UDP are skipped.
pub struct PcapPayloads<R: Read> {
    capture: Capture<R>,
    pkt_cnt: usize,
    done: bool,
}

impl<R: Read> PcapPayloads<R> {
    pub fn pcap(reader: R) -> Result<Self> {
        let reader =
            PcapReader::new(reader).map_err(|e| anyhow!("Failed to decode pcap header: {}", e))?;
        debug!("pcap capture, link type {:?}", reader.header().datalink);
        Ok(Self::with_capture(Capture::Pcap(reader)))
    }

    pub fn pcapng(reader: R) -> Result<Self> {
        let reader = PcapNgReader::new(reader)
            .map_err(|e| anyhow!("Failed to decode pcapng section header: {}", e))?;
        Ok(Self::with_capture(Capture::PcapNg(reader)))
    }

    fn with_capture(capture: Capture<R>) -> Self {
        Self {
            capture,
            pkt_cnt: 0,
            done: false,
        }
    }
}

impl<R: Read> Iterator for PcapPayloads<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let (datalink, frame) = match self.capture.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    if is_truncation(&e) {
                        warn!("packet {}: capture truncated", self.pkt_cnt);
                        return None;
                    }
                    return Some(Err(anyhow!("Failed to decode capture record: {}", e)));
                }
            };
            let idx = self.pkt_cnt;
            self.pkt_cnt += 1;

            let Some(udp) = udp_payload(datalink, &frame) else {
                debug!("packet {}: not UDP over {:?}, skip", idx, datalink);
                continue;
            };
            let Some(pkt) = RtpPacket::new(udp) else {
                debug!("packet {}: not an RTP packet, skip", idx);
                continue;
            };
            if pkt.is_rtcp() {
                debug!("packet {}: RTCP, skip", idx);
                continue;
            }
            match pkt.payload() {
                Some(payload) => {
                    trace!(
                        "packet {}: seq {}, pt {}, {} bytes",
                        idx,
                        pkt.seq(),
                        pkt.payload_type(),
                        payload.len()
                    );
                    return Some(Ok(payload.to_vec()));
                }
                None => debug!("packet {}: malformed RTP header, skip", idx),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::io::Cursor;

    use etherparse::PacketBuilder;

    use super::*;
    use crate::source::rtpdump::test::rtp_packet;

    /// FT=2 AMR-WB 12.65, Q=1, 253 speech bits of 0x33
    pub fn amrwb_1265_payload() -> Vec<u8> {
        let mut p = vec![0x33; 33];
        p[0] = 0xf1;
        p[1] = 0x73;
        p
    }

    fn ipv4_udp(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        PacketBuilder::ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(5004, 5006)
            .write(&mut out, payload)
            .unwrap();
        out
    }

    /// Ethernet II frame with one 802.1Q tag around an IPv4/UDP datagram
    pub fn vlan_frame(payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x02, 0, 0, 0, 0, 0x02, 0x02, 0, 0, 0, 0, 0x01];
        frame.extend_from_slice(&[0x81, 0x00, 0x00, 0x64, 0x08, 0x00]);
        frame.extend_from_slice(&ipv4_udp(payload));
        frame
    }

    /// Little-endian classic pcap, LINKTYPE_ETHERNET
    pub fn pcap_capture(frames: &[Vec<u8>]) -> Vec<u8> {
        let mut data = vec![0xd4, 0xc3, 0xb2, 0xa1, 2, 0, 4, 0];
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&65535u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        for (i, frame) in frames.iter().enumerate() {
            data.extend_from_slice(&1_700_000_000u32.to_le_bytes());
            data.extend_from_slice(&(i as u32 * 20_000).to_le_bytes());
            data.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            data.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            data.extend_from_slice(frame);
        }
        data
    }

    fn push_block(data: &mut Vec<u8>, block_type: u32, body: &[u8]) {
        let padded = (body.len() + 3) & !3;
        let total = (12 + padded) as u32;
        data.extend_from_slice(&block_type.to_le_bytes());
        data.extend_from_slice(&total.to_le_bytes());
        data.extend_from_slice(body);
        data.resize(data.len() + padded - body.len(), 0);
        data.extend_from_slice(&total.to_le_bytes());
    }

    /// Little-endian pcapng, one LINKTYPE_RAW interface
    fn pcapng_capture(packets: &[Vec<u8>]) -> Vec<u8> {
        let mut data = Vec::new();

        let mut shb = 0x1a2b3c4du32.to_le_bytes().to_vec();
        shb.extend_from_slice(&[1, 0, 0, 0]);
        shb.extend_from_slice(&(-1i64).to_le_bytes());
        push_block(&mut data, 0x0a0d0d0a, &shb);

        let mut idb = 101u16.to_le_bytes().to_vec();
        idb.extend_from_slice(&[0, 0]);
        idb.extend_from_slice(&65535u32.to_le_bytes());
        push_block(&mut data, 1, &idb);

        for pkt in packets {
            let mut epb = 0u32.to_le_bytes().to_vec();
            epb.extend_from_slice(&[0; 8]);
            epb.extend_from_slice(&(pkt.len() as u32).to_le_bytes());
            epb.extend_from_slice(&(pkt.len() as u32).to_le_bytes());
            epb.extend_from_slice(pkt);
            push_block(&mut data, 6, &epb);
        }
        data
    }

    #[test]
    fn test_vlan_capture() {
        let frames = vec![
            vlan_frame(&rtp_packet(1, &amrwb_1265_payload())),
            // DNS-looking datagram, version bits are 0
            vlan_frame(&[0x12, 0x34, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0, 0]),
            vlan_frame(&[0x81, 200, 0, 6, 1, 2, 3, 4, 0, 0, 0, 0]),
            vlan_frame(&rtp_packet(2, &amrwb_1265_payload())),
        ];

        let payloads = PcapPayloads::pcap(Cursor::new(pcap_capture(&frames)))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(payloads, vec![amrwb_1265_payload(), amrwb_1265_payload()]);
    }

    #[test]
    fn test_pcapng_raw_ip() {
        let packets = vec![
            ipv4_udp(&rtp_packet(1, &[0xf4, 0xc0, 0x01])),
            ipv4_udp(&rtp_packet(2, &[0xf2, 0x40])),
        ];

        let payloads = PcapPayloads::pcapng(Cursor::new(pcapng_capture(&packets)))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(payloads, vec![vec![0xf4, 0xc0, 0x01], vec![0xf2, 0x40]]);
    }

    #[test]
    fn test_truncated_capture() {
        let frames = vec![
            vlan_frame(&rtp_packet(1, &amrwb_1265_payload())),
            vlan_frame(&rtp_packet(2, &amrwb_1265_payload())),
        ];
        let mut data = pcap_capture(&frames);
        data.truncate(data.len() - 5);

        let payloads = PcapPayloads::pcap(Cursor::new(data))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(payloads, vec![amrwb_1265_payload()]);
    }

    #[test]
    fn test_invalid_header() {
        assert!(PcapPayloads::pcap(Cursor::new(vec![0xd4, 0xc3, 0xb2, 0xa1, 2, 0])).is_err());
    }
}
