//! RTP payload sources, yielding one raw payload per packet in capture order.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};

pub(crate) mod pcap;
mod rtp;
pub(crate) mod rtpdump;
mod text;

pub use pcap::PcapPayloads;
pub use rtpdump::RtpdumpPayloads;
pub use text::HexPayloads;

pub enum PayloadSource<R: Read> {
    Rtpdump(RtpdumpPayloads<R>),
    Pcap(PcapPayloads<R>),
    Hex(HexPayloads<R>),
}

impl<R: BufRead + Seek> PayloadSource<R> {
    /// Pick the source from the first bytes of `reader`.
    pub fn new(mut reader: R) -> Result<Self> {
        let head = reader.fill_buf()?;
        let is_rtpdump = head.starts_with(rtpdump::MAGIC);
        let is_pcap = pcap::MAGICS.iter().any(|m| head.starts_with(m));
        let is_pcapng = head.starts_with(pcap::NG_MAGIC);

        if is_rtpdump {
            Ok(Self::Rtpdump(RtpdumpPayloads::new(reader)?))
        } else if is_pcap {
            Ok(Self::Pcap(PcapPayloads::pcap(reader)?))
        } else if is_pcapng {
            Ok(Self::Pcap(PcapPayloads::pcapng(reader)?))
        } else {
            Ok(Self::Hex(HexPayloads::new(reader)))
        }
    }
}

impl<R: BufRead + Seek> Iterator for PayloadSource<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Rtpdump(payloads) => payloads.next(),
            Self::Pcap(payloads) => payloads.next(),
            Self::Hex(payloads) => payloads.next(),
        }
    }
}

pub fn open<P: AsRef<Path>>(path: P) -> Result<PayloadSource<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    PayloadSource::new(BufReader::new(file))
        .with_context(|| format!("Failed to read {}", path.display()))
}
