use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use crate::codec::AmrVariant;
use crate::error::Result;
use crate::rtp::{transcode, ParsedHeader, Transcoded};

/// Per writer frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub accepted: usize,
    pub skipped: usize,
    pub truncated: usize,
    /// Accepted payloads with the F bit set, only their first frame is kept
    pub followed: usize,
    /// Skipped payloads per frame type index
    pub skipped_types: [usize; 16],
}

impl Stats {
    pub fn submitted(&self) -> usize {
        self.accepted + self.skipped + self.truncated
    }

    /// `(frame_type, count)` of every frame type that was skipped at least once
    pub fn skipped_frame_types(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.skipped_types
            .iter()
            .enumerate()
            .filter(|(_, cnt)| **cnt > 0)
            .map(|(ft, cnt)| (ft as u8, *cnt))
    }
}

/// AMR storage format writer.
///
/// Owns the output sink for a whole run. The magic header is written once by
/// [`StorageWriter::begin`], then every accepted payload appends exactly one
/// frame, in submission order.
pub struct StorageWriter<W: Write> {
    sink: W,
    variant: AmrVariant,
    stats: Stats,
}

impl StorageWriter<BufWriter<File>> {
    /// Create or truncate `path` and write the magic header into it.
    pub fn create<P: AsRef<Path>>(variant: AmrVariant, path: P) -> Result<Self> {
        let file = File::create(path)?;
        Self::begin(variant, BufWriter::new(file))
    }
}

impl<W: Write> StorageWriter<W> {
    pub fn begin(variant: AmrVariant, mut sink: W) -> Result<Self> {
        sink.write_all(variant.magic())?;
        Ok(Self {
            sink,
            variant,
            stats: Stats::default(),
        })
    }

    /// Convert one RTP payload and append the frame if it is accepted.
    ///
    /// Skipped and truncated payloads are dropped. Only a failing sink is
    /// returned as an error.
    pub fn submit(&mut self, payload: &[u8]) -> Result<Transcoded> {
        let idx = self.stats.submitted();
        let transcoded = transcode(self.variant, payload);
        match &transcoded {
            Transcoded::Accepted(frame) => {
                self.sink.write_all(frame.as_bytes())?;
                self.stats.accepted += 1;
                if ParsedHeader::parse(payload).is_ok_and(|hdr| hdr.followed) {
                    debug!("payload {}: F bit set, following frames dropped", idx);
                    self.stats.followed += 1;
                }
            }
            Transcoded::Skipped { frame_type } => {
                debug!("payload {}: skip {} frame type {}", idx, self.variant, frame_type);
                self.stats.skipped += 1;
                self.stats.skipped_types[(*frame_type & 0x0f) as usize] += 1;
            }
            Transcoded::Failed(err) => {
                warn!("payload {}: drop, {}", idx, err);
                self.stats.truncated += 1;
            }
        }
        Ok(transcoded)
    }

    pub fn variant(&self) -> AmrVariant {
        self.variant
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}
