use symphonia_core::audio::Channels;
use symphonia_core::codecs::CodecParameters;
use symphonia_core::errors::{seek_error, Error, Result, SeekErrorKind};
use symphonia_core::formats::{
    Cue, FormatOptions, FormatReader, Packet, SeekMode, SeekTo, SeekedTo, Track,
};
use symphonia_core::io::{MediaSourceStream, ReadBytes};
use symphonia_core::meta::{Metadata, MetadataLog};
use symphonia_core::probe::{Descriptor, Instantiate, QueryDescriptor};
use symphonia_core::support_format;
use symphonia_core::units::TimeBase;

use crate::codec::{AmrVariant, AMRWB_MIME_MAGIC, AMR_MIME_MAGIC};
use crate::rtp::FrameHeader;

/// Speech bytes following a storage frame header, RFC 4867 section 5.3
fn payload_size(variant: AmrVariant, hdr: FrameHeader) -> Option<usize> {
    match hdr.frame_type() {
        // SPEECH_LOST and NO_DATA carry no speech bits
        14 | 15 => Some(0),
        ft => variant.bit_length_for(ft).map(|bits| (bits + 7) / 8),
    }
}

/// AMR and AMR-WB storage format reader.
///
/// Single channel files only. The variant is taken from the magic header and
/// every packet holds one frame, header byte included.
pub struct AmrStorageReader {
    reader: MediaSourceStream,
    variant: AmrVariant,
    tracks: Vec<Track>,
    cues: Vec<Cue>,
    metadata: MetadataLog,
    frame_idx: u64,
}

impl AmrStorageReader {
    pub fn variant(&self) -> AmrVariant {
        self.variant
    }
}

impl QueryDescriptor for AmrStorageReader {
    fn query() -> &'static [Descriptor] {
        &[support_format!(
            "amr",
            "Adaptive Multi-Rate Storage Format",
            &["amr", "awb"],
            &["audio/AMR", "audio/AMR-WB"],
            &[AMR_MIME_MAGIC, AMRWB_MIME_MAGIC]
        )]
    }

    fn score(_context: &[u8]) -> u8 {
        255
    }
}

impl FormatReader for AmrStorageReader {
    fn try_new(mut source: MediaSourceStream, _options: &FormatOptions) -> Result<Self> {
        let mut magic = source
            .read_boxed_slice_exact(AMR_MIME_MAGIC.len())?
            .into_vec();
        if magic != AMR_MIME_MAGIC {
            let rem = AMRWB_MIME_MAGIC.len() - AMR_MIME_MAGIC.len();
            magic.extend_from_slice(&source.read_boxed_slice_exact(rem)?);
        }
        let variant = match AmrVariant::from_magic(&magic) {
            Some(variant) => variant,
            None => return Err(Error::DecodeError("Invalid AMR MIME header")),
        };

        let mut codec_params = CodecParameters::new();
        codec_params.codec = variant.codec_type();
        codec_params
            .with_sample_rate(variant.sample_rate())
            .with_time_base(TimeBase::new(1, variant.sample_rate()))
            .with_channels(Channels::FRONT_CENTRE);

        Ok(Self {
            reader: source,
            variant,
            tracks: vec![Track::new(0, codec_params)],
            cues: Default::default(),
            metadata: Default::default(),
            frame_idx: 0,
        })
    }

    fn next_packet(&mut self) -> Result<Packet> {
        let hdr = FrameHeader(self.reader.read_byte()?);
        let size = match payload_size(self.variant, hdr) {
            Some(size) => size,
            None => return Err(Error::DecodeError("Invalid AMR frame type")),
        };

        let mut data = Vec::with_capacity(1 + size);
        data.push(hdr.0);
        if size > 0 {
            data.extend_from_slice(&self.reader.read_boxed_slice_exact(size)?);
        }

        let dur = self.variant.samples_per_frame();
        let pkt = Packet::new_from_boxed_slice(
            0,
            self.frame_idx * dur,
            dur,
            data.into_boxed_slice(),
        );
        self.frame_idx += 1;

        Ok(pkt)
    }

    fn metadata(&mut self) -> Metadata<'_> {
        self.metadata.metadata()
    }

    fn cues(&self) -> &[Cue] {
        &self.cues
    }

    fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn seek(&mut self, _mode: SeekMode, _to: SeekTo) -> Result<SeekedTo> {
        seek_error(SeekErrorKind::Unseekable)
    }

    fn into_inner(self: Box<Self>) -> MediaSourceStream {
        self.reader
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, ErrorKind};

    use symphonia_core::io::MediaSourceStreamOptions;

    use super::*;
    use crate::{StorageWriter, CODEC_TYPE_AMRWB};

    fn open(data: Vec<u8>) -> Result<AmrStorageReader> {
        let mss = MediaSourceStream::new(
            Box::new(Cursor::new(data)),
            MediaSourceStreamOptions::default(),
        );
        AmrStorageReader::try_new(mss, &FormatOptions::default())
    }

    fn is_eof(res: Result<Packet>) -> bool {
        matches!(res, Err(Error::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof)
    }

    #[test]
    fn test_read_written_frames() {
        // FT=2 and FT=9 (SID) AMR-WB payloads, Q=1, speech bits all zero
        let mut p1 = vec![0u8; (10 + 253 + 7) / 8];
        p1[0] = 0xf1;
        p1[1] = 0x40;
        let mut p2 = vec![0u8; (10 + 40 + 7) / 8];
        p2[0] = 0xf4;
        p2[1] = 0xc0;

        let mut writer = StorageWriter::begin(AmrVariant::WideBand, Vec::<u8>::new()).unwrap();
        writer.submit(&p1).unwrap();
        writer.submit(&p2).unwrap();
        let out = writer.finish().unwrap();

        let mut reader = open(out).unwrap();
        assert_eq!(reader.variant(), AmrVariant::WideBand);
        assert_eq!(reader.tracks().len(), 1);
        assert_eq!(reader.tracks()[0].codec_params.codec, CODEC_TYPE_AMRWB);
        assert_eq!(reader.tracks()[0].codec_params.sample_rate, Some(16000));

        let pkt = reader.next_packet().unwrap();
        assert_eq!(pkt.buf().len(), 1 + 32);
        assert_eq!(FrameHeader(pkt.buf()[0]).frame_type(), 2);
        assert_eq!(pkt.ts(), 0);
        assert_eq!(pkt.dur(), 320);

        let pkt = reader.next_packet().unwrap();
        assert_eq!(pkt.buf().len(), 1 + 5);
        assert_eq!(FrameHeader(pkt.buf()[0]).frame_type(), 9);
        assert!(FrameHeader(pkt.buf()[0]).quality());
        assert_eq!(pkt.ts(), 320);

        assert!(is_eof(reader.next_packet()));
    }

    #[test]
    fn test_no_data_frame() {
        let mut data = b"#!AMR\n".to_vec();
        data.push(FrameHeader::new(15, true).0);
        data.push(FrameHeader::new(8, true).0);
        data.extend_from_slice(&[0xaa; 5]);

        let mut reader = open(data).unwrap();
        assert_eq!(reader.variant(), AmrVariant::NarrowBand);
        assert_eq!(reader.next_packet().unwrap().buf(), &[0x7c]);
        let pkt = reader.next_packet().unwrap();
        assert_eq!(pkt.buf().len(), 6);
        assert_eq!(pkt.ts(), 160);
        assert!(is_eof(reader.next_packet()));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            open(b"#!AMR_MC1.0\n".to_vec()),
            Err(Error::DecodeError(_))
        ));

        let mut data = b"#!AMR\n".to_vec();
        data.push(FrameHeader::new(12, true).0);
        let mut reader = open(data).unwrap();
        assert!(matches!(reader.next_packet(), Err(Error::DecodeError(_))));
    }
}
