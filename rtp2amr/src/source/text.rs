use std::io::{BufRead, Lines};

use anyhow::Result;
use log::warn;

/// Payloads written as colon separated hex, one per line, as printed by
/// `tshark -T fields -e rtp.payload`.
pub struct HexPayloads<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> HexPayloads<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for HexPayloads<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let digits: String = line.trim().split(':').collect();
            if digits.is_empty() {
                continue;
            }
            match hex::decode(&digits) {
                Ok(payload) => return Some(Ok(payload)),
                Err(e) => warn!("line {}: skip, {}", self.line_no, e),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_hex_lines() {
        let text = "f2:40:aa\n\n  F0:44  \nzz:00\n0:1:2\n1f\r\n";
        let payloads = HexPayloads::new(Cursor::new(text))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(payloads, vec![vec![0xf2, 0x40, 0xaa], vec![0xf0, 0x44], vec![0x1f]]);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut payloads = HexPayloads::new(Cursor::new(vec![0xff, 0xfe, b'\n']));
        assert!(payloads.next().unwrap().is_err());
    }
}
