//! Minimal IPTC-IIM parser for JPEG files.
//!
//! Extracts three fields from IPTC Record 2:
//! - ObjectName (2:05): title
//! - Caption-Abstract (2:120): caption
//! - Keywords (2:25): repeatable, collected into a Vec
//!
//! IPTC lives in the APP13 marker as Photoshop 8BIM resource 0x0404.

use super::jpeg_segments::{APP13, segments_with_marker};

/// IPTC metadata extracted from an image file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IptcData {
    pub object_name: Option<String>,
    pub caption: Option<String>,
    pub keywords: Vec<String>,
}

/// Read IPTC metadata from JPEG bytes.
/// Returns default (empty) metadata when no IPTC block is present.
pub fn read_iptc_from_jpeg(data: &[u8]) -> IptcData {
    segments_with_marker(data, APP13)
        .into_iter()
        .find_map(extract_iptc_from_8bim)
        .map(parse_iptc_iim)
        .unwrap_or_default()
}

/// Big-endian reader over a byte slice. Every read is bounds-checked and
/// returns `None` past the end.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos.checked_add(n)?)
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes = self.peek(n)?;
        self.pos += n;
        Some(bytes)
    }

    fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

const IIM_TAG: u8 = 0x1C;
const APPLICATION_RECORD: u8 = 2;
const DATASET_OBJECT_NAME: u8 = 5;
const DATASET_KEYWORDS: u8 = 25;
const DATASET_CAPTION: u8 = 120;

/// Parse raw IPTC-IIM bytes into structured metadata.
///
/// Each dataset is `0x1C record dataset len_hi len_lo value...`. Bytes that
/// do not start a dataset are skipped until the next tag marker. A dataset
/// whose length runs past the end stops the parse.
fn parse_iptc_iim(data: &[u8]) -> IptcData {
    let mut result = IptcData::default();
    let mut cur = Cursor::new(data);

    while cur.remaining() >= 5 {
        if cur.u8() != Some(IIM_TAG) {
            continue;
        }
        let (Some(record), Some(dataset), Some(len)) = (cur.u8(), cur.u8(), cur.u16()) else {
            break;
        };
        let Some(raw) = cur.take(len as usize) else {
            break;
        };
        if record != APPLICATION_RECORD {
            continue;
        }

        let value = String::from_utf8_lossy(raw).trim().to_string();
        if value.is_empty() {
            continue;
        }
        match dataset {
            DATASET_OBJECT_NAME => result.object_name = Some(value),
            DATASET_KEYWORDS => result.keywords.push(value),
            DATASET_CAPTION => result.caption = Some(value),
            _ => {}
        }
    }

    result
}

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Find the IPTC-IIM block among the Photoshop image resources of an APP13
/// payload.
///
/// Resource layout: `8BIM`, a u16 id, a Pascal name padded to even length,
/// a u32 size, then the data padded to even length.
fn extract_iptc_from_8bim(segment: &[u8]) -> Option<&[u8]> {
    let mut cur = Cursor::new(segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment));

    while cur.remaining() >= 12 {
        if cur.peek(4) != Some(BIM_MARKER) {
            cur.skip(1);
            continue;
        }
        cur.skip(4);

        let id = cur.u16()?;
        let name_len = cur.u8()? as usize;
        // Length byte plus name, rounded up to even
        cur.skip(name_len + (name_len + 1) % 2);
        let size = cur.u32()? as usize;
        let body = cur.take(size)?;

        if id == IPTC_RESOURCE_ID {
            return Some(body);
        }
        cur.skip(size % 2);
    }

    None
}

/// Build an APP13 segment payload carrying the given IIM datasets.
///
/// Used by tests to fabricate tagged JPEGs.
#[cfg(test)]
pub(crate) fn build_app13_payload(datasets: &[(u8, &str)]) -> Vec<u8> {
    let mut iim = Vec::new();
    for (dataset, value) in datasets {
        iim.extend_from_slice(&[0x1C, 0x02, *dataset]);
        iim.extend_from_slice(&(value.len() as u16).to_be_bytes());
        iim.extend_from_slice(value.as_bytes());
    }

    let mut payload = PHOTOSHOP_HEADER.to_vec();
    payload.extend_from_slice(BIM_MARKER);
    payload.extend_from_slice(&IPTC_RESOURCE_ID.to_be_bytes());
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&(iim.len() as u32).to_be_bytes());
    payload.extend_from_slice(&iim);
    if iim.len() % 2 == 1 {
        payload.push(0);
    }
    payload
}
