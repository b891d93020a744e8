//! JPEG marker segment walker shared by the IPTC and XMP readers.
//!
//! Only the header region is scanned: walking stops at Start-Of-Scan (`0xDA`)
//! or End-Of-Image (`0xD9`), so entropy-coded image data is never touched.

/// APP1: EXIF and XMP.
pub const APP1: u8 = 0xE1;
/// APP13: Photoshop image resources (IPTC-IIM).
pub const APP13: u8 = 0xED;

/// Collect the payloads of every segment with the given marker.
///
/// Payload excludes the marker and the two length bytes. A truncated or
/// malformed header ends the walk with whatever was found so far.
pub fn segments_with_marker(data: &[u8], marker: u8) -> Vec<&[u8]> {
    let mut found = Vec::new();
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return found;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let current = data[pos + 1];
        match current {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // SOS / EOI: header is over
            0xDA | 0xD9 => break,
            // Markers without length field
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        if pos + 4 > data.len() {
            break;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 {
            break;
        }
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());
        if current == marker {
            found.push(&data[seg_start..seg_end]);
        }
        pos += 2 + seg_len;
    }

    found
}
