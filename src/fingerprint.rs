//! Content fingerprint over the catalogued metadata of a photo.
//!
//! The fingerprint decides whether an existing catalog row needs rewriting.
//! Keywords and people are sorted first so a tool that reorders them does not
//! trigger an update. FNV-1a 64 is a change detector, not a security hash.

use crate::types::Photo;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const SEPARATOR: char = '\u{1f}';

/// FNV-1a, 64-bit.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Fingerprint of the metadata fields of `photo`, as unsigned decimal.
///
/// `id`, `year`, `metadata_hash`, capture time and the timestamps do not
/// participate.
pub fn metadata_fingerprint(photo: &Photo) -> String {
    fnv1a64(canonical_form(photo).as_bytes()).to_string()
}

fn canonical_form(photo: &Photo) -> String {
    let mut keywords = photo.keywords.clone();
    keywords.sort();
    let mut people = photo.people.clone();
    people.sort();

    let fields = [
        photo.full_path.to_string_lossy().into_owned(),
        photo.file_name.clone(),
        photo.lens_make.clone(),
        photo.lens_model.clone(),
        photo.camera_make.clone(),
        photo.camera_model.clone(),
        keywords.join(","),
        people.join(","),
        photo.caption.clone(),
        photo.title.clone(),
        format!("{:E}", photo.latitude),
        format!("{:E}", photo.longitude),
        photo.width.to_string(),
        photo.height.to_string(),
    ];

    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(field);
    }
    out
}
