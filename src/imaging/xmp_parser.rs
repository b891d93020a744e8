//! Minimal XMP reader for JPEG files.
//!
//! XMP is an RDF/XML packet stored in an APP1 segment that starts with the
//! Adobe namespace header. Two properties are read:
//!
//! - `dc:title`: the first `rdf:li` of the language alternative
//! - `Iptc4xmpExt:PersonInImage`: every `rdf:li` of the bag
//!
//! This is a string scanner, not an XML parser: it understands exactly the
//! element layout Lightroom, Capture One and exiftool write.
//!
//! ## Known limitations
//!
//! - The attribute form (`<rdf:Description dc:title="...">`) and
//!   self-closing `<dc:title/>` are not read; the property comes back empty.
//! - An `rdf:li` holding nested markup yields the raw inner text, tags
//!   included, after entity unescaping.
//! - Only the first occurrence of each property in the packet is read, and
//!   the `xml:lang` of title alternatives is ignored.

use super::jpeg_segments::{APP1, segments_with_marker};

const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpData {
    pub title: Option<String>,
    pub people: Vec<String>,
}

/// Read XMP properties from JPEG bytes. Missing packet → default.
pub fn read_xmp_from_jpeg(data: &[u8]) -> XmpData {
    segments_with_marker(data, APP1)
        .into_iter()
        .find_map(|seg| seg.strip_prefix(XMP_HEADER))
        .map(|packet| parse_xmp_packet(&String::from_utf8_lossy(packet)))
        .unwrap_or_default()
}

fn parse_xmp_packet(xml: &str) -> XmpData {
    XmpData {
        title: element_body(xml, "dc:title")
            .and_then(|body| list_items(body).into_iter().next()),
        people: element_body(xml, "Iptc4xmpExt:PersonInImage")
            .map(list_items)
            .unwrap_or_default(),
    }
}

/// Text between `<name ...>` and `</name>`.
fn element_body<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}");
    let close = format!("</{name}>");

    let start = xml.find(&open)?;
    let after_open = &xml[start + open.len()..];
    // Reject longer element names sharing the prefix
    if !after_open.starts_with(['>', ' ', '\t', '\r', '\n']) {
        return None;
    }
    let body_start = after_open.find('>')? + 1;
    let body = &after_open[body_start..];
    let end = body.find(&close)?;
    Some(&body[..end])
}

/// Trimmed, unescaped, non-empty texts of every `<rdf:li>` in `body`.
fn list_items(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("<rdf:li") {
        let after = &rest[start..];
        let Some(gt) = after.find('>') else { break };
        let content = &after[gt + 1..];
        let Some(end) = content.find("</rdf:li>") else {
            break;
        };
        let text = unescape(content[..end].trim());
        if !text.is_empty() {
            items.push(text);
        }
        rest = &content[end..];
    }
    items
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) fn build_app1_payload(title: Option<&str>, people: &[&str]) -> Vec<u8> {
    let mut xml = String::from(
        "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF><rdf:Description rdf:about=\"\">",
    );
    if let Some(title) = title {
        xml.push_str(&format!(
            "<dc:title><rdf:Alt><rdf:li xml:lang=\"x-default\">{title}</rdf:li></rdf:Alt></dc:title>"
        ));
    }
    if !people.is_empty() {
        xml.push_str("<Iptc4xmpExt:PersonInImage><rdf:Bag>");
        for p in people {
            xml.push_str(&format!("<rdf:li>{p}</rdf:li>"));
        }
        xml.push_str("</rdf:Bag></Iptc4xmpExt:PersonInImage>");
    }
    xml.push_str("</rdf:Description></rdf:RDF></x:xmpmeta>");

    let mut payload = XMP_HEADER.to_vec();
    payload.extend_from_slice(xml.as_bytes());
    payload
}
