// Content sniffing for extracted archive members
//
// Classification is by signature, never by file name alone: a member is a
// PNG if it starts with the PNG signature, an SVG if it is XML markup with an
// <svg> element near the top (optionally gzip-compressed), and a reference if
// it is short UTF-8 text without control characters.

use flate2::read::GzDecoder;
use std::fmt;
use std::io::Read;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// How far into a document the `<svg` tag is searched for
const SVG_PROBE_LEN: usize = 1024;

/// Longest member content still considered a reference to another member
pub const REFERENCE_TEXT_LIMIT: usize = 4096;

/// Image formats the thumbnailer can render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Svg,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Svg => "image/svg+xml",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageKind::Png => "PNG",
            ImageKind::Svg => "SVG",
        })
    }
}

/// What an extracted member turned out to be
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Image(ImageKind),
    /// Text naming another member (a symlink target or a pointer file)
    Reference(String),
    /// No bytes, or only whitespace
    Empty,
    Unknown,
}

/// Classify the bytes of an extracted member.
pub fn classify(data: &[u8]) -> Content {
    if data.starts_with(&PNG_SIGNATURE) {
        return Content::Image(ImageKind::Png);
    }
    if is_svg(data) || is_svgz(data) {
        return Content::Image(ImageKind::Svg);
    }
    if data.iter().all(u8::is_ascii_whitespace) {
        return Content::Empty;
    }
    match reference_target(data) {
        Some(target) => Content::Reference(target),
        None => Content::Unknown,
    }
}

/// Plain-text SVG: markup at the start and an `<svg` tag within the probe
/// window, compared case-insensitively.
fn is_svg(data: &[u8]) -> bool {
    let data = data.strip_prefix(&UTF8_BOM).unwrap_or(data);
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let data = &data[start..];
    if !data.starts_with(b"<") {
        return false;
    }

    let probe = &data[..data.len().min(SVG_PROBE_LEN)];
    probe
        .windows(4)
        .any(|window| window.eq_ignore_ascii_case(b"<svg"))
}

/// Gzip-compressed SVG (.svgz); only the head of the stream is inflated.
fn is_svgz(data: &[u8]) -> bool {
    if !data.starts_with(&GZIP_MAGIC) {
        return false;
    }
    let mut head = Vec::with_capacity(SVG_PROBE_LEN);
    match GzDecoder::new(data)
        .take(SVG_PROBE_LEN as u64)
        .read_to_end(&mut head)
    {
        Ok(_) => is_svg(&head),
        Err(e) => {
            log::debug!("gzip member could not be inflated: {}", e);
            false
        }
    }
}

/// The member name a blob refers to, if it looks like one.
///
/// Any short UTF-8 text is a name once surrounding whitespace is trimmed,
/// spaces and non-ASCII letters included. Control characters (NUL, DEL,
/// embedded line breaks) mark the blob as binary.
pub fn reference_target(data: &[u8]) -> Option<String> {
    if data.is_empty() || data.len() > REFERENCE_TEXT_LIMIT {
        return None;
    }

    let text = std::str::from_utf8(data).ok()?.trim();
    if text.is_empty() || text.chars().any(char::is_control) {
        return None;
    }
    Some(text.to_string())
}
