// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MIME `multipart/related` reader and writer (MTOM and SwA packaging).
//!
//! Parts are binary-safe: bodies are delimited only by the boundary line,
//! and only the `binary`, `8bit` and `7bit` transfer encodings are accepted.

use super::content_type::MediaType;
use crate::config::MIME_MULTIPART_RELATED;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Fresh boundary string, unique within the process.
pub fn new_boundary() -> String {
    let n = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("uuid:hsoap-{:08x}-{:06x}", nanos, n)
}

/// One part of a multipart package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    /// Content-ID without angle brackets.
    pub content_id: Option<String>,
    /// Content-Type header value.
    pub content_type: String,
    /// Raw body.
    pub body: Vec<u8>,
}

impl MimePart {
    /// Create a part.
    pub fn new(
        content_id: Option<String>,
        content_type: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content_id,
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

/// Parsed or outgoing `multipart/related` package.
#[derive(Debug, Clone)]
pub struct MimeMultipart {
    boundary: String,
    start: Option<String>,
    parts: Vec<MimePart>,
}

impl MimeMultipart {
    /// Empty package with a fresh boundary.
    pub fn new() -> Self {
        Self {
            boundary: new_boundary(),
            start: None,
            parts: Vec::new(),
        }
    }

    /// Boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Append a part; the first part added becomes the root.
    pub fn add_part(&mut self, part: MimePart) {
        if self.parts.is_empty() {
            self.start = part.content_id.clone();
        }
        self.parts.push(part);
    }

    /// All parts in wire order.
    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }

    /// Root part: the one named by `start`, else the first.
    pub fn root_part(&self) -> Option<&MimePart> {
        if let Some(start) = &self.start {
            if let Some(p) = self
                .parts
                .iter()
                .find(|p| p.content_id.as_deref() == Some(start.as_str()))
            {
                return Some(p);
            }
        }
        self.parts.first()
    }

    /// Every part except the root, in wire order.
    pub fn attachment_parts(&self) -> impl Iterator<Item = &MimePart> {
        let root = self.root_part();
        self.parts
            .iter()
            .filter(move |p| !root.is_some_and(|r| std::ptr::eq(*p, r)))
    }

    /// `Content-Type` header value for this package.
    ///
    /// `root_type` goes into the `type` parameter; `extra` parameters
    /// (already formatted as `name="value"`) are appended.
    pub fn content_type(&self, root_type: &str, extra: &[String]) -> String {
        let mut ct = format!(
            "{}; type=\"{}\"; boundary=\"{}\"",
            MIME_MULTIPART_RELATED, root_type, self.boundary
        );
        if let Some(start) = &self.start {
            ct.push_str(&format!("; start=\"<{}>\"", start));
        }
        for param in extra {
            ct.push_str("; ");
            ct.push_str(param);
        }
        ct
    }

    /// Write the package body.
    pub fn write(&self, out: &mut Vec<u8>) {
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            out.extend_from_slice(format!("Content-Type: {}\r\n", part.content_type).as_bytes());
            out.extend_from_slice(b"Content-Transfer-Encoding: binary\r\n");
            if let Some(cid) = &part.content_id {
                out.extend_from_slice(format!("Content-ID: <{}>\r\n", cid).as_bytes());
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.body);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
    }

    /// Parse a package given its `Content-Type` header.
    pub fn parse(input: &[u8], content_type: &str) -> Result<Self> {
        let media = MediaType::parse(content_type)?;
        if media.base != MIME_MULTIPART_RELATED {
            return Err(Error::UnsupportedMediaType(Some(content_type.to_string())));
        }
        let boundary = media
            .param("boundary")
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::Malformed("multipart content type without boundary".into()))?
            .to_string();
        let start = media
            .param("start")
            .map(|s| s.trim_start_matches('<').trim_end_matches('>').to_string());

        let delimiter = format!("--{}", boundary);
        let delimiter = delimiter.as_bytes();

        let mut pos = find_delimiter(input, delimiter, 0)
            .ok_or_else(|| Error::Malformed("multipart boundary not found".into()))?;
        let mut parts = Vec::new();

        loop {
            pos += delimiter.len();
            if input[pos..].starts_with(b"--") {
                break;
            }
            pos = skip_line_break(input, pos)
                .ok_or_else(|| Error::Malformed("malformed boundary line".into()))?;

            let next = find_delimiter(input, delimiter, pos)
                .ok_or_else(|| Error::Malformed("unterminated multipart part".into()))?;
            let mut end = next;
            // The line break before the delimiter belongs to the delimiter.
            if end > pos && input[end - 1] == b'\n' {
                end -= 1;
                if end > pos && input[end - 1] == b'\r' {
                    end -= 1;
                }
            }
            parts.push(parse_part(&input[pos..end])?);
            pos = next;
        }

        if parts.is_empty() {
            return Err(Error::Malformed("multipart package without parts".into()));
        }
        log::debug!("[mime] parsed {} parts (start={:?})", parts.len(), start);
        Ok(Self {
            boundary,
            start,
            parts,
        })
    }
}

impl Default for MimeMultipart {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Next delimiter starting a line: at the start of the body or right after LF.
fn find_delimiter(input: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut at = from;
    loop {
        let p = find(input, delimiter, at)?;
        if p == 0 || input[p - 1] == b'\n' {
            return Some(p);
        }
        at = p + 1;
    }
}

fn skip_line_break(input: &[u8], pos: usize) -> Option<usize> {
    let rest = &input[pos..];
    // Transport padding may precede the line break.
    let ws = rest.iter().take_while(|b| **b == b' ' || **b == b'\t').count();
    let rest = &rest[ws..];
    if rest.starts_with(b"\r\n") {
        Some(pos + ws + 2)
    } else if rest.starts_with(b"\n") {
        Some(pos + ws + 1)
    } else {
        None
    }
}

fn parse_part(raw: &[u8]) -> Result<MimePart> {
    let (header_end, body_start) = match find(raw, b"\r\n\r\n", 0) {
        Some(p) => (p, p + 4),
        None => match find(raw, b"\n\n", 0) {
            Some(p) => (p, p + 2),
            None if raw.starts_with(b"\r\n") => (0, 2),
            None => return Err(Error::Malformed("part without header terminator".into())),
        },
    };

    let headers = std::str::from_utf8(&raw[..header_end])
        .map_err(|_| Error::Malformed("non-ASCII part headers".into()))?;

    let mut content_type = None;
    let mut content_id = None;
    for line in headers.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-type" => content_type = Some(value.to_string()),
            "content-id" => {
                content_id = Some(
                    value
                        .trim_start_matches('<')
                        .trim_end_matches('>')
                        .to_string(),
                )
            }
            "content-transfer-encoding" => {
                let enc = value.to_ascii_lowercase();
                if !matches!(enc.as_str(), "binary" | "8bit" | "7bit") {
                    return Err(Error::Malformed(format!(
                        "unsupported transfer encoding '{}'",
                        value
                    )));
                }
            }
            _ => {}
        }
    }

    Ok(MimePart {
        content_id,
        // RFC 2046 default.
        content_type: content_type.unwrap_or_else(|| "text/plain".to_string()),
        body: raw[body_start..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_parse() {
        let mut mp = MimeMultipart::new();
        mp.add_part(MimePart::new(
            Some("root@hsoap".into()),
            "text/xml; charset=utf-8",
            b"<r/>".to_vec(),
        ));
        mp.add_part(MimePart::new(
            Some("bin@hsoap".into()),
            "application/octet-stream",
            vec![0, b'\r', b'\n', b'-', b'-', 0xFF],
        ));

        let ct = mp.content_type("text/xml", &[]);
        let mut out = Vec::new();
        mp.write(&mut out);

        let parsed = MimeMultipart::parse(&out, &ct).unwrap();
        assert_eq!(parsed.parts().len(), 2);
        assert_eq!(parsed.root_part().unwrap().body, b"<r/>");
        let attachments: Vec<_> = parsed.attachment_parts().collect();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].body, vec![0, b'\r', b'\n', b'-', b'-', 0xFF]);
    }

    #[test]
    fn test_start_parameter_selects_root() {
        let body = b"--b\r\nContent-ID: <a>\r\nContent-Type: image/png\r\n\r\nPNG\r\n--b\r\nContent-ID: <main>\r\nContent-Type: text/xml\r\n\r\n<x/>\r\n--b--\r\n";
        let mp = MimeMultipart::parse(body, r#"multipart/related; boundary=b; start="<main>""#).unwrap();

        assert_eq!(mp.root_part().unwrap().content_type, "text/xml");
        assert_eq!(mp.attachment_parts().next().unwrap().body, b"PNG");
    }

    #[test]
    fn test_delimiter_inside_a_line_is_body_data() {
        let body = b"--b\r\nContent-Type: text/xml\r\n\r\n<x/>\r\n--b\r\nContent-Type: application/octet-stream\r\n\r\n\x00\x01--b\r\n\xFF--b--\r\n--b--\r\n";
        let mp = MimeMultipart::parse(body, "multipart/related; boundary=b").unwrap();

        assert_eq!(mp.parts().len(), 2);
        assert_eq!(mp.root_part().unwrap().body, b"<x/>");
        let attachment = mp.attachment_parts().next().unwrap();
        assert_eq!(attachment.body, b"\x00\x01--b\r\n\xFF--b--");
    }

    #[test]
    fn test_delimiter_after_bare_lf() {
        let body = b"preamble\n--b\nContent-Type: text/xml\n\n<x/>\n--b--\n";
        let mp = MimeMultipart::parse(body, "multipart/related; boundary=b").unwrap();
        assert_eq!(mp.root_part().unwrap().body, b"<x/>");
    }

    #[test]
    fn test_missing_boundary() {
        assert!(MimeMultipart::parse(b"", "multipart/related").is_err());
        assert!(MimeMultipart::parse(b"no delimiter", "multipart/related; boundary=zz").is_err());
    }

    #[test]
    fn test_boundaries_are_unique() {
        assert_ne!(new_boundary(), new_boundary());
    }
}
