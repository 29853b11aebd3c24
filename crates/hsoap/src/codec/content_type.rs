// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Content-Type values produced by encoders and parsed from the wire.

use crate::error::{Error, Result};
use std::fmt;

/// Case-insensitive prefix match of a content type against a registered MIME type.
///
/// `text/xml; charset=utf-8` matches `text/xml`; `text/x` does not.
#[inline]
pub fn matches_mime(content_type: &str, mime: &str) -> bool {
    !mime.is_empty()
        && content_type.len() >= mime.len()
        && content_type.is_char_boundary(mime.len())
        && content_type[..mime.len()].eq_ignore_ascii_case(mime)
}

/// Result of an encode: the wire content type plus the headers that go with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Full `Content-Type` header value.
    pub content_type: String,
    /// `SOAPAction` header (SOAP 1.1 only; quoted).
    pub soap_action: Option<String>,
    /// `Accept` header advertised to the peer.
    pub accept: Option<String>,
}

impl ContentType {
    /// Content type without SOAPAction or Accept.
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            soap_action: None,
            accept: None,
        }
    }

    /// Set the Accept header.
    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content_type)
    }
}

/// Parsed media type: `type/subtype` plus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Lower-cased `type/subtype`.
    pub base: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a `Content-Type` header value.
    ///
    /// Parameter values may be quoted; names are compared case-insensitively.
    pub fn parse(value: &str) -> Result<Self> {
        let mut rest = value.trim();
        let base_end = rest.find(';').unwrap_or(rest.len());
        let base = rest[..base_end].trim().to_ascii_lowercase();
        if !base.contains('/') {
            return Err(Error::UnsupportedMediaType(Some(value.to_string())));
        }
        rest = &rest[base_end..];

        let mut params = Vec::new();
        while let Some(stripped) = rest.strip_prefix(';') {
            rest = stripped.trim_start();
            let Some(eq) = rest.find('=') else {
                break;
            };
            let name = rest[..eq].trim().to_ascii_lowercase();
            rest = rest[eq + 1..].trim_start();

            let value = if let Some(quoted) = rest.strip_prefix('"') {
                let end = quoted.find('"').ok_or_else(|| {
                    Error::Malformed(format!("unterminated quoted parameter in '{}'", value))
                })?;
                let v = quoted[..end].to_string();
                rest = quoted[end + 1..].trim_start();
                v
            } else {
                let end = rest.find(';').unwrap_or(rest.len());
                let v = rest[..end].trim().to_string();
                rest = &rest[end..];
                v
            };
            params.push((name, value));

            // Skip garbage up to the next separator.
            if !rest.is_empty() && !rest.starts_with(';') {
                let next = rest.find(';').unwrap_or(rest.len());
                rest = &rest[next..];
            }
        }

        Ok(Self { base, params })
    }

    /// Parameter value by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_match_is_case_insensitive() {
        assert!(matches_mime("Text/XML; charset=utf-8", "text/xml"));
        assert!(matches_mime("application/fastinfoset", "application/fastinfoset"));
        assert!(!matches_mime("text/x", "text/xml"));
        assert!(!matches_mime("text/xml", ""));
    }

    #[test]
    fn test_parse_multipart_params() {
        let ct = MediaType::parse(
            r#"multipart/related; type="application/xop+xml"; boundary="uuid:abc;def"; start="<root@x>"; start-info=text/xml"#,
        )
        .unwrap();

        assert_eq!(ct.base, "multipart/related");
        assert_eq!(ct.param("Boundary"), Some("uuid:abc;def"));
        assert_eq!(ct.param("start"), Some("<root@x>"));
        assert_eq!(ct.param("start-info"), Some("text/xml"));
        assert_eq!(ct.param("action"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MediaType::parse("nonsense").is_err());
        assert!(MediaType::parse(r#"text/xml; a="open"#).is_err());
    }
}
