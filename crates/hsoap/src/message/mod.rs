// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SOAP message model.
//!
//! A [`Message`] is the decoded form of one SOAP envelope: headers, at most
//! one body payload element, and binary attachments carried next to the
//! envelope by MTOM/SwA packaging. Header and payload content is kept as
//! serialized XML; [`xml`] normalizes it so that every element carries the
//! namespace declarations it needs and can be re-embedded in any envelope.

pub mod fault;
pub mod xml;

use crate::config::{
    MIME_FASTINFOSET, MIME_SOAP12_FASTINFOSET, MIME_SOAP12_XML, MIME_TEXT_XML, SOAP11_ENV_NS,
    SOAP12_ENV_NS, WSDL_SOAP11_NS, WSDL_SOAP12_NS,
};
use crate::error::Result;
use crate::qname::QName;
use std::fmt;

/// SOAP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoapVersion {
    /// SOAP 1.1 (`text/xml`).
    #[default]
    Soap11,
    /// SOAP 1.2 (`application/soap+xml`).
    Soap12,
}

impl SoapVersion {
    /// Envelope namespace URI.
    pub const fn env_ns(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP11_ENV_NS,
            SoapVersion::Soap12 => SOAP12_ENV_NS,
        }
    }

    /// Content type of the textual XML encoding.
    pub const fn xml_mime(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => MIME_TEXT_XML,
            SoapVersion::Soap12 => MIME_SOAP12_XML,
        }
    }

    /// Content type of the Fast Infoset encoding.
    pub const fn fi_mime(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => MIME_FASTINFOSET,
            SoapVersion::Soap12 => MIME_SOAP12_FASTINFOSET,
        }
    }

    /// Version owning an envelope namespace.
    pub fn from_env_ns(ns: &str) -> Option<Self> {
        match ns {
            SOAP11_ENV_NS => Some(SoapVersion::Soap11),
            SOAP12_ENV_NS => Some(SoapVersion::Soap12),
            _ => None,
        }
    }

    /// Version of a WSDL SOAP binding extension namespace.
    pub fn from_binding_ns(ns: &str) -> Option<Self> {
        match ns {
            WSDL_SOAP11_NS => Some(SoapVersion::Soap11),
            WSDL_SOAP12_NS => Some(SoapVersion::Soap12),
            _ => None,
        }
    }

    /// Literal used for a true `mustUnderstand` attribute.
    pub const fn must_understand_true(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "1",
            SoapVersion::Soap12 => "true",
        }
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoapVersion::Soap11 => write!(f, "SOAP 1.1"),
            SoapVersion::Soap12 => write!(f, "SOAP 1.2"),
        }
    }
}

/// One SOAP header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Qualified name of the header element.
    pub name: QName,
    /// `mustUnderstand` flag.
    pub must_understand: bool,
    /// Normalized XML of the header element.
    pub content: String,
}

impl Header {
    /// Build a header from a standalone XML element.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        let must_understand = root
            .attributes()
            .filter(|a| a.name() == "mustUnderstand")
            .any(|a| a.value() == "1" || a.value() == "true");
        Ok(Self {
            name: QName::of(root),
            must_understand,
            content: xml::serialize_element(root),
        })
    }

    /// Header carrying a single text value, e.g. `wsa:Action`.
    pub fn text(name: QName, value: &str) -> Self {
        let content = if name.namespace().is_empty() {
            format!(
                "<{0}>{1}</{0}>",
                name.local_part(),
                xml::escape_text(value)
            )
        } else {
            format!(
                "<h:{0} xmlns:h=\"{1}\">{2}</h:{0}>",
                name.local_part(),
                xml::escape_attr(name.namespace()),
                xml::escape_text(value)
            )
        };
        Self {
            name,
            must_understand: false,
            content,
        }
    }

    /// Text content of the header element (`None` if it has element children).
    pub fn text_value(&self) -> Option<String> {
        let doc = roxmltree::Document::parse(&self.content).ok()?;
        let root = doc.root_element();
        if root.children().any(|c| c.is_element()) {
            return None;
        }
        Some(root.text().unwrap_or("").trim().to_string())
    }
}

/// Body payload: the first child element of `Body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Qualified name of the payload root element.
    pub name: QName,
    /// Normalized XML of the payload element.
    pub content: String,
}

impl Payload {
    /// Build a payload from a standalone XML element.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        Ok(Self {
            name: QName::of(root),
            content: xml::serialize_element(root),
        })
    }
}

/// Binary attachment carried outside the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Content-ID without angle brackets.
    pub content_id: String,
    /// MIME type of the part.
    pub content_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create an attachment.
    pub fn new(
        content_id: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// Decoded SOAP message.
///
/// # Example
///
/// ```rust
/// use hsoap::{Message, SoapVersion};
///
/// let msg = Message::with_payload(
///     SoapVersion::Soap11,
///     r#"<c:Add xmlns:c="urn:calc"><a>1</a><b>2</b></c:Add>"#,
/// ).unwrap();
/// assert_eq!(msg.payload_name().unwrap().local_part(), "Add");
/// assert!(!msg.has_attachments());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    soap_version: SoapVersion,
    headers: Vec<Header>,
    payload: Option<Payload>,
    attachments: Vec<Attachment>,
    fault: bool,
}

impl Message {
    /// Empty message (no headers, empty body).
    pub fn new(soap_version: SoapVersion) -> Self {
        Self {
            soap_version,
            ..Self::default()
        }
    }

    /// Message whose body carries `payload_xml`.
    pub fn with_payload(soap_version: SoapVersion, payload_xml: &str) -> Result<Self> {
        let mut msg = Self::new(soap_version);
        msg.payload = Some(Payload::parse(payload_xml)?);
        Ok(msg)
    }

    pub(crate) fn from_parts(
        soap_version: SoapVersion,
        headers: Vec<Header>,
        payload: Option<Payload>,
        fault: bool,
    ) -> Self {
        Self {
            soap_version,
            headers,
            payload,
            attachments: Vec::new(),
            fault,
        }
    }

    pub(crate) fn set_fault(&mut self, fault: bool) {
        self.fault = fault;
    }

    /// SOAP version of the envelope.
    #[inline]
    pub fn soap_version(&self) -> SoapVersion {
        self.soap_version
    }

    /// Header blocks in document order.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First header with the given name.
    pub fn header(&self, name: &QName) -> Option<&Header> {
        self.headers.iter().find(|h| &h.name == name)
    }

    /// Append a header block.
    pub fn add_header(&mut self, header: Header) {
        self.headers.push(header);
    }

    /// Remove every header with the given name.
    pub fn remove_headers(&mut self, name: &QName) {
        self.headers.retain(|h| &h.name != name);
    }

    /// Body payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Qualified name of the payload root element.
    pub fn payload_name(&self) -> Option<&QName> {
        self.payload.as_ref().map(|p| &p.name)
    }

    /// Replace the body payload.
    pub fn set_payload(&mut self, payload: Option<Payload>) {
        self.payload = payload;
    }

    /// Whether the body carries a payload element.
    #[inline]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Attachments in insertion order.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Attachment by Content-ID.
    pub fn attachment(&self, content_id: &str) -> Option<&Attachment> {
        let content_id = content_id.trim_start_matches("cid:");
        self.attachments.iter().find(|a| a.content_id == content_id)
    }

    /// Add an attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Whether any attachment is carried.
    #[inline]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Whether the body is a SOAP fault.
    #[inline]
    pub fn is_fault(&self) -> bool {
        self.fault
    }

    /// Serialize the envelope as XML text (attachments excluded).
    pub fn to_envelope_string(&self) -> String {
        let mut out = Vec::new();
        xml::write_envelope(self, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert_eq!(SoapVersion::Soap11.xml_mime(), "text/xml");
        assert_eq!(SoapVersion::Soap12.fi_mime(), "application/soap+fastinfoset");
        assert_eq!(
            SoapVersion::from_env_ns(SOAP12_ENV_NS),
            Some(SoapVersion::Soap12)
        );
        assert_eq!(SoapVersion::from_env_ns("urn:other"), None);
    }

    #[test]
    fn test_header_text_roundtrip() {
        let name = QName::new("http://www.w3.org/2005/08/addressing", "Action");
        let header = Header::text(name.clone(), "urn:calc:Add&Co");
        let parsed = Header::parse(&header.content).unwrap();

        assert_eq!(parsed.name, name);
        assert_eq!(parsed.text_value().as_deref(), Some("urn:calc:Add&Co"));
    }

    #[test]
    fn test_attachment_lookup_by_cid() {
        let mut msg = Message::new(SoapVersion::Soap11);
        msg.add_attachment(Attachment::new("img1@hsoap", "image/png", vec![1, 2, 3]));

        assert!(msg.has_attachments());
        assert_eq!(msg.attachment("cid:img1@hsoap").unwrap().data, vec![1, 2, 3]);
        assert!(msg.attachment("missing").is_none());
    }
}
