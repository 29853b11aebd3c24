// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fast Infoset: binary tokenized XML infoset.
//!
//! The document starts with the identification bytes `E0 00 00 01`, followed
//! by a token stream. Prefixes, namespace URIs and local names are written
//! once as literals and referenced by index afterwards through three
//! vocabulary tables seeded with the SOAP envelope names.
//!
//! # Wire format
//!
//! ```text
//! document   := MAGIC token* END_DOCUMENT
//! token      := START_ELEMENT decls name attrs | END_ELEMENT | TEXT string
//! decls      := varint (ref(prefix) ref(ns))*
//! name       := ref(prefix) ref(ns) ref(local)
//! attrs      := varint (name string)*
//! ref(table) := varint 0 string     ; literal, appended to the table
//!             | varint n            ; table[n - 1]
//! string     := varint(len) utf8
//! ```
//!
//! This is a compact tokenization in the spirit of ITU-T X.891, not an
//! implementation of it: documents are only readable by this crate, and
//! peers speaking standard Fast Infoset cannot decode them.
//!
//! Decoded prefixes and local names must be NCNames; anything else is
//! rejected before it reaches the XML text.
//!
//! Availability of the codec to the negotiator is controlled by the
//! `fastinfoset` cargo feature (see [`load`]).

use super::content_type::{matches_mime, ContentType, MediaType};
use super::Codec;
use crate::config::{SOAP11_ENV_NS, SOAP12_ENV_NS, WSA_NS};
use crate::error::{Error, Result};
use crate::message::xml::{escape_attr, escape_text, read_envelope, write_envelope};
use crate::message::SoapVersion;
use crate::packet::Packet;

/// Identification bytes of a Fast Infoset document.
pub const FI_MAGIC: [u8; 4] = [0xE0, 0x00, 0x00, 0x01];

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const TOKEN_START_ELEMENT: u8 = 0x10;
const TOKEN_END_ELEMENT: u8 = 0x11;
const TOKEN_TEXT: u8 = 0x12;
const TOKEN_END_DOCUMENT: u8 = 0xF0;

/// Upper bound on element nesting accepted by the decoder.
const MAX_DEPTH: usize = 256;

// =======================================================================
// Vocabulary
// =======================================================================

/// Indexed string tables shared by encoder and decoder.
#[derive(Debug, Clone)]
struct Vocabulary {
    prefixes: Vec<String>,
    namespaces: Vec<String>,
    locals: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Prefix,
    Namespace,
    Local,
}

impl Vocabulary {
    fn new() -> Self {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            prefixes: own(&["", "S", "xml"]),
            namespaces: own(&["", SOAP11_ENV_NS, SOAP12_ENV_NS, XML_NS, WSA_NS]),
            locals: own(&["Envelope", "Header", "Body", "Fault", "mustUnderstand"]),
        }
    }

    fn table(&mut self, table: Table) -> &mut Vec<String> {
        match table {
            Table::Prefix => &mut self.prefixes,
            Table::Namespace => &mut self.namespaces,
            Table::Local => &mut self.locals,
        }
    }

    fn write_ref(&mut self, table: Table, value: &str, out: &mut Vec<u8>) {
        let entries = self.table(table);
        match entries.iter().position(|e| e == value) {
            Some(idx) => write_varint(out, idx as u64 + 1),
            None => {
                entries.push(value.to_string());
                write_varint(out, 0);
                write_string(out, value);
            }
        }
    }

    fn read_ref(&mut self, table: Table, reader: &mut Reader<'_>) -> Result<String> {
        let idx = reader.varint()?;
        if idx == 0 {
            let value = reader.string()?;
            self.table(table).push(value.clone());
            return Ok(value);
        }
        let entries = self.table(table);
        entries
            .get(idx as usize - 1)
            .cloned()
            .ok_or_else(|| Error::Malformed(format!("vocabulary index {} out of range", idx)))
    }
}

// =======================================================================
// Primitives
// =======================================================================

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    write_varint(out, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| Error::Malformed("truncated Fast Infoset document".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let b = self.byte()?;
            value |= u64::from(b & 0x7F) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::Malformed("varint overflow".into()))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.varint()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| Error::Malformed("string exceeds document".into()))?;
        let s = std::str::from_utf8(&self.buf[self.pos..end])
            .map_err(|e| Error::Malformed(format!("invalid UTF-8: {}", e)))?;
        self.pos = end;
        Ok(s.to_string())
    }
}

// =======================================================================
// Encoder
// =======================================================================

/// Encode an XML document into Fast Infoset.
pub fn encode_document(xml: &str) -> Result<Vec<u8>> {
    let doc = roxmltree::Document::parse(xml)?;
    let mut vocab = Vocabulary::new();
    let mut out = Vec::with_capacity(xml.len() / 2);
    out.extend_from_slice(&FI_MAGIC);
    encode_node(doc.root_element(), &mut vocab, &mut out)?;
    out.push(TOKEN_END_DOCUMENT);
    Ok(out)
}

fn in_scope(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    node.namespaces()
        .filter(|ns| ns.uri() != XML_NS)
        .map(|ns| (ns.name().unwrap_or("").to_string(), ns.uri().to_string()))
        .collect()
}

fn encode_node(
    node: roxmltree::Node<'_, '_>,
    vocab: &mut Vocabulary,
    out: &mut Vec<u8>,
) -> Result<()> {
    if node.is_text() {
        out.push(TOKEN_TEXT);
        write_string(out, node.text().unwrap_or(""));
        return Ok(());
    }
    if !node.is_element() {
        return Ok(());
    }

    let mine = in_scope(node);
    let parent = node.parent_element().map(in_scope).unwrap_or_default();

    let mut decls: Vec<(String, String)> =
        mine.iter().filter(|d| !parent.contains(d)).cloned().collect();
    let has_default = |set: &[(String, String)]| set.iter().any(|(p, _)| p.is_empty());
    if has_default(&parent) && !has_default(&mine) {
        decls.push((String::new(), String::new()));
    }

    let tag = node.tag_name();
    let uri = tag.namespace().unwrap_or("");
    let prefix = if uri.is_empty() {
        String::new()
    } else if mine.iter().any(|(p, u)| p.is_empty() && u == uri) {
        String::new()
    } else {
        mine.iter()
            .find(|(p, u)| !p.is_empty() && u == uri)
            .map(|(p, _)| p.clone())
            .ok_or_else(|| Error::Malformed(format!("unbound namespace {}", uri)))?
    };

    out.push(TOKEN_START_ELEMENT);
    write_varint(out, decls.len() as u64);
    for (p, u) in &decls {
        vocab.write_ref(Table::Prefix, p, out);
        vocab.write_ref(Table::Namespace, u, out);
    }
    vocab.write_ref(Table::Prefix, &prefix, out);
    vocab.write_ref(Table::Namespace, uri, out);
    vocab.write_ref(Table::Local, tag.name(), out);

    let attrs: Vec<_> = node.attributes().collect();
    write_varint(out, attrs.len() as u64);
    for attr in attrs {
        let (p, u) = match attr.namespace() {
            Some(XML_NS) => ("xml".to_string(), XML_NS.to_string()),
            Some(u) => {
                let p = mine
                    .iter()
                    .find(|(p, ns)| !p.is_empty() && ns == u)
                    .map(|(p, _)| p.clone())
                    .ok_or_else(|| Error::Malformed(format!("unbound namespace {}", u)))?;
                (p, u.to_string())
            }
            None => (String::new(), String::new()),
        };
        vocab.write_ref(Table::Prefix, &p, out);
        vocab.write_ref(Table::Namespace, &u, out);
        vocab.write_ref(Table::Local, attr.name(), out);
        write_string(out, attr.value());
    }

    for child in node.children() {
        encode_node(child, vocab, out)?;
    }
    out.push(TOKEN_END_ELEMENT);
    Ok(())
}

// =======================================================================
// Decoder
// =======================================================================

/// Whether `bytes` start with the Fast Infoset identification.
#[inline]
pub fn is_fast_infoset(bytes: &[u8]) -> bool {
    bytes.starts_with(&FI_MAGIC)
}

/// Decode a Fast Infoset document back to XML text.
pub fn decode_document(bytes: &[u8]) -> Result<String> {
    if !is_fast_infoset(bytes) {
        return Err(Error::Malformed("missing Fast Infoset identification".into()));
    }
    let mut reader = Reader {
        buf: bytes,
        pos: FI_MAGIC.len(),
    };
    let mut vocab = Vocabulary::new();
    let mut xml = String::with_capacity(bytes.len() * 2);
    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.byte()? {
            TOKEN_START_ELEMENT => {
                if stack.is_empty() && seen_root {
                    return Err(Error::Malformed("multiple root elements".into()));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(Error::Malformed("element nesting too deep".into()));
                }
                seen_root = true;

                let ndecl = reader.varint()?;
                let mut decls = String::new();
                for _ in 0..ndecl {
                    let p = vocab.read_ref(Table::Prefix, &mut reader)?;
                    let u = vocab.read_ref(Table::Namespace, &mut reader)?;
                    check_ncname("prefix", &p, true)?;
                    if p.is_empty() {
                        decls.push_str(&format!(" xmlns=\"{}\"", escape_attr(&u)));
                    } else {
                        decls.push_str(&format!(" xmlns:{}=\"{}\"", p, escape_attr(&u)));
                    }
                }

                let name = read_name(&mut vocab, &mut reader)?;
                let nattr = reader.varint()?;
                let mut attrs = String::new();
                for _ in 0..nattr {
                    let attr = read_name(&mut vocab, &mut reader)?;
                    let value = reader.string()?;
                    attrs.push_str(&format!(" {}=\"{}\"", attr, escape_attr(&value)));
                }

                xml.push('<');
                xml.push_str(&name);
                xml.push_str(&decls);
                xml.push_str(&attrs);
                xml.push('>');
                stack.push(name);
            }
            TOKEN_END_ELEMENT => {
                let name = stack
                    .pop()
                    .ok_or_else(|| Error::Malformed("unbalanced end element".into()))?;
                xml.push_str("</");
                xml.push_str(&name);
                xml.push('>');
            }
            TOKEN_TEXT => {
                if stack.is_empty() {
                    return Err(Error::Malformed("text outside the document element".into()));
                }
                xml.push_str(&escape_text(&reader.string()?));
            }
            TOKEN_END_DOCUMENT => {
                if !stack.is_empty() || !seen_root {
                    return Err(Error::Malformed("incomplete Fast Infoset document".into()));
                }
                return Ok(xml);
            }
            other => {
                return Err(Error::Malformed(format!(
                    "unknown Fast Infoset token 0x{:02x}",
                    other
                )))
            }
        }
    }
}

fn read_name(vocab: &mut Vocabulary, reader: &mut Reader<'_>) -> Result<String> {
    let prefix = vocab.read_ref(Table::Prefix, reader)?;
    let _ns = vocab.read_ref(Table::Namespace, reader)?;
    let local = vocab.read_ref(Table::Local, reader)?;
    check_ncname("prefix", &prefix, true)?;
    check_ncname("local name", &local, false)?;
    Ok(if prefix.is_empty() {
        local
    } else {
        format!("{}:{}", prefix, local)
    })
}

/// Reject names that are not XML NCNames (`allow_empty` for the default prefix).
fn check_ncname(kind: &str, name: &str, allow_empty: bool) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        None => allow_empty,
        Some(first) => {
            (first == '_' || first.is_alphabetic())
                && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}'))
        }
    };
    if valid {
        Ok(())
    } else {
        Err(Error::Malformed(format!("invalid {} '{}'", kind, name)))
    }
}

// =======================================================================
// Codec
// =======================================================================

/// Fast Infoset SOAP codec.
#[derive(Debug, Clone)]
pub struct FastInfosetCodec {
    version: SoapVersion,
}

impl FastInfosetCodec {
    /// Create the codec.
    pub fn new(version: SoapVersion) -> Self {
        Self { version }
    }
}

/// Load the Fast Infoset codec, or `None` when the runtime is not built in.
pub fn load(version: SoapVersion) -> Option<FastInfosetCodec> {
    if cfg!(feature = "fastinfoset") {
        Some(FastInfosetCodec::new(version))
    } else {
        log::debug!("[codec] Fast Infoset support not compiled in");
        None
    }
}

/// Loader that never finds the Fast Infoset runtime.
pub fn unavailable(_version: SoapVersion) -> Option<FastInfosetCodec> {
    None
}

impl Codec for FastInfosetCodec {
    fn mime_type(&self) -> &str {
        self.version.fi_mime()
    }

    fn encode(&mut self, packet: &mut Packet, out: &mut Vec<u8>) -> Result<ContentType> {
        let mut xml = Vec::new();
        if let Some(message) = packet.message.as_ref() {
            write_envelope(message, &mut xml);
            let text = String::from_utf8_lossy(&xml);
            out.extend_from_slice(&encode_document(&text)?);
        }

        let mime = self.version.fi_mime();
        let action = packet.soap_action.as_deref().unwrap_or("");
        Ok(match self.version {
            SoapVersion::Soap11 => ContentType {
                content_type: mime.to_string(),
                soap_action: Some(format!("\"{}\"", action)),
                accept: None,
            },
            SoapVersion::Soap12 if !action.is_empty() => {
                ContentType::new(format!("{}; action=\"{}\"", mime, action))
            }
            SoapVersion::Soap12 => ContentType::new(mime),
        })
    }

    fn decode(&mut self, input: &[u8], content_type: &str, packet: &mut Packet) -> Result<()> {
        if !matches_mime(content_type, self.version.fi_mime()) {
            return Err(Error::UnsupportedMediaType(Some(content_type.to_string())));
        }
        if self.version == SoapVersion::Soap12 {
            if let Some(action) = MediaType::parse(content_type)?.param("action") {
                packet.soap_action = Some(action.to_string());
            }
        }
        let xml = decode_document(input)?;
        let message = read_envelope(&xml)?;
        if message.soap_version() != self.version {
            return Err(Error::Malformed(format!(
                "VersionMismatch: expected {} envelope, got {}",
                self.version,
                message.soap_version()
            )));
        }
        packet.message = Some(message);
        Ok(())
    }

    fn copy(&self) -> Box<dyn Codec> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_document_roundtrip_preserves_prefixes() {
        let xml = r#"<a:root xmlns:a="urn:a" xmlns="urn:d"><child x="1" a:y="&quot;2&quot;">text &amp; more</child><empty xmlns=""/></a:root>"#;
        let fi = encode_document(xml).unwrap();
        assert!(is_fast_infoset(&fi));

        let back = decode_document(&fi).unwrap();
        let d1 = roxmltree::Document::parse(xml).unwrap();
        let d2 = roxmltree::Document::parse(&back).unwrap();
        assert_eq!(
            crate::message::xml::serialize_element(d1.root_element()),
            crate::message::xml::serialize_element(d2.root_element())
        );
    }

    #[test]
    fn test_vocabulary_makes_repeats_cheaper() {
        let one = encode_document("<r><item>1</item></r>").unwrap();
        let two = encode_document("<r><item>1</item><item>1</item></r>").unwrap();
        // Second <item> costs only tokens and indexes.
        assert!(two.len() - one.len() < 12);
    }

    #[test]
    fn test_truncated_input_rejected() {
        let fi = encode_document("<r><c/></r>").unwrap();
        assert!(decode_document(&fi[..fi.len() - 2]).is_err());
        assert!(decode_document(b"<r/>").is_err());
    }

    /// Single element whose prefix and local name are sent as literals.
    fn literal_element(prefix: &str, local: &str) -> Vec<u8> {
        let mut doc = FI_MAGIC.to_vec();
        doc.extend_from_slice(&[TOKEN_START_ELEMENT, 0]);
        for value in [prefix, "", local] {
            doc.push(0);
            doc.push(value.len() as u8);
            doc.extend_from_slice(value.as_bytes());
        }
        doc.extend_from_slice(&[0, TOKEN_END_ELEMENT, TOKEN_END_DOCUMENT]);
        doc
    }

    #[test]
    fn test_literal_names_must_be_ncnames() {
        assert_eq!(decode_document(&literal_element("", "ok-name.v2")).unwrap(), "<ok-name.v2></ok-name.v2>");
        assert_eq!(decode_document(&literal_element("p", "_x")).unwrap(), "<p:_x></p:_x>");

        for (prefix, local) in [
            ("", r#"a x="1""#),
            ("", "a><b"),
            ("", ""),
            ("", "1st"),
            ("p q", "a"),
            ("p", "a:b"),
            ("<", "a"),
        ] {
            let err = decode_document(&literal_element(prefix, local)).unwrap_err();
            assert!(matches!(err, Error::Malformed(_)), "{:?}/{:?}: {:?}", prefix, local, err);
        }
    }

    #[test]
    fn test_declared_prefix_must_be_ncname() {
        let mut doc = FI_MAGIC.to_vec();
        doc.extend_from_slice(&[TOKEN_START_ELEMENT, 1]);
        let injected = r#"a="urn:x" b"#;
        doc.push(0);
        doc.push(injected.len() as u8);
        doc.extend_from_slice(injected.as_bytes());
        doc.extend_from_slice(&[0, 5]);
        doc.extend_from_slice(b"urn:x");
        // Name `r` with the default prefix and namespace, no attributes.
        doc.extend_from_slice(&[1, 1, 0, 1, b'r', 0, TOKEN_END_ELEMENT, TOKEN_END_DOCUMENT]);
        assert!(matches!(decode_document(&doc), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = FastInfosetCodec::new(SoapVersion::Soap11);
        let msg = Message::with_payload(
            SoapVersion::Soap11,
            r#"<c:Add xmlns:c="urn:calc"><a>1</a><b>2</b></c:Add>"#,
        )
        .unwrap();
        let mut packet = Packet::with_message(msg.clone());

        let mut out = Vec::new();
        let ct = codec.encode(&mut packet, &mut out).unwrap();
        assert_eq!(ct.content_type, "application/fastinfoset");

        let mut decoded = Packet::new();
        codec.decode(&out, &ct.content_type, &mut decoded).unwrap();
        assert_eq!(decoded.message.unwrap().payload(), msg.payload());
    }
}
