// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Envelope XML reader/writer and element serializer.
//!
//! Parsing uses `roxmltree` (read-only DOM). Serialization of a subtree
//! re-declares every namespace the subtree uses on the element where it is
//! first needed, so extracted fragments stay well-formed on their own.

use super::{Header, Message, Payload, SoapVersion};
use crate::error::{Error, Result};
use crate::qname::QName;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix used for the envelope namespace on output.
const ENV_PREFIX: &str = "S";

/// Namespace bindings in effect on output: (prefix, uri), innermost last.
type Scope = Vec<(Option<String>, String)>;

// =======================================================================
// Escaping
// =======================================================================

/// Escape character data.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value (double-quoted).
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}

// =======================================================================
// Subtree serialization
// =======================================================================

/// Serialize an element and its descendants as standalone XML.
///
/// Comments and processing instructions are dropped.
pub fn serialize_element(node: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    let scope = Scope::new();
    write_node(node, &scope, &mut out);
    out
}

fn bound_uri<'s>(scope: &'s Scope, prefix: Option<&str>) -> Option<&'s str> {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .map(|(_, uri)| uri.as_str())
}

fn bind(scope: &mut Scope, decls: &mut Scope, prefix: Option<&str>, uri: &str) {
    let current = bound_uri(scope, prefix).unwrap_or("");
    if current != uri {
        let entry = (prefix.map(str::to_string), uri.to_string());
        scope.push(entry.clone());
        decls.push(entry);
    }
}

/// Prefix of an element namespace: the default namespace when it matches,
/// otherwise the first prefix declared for it.
fn element_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<Option<String>> {
    if node
        .namespaces()
        .any(|ns| ns.name().is_none() && ns.uri() == uri)
    {
        return Some(None);
    }
    node.namespaces()
        .find(|ns| ns.name().is_some() && ns.uri() == uri)
        .map(|ns| ns.name().map(str::to_string))
}

fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str, generated: &mut usize) -> String {
    if uri == XML_NS {
        return "xml".to_string();
    }
    node.namespaces()
        .find(|ns| ns.name().is_some() && ns.uri() == uri)
        .and_then(|ns| ns.name().map(str::to_string))
        .unwrap_or_else(|| {
            *generated += 1;
            format!("ns{}", generated)
        })
}

fn write_node(node: roxmltree::Node<'_, '_>, scope: &Scope, out: &mut String) {
    if node.is_text() {
        out.push_str(&escape_text(node.text().unwrap_or("")));
        return;
    }
    if !node.is_element() {
        return;
    }

    let mut scope = scope.clone();
    let mut decls = Scope::new();
    let mut generated = 0;

    let tag = node.tag_name();
    let prefix = match tag.namespace() {
        Some(uri) => {
            let prefix = element_prefix(node, uri).unwrap_or_else(|| {
                generated += 1;
                Some(format!("ns{}", generated))
            });
            bind(&mut scope, &mut decls, prefix.as_deref(), uri);
            prefix
        }
        None => {
            bind(&mut scope, &mut decls, None, "");
            None
        }
    };

    let mut attrs = Vec::new();
    for attr in node.attributes() {
        let name = match attr.namespace() {
            Some(uri) => {
                let p = attribute_prefix(node, uri, &mut generated);
                if uri != XML_NS {
                    bind(&mut scope, &mut decls, Some(&p), uri);
                }
                format!("{}:{}", p, attr.name())
            }
            None => attr.name().to_string(),
        };
        attrs.push((name, attr.value()));
    }

    let qualified = match &prefix {
        Some(p) => format!("{}:{}", p, tag.name()),
        None => tag.name().to_string(),
    };

    out.push('<');
    out.push_str(&qualified);
    for (p, uri) in &decls {
        match p {
            Some(p) => out.push_str(&format!(" xmlns:{}=\"{}\"", p, escape_attr(uri))),
            None => out.push_str(&format!(" xmlns=\"{}\"", escape_attr(uri))),
        }
    }
    for (name, value) in attrs {
        out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
    }

    if !node.has_children() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in node.children() {
        write_node(child, &scope, out);
    }
    out.push_str("</");
    out.push_str(&qualified);
    out.push('>');
}

// =======================================================================
// Envelope
// =======================================================================

/// Write the SOAP envelope of `msg` as UTF-8 XML.
pub fn write_envelope(msg: &Message, out: &mut Vec<u8>) {
    let ns = msg.soap_version().env_ns();
    let mut xml = String::with_capacity(256);

    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    xml.push_str(&format!("<{0}:Envelope xmlns:{0}=\"{1}\">", ENV_PREFIX, ns));
    if !msg.headers().is_empty() {
        xml.push_str(&format!("<{}:Header>", ENV_PREFIX));
        for header in msg.headers() {
            xml.push_str(&header.content);
        }
        xml.push_str(&format!("</{}:Header>", ENV_PREFIX));
    }
    xml.push_str(&format!("<{}:Body>", ENV_PREFIX));
    if let Some(payload) = msg.payload() {
        xml.push_str(&payload.content);
    }
    xml.push_str(&format!("</{0}:Body></{0}:Envelope>", ENV_PREFIX));

    out.extend_from_slice(xml.as_bytes());
}

/// Read a SOAP envelope from UTF-8 bytes (a leading BOM is skipped).
pub fn read_envelope_bytes(bytes: &[u8]) -> Result<Message> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Malformed(format!("envelope is not UTF-8: {}", e)))?;
    read_envelope(text)
}

/// Read a SOAP envelope.
pub fn read_envelope(xml: &str) -> Result<Message> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();

    let ns = root.tag_name().namespace().unwrap_or("");
    let version = SoapVersion::from_env_ns(ns).ok_or_else(|| {
        Error::Malformed(format!("not a SOAP envelope: {}", QName::of(root)))
    })?;
    if root.tag_name().name() != "Envelope" {
        return Err(Error::Malformed(format!(
            "expected Envelope, found {}",
            QName::of(root)
        )));
    }

    let mut headers = Vec::new();
    let mut payload = None;
    let mut body_seen = false;

    for child in root.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(ns) {
            continue;
        }
        match child.tag_name().name() {
            "Header" => {
                for h in child.children().filter(|n| n.is_element()) {
                    let must_understand = h
                        .attribute((ns, "mustUnderstand"))
                        .map(|v| v == "1" || v == "true")
                        .unwrap_or(false);
                    headers.push(Header {
                        name: QName::of(h),
                        must_understand,
                        content: serialize_element(h),
                    });
                }
            }
            "Body" => {
                body_seen = true;
                payload = child.first_element_child().map(|p| Payload {
                    name: QName::of(p),
                    content: serialize_element(p),
                });
            }
            _ => {}
        }
    }

    if !body_seen {
        return Err(Error::Malformed("SOAP envelope without Body".into()));
    }

    let fault = payload
        .as_ref()
        .map(|p| p.name == QName::new(ns, "Fault"))
        .unwrap_or(false);

    Ok(Message::from_parts(version, headers, payload, fault))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_declares_used_namespaces_only() {
        let xml = r#"<S:Envelope xmlns:S="urn:env" xmlns:c="urn:calc"><S:Body><c:Add><a>1</a></c:Add></S:Body></S:Envelope>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let add = doc
            .descendants()
            .find(|n| n.tag_name().name() == "Add")
            .unwrap();

        assert_eq!(
            serialize_element(add),
            r#"<c:Add xmlns:c="urn:calc"><a>1</a></c:Add>"#
        );
    }

    #[test]
    fn test_serialize_resets_default_namespace() {
        let xml = r#"<r xmlns="urn:d"><inner xmlns=""><x a="&lt;&amp;"/></inner></r>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();

        assert_eq!(
            serialize_element(doc.root_element()),
            r#"<r xmlns="urn:d"><inner xmlns=""><x a="&lt;&amp;"/></inner></r>"#
        );
    }

    #[test]
    fn test_envelope_roundtrip() {
        let mut msg = Message::with_payload(
            SoapVersion::Soap12,
            r#"<c:Echo xmlns:c="urn:calc"><text>a &lt; b</text></c:Echo>"#,
        )
        .unwrap();
        msg.add_header(
            Header::parse(r#"<t:Trace xmlns:t="urn:trace" xmlns:S="http://www.w3.org/2003/05/soap-envelope" S:mustUnderstand="true">42</t:Trace>"#)
                .unwrap(),
        );

        let decoded = read_envelope(&msg.to_envelope_string()).unwrap();
        assert_eq!(decoded.soap_version(), SoapVersion::Soap12);
        assert_eq!(decoded.payload(), msg.payload());
        assert_eq!(decoded.headers().len(), 1);
        assert!(decoded.headers()[0].must_understand);
        assert!(!decoded.is_fault());
    }

    #[test]
    fn test_rejects_non_envelope() {
        assert!(matches!(
            read_envelope("<foo/>"),
            Err(Error::Malformed(_))
        ));
        let no_body = r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"/>"#;
        assert!(read_envelope(no_body).is_err());
    }
}
