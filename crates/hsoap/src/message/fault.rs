// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SOAP fault construction and inspection.
//!
//! The endpoint is the only layer that turns an [`Error`] into a fault; it
//! does so through [`create_fault_message`].

use super::xml::{escape_attr, escape_text};
use super::{Header, Message, Payload, SoapVersion};
use crate::error::Error;
use crate::qname::QName;

/// SOAP fault code (1.2 names; 1.1 maps Sender/Receiver to Client/Server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// Envelope namespace not supported.
    VersionMismatch,
    /// A mustUnderstand header was not processed.
    MustUnderstand,
    /// The request was at fault.
    Sender,
    /// The service failed to process a valid request.
    Receiver,
}

impl FaultCode {
    /// Local name of the code in the given SOAP version.
    pub const fn local_name(self, version: SoapVersion) -> &'static str {
        match (self, version) {
            (FaultCode::VersionMismatch, _) => "VersionMismatch",
            (FaultCode::MustUnderstand, _) => "MustUnderstand",
            (FaultCode::Sender, SoapVersion::Soap11) => "Client",
            (FaultCode::Sender, SoapVersion::Soap12) => "Sender",
            (FaultCode::Receiver, SoapVersion::Soap11) => "Server",
            (FaultCode::Receiver, SoapVersion::Soap12) => "Receiver",
        }
    }

    fn from_local_name(local: &str) -> Option<Self> {
        // SOAP 1.1 allows dotted refinements ("Client.Authentication").
        let base = local.split('.').next().unwrap_or(local);
        match base {
            "VersionMismatch" => Some(FaultCode::VersionMismatch),
            "MustUnderstand" => Some(FaultCode::MustUnderstand),
            "Client" | "Sender" => Some(FaultCode::Sender),
            "Server" | "Receiver" => Some(FaultCode::Receiver),
            _ => None,
        }
    }
}

impl Error {
    /// Fault code reported to the peer for this error.
    pub fn fault_code(&self) -> FaultCode {
        match self {
            Error::MustUnderstand(_) => FaultCode::MustUnderstand,
            e if e.is_sender_fault() => FaultCode::Sender,
            _ => FaultCode::Receiver,
        }
    }
}

/// Decoded SOAP fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Fault code.
    pub code: FaultCode,
    /// Human-readable reason.
    pub reason: String,
}

impl Fault {
    /// Create a fault.
    pub fn new(code: FaultCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Fault describing an error.
    pub fn from_error(err: &Error) -> Self {
        Self::new(err.fault_code(), err.to_string())
    }

    /// Build the fault payload element.
    pub fn to_payload(&self, version: SoapVersion) -> Payload {
        let ns = version.env_ns();
        let code = self.code.local_name(version);
        let reason = escape_text(&self.reason);
        let content = match version {
            SoapVersion::Soap11 => format!(
                "<S:Fault xmlns:S=\"{}\"><faultcode>S:{}</faultcode><faultstring>{}</faultstring></S:Fault>",
                ns, code, reason
            ),
            SoapVersion::Soap12 => format!(
                "<S:Fault xmlns:S=\"{0}\"><S:Code><S:Value>S:{1}</S:Value></S:Code>\
                 <S:Reason><S:Text xml:lang=\"en\">{2}</S:Text></S:Reason></S:Fault>",
                ns, code, reason
            ),
        };
        Payload {
            name: QName::new(ns, "Fault"),
            content,
        }
    }

    /// Build a complete fault message.
    pub fn to_message(&self, version: SoapVersion) -> Message {
        let mut msg = Message::new(version);
        msg.set_payload(Some(self.to_payload(version)));
        msg.set_fault(true);
        msg
    }

    /// Extract the fault carried by a message, if any.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if !msg.is_fault() {
            return None;
        }
        let payload = msg.payload()?;
        let doc = roxmltree::Document::parse(&payload.content).ok()?;
        let root = doc.root_element();

        let (code_text, reason) = match msg.soap_version() {
            SoapVersion::Soap11 => (
                child_text(root, "faultcode")?,
                child_text(root, "faultstring").unwrap_or_default(),
            ),
            SoapVersion::Soap12 => {
                let code = root
                    .descendants()
                    .find(|n| n.tag_name().name() == "Code")
                    .and_then(|c| child_text(c, "Value"))?;
                let reason = root
                    .descendants()
                    .find(|n| n.tag_name().name() == "Reason")
                    .and_then(|r| child_text(r, "Text"))
                    .unwrap_or_default();
                (code, reason)
            }
        };

        let local = code_text.rsplit(':').next().unwrap_or(&code_text);
        Some(Self {
            code: FaultCode::from_local_name(local)?,
            reason,
        })
    }
}

fn child_text(node: roxmltree::Node<'_, '_>, local: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
        .map(|n| n.text().unwrap_or("").trim().to_string())
}

/// Build the fault response for an error.
///
/// A SOAP 1.2 MustUnderstand fault also carries a `NotUnderstood` header
/// naming the offending header block.
pub fn create_fault_message(version: SoapVersion, err: &Error) -> Message {
    let mut msg = Fault::from_error(err).to_message(version);
    if let (Error::MustUnderstand(name), SoapVersion::Soap12) = (err, version) {
        let ns = version.env_ns();
        msg.add_header(Header {
            name: QName::new(ns, "NotUnderstood"),
            must_understand: false,
            content: format!(
                "<S:NotUnderstood xmlns:S=\"{}\" xmlns:h=\"{}\" qname=\"h:{}\"/>",
                ns,
                escape_attr(name.namespace()),
                escape_attr(name.local_part())
            ),
        });
    }
    log::debug!("[fault] {} fault: {}", version, err);
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::xml::read_envelope;

    #[test]
    fn test_soap11_codes() {
        let msg = create_fault_message(
            SoapVersion::Soap11,
            &Error::UnsupportedMediaType(Some("image/gif".into())),
        );
        assert!(msg.is_fault());

        let fault = Fault::from_message(&msg).unwrap();
        assert_eq!(fault.code, FaultCode::Sender);
        assert!(fault.reason.contains("image/gif"));
        assert!(msg.payload().unwrap().content.contains("S:Client"));
    }

    #[test]
    fn test_soap12_receiver_fault_survives_wire() {
        let msg = create_fault_message(SoapVersion::Soap12, &Error::Invocation("boom <1>".into()));
        let decoded = read_envelope(&msg.to_envelope_string()).unwrap();

        assert!(decoded.is_fault());
        let fault = Fault::from_message(&decoded).unwrap();
        assert_eq!(fault.code, FaultCode::Receiver);
        assert_eq!(fault.reason, "Invocation failed: boom <1>");
    }

    #[test]
    fn test_must_understand_not_understood_header() {
        let header = QName::new("urn:trace", "Trace");
        let msg = create_fault_message(SoapVersion::Soap12, &Error::MustUnderstand(header));

        assert_eq!(Fault::from_message(&msg).unwrap().code, FaultCode::MustUnderstand);
        assert_eq!(msg.headers().len(), 1);
        assert_eq!(msg.headers()[0].name.local_part(), "NotUnderstood");
    }
}
