// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Plain XML SOAP codec (`text/xml` / `application/soap+xml`).

use super::content_type::{matches_mime, ContentType, MediaType};
use super::Codec;
use crate::config::DEFAULT_ENCODING;
use crate::error::{Error, Result};
use crate::message::xml::{read_envelope_bytes, write_envelope};
use crate::message::SoapVersion;
use crate::packet::Packet;

/// Textual SOAP envelope codec for one SOAP version.
#[derive(Debug, Clone)]
pub struct StreamSoapCodec {
    version: SoapVersion,
}

impl StreamSoapCodec {
    /// Create the codec.
    pub fn new(version: SoapVersion) -> Self {
        Self { version }
    }

    /// SOAP version handled by this codec.
    pub fn soap_version(&self) -> SoapVersion {
        self.version
    }

    /// Content type of an encoded envelope, with SOAPAction for the given version.
    pub(crate) fn envelope_content_type(&self, packet: &Packet) -> ContentType {
        let mime = self.version.xml_mime();
        match self.version {
            SoapVersion::Soap11 => ContentType {
                content_type: format!("{}; charset={}", mime, DEFAULT_ENCODING),
                soap_action: Some(format!(
                    "\"{}\"",
                    packet.soap_action.as_deref().unwrap_or("")
                )),
                accept: None,
            },
            SoapVersion::Soap12 => {
                let mut ct = format!("{}; charset={}", mime, DEFAULT_ENCODING);
                if let Some(action) = packet.soap_action.as_deref().filter(|a| !a.is_empty()) {
                    ct.push_str(&format!("; action=\"{}\"", action));
                }
                ContentType::new(ct)
            }
        }
    }

    /// Decode an envelope without checking the content type.
    pub(crate) fn decode_envelope(&self, input: &[u8], packet: &mut Packet) -> Result<()> {
        let message = read_envelope_bytes(input)?;
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
}

impl Codec for StreamSoapCodec {
    fn mime_type(&self) -> &str {
        self.version.xml_mime()
    }

    fn encode(&mut self, packet: &mut Packet, out: &mut Vec<u8>) -> Result<ContentType> {
        if let Some(message) = packet.message.as_ref() {
            write_envelope(message, out);
        }
        Ok(self.envelope_content_type(packet))
    }

    fn decode(&mut self, input: &[u8], content_type: &str, packet: &mut Packet) -> Result<()> {
        if !matches_mime(content_type, self.version.xml_mime()) {
            return Err(Error::UnsupportedMediaType(Some(content_type.to_string())));
        }
        if self.version == SoapVersion::Soap12 {
            if let Some(action) = MediaType::parse(content_type)?.param("action") {
                packet.soap_action = Some(action.to_string());
            }
        }
        self.decode_envelope(input, packet)
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
    fn test_soap11_content_type_and_action() {
        let mut codec = StreamSoapCodec::new(SoapVersion::Soap11);
        let mut packet = Packet::with_message(Message::new(SoapVersion::Soap11));
        packet.soap_action = Some("urn:calc:Add".into());

        let mut out = Vec::new();
        let ct = codec.encode(&mut packet, &mut out).unwrap();
        assert_eq!(ct.content_type, "text/xml; charset=utf-8");
        assert_eq!(ct.soap_action.as_deref(), Some("\"urn:calc:Add\""));
    }

    #[test]
    fn test_soap12_action_parameter() {
        let mut codec = StreamSoapCodec::new(SoapVersion::Soap12);
        let mut packet = Packet::with_message(Message::new(SoapVersion::Soap12));
        packet.soap_action = Some("urn:calc:Add".into());

        let mut out = Vec::new();
        let ct = codec.encode(&mut packet, &mut out).unwrap();

        let mut decoded = Packet::new();
        codec.decode(&out, &ct.content_type, &mut decoded).unwrap();
        assert_eq!(decoded.soap_action.as_deref(), Some("urn:calc:Add"));
    }

    #[test]
    fn test_version_mismatch_and_wrong_media() {
        let mut out = Vec::new();
        write_envelope(&Message::new(SoapVersion::Soap11), &mut out);

        let mut codec12 = StreamSoapCodec::new(SoapVersion::Soap12);
        let mut packet = Packet::new();
        assert!(matches!(
            codec12.decode(&out, "application/soap+xml", &mut packet),
            Err(Error::Malformed(_))
        ));
        assert!(matches!(
            codec12.decode(&out, "image/gif", &mut packet),
            Err(Error::UnsupportedMediaType(_))
        ));
    }
}
