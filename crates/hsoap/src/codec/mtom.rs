// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MTOM codec: XOP root part plus binary parts.

use super::content_type::{matches_mime, ContentType, MediaType};
use super::mime::{MimeMultipart, MimePart};
use super::stream::StreamSoapCodec;
use super::Codec;
use crate::config::{DEFAULT_ENCODING, MIME_XOP_XML};
use crate::error::{Error, Result};
use crate::message::{Attachment, SoapVersion};
use crate::packet::Packet;

const ROOT_CONTENT_ID: &str = "rootpart@hsoap";

/// MTOM/XOP codec wrapping the textual envelope codec.
#[derive(Debug, Clone)]
pub struct MtomCodec {
    xml: StreamSoapCodec,
}

impl MtomCodec {
    /// Create the codec for a SOAP version.
    pub fn new(version: SoapVersion) -> Self {
        Self {
            xml: StreamSoapCodec::new(version),
        }
    }

    /// Decode an already parsed package whose root is `application/xop+xml`.
    pub(crate) fn decode_multipart(&self, mp: &MimeMultipart, packet: &mut Packet) -> Result<()> {
        let root = mp
            .root_part()
            .ok_or_else(|| Error::Malformed("MTOM package without root part".into()))?;
        if !matches_mime(&root.content_type, MIME_XOP_XML) {
            return Err(Error::Malformed(format!(
                "MTOM root part has type '{}'",
                root.content_type
            )));
        }
        self.xml.decode_envelope(&root.body, packet)?;

        if let Some(message) = packet.message.as_mut() {
            for (i, part) in mp.attachment_parts().enumerate() {
                let cid = part
                    .content_id
                    .clone()
                    .unwrap_or_else(|| format!("part{}@hsoap", i));
                message.add_attachment(Attachment::new(cid, part.content_type.clone(), part.body.clone()));
            }
        }
        packet.mtom_request = Some(true);
        Ok(())
    }
}

impl Codec for MtomCodec {
    fn mime_type(&self) -> &str {
        MIME_XOP_XML
    }

    fn encode(&mut self, packet: &mut Packet, out: &mut Vec<u8>) -> Result<ContentType> {
        let version = self.xml.soap_version();
        let mut envelope = Vec::new();
        let inner = self.xml.encode(packet, &mut envelope)?;

        let mut mp = MimeMultipart::new();
        mp.add_part(MimePart::new(
            Some(ROOT_CONTENT_ID.to_string()),
            format!(
                "{}; charset={}; type=\"{}\"",
                MIME_XOP_XML,
                DEFAULT_ENCODING,
                version.xml_mime()
            ),
            envelope,
        ));
        if let Some(message) = packet.message.as_ref() {
            for a in message.attachments() {
                mp.add_part(MimePart::new(
                    Some(a.content_id.clone()),
                    a.content_type.clone(),
                    a.data.clone(),
                ));
            }
        }
        mp.write(out);

        let mut extra = vec![format!("start-info=\"{}\"", version.xml_mime())];
        if version == SoapVersion::Soap12 {
            if let Some(action) = packet.soap_action.as_deref().filter(|a| !a.is_empty()) {
                extra.push(format!("action=\"{}\"", action));
            }
        }
        Ok(ContentType {
            content_type: mp.content_type(MIME_XOP_XML, &extra),
            soap_action: inner.soap_action,
            accept: None,
        })
    }

    fn decode(&mut self, input: &[u8], content_type: &str, packet: &mut Packet) -> Result<()> {
        let mp = MimeMultipart::parse(input, content_type)?;
        if let Some(action) = MediaType::parse(content_type)?.param("action") {
            packet.soap_action = Some(action.to_string());
        }
        self.decode_multipart(&mp, packet)
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
    fn test_mtom_roundtrip_with_attachment() {
        let mut codec = MtomCodec::new(SoapVersion::Soap11);
        let mut msg = Message::with_payload(
            SoapVersion::Soap11,
            r#"<u:Upload xmlns:u="urn:files"><data><xop:Include xmlns:xop="http://www.w3.org/2004/08/xop/include" href="cid:blob@hsoap"/></data></u:Upload>"#,
        )
        .unwrap();
        msg.add_attachment(Attachment::new("blob@hsoap", "application/octet-stream", vec![7u8; 64]));
        let mut packet = Packet::with_message(msg.clone());

        let mut out = Vec::new();
        let ct = codec.encode(&mut packet, &mut out).unwrap();
        assert!(ct.content_type.starts_with("multipart/related"));
        assert!(ct.content_type.contains("application/xop+xml"));

        let mut decoded = Packet::new();
        codec.decode(&out, &ct.content_type, &mut decoded).unwrap();
        assert_eq!(decoded.mtom_request, Some(true));
        let decoded = decoded.message.unwrap();
        assert_eq!(decoded.payload(), msg.payload());
        assert_eq!(decoded.attachment("blob@hsoap").unwrap().data, vec![7u8; 64]);
    }
}
