// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SOAP with Attachments: the root part is encoded by a wrapped codec
//! (XML or Fast Infoset), attachments follow as MIME parts.

use super::content_type::ContentType;
use super::mime::{MimeMultipart, MimePart};
use super::Codec;
use crate::config::MIME_MULTIPART_RELATED;
use crate::error::{Error, Result};
use crate::message::Attachment;
use crate::packet::Packet;

const ROOT_CONTENT_ID: &str = "soappart@hsoap";

/// SwA codec around a root codec.
pub struct SwaCodec {
    root: Box<dyn Codec>,
}

impl SwaCodec {
    /// Wrap a root codec.
    pub fn new(root: Box<dyn Codec>) -> Self {
        Self { root }
    }

    /// MIME type of the root part.
    pub fn root_mime_type(&self) -> &str {
        self.root.mime_type()
    }

    /// Decode an already parsed package.
    pub(crate) fn decode_multipart(&mut self, mp: &MimeMultipart, packet: &mut Packet) -> Result<()> {
        let root = mp
            .root_part()
            .ok_or_else(|| Error::Malformed("SwA package without root part".into()))?;
        self.root.decode(&root.body, &root.content_type, packet)?;

        if let Some(message) = packet.message.as_mut() {
            for (i, part) in mp.attachment_parts().enumerate() {
                let cid = part
                    .content_id
                    .clone()
                    .unwrap_or_else(|| format!("attachment{}@hsoap", i));
                message.add_attachment(Attachment::new(cid, part.content_type.clone(), part.body.clone()));
            }
        }
        Ok(())
    }
}

impl Codec for SwaCodec {
    fn mime_type(&self) -> &str {
        MIME_MULTIPART_RELATED
    }

    fn encode(&mut self, packet: &mut Packet, out: &mut Vec<u8>) -> Result<ContentType> {
        let mut root = Vec::new();
        let root_ct = self.root.encode(packet, &mut root)?;

        let mut mp = MimeMultipart::new();
        mp.add_part(MimePart::new(
            Some(ROOT_CONTENT_ID.to_string()),
            root_ct.content_type.clone(),
            root,
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

        Ok(ContentType {
            content_type: mp.content_type(self.root.mime_type(), &[]),
            soap_action: root_ct.soap_action,
            accept: None,
        })
    }

    fn decode(&mut self, input: &[u8], content_type: &str, packet: &mut Packet) -> Result<()> {
        let mp = MimeMultipart::parse(input, content_type)?;
        self.decode_multipart(&mp, packet)
    }

    fn copy(&self) -> Box<dyn Codec> {
        Box::new(SwaCodec {
            root: self.root.copy(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StreamSoapCodec;
    use crate::message::{Message, SoapVersion};

    #[test]
    fn test_swa_roundtrip() {
        let mut codec = SwaCodec::new(Box::new(StreamSoapCodec::new(SoapVersion::Soap11)));
        let mut msg = Message::with_payload(SoapVersion::Soap11, r#"<p:Photo xmlns:p="urn:p"/>"#).unwrap();
        msg.add_attachment(Attachment::new("photo@hsoap", "image/jpeg", b"\xFF\xD8\xFF".to_vec()));
        let mut packet = Packet::with_message(msg.clone());

        let mut out = Vec::new();
        let ct = codec.encode(&mut packet, &mut out).unwrap();
        assert!(ct.content_type.contains("type=\"text/xml\""));

        let mut decoded = Packet::new();
        codec.decode(&out, &ct.content_type, &mut decoded).unwrap();
        let decoded = decoded.message.unwrap();
        assert_eq!(decoded.payload(), msg.payload());
        assert_eq!(decoded.attachments(), msg.attachments());
    }
}
