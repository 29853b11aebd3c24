// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SOAP binding codec: per-packet encoding negotiation.
//!
//! Owns one codec per wire format and picks among them:
//!
//! - **decode**: by the inbound content type (multipart root type for MIME packages)
//! - **encode**: by the packet's negotiation mode, the sticky "peer accepts
//!   Fast Infoset" flag learned from earlier decodes, MTOM eligibility and
//!   the presence of attachments
//!
//! The sticky flag is per codec instance. It is cleared before a decode
//! only when the inbound packet carries no negotiation mode, and set after
//! a decode when the peer's Accept header lists Fast Infoset.

use super::content_type::{matches_mime, ContentType};
use super::fastinfoset::{self, FastInfosetCodec};
use super::mime::MimeMultipart;
use super::mtom::MtomCodec;
use super::stream::StreamSoapCodec;
use super::swa::SwaCodec;
use super::Codec;
use crate::config::{Features, MIME_MULTIPART_RELATED, MIME_XOP_XML};
use crate::error::{Error, Result};
use crate::message::SoapVersion;
use crate::packet::{ContentNegotiation, Packet};
use std::io::Read;

/// Loader of the Fast Infoset runtime; `None` means "not loadable".
pub type FastInfosetLoader = fn(SoapVersion) -> Option<FastInfosetCodec>;

/// Encoder chosen for a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    /// Plain XML envelope.
    Xml,
    /// MTOM package.
    Mtom,
    /// SwA package with XML root.
    Swa,
    /// Fast Infoset document.
    FastInfoset,
    /// SwA package with Fast Infoset root.
    FastInfosetSwa,
}

impl EncoderKind {
    /// Whether this encoder produces Fast Infoset.
    pub fn is_fast_infoset(self) -> bool {
        matches!(self, EncoderKind::FastInfoset | EncoderKind::FastInfosetSwa)
    }
}

/// Codec negotiator for one SOAP binding.
///
/// Not shared between threads: use [`SoapBindingCodec::copy`] per worker.
///
/// # Example
///
/// ```rust
/// use hsoap::codec::{EncoderKind, SoapBindingCodec};
/// use hsoap::config::Features;
/// use hsoap::{Message, Packet, SoapVersion};
///
/// let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new().fast_infoset(false));
/// let mut packet = Packet::with_message(Message::new(SoapVersion::Soap11));
/// assert_eq!(codec.encoder_for(&mut packet), EncoderKind::Xml);
/// ```
pub struct SoapBindingCodec {
    version: SoapVersion,
    features: Features,
    loader: FastInfosetLoader,

    xml: StreamSoapCodec,
    mtom: MtomCodec,
    swa: SwaCodec,
    fi: Option<FastInfosetCodec>,
    fi_swa: Option<SwaCodec>,

    fi_mime: &'static str,
    fast_infoset_disabled: bool,
    use_fast_infoset_for_encoding: bool,
    ignore_content_negotiation: bool,
    xml_accept: String,
    conneg_xml_accept: String,
}

impl SoapBindingCodec {
    /// Create the negotiator using the built-in Fast Infoset loader.
    pub fn new(version: SoapVersion, features: Features) -> Self {
        Self::with_loader(version, features, fastinfoset::load)
    }

    /// Create the negotiator with an explicit Fast Infoset loader.
    pub fn with_loader(version: SoapVersion, features: Features, loader: FastInfosetLoader) -> Self {
        let xml = StreamSoapCodec::new(version);
        let mtom = MtomCodec::new(version);
        let swa = SwaCodec::new(Box::new(xml.clone()));

        let mut accepted = format!("{}, {}", version.xml_mime(), mtom.mime_type());
        let mut fast_infoset_disabled = features.fast_infoset == Some(false);
        let mut use_fast_infoset_for_encoding = false;
        let mut ignore_content_negotiation = false;
        let mut fi = None;
        let mut fi_swa = None;
        let mut fi_mime = "";
        let conneg_xml_accept;

        if fast_infoset_disabled {
            // Explicitly not supported by the service.
            conneg_xml_accept = accepted.clone();
            ignore_content_negotiation = true;
        } else if let Some(codec) = loader(version) {
            fi_mime = version.fi_mime();
            fi_swa = Some(SwaCodec::new(Box::new(codec.clone())));
            fi = Some(codec);
            conneg_xml_accept = format!("{}, {}", fi_mime, accepted);

            if let Some(select) = features.select_optimal_encoding {
                ignore_content_negotiation = true;
                if select {
                    if features.fast_infoset.is_some() {
                        use_fast_infoset_for_encoding = true;
                    }
                    accepted = conneg_xml_accept.clone();
                } else {
                    fast_infoset_disabled = true;
                }
            }
        } else {
            log::debug!("[codec] Fast Infoset runtime not loadable, negotiation disabled");
            fast_infoset_disabled = true;
            conneg_xml_accept = accepted.clone();
            ignore_content_negotiation = true;
        }

        Self {
            version,
            features,
            loader,
            xml,
            mtom,
            swa,
            fi,
            fi_swa,
            fi_mime,
            fast_infoset_disabled,
            use_fast_infoset_for_encoding,
            ignore_content_negotiation,
            xml_accept: accepted,
            conneg_xml_accept,
        }
    }

    /// SOAP version of the binding.
    #[inline]
    pub fn soap_version(&self) -> SoapVersion {
        self.version
    }

    /// Whether Fast Infoset is disabled (by configuration or loader absence).
    #[inline]
    pub fn is_fast_infoset_disabled(&self) -> bool {
        self.fast_infoset_disabled
    }

    /// Whether the packet negotiation property is ignored.
    #[inline]
    pub fn ignores_content_negotiation(&self) -> bool {
        self.ignore_content_negotiation
    }

    /// Current value of the sticky "encode with Fast Infoset" flag.
    #[inline]
    pub fn uses_fast_infoset_for_encoding(&self) -> bool {
        self.use_fast_infoset_for_encoding
    }

    /// Accept header advertised when Fast Infoset is not negotiated.
    pub fn xml_accept(&self) -> &str {
        &self.xml_accept
    }

    /// Accept header advertised when Fast Infoset is negotiated.
    pub fn conneg_xml_accept(&self) -> &str {
        &self.conneg_xml_accept
    }

    /// Independent negotiator with the same features and fresh sticky state.
    pub fn copy(&self) -> Self {
        Self::with_loader(self.version, self.features.clone(), self.loader)
    }

    // =======================================================================
    // Encode
    // =======================================================================

    /// Choose the encoder for a packet.
    ///
    /// Honoring the negotiation property updates the sticky flag: `Off`
    /// clears it, `Optimistic` sets it.
    pub fn encoder_for(&mut self, packet: &mut Packet) -> EncoderKind {
        if !self.ignore_content_negotiation {
            match packet.content_negotiation {
                Some(ContentNegotiation::Off) => self.use_fast_infoset_for_encoding = false,
                Some(ContentNegotiation::Optimistic) => self.use_fast_infoset_for_encoding = true,
                _ => {}
            }
        }

        let has_attachments = packet
            .message
            .as_ref()
            .map(|m| m.has_attachments())
            .unwrap_or(false);

        if self.use_fast_infoset_for_encoding && self.fi.is_some() {
            // FI with MTOM makes no sense: MTOM-enabled bindings send attachments inline in FI.
            if !has_attachments || self.features.is_mtom_enabled() {
                return EncoderKind::FastInfoset;
            }
            return EncoderKind::FastInfosetSwa;
        }

        if packet.mtom_feature.is_none() {
            packet.mtom_feature = self.features.mtom;
        }
        if packet.should_use_mtom() {
            return EncoderKind::Mtom;
        }
        if has_attachments {
            EncoderKind::Swa
        } else {
            EncoderKind::Xml
        }
    }

    /// Encode the packet's message, returning the content type with the Accept header set.
    pub fn encode(&mut self, packet: &mut Packet, out: &mut Vec<u8>) -> Result<ContentType> {
        let kind = self.encoder_for(packet);
        let ct = match kind {
            EncoderKind::Xml => self.xml.encode(packet, out)?,
            EncoderKind::Mtom => self.mtom.encode(packet, out)?,
            EncoderKind::Swa => self.swa.encode(packet, out)?,
            EncoderKind::FastInfoset => match self.fi.as_mut() {
                Some(fi) => fi.encode(packet, out)?,
                None => self.xml.encode(packet, out)?,
            },
            EncoderKind::FastInfosetSwa => match self.fi_swa.as_mut() {
                Some(fi_swa) => fi_swa.encode(packet, out)?,
                None => self.swa.encode(packet, out)?,
            },
        };
        log::debug!("[codec] encoded with {:?}: {}", kind, ct.content_type);
        packet.content_type = Some(ct.content_type.clone());
        Ok(self.with_accept_header(packet, ct))
    }

    fn with_accept_header(&self, packet: &Packet, ct: ContentType) -> ContentType {
        let accept = if !self.ignore_content_negotiation
            && packet.content_negotiation != Some(ContentNegotiation::Off)
        {
            &self.conneg_xml_accept
        } else {
            &self.xml_accept
        };
        ct.with_accept(accept.clone())
    }

    // =======================================================================
    // Decode
    // =======================================================================

    fn pre_decode(&mut self, packet: &Packet) {
        if packet.content_negotiation.is_none() {
            self.use_fast_infoset_for_encoding = false;
        }
    }

    fn post_decode(&mut self, packet: &mut Packet) {
        packet.fast_infoset_disabled = self.fast_infoset_disabled;
        if self.features.is_mtom_enabled() {
            packet.check_mtom_acceptable();
        }
        if let Some(mtom) = self.features.mtom {
            packet.mtom_feature = Some(mtom);
        }
        if !self.use_fast_infoset_for_encoding && !self.fi_mime.is_empty() {
            self.use_fast_infoset_for_encoding = packet.fast_infoset_acceptable(self.fi_mime);
        }
    }

    fn is_fast_infoset_content(&self, content_type: &str) -> bool {
        matches_mime(content_type, self.version.fi_mime())
    }

    /// Reject Fast Infoset input when this codec cannot or may not decode it.
    fn check_fast_infoset_allowed(&self, packet: &Packet, honor_negotiation: bool) -> Result<()> {
        if self.fast_infoset_disabled || self.fi.is_none() {
            return Err(Error::FastInfosetNotAccepted);
        }
        if honor_negotiation && packet.content_negotiation == Some(ContentNegotiation::Off) {
            return Err(Error::FastInfosetNotAccepted);
        }
        Ok(())
    }

    /// Stream decode: a missing content type means the XML type.
    pub fn decode<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
        content_type: Option<&str>,
        packet: &mut Packet,
    ) -> Result<()> {
        let content_type = content_type.unwrap_or(self.version.xml_mime()).to_string();
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        packet.content_type = Some(content_type.clone());
        self.pre_decode(packet);
        let honor = !self.ignore_content_negotiation;
        self.dispatch_decode(&bytes, &content_type, packet, honor)
            .map_err(Error::into_message_error)?;
        self.post_decode(packet);
        Ok(())
    }

    /// Buffer decode: a missing content type is an unsupported media error.
    pub fn decode_buffer(
        &mut self,
        input: &[u8],
        content_type: Option<&str>,
        packet: &mut Packet,
    ) -> Result<()> {
        let content_type = content_type.ok_or(Error::UnsupportedMediaType(None))?;

        packet.content_type = Some(content_type.to_string());
        self.pre_decode(packet);
        self.dispatch_decode(input, content_type, packet, true)
            .map_err(Error::into_message_error)?;
        self.post_decode(packet);
        Ok(())
    }

    fn dispatch_decode(
        &mut self,
        input: &[u8],
        content_type: &str,
        packet: &mut Packet,
        honor_negotiation: bool,
    ) -> Result<()> {
        if matches_mime(content_type, MIME_MULTIPART_RELATED) {
            let mp = MimeMultipart::parse(input, content_type)?;
            return self.decode_multipart(&mp, packet);
        }
        if self.is_fast_infoset_content(content_type) {
            self.check_fast_infoset_allowed(packet, honor_negotiation)?;
            self.use_fast_infoset_for_encoding = true;
            return match self.fi.as_mut() {
                Some(fi) => fi.decode(input, content_type, packet),
                None => Err(Error::FastInfosetNotAccepted),
            };
        }
        self.xml.decode(input, content_type, packet)
    }

    fn decode_multipart(&mut self, mp: &MimeMultipart, packet: &mut Packet) -> Result<()> {
        let root_type = mp
            .root_part()
            .map(|p| p.content_type.clone())
            .ok_or_else(|| Error::Malformed("multipart package without root".into()))?;

        let is_mtom = matches_mime(&root_type, MIME_XOP_XML);
        packet.mtom_request = Some(is_mtom);

        if is_mtom {
            self.mtom.decode_multipart(mp, packet)
        } else if self.is_fast_infoset_content(&root_type) {
            self.check_fast_infoset_allowed(packet, true)?;
            self.use_fast_infoset_for_encoding = true;
            match self.fi_swa.as_mut() {
                Some(fi_swa) => fi_swa.decode_multipart(mp, packet),
                None => Err(Error::FastInfosetNotAccepted),
            }
        } else if matches_mime(&root_type, self.version.xml_mime()) {
            self.swa.decode_multipart(mp, packet)
        } else {
            Err(Error::Malformed(format!(
                "unsupported multipart root type '{}'",
                root_type
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MtomFeature;
    use crate::message::{Attachment, Message};

    fn packet(version: SoapVersion) -> Packet {
        let msg = Message::with_payload(version, r#"<c:Ping xmlns:c="urn:calc"/>"#).unwrap();
        Packet::with_message(msg)
    }

    #[test]
    fn test_accept_strings() {
        let codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
        assert_eq!(codec.xml_accept(), "text/xml, application/xop+xml");
        assert_eq!(
            codec.conneg_xml_accept(),
            "application/fastinfoset, text/xml, application/xop+xml"
        );
        assert!(!codec.ignores_content_negotiation());
    }

    #[test]
    fn test_select_optimal_encoding() {
        let features = Features::new().select_optimal_encoding(true).fast_infoset(true);
        let codec = SoapBindingCodec::new(SoapVersion::Soap11, features);
        assert!(codec.ignores_content_negotiation());
        assert!(codec.uses_fast_infoset_for_encoding());
        assert_eq!(codec.xml_accept(), codec.conneg_xml_accept());

        let off = SoapBindingCodec::new(
            SoapVersion::Soap11,
            Features::new().select_optimal_encoding(false),
        );
        assert!(off.is_fast_infoset_disabled());
    }

    #[test]
    fn test_loader_absence_wins() {
        let codec = SoapBindingCodec::with_loader(
            SoapVersion::Soap12,
            Features::new().fast_infoset(true).select_optimal_encoding(true),
            fastinfoset::unavailable,
        );
        assert!(codec.is_fast_infoset_disabled());
        assert!(codec.ignores_content_negotiation());
        assert!(!codec.uses_fast_infoset_for_encoding());
    }

    #[test]
    fn test_encoder_selection() {
        let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
        let mut p = packet(SoapVersion::Soap11);
        assert_eq!(codec.encoder_for(&mut p), EncoderKind::Xml);

        p.content_negotiation = Some(ContentNegotiation::Optimistic);
        assert_eq!(codec.encoder_for(&mut p), EncoderKind::FastInfoset);

        if let Some(m) = p.message.as_mut() {
            m.add_attachment(Attachment::new("a@x", "image/png", vec![1]));
        }
        assert_eq!(codec.encoder_for(&mut p), EncoderKind::FastInfosetSwa);

        // Sticky flag persists while the mode is pessimistic.
        p.content_negotiation = Some(ContentNegotiation::Pessimistic);
        assert_eq!(codec.encoder_for(&mut p), EncoderKind::FastInfosetSwa);

        p.content_negotiation = Some(ContentNegotiation::Off);
        assert_eq!(codec.encoder_for(&mut p), EncoderKind::Swa);
    }

    #[test]
    fn test_mtom_selected_from_feature() {
        let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new().mtom(true));
        let mut p = packet(SoapVersion::Soap11);
        assert_eq!(codec.encoder_for(&mut p), EncoderKind::Mtom);
        assert_eq!(p.mtom_feature, Some(MtomFeature::enabled()));
    }

    #[test]
    fn test_sticky_flag_latches_from_accept() {
        let mut server = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
        let mut wire = Vec::new();
        server
            .encode(&mut packet(SoapVersion::Soap11), &mut wire)
            .unwrap();

        let mut request = Packet::new();
        request.accept = Some("application/fastinfoset, text/xml".into());
        server
            .decode_buffer(&wire, Some("text/xml"), &mut request)
            .unwrap();
        assert!(server.uses_fast_infoset_for_encoding());

        let mut response = request.create_server_response(request.message.clone());
        assert_eq!(server.encoder_for(&mut response), EncoderKind::FastInfoset);

        // A packet without negotiation mode clears the flag before decoding.
        let mut plain = Packet::new();
        server.decode_buffer(&wire, Some("text/xml"), &mut plain).unwrap();
        assert!(!server.uses_fast_infoset_for_encoding());
    }

    #[test]
    fn test_decode_errors_are_wrapped() {
        let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
        let mut p = Packet::new();

        let err = codec.decode_buffer(b"<broken", Some("text/xml"), &mut p).unwrap_err();
        assert!(matches!(err, Error::MessageCreation(_)));

        let err = codec.decode_buffer(b"", None, &mut p).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(None)));

        let err = codec.decode_buffer(b"x", Some("image/gif"), &mut p).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(Some(_))));
    }

    #[test]
    fn test_stream_decode_defaults_to_xml() {
        let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
        let mut wire = Vec::new();
        codec.encode(&mut packet(SoapVersion::Soap11), &mut wire).unwrap();

        let mut p = Packet::new();
        codec.decode(&mut wire.as_slice(), None, &mut p).unwrap();
        assert_eq!(p.content_type.as_deref(), Some("text/xml"));
        assert_eq!(p.message.unwrap().payload_name().unwrap().local_part(), "Ping");
    }
}
