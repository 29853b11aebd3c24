// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Codec negotiation integration tests
//!
//! Exercises `SoapBindingCodec` through its public API: encoder choice per
//! negotiation mode, Fast Infoset acceptance on decode, the sticky
//! encoding flag and `multipart/related` packages (MTOM, SwA, FI-SwA).

use hsoap::codec::mime::{MimeMultipart, MimePart};
use hsoap::codec::{fastinfoset, EncoderKind, SoapBindingCodec};
use hsoap::config::Features;
use hsoap::server::{Adapter, Binding, EndpointBuilder, InvocationContext, MonitoringRegistry, TransportRequest};
use hsoap::{Attachment, ContentNegotiation, Error, Message, Packet, QName, SoapVersion};
use std::sync::Arc;

const PAYLOAD: &str = r#"<c:Add xmlns:c="urn:calc"><c:a>1</c:a><c:b>2</c:b></c:Add>"#;

fn request(version: SoapVersion) -> Packet {
    Packet::with_message(Message::with_payload(version, PAYLOAD).unwrap())
}

/// Fast Infoset bytes of a SOAP 1.1 request, produced by the codec itself.
fn fi_request() -> (Vec<u8>, String) {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let mut packet = request(SoapVersion::Soap11);
    packet.content_negotiation = Some(ContentNegotiation::Optimistic);
    let mut out = Vec::new();
    let ct = codec.encode(&mut packet, &mut out).unwrap();
    assert!(fastinfoset::is_fast_infoset(&out));
    (out, ct.content_type)
}

#[test]
fn test_xml_roundtrip_preserves_payload() {
    for version in [SoapVersion::Soap11, SoapVersion::Soap12] {
        let mut codec = SoapBindingCodec::new(version, Features::new());
        let mut packet = request(version);
        let mut out = Vec::new();
        let ct = codec.encode(&mut packet, &mut out).unwrap();
        assert!(ct.content_type.starts_with(version.xml_mime()), "{}", ct.content_type);

        let mut decoded = Packet::new();
        codec
            .copy()
            .decode_buffer(&out, Some(&ct.content_type), &mut decoded)
            .unwrap();
        let message = decoded.message.unwrap();
        assert_eq!(message.payload_name(), Some(&QName::new("urn:calc", "Add")));
        let body = &message.payload().unwrap().content;
        assert!(body.contains(">1<") && body.contains(">2<"), "{}", body);
    }
}

#[test]
fn test_fast_infoset_disabled_never_encodes_fi() {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new().fast_infoset(false));
    let modes = [
        None,
        Some(ContentNegotiation::Off),
        Some(ContentNegotiation::Pessimistic),
        Some(ContentNegotiation::Optimistic),
    ];
    for mode in modes {
        let mut packet = request(SoapVersion::Soap11);
        packet.content_negotiation = mode;
        packet.accept = Some("application/fastinfoset".into());
        assert_eq!(codec.encoder_for(&mut packet), EncoderKind::Xml);

        let mut out = Vec::new();
        let ct = codec.encode(&mut packet, &mut out).unwrap();
        assert!(ct.content_type.starts_with("text/xml"));
        assert!(!fastinfoset::is_fast_infoset(&out));
    }
}

#[test]
fn test_negotiation_off_rejects_fi_input() {
    let (bytes, content_type) = fi_request();
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());

    let mut off = Packet::new();
    off.content_negotiation = Some(ContentNegotiation::Off);
    let err = codec.decode_buffer(&bytes, Some(&content_type), &mut off).unwrap_err();
    assert!(matches!(err, Error::FastInfosetNotAccepted));

    let mut optimistic = Packet::new();
    optimistic.content_negotiation = Some(ContentNegotiation::Optimistic);
    codec
        .decode_buffer(&bytes, Some(&content_type), &mut optimistic)
        .unwrap();
    assert_eq!(
        optimistic.message.unwrap().payload_name(),
        Some(&QName::new("urn:calc", "Add"))
    );
}

#[test]
fn test_fi_unavailable_rejects_fi_input() {
    let (bytes, content_type) = fi_request();
    let mut codec = SoapBindingCodec::with_loader(SoapVersion::Soap11, Features::new(), fastinfoset::unavailable);
    assert!(codec.is_fast_infoset_disabled());

    let mut packet = Packet::new();
    packet.content_negotiation = Some(ContentNegotiation::Optimistic);
    let err = codec.decode_buffer(&bytes, Some(&content_type), &mut packet).unwrap_err();
    assert!(matches!(err, Error::FastInfosetNotAccepted));
}

#[test]
fn test_missing_content_type_on_buffer_decode() {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let err = codec.decode_buffer(b"<x/>", None, &mut Packet::new()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedMediaType(None)));
}

fn echo_adapter() -> Adapter {
    let endpoint = EndpointBuilder::new(
        QName::new("urn:calc", "CalcService"),
        QName::new("urn:calc", "CalcPort"),
        Binding::new(SoapVersion::Soap11),
    )
    .invoker(|_cx: &InvocationContext<'_>, request: Message| Ok(Some(request)))
    .monitoring(Arc::new(MonitoringRegistry::new()))
    .build()
    .unwrap();
    Adapter::new(endpoint)
}

#[test]
fn test_fi_request_answered_in_fi() {
    let (bytes, content_type) = fi_request();
    let response = echo_adapter().handle(TransportRequest::new(content_type, bytes));
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("application/fastinfoset"));
    assert!(fastinfoset::is_fast_infoset(&response.body));
}

#[test]
fn test_accept_header_switches_reply_to_fi() {
    let xml = Message::with_payload(SoapVersion::Soap11, PAYLOAD)
        .unwrap()
        .to_envelope_string();
    let adapter = echo_adapter();

    let plain = adapter.handle(TransportRequest::new("text/xml; charset=utf-8", xml.clone()));
    assert!(plain.content_type.as_deref().is_some_and(|c| c.starts_with("text/xml")));

    let accepting = adapter.handle(
        TransportRequest::new("text/xml; charset=utf-8", xml).with_accept("application/fastinfoset, text/xml"),
    );
    assert_eq!(accepting.status, 200);
    assert!(fastinfoset::is_fast_infoset(&accepting.body));
}

// ============================================================================
// multipart/related
// ============================================================================

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', b'-', b'-', 0x00, 0xFF];

fn with_attachment(version: SoapVersion) -> Packet {
    let mut packet = request(version);
    if let Some(message) = packet.message.as_mut() {
        message.add_attachment(Attachment::new("chart@calc", "image/png", PNG));
    }
    packet
}

/// Encodes `packet`, checks the chosen encoder and returns body and content type.
fn encode_as(codec: &mut SoapBindingCodec, mut packet: Packet, expected: EncoderKind) -> (Vec<u8>, String) {
    assert_eq!(codec.encoder_for(&mut packet), expected);
    let mut out = Vec::new();
    let ct = codec.encode(&mut packet, &mut out).unwrap();
    assert!(ct.content_type.starts_with("multipart/related"), "{}", ct.content_type);
    (out, ct.content_type)
}

fn assert_add_with_chart(packet: &Packet) {
    let message = packet.message.as_ref().unwrap();
    assert_eq!(message.payload_name(), Some(&QName::new("urn:calc", "Add")));
    assert_eq!(message.attachments().len(), 1);
    let chart = message.attachment("cid:chart@calc").unwrap();
    assert_eq!(chart.content_type, "image/png");
    assert_eq!(chart.data, PNG);
}

#[test]
fn test_swa_package_decodes_root_and_attachments() {
    for version in [SoapVersion::Soap11, SoapVersion::Soap12] {
        let mut codec = SoapBindingCodec::new(version, Features::new());
        let (body, content_type) = encode_as(&mut codec, with_attachment(version), EncoderKind::Swa);
        assert!(content_type.contains(&format!("type=\"{}\"", version.xml_mime())), "{}", content_type);

        let mut decoder = codec.copy();
        let mut packet = Packet::new();
        decoder.decode_buffer(&body, Some(&content_type), &mut packet).unwrap();
        assert_add_with_chart(&packet);
        assert_eq!(packet.mtom_request, Some(false));
        assert!(!decoder.uses_fast_infoset_for_encoding());
    }
}

#[test]
fn test_mtom_package_marks_request_as_mtom() {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap12, Features::new().mtom(true));
    let (body, content_type) = encode_as(&mut codec, with_attachment(SoapVersion::Soap12), EncoderKind::Mtom);
    assert!(content_type.contains("application/xop+xml"), "{}", content_type);

    // A plain binding still reads MTOM input.
    let mut decoder = SoapBindingCodec::new(SoapVersion::Soap12, Features::new());
    let mut packet = Packet::new();
    decoder.decode_buffer(&body, Some(&content_type), &mut packet).unwrap();
    assert_add_with_chart(&packet);
    assert_eq!(packet.mtom_request, Some(true));

    // With MTOM enabled, the reply to an MTOM request is MTOM too.
    let mut mtom = codec.copy();
    let mut packet = Packet::new();
    mtom.decode_buffer(&body, Some(&content_type), &mut packet).unwrap();
    assert_eq!(packet.mtom_request, Some(true));
    assert!(packet.should_use_mtom());
}

#[test]
fn test_fi_swa_package_honors_negotiation() {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let mut outgoing = with_attachment(SoapVersion::Soap11);
    outgoing.content_negotiation = Some(ContentNegotiation::Optimistic);
    let (body, content_type) = encode_as(&mut codec, outgoing, EncoderKind::FastInfosetSwa);
    assert!(content_type.contains("type=\"application/fastinfoset\""), "{}", content_type);

    let mut decoder = codec.copy();
    let mut optimistic = Packet::new();
    optimistic.content_negotiation = Some(ContentNegotiation::Optimistic);
    decoder
        .decode_buffer(&body, Some(&content_type), &mut optimistic)
        .unwrap();
    assert_add_with_chart(&optimistic);
    assert_eq!(optimistic.mtom_request, Some(false));
    assert!(decoder.uses_fast_infoset_for_encoding());

    let mut off = Packet::new();
    off.content_negotiation = Some(ContentNegotiation::Off);
    let err = codec
        .copy()
        .decode_buffer(&body, Some(&content_type), &mut off)
        .unwrap_err();
    assert!(matches!(err, Error::FastInfosetNotAccepted));
}

#[test]
fn test_fi_swa_rejected_without_fi_runtime() {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let mut outgoing = with_attachment(SoapVersion::Soap11);
    outgoing.content_negotiation = Some(ContentNegotiation::Optimistic);
    let (body, content_type) = encode_as(&mut codec, outgoing, EncoderKind::FastInfosetSwa);

    let mut decoder = SoapBindingCodec::with_loader(SoapVersion::Soap11, Features::new(), fastinfoset::unavailable);
    let mut packet = Packet::new();
    packet.content_negotiation = Some(ContentNegotiation::Optimistic);
    let err = decoder
        .decode_buffer(&body, Some(&content_type), &mut packet)
        .unwrap_err();
    assert!(matches!(err, Error::FastInfosetNotAccepted));
}

#[test]
fn test_unsupported_multipart_root_is_a_message_error() {
    let mut mp = MimeMultipart::new();
    mp.add_part(MimePart::new(Some("root@calc".into()), "text/plain", b"1 + 2".to_vec()));
    mp.add_part(MimePart::new(Some("chart@calc".into()), "image/png", PNG.to_vec()));
    let mut body = Vec::new();
    mp.write(&mut body);
    let content_type = mp.content_type("text/plain", &[]);

    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let mut packet = Packet::new();
    let err = codec
        .decode_buffer(&body, Some(&content_type), &mut packet)
        .unwrap_err();
    match err {
        Error::MessageCreation(msg) => assert!(msg.contains("unsupported multipart root type 'text/plain'"), "{}", msg),
        other => panic!("unexpected error: {}", other),
    }
    assert!(packet.message.is_none());
}

#[test]
fn test_swa_request_through_adapter_keeps_attachments() {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let (body, content_type) = encode_as(&mut codec, with_attachment(SoapVersion::Soap11), EncoderKind::Swa);

    let response = echo_adapter().handle(TransportRequest::new(content_type, body));
    assert_eq!(response.status, 200);
    let reply_type = response.content_type.unwrap();
    assert!(reply_type.starts_with("multipart/related"), "{}", reply_type);

    let mut packet = Packet::new();
    codec
        .copy()
        .decode_buffer(&response.body, Some(&reply_type), &mut packet)
        .unwrap();
    assert_add_with_chart(&packet);
}
