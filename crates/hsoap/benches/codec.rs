// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::semicolon_if_nothing_returned)] // Benchmark code formatting

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hsoap::codec::SoapBindingCodec;
use hsoap::config::Features;
use hsoap::{ContentNegotiation, Message, Packet, SoapVersion};

fn payload(items: usize) -> String {
    let mut xml = String::from(r#"<o:Order xmlns:o="urn:orders">"#);
    for i in 0..items {
        xml.push_str(&format!("<o:line sku=\"SKU-{0}\"><o:qty>{0}</o:qty></o:line>", i));
    }
    xml.push_str("</o:Order>");
    xml
}

fn request(items: usize, negotiation: Option<ContentNegotiation>) -> Packet {
    let mut packet = Packet::with_message(Message::with_payload(SoapVersion::Soap11, &payload(items)).unwrap());
    packet.content_negotiation = negotiation;
    packet
}

fn encoded(items: usize, negotiation: Option<ContentNegotiation>) -> (Vec<u8>, String) {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let mut out = Vec::new();
    let ct = codec.encode(&mut request(items, negotiation), &mut out).unwrap();
    (out, ct.content_type)
}

// ============================================================================
// XML
// ============================================================================

/// Benchmark: SOAP 1.1 XML encode, 64 body lines
fn bench_xml_encode(c: &mut Criterion) {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let mut out = Vec::with_capacity(8192);
    c.bench_function("xml_encode_64", |b| {
        b.iter_batched(
            || request(64, None),
            |mut packet| {
                out.clear();
                codec.encode(&mut packet, &mut out).unwrap();
                black_box(out.len())
            },
            BatchSize::SmallInput,
        )
    });
}

/// Benchmark: SOAP 1.1 XML decode, 64 body lines
fn bench_xml_decode(c: &mut Criterion) {
    let (bytes, content_type) = encoded(64, None);
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    c.bench_function("xml_decode_64", |b| {
        b.iter(|| {
            let mut packet = Packet::new();
            codec
                .decode_buffer(black_box(&bytes), Some(&content_type), &mut packet)
                .unwrap();
            black_box(packet.message.is_some())
        })
    });
}

// ============================================================================
// Fast Infoset
// ============================================================================

/// Benchmark: Fast Infoset encode (optimistic negotiation), 64 body lines
fn bench_fi_encode(c: &mut Criterion) {
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    let mut out = Vec::with_capacity(8192);
    c.bench_function("fi_encode_64", |b| {
        b.iter_batched(
            || request(64, Some(ContentNegotiation::Optimistic)),
            |mut packet| {
                out.clear();
                codec.encode(&mut packet, &mut out).unwrap();
                black_box(out.len())
            },
            BatchSize::SmallInput,
        )
    });
}

/// Benchmark: Fast Infoset decode, 64 body lines
fn bench_fi_decode(c: &mut Criterion) {
    let (bytes, content_type) = encoded(64, Some(ContentNegotiation::Optimistic));
    let mut codec = SoapBindingCodec::new(SoapVersion::Soap11, Features::new());
    c.bench_function("fi_decode_64", |b| {
        b.iter(|| {
            let mut packet = Packet::new();
            packet.content_negotiation = Some(ContentNegotiation::Optimistic);
            codec
                .decode_buffer(black_box(&bytes), Some(&content_type), &mut packet)
                .unwrap();
            black_box(packet.message.is_some())
        })
    });
}

criterion_group!(xml, bench_xml_encode, bench_xml_decode);
criterion_group!(fast_infoset, bench_fi_encode, bench_fi_decode);
criterion_main!(xml, fast_infoset);
