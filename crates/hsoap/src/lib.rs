// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HSOAP - SOAP/WSDL endpoint runtime
//!
//! Server-side runtime for SOAP 1.1/1.2 web service endpoints: a frozen WSDL
//! 1.1 model, a message pipeline of tubes driven by fibers, and a codec
//! negotiator choosing between XML, Fast Infoset, MTOM and SOAP with
//! Attachments per request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hsoap::server::{Adapter, Binding, EndpointBuilder, InvocationContext, TransportRequest};
//! use hsoap::wsdl::WsdlParser;
//! use hsoap::{Message, QName, Result, SoapVersion};
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let model = WsdlParser::new().parse_location("calculator.wsdl")?;
//!     let endpoint = EndpointBuilder::new(
//!         QName::new("urn:calc", "CalculatorService"),
//!         QName::new("urn:calc", "CalculatorPort"),
//!         Binding::new(SoapVersion::Soap11),
//!     )
//!     .wsdl(Arc::new(model))
//!     .invoker(|_cx: &InvocationContext<'_>, request: Message| Ok(Some(request)))
//!     .build()?;
//!
//!     let adapter = Adapter::new(endpoint);
//!     let reply = adapter.handle(TransportRequest::new("text/xml", std::fs::read("request.xml")?));
//!     println!("{} {:?}", reply.status, reply.content_type);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                 Transport (HTTP server, test harness)               |
//! |        Adapter -> Toolkit (codec copy + pipe head) per thread       |
//! +---------------------------------------------------------------------+
//! |                            Codec layer                              |
//! |     SoapBindingCodec: XML | Fast Infoset | MTOM/XOP | SwA (MIME)    |
//! +---------------------------------------------------------------------+
//! |                           Pipeline layer                            |
//! |   Endpoint -> Fiber -> Tubeline (must-understand, addressing, ...)  |
//! +---------------------------------------------------------------------+
//! |                             Model layer                             |
//! |        WSDL 1.1 parser + extensions -> frozen WsdlModel             |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`wsdl::WsdlModel`] | Parsed, frozen WSDL document |
//! | [`codec::SoapBindingCodec`] | Per-connection encoding negotiator |
//! | [`Packet`] | In-flight request or response plus metadata |
//! | [`engine::Fiber`] | Drives one packet through one tubeline |
//! | [`server::Endpoint`] | Master tubeline, tubeline pool, lifecycle |
//! | [`server::Adapter`] | Bytes-in, bytes-out front of an endpoint |
//!
//! ## Modules Overview
//!
//! - [`wsdl`] - WSDL model and parser
//! - [`codec`] - Message encodings and negotiation
//! - [`pipe`] - Tubes, tubeline assembly and pooling
//! - [`engine`] - Fibers and executors
//! - [`server`] - Endpoints and the transport adapter
//! - [`databinding`] - Databinding providers

/// Message codecs and the SOAP binding codec negotiator.
pub mod codec;
/// Protocol constants, binding features and runtime documents.
pub mod config;
/// Databinding provider SPI.
pub mod databinding;
/// Fiber dispatch engine and executors.
pub mod engine;
/// Error type shared by every layer.
pub mod error;
/// SOAP messages, envelopes and faults.
pub mod message;
/// In-flight request/response container.
pub mod packet;
/// Tubes, tubelines and pooling.
pub mod pipe;
/// Qualified XML names.
pub mod qname;
/// Endpoints, dispatch and the transport adapter.
pub mod server;
/// WSDL 1.1 model and parser.
pub mod wsdl;

pub use error::{Error, Result};
pub use message::{Attachment, Header, Message, Payload, SoapVersion};
pub use packet::{ContentNegotiation, Packet, ThrowableContainer};
pub use qname::QName;

/// HSOAP version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
