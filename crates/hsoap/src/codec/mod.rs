// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message codecs and the SOAP binding codec negotiator.
//!
//! # Architecture
//!
//! ```text
//!                     SoapBindingCodec (negotiator, one per thread)
//!        +-----------+-----------+-----------+-----------+
//!        |           |           |           |           |
//!   StreamSoap    MtomCodec    SwaCodec   FastInfoset  SwaCodec
//!   (text/xml)   (xop root)   (xml root)   (binary)   (FI root)
//!                     \           |                      /
//!                      +----- MimeMultipart ------------+
//! ```
//!
//! Codecs hold per-instance scratch state and are not shared between threads;
//! [`Codec::copy`] produces an independent instance.

mod binding;
mod content_type;
pub mod fastinfoset;
pub mod mime;
mod mtom;
mod stream;
mod swa;

pub use binding::{EncoderKind, FastInfosetLoader, SoapBindingCodec};
pub use content_type::{matches_mime, ContentType, MediaType};
pub use fastinfoset::FastInfosetCodec;
pub use mtom::MtomCodec;
pub use stream::StreamSoapCodec;
pub use swa::SwaCodec;

use crate::error::Result;
use crate::packet::Packet;

/// Encoder/decoder for one wire format.
pub trait Codec: Send {
    /// Primary MIME type of this codec.
    fn mime_type(&self) -> &str;

    /// Encode `packet.message` into `out`, returning the wire content type.
    fn encode(&mut self, packet: &mut Packet, out: &mut Vec<u8>) -> Result<ContentType>;

    /// Decode wire bytes into `packet.message`.
    fn decode(&mut self, input: &[u8], content_type: &str, packet: &mut Packet) -> Result<()>;

    /// Independent instance with the same configuration.
    fn copy(&self) -> Box<dyn Codec>;
}
