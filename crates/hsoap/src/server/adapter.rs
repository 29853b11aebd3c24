// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport-neutral front of an endpoint: bytes in, bytes out.
//!
//! An [`Adapter`] pools [`Toolkit`]s (a codec copy plus a pipe head) so each
//! transport thread works on state nobody else touches.

use super::endpoint::{Endpoint, PipeHead};
use super::transport::{TransportBackChannel, WebServiceContextDelegate};
use crate::codec::SoapBindingCodec;
use crate::engine::Completion;
use crate::error::{Error, Result};
use crate::message::fault::create_fault_message;
use crate::message::SoapVersion;
use crate::packet::Packet;
use crate::pipe::{Pool, PoolCell};
use std::sync::Arc;

pub const STATUS_OK: u16 = 200;
pub const STATUS_ACCEPTED: u16 = 202;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_UNSUPPORTED_MEDIA_TYPE: u16 = 415;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Request as received by a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportRequest {
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// `Accept` header.
    pub accept: Option<String>,
    /// `SOAPAction` header.
    pub soap_action: Option<String>,
    pub body: Vec<u8>,
}

impl TransportRequest {
    pub fn new(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    #[must_use]
    pub fn with_soap_action(mut self, action: impl Into<String>) -> Self {
        self.soap_action = Some(action.into());
        self
    }
}

/// Reply for the transport to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// `Content-Type` header (`None` for an empty reply).
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Per-thread processing state of an [`Adapter`].
pub struct Toolkit {
    codec: SoapBindingCodec,
    head: PipeHead,
}

impl Toolkit {
    fn new(endpoint: &Endpoint) -> Self {
        Self {
            codec: endpoint.create_codec(),
            head: endpoint.create_pipe_head(),
        }
    }

    /// Decode, process and encode one request.
    pub fn handle(
        &mut self,
        request: TransportRequest,
        context_delegate: Option<Arc<dyn WebServiceContextDelegate>>,
        back_channel: Option<Box<dyn TransportBackChannel>>,
    ) -> TransportResponse {
        let packet = match decode_request(&mut self.codec, &request) {
            Ok(packet) => packet,
            Err((packet, e)) => return decode_failure(&mut self.codec, packet, &e),
        };
        let response = self.head.process(packet, context_delegate, back_channel);
        encode_response(&mut self.codec, response)
    }
}

/// Pool of toolkits in front of one endpoint.
pub struct Adapter {
    endpoint: Endpoint,
    toolkits: PoolCell<Toolkit>,
}

impl Adapter {
    pub fn new(endpoint: Endpoint) -> Self {
        let toolkits = PoolCell::new(toolkit_pool(&endpoint));
        Self { endpoint, toolkits }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Drop the pooled toolkits; new ones pick up the current endpoint state.
    pub fn reconfigure(&self) {
        self.toolkits.replace(toolkit_pool(&self.endpoint));
    }

    /// Synchronous request handling on the calling thread.
    pub fn handle(&self, request: TransportRequest) -> TransportResponse {
        self.handle_with(request, None, None)
    }

    /// [`handle`](Self::handle) with transport context.
    pub fn handle_with(
        &self,
        request: TransportRequest,
        context_delegate: Option<Arc<dyn WebServiceContextDelegate>>,
        back_channel: Option<Box<dyn TransportBackChannel>>,
    ) -> TransportResponse {
        let mut toolkit = self.toolkits.take();
        let response = toolkit.handle(request, context_delegate, back_channel);
        self.toolkits.recycle(toolkit);
        response
    }

    /// Asynchronous request handling through [`Endpoint::process`].
    ///
    /// `on_response` runs exactly once, possibly on an executor thread.
    /// Decode failures are answered before this returns.
    pub fn handle_async(
        &self,
        request: TransportRequest,
        on_response: impl FnOnce(TransportResponse) + Send + 'static,
    ) -> Result<()> {
        let mut codec = self.endpoint.create_codec();
        let packet = match decode_request(&mut codec, &request) {
            Ok(packet) => packet,
            Err((packet, e)) => {
                on_response(decode_failure(&mut codec, packet, &e));
                return Ok(());
            }
        };
        let version = self.endpoint.info().soap_version();
        self.endpoint.process(
            packet,
            move |completion: Completion| {
                let response = match completion {
                    Completion::Response(packet) => encode_response(&mut codec, packet),
                    Completion::Failure(e) => {
                        let packet = Packet::with_message(create_fault_message(version, &e));
                        encode_response(&mut codec, packet)
                    }
                };
                on_response(response);
            },
            None,
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("endpoint", self.endpoint.info().port_name())
            .field("toolkits", &self.toolkits.pool().stats())
            .finish()
    }
}

fn toolkit_pool(endpoint: &Endpoint) -> Pool<Toolkit> {
    let endpoint = endpoint.clone();
    Pool::new(move || Toolkit::new(&endpoint))
}

fn decode_request(
    codec: &mut SoapBindingCodec,
    request: &TransportRequest,
) -> std::result::Result<Packet, (Packet, Error)> {
    let mut packet = Packet::new();
    packet.accept.clone_from(&request.accept);
    packet.soap_action.clone_from(&request.soap_action);
    match codec.decode_buffer(&request.body, request.content_type.as_deref(), &mut packet) {
        Ok(()) => Ok(packet),
        Err(e) => Err((packet, e)),
    }
}

/// Fault reply for a request that could not be decoded.
fn decode_failure(codec: &mut SoapBindingCodec, request: Packet, error: &Error) -> TransportResponse {
    let status = match error {
        Error::UnsupportedMediaType(_) | Error::FastInfosetNotAccepted => STATUS_UNSUPPORTED_MEDIA_TYPE,
        _ => STATUS_BAD_REQUEST,
    };
    log::debug!("[adapter] decode failed ({}): {}", status, error);
    let version: SoapVersion = codec.soap_version();
    let mut reply = request.create_server_response(Some(create_fault_message(version, error)));
    // The request's own content type may be what we could not handle.
    reply.content_negotiation = None;
    let mut response = encode_response(codec, reply);
    response.status = status;
    response
}

fn encode_response(codec: &mut SoapBindingCodec, mut packet: Packet) -> TransportResponse {
    let status = match &packet.message {
        None => return TransportResponse::empty(STATUS_ACCEPTED),
        Some(m) if m.is_fault() => STATUS_INTERNAL_ERROR,
        Some(_) => STATUS_OK,
    };
    let mut body = Vec::new();
    match codec.encode(&mut packet, &mut body) {
        Ok(content_type) => TransportResponse {
            status,
            content_type: Some(content_type.content_type),
            body,
        },
        Err(e) => {
            log::error!("[adapter] cannot encode response: {}", e);
            TransportResponse::empty(STATUS_INTERNAL_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::qname::QName;
    use crate::server::{Binding, EndpointBuilder, InvocationContext, MonitoringRegistry};

    fn adapter() -> Adapter {
        let endpoint = EndpointBuilder::new(
            QName::new("urn:echo", "EchoService"),
            QName::new("urn:echo", "EchoPort"),
            Binding::new(SoapVersion::Soap11),
        )
        .invoker(|_cx: &InvocationContext<'_>, request: Message| {
            if request.payload_name().is_some_and(|n| n.local_part() == "ping") {
                return Ok(None);
            }
            Ok(Some(request))
        })
        .monitoring(Arc::new(MonitoringRegistry::new()))
        .build()
        .unwrap();
        Adapter::new(endpoint)
    }

    fn envelope(payload: &str) -> Vec<u8> {
        Message::with_payload(SoapVersion::Soap11, payload)
            .unwrap()
            .to_envelope_string()
            .into_bytes()
    }

    #[test]
    fn test_status_codes() {
        let adapter = adapter();

        let ok = adapter.handle(TransportRequest::new("text/xml", envelope("<echo xmlns=\"urn:echo\">1</echo>")));
        assert_eq!(ok.status, STATUS_OK);
        assert!(ok.content_type.as_deref().is_some_and(|c| c.starts_with("text/xml")));
        assert!(String::from_utf8_lossy(&ok.body).contains("echo"));

        let one_way = adapter.handle(TransportRequest::new("text/xml", envelope("<ping xmlns=\"urn:echo\"/>")));
        assert_eq!(one_way.status, STATUS_ACCEPTED);
        assert!(one_way.body.is_empty());

        let media = adapter.handle(TransportRequest::new("image/png", vec![1, 2, 3]));
        assert_eq!(media.status, STATUS_UNSUPPORTED_MEDIA_TYPE);

        let bad = adapter.handle(TransportRequest::new("text/xml", b"<not-soap/>".to_vec()));
        assert_eq!(bad.status, STATUS_BAD_REQUEST);
        assert!(String::from_utf8_lossy(&bad.body).contains("Fault"));
    }
}
