// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet: the unit of data flowing through a tubeline.
//!
//! A packet carries an optional [`Message`], the content negotiation metadata
//! the codec needs to pick an encoding for the reply, a reference to the
//! owning endpoint, and two side channels for tubes:
//!
//! - **satellites**: typed values keyed by their Rust type (at most one per type)
//! - **properties**: named string values
//!
//! A packet is owned by exactly one fiber at a time; it is `Send` but never shared.

use crate::config::{MtomFeature, MIME_XOP_XML};
use crate::error::Error;
use crate::message::Message;
use crate::server::EndpointInfo;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Client-requested content negotiation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentNegotiation {
    /// Never use Fast Infoset (wire value `none`).
    Off,
    /// Use Fast Infoset only once the peer has shown it accepts it.
    Pessimistic,
    /// Use Fast Infoset immediately.
    Optimistic,
}

impl FromStr for ContentNegotiation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(ContentNegotiation::Off),
            "pessimistic" => Ok(ContentNegotiation::Pessimistic),
            "optimistic" => Ok(ContentNegotiation::Optimistic),
            other => Err(Error::Config(format!(
                "Unknown content negotiation mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ContentNegotiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentNegotiation::Off => write!(f, "none"),
            ContentNegotiation::Pessimistic => write!(f, "pessimistic"),
            ContentNegotiation::Optimistic => write!(f, "optimistic"),
        }
    }
}

/// Failure carried inside a packet instead of being raised.
///
/// Attached by a fiber running in deliver-error-in-packet mode; the endpoint
/// turns it into a fault exactly once.
#[derive(Debug)]
pub struct ThrowableContainer {
    error: Option<Error>,
    fault_created: bool,
}

impl ThrowableContainer {
    /// Wrap an error.
    pub fn new(error: Error) -> Self {
        Self {
            error: Some(error),
            fault_created: false,
        }
    }

    /// The carried error (`None` once consumed by fault creation).
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether the fault response was already created from this error.
    #[inline]
    pub fn is_fault_created(&self) -> bool {
        self.fault_created
    }

    /// Take the error for fault creation and mark the fault as created.
    ///
    /// Returns `None` on every call after the first.
    pub fn take_for_fault(&mut self) -> Option<Error> {
        if self.fault_created {
            return None;
        }
        self.fault_created = true;
        self.error.take()
    }
}

/// In-flight request or response.
#[derive(Default)]
pub struct Packet {
    /// Message payload (`None` for one-way responses).
    pub message: Option<Message>,
    /// Content negotiation mode requested by the client.
    pub content_negotiation: Option<ContentNegotiation>,
    /// Wire content type of the decoded/encoded message.
    pub content_type: Option<String>,
    /// Accept header sent by the peer.
    pub accept: Option<String>,
    /// SOAPAction (1.1 header or 1.2 `action` parameter).
    pub soap_action: Option<String>,
    /// Fast Infoset administratively disabled on the codec that decoded this packet.
    pub fast_infoset_disabled: bool,
    /// Whether the request arrived MTOM-encoded (`None` = unknown).
    pub mtom_request: Option<bool>,
    /// Whether the peer accepts MTOM replies (`None` = not evaluated).
    pub mtom_acceptable: Option<bool>,
    /// MTOM feature of the binding that decoded the packet.
    pub mtom_feature: Option<MtomFeature>,
    /// Endpoint that owns this packet.
    pub endpoint: Option<Arc<EndpointInfo>>,
    satellites: HashMap<TypeId, Box<dyn Any + Send>>,
    properties: HashMap<String, String>,
}

impl Packet {
    /// Empty packet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Packet carrying a message.
    pub fn with_message(message: Message) -> Self {
        Self {
            message: Some(message),
            ..Self::default()
        }
    }

    /// Whether the peer listed the Fast Infoset content type in its Accept header.
    pub fn fast_infoset_acceptable(&self, fi_mime: &str) -> bool {
        accept_contains(self.accept.as_deref(), fi_mime)
    }

    /// Evaluate (once) whether the peer accepts MTOM replies.
    pub fn check_mtom_acceptable(&mut self) -> bool {
        if let Some(acceptable) = self.mtom_acceptable {
            return acceptable;
        }
        let acceptable = if self.fast_infoset_disabled {
            false
        } else {
            accept_contains(self.accept.as_deref(), MIME_XOP_XML)
        };
        self.mtom_acceptable = Some(acceptable);
        acceptable
    }

    /// Whether the outbound message should be MTOM-encoded.
    ///
    /// Requires an enabled MTOM feature; then MTOM is used when the request
    /// was MTOM, when the peer accepts it, or when nothing is known about the
    /// peer.
    pub fn should_use_mtom(&self) -> bool {
        let enabled = self.mtom_feature.map(|m| m.enabled).unwrap_or(false);
        if !enabled {
            return false;
        }
        match (self.mtom_request, self.mtom_acceptable) {
            (Some(true), _) => true,
            (_, Some(true)) => true,
            (None, None) => true,
            _ => false,
        }
    }

    /// Derive the response packet.
    ///
    /// Negotiation metadata, endpoint reference and properties are kept;
    /// content type and satellites are not.
    pub fn create_server_response(&self, message: Option<Message>) -> Packet {
        Packet {
            message,
            content_negotiation: self.content_negotiation,
            content_type: None,
            accept: self.accept.clone(),
            soap_action: None,
            fast_infoset_disabled: self.fast_infoset_disabled,
            mtom_request: self.mtom_request,
            mtom_acceptable: self.mtom_acceptable,
            mtom_feature: self.mtom_feature,
            endpoint: self.endpoint.clone(),
            satellites: HashMap::new(),
            properties: self.properties.clone(),
        }
    }

    // =======================================================================
    // Satellites
    // =======================================================================

    /// Attach a satellite, replacing any previous one of the same type.
    pub fn set_satellite<T: Any + Send>(&mut self, value: T) {
        self.satellites.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Satellite of type `T`.
    pub fn satellite<T: Any + Send>(&self) -> Option<&T> {
        self.satellites
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    /// Mutable satellite of type `T`.
    pub fn satellite_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.satellites
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    /// Detach the satellite of type `T`.
    pub fn take_satellite<T: Any + Send>(&mut self) -> Option<T> {
        self.satellites
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Whether a failure is carried in this packet.
    pub fn has_throwable(&self) -> bool {
        self.satellite::<ThrowableContainer>().is_some()
    }

    // =======================================================================
    // Properties
    // =======================================================================

    /// Set a named property.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Named property.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("payload", &self.message.as_ref().and_then(Message::payload_name))
            .field("content_negotiation", &self.content_negotiation)
            .field("content_type", &self.content_type)
            .field("accept", &self.accept)
            .field("soap_action", &self.soap_action)
            .field("fast_infoset_disabled", &self.fast_infoset_disabled)
            .field("mtom_request", &self.mtom_request)
            .field("satellites", &self.satellites.len())
            .field("properties", &self.properties)
            .finish()
    }
}

/// Case-insensitive search of a media type in an Accept header.
fn accept_contains(accept: Option<&str>, mime: &str) -> bool {
    let Some(accept) = accept else {
        return false;
    };
    accept
        .split(',')
        .map(|entry| entry.split(';').next().unwrap_or("").trim())
        .any(|entry| entry.eq_ignore_ascii_case(mime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SoapVersion;

    #[test]
    fn test_negotiation_parse() {
        assert_eq!("none".parse::<ContentNegotiation>().unwrap(), ContentNegotiation::Off);
        assert_eq!(
            "Optimistic".parse::<ContentNegotiation>().unwrap(),
            ContentNegotiation::Optimistic
        );
        assert!("sometimes".parse::<ContentNegotiation>().is_err());
    }

    #[test]
    fn test_fast_infoset_acceptable() {
        let mut packet = Packet::new();
        assert!(!packet.fast_infoset_acceptable("application/fastinfoset"));

        packet.accept = Some("application/FastInfoset;q=0.9, text/xml".into());
        assert!(packet.fast_infoset_acceptable("application/fastinfoset"));
        assert!(!packet.fast_infoset_acceptable("application/soap+fastinfoset"));
    }

    #[test]
    fn test_mtom_eligibility() {
        let mut packet = Packet::new();
        assert!(!packet.should_use_mtom());

        packet.mtom_feature = Some(MtomFeature::enabled());
        assert!(packet.should_use_mtom(), "nothing known about the peer");

        packet.accept = Some("text/xml".into());
        assert!(!packet.check_mtom_acceptable());
        assert!(!packet.should_use_mtom());

        packet.mtom_request = Some(true);
        assert!(packet.should_use_mtom());
    }

    #[test]
    fn test_server_response_keeps_negotiation() {
        let mut request = Packet::with_message(Message::new(SoapVersion::Soap11));
        request.content_negotiation = Some(ContentNegotiation::Pessimistic);
        request.accept = Some("application/fastinfoset".into());
        request.content_type = Some("text/xml".into());
        request.set_property("tenant", "blue");
        request.set_satellite(42u32);

        let response = request.create_server_response(None);
        assert_eq!(response.content_negotiation, Some(ContentNegotiation::Pessimistic));
        assert_eq!(response.accept.as_deref(), Some("application/fastinfoset"));
        assert_eq!(response.content_type, None);
        assert_eq!(response.property("tenant"), Some("blue"));
        assert!(response.satellite::<u32>().is_none());
    }

    #[test]
    fn test_throwable_fault_created_once() {
        let mut packet = Packet::new();
        packet.set_satellite(ThrowableContainer::new(Error::Invocation("x".into())));
        assert!(packet.has_throwable());

        let container = packet.satellite_mut::<ThrowableContainer>().unwrap();
        assert!(container.take_for_fault().is_some());
        assert!(container.take_for_fault().is_none());
        assert!(container.is_fault_created());
    }
}
