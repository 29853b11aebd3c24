// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WS-Addressing server stage.

use crate::config::{WSA_ANONYMOUS, WSA_NS};
use crate::engine::FiberContext;
use crate::error::Error;
use crate::message::{Header, Message};
use crate::packet::Packet;
use crate::pipe::{NextAction, Tube};
use crate::qname::QName;

/// Action of SOAP fault replies.
pub const WSA_FAULT_ACTION: &str = "http://www.w3.org/2005/08/addressing/fault";

fn wsa(local: &str) -> QName {
    QName::new(WSA_NS, local)
}

/// WS-Addressing headers of a request, attached to the packet as a satellite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressingProperties {
    /// `wsa:MessageID`.
    pub message_id: Option<String>,
    /// `wsa:Action`.
    pub action: Option<String>,
    /// `wsa:To`.
    pub to: Option<String>,
    /// `wsa:ReplyTo/wsa:Address`.
    pub reply_to: Option<String>,
}

impl AddressingProperties {
    /// Read the addressing headers of `msg`.
    pub fn from_message(msg: &Message) -> Self {
        let text = |local: &str| msg.header(&wsa(local)).and_then(Header::text_value);
        let reply_to = msg.header(&wsa("ReplyTo")).and_then(|h| {
            let doc = roxmltree::Document::parse(&h.content).ok()?;
            let address = doc
                .descendants()
                .find(|n| n.tag_name().namespace() == Some(WSA_NS) && n.tag_name().name() == "Address")?;
            address.text().map(|t| t.trim().to_string())
        });
        Self {
            message_id: text("MessageID"),
            action: text("Action"),
            to: text("To"),
            reply_to,
        }
    }

    /// Headers processed by this stage.
    pub fn understood_headers() -> Vec<QName> {
        ["To", "From", "Action", "MessageID", "ReplyTo", "FaultTo", "RelatesTo"]
            .iter()
            .map(|l| wsa(l))
            .collect()
    }
}

/// Captures request addressing headers and stamps the reply.
///
/// Reply headers: `wsa:To` (the request's reply address, anonymous by
/// default), `wsa:Action` (`{request action}Response`, or the fault action)
/// and `wsa:RelatesTo` (the request's message id).
#[derive(Clone)]
pub struct AddressingTube {
    required: bool,
    inbound: Option<AddressingProperties>,
}

impl AddressingTube {
    /// Tube; `required` rejects requests without `wsa:Action`.
    pub fn new(required: bool) -> Self {
        Self {
            required,
            inbound: None,
        }
    }

    fn stamp(props: &AddressingProperties, msg: &mut Message) {
        for local in ["To", "Action", "RelatesTo", "MessageID"] {
            msg.remove_headers(&wsa(local));
        }
        let to = props.reply_to.as_deref().unwrap_or(WSA_ANONYMOUS);
        msg.add_header(Header::text(wsa("To"), to));
        let action = if msg.is_fault() {
            Some(WSA_FAULT_ACTION.to_string())
        } else {
            props.action.as_ref().map(|a| format!("{}Response", a))
        };
        if let Some(action) = action {
            msg.add_header(Header::text(wsa("Action"), &action));
        }
        if let Some(id) = &props.message_id {
            msg.add_header(Header::text(wsa("RelatesTo"), id));
        }
    }
}

impl Tube for AddressingTube {
    fn name(&self) -> &str {
        "addressing"
    }

    fn process_request(&mut self, mut packet: Packet, _cx: &FiberContext) -> NextAction {
        let props = packet
            .message
            .as_ref()
            .map(AddressingProperties::from_message)
            .unwrap_or_default();
        if self.required && props.action.is_none() {
            return NextAction::Throw(Error::tube(
                "addressing",
                "required header wsa:Action is missing",
            ));
        }
        if props.action.is_some() {
            log::trace!("[addressing] request action {:?}", props.action);
            self.inbound = Some(props.clone());
            packet.set_satellite(props);
        } else {
            self.inbound = None;
        }
        NextAction::Invoke(packet)
    }

    fn process_response(&mut self, mut packet: Packet, _cx: &FiberContext) -> NextAction {
        if let (Some(props), Some(msg)) = (self.inbound.take(), packet.message.as_mut()) {
            Self::stamp(&props, msg);
        }
        NextAction::Return(packet)
    }

    fn process_exception(&mut self, error: Error, _cx: &FiberContext) -> NextAction {
        self.inbound = None;
        NextAction::Throw(error)
    }

    fn copy(&self) -> Box<dyn Tube> {
        Box::new(AddressingTube::new(self.required))
    }
}
