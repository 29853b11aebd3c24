// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binding handler chain.

use crate::engine::FiberContext;
use crate::error::Result;
use crate::packet::Packet;
use crate::pipe::{NextAction, Tube};
use crate::qname::QName;
use std::sync::Arc;

/// Message seen by a handler.
pub struct MessageContext<'a> {
    /// Packet in flight (request inbound, response outbound).
    pub packet: &'a mut Packet,
    /// `true` on the response path.
    pub outbound: bool,
}

/// Application handler registered on a binding.
///
/// Handlers run in registration order on requests and in reverse order on
/// responses.
pub trait Handler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Headers this handler processes; they pass the mustUnderstand check.
    fn understood_headers(&self) -> Vec<QName> {
        Vec::new()
    }

    /// Process a message. `Ok(false)` stops the chain: on a request the
    /// packet is turned around and sent back as the response.
    fn handle_message(&self, cx: &mut MessageContext<'_>) -> Result<bool>;

    /// Endpoint disposal hook.
    fn pre_destroy(&self) {}
}

/// Runs the binding's handlers around the rest of the tubeline.
#[derive(Clone)]
pub struct HandlerTube {
    handlers: Arc<[Arc<dyn Handler>]>,
}

impl HandlerTube {
    /// Tube over `handlers` (shared by every clone).
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self {
            handlers: handlers.into(),
        }
    }

    fn run<'h>(
        handlers: impl Iterator<Item = &'h Arc<dyn Handler>>,
        packet: &mut Packet,
        outbound: bool,
    ) -> Result<bool> {
        for handler in handlers {
            let mut cx = MessageContext {
                packet: &mut *packet,
                outbound,
            };
            let proceed = handler.handle_message(&mut cx).map_err(|e| {
                log::debug!("[handlers] {} failed: {}", handler.name(), e);
                e
            })?;
            if !proceed {
                log::debug!("[handlers] {} stopped the chain", handler.name());
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Tube for HandlerTube {
    fn name(&self) -> &str {
        "handlers"
    }

    fn process_request(&mut self, mut packet: Packet, _cx: &FiberContext) -> NextAction {
        match Self::run(self.handlers.iter(), &mut packet, false) {
            Ok(true) => NextAction::Invoke(packet),
            Ok(false) => NextAction::Return(packet),
            Err(e) => NextAction::Throw(e),
        }
    }

    fn process_response(&mut self, mut packet: Packet, _cx: &FiberContext) -> NextAction {
        match Self::run(self.handlers.iter().rev(), &mut packet, true) {
            Ok(_) => NextAction::Return(packet),
            Err(e) => NextAction::Throw(e),
        }
    }

    fn copy(&self) -> Box<dyn Tube> {
        Box::new(self.clone())
    }
}
