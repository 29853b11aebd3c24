// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message logging stage.

use crate::engine::FiberContext;
use crate::error::Error;
use crate::packet::Packet;
use crate::pipe::{NextAction, Tube};

/// Logs every request, response and failure at debug level.
#[derive(Clone, Default)]
pub struct DumpTube {
    label: String,
}

impl DumpTube {
    /// Tube logging under `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    fn dump(&self, direction: &str, packet: &Packet, fiber: u64) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        match &packet.message {
            Some(msg) => log::debug!(
                "[dump] {} fiber #{} {}:\n{}",
                self.label,
                fiber,
                direction,
                msg.to_envelope_string()
            ),
            None => log::debug!("[dump] {} fiber #{} {}: <no message>", self.label, fiber, direction),
        }
    }
}

impl Tube for DumpTube {
    fn name(&self) -> &str {
        "dump"
    }

    fn process_request(&mut self, packet: Packet, cx: &FiberContext) -> NextAction {
        self.dump("request", &packet, cx.fiber_id());
        NextAction::Invoke(packet)
    }

    fn process_response(&mut self, packet: Packet, cx: &FiberContext) -> NextAction {
        self.dump("response", &packet, cx.fiber_id());
        NextAction::Return(packet)
    }

    fn process_exception(&mut self, error: Error, cx: &FiberContext) -> NextAction {
        log::debug!("[dump] {} fiber #{} exception: {}", self.label, cx.fiber_id(), error);
        NextAction::Throw(error)
    }

    fn copy(&self) -> Box<dyn Tube> {
        Box::new(self.clone())
    }
}
