// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SOAP `mustUnderstand` enforcement.

use crate::engine::FiberContext;
use crate::error::Error;
use crate::packet::Packet;
use crate::pipe::{NextAction, Tube};
use crate::qname::QName;
use std::collections::HashSet;
use std::sync::Arc;

/// Rejects requests carrying a `mustUnderstand` header nobody processes.
///
/// The understood set is fixed at assembly: headers declared by handlers,
/// WS-Addressing headers when addressing is enabled, and WSDL header parts.
#[derive(Clone)]
pub struct MustUnderstandTube {
    understood: Arc<HashSet<QName>>,
}

impl MustUnderstandTube {
    /// Tube accepting the given headers.
    pub fn new(understood: impl IntoIterator<Item = QName>) -> Self {
        Self {
            understood: Arc::new(understood.into_iter().collect()),
        }
    }

    /// Whether `name` is understood.
    pub fn understands(&self, name: &QName) -> bool {
        self.understood.contains(name)
    }
}

impl Tube for MustUnderstandTube {
    fn name(&self) -> &str {
        "must-understand"
    }

    fn process_request(&mut self, packet: Packet, _cx: &FiberContext) -> NextAction {
        let not_understood = packet.message.as_ref().and_then(|msg| {
            msg.headers()
                .iter()
                .find(|h| h.must_understand && !self.understood.contains(&h.name))
                .map(|h| h.name.clone())
        });
        match not_understood {
            Some(name) => {
                log::debug!("[must-understand] header {} not understood", name);
                NextAction::Throw(Error::MustUnderstand(name))
            }
            None => NextAction::Invoke(packet),
        }
    }

    fn copy(&self) -> Box<dyn Tube> {
        Box::new(self.clone())
    }
}
