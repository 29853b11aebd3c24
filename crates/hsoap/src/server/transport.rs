// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hooks a transport hands to the pipe head with each request.

use std::sync::Arc;

/// Security and addressing facts only the transport knows.
pub trait WebServiceContextDelegate: Send + Sync {
    /// Authenticated caller, if any.
    fn user_principal(&self) -> Option<String> {
        None
    }

    /// Whether the caller has `role`.
    fn is_user_in_role(&self, _role: &str) -> bool {
        false
    }

    /// Address the request was received on.
    fn endpoint_address(&self) -> Option<String> {
        None
    }
}

/// Lets the endpoint end the transport exchange before the implementation
/// runs (one-way requests).
pub trait TransportBackChannel: Send {
    fn close(&mut self);
}

/// Packet satellite carrying the context delegate of a request.
#[derive(Clone)]
pub struct ContextDelegate(pub Arc<dyn WebServiceContextDelegate>);

/// Packet satellite carrying the back channel of a request.
pub struct BackChannel(pub Box<dyn TransportBackChannel>);

impl BackChannel {
    pub fn close(mut self) {
        log::trace!("[transport] closing back channel");
        self.0.close();
    }
}
