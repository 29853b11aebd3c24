// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol binding of an endpoint: SOAP version, features, handler chain.

use crate::codec::SoapBindingCodec;
use crate::config::Features;
use crate::message::SoapVersion;
use crate::pipe::tubes::{AddressingProperties, Handler};
use crate::qname::QName;
use std::sync::Arc;

/// SOAP binding of an endpoint.
#[derive(Clone)]
pub struct Binding {
    soap_version: SoapVersion,
    features: Features,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Binding {
    /// Binding without features or handlers.
    pub fn new(soap_version: SoapVersion) -> Self {
        Self {
            soap_version,
            features: Features::default(),
            handlers: Vec::new(),
        }
    }

    /// Replace the feature list.
    #[must_use]
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Append a handler to the chain.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// SOAP version.
    pub fn soap_version(&self) -> SoapVersion {
        self.soap_version
    }

    /// Feature list.
    pub fn features(&self) -> &Features {
        &self.features
    }

    pub(crate) fn features_mut(&mut self) -> &mut Features {
        &mut self.features
    }

    /// Handlers in request order.
    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        &self.handlers
    }

    /// Headers understood by the handlers and, when enabled, WS-Addressing.
    pub fn understood_headers(&self) -> Vec<QName> {
        let mut headers: Vec<QName> = self
            .handlers
            .iter()
            .flat_map(|h| h.understood_headers())
            .collect();
        if self.features.is_addressing_enabled() {
            headers.extend(AddressingProperties::understood_headers());
        }
        headers
    }

    /// Fresh codec negotiator for this binding.
    pub fn create_codec(&self) -> SoapBindingCodec {
        SoapBindingCodec::new(self.soap_version, self.features.clone())
    }

    pub(crate) fn pre_destroy_handlers(&self) {
        for handler in &self.handlers {
            log::debug!("[binding] pre-destroy handler {}", handler.name());
            handler.pre_destroy();
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("soap_version", &self.soap_version)
            .field("features", &self.features)
            .field("handlers", &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish()
    }
}
