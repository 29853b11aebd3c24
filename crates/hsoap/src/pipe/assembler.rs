// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tubeline assembly from named tube factories.

use super::tube::Tube;
use super::tubeline::Tubeline;
use super::tubes::{AddressingTube, DumpTube, HandlerTube, MustUnderstandTube};
use crate::config::DEFAULT_TUBES;
#[cfg(feature = "config-loaders")]
use crate::config::loader::RuntimeDocument;
use crate::error::{Error, Result};
use crate::qname::QName;
use crate::server::{Binding, EndpointInfo};
use std::collections::HashMap;
use std::sync::Arc;

/// What a factory knows about the endpoint being assembled.
pub struct AssemblyContext<'a> {
    /// Endpoint identity.
    pub endpoint: &'a EndpointInfo,
    /// Protocol binding (features, handlers).
    pub binding: &'a Binding,
    /// Headers that pass the mustUnderstand check.
    pub understood_headers: &'a [QName],
}

/// Creates one tube for an endpoint; `Ok(None)` leaves the stage out.
pub trait TubeFactory: Send + Sync {
    fn create(&self, cx: &AssemblyContext<'_>) -> Result<Option<Box<dyn Tube>>>;
}

impl<F> TubeFactory for F
where
    F: Fn(&AssemblyContext<'_>) -> Result<Option<Box<dyn Tube>>> + Send + Sync,
{
    fn create(&self, cx: &AssemblyContext<'_>) -> Result<Option<Box<dyn Tube>>> {
        self(cx)
    }
}

/// Name to factory map.
#[derive(Clone, Default)]
pub struct TubeRegistry {
    factories: HashMap<String, Arc<dyn TubeFactory>>,
}

impl TubeRegistry {
    /// Registry without factories.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the standard tubes: `must-understand`, `addressing`,
    /// `handlers` and `dump`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("must-understand", |cx: &AssemblyContext<'_>| -> Result<Option<Box<dyn Tube>>> {
            Ok(Some(Box::new(MustUnderstandTube::new(
                cx.understood_headers.iter().cloned(),
            ))))
        });
        registry.register("addressing", |cx: &AssemblyContext<'_>| -> Result<Option<Box<dyn Tube>>> {
            Ok(cx
                .binding
                .features()
                .addressing
                .filter(|a| a.enabled)
                .map(|a| Box::new(AddressingTube::new(a.required)) as Box<dyn Tube>))
        });
        registry.register("handlers", |cx: &AssemblyContext<'_>| -> Result<Option<Box<dyn Tube>>> {
            let handlers = cx.binding.handlers();
            if handlers.is_empty() {
                return Ok(None);
            }
            Ok(Some(Box::new(HandlerTube::new(handlers.to_vec()))))
        });
        registry.register("dump", |cx: &AssemblyContext<'_>| -> Result<Option<Box<dyn Tube>>> {
            Ok(Some(Box::new(DumpTube::new(cx.endpoint.port_name().to_string()))))
        });
        registry
    }

    /// Register (or replace) a factory.
    pub fn register(&mut self, name: impl Into<String>, factory: impl TubeFactory + 'static) {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Factory by name.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn TubeFactory>> {
        self.factories
            .get(name)
            .ok_or_else(|| Error::UnknownTube(name.to_string()))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

/// Builds the master tubeline of an endpoint.
///
/// The named stages run in order, followed by the terminal tube.
#[derive(Clone)]
pub struct TubelineAssembler {
    registry: TubeRegistry,
    tubes: Vec<String>,
}

impl Default for TubelineAssembler {
    fn default() -> Self {
        Self::new(TubeRegistry::with_defaults())
    }
}

impl TubelineAssembler {
    /// Assembler using the default stage list.
    pub fn new(registry: TubeRegistry) -> Self {
        Self {
            registry,
            tubes: DEFAULT_TUBES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Use an explicit stage list.
    #[must_use]
    pub fn with_tubes<I, S>(mut self, tubes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tubes = tubes.into_iter().map(Into::into).collect();
        self
    }

    /// Use the stage list a runtime document maps to `port` (if any).
    #[cfg(feature = "config-loaders")]
    #[must_use]
    pub fn with_document(mut self, doc: &RuntimeDocument, port: &QName) -> Self {
        if let Some(tubes) = doc.tubeline_for(port) {
            self.tubes = tubes.to_vec();
        }
        self
    }

    /// Stage names in order.
    pub fn tube_names(&self) -> &[String] {
        &self.tubes
    }

    /// Mutable registry (to add custom factories).
    pub fn registry_mut(&mut self) -> &mut TubeRegistry {
        &mut self.registry
    }

    /// Build the tubeline; unknown names fail with [`Error::UnknownTube`].
    pub fn assemble(&self, cx: &AssemblyContext<'_>, terminal: Box<dyn Tube>) -> Result<Tubeline> {
        let mut tubes = Vec::with_capacity(self.tubes.len() + 1);
        for name in &self.tubes {
            let factory = self.registry.get(name)?;
            match factory.create(cx)? {
                Some(tube) => tubes.push(tube),
                None => log::debug!("[assembler] {} skipped for {}", name, cx.endpoint.port_name()),
            }
        }
        tubes.push(terminal);
        let line = Tubeline::new(tubes);
        log::debug!(
            "[assembler] tubeline for {}: {:?}",
            cx.endpoint.port_name(),
            line.names()
        );
        Ok(line)
    }
}
