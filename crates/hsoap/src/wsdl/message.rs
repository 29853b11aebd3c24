// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `wsdl:message` and its parts.

use super::binding::ParameterBinding;
use crate::error::{Error, Result};
use crate::qname::QName;

/// Schema reference of a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartDescriptor {
    /// `element="..."` (document style).
    Element(QName),
    /// `type="..."` (RPC style).
    Type(QName),
}

/// One `wsdl:part`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    descriptor: Option<PartDescriptor>,
    pub(crate) binding: ParameterBinding,
    pub(crate) index: Option<usize>,
}

impl Part {
    /// Create an unbound part.
    pub fn new(name: impl Into<String>, descriptor: Option<PartDescriptor>) -> Self {
        Self {
            name: name.into(),
            descriptor,
            binding: ParameterBinding::Unbound,
            index: None,
        }
    }

    /// Part name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element or type reference.
    pub fn descriptor(&self) -> Option<&PartDescriptor> {
        self.descriptor.as_ref()
    }

    /// Binding assigned by RPC/literal finalization (`Unbound` before).
    pub fn binding(&self) -> &ParameterBinding {
        &self.binding
    }

    /// Zero-based position among the body parts of the message.
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

/// Named ordered sequence of parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    name: QName,
    parts: Vec<Part>,
}

impl Message {
    /// Create an empty message.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            parts: Vec::new(),
        }
    }

    /// Qualified message name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Append a part; part names are unique within a message.
    pub fn add_part(&mut self, part: Part) -> Result<()> {
        if self.part(part.name()).is_some() {
            return Err(Error::DuplicateDefinition {
                kind: "part",
                name: QName::new(self.name.namespace(), part.name()),
            });
        }
        self.parts.push(part);
        Ok(())
    }

    /// Part by name.
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Parts in declaration order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub(crate) fn parts_mut(&mut self) -> &mut [Part] {
        &mut self.parts
    }
}
