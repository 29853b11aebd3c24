// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `wsdl:service` and `wsdl:port`.

use crate::error::{Error, Result};
use crate::qname::QName;

/// Concrete endpoint of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    name: QName,
    binding: QName,
    address: Option<String>,
    endpoint_reference: Option<String>,
    addressing: Option<bool>,
    not_understood: Vec<QName>,
}

impl Port {
    /// Create a port referencing a binding.
    pub fn new(name: QName, binding: QName) -> Self {
        Self {
            name,
            binding,
            address: None,
            endpoint_reference: None,
            addressing: None,
            not_understood: Vec::new(),
        }
    }

    /// Qualified name (service namespace + port name).
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Referenced binding.
    pub fn binding_name(&self) -> &QName {
        &self.binding
    }

    /// `soap:address location`.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Set the endpoint address.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    /// Serialized `wsa:EndpointReference` extension, if present.
    pub fn endpoint_reference(&self) -> Option<&str> {
        self.endpoint_reference.as_deref()
    }

    /// Attach an endpoint reference extension.
    pub fn set_endpoint_reference(&mut self, epr: impl Into<String>) {
        self.endpoint_reference = Some(epr.into());
    }

    /// WS-Addressing declared on the port (`Some(required)`).
    pub fn addressing(&self) -> Option<bool> {
        self.addressing
    }

    /// Declare WS-Addressing usage.
    pub fn set_addressing(&mut self, required: bool) {
        self.addressing = Some(required);
    }

    /// Required extensions nobody understood.
    pub fn not_understood(&self) -> &[QName] {
        &self.not_understood
    }

    pub(crate) fn add_not_understood(&mut self, name: QName) {
        self.not_understood.push(name);
    }
}

/// Named ordered set of ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    name: QName,
    ports: Vec<Port>,
    frozen: bool,
}

impl Service {
    /// Create an empty service.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            ports: Vec::new(),
            frozen: false,
        }
    }

    /// Qualified name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Add a port; port names are unique within the service.
    pub fn add_port(&mut self, port: Port) -> Result<()> {
        if self.frozen {
            return Err(Error::ModelFrozen);
        }
        if self.port(port.name()).is_some() {
            return Err(Error::DuplicateDefinition {
                kind: "port",
                name: port.name,
            });
        }
        self.ports.push(port);
        Ok(())
    }

    /// Port by qualified name.
    pub fn port(&self, name: &QName) -> Option<&Port> {
        self.ports.iter().find(|p| &p.name == name)
    }

    /// Ports in declaration order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// First declared port.
    pub fn first_port(&self) -> Option<&Port> {
        self.ports.first()
    }

    /// Whether the service is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }
}
