// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `wsdl:portType` and its abstract operations.

use crate::error::{Error, Result};
use crate::qname::QName;

/// Input or output of an abstract operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMessage {
    /// Optional `name` attribute.
    pub name: Option<String>,
    /// Referenced `wsdl:message`.
    pub message: QName,
    /// WS-Addressing action (`wsam:Action`), if declared.
    pub action: Option<String>,
}

/// Fault of an abstract operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFault {
    /// Fault name.
    pub name: String,
    /// Referenced `wsdl:message`.
    pub message: QName,
    /// WS-Addressing action, if declared.
    pub action: Option<String>,
}

/// Abstract operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    name: String,
    /// Request message.
    pub input: Option<OperationMessage>,
    /// Response message (`None` for one-way operations).
    pub output: Option<OperationMessage>,
    /// Declared faults.
    pub faults: Vec<OperationFault>,
}

impl Operation {
    /// Create an operation without messages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: None,
            output: None,
            faults: Vec::new(),
        }
    }

    /// Operation name (local).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-way operations have an input and no output.
    pub fn is_one_way(&self) -> bool {
        self.input.is_some() && self.output.is_none()
    }

    /// Every message this operation references.
    pub(crate) fn referenced_messages(&self) -> impl Iterator<Item = &QName> {
        self.input
            .iter()
            .map(|m| &m.message)
            .chain(self.output.iter().map(|m| &m.message))
            .chain(self.faults.iter().map(|f| &f.message))
    }
}

/// Named set of operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortType {
    name: QName,
    operations: Vec<Operation>,
    frozen: bool,
}

impl PortType {
    /// Create an empty port type.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            operations: Vec::new(),
            frozen: false,
        }
    }

    /// Qualified name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Add an operation; names are unique within the port type.
    pub fn add_operation(&mut self, operation: Operation) -> Result<()> {
        if self.frozen {
            return Err(Error::ModelFrozen);
        }
        if self.operation(operation.name()).is_some() {
            return Err(Error::DuplicateDefinition {
                kind: "operation",
                name: QName::new(self.name.namespace(), operation.name()),
            });
        }
        self.operations.push(operation);
        Ok(())
    }

    /// Operation by local name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.name == name)
    }

    /// Operations in declaration order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether the port type is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }
}
