// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `wsdl:binding`: a port type bound to the SOAP wire format.

use crate::error::{Error, Result};
use crate::message::SoapVersion;
use crate::qname::QName;
use std::collections::HashMap;

/// SOAP binding style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// Document style (default).
    #[default]
    Document,
    /// RPC style: the body carries an operation wrapper element.
    Rpc,
}

impl Style {
    /// Parse a `style` attribute (unknown values mean document).
    pub fn parse(value: &str) -> Self {
        if value.trim() == "rpc" {
            Style::Rpc
        } else {
            Style::Document
        }
    }
}

/// Direction of a message within an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Request.
    In,
    /// Response.
    Out,
}

/// Where a part travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParameterBinding {
    /// Inside the SOAP body.
    Body,
    /// As a SOAP header block.
    Header,
    /// Not bound (absent from the wire).
    #[default]
    Unbound,
    /// As a MIME attachment with the listed content types.
    Attachment(Vec<String>),
}

impl ParameterBinding {
    /// Whether the part is in the body.
    pub fn is_body(&self) -> bool {
        matches!(self, ParameterBinding::Body)
    }

    /// Whether the part is a header.
    pub fn is_header(&self) -> bool {
        matches!(self, ParameterBinding::Header)
    }

    /// Whether the part is unbound.
    pub fn is_unbound(&self) -> bool {
        matches!(self, ParameterBinding::Unbound)
    }

    /// Whether the part is a MIME attachment.
    pub fn is_attachment(&self) -> bool {
        matches!(self, ParameterBinding::Attachment(_))
    }
}

/// Per-direction binding data of a bound operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MessageBinding {
    parts: HashMap<String, ParameterBinding>,
    explicit_body_parts: bool,
    empty_body: bool,
    body_namespace: Option<String>,
    /// Body parts registered by RPC/literal finalization, in index order.
    body_parts: Vec<String>,
}

impl MessageBinding {
    fn binding(&self, part: &str) -> ParameterBinding {
        match self.parts.get(part) {
            Some(pb) => pb.clone(),
            None if self.explicit_body_parts || self.empty_body => ParameterBinding::Unbound,
            None => ParameterBinding::Body,
        }
    }
}

/// Operation of a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundOperation {
    name: QName,
    soap_action: String,
    style: Option<Style>,
    input: MessageBinding,
    output: MessageBinding,
    not_understood: Vec<QName>,
    // Resolved from the port type at freeze.
    input_message: Option<QName>,
    output_message: Option<QName>,
    one_way: bool,
}

impl BoundOperation {
    /// Create a bound operation.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            soap_action: String::new(),
            style: None,
            input: MessageBinding::default(),
            output: MessageBinding::default(),
            not_understood: Vec::new(),
            input_message: None,
            output_message: None,
            one_way: false,
        }
    }

    /// Qualified name (binding namespace + operation name).
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// `soap:operation soapAction` ("" when absent).
    pub fn soap_action(&self) -> &str {
        &self.soap_action
    }

    /// Set the SOAPAction.
    pub fn set_soap_action(&mut self, action: impl Into<String>) {
        self.soap_action = action.into();
    }

    /// Per-operation style override.
    pub fn style(&self) -> Option<Style> {
        self.style
    }

    /// Set the per-operation style.
    pub fn set_style(&mut self, style: Style) {
        self.style = Some(style);
    }

    fn direction(&self, mode: Mode) -> &MessageBinding {
        match mode {
            Mode::In => &self.input,
            Mode::Out => &self.output,
        }
    }

    fn direction_mut(&mut self, mode: Mode) -> &mut MessageBinding {
        match mode {
            Mode::In => &mut self.input,
            Mode::Out => &mut self.output,
        }
    }

    /// Binding of an input part.
    ///
    /// Unlisted parts are in the body unless `soap:body parts` was given
    /// explicitly or the body was declared empty.
    pub fn input_binding(&self, part: &str) -> ParameterBinding {
        self.input.binding(part)
    }

    /// Binding of an output part (same rules as [`input_binding`](Self::input_binding)).
    pub fn output_binding(&self, part: &str) -> ParameterBinding {
        self.output.binding(part)
    }

    /// Bind one part explicitly.
    ///
    /// Attachment content types accumulate when a part is bound to several
    /// `mime:content` alternatives.
    pub fn set_part_binding(&mut self, mode: Mode, part: impl Into<String>, binding: ParameterBinding) {
        let part = part.into();
        let parts = &mut self.direction_mut(mode).parts;
        if let (Some(ParameterBinding::Attachment(existing)), ParameterBinding::Attachment(more)) =
            (parts.get_mut(&part), &binding)
        {
            existing.extend(more.iter().cloned());
            return;
        }
        parts.insert(part, binding);
    }

    /// Record `soap:body parts="..."`; an empty list declares an empty body.
    pub fn set_body_parts(&mut self, mode: Mode, parts: &[String]) {
        let direction = self.direction_mut(mode);
        if parts.is_empty() {
            direction.empty_body = true;
            return;
        }
        direction.explicit_body_parts = true;
        for p in parts {
            direction.parts.insert(p.clone(), ParameterBinding::Body);
        }
    }

    /// RPC wrapper namespace (`soap:body namespace`).
    pub fn body_namespace(&self, mode: Mode) -> Option<&str> {
        self.direction(mode).body_namespace.as_deref()
    }

    /// Set the RPC wrapper namespace.
    pub fn set_body_namespace(&mut self, mode: Mode, namespace: impl Into<String>) {
        self.direction_mut(mode).body_namespace = Some(namespace.into());
    }

    /// Register a body part (idempotent).
    pub fn add_part(&mut self, part: &str, mode: Mode) {
        let body_parts = &mut self.direction_mut(mode).body_parts;
        if !body_parts.iter().any(|p| p == part) {
            body_parts.push(part.to_string());
        }
    }

    /// Body parts registered by RPC/literal finalization, in index order.
    pub fn body_parts(&self, mode: Mode) -> &[String] {
        &self.direction(mode).body_parts
    }

    /// Required extensions nobody understood.
    pub fn not_understood(&self) -> &[QName] {
        &self.not_understood
    }

    pub(crate) fn add_not_understood(&mut self, name: QName) {
        self.not_understood.push(name);
    }

    /// Input message (resolved at freeze).
    pub fn input_message(&self) -> Option<&QName> {
        self.input_message.as_ref()
    }

    /// Output message (resolved at freeze).
    pub fn output_message(&self) -> Option<&QName> {
        self.output_message.as_ref()
    }

    /// Whether the abstract operation is one-way (resolved at freeze).
    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    pub(crate) fn resolve(&mut self, input: Option<QName>, output: Option<QName>, one_way: bool) {
        self.input_message = input;
        self.output_message = output;
        self.one_way = one_way;
    }
}

/// `wsdl:binding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPortType {
    name: QName,
    port_type: QName,
    soap_version: Option<SoapVersion>,
    style: Style,
    transport: Option<String>,
    operations: Vec<BoundOperation>,
    not_understood: Vec<QName>,
    addressing: Option<bool>,
    frozen: bool,
}

impl BoundPortType {
    /// Create a binding of `port_type`.
    pub fn new(name: QName, port_type: QName) -> Self {
        Self {
            name,
            port_type,
            soap_version: None,
            style: Style::Document,
            transport: None,
            operations: Vec::new(),
            not_understood: Vec::new(),
            addressing: None,
            frozen: false,
        }
    }

    /// Qualified name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Bound port type name.
    pub fn port_type_name(&self) -> &QName {
        &self.port_type
    }

    /// SOAP version (`None` for non-SOAP bindings).
    pub fn soap_version(&self) -> Option<SoapVersion> {
        self.soap_version
    }

    /// Set the SOAP version.
    pub fn set_soap_version(&mut self, version: SoapVersion) {
        self.soap_version = Some(version);
    }

    /// Default style of the binding.
    pub fn style(&self) -> Style {
        self.style
    }

    /// Set the default style.
    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    /// Transport URI.
    pub fn transport(&self) -> Option<&str> {
        self.transport.as_deref()
    }

    /// Set the transport URI.
    pub fn set_transport(&mut self, transport: impl Into<String>) {
        self.transport = Some(transport.into());
    }

    /// Whether every operation uses RPC style.
    pub fn is_rpc_lit(&self) -> bool {
        !self.operations.is_empty()
            && self
                .operations
                .iter()
                .all(|op| op.style.unwrap_or(self.style) == Style::Rpc)
    }

    /// Add a bound operation; names are unique within the binding.
    pub fn add_operation(&mut self, operation: BoundOperation) -> Result<()> {
        if self.frozen {
            return Err(Error::ModelFrozen);
        }
        if self.operation(operation.name.local_part()).is_some() {
            return Err(Error::DuplicateDefinition {
                kind: "binding operation",
                name: operation.name,
            });
        }
        self.operations.push(operation);
        Ok(())
    }

    /// Bound operation by local name.
    pub fn operation(&self, local: &str) -> Option<&BoundOperation> {
        self.operations.iter().find(|o| o.name.local_part() == local)
    }

    /// Bound operation whose SOAPAction matches.
    pub fn operation_by_action(&self, action: &str) -> Option<&BoundOperation> {
        let action = action.trim_matches('"');
        if action.is_empty() {
            return None;
        }
        self.operations.iter().find(|o| o.soap_action == action)
    }

    /// Bound operations in declaration order.
    pub fn operations(&self) -> &[BoundOperation] {
        &self.operations
    }

    pub(crate) fn operations_mut(&mut self) -> &mut [BoundOperation] {
        &mut self.operations
    }

    /// Required extensions nobody understood.
    pub fn not_understood(&self) -> &[QName] {
        &self.not_understood
    }

    pub(crate) fn add_not_understood(&mut self, name: QName) {
        self.not_understood.push(name);
    }

    /// WS-Addressing declared on the binding (`Some(required)`).
    pub fn addressing(&self) -> Option<bool> {
        self.addressing
    }

    /// Declare WS-Addressing usage.
    pub fn set_addressing(&mut self, required: bool) {
        self.addressing = Some(required);
    }

    /// Whether the binding is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binding_is_body() {
        let op = BoundOperation::new(QName::new("urn:b", "Add"));
        assert_eq!(op.input_binding("a"), ParameterBinding::Body);
        assert_eq!(op.output_binding("r"), ParameterBinding::Body);
    }

    #[test]
    fn test_explicit_parts_unbind_the_rest() {
        let mut op = BoundOperation::new(QName::new("urn:b", "Add"));
        op.set_body_parts(Mode::In, &["a".to_string()]);
        op.set_part_binding(Mode::In, "h", ParameterBinding::Header);

        assert!(op.input_binding("a").is_body());
        assert!(op.input_binding("h").is_header());
        assert!(op.input_binding("other").is_unbound());
        assert!(op.output_binding("other").is_body());
    }

    #[test]
    fn test_empty_body_and_attachment_alternatives() {
        let mut op = BoundOperation::new(QName::new("urn:b", "Upload"));
        op.set_body_parts(Mode::In, &[]);
        op.set_part_binding(Mode::In, "img", ParameterBinding::Attachment(vec!["image/png".into()]));
        op.set_part_binding(Mode::In, "img", ParameterBinding::Attachment(vec!["image/jpeg".into()]));

        assert!(op.input_binding("x").is_unbound());
        assert_eq!(
            op.input_binding("img"),
            ParameterBinding::Attachment(vec!["image/png".into(), "image/jpeg".into()])
        );
    }
}
