// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WSDL parser extension points.
//!
//! Every element the core parser does not recognise inside `definitions`,
//! `message`, `portType`, `portType/operation`, `binding`,
//! `binding/operation`, `service` or `port` is offered to the registered
//! [`ParserExtension`]s in order. The first extension returning `true` wins;
//! if none does, the element is skipped. For ports, bindings and bound
//! operations a skipped element carrying `wsdl:required="true"` is recorded
//! as not understood, which later makes endpoint construction fail.

use super::binding::{BoundOperation, BoundPortType};
use super::message::Message;
use super::model::WsdlModel;
use super::port_type::{Operation, OperationMessage, PortType};
use super::service::{Port, Service};
use crate::config::{WSAM_NS, WSAW_NS, WSA_NS, WSDL_NS};
use crate::error::Result;
use crate::message::xml::serialize_element;
use crate::qname::QName;
use roxmltree::Node;

/// Strategy invoked for extensibility elements.
///
/// All element hooks default to "not handled".
pub trait ParserExtension: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn definitions_element(&self, _model: &mut WsdlModel, _el: Node<'_, '_>) -> bool {
        false
    }

    fn message_element(&self, _message: &mut Message, _el: Node<'_, '_>) -> bool {
        false
    }

    fn port_type_element(&self, _port_type: &mut PortType, _el: Node<'_, '_>) -> bool {
        false
    }

    fn port_type_operation_element(&self, _op: &mut Operation, _el: Node<'_, '_>) -> bool {
        false
    }

    fn binding_element(&self, _binding: &mut BoundPortType, _el: Node<'_, '_>) -> bool {
        false
    }

    fn binding_operation_element(&self, _op: &mut BoundOperation, _el: Node<'_, '_>) -> bool {
        false
    }

    fn service_element(&self, _service: &mut Service, _el: Node<'_, '_>) -> bool {
        false
    }

    fn port_element(&self, _port: &mut Port, _el: Node<'_, '_>) -> bool {
        false
    }

    /// Attributes of a `portType/operation/input|output` element.
    ///
    /// Broadcast to every extension.
    fn operation_message_attributes(&self, _msg: &mut OperationMessage, _el: Node<'_, '_>) {}

    /// Called once the whole document (and its imports) has been read, before freeze.
    fn finished(&self, _model: &mut WsdlModel) -> Result<()> {
        Ok(())
    }
}

/// Whether an element carries `wsdl:required="true"`.
fn is_required(el: Node<'_, '_>) -> bool {
    el.attribute((WSDL_NS, "required"))
        .map(|v| v.trim() == "true" || v.trim() == "1")
        .unwrap_or(false)
}

/// Ordered list of extensions; first handled wins.
#[derive(Default)]
pub struct ExtensionFacade {
    extensions: Vec<Box<dyn ParserExtension>>,
}

impl ExtensionFacade {
    /// Facade with the built-in extensions (addressing, endpoint references).
    pub fn with_builtins() -> Self {
        let mut facade = Self::default();
        facade.push(Box::new(AddressingExtension));
        facade.push(Box::new(EndpointReferenceExtension));
        facade
    }

    /// Append an extension (consulted after the existing ones).
    pub fn push(&mut self, extension: Box<dyn ParserExtension>) {
        self.extensions.push(extension);
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether no extension is registered.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    fn dispatch(&self, el: Node<'_, '_>, mut hook: impl FnMut(&dyn ParserExtension) -> bool) -> bool {
        for ext in &self.extensions {
            if hook(ext.as_ref()) {
                log::trace!("[wsdl] {} handled by {}", QName::of(el), ext.name());
                return true;
            }
        }
        log::debug!("[wsdl] skipping extension element {}", QName::of(el));
        false
    }

    pub fn definitions_element(&self, model: &mut WsdlModel, el: Node<'_, '_>) {
        self.dispatch(el, |ext| ext.definitions_element(model, el));
    }

    pub fn message_element(&self, message: &mut Message, el: Node<'_, '_>) {
        self.dispatch(el, |ext| ext.message_element(message, el));
    }

    pub fn port_type_element(&self, port_type: &mut PortType, el: Node<'_, '_>) {
        self.dispatch(el, |ext| ext.port_type_element(port_type, el));
    }

    pub fn port_type_operation_element(&self, op: &mut Operation, el: Node<'_, '_>) {
        self.dispatch(el, |ext| ext.port_type_operation_element(op, el));
    }

    pub fn service_element(&self, service: &mut Service, el: Node<'_, '_>) {
        self.dispatch(el, |ext| ext.service_element(service, el));
    }

    pub fn binding_element(&self, binding: &mut BoundPortType, el: Node<'_, '_>) {
        if !self.dispatch(el, |ext| ext.binding_element(binding, el)) && is_required(el) {
            binding.add_not_understood(QName::of(el));
        }
    }

    pub fn binding_operation_element(&self, op: &mut BoundOperation, el: Node<'_, '_>) {
        if !self.dispatch(el, |ext| ext.binding_operation_element(op, el)) && is_required(el) {
            op.add_not_understood(QName::of(el));
        }
    }

    pub fn port_element(&self, port: &mut Port, el: Node<'_, '_>) {
        if !self.dispatch(el, |ext| ext.port_element(port, el)) && is_required(el) {
            port.add_not_understood(QName::of(el));
        }
    }

    pub fn operation_message_attributes(&self, msg: &mut OperationMessage, el: Node<'_, '_>) {
        for ext in &self.extensions {
            ext.operation_message_attributes(msg, el);
        }
    }

    pub fn finished(&self, model: &mut WsdlModel) -> Result<()> {
        for ext in &self.extensions {
            ext.finished(model)?;
        }
        Ok(())
    }
}

// ============================================================================
// Built-in extensions
// ============================================================================

/// WS-Addressing metadata: `wsaw:UsingAddressing`, `wsam:Addressing` and
/// `wsam:Action` / `wsaw:Action` on operation messages.
pub struct AddressingExtension;

impl AddressingExtension {
    fn addressing_required(el: Node<'_, '_>) -> Option<bool> {
        let name = el.tag_name();
        let ns = name.namespace()?;
        let known = (ns == WSAW_NS && name.name() == "UsingAddressing")
            || (ns == WSAM_NS && name.name() == "Addressing");
        if !known {
            return None;
        }
        // wsaw:UsingAddressing uses wsdl:required, wsam:Addressing uses wsp:Optional.
        let optional = el
            .attributes()
            .any(|a| a.name() == "Optional" && a.value().trim() == "true");
        Some(is_required(el) || (ns == WSAM_NS && !optional))
    }
}

impl ParserExtension for AddressingExtension {
    fn name(&self) -> &str {
        "addressing"
    }

    fn binding_element(&self, binding: &mut BoundPortType, el: Node<'_, '_>) -> bool {
        match Self::addressing_required(el) {
            Some(required) => {
                binding.set_addressing(required);
                true
            }
            None => false,
        }
    }

    fn port_element(&self, port: &mut Port, el: Node<'_, '_>) -> bool {
        match Self::addressing_required(el) {
            Some(required) => {
                port.set_addressing(required);
                true
            }
            None => false,
        }
    }

    fn operation_message_attributes(&self, msg: &mut OperationMessage, el: Node<'_, '_>) {
        let action = el
            .attribute((WSAM_NS, "Action"))
            .or_else(|| el.attribute((WSAW_NS, "Action")));
        if let Some(action) = action {
            msg.action = Some(action.trim().to_string());
        }
    }
}

/// Captures `wsa:EndpointReference` under a port.
pub struct EndpointReferenceExtension;

impl ParserExtension for EndpointReferenceExtension {
    fn name(&self) -> &str {
        "endpoint-reference"
    }

    fn port_element(&self, port: &mut Port, el: Node<'_, '_>) -> bool {
        let name = el.tag_name();
        if name.namespace() == Some(WSA_NS) && name.name() == "EndpointReference" {
            port.set_endpoint_reference(serialize_element(el));
            return true;
        }
        false
    }
}
