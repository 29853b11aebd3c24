// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WSDL document model: the aggregate root of messages, port types,
//! bindings and services.
//!
//! # Lifecycle
//!
//! ```text
//! add_*()  ->  finalize_rpc_lit_binding()  ->  freeze()  ->  Arc<WsdlModel> (read-only)
//! ```
//!
//! `freeze()` validates every cross reference (port -> binding -> port type
//! -> message) and fails with [`Error::UnresolvedReference`] on the first
//! dangling one. After a successful freeze every mutator fails with
//! [`Error::ModelFrozen`].

use super::binding::{BoundPortType, Mode};
use super::message::Message;
use super::port_type::PortType;
use super::service::{Port, Service};
use crate::error::{Error, Result};
use crate::qname::QName;
use std::collections::BTreeMap;

/// In-memory WSDL model.
#[derive(Debug, Clone, Default)]
pub struct WsdlModel {
    messages: BTreeMap<QName, Message>,
    port_types: BTreeMap<QName, PortType>,
    bindings: BTreeMap<QName, BoundPortType>,
    // Declaration order matters for first_service_name().
    services: Vec<Service>,
    frozen: bool,
}

impl WsdlModel {
    /// Empty, unfrozen model.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_mutable(&self) -> Result<()> {
        if self.frozen {
            Err(Error::ModelFrozen)
        } else {
            Ok(())
        }
    }

    // =======================================================================
    // Construction
    // =======================================================================

    /// Add a message.
    pub fn add_message(&mut self, message: Message) -> Result<()> {
        self.check_mutable()?;
        if self.messages.contains_key(message.name()) {
            return Err(Error::DuplicateDefinition {
                kind: "message",
                name: message.name().clone(),
            });
        }
        self.messages.insert(message.name().clone(), message);
        Ok(())
    }

    /// Add a port type.
    pub fn add_port_type(&mut self, port_type: PortType) -> Result<()> {
        self.check_mutable()?;
        if self.port_types.contains_key(port_type.name()) {
            return Err(Error::DuplicateDefinition {
                kind: "portType",
                name: port_type.name().clone(),
            });
        }
        self.port_types.insert(port_type.name().clone(), port_type);
        Ok(())
    }

    /// Add a binding.
    pub fn add_binding(&mut self, binding: BoundPortType) -> Result<()> {
        self.check_mutable()?;
        if self.bindings.contains_key(binding.name()) {
            return Err(Error::DuplicateDefinition {
                kind: "binding",
                name: binding.name().clone(),
            });
        }
        self.bindings.insert(binding.name().clone(), binding);
        Ok(())
    }

    /// Add a service.
    pub fn add_service(&mut self, service: Service) -> Result<()> {
        self.check_mutable()?;
        if self.service(service.name()).is_some() {
            return Err(Error::DuplicateDefinition {
                kind: "service",
                name: service.name().clone(),
            });
        }
        self.services.push(service);
        Ok(())
    }

    pub(crate) fn binding_mut(&mut self, name: &QName) -> Result<&mut BoundPortType> {
        self.check_mutable()?;
        self.bindings.get_mut(name).ok_or_else(|| Error::UnresolvedReference {
            kind: "binding",
            name: name.clone(),
        })
    }

    // =======================================================================
    // Lookups (None is the not-found signal)
    // =======================================================================

    /// Message by name.
    pub fn message(&self, name: &QName) -> Option<&Message> {
        self.messages.get(name)
    }

    /// Port type by name.
    pub fn port_type(&self, name: &QName) -> Option<&PortType> {
        self.port_types.get(name)
    }

    /// Binding by name.
    pub fn binding(&self, name: &QName) -> Option<&BoundPortType> {
        self.bindings.get(name)
    }

    /// Binding of a service port; `None` if either name does not resolve.
    pub fn binding_for(&self, service: &QName, port: &QName) -> Option<&BoundPortType> {
        let port = self.port(service, port)?;
        self.bindings.get(port.binding_name())
    }

    /// Service by name.
    pub fn service(&self, name: &QName) -> Option<&Service> {
        self.services.iter().find(|s| s.name() == name)
    }

    /// Port of a service.
    pub fn port(&self, service: &QName, port: &QName) -> Option<&Port> {
        self.service(service)?.port(port)
    }

    /// Name of the first declared service.
    pub fn first_service_name(&self) -> Option<&QName> {
        self.services.first().map(Service::name)
    }

    /// All messages, ordered by name.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// All port types, ordered by name.
    pub fn port_types(&self) -> impl Iterator<Item = &PortType> {
        self.port_types.values()
    }

    /// All bindings, ordered by name.
    pub fn bindings(&self) -> impl Iterator<Item = &BoundPortType> {
        self.bindings.values()
    }

    /// All services in declaration order.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Whether `freeze()` succeeded.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Fail if the port or its binding carries a required extension nobody understood.
    pub fn validate_extensions(&self, service: &QName, port: &QName) -> Result<()> {
        let p = self.port(service, port).ok_or_else(|| Error::UnresolvedReference {
            kind: "port",
            name: port.clone(),
        })?;
        if let Some(name) = p.not_understood().first() {
            return Err(Error::NotUnderstoodExtension(name.clone()));
        }
        if let Some(binding) = self.bindings.get(p.binding_name()) {
            let op_level = binding
                .operations()
                .iter()
                .flat_map(|op| op.not_understood().iter());
            if let Some(name) = binding.not_understood().iter().chain(op_level).next() {
                return Err(Error::NotUnderstoodExtension(name.clone()));
            }
        }
        Ok(())
    }

    // =======================================================================
    // Fix-ups and freeze
    // =======================================================================

    /// Assign RPC/literal body part order for every operation of a binding.
    ///
    /// For the input message (and the output, unless one-way) each part whose
    /// binding is body gets the next zero-based index in declaration order,
    /// the body binding, and is registered on the bound operation. A binding
    /// whose port type is unknown is left untouched.
    pub fn finalize_rpc_lit_binding(&mut self, binding: &QName) -> Result<()> {
        self.check_mutable()?;
        let bound = self
            .bindings
            .get_mut(binding)
            .ok_or_else(|| Error::UnresolvedReference {
                kind: "binding",
                name: binding.clone(),
            })?;
        let Some(port_type) = self.port_types.get(bound.port_type_name()) else {
            return Ok(());
        };

        for bop in bound.operations_mut() {
            let local = bop.name().local_part().to_string();
            let op = port_type
                .operation(&local)
                .ok_or_else(|| Error::UnresolvedReference {
                    kind: "operation",
                    name: QName::new(port_type.name().namespace(), local.as_str()),
                })?;

            let Some(input) = op.input.as_ref() else {
                continue;
            };
            if let Some(msg) = self.messages.get_mut(&input.message) {
                let mut index = 0;
                for part in msg.parts_mut() {
                    let pb = bop.input_binding(part.name());
                    if pb.is_body() {
                        part.index = Some(index);
                        index += 1;
                        part.binding = pb;
                        bop.add_part(part.name(), Mode::In);
                    }
                }
            }

            if op.is_one_way() {
                continue;
            }
            let Some(output) = op.output.as_ref() else {
                continue;
            };
            if let Some(msg) = self.messages.get_mut(&output.message) {
                let mut index = 0;
                for part in msg.parts_mut() {
                    let pb = bop.output_binding(part.name());
                    if pb.is_body() {
                        part.index = Some(index);
                        index += 1;
                        part.binding = pb;
                        bop.add_part(part.name(), Mode::Out);
                    }
                }
            }
        }
        log::debug!("[wsdl] finalized rpc/literal binding {}", binding);
        Ok(())
    }

    /// Validate all references and make the model read-only.
    ///
    /// Order: services, then bindings, then every port type (including port
    /// types no port refers to). Calling it again is a no-op.
    pub fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }

        // Validate first so a failed freeze leaves the model untouched.
        for service in &self.services {
            for port in service.ports() {
                if !self.bindings.contains_key(port.binding_name()) {
                    return Err(Error::UnresolvedReference {
                        kind: "binding",
                        name: port.binding_name().clone(),
                    });
                }
            }
        }
        let mut resolved = Vec::new();
        for binding in self.bindings.values() {
            let port_type = self.port_types.get(binding.port_type_name()).ok_or_else(|| {
                Error::UnresolvedReference {
                    kind: "portType",
                    name: binding.port_type_name().clone(),
                }
            })?;
            for bop in binding.operations() {
                let op = port_type
                    .operation(bop.name().local_part())
                    .ok_or_else(|| Error::UnresolvedReference {
                        kind: "operation",
                        name: QName::new(port_type.name().namespace(), bop.name().local_part()),
                    })?;
                resolved.push((
                    binding.name().clone(),
                    bop.name().local_part().to_string(),
                    op.input.as_ref().map(|m| m.message.clone()),
                    op.output.as_ref().map(|m| m.message.clone()),
                    op.is_one_way(),
                ));
            }
        }
        for port_type in self.port_types.values() {
            for op in port_type.operations() {
                if let Some(missing) = op
                    .referenced_messages()
                    .find(|m| !self.messages.contains_key(*m))
                {
                    return Err(Error::UnresolvedReference {
                        kind: "message",
                        name: missing.clone(),
                    });
                }
            }
        }

        for service in &mut self.services {
            service.freeze();
        }
        for (binding, op, input, output, one_way) in resolved {
            if let Some(bop) = self
                .bindings
                .get_mut(&binding)
                .and_then(|b| b.operations_mut().iter_mut().find(|o| o.name().local_part() == op))
            {
                bop.resolve(input, output, one_way);
            }
        }
        for binding in self.bindings.values_mut() {
            binding.freeze();
        }
        for port_type in self.port_types.values_mut() {
            port_type.freeze();
        }
        self.frozen = true;

        log::debug!(
            "[wsdl] model frozen: {} services, {} bindings, {} port types, {} messages",
            self.services.len(),
            self.bindings.len(),
            self.port_types.len(),
            self.messages.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wsdl::{BoundOperation, Operation, OperationMessage, Part, PartDescriptor};

    const NS: &str = "urn:calc";

    fn q(local: &str) -> QName {
        QName::new(NS, local)
    }

    fn sample() -> WsdlModel {
        let mut model = WsdlModel::new();

        let mut req = Message::new(q("AddRequest"));
        for name in ["partA", "header", "partB"] {
            req.add_part(Part::new(name, Some(PartDescriptor::Type(QName::new("xsd", "int")))))
                .unwrap();
        }
        model.add_message(req).unwrap();
        let mut resp = Message::new(q("AddResponse"));
        resp.add_part(Part::new("result", None)).unwrap();
        model.add_message(resp).unwrap();

        let mut pt = PortType::new(q("Calc"));
        let mut op = Operation::new("Add");
        op.input = Some(OperationMessage {
            name: None,
            message: q("AddRequest"),
            action: None,
        });
        op.output = Some(OperationMessage {
            name: None,
            message: q("AddResponse"),
            action: None,
        });
        pt.add_operation(op).unwrap();
        model.add_port_type(pt).unwrap();

        let mut binding = BoundPortType::new(q("CalcBinding"), q("Calc"));
        let mut bop = BoundOperation::new(q("Add"));
        bop.set_part_binding(Mode::In, "header", crate::wsdl::ParameterBinding::Header);
        binding.add_operation(bop).unwrap();
        model.add_binding(binding).unwrap();

        let mut service = Service::new(q("CalcService"));
        service.add_port(Port::new(q("CalcPort"), q("CalcBinding"))).unwrap();
        model.add_service(service).unwrap();
        model
    }

    #[test]
    fn test_rpc_lit_indices_skip_header_parts() {
        let mut model = sample();
        model.finalize_rpc_lit_binding(&q("CalcBinding")).unwrap();

        let req = model.message(&q("AddRequest")).unwrap();
        assert_eq!(req.part("partA").unwrap().index(), Some(0));
        assert_eq!(req.part("header").unwrap().index(), None);
        assert_eq!(req.part("partB").unwrap().index(), Some(1));

        let bop = model.binding(&q("CalcBinding")).unwrap().operation("Add").unwrap();
        assert_eq!(bop.body_parts(Mode::In), &["partA", "partB"]);
        assert_eq!(bop.body_parts(Mode::Out), &["result"]);
    }

    #[test]
    fn test_lookups_return_none() {
        let model = sample();
        assert!(model.binding_for(&q("CalcService"), &q("CalcPort")).is_some());
        assert!(model.binding_for(&q("CalcService"), &q("Nope")).is_none());
        assert!(model.binding_for(&q("Nope"), &q("CalcPort")).is_none());
        assert!(model.message(&q("Nope")).is_none());
        assert_eq!(model.first_service_name(), Some(&q("CalcService")));
    }

    #[test]
    fn test_duplicate_and_frozen_mutation() {
        let mut model = sample();
        assert!(matches!(
            model.add_message(Message::new(q("AddRequest"))),
            Err(Error::DuplicateDefinition { kind: "message", .. })
        ));

        model.freeze().unwrap();
        assert!(matches!(
            model.add_message(Message::new(q("Other"))),
            Err(Error::ModelFrozen)
        ));
        assert!(matches!(
            model.finalize_rpc_lit_binding(&q("CalcBinding")),
            Err(Error::ModelFrozen)
        ));
    }

    #[test]
    fn test_freeze_resolves_operations() {
        let mut model = sample();
        model.freeze().unwrap();
        let bop = model.binding(&q("CalcBinding")).unwrap().operation("Add").unwrap();
        assert_eq!(bop.input_message(), Some(&q("AddRequest")));
        assert!(!bop.is_one_way());
        assert!(model.port_type(&q("Calc")).unwrap().is_frozen());
    }

    #[test]
    fn test_freeze_rejects_dangling_binding() {
        let mut model = sample();
        let mut service = Service::new(q("Broken"));
        service.add_port(Port::new(q("P"), q("MissingBinding"))).unwrap();
        model.add_service(service).unwrap();

        let err = model.freeze().unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { kind: "binding", .. }));
        assert!(!model.is_frozen());
    }
}
