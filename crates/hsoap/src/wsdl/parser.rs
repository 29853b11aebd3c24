// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WSDL 1.1 reader.
//!
//! Builds a [`WsdlModel`] from a document (and, through an
//! [`EntityResolver`], its imports), runs the RPC/literal fix-ups, gives the
//! parser extensions a last look, and freezes the result.

use super::binding::{BoundOperation, BoundPortType, Mode, ParameterBinding, Style};
use super::extension::{ExtensionFacade, ParserExtension};
use super::message::{Message, Part, PartDescriptor};
use super::model::WsdlModel;
use super::port_type::{Operation, OperationFault, OperationMessage, PortType};
use super::service::{Port, Service};
use crate::config::{MIME_OCTET_STREAM, WSAM_NS, WSDL_MIME_NS, WSDL_NS, WSDL_SOAP11_NS, WSDL_SOAP12_NS};
use crate::error::{Error, Result};
use crate::message::SoapVersion;
use crate::qname::QName;
use roxmltree::Node;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ============================================================================
// Entity resolution
// ============================================================================

/// A resolved document.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    /// Canonical identifier; imports are read once per identifier.
    pub system_id: String,
    /// Document text.
    pub content: String,
}

/// Resolves `wsdl:import location` values.
pub trait EntityResolver: Send + Sync {
    /// Resolve `location` relative to the importing document `base`.
    ///
    /// `Ok(None)` means the location is unknown to this resolver.
    fn resolve(&self, location: &str, base: Option<&str>) -> Result<Option<ResolvedEntity>>;
}

/// Resolves locations as filesystem paths relative to the importing document.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    root: Option<PathBuf>,
}

impl FileResolver {
    /// Resolver for relative paths against the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver for top-level relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, location: &str, base: Option<&str>) -> PathBuf {
        let location = location.strip_prefix("file://").unwrap_or(location);
        let candidate = Path::new(location);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        match base.and_then(|b| Path::new(b).parent()) {
            Some(dir) => dir.join(candidate),
            None => match &self.root {
                Some(root) => root.join(candidate),
                None => candidate.to_path_buf(),
            },
        }
    }
}

impl EntityResolver for FileResolver {
    fn resolve(&self, location: &str, base: Option<&str>) -> Result<Option<ResolvedEntity>> {
        let path = self.path_for(location, base);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(ResolvedEntity {
                system_id: path.to_string_lossy().into_owned(),
                content,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// In-memory resolver keyed by location.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    documents: HashMap<String, String>,
}

impl MapResolver {
    /// Empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `location`.
    pub fn with(mut self, location: impl Into<String>, content: impl Into<String>) -> Self {
        self.documents.insert(location.into(), content.into());
        self
    }
}

impl EntityResolver for MapResolver {
    fn resolve(&self, location: &str, _base: Option<&str>) -> Result<Option<ResolvedEntity>> {
        Ok(self.documents.get(location).map(|content| ResolvedEntity {
            system_id: location.to_string(),
            content: content.clone(),
        }))
    }
}

// ============================================================================
// Parser
// ============================================================================

fn is_wsdl(el: Node<'_, '_>, local: &str) -> bool {
    el.tag_name().namespace() == Some(WSDL_NS) && el.tag_name().name() == local
}

fn is_soap(el: Node<'_, '_>, local: &str) -> bool {
    let ns = el.tag_name().namespace();
    (ns == Some(WSDL_SOAP11_NS) || ns == Some(WSDL_SOAP12_NS)) && el.tag_name().name() == local
}

fn is_mime(el: Node<'_, '_>, local: &str) -> bool {
    el.tag_name().namespace() == Some(WSDL_MIME_NS) && el.tag_name().name() == local
}

fn in_wsdl_ns(el: Node<'_, '_>) -> bool {
    el.tag_name().namespace() == Some(WSDL_NS)
}

fn elements<'a, 'input>(el: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    el.children().filter(|n| n.is_element())
}

fn required_attr<'a>(el: Node<'a, '_>, name: &str) -> Result<&'a str> {
    el.attribute(name).ok_or_else(|| {
        Error::WsdlParse(format!(
            "<{}> without '{}' attribute",
            el.tag_name().name(),
            name
        ))
    })
}

fn qname_attr(el: Node<'_, '_>, name: &str) -> Result<Option<QName>> {
    match el.attribute(name) {
        None => Ok(None),
        Some(value) => QName::resolve(el, value).map(Some).ok_or_else(|| {
            Error::WsdlParse(format!("undeclared prefix in {}=\"{}\"", name, value))
        }),
    }
}

/// WSDL 1.1 parser.
///
/// # Example
///
/// ```rust,no_run
/// use hsoap::wsdl::{FileResolver, WsdlParser};
///
/// let model = WsdlParser::new()
///     .with_resolver(FileResolver::new())
///     .parse_location("calculator.wsdl")
///     .unwrap();
/// assert!(model.is_frozen());
/// ```
pub struct WsdlParser {
    resolver: Option<Box<dyn EntityResolver>>,
    extensions: ExtensionFacade,
}

impl Default for WsdlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WsdlParser {
    /// Parser with the built-in extensions and no resolver (imports fail).
    pub fn new() -> Self {
        Self {
            resolver: None,
            extensions: ExtensionFacade::with_builtins(),
        }
    }

    /// Use `resolver` for imports and [`parse_location`](Self::parse_location).
    pub fn with_resolver(mut self, resolver: impl EntityResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Register an extension after the built-in ones.
    pub fn with_extension(mut self, extension: impl ParserExtension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Parse a document given as text.
    pub fn parse(&self, xml: &str) -> Result<WsdlModel> {
        let mut model = WsdlModel::new();
        let mut visited = HashSet::new();
        self.read_document(xml, None, true, &mut model, &mut visited)?;
        self.complete(model)
    }

    /// Resolve `location` and parse it.
    pub fn parse_location(&self, location: &str) -> Result<WsdlModel> {
        let entity = match &self.resolver {
            Some(resolver) => resolver.resolve(location, None)?,
            None => FileResolver::new().resolve(location, None)?,
        }
        .ok_or_else(|| Error::WsdlParse(format!("cannot resolve '{}'", location)))?;

        let mut model = WsdlModel::new();
        let mut visited = HashSet::new();
        visited.insert(entity.system_id.clone());
        self.read_document(
            &entity.content,
            Some(&entity.system_id),
            true,
            &mut model,
            &mut visited,
        )?;
        self.complete(model)
    }

    fn complete(&self, mut model: WsdlModel) -> Result<WsdlModel> {
        let rpc_lit: Vec<QName> = model
            .bindings()
            .filter(|b| b.is_rpc_lit())
            .map(|b| b.name().clone())
            .collect();
        for binding in &rpc_lit {
            model.finalize_rpc_lit_binding(binding)?;
        }
        self.extensions.finished(&mut model)?;
        model.freeze()?;
        Ok(model)
    }

    fn read_document(
        &self,
        xml: &str,
        system_id: Option<&str>,
        top_level: bool,
        model: &mut WsdlModel,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| {
            Error::WsdlParse(format!("{}: {}", system_id.unwrap_or("<inline>"), e))
        })?;
        let root = doc.root_element();
        if !is_wsdl(root, "definitions") {
            if top_level {
                return Err(Error::WsdlParse(format!(
                    "root element is {}, expected wsdl:definitions",
                    QName::of(root)
                )));
            }
            log::debug!(
                "[wsdl] import {} is not a WSDL document, skipped",
                system_id.unwrap_or("<inline>")
            );
            return Ok(());
        }
        let tns = root.attribute("targetNamespace").unwrap_or("");
        log::debug!(
            "[wsdl] reading {} (targetNamespace={})",
            system_id.unwrap_or("<inline>"),
            tns
        );

        for el in elements(root) {
            if !in_wsdl_ns(el) {
                self.extensions.definitions_element(model, el);
                continue;
            }
            match el.tag_name().name() {
                "import" => self.read_import(el, system_id, model, visited)?,
                "message" => model.add_message(self.read_message(el, tns)?)?,
                "portType" => model.add_port_type(self.read_port_type(el, tns)?)?,
                "binding" => model.add_binding(self.read_binding(el, tns)?)?,
                "service" => model.add_service(self.read_service(el, tns)?)?,
                _ => {} // types, documentation
            }
        }
        Ok(())
    }

    fn read_import(
        &self,
        el: Node<'_, '_>,
        base: Option<&str>,
        model: &mut WsdlModel,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        let location = required_attr(el, "location")?;
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            Error::WsdlParse(format!("no entity resolver for import '{}'", location))
        })?;
        let entity = resolver
            .resolve(location, base)?
            .ok_or_else(|| Error::WsdlParse(format!("cannot resolve import '{}'", location)))?;
        if !visited.insert(entity.system_id.clone()) {
            return Ok(());
        }
        self.read_document(
            &entity.content,
            Some(&entity.system_id),
            false,
            model,
            visited,
        )
    }

    fn read_message(&self, el: Node<'_, '_>, tns: &str) -> Result<Message> {
        let mut message = Message::new(QName::new(tns, required_attr(el, "name")?));
        for child in elements(el) {
            if is_wsdl(child, "part") {
                let descriptor = match qname_attr(child, "element")? {
                    Some(element) => Some(PartDescriptor::Element(element)),
                    None => qname_attr(child, "type")?.map(PartDescriptor::Type),
                };
                message.add_part(Part::new(required_attr(child, "name")?, descriptor))?;
            } else if !in_wsdl_ns(child) {
                self.extensions.message_element(&mut message, child);
            }
        }
        Ok(message)
    }

    fn read_port_type(&self, el: Node<'_, '_>, tns: &str) -> Result<PortType> {
        let mut port_type = PortType::new(QName::new(tns, required_attr(el, "name")?));
        for child in elements(el) {
            if is_wsdl(child, "operation") {
                port_type.add_operation(self.read_operation(child)?)?;
            } else if !in_wsdl_ns(child) {
                self.extensions.port_type_element(&mut port_type, child);
            }
        }
        Ok(port_type)
    }

    fn read_operation(&self, el: Node<'_, '_>) -> Result<Operation> {
        let mut op = Operation::new(required_attr(el, "name")?);
        for child in elements(el) {
            if !in_wsdl_ns(child) {
                self.extensions.port_type_operation_element(&mut op, child);
                continue;
            }
            match child.tag_name().name() {
                "input" | "output" => {
                    let message = qname_attr(child, "message")?.ok_or_else(|| {
                        Error::WsdlParse(format!("operation '{}' message without reference", op.name()))
                    })?;
                    let mut msg = OperationMessage {
                        name: child.attribute("name").map(str::to_string),
                        message,
                        action: None,
                    };
                    self.extensions.operation_message_attributes(&mut msg, child);
                    if child.tag_name().name() == "input" {
                        op.input = Some(msg);
                    } else {
                        op.output = Some(msg);
                    }
                }
                "fault" => {
                    let message = qname_attr(child, "message")?.ok_or_else(|| {
                        Error::WsdlParse(format!("operation '{}' fault without message", op.name()))
                    })?;
                    op.faults.push(OperationFault {
                        name: required_attr(child, "name")?.to_string(),
                        message,
                        action: child.attribute((WSAM_NS, "Action")).map(str::to_string),
                    });
                }
                _ => {}
            }
        }
        Ok(op)
    }

    fn read_binding(&self, el: Node<'_, '_>, tns: &str) -> Result<BoundPortType> {
        let name = QName::new(tns, required_attr(el, "name")?);
        let port_type = qname_attr(el, "type")?
            .ok_or_else(|| Error::WsdlParse(format!("binding {} without type", name)))?;
        let mut binding = BoundPortType::new(name, port_type);

        for child in elements(el) {
            if is_soap(child, "binding") {
                if let Some(version) = child
                    .tag_name()
                    .namespace()
                    .and_then(SoapVersion::from_binding_ns)
                {
                    binding.set_soap_version(version);
                }
                if let Some(style) = child.attribute("style") {
                    binding.set_style(Style::parse(style));
                }
                if let Some(transport) = child.attribute("transport") {
                    binding.set_transport(transport);
                }
            } else if is_wsdl(child, "operation") {
                let op = self.read_binding_operation(child, tns)?;
                binding.add_operation(op)?;
            } else if !in_wsdl_ns(child) {
                self.extensions.binding_element(&mut binding, child);
            }
        }
        Ok(binding)
    }

    fn read_binding_operation(&self, el: Node<'_, '_>, tns: &str) -> Result<BoundOperation> {
        let mut op = BoundOperation::new(QName::new(tns, required_attr(el, "name")?));
        for child in elements(el) {
            if is_soap(child, "operation") {
                if let Some(action) = child.attribute("soapAction") {
                    op.set_soap_action(action.trim());
                }
                if let Some(style) = child.attribute("style") {
                    op.set_style(Style::parse(style));
                }
            } else if is_wsdl(child, "input") {
                self.read_binding_message(child, Mode::In, &mut op);
            } else if is_wsdl(child, "output") {
                self.read_binding_message(child, Mode::Out, &mut op);
            } else if !in_wsdl_ns(child) {
                self.extensions.binding_operation_element(&mut op, child);
            }
        }
        Ok(op)
    }

    fn read_binding_message(&self, el: Node<'_, '_>, mode: Mode, op: &mut BoundOperation) {
        for child in elements(el) {
            if is_soap(child, "body") {
                read_soap_body(child, mode, op);
            } else if is_soap(child, "header") {
                if let Some(part) = child.attribute("part") {
                    op.set_part_binding(mode, part, ParameterBinding::Header);
                }
            } else if is_mime(child, "multipartRelated") {
                for mime_part in elements(child).filter(|n| is_mime(*n, "part")) {
                    for content in elements(mime_part) {
                        if is_soap(content, "body") {
                            read_soap_body(content, mode, op);
                        } else if is_mime(content, "content") {
                            if let Some(part) = content.attribute("part") {
                                let ty = content.attribute("type").unwrap_or(MIME_OCTET_STREAM);
                                op.set_part_binding(
                                    mode,
                                    part,
                                    ParameterBinding::Attachment(vec![ty.to_string()]),
                                );
                            }
                        }
                    }
                }
            } else if !in_wsdl_ns(child) {
                self.extensions.binding_operation_element(op, child);
            }
        }
    }

    fn read_service(&self, el: Node<'_, '_>, tns: &str) -> Result<Service> {
        let mut service = Service::new(QName::new(tns, required_attr(el, "name")?));
        for child in elements(el) {
            if is_wsdl(child, "port") {
                service.add_port(self.read_port(child, tns)?)?;
            } else if !in_wsdl_ns(child) {
                self.extensions.service_element(&mut service, child);
            }
        }
        Ok(service)
    }

    fn read_port(&self, el: Node<'_, '_>, tns: &str) -> Result<Port> {
        let name = QName::new(tns, required_attr(el, "name")?);
        let binding = qname_attr(el, "binding")?
            .ok_or_else(|| Error::WsdlParse(format!("port {} without binding", name)))?;
        let mut port = Port::new(name, binding);
        for child in elements(el) {
            if is_soap(child, "address") {
                if let Some(location) = child.attribute("location") {
                    port.set_address(location);
                }
            } else if !in_wsdl_ns(child) {
                self.extensions.port_element(&mut port, child);
            }
        }
        Ok(port)
    }
}

fn read_soap_body(el: Node<'_, '_>, mode: Mode, op: &mut BoundOperation) {
    if let Some(parts) = el.attribute("parts") {
        let parts: Vec<String> = parts.split_whitespace().map(str::to_string).collect();
        op.set_body_parts(mode, &parts);
    }
    if let Some(ns) = el.attribute("namespace") {
        op.set_body_namespace(mode, ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALC: &str = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
             xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
             xmlns:xsd="http://www.w3.org/2001/XMLSchema"
             xmlns:tns="urn:calc"
             targetNamespace="urn:calc">
  <message name="AddRequest">
    <part name="partA" type="xsd:int"/>
    <part name="auth" type="xsd:string"/>
    <part name="partB" type="xsd:int"/>
  </message>
  <message name="AddResponse"><part name="result" type="xsd:int"/></message>
  <message name="PingRequest"><part name="text" type="xsd:string"/></message>
  <portType name="Calc">
    <operation name="Add">
      <input message="tns:AddRequest"/>
      <output message="tns:AddResponse"/>
    </operation>
    <operation name="Ping"><input message="tns:PingRequest"/></operation>
  </portType>
  <binding name="CalcBinding" type="tns:Calc">
    <soap:binding style="rpc" transport="http://schemas.xmlsoap.org/soap/http"/>
    <operation name="Add">
      <soap:operation soapAction="urn:calc#Add"/>
      <input>
        <soap:body use="literal" namespace="urn:calc"/>
        <soap:header message="tns:AddRequest" part="auth" use="literal"/>
      </input>
      <output><soap:body use="literal" namespace="urn:calc"/></output>
    </operation>
    <operation name="Ping">
      <soap:operation soapAction="urn:calc#Ping"/>
      <input><soap:body use="literal"/></input>
    </operation>
  </binding>
  <service name="CalcService">
    <port name="CalcPort" binding="tns:CalcBinding">
      <soap:address location="http://localhost:8080/calc"/>
    </port>
  </service>
</definitions>"#;

    #[test]
    fn test_parse_rpc_literal_calculator() {
        let model = WsdlParser::new().parse(CALC).unwrap();
        assert!(model.is_frozen());

        let q = |l: &str| QName::new("urn:calc", l);
        let binding = model.binding_for(&q("CalcService"), &q("CalcPort")).unwrap();
        assert!(binding.is_rpc_lit());
        assert_eq!(binding.soap_version(), Some(SoapVersion::Soap11));
        assert_eq!(binding.operation_by_action("\"urn:calc#Add\"").unwrap().name(), &q("Add"));

        let req = model.message(&q("AddRequest")).unwrap();
        assert_eq!(req.part("partA").unwrap().index(), Some(0));
        assert_eq!(req.part("auth").unwrap().index(), None);
        assert!(req.part("auth").unwrap().binding().is_unbound());
        assert_eq!(req.part("partB").unwrap().index(), Some(1));
        assert!(req.part("partB").unwrap().binding().is_body());

        let ping = binding.operation("Ping").unwrap();
        assert!(ping.is_one_way());
        assert!(ping.body_parts(Mode::Out).is_empty());

        let port = model.port(&q("CalcService"), &q("CalcPort")).unwrap();
        assert_eq!(port.address(), Some("http://localhost:8080/calc"));
    }

    #[test]
    fn test_import_through_resolver() {
        let main = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                         xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
                         xmlns:tns="urn:calc" targetNamespace="urn:calc">
            <import namespace="urn:calc" location="abstract.wsdl"/>
            <import namespace="urn:calc" location="abstract.wsdl"/>
            <binding name="B" type="tns:Echo">
              <soap:binding style="document"/>
              <operation name="Echo"><input><soap:body use="literal"/></input></operation>
            </binding>
            <service name="S"><port name="P" binding="tns:B"/></service>
          </definitions>"#;
        let abstract_doc = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                         xmlns:tns="urn:calc" targetNamespace="urn:calc">
            <message name="EchoIn"><part name="body" element="tns:echo"/></message>
            <portType name="Echo"><operation name="Echo"><input message="tns:EchoIn"/></operation></portType>
          </definitions>"#;

        let model = WsdlParser::new()
            .with_resolver(MapResolver::new().with("abstract.wsdl", abstract_doc))
            .parse(main)
            .unwrap();
        assert_eq!(model.messages().count(), 1);
        assert!(model.port_type(&QName::new("urn:calc", "Echo")).is_some());
    }

    #[test]
    fn test_import_without_resolver_fails() {
        let main = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:x">
            <import namespace="urn:x" location="other.wsdl"/>
          </definitions>"#;
        assert!(matches!(WsdlParser::new().parse(main), Err(Error::WsdlParse(_))));
    }

    #[test]
    fn test_dangling_reference_fails_freeze() {
        let doc = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                        xmlns:tns="urn:x" targetNamespace="urn:x">
            <binding name="B" type="tns:Missing"/>
          </definitions>"#;
        let err = WsdlParser::new().parse(doc).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { kind: "portType", .. }));
    }

    #[test]
    fn test_wrong_root_rejected() {
        assert!(matches!(
            WsdlParser::new().parse("<schema/>"),
            Err(Error::WsdlParse(_))
        ));
    }

    #[test]
    fn test_mime_multipart_binding() {
        let doc = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                        xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
                        xmlns:mime="http://schemas.xmlsoap.org/wsdl/mime/"
                        xmlns:tns="urn:x" targetNamespace="urn:x">
            <message name="Up"><part name="meta" type="tns:m"/><part name="img" type="tns:b"/></message>
            <portType name="PT"><operation name="Upload"><input message="tns:Up"/></operation></portType>
            <binding name="B" type="tns:PT">
              <soap:binding style="document"/>
              <operation name="Upload">
                <input>
                  <mime:multipartRelated>
                    <mime:part><soap:body parts="meta" use="literal"/></mime:part>
                    <mime:part>
                      <mime:content part="img" type="image/png"/>
                      <mime:content part="img" type="image/jpeg"/>
                    </mime:part>
                  </mime:multipartRelated>
                </input>
              </operation>
            </binding>
          </definitions>"#;
        let model = WsdlParser::new().parse(doc).unwrap();
        let op = model
            .binding(&QName::new("urn:x", "B"))
            .unwrap()
            .operation("Upload")
            .unwrap();
        assert!(op.input_binding("meta").is_body());
        assert_eq!(
            op.input_binding("img"),
            ParameterBinding::Attachment(vec!["image/png".into(), "image/jpeg".into()])
        );
    }

    #[test]
    fn test_required_extension_on_binding_recorded() {
        let doc = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                        xmlns:x="urn:ext" xmlns:tns="urn:x" targetNamespace="urn:x">
            <portType name="PT"/>
            <binding name="B" type="tns:PT"><x:Secure xmlns:w="http://schemas.xmlsoap.org/wsdl/" w:required="true"/></binding>
            <service name="S"><port name="P" binding="tns:B"/></service>
          </definitions>"#;
        let model = WsdlParser::new().parse(doc).unwrap();
        let err = model
            .validate_extensions(&QName::new("urn:x", "S"), &QName::new("urn:x", "P"))
            .unwrap_err();
        assert!(matches!(err, Error::NotUnderstoodExtension(name) if name == QName::new("urn:ext", "Secure")));
    }
}
