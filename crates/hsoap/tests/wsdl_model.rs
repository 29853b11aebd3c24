// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! WSDL model integration tests
//!
//! Parses complete documents through the public parser and checks the frozen
//! model: RPC/literal part ordering, freeze idempotence and extension
//! validation at endpoint construction.

use hsoap::server::{Binding, EndpointBuilder, InvocationContext, MonitoringRegistry};
use hsoap::wsdl::{Mode, ParserExtension, WsdlModel, WsdlParser};
use hsoap::{Error, Message, QName, SoapVersion};
use std::sync::Arc;

const CALC: &str = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
             xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
             xmlns:wsaw="http://www.w3.org/2006/05/addressing/wsdl"
             xmlns:xsd="http://www.w3.org/2001/XMLSchema"
             xmlns:tns="urn:calc"
             targetNamespace="urn:calc">
  <message name="AddRequest">
    <part name="partA" type="xsd:int"/>
    <part name="session" type="xsd:string"/>
    <part name="partB" type="xsd:int"/>
  </message>
  <message name="AddResponse"><part name="result" type="xsd:int"/></message>
  <portType name="Calc">
    <operation name="Add">
      <input message="tns:AddRequest"/>
      <output message="tns:AddResponse"/>
    </operation>
  </portType>
  <binding name="CalcBinding" type="tns:Calc">
    <soap:binding style="rpc" transport="http://schemas.xmlsoap.org/soap/http"/>
    <wsaw:UsingAddressing/>
    <operation name="Add">
      <soap:operation soapAction="urn:calc#Add"/>
      <input>
        <soap:body use="literal" namespace="urn:calc"/>
        <soap:header message="tns:AddRequest" part="session" use="literal"/>
      </input>
      <output><soap:body use="literal" namespace="urn:calc"/></output>
    </operation>
  </binding>
  <service name="CalcService">
    <port name="CalcPort" binding="tns:CalcBinding">
      <soap:address location="http://localhost:8080/calc"/>
    </port>
  </service>
</definitions>"#;

fn q(local: &str) -> QName {
    QName::new("urn:calc", local)
}

fn parse() -> WsdlModel {
    WsdlParser::new().parse(CALC).expect("calculator WSDL parses")
}

#[test]
fn test_rpc_literal_body_indices_are_contiguous() {
    let model = parse();
    let request = model.message(&q("AddRequest")).unwrap();

    let indices: Vec<_> = request
        .parts()
        .iter()
        .filter_map(|p| p.index().map(|i| (p.name().to_string(), i)))
        .collect();
    assert_eq!(indices, vec![("partA".to_string(), 0), ("partB".to_string(), 1)]);
    assert!(request.part("partA").unwrap().binding().is_body());
    assert!(request.part("partB").unwrap().binding().is_body());

    let add = model.binding(&q("CalcBinding")).unwrap().operation("Add").unwrap();
    assert_eq!(add.body_parts(Mode::In), ["partA".to_string(), "partB".to_string()]);
    assert_eq!(add.body_parts(Mode::Out), ["result".to_string()]);
    assert!(add.input_binding("session").is_header());
}

#[test]
fn test_freeze_is_idempotent() {
    let mut model = parse();
    assert!(model.is_frozen());
    model.freeze().unwrap();
    model.freeze().unwrap();
    assert!(model.is_frozen());
    assert!(matches!(
        model.add_message(hsoap::wsdl::Message::new(q("Late"))),
        Err(Error::ModelFrozen)
    ));
}

#[test]
fn test_addressing_extension_recorded() {
    let model = parse();
    let binding = model.binding_for(&q("CalcService"), &q("CalcPort")).unwrap();
    assert_eq!(binding.addressing(), Some(false));
}

#[test]
fn test_endpoint_from_model_enables_addressing() {
    let endpoint = EndpointBuilder::new(q("CalcService"), q("CalcPort"), Binding::new(SoapVersion::Soap11))
        .wsdl(Arc::new(parse()))
        .invoker(|_cx: &InvocationContext<'_>, _m: Message| Ok(None))
        .monitoring(Arc::new(MonitoringRegistry::new()))
        .build()
        .unwrap();

    assert!(endpoint.binding().features().is_addressing_enabled());
    assert_eq!(endpoint.tube_names(), vec!["must-understand", "addressing", "invoker"]);
    assert_eq!(endpoint.info().address(), Some("http://localhost:8080/calc"));
    assert_eq!(endpoint.info().binding_name(), Some(&q("CalcBinding")));
}

#[test]
fn test_unknown_port_is_fatal() {
    let result = EndpointBuilder::new(q("CalcService"), q("NoSuchPort"), Binding::new(SoapVersion::Soap11))
        .wsdl(Arc::new(parse()))
        .invoker(|_cx: &InvocationContext<'_>, _m: Message| Ok(None))
        .monitoring(Arc::new(MonitoringRegistry::new()))
        .build();
    assert!(matches!(result, Err(Error::UnresolvedReference { kind: "port", .. })));
}

#[test]
fn test_required_extension_blocks_endpoint() {
    let doc = CALC.replace(
        "<wsaw:UsingAddressing/>",
        r#"<x:Policy xmlns:x="urn:policy" xmlns:w="http://schemas.xmlsoap.org/wsdl/" w:required="true"/>"#,
    );
    let model = WsdlParser::new().parse(&doc).unwrap();
    let result = EndpointBuilder::new(q("CalcService"), q("CalcPort"), Binding::new(SoapVersion::Soap11))
        .wsdl(Arc::new(model))
        .invoker(|_cx: &InvocationContext<'_>, _m: Message| Ok(None))
        .monitoring(Arc::new(MonitoringRegistry::new()))
        .build();
    assert!(matches!(
        result,
        Err(Error::NotUnderstoodExtension(name)) if name == QName::new("urn:policy", "Policy")
    ));
}

/// Extension that understands `x:Policy` on bindings.
struct PolicyExtension;

impl ParserExtension for PolicyExtension {
    fn name(&self) -> &str {
        "policy"
    }

    fn binding_element(&self, _binding: &mut hsoap::wsdl::BoundPortType, node: roxmltree::Node<'_, '_>) -> bool {
        node.tag_name().namespace() == Some("urn:policy") && node.tag_name().name() == "Policy"
    }
}

#[test]
fn test_custom_extension_understands_required_element() {
    let doc = CALC.replace(
        "<wsaw:UsingAddressing/>",
        r#"<x:Policy xmlns:x="urn:policy" xmlns:w="http://schemas.xmlsoap.org/wsdl/" w:required="true"/>"#,
    );
    let model = WsdlParser::new()
        .with_extension(PolicyExtension)
        .parse(&doc)
        .unwrap();
    model.validate_extensions(&q("CalcService"), &q("CalcPort")).unwrap();
}
