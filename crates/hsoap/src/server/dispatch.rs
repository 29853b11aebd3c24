// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request to WSDL operation resolution.

use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::pipe::tubes::AddressingProperties;
use crate::qname::QName;
use crate::wsdl::{BoundOperation, BoundPortType, Mode, PartDescriptor, Style, WsdlModel};
use std::collections::HashMap;
use std::sync::Arc;

/// Operation a request was dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedOperation {
    /// Bound operation name.
    pub name: QName,
    /// `soap:operation soapAction` (may be empty).
    pub soap_action: String,
    /// WS-Addressing input action, if declared.
    pub input_action: Option<String>,
    /// Effective style (operation override or binding default).
    pub style: Style,
    /// No response is sent.
    pub one_way: bool,
    /// Input message.
    pub input_message: Option<QName>,
    /// Output message.
    pub output_message: Option<QName>,
    /// Expected payload element of the request (`None` for an empty body).
    pub request_payload: Option<QName>,
    /// Payload element of the response.
    pub response_payload: Option<QName>,
}

/// Finds the operation of a request.
///
/// Lookup order: WS-Addressing action (when the addressing stage ran), then
/// the payload element, then SOAPAction.
#[derive(Debug, Default)]
pub struct OperationDispatcher {
    operations: Vec<Arc<DispatchedOperation>>,
    by_payload: HashMap<QName, Arc<DispatchedOperation>>,
    by_soap_action: HashMap<String, Arc<DispatchedOperation>>,
    by_wsa_action: HashMap<String, Arc<DispatchedOperation>>,
    empty_body: Option<Arc<DispatchedOperation>>,
}

impl OperationDispatcher {
    /// Dispatcher without operations; every request resolves to `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index the operations of `binding`.
    ///
    /// Payload elements shared by several operations are ambiguous and left
    /// to SOAPAction.
    pub fn from_model(model: &WsdlModel, binding: &BoundPortType) -> Self {
        let mut dispatcher = Self::default();
        let mut ambiguous: Vec<QName> = Vec::new();
        let port_type = model.port_type(binding.port_type_name());

        for bop in binding.operations() {
            let style = bop.style().unwrap_or_else(|| binding.style());
            let abstract_op = port_type.and_then(|pt| pt.operation(bop.name().local_part()));
            let op = Arc::new(DispatchedOperation {
                name: bop.name().clone(),
                soap_action: bop.soap_action().to_string(),
                input_action: abstract_op
                    .and_then(|o| o.input.as_ref())
                    .and_then(|m| m.action.clone()),
                style,
                one_way: bop.is_one_way(),
                input_message: bop.input_message().cloned(),
                output_message: bop.output_message().cloned(),
                request_payload: payload_element(model, bop, style, Mode::In),
                response_payload: payload_element(model, bop, style, Mode::Out),
            });

            match &op.request_payload {
                Some(name) if ambiguous.contains(name) => {}
                Some(name) => {
                    if dispatcher.by_payload.remove(name).is_some() {
                        log::warn!("[dispatch] payload {} is not unique in {}", name, binding.name());
                        ambiguous.push(name.clone());
                    } else {
                        dispatcher.by_payload.insert(name.clone(), Arc::clone(&op));
                    }
                }
                None => {
                    if dispatcher.empty_body.is_none() {
                        dispatcher.empty_body = Some(Arc::clone(&op));
                    }
                }
            }
            if !op.soap_action.is_empty() {
                dispatcher
                    .by_soap_action
                    .entry(op.soap_action.clone())
                    .or_insert_with(|| Arc::clone(&op));
            }
            if let Some(action) = &op.input_action {
                dispatcher
                    .by_wsa_action
                    .entry(action.clone())
                    .or_insert_with(|| Arc::clone(&op));
            }
            dispatcher.operations.push(op);
        }
        log::debug!(
            "[dispatch] {} operations indexed for {}",
            dispatcher.operations.len(),
            binding.name()
        );
        dispatcher
    }

    /// All operations in binding order.
    pub fn operations(&self) -> &[Arc<DispatchedOperation>] {
        &self.operations
    }

    /// Resolve the operation of `packet`.
    ///
    /// `Ok(None)` when the endpoint has no WSDL operations; otherwise a
    /// request matching nothing fails with [`Error::DispatchFailed`].
    pub fn dispatch(&self, packet: &Packet) -> Result<Option<Arc<DispatchedOperation>>> {
        if self.operations.is_empty() {
            return Ok(None);
        }

        if let Some(action) = packet
            .satellite::<AddressingProperties>()
            .and_then(|a| a.action.as_deref())
        {
            if let Some(op) = self.by_wsa_action.get(action) {
                return Ok(Some(Arc::clone(op)));
            }
        }

        let payload = packet.message.as_ref().and_then(|m| m.payload_name());
        match payload {
            Some(name) => {
                if let Some(op) = self.by_payload.get(name) {
                    return Ok(Some(Arc::clone(op)));
                }
            }
            None => {
                if let Some(op) = &self.empty_body {
                    return Ok(Some(Arc::clone(op)));
                }
            }
        }

        let action = packet.soap_action.as_deref().map(|a| a.trim_matches('"'));
        if let Some(op) = action.filter(|a| !a.is_empty()).and_then(|a| self.by_soap_action.get(a)) {
            return Ok(Some(Arc::clone(op)));
        }

        Err(Error::DispatchFailed(format!(
            "no operation for payload {} and SOAPAction {:?}",
            payload.map_or_else(|| "<empty>".to_string(), ToString::to_string),
            action.unwrap_or("")
        )))
    }
}

/// Expected body element of one direction.
///
/// RPC: the wrapper `{body namespace}operation` (with `Response` appended
/// for the output). Document: the element of the first body part.
fn payload_element(model: &WsdlModel, bop: &BoundOperation, style: Style, mode: Mode) -> Option<QName> {
    let message = match mode {
        Mode::In => bop.input_message()?,
        Mode::Out => bop.output_message()?,
    };
    match style {
        Style::Rpc => {
            let local = match mode {
                Mode::In => bop.name().local_part().to_string(),
                Mode::Out => format!("{}Response", bop.name().local_part()),
            };
            let ns = bop.body_namespace(mode).unwrap_or_else(|| bop.name().namespace());
            Some(QName::new(ns, local.as_str()))
        }
        Style::Document => {
            let message = model.message(message)?;
            message
                .parts()
                .iter()
                .filter(|p| match mode {
                    Mode::In => bop.input_binding(p.name()).is_body(),
                    Mode::Out => bop.output_binding(p.name()).is_body(),
                })
                .find_map(|p| match p.descriptor() {
                    Some(PartDescriptor::Element(e)) => Some(e.clone()),
                    _ => None,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, SoapVersion};
    use crate::wsdl::WsdlParser;

    const DOC_LIT: &str = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
             xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
             xmlns:tns="urn:stock" targetNamespace="urn:stock">
  <message name="QuoteIn"><part name="body" element="tns:GetQuote"/></message>
  <message name="QuoteOut"><part name="body" element="tns:GetQuoteResponse"/></message>
  <message name="PingIn"/>
  <portType name="StockPort">
    <operation name="GetQuote"><input message="tns:QuoteIn"/><output message="tns:QuoteOut"/></operation>
    <operation name="Ping"><input message="tns:PingIn"/></operation>
  </portType>
  <binding name="StockBinding" type="tns:StockPort">
    <soap:binding style="document" transport="http://schemas.xmlsoap.org/soap/http"/>
    <operation name="GetQuote">
      <soap:operation soapAction="urn:stock#GetQuote"/>
      <input><soap:body use="literal"/></input>
      <output><soap:body use="literal"/></output>
    </operation>
    <operation name="Ping">
      <soap:operation soapAction="urn:stock#Ping"/>
      <input><soap:body use="literal"/></input>
    </operation>
  </binding>
  <service name="StockService">
    <port name="StockPort" binding="tns:StockBinding">
      <soap:address location="http://localhost/stock"/>
    </port>
  </service>
</definitions>"#;

    fn dispatcher() -> OperationDispatcher {
        let model = WsdlParser::new().parse(DOC_LIT).unwrap();
        let binding = model.binding(&QName::new("urn:stock", "StockBinding")).unwrap();
        OperationDispatcher::from_model(&model, binding)
    }

    #[test]
    fn test_dispatch_by_payload() {
        let d = dispatcher();
        let msg = Message::with_payload(
            SoapVersion::Soap11,
            r#"<s:GetQuote xmlns:s="urn:stock"><s:symbol>ACME</s:symbol></s:GetQuote>"#,
        )
        .unwrap();
        let op = d.dispatch(&Packet::with_message(msg)).unwrap().unwrap();
        assert_eq!(op.name.local_part(), "GetQuote");
        assert!(!op.one_way);
        assert_eq!(op.response_payload, Some(QName::new("urn:stock", "GetQuoteResponse")));
    }

    #[test]
    fn test_empty_body_and_soap_action() {
        let d = dispatcher();
        let op = d
            .dispatch(&Packet::with_message(Message::new(SoapVersion::Soap11)))
            .unwrap()
            .unwrap();
        assert_eq!(op.name.local_part(), "Ping");
        assert!(op.one_way);

        let msg = Message::with_payload(SoapVersion::Soap11, r#"<x:Other xmlns:x="urn:x"/>"#).unwrap();
        let mut packet = Packet::with_message(msg);
        packet.soap_action = Some("\"urn:stock#GetQuote\"".into());
        let op = d.dispatch(&packet).unwrap().unwrap();
        assert_eq!(op.name.local_part(), "GetQuote");
    }

    #[test]
    fn test_unknown_payload_fails() {
        let d = dispatcher();
        let msg = Message::with_payload(SoapVersion::Soap11, r#"<x:Other xmlns:x="urn:x"/>"#).unwrap();
        assert!(matches!(
            d.dispatch(&Packet::with_message(msg)),
            Err(Error::DispatchFailed(_))
        ));
        assert!(OperationDispatcher::empty()
            .dispatch(&Packet::new())
            .unwrap()
            .is_none());
    }
}
