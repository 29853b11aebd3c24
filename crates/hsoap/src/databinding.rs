// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Databinding provider registry.
//!
//! The runtime only needs two operations from a databinding: turn a typed
//! value into an XML fragment for a given element name, and turn raw XML
//! back into a typed value ([`XmlBridge`]). Providers register a
//! [`BindingContextFactory`]; an endpoint resolves its factory once, at
//! build time.

use crate::config::DEFAULT_DATABINDING_MODE;
use crate::error::{Error, Result};
use crate::message::xml::escape_text;
use crate::qname::QName;
use std::any::Any;
use std::sync::Arc;

/// Narrow marshalling interface of a databinding.
pub trait XmlBridge: Send + Sync {
    /// Serialize `value` as an element named `element`.
    fn marshal(&self, value: &dyn Any, element: &QName) -> Result<String>;

    /// Deserialize an element.
    fn unmarshal(&self, xml: &str) -> Result<Box<dyn Any + Send>>;
}

/// Databinding provider.
pub trait BindingContextFactory: Send + Sync {
    /// Provider name, e.g. `raw-xml`.
    fn mode(&self) -> &str;

    /// Whether this provider serves `mode`.
    fn is_for(&self, mode: &str) -> bool {
        self.mode() == mode
    }

    /// New binding context.
    fn new_context(&self) -> Result<Arc<dyn XmlBridge>>;
}

/// Registered providers in registration order.
#[derive(Clone, Default)]
pub struct DatabindingRegistry {
    factories: Vec<Arc<dyn BindingContextFactory>>,
}

impl DatabindingRegistry {
    /// Registry without providers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in `raw-xml` provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(RawXmlFactory));
        registry
    }

    /// Append a provider.
    pub fn register(&mut self, factory: Arc<dyn BindingContextFactory>) {
        self.factories.push(factory);
    }

    /// Resolve a context.
    ///
    /// An explicit mode needs a matching provider
    /// ([`Error::UnknownDatabindingMode`]); without a mode the first
    /// registered provider is used ([`Error::NoDatabindingFactory`] if none).
    pub fn create(&self, mode: Option<&str>) -> Result<Arc<dyn XmlBridge>> {
        let factory = match mode {
            Some(mode) => self
                .factories
                .iter()
                .find(|f| f.is_for(mode))
                .ok_or_else(|| Error::UnknownDatabindingMode(mode.to_string()))?,
            None => self.factories.first().ok_or(Error::NoDatabindingFactory)?,
        };
        log::debug!("[databinding] using provider {}", factory.mode());
        factory.new_context()
    }
}

/// Provider whose values are plain strings carried as element text.
pub struct RawXmlFactory;

impl BindingContextFactory for RawXmlFactory {
    fn mode(&self) -> &str {
        DEFAULT_DATABINDING_MODE
    }

    fn new_context(&self) -> Result<Arc<dyn XmlBridge>> {
        Ok(Arc::new(RawXmlBridge))
    }
}

/// `String`/`&str` values as the text content of the element.
pub struct RawXmlBridge;

impl XmlBridge for RawXmlBridge {
    fn marshal(&self, value: &dyn Any, element: &QName) -> Result<String> {
        let text = value
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| value.downcast_ref::<&str>().copied())
            .ok_or_else(|| Error::Databinding("raw-xml marshals String values only".into()))?;
        let xml = if element.namespace().is_empty() {
            format!("<{0}>{1}</{0}>", element.local_part(), escape_text(text))
        } else {
            format!(
                "<ns0:{0} xmlns:ns0=\"{1}\">{2}</ns0:{0}>",
                element.local_part(),
                crate::message::xml::escape_attr(element.namespace()),
                escape_text(text)
            )
        };
        Ok(xml)
    }

    fn unmarshal(&self, xml: &str) -> Result<Box<dyn Any + Send>> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| Error::Databinding(format!("raw-xml: {}", e)))?;
        let text: String = doc
            .root_element()
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        Ok(Box::new(text.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_by_mode_and_default() {
        let registry = DatabindingRegistry::with_defaults();
        assert!(registry.create(Some("raw-xml")).is_ok());
        assert!(registry.create(None).is_ok());
        assert!(matches!(
            registry.create(Some("jaxb")),
            Err(Error::UnknownDatabindingMode(m)) if m == "jaxb"
        ));
        assert!(matches!(
            DatabindingRegistry::empty().create(None),
            Err(Error::NoDatabindingFactory)
        ));
    }

    #[test]
    fn test_raw_xml_bridge() {
        let bridge = RawXmlBridge;
        let element = QName::new("urn:calc", "result");
        let xml = bridge.marshal(&"3 < 4".to_string(), &element).unwrap();
        assert!(xml.contains("3 &lt; 4"));

        let value = bridge.unmarshal(&xml).unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("3 < 4"));
        assert!(bridge.marshal(&42u32, &element).is_err());
    }
}
