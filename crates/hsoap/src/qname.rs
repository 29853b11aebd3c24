// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Qualified XML names (namespace URI + local part).

use std::fmt;
use std::str::FromStr;

/// Qualified name used as the key of every WSDL model map.
///
/// Prefixes are not part of the identity; two names are equal when their
/// namespace URI and local part are equal.
///
/// # Examples
/// ```
/// use hsoap::QName;
///
/// let name: QName = "{urn:calc}Add".parse().unwrap();
/// assert_eq!(name, QName::new("urn:calc", "Add"));
/// assert_eq!(name.to_string(), "{urn:calc}Add");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QName {
    namespace: String,
    local: String,
}

impl QName {
    /// Create a qualified name.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// Create a name without namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new("", local)
    }

    /// Namespace URI ("" when unqualified).
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Local part.
    #[inline]
    pub fn local_part(&self) -> &str {
        &self.local
    }

    /// Resolve a `prefix:local` reference against a roxmltree element's in-scope namespaces.
    ///
    /// Unprefixed references resolve against the default namespace, matching how
    /// WSDL 1.1 `message="..."`, `type="..."` and `binding="..."` attributes are written.
    pub fn resolve(node: roxmltree::Node<'_, '_>, reference: &str) -> Option<Self> {
        let reference = reference.trim();
        match reference.split_once(':') {
            Some((prefix, local)) => {
                let ns = node.lookup_namespace_uri(Some(prefix))?;
                Some(Self::new(ns, local))
            }
            None => {
                let ns = node.lookup_namespace_uri(None).unwrap_or("");
                Some(Self::new(ns, reference))
            }
        }
    }

    /// Name of a roxmltree element.
    pub fn of(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        Self::new(tag.namespace().unwrap_or(""), tag.name())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl FromStr for QName {
    type Err = String;

    /// Parse the `{namespace}local` notation (or a bare local name).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('{') {
            let (ns, local) = rest
                .split_once('}')
                .ok_or_else(|| format!("Unterminated namespace in QName '{}'", s))?;
            if local.is_empty() {
                return Err(format!("Empty local part in QName '{}'", s));
            }
            Ok(Self::new(ns, local))
        } else if s.is_empty() {
            Err("Empty QName".to_string())
        } else {
            Ok(Self::local(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clark_notation() {
        let q: QName = "{http://example.com/ns}Echo".parse().unwrap();
        assert_eq!(q.namespace(), "http://example.com/ns");
        assert_eq!(q.local_part(), "Echo");
        assert!("{unterminated".parse::<QName>().is_err());
        assert!("{ns}".parse::<QName>().is_err());
    }

    #[test]
    fn test_resolve_prefixed_reference() {
        let xml = r#"<a xmlns="urn:default" xmlns:tns="urn:tns"><b/></a>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let b = doc.root_element().first_element_child().unwrap();

        assert_eq!(QName::resolve(b, "tns:Foo"), Some(QName::new("urn:tns", "Foo")));
        assert_eq!(QName::resolve(b, "Bar"), Some(QName::new("urn:default", "Bar")));
        assert_eq!(QName::resolve(b, "missing:Baz"), None);
    }
}
