// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML runtime document loader.
//!
//! Declares named tubelines, maps endpoints onto them and carries per-endpoint
//! features.
//!
//! # Example YAML
//!
//! ```yaml
//! tubelines:
//!   default: [must-understand, addressing, handlers]
//!   traced: [dump, must-understand, addressing, handlers]
//!
//! mappings:
//!   - endpoint-ref: "{urn:calc}CalculatorPort"
//!     tubeline-ref: traced
//!
//! endpoints:
//!   "{urn:calc}CalculatorPort":
//!     fast_infoset: true
//!     mtom:
//!       enabled: true
//!       threshold: 1024
//!     addressing:
//!       enabled: true
//!       required: false
//! ```

use crate::config::{AddressingFeature, Features, MtomFeature, DEFAULT_MTOM_THRESHOLD};
use crate::error::{Error, Result};
use crate::qname::QName;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Root YAML document structure.
#[derive(Debug, Deserialize, Default)]
pub struct RuntimeDocument {
    /// Named tubelines: ordered tube factory names (terminal invoker excluded).
    #[serde(default)]
    pub tubelines: HashMap<String, Vec<String>>,

    /// Endpoint to tubeline mappings.
    #[serde(default)]
    pub mappings: Vec<TubelineMapping>,

    /// Features keyed by endpoint reference (`{ns}PortName`).
    #[serde(default)]
    pub endpoints: HashMap<String, YamlFeatures>,
}

/// Maps one endpoint onto a named tubeline.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TubelineMapping {
    /// Endpoint reference: the port QName in `{ns}local` notation.
    #[serde(rename = "endpoint-ref")]
    pub endpoint_ref: String,
    /// Name of a tubeline declared under `tubelines`.
    #[serde(rename = "tubeline-ref")]
    pub tubeline_ref: String,
}

/// Feature block of one endpoint.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct YamlFeatures {
    /// Fast Infoset enabled/disabled.
    pub fast_infoset: Option<bool>,
    /// Select optimal encoding.
    pub select_optimal_encoding: Option<bool>,
    /// MTOM settings.
    pub mtom: Option<YamlMtom>,
    /// Addressing settings.
    pub addressing: Option<YamlAddressing>,
    /// Start asynchronous requests inline.
    pub sync_start_for_async: bool,
    /// Databinding mode.
    pub databinding: Option<String>,
}

/// MTOM settings.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct YamlMtom {
    /// Whether MTOM is enabled.
    pub enabled: bool,
    /// Optimization threshold in bytes.
    #[serde(default)]
    pub threshold: Option<usize>,
}

/// Addressing settings.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct YamlAddressing {
    /// Whether addressing is enabled.
    pub enabled: bool,
    /// Whether `wsa:Action` is mandatory.
    #[serde(default)]
    pub required: bool,
}

impl YamlFeatures {
    /// Convert to the runtime feature list.
    pub fn to_features(&self) -> Features {
        Features {
            fast_infoset: self.fast_infoset,
            select_optimal_encoding: self.select_optimal_encoding,
            mtom: self.mtom.map(|m| MtomFeature {
                enabled: m.enabled,
                threshold: m.threshold.unwrap_or(DEFAULT_MTOM_THRESHOLD),
            }),
            addressing: self.addressing.map(|a| AddressingFeature {
                enabled: a.enabled,
                required: a.required,
            }),
            sync_start_for_async: self.sync_start_for_async,
            databinding_mode: self.databinding.clone(),
        }
    }
}

impl RuntimeDocument {
    /// Load a runtime document from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Parse and validate a runtime document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let doc: RuntimeDocument = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))?;
        doc.validate()?;
        log::debug!(
            "[config] runtime document: {} tubelines, {} mappings, {} endpoints",
            doc.tubelines.len(),
            doc.mappings.len(),
            doc.endpoints.len()
        );
        Ok(doc)
    }

    fn validate(&self) -> Result<()> {
        for mapping in &self.mappings {
            if !self.tubelines.contains_key(&mapping.tubeline_ref) {
                return Err(Error::Config(format!(
                    "Mapping for '{}' references unknown tubeline '{}'",
                    mapping.endpoint_ref, mapping.tubeline_ref
                )));
            }
            mapping
                .endpoint_ref
                .parse::<QName>()
                .map_err(|e| Error::Config(format!("Invalid endpoint-ref: {}", e)))?;
        }
        for key in self.endpoints.keys() {
            key.parse::<QName>()
                .map_err(|e| Error::Config(format!("Invalid endpoint key: {}", e)))?;
        }
        Ok(())
    }

    /// Tube names for an endpoint: its mapping, else the `default` tubeline, else `None`.
    pub fn tubeline_for(&self, port: &QName) -> Option<&[String]> {
        let mapped = self
            .mappings
            .iter()
            .find(|m| m.endpoint_ref.parse::<QName>().ok().as_ref() == Some(port))
            .and_then(|m| self.tubelines.get(&m.tubeline_ref));

        mapped
            .or_else(|| self.tubelines.get(crate::config::DEFAULT_TUBELINE))
            .map(Vec::as_slice)
    }

    /// Features configured for an endpoint (empty when none).
    pub fn features_for(&self, port: &QName) -> Features {
        self.endpoints
            .iter()
            .find(|(key, _)| key.parse::<QName>().ok().as_ref() == Some(port))
            .map(|(_, f)| f.to_features())
            .unwrap_or_default()
    }
}
