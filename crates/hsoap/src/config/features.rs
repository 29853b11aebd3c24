// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-binding feature list.
//!
//! A feature that is `None` was never configured, which is different from a
//! feature that was configured and disabled: the codec negotiator relies on
//! that distinction (an unconfigured Fast Infoset feature keeps content
//! negotiation alive, an explicitly disabled one turns it off).

use crate::config::DEFAULT_MTOM_THRESHOLD;

/// MTOM feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtomFeature {
    /// Whether MTOM encoding is enabled.
    pub enabled: bool,
    /// Attachments smaller than this are inlined (bytes).
    pub threshold: usize,
}

impl MtomFeature {
    /// Enabled MTOM with the default threshold.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_MTOM_THRESHOLD,
        }
    }

    /// Disabled MTOM.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_MTOM_THRESHOLD,
        }
    }
}

/// WS-Addressing feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressingFeature {
    /// Whether addressing headers are processed.
    pub enabled: bool,
    /// Whether requests without `wsa:Action` are rejected.
    pub required: bool,
}

/// Features configured on a binding.
///
/// # Example
///
/// ```rust
/// use hsoap::config::Features;
///
/// let features = Features::new().fast_infoset(false).mtom(true);
/// assert_eq!(features.fast_infoset, Some(false));
/// assert!(features.is_mtom_enabled());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features {
    /// Fast Infoset feature (`Some(false)` = explicitly disabled by the service).
    pub fast_infoset: Option<bool>,
    /// Client "select optimal encoding" feature; when present, the packet
    /// content negotiation property is ignored.
    pub select_optimal_encoding: Option<bool>,
    /// MTOM feature.
    pub mtom: Option<MtomFeature>,
    /// WS-Addressing feature.
    pub addressing: Option<AddressingFeature>,
    /// Run asynchronous requests inline on the calling thread until the first suspension.
    pub sync_start_for_async: bool,
    /// Databinding mode resolved against the databinding registry.
    pub databinding_mode: Option<String>,
}

impl Features {
    /// Empty feature list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the Fast Infoset feature.
    #[must_use]
    pub fn fast_infoset(mut self, enabled: bool) -> Self {
        self.fast_infoset = Some(enabled);
        self
    }

    /// Configure the select-optimal-encoding feature.
    #[must_use]
    pub fn select_optimal_encoding(mut self, enabled: bool) -> Self {
        self.select_optimal_encoding = Some(enabled);
        self
    }

    /// Configure MTOM with the default threshold.
    #[must_use]
    pub fn mtom(mut self, enabled: bool) -> Self {
        self.mtom = Some(if enabled {
            MtomFeature::enabled()
        } else {
            MtomFeature::disabled()
        });
        self
    }

    /// Configure MTOM with an explicit threshold.
    #[must_use]
    pub fn mtom_threshold(mut self, threshold: usize) -> Self {
        self.mtom = Some(MtomFeature {
            enabled: true,
            threshold,
        });
        self
    }

    /// Configure WS-Addressing.
    #[must_use]
    pub fn addressing(mut self, enabled: bool, required: bool) -> Self {
        self.addressing = Some(AddressingFeature { enabled, required });
        self
    }

    /// Start asynchronous requests on the calling thread.
    #[must_use]
    pub fn sync_start_for_async(mut self, enabled: bool) -> Self {
        self.sync_start_for_async = enabled;
        self
    }

    /// Select a databinding mode.
    #[must_use]
    pub fn databinding_mode(mut self, mode: impl Into<String>) -> Self {
        self.databinding_mode = Some(mode.into());
        self
    }

    /// Whether MTOM is configured and enabled.
    #[inline]
    pub fn is_mtom_enabled(&self) -> bool {
        self.mtom.map(|m| m.enabled).unwrap_or(false)
    }

    /// Whether addressing is configured and enabled.
    #[inline]
    pub fn is_addressing_enabled(&self) -> bool {
        self.addressing.map(|a| a.enabled).unwrap_or(false)
    }

    /// Overlay `other` on top of `self`: configured values in `other` win.
    #[must_use]
    pub fn merged_with(mut self, other: &Features) -> Self {
        if other.fast_infoset.is_some() {
            self.fast_infoset = other.fast_infoset;
        }
        if other.select_optimal_encoding.is_some() {
            self.select_optimal_encoding = other.select_optimal_encoding;
        }
        if other.mtom.is_some() {
            self.mtom = other.mtom;
        }
        if other.addressing.is_some() {
            self.addressing = other.addressing;
        }
        if other.sync_start_for_async {
            self.sync_start_for_async = true;
        }
        if other.databinding_mode.is_some() {
            self.databinding_mode.clone_from(&other.databinding_mode);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_is_not_disabled() {
        let features = Features::new();
        assert_eq!(features.fast_infoset, None);
        assert!(!features.is_mtom_enabled());

        let disabled = Features::new().fast_infoset(false);
        assert_eq!(disabled.fast_infoset, Some(false));
    }

    #[test]
    fn test_merge_prefers_configured_values() {
        let base = Features::new().fast_infoset(true).mtom(false);
        let overlay = Features::new().mtom_threshold(512).sync_start_for_async(true);

        let merged = base.merged_with(&overlay);
        assert_eq!(merged.fast_infoset, Some(true));
        assert_eq!(merged.mtom.map(|m| m.threshold), Some(512));
        assert!(merged.is_mtom_enabled());
        assert!(merged.sync_start_for_async);
    }
}
