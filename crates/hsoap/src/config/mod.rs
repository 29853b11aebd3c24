// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hsoap Global Configuration - Single Source of Truth
//!
//! Namespaces, MIME types and runtime defaults live here.
//! **NEVER hardcode them elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: protocol constants (WSDL/SOAP namespaces, MIME types)
//! - **Level 2 (Per binding)**: [`Features`] (Fast Infoset, MTOM, addressing, ...)
//! - **Level 3 (Documents)**: [`loader::RuntimeDocument`] YAML files declaring
//!   tubelines, endpoint mappings and per-endpoint features

mod features;
#[cfg(feature = "config-loaders")]
pub mod loader;

pub use features::{AddressingFeature, Features, MtomFeature};

// =======================================================================
// WSDL 1.1 namespaces
// =======================================================================

/// WSDL 1.1 definitions namespace.
pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";

/// WSDL 1.1 SOAP 1.1 binding extension namespace.
pub const WSDL_SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";

/// WSDL 1.1 SOAP 1.2 binding extension namespace.
pub const WSDL_SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// WSDL 1.1 MIME binding extension namespace.
pub const WSDL_MIME_NS: &str = "http://schemas.xmlsoap.org/wsdl/mime/";

/// SOAP over HTTP transport URI (`soap:binding transport="..."`).
pub const SOAP_HTTP_TRANSPORT: &str = "http://schemas.xmlsoap.org/soap/http";

// =======================================================================
// SOAP envelope namespaces
// =======================================================================

/// SOAP 1.1 envelope namespace.
pub const SOAP11_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.2 envelope namespace.
pub const SOAP12_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// XOP include namespace (MTOM).
pub const XOP_NS: &str = "http://www.w3.org/2004/08/xop/include";

// =======================================================================
// WS-Addressing
// =======================================================================

/// WS-Addressing 1.0 namespace.
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";

/// WS-Addressing WSDL binding namespace (`wsaw:UsingAddressing`).
pub const WSAW_NS: &str = "http://www.w3.org/2006/05/addressing/wsdl";

/// WS-Addressing metadata namespace (`wsam:Addressing`).
pub const WSAM_NS: &str = "http://www.w3.org/2007/05/addressing/metadata";

/// Anonymous reply address.
pub const WSA_ANONYMOUS: &str = "http://www.w3.org/2005/08/addressing/anonymous";

// =======================================================================
// MIME types (case-insensitive prefix matching)
// =======================================================================

/// SOAP 1.1 XML content type.
pub const MIME_TEXT_XML: &str = "text/xml";

/// SOAP 1.2 XML content type.
pub const MIME_SOAP12_XML: &str = "application/soap+xml";

/// SOAP 1.1 Fast Infoset content type.
pub const MIME_FASTINFOSET: &str = "application/fastinfoset";

/// SOAP 1.2 Fast Infoset content type.
pub const MIME_SOAP12_FASTINFOSET: &str = "application/soap+fastinfoset";

/// MIME multipart container used by MTOM and SwA.
pub const MIME_MULTIPART_RELATED: &str = "multipart/related";

/// Root part type of an MTOM package.
pub const MIME_XOP_XML: &str = "application/xop+xml";

/// Default type of a binary attachment.
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Default character encoding for XML payloads.
pub const DEFAULT_ENCODING: &str = "utf-8";

// =======================================================================
// Runtime defaults
// =======================================================================

/// Worker threads of the default fiber executor.
pub const DEFAULT_EXECUTOR_THREADS: usize = 4;

/// Capacity of the default executor task queue.
pub const DEFAULT_EXECUTOR_QUEUE: usize = 1024;

/// MTOM threshold (bytes) below which attachments are still sent optimized.
pub const DEFAULT_MTOM_THRESHOLD: usize = 0;

/// Databinding mode used when no mode is configured and the registry has the built-in factory.
pub const DEFAULT_DATABINDING_MODE: &str = "raw-xml";

/// Name of the default tubeline in runtime documents.
pub const DEFAULT_TUBELINE: &str = "default";

/// Tube factories assembled when no tubeline mapping applies (terminal invoker appended).
pub const DEFAULT_TUBES: &[&str] = &["must-understand", "addressing", "handlers"];
