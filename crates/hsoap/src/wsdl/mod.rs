// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WSDL 1.1 service descriptions.
//!
//! # Architecture
//!
//! ```text
//!   WSDL text ──► WsdlParser ──► add_*() ──► finalize_rpc_lit_binding() ──► freeze()
//!                   │   ▲                                                     │
//!   EntityResolver ─┘   └─ ExtensionFacade (first handled wins)               ▼
//!                                                               Arc<WsdlModel> (read-only)
//! ```
//!
//! Note: [`Message`] here is the abstract `wsdl:message`, not the SOAP
//! [`crate::Message`] that travels through the pipeline.

mod binding;
mod extension;
mod message;
mod model;
mod parser;
mod port_type;
mod service;

pub use binding::{BoundOperation, BoundPortType, Mode, ParameterBinding, Style};
pub use extension::{AddressingExtension, EndpointReferenceExtension, ExtensionFacade, ParserExtension};
pub use message::{Message, Part, PartDescriptor};
pub use model::WsdlModel;
pub use parser::{EntityResolver, FileResolver, MapResolver, ResolvedEntity, WsdlParser};
pub use port_type::{Operation, OperationFault, OperationMessage, PortType};
pub use service::{Port, Service};
