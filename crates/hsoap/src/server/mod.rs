// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server side: endpoints, dispatch, invokers and the transport adapter.
//!
//! An endpoint is composed of small capabilities rather than one large
//! object:
//!
//! - [`Binding`]: SOAP version, features, handler chain
//! - [`OperationDispatcher`]: request to WSDL operation
//! - [`Lifecycle`]: disposed flag and shutdown hooks
//! - [`MonitoringRegistry`]: exported request counters

mod adapter;
mod binding;
mod dispatch;
mod endpoint;
mod invoker;
mod lifecycle;
mod monitor;
mod transport;

pub use adapter::{
    Adapter, Toolkit, TransportRequest, TransportResponse, STATUS_ACCEPTED, STATUS_BAD_REQUEST,
    STATUS_INTERNAL_ERROR, STATUS_OK, STATUS_UNSUPPORTED_MEDIA_TYPE,
};
pub use binding::Binding;
pub use dispatch::{DispatchedOperation, OperationDispatcher};
pub use endpoint::{Endpoint, EndpointBuilder, EndpointInfo, PipeHead};
pub use invoker::{AsyncInvoker, InvocationContext, Invoker, Responder};
pub use lifecycle::Lifecycle;
pub use monitor::{EndpointStats, EndpointStatsSnapshot, MonitoringRegistry};
pub use transport::{BackChannel, ContextDelegate, TransportBackChannel, WebServiceContextDelegate};
