// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service implementation interface and the terminal tube calling it.

use super::dispatch::{DispatchedOperation, OperationDispatcher};
use super::endpoint::EndpointInfo;
use super::transport::{BackChannel, ContextDelegate};
use crate::databinding::XmlBridge;
use crate::engine::{FiberContext, FiberHandle};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::packet::Packet;
use crate::pipe::{NextAction, SuspendMode, Tube};
use std::sync::Arc;

/// Everything an implementation may look at while serving one request.
///
/// Borrowed from the in-flight request; nothing is stored per thread.
pub struct InvocationContext<'a> {
    /// Request packet (its message has been handed to the invoker).
    pub packet: &'a Packet,
    /// Endpoint serving the request.
    pub endpoint: &'a EndpointInfo,
    /// Operation resolved from the WSDL, if the endpoint has one.
    pub operation: Option<&'a DispatchedOperation>,
    /// Databinding of the endpoint.
    pub databinding: &'a dyn XmlBridge,
}

impl InvocationContext<'_> {
    /// Local name of the resolved operation.
    pub fn operation_name(&self) -> Option<&str> {
        self.operation.map(|op| op.name.local_part())
    }

    /// Caller identity reported by the transport.
    pub fn user_principal(&self) -> Option<String> {
        self.packet
            .satellite::<ContextDelegate>()
            .and_then(|d| d.0.user_principal())
    }

    /// Role check delegated to the transport.
    pub fn is_user_in_role(&self, role: &str) -> bool {
        self.packet
            .satellite::<ContextDelegate>()
            .is_some_and(|d| d.0.is_user_in_role(role))
    }
}

/// Synchronous service implementation.
///
/// `Ok(None)` answers without a message (one-way).
pub trait Invoker: Send + Sync {
    fn invoke(&self, cx: &InvocationContext<'_>, request: Message) -> Result<Option<Message>>;
}

impl<F> Invoker for F
where
    F: Fn(&InvocationContext<'_>, Message) -> Result<Option<Message>> + Send + Sync,
{
    fn invoke(&self, cx: &InvocationContext<'_>, request: Message) -> Result<Option<Message>> {
        self(cx, request)
    }
}

/// Completes a request served by an [`AsyncInvoker`].
///
/// Sending resumes the suspended fiber with the response (or the error).
/// Dropping it unsent fails the request with [`Error::Invocation`], so the
/// fiber completes even when the worker holding it panics.
pub struct Responder {
    handle: Option<FiberHandle>,
    response: Packet,
}

impl Responder {
    fn new(handle: FiberHandle, response: Packet) -> Self {
        Self {
            handle: Some(handle),
            response,
        }
    }

    /// Fiber waiting for this response.
    pub fn fiber_id(&self) -> u64 {
        self.handle.as_ref().map_or(0, FiberHandle::id)
    }

    /// Answer with `message` (`None` for no message).
    pub fn respond(mut self, message: Option<Message>) -> Result<()> {
        let mut response = std::mem::take(&mut self.response);
        response.message = message;
        match self.handle.take() {
            Some(handle) => handle.resume(response),
            None => Err(Error::InvalidFiberState("response already sent")),
        }
    }

    /// Fail the request.
    pub fn fail(mut self, error: Error) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.resume_with_error(error),
            None => Err(Error::InvalidFiberState("response already sent")),
        }
    }

    /// [`respond`](Self::respond) or [`fail`](Self::fail) depending on `result`.
    pub fn send(self, result: Result<Option<Message>>) -> Result<()> {
        match result {
            Ok(message) => self.respond(message),
            Err(e) => self.fail(e),
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        log::warn!("[invoker] responder for fiber #{} dropped unsent", handle.id());
        if let Err(e) =
            handle.resume_with_error(Error::Invocation("responder dropped without a response".into()))
        {
            log::debug!("[invoker] fiber #{} not failed: {}", handle.id(), e);
        }
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder").field("fiber", &self.fiber_id()).finish()
    }
}

/// Implementation answering later, from any thread, through a [`Responder`].
pub trait AsyncInvoker: Send + Sync {
    fn invoke_async(&self, cx: &InvocationContext<'_>, request: Message, responder: Responder);
}

impl<F> AsyncInvoker for F
where
    F: Fn(&InvocationContext<'_>, Message, Responder) + Send + Sync,
{
    fn invoke_async(&self, cx: &InvocationContext<'_>, request: Message, responder: Responder) {
        self(cx, request, responder)
    }
}

#[derive(Clone)]
pub(crate) enum InvokerKind {
    Sync(Arc<dyn Invoker>),
    Async(Arc<dyn AsyncInvoker>),
}

/// Terminal tube: dispatches the request and calls the implementation.
#[derive(Clone)]
pub(crate) struct InvokerTube {
    invoker: InvokerKind,
    dispatcher: Arc<OperationDispatcher>,
    endpoint: Arc<EndpointInfo>,
    databinding: Arc<dyn XmlBridge>,
}

impl InvokerTube {
    pub(crate) fn new(
        invoker: InvokerKind,
        dispatcher: Arc<OperationDispatcher>,
        endpoint: Arc<EndpointInfo>,
        databinding: Arc<dyn XmlBridge>,
    ) -> Self {
        Self {
            invoker,
            dispatcher,
            endpoint,
            databinding,
        }
    }
}

impl Tube for InvokerTube {
    fn name(&self) -> &str {
        "invoker"
    }

    fn process_request(&mut self, mut packet: Packet, cx: &FiberContext) -> NextAction {
        let operation = match self.dispatcher.dispatch(&packet) {
            Ok(op) => op,
            Err(e) => return NextAction::Throw(e),
        };
        let Some(request) = packet.message.take() else {
            return NextAction::Throw(Error::Invocation("request packet without message".into()));
        };
        let one_way = operation.as_ref().is_some_and(|op| op.one_way);
        if one_way {
            if let Some(channel) = packet.take_satellite::<BackChannel>() {
                channel.close();
            }
        }
        let icx = InvocationContext {
            packet: &packet,
            endpoint: &self.endpoint,
            operation: operation.as_deref(),
            databinding: self.databinding.as_ref(),
        };

        match &self.invoker {
            InvokerKind::Sync(invoker) => match invoker.invoke(&icx, request) {
                Ok(response) => {
                    let response = if one_way && response.is_some() {
                        log::debug!(
                            "[invoker] dropping response of one-way {}",
                            icx.operation_name().unwrap_or("?")
                        );
                        None
                    } else {
                        response
                    };
                    NextAction::Return(packet.create_server_response(response))
                }
                Err(e) => NextAction::Throw(e),
            },
            InvokerKind::Async(invoker) => {
                let responder = Responder::new(cx.handle(), packet.create_server_response(None));
                invoker.invoke_async(&icx, request, responder);
                NextAction::Suspend(SuspendMode::Response)
            }
        }
    }

    fn copy(&self) -> Box<dyn Tube> {
        Box::new(self.clone())
    }
}
