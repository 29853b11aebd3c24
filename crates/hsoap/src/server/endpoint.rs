// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server endpoint: construction, request processing and disposal.
//!
//! An [`Endpoint`] owns one master tubeline built at construction. Requests
//! never run on the master: the asynchronous path takes a clone from the
//! endpoint's pool for every request, the synchronous [`PipeHead`] keeps a
//! private clone and reuses it serially.
//!
//! # Example
//!
//! ```
//! use hsoap::server::{Binding, EndpointBuilder, InvocationContext};
//! use hsoap::{Message, Packet, QName, SoapVersion};
//!
//! let endpoint = EndpointBuilder::new(
//!     QName::new("urn:echo", "EchoService"),
//!     QName::new("urn:echo", "EchoPort"),
//!     Binding::new(SoapVersion::Soap11),
//! )
//! .invoker(|_cx: &InvocationContext<'_>, request: Message| Ok(Some(request)))
//! .build()
//! .unwrap();
//!
//! let request = Message::with_payload(SoapVersion::Soap11, "<echo xmlns=\"urn:echo\">hi</echo>").unwrap();
//! let response = endpoint.create_pipe_head().process(Packet::with_message(request), None, None);
//! assert_eq!(response.message.unwrap().payload_name().unwrap().local_part(), "echo");
//! endpoint.dispose();
//! ```

use super::binding::Binding;
use super::dispatch::OperationDispatcher;
use super::invoker::{AsyncInvoker, Invoker, InvokerKind, InvokerTube};
use super::lifecycle::Lifecycle;
use super::monitor::{EndpointStats, EndpointStatsSnapshot, MonitoringRegistry};
use super::transport::{BackChannel, ContextDelegate, TransportBackChannel, WebServiceContextDelegate};
use crate::codec::SoapBindingCodec;
#[cfg(feature = "config-loaders")]
use crate::config::loader::RuntimeDocument;
use crate::config::AddressingFeature;
use crate::databinding::{DatabindingRegistry, XmlBridge};
use crate::engine::{Completion, CompletionCallback, Engine, Executor, FiberContextSwitchInterceptor, FiberHandle};
use crate::error::{Error, Result};
use crate::message::fault::create_fault_message;
use crate::message::SoapVersion;
use crate::packet::{Packet, ThrowableContainer};
use crate::pipe::{AssemblyContext, Pool, PoolCell, PoolStats, Pooled, TubelineAssembler, Tubeline};
use crate::qname::QName;
use crate::wsdl::{PartDescriptor, WsdlModel};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// EndpointInfo
// ============================================================================

/// Identity of an endpoint, shared with every packet it processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    id: u64,
    service_name: QName,
    port_name: QName,
    binding_name: Option<QName>,
    address: Option<String>,
    soap_version: SoapVersion,
}

impl EndpointInfo {
    /// Process-unique endpoint id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn service_name(&self) -> &QName {
        &self.service_name
    }

    pub fn port_name(&self) -> &QName {
        &self.port_name
    }

    /// WSDL binding, when the endpoint was built from a model.
    pub fn binding_name(&self) -> Option<&QName> {
        self.binding_name.as_ref()
    }

    /// `soap:address location` of the WSDL port.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn soap_version(&self) -> SoapVersion {
        self.soap_version
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles an [`Endpoint`].
///
/// Construction fails for an unknown WSDL port, required WSDL extensions
/// nobody understood, unknown tube names, a missing invoker or an
/// unresolvable databinding.
pub struct EndpointBuilder {
    service: QName,
    port: QName,
    binding: Binding,
    model: Option<Arc<WsdlModel>>,
    invoker: Option<InvokerKind>,
    assembler: TubelineAssembler,
    databinding: DatabindingRegistry,
    engine: Option<Engine>,
    monitoring: Option<Arc<MonitoringRegistry>>,
    #[cfg(feature = "config-loaders")]
    document: Option<Arc<RuntimeDocument>>,
}

impl EndpointBuilder {
    pub fn new(service: QName, port: QName, binding: Binding) -> Self {
        Self {
            service,
            port,
            binding,
            model: None,
            invoker: None,
            assembler: TubelineAssembler::default(),
            databinding: DatabindingRegistry::with_defaults(),
            engine: None,
            monitoring: None,
            #[cfg(feature = "config-loaders")]
            document: None,
        }
    }

    /// Bind to a port of a frozen WSDL model.
    #[must_use]
    pub fn wsdl(mut self, model: Arc<WsdlModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Synchronous implementation.
    #[must_use]
    pub fn invoker(mut self, invoker: impl Invoker + 'static) -> Self {
        self.invoker = Some(InvokerKind::Sync(Arc::new(invoker)));
        self
    }

    /// Asynchronous implementation.
    #[must_use]
    pub fn async_invoker(mut self, invoker: impl AsyncInvoker + 'static) -> Self {
        self.invoker = Some(InvokerKind::Async(Arc::new(invoker)));
        self
    }

    /// Custom stage list or tube registry.
    #[must_use]
    pub fn assembler(mut self, assembler: TubelineAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Databinding providers.
    #[must_use]
    pub fn databinding(mut self, registry: DatabindingRegistry) -> Self {
        self.databinding = registry;
        self
    }

    /// Share an engine (and its executor) between endpoints.
    #[must_use]
    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Registry to export counters to (default: [`MonitoringRegistry::global`]).
    #[must_use]
    pub fn monitoring(mut self, registry: Arc<MonitoringRegistry>) -> Self {
        self.monitoring = Some(registry);
        self
    }

    /// Take tubeline and feature defaults for this port from a runtime document.
    #[cfg(feature = "config-loaders")]
    #[must_use]
    pub fn runtime_document(mut self, document: Arc<RuntimeDocument>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn build(self) -> Result<Endpoint> {
        let EndpointBuilder {
            service,
            port,
            mut binding,
            model,
            invoker,
            assembler,
            databinding,
            engine,
            monitoring,
            #[cfg(feature = "config-loaders")]
            document,
        } = self;

        #[cfg(feature = "config-loaders")]
        let assembler = match &document {
            Some(doc) => {
                let defaults = doc.features_for(&port);
                *binding.features_mut() = defaults.merged_with(binding.features());
                assembler.with_document(doc, &port)
            }
            None => assembler,
        };

        let invoker = invoker.ok_or_else(|| Error::Config(format!("endpoint {} has no invoker", port)))?;

        let mut address = None;
        let mut binding_name = None;
        let mut wsdl_headers = Vec::new();
        let dispatcher = match &model {
            Some(model) => {
                let wsdl_port = model.port(&service, &port).ok_or_else(|| Error::UnresolvedReference {
                    kind: "port",
                    name: port.clone(),
                })?;
                model.validate_extensions(&service, &port)?;
                let bound = model
                    .binding(wsdl_port.binding_name())
                    .ok_or_else(|| Error::UnresolvedReference {
                        kind: "binding",
                        name: wsdl_port.binding_name().clone(),
                    })?;

                if let Some(version) = bound.soap_version() {
                    if version != binding.soap_version() {
                        log::warn!(
                            "[endpoint] {} binding declares {} but the endpoint uses {}",
                            port,
                            version,
                            binding.soap_version()
                        );
                    }
                }
                if binding.features().addressing.is_none() {
                    if let Some(required) = wsdl_port.addressing().or_else(|| bound.addressing()) {
                        binding.features_mut().addressing = Some(AddressingFeature {
                            enabled: true,
                            required,
                        });
                    }
                }

                for bop in bound.operations() {
                    let Some(message) = bop.input_message().and_then(|m| model.message(m)) else {
                        continue;
                    };
                    for part in message.parts() {
                        if !bop.input_binding(part.name()).is_header() {
                            continue;
                        }
                        if let Some(PartDescriptor::Element(element)) = part.descriptor() {
                            if !wsdl_headers.contains(element) {
                                wsdl_headers.push(element.clone());
                            }
                        }
                    }
                }

                address = wsdl_port.address().map(str::to_string);
                binding_name = Some(bound.name().clone());
                OperationDispatcher::from_model(model, bound)
            }
            None => OperationDispatcher::empty(),
        };

        let bridge: Arc<dyn XmlBridge> = databinding.create(binding.features().databinding_mode.as_deref())?;

        let info = Arc::new(EndpointInfo {
            id: NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed),
            service_name: service,
            port_name: port,
            binding_name,
            address,
            soap_version: binding.soap_version(),
        });

        let mut understood = binding.understood_headers();
        understood.extend(wsdl_headers);
        let cx = AssemblyContext {
            endpoint: &info,
            binding: &binding,
            understood_headers: &understood,
        };
        let terminal = InvokerTube::new(invoker, Arc::new(dispatcher), Arc::clone(&info), bridge);
        let master = Arc::new(Mutex::new(assembler.assemble(&cx, Box::new(terminal))?));
        let pool = Arc::new(PoolCell::new(tubeline_pool(&master)));

        let engine = engine.unwrap_or_else(|| Engine::new(format!("hsoap-{}", info.port_name.local_part())));
        let monitoring = monitoring.unwrap_or_else(MonitoringRegistry::global);
        let monitor_key = format!("{}:{}#{}", info.service_name, info.port_name.local_part(), info.id);
        let stats = monitoring.register(monitor_key.clone());

        let lifecycle = Lifecycle::new();
        {
            let key = monitor_key.clone();
            lifecycle.on_dispose("monitoring", move || {
                monitoring.unregister(&key);
            });
        }
        {
            let binding = binding.clone();
            lifecycle.on_dispose("handlers", move || binding.pre_destroy_handlers());
        }
        {
            let master = Arc::clone(&master);
            lifecycle.on_dispose("tubeline", move || master.lock().pre_destroy());
        }

        log::info!(
            "[endpoint] {} ready ({}, {} stages)",
            info.port_name,
            info.soap_version,
            master.lock().len()
        );
        Ok(Endpoint {
            inner: Arc::new(EndpointInner {
                info,
                binding,
                model,
                master,
                pool,
                engine,
                lifecycle,
                stats,
                monitor_key,
            }),
        })
    }
}

fn tubeline_pool(master: &Arc<Mutex<Tubeline>>) -> Pool<Tubeline> {
    let master = Arc::clone(master);
    Pool::new(move || master.lock().copy())
}

// ============================================================================
// Endpoint
// ============================================================================

struct EndpointInner {
    info: Arc<EndpointInfo>,
    binding: Binding,
    model: Option<Arc<WsdlModel>>,
    master: Arc<Mutex<Tubeline>>,
    pool: Arc<PoolCell<Tubeline>>,
    engine: Engine,
    lifecycle: Lifecycle,
    stats: Arc<EndpointStats>,
    monitor_key: String,
}

/// A running endpoint. Cheap to clone.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

impl Endpoint {
    pub fn info(&self) -> &Arc<EndpointInfo> {
        &self.inner.info
    }

    pub fn binding(&self) -> &Binding {
        &self.inner.binding
    }

    /// WSDL model the endpoint was built from.
    pub fn wsdl_model(&self) -> Option<&Arc<WsdlModel>> {
        self.inner.model.as_ref()
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    /// Replace the executor running asynchronous fibers.
    pub fn set_executor(&self, executor: Arc<dyn Executor>) {
        self.inner.engine.set_executor(executor);
    }

    /// New codec negotiator configured like this endpoint.
    pub fn create_codec(&self) -> SoapBindingCodec {
        self.inner.binding.create_codec()
    }

    /// Stage names of the master tubeline.
    pub fn tube_names(&self) -> Vec<String> {
        self.inner
            .master
            .lock()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Counters of the tubeline pool currently in use.
    pub fn pool_stats(&self) -> PoolStats {
        self.inner.pool.pool().stats()
    }

    /// Drop every pooled clone; later requests clone the master again.
    pub fn reset_pool(&self) {
        self.inner.pool.replace(tubeline_pool(&self.inner.master));
    }

    /// Key under which the endpoint's counters are registered.
    pub fn monitor_key(&self) -> &str {
        &self.inner.monitor_key
    }

    pub fn stats(&self) -> EndpointStatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lifecycle.is_disposed()
    }

    /// Process `request` asynchronously.
    ///
    /// The first run segment executes on the calling thread. `callback`
    /// receives one [`Completion::Response`]; failures arrive as fault
    /// responses.
    pub fn process(
        &self,
        request: Packet,
        callback: impl CompletionCallback + 'static,
        interceptor: Option<Arc<dyn FiberContextSwitchInterceptor>>,
    ) -> Result<FiberHandle> {
        self.process_async(request, Box::new(callback), interceptor, false)
    }

    /// Like [`process`](Self::process) but always handed to the executor,
    /// unless `sync_start_for_async` is enabled.
    pub fn schedule(
        &self,
        request: Packet,
        callback: impl CompletionCallback + 'static,
        interceptor: Option<Arc<dyn FiberContextSwitchInterceptor>>,
    ) -> Result<FiberHandle> {
        self.process_async(request, Box::new(callback), interceptor, true)
    }

    fn process_async(
        &self,
        mut request: Packet,
        callback: Box<dyn CompletionCallback>,
        interceptor: Option<Arc<dyn FiberContextSwitchInterceptor>>,
        schedule: bool,
    ) -> Result<FiberHandle> {
        self.inner.lifecycle.ensure_active()?;
        request.endpoint = Some(Arc::clone(&self.inner.info));

        let pooled = self.inner.pool.take();
        let pool_id = pooled.pool_id();
        let mut fiber = self.inner.engine.create_fiber(pooled.into_inner());
        fiber.set_deliver_error_in_packet(true);
        if let Some(interceptor) = interceptor {
            fiber.add_interceptor(interceptor);
        }
        let pool = Arc::clone(&self.inner.pool);
        fiber.on_release(move |tubeline, failed| {
            let item = Pooled::from_parts(tubeline, pool_id);
            // A failed run may leave tube state behind.
            if failed {
                pool.discard(item);
            } else {
                pool.recycle(item);
            }
        });

        self.inner.stats.request_started();
        let endpoint = self.clone();
        let done = move |completion: Completion| {
            let response = match completion {
                Completion::Response(p) if p.has_throwable() => endpoint.create_service_response_for_exception(p),
                Completion::Response(p) => p,
                // Not produced in deliver-error-in-packet mode.
                Completion::Failure(e) => endpoint.fault_response(Packet::new(), &e),
            };
            endpoint.record(&response);
            callback.on_completion(Completion::Response(response));
        };

        let run_synchronously = !schedule || self.inner.binding.features().sync_start_for_async;
        log::trace!(
            "[endpoint] {} fiber #{} (sync start: {})",
            self.inner.info.port_name,
            fiber.id(),
            run_synchronously
        );
        Ok(fiber.start(request, done, run_synchronously))
    }

    /// Turn the error carried by `response` into a fault response.
    ///
    /// Creates the fault once; a response whose fault was already created
    /// (or that carries no error) is returned unchanged.
    pub fn create_service_response_for_exception(&self, mut response: Packet) -> Packet {
        let Some(mut container) = response.take_satellite::<ThrowableContainer>() else {
            return response;
        };
        let Some(error) = container.take_for_fault() else {
            response.set_satellite(container);
            return response;
        };
        let mut result = self.fault_response(response, &error);
        result.set_satellite(container);
        result
    }

    fn fault_response(&self, base: Packet, error: &Error) -> Packet {
        log::debug!("[endpoint] {} fault: {}", self.inner.info.port_name, error);
        let fault = create_fault_message(self.inner.info.soap_version, error);
        let mut result = base.create_server_response(Some(fault));
        if result.endpoint.is_none() {
            result.endpoint = Some(Arc::clone(&self.inner.info));
        }
        result
    }

    fn record(&self, response: &Packet) {
        let fault = response.message.as_ref().is_some_and(|m| m.is_fault());
        self.inner.stats.request_finished(fault, response.message.is_some());
    }

    /// Synchronous entry point with a private tubeline clone.
    pub fn create_pipe_head(&self) -> PipeHead {
        PipeHead {
            endpoint: self.clone(),
            tubeline: Some(self.inner.master.lock().copy()),
        }
    }

    /// Release the endpoint.
    ///
    /// The first call runs pre-destroy on the master tubeline, the handler
    /// chain and unregisters from monitoring; returns `false` afterwards.
    pub fn dispose(&self) -> bool {
        let first = self.inner.lifecycle.dispose();
        if first {
            log::info!("[endpoint] {} disposed", self.inner.info.port_name);
        }
        first
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("info", &self.inner.info)
            .field("binding", &self.inner.binding)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ============================================================================
// PipeHead
// ============================================================================

/// Synchronous request processor for a transport thread.
///
/// Not shared between threads; the clone is reused for every request and
/// replaced by a fresh one after a failure.
pub struct PipeHead {
    endpoint: Endpoint,
    tubeline: Option<Tubeline>,
}

impl PipeHead {
    /// Run `request` to completion; failures become fault responses.
    pub fn process(
        &mut self,
        mut request: Packet,
        context_delegate: Option<Arc<dyn WebServiceContextDelegate>>,
        back_channel: Option<Box<dyn TransportBackChannel>>,
    ) -> Packet {
        let endpoint = &self.endpoint;
        if let Err(e) = endpoint.inner.lifecycle.ensure_active() {
            return endpoint.fault_response(request, &e);
        }
        request.endpoint = Some(Arc::clone(&endpoint.inner.info));
        if let Some(delegate) = context_delegate {
            request.set_satellite(ContextDelegate(delegate));
        }
        if let Some(channel) = back_channel {
            request.set_satellite(BackChannel(channel));
        }

        let tubeline = match self.tubeline.take() {
            Some(line) => line,
            None => {
                log::debug!("[pipe-head] {} re-cloning tubeline", endpoint.inner.info.port_name);
                endpoint.inner.master.lock().copy()
            }
        };
        let mut fiber = endpoint.inner.engine.create_fiber(tubeline);
        let skeleton = request.create_server_response(None);
        endpoint.inner.stats.request_started();

        let response = match fiber.run_sync(request) {
            Ok(response) if !response.has_throwable() => {
                self.tubeline = Some(fiber.into_tubeline());
                response
            }
            Ok(response) => endpoint.create_service_response_for_exception(response),
            Err(e) => endpoint.fault_response(skeleton, &e),
        };
        endpoint.record(&response);
        response
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl std::fmt::Debug for PipeHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeHead")
            .field("endpoint", &self.endpoint.inner.info.port_name)
            .field("tubeline", &self.tubeline.as_ref().map(Tubeline::instance_id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::server::InvocationContext;

    fn echo_endpoint(monitoring: Arc<MonitoringRegistry>) -> Endpoint {
        EndpointBuilder::new(
            QName::new("urn:echo", "EchoService"),
            QName::new("urn:echo", "EchoPort"),
            Binding::new(SoapVersion::Soap11),
        )
        .invoker(|_cx: &InvocationContext<'_>, request: Message| Ok(Some(request)))
        .monitoring(monitoring)
        .build()
        .unwrap()
    }

    #[test]
    fn test_missing_invoker_is_fatal() {
        let result = EndpointBuilder::new(
            QName::local("S"),
            QName::local("P"),
            Binding::new(SoapVersion::Soap11),
        )
        .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_tube_is_fatal() {
        let result = EndpointBuilder::new(
            QName::local("S"),
            QName::local("P"),
            Binding::new(SoapVersion::Soap11),
        )
        .invoker(|_cx: &InvocationContext<'_>, _m: Message| Ok(None))
        .assembler(TubelineAssembler::default().with_tubes(["must-understand", "security"]))
        .build();
        assert!(matches!(result, Err(Error::UnknownTube(name)) if name == "security"));
    }

    #[test]
    fn test_default_stages_skip_disabled_tubes() {
        let endpoint = echo_endpoint(Arc::new(MonitoringRegistry::new()));
        assert_eq!(endpoint.tube_names(), vec!["must-understand", "invoker"]);
        assert!(endpoint.info().address().is_none());
    }

    #[test]
    fn test_dispose_unregisters_once() {
        let registry = Arc::new(MonitoringRegistry::new());
        let endpoint = echo_endpoint(Arc::clone(&registry));
        assert!(registry.get(endpoint.monitor_key()).is_some());

        assert!(endpoint.dispose());
        assert!(!endpoint.dispose());
        assert!(registry.is_empty());
        assert!(endpoint.is_disposed());
        assert!(matches!(
            endpoint.process(Packet::new(), |_c: Completion| {}, None),
            Err(Error::Disposed)
        ));
    }

    #[test]
    fn test_service_response_for_exception_once() {
        let endpoint = echo_endpoint(Arc::new(MonitoringRegistry::new()));
        let mut packet = Packet::new();
        packet.set_satellite(ThrowableContainer::new(Error::Invocation("boom".into())));

        let first = endpoint.create_service_response_for_exception(packet);
        assert!(first.message.as_ref().is_some_and(Message::is_fault));
        assert!(first
            .satellite::<ThrowableContainer>()
            .is_some_and(ThrowableContainer::is_fault_created));

        let mut second = first.create_server_response(None);
        second.set_satellite(ThrowableContainer::new(Error::Invocation("ignored".into())));
        if let Some(tc) = second.satellite_mut::<ThrowableContainer>() {
            tc.take_for_fault();
        }
        let second = endpoint.create_service_response_for_exception(second);
        assert!(second.message.is_none());
    }
}
