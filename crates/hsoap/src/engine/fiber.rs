// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fibers: user-level threads that drive one packet through one tubeline.
//!
//! # State machine
//!
//! ```text
//! Created ──► Running ──► Completed
//!               │  ▲
//!      Suspend  ▼  │ resume()
//!             Suspended
//! ```
//!
//! The fiber keeps a continuation stack of tube indices: `Invoke` pushes the
//! current tube, response and exception processing pop it. A tube panic is
//! caught and turned into exception processing with [`Error::TubePanicked`].
//!
//! `resume()` may race ahead of the suspension: the value is latched and
//! consumed when the fiber reaches its suspension point.

use super::Engine;
use crate::error::{Error, Result};
use crate::packet::{Packet, ThrowableContainer};
use crate::pipe::{NextAction, SuspendMode, Tube, Tubeline};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Lifecycle state of a fiber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    /// Not started.
    Created,
    /// Executing tubes on some thread.
    Running,
    /// Parked until resumed.
    Suspended,
    /// Finished; the completion has been delivered.
    Completed,
}

/// Terminal outcome of an asynchronous fiber.
#[derive(Debug)]
pub enum Completion {
    /// Response packet (may carry a [`ThrowableContainer`] satellite).
    Response(Packet),
    /// Processing failed.
    Failure(Error),
}

impl Completion {
    /// Whether this is a failure, either direct or carried in the packet.
    pub fn is_failure(&self) -> bool {
        match self {
            Completion::Response(p) => p.has_throwable(),
            Completion::Failure(_) => true,
        }
    }

    /// Convert to a `Result`, ignoring any throwable satellite.
    pub fn into_result(self) -> Result<Packet> {
        match self {
            Completion::Response(p) => Ok(p),
            Completion::Failure(e) => Err(e),
        }
    }
}

/// Receives the completion of an asynchronous fiber (exactly once).
pub trait CompletionCallback: Send {
    fn on_completion(self: Box<Self>, completion: Completion);
}

impl<F> CompletionCallback for F
where
    F: FnOnce(Completion) + Send,
{
    fn on_completion(self: Box<Self>, completion: Completion) {
        (*self)(completion)
    }
}

/// Wraps every run segment of a fiber on a thread (start and each resume).
///
/// Implementations must call `work` exactly once.
pub trait FiberContextSwitchInterceptor: Send + Sync {
    fn execute(&self, fiber_id: u64, work: &mut dyn FnMut());
}

impl<F> FiberContextSwitchInterceptor for F
where
    F: Fn(u64, &mut dyn FnMut()) + Send + Sync,
{
    fn execute(&self, fiber_id: u64, work: &mut dyn FnMut()) {
        self(fiber_id, work)
    }
}

/// Hook receiving the tubeline at completion; the flag is `true` after a failure.
pub type ReleaseHook = Box<dyn FnOnce(Tubeline, bool) + Send>;

// ============================================================================
// Shared state and handle
// ============================================================================

enum Resumed {
    Packet(Packet),
    Error(Error),
}

#[derive(Clone, Copy)]
enum Resumption {
    /// Continue response processing.
    Response,
    /// Invoke the tube at this index.
    Invoke(usize),
}

impl Resumption {
    fn step(self, value: Resumed) -> Step {
        match (self, value) {
            (_, Resumed::Error(e)) => Step::Exception(e),
            (Resumption::Response, Resumed::Packet(p)) => Step::Response(p),
            (Resumption::Invoke(index), Resumed::Packet(p)) => Step::Request(index, p),
        }
    }
}

struct Parked {
    fiber: Box<Fiber>,
    resumption: Resumption,
}

struct SharedState {
    status: FiberState,
    latched: Option<Resumed>,
    parked: Option<Parked>,
}

struct Shared {
    id: u64,
    state: Mutex<SharedState>,
    cond: Condvar,
}

/// Handle used to resume a suspended fiber from any thread.
#[derive(Clone)]
pub struct FiberHandle {
    shared: Arc<Shared>,
    engine: Engine,
}

impl FiberHandle {
    /// Fiber id.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Current state.
    pub fn state(&self) -> FiberState {
        self.shared.state.lock().status
    }

    /// Resume with a packet.
    ///
    /// Safe to call before the fiber has parked. Fails if the fiber already
    /// completed or a resume is already pending.
    pub fn resume(&self, packet: Packet) -> Result<()> {
        self.resume_with(Resumed::Packet(packet))
    }

    /// Resume into exception processing.
    pub fn resume_with_error(&self, error: Error) -> Result<()> {
        self.resume_with(Resumed::Error(error))
    }

    fn resume_with(&self, value: Resumed) -> Result<()> {
        let mut st = self.shared.state.lock();
        if st.status == FiberState::Completed {
            return Err(Error::InvalidFiberState("fiber already completed"));
        }
        if let Some(parked) = st.parked.take() {
            st.status = FiberState::Running;
            drop(st);
            log::trace!("[fiber] #{} resumed", self.shared.id);
            let step = parked.resumption.step(value);
            let fiber = parked.fiber;
            self.engine.submit(Box::new(move || fiber.run_async(step)));
            return Ok(());
        }
        if st.latched.is_some() {
            return Err(Error::InvalidFiberState("fiber already resumed"));
        }
        st.latched = Some(value);
        self.shared.cond.notify_all();
        Ok(())
    }
}

impl std::fmt::Debug for FiberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FiberHandle")
            .field("id", &self.shared.id)
            .finish()
    }
}

/// Per-call context handed to tubes.
pub struct FiberContext {
    handle: FiberHandle,
    synchronous: bool,
}

impl FiberContext {
    /// Id of the running fiber.
    pub fn fiber_id(&self) -> u64 {
        self.handle.id()
    }

    /// Handle to resume this fiber after returning [`NextAction::Suspend`].
    pub fn handle(&self) -> FiberHandle {
        self.handle.clone()
    }

    /// Whether the fiber runs through `run_sync` (the caller's thread blocks on suspension).
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// Engine owning the fiber.
    pub fn engine(&self) -> &Engine {
        &self.handle.engine
    }
}

// ============================================================================
// Fiber
// ============================================================================

enum Step {
    Request(usize, Packet),
    Response(Packet),
    Exception(Error),
}

#[derive(Clone, Copy)]
enum Phase {
    Request,
    Response,
    Exception,
}

enum Outcome {
    Done(Result<Packet>),
    Suspended(Resumption),
}

/// Drives one packet through one tubeline.
pub struct Fiber {
    id: u64,
    engine: Engine,
    tubeline: Tubeline,
    conts: Vec<usize>,
    shared: Arc<Shared>,
    synchronous: bool,
    callback: Option<Box<dyn CompletionCallback>>,
    interceptors: Vec<Arc<dyn FiberContextSwitchInterceptor>>,
    deliver_error_in_packet: bool,
    skeleton: Option<Packet>,
    on_release: Option<ReleaseHook>,
}

impl Fiber {
    pub(crate) fn new(engine: Engine, id: u64, tubeline: Tubeline) -> Self {
        Self {
            id,
            engine,
            tubeline,
            conts: Vec::new(),
            shared: Arc::new(Shared {
                id,
                state: Mutex::new(SharedState {
                    status: FiberState::Created,
                    latched: None,
                    parked: None,
                }),
                cond: Condvar::new(),
            }),
            synchronous: false,
            callback: None,
            interceptors: Vec::new(),
            deliver_error_in_packet: false,
            skeleton: None,
            on_release: None,
        }
    }

    /// Fiber id (unique per engine).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> FiberState {
        self.shared.state.lock().status
    }

    /// Handle for resuming this fiber.
    pub fn handle(&self) -> FiberHandle {
        FiberHandle {
            shared: Arc::clone(&self.shared),
            engine: self.engine.clone(),
        }
    }

    /// Deliver failures as `Completion::Response` carrying a [`ThrowableContainer`].
    pub fn set_deliver_error_in_packet(&mut self, enabled: bool) {
        self.deliver_error_in_packet = enabled;
    }

    /// Wrap every run segment with `interceptor` (outermost first).
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn FiberContextSwitchInterceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Hand the tubeline to `hook` on asynchronous completion.
    pub fn on_release(&mut self, hook: impl FnOnce(Tubeline, bool) + Send + 'static) {
        self.on_release = Some(Box::new(hook));
    }

    /// Take back the tubeline (after `run_sync`).
    pub fn into_tubeline(self) -> Tubeline {
        self.tubeline
    }

    fn begin(&mut self) -> Result<()> {
        let mut st = self.shared.state.lock();
        if st.status != FiberState::Created {
            return Err(Error::InvalidFiberState("fiber already started"));
        }
        st.status = FiberState::Running;
        Ok(())
    }

    /// Run on the calling thread until completion.
    ///
    /// A suspension blocks the caller until the fiber is resumed.
    pub fn run_sync(&mut self, packet: Packet) -> Result<Packet> {
        self.begin()?;
        self.synchronous = true;
        log::trace!("[fiber] #{} run_sync", self.id);

        let mut step = Step::Request(0, packet);
        let result = loop {
            match self.run_segment(step) {
                Outcome::Done(result) => break result,
                Outcome::Suspended(resumption) => {
                    let value = self.wait_for_resume();
                    step = resumption.step(value);
                }
            }
        };

        {
            let mut st = self.shared.state.lock();
            st.status = FiberState::Completed;
            st.latched = None;
        }
        self.shared.cond.notify_all();
        if let Err(e) = &result {
            log::debug!("[fiber] #{} failed: {}", self.id, e);
        }
        result
    }

    /// Start asynchronously; `callback` receives exactly one completion.
    ///
    /// With `run_synchronously` the first segment runs on the calling
    /// thread, otherwise on the engine's executor.
    pub fn start(
        mut self,
        packet: Packet,
        callback: impl CompletionCallback + 'static,
        run_synchronously: bool,
    ) -> FiberHandle {
        let handle = self.handle();
        self.callback = Some(Box::new(callback));
        if let Err(e) = self.begin() {
            Box::new(self).complete(Err(e));
            return handle;
        }
        if self.deliver_error_in_packet {
            self.skeleton = Some(packet.create_server_response(None));
        }

        let fiber = Box::new(self);
        let step = Step::Request(0, packet);
        if run_synchronously {
            fiber.run_async(step);
        } else {
            let engine = fiber.engine.clone();
            engine.submit(Box::new(move || fiber.run_async(step)));
        }
        handle
    }

    fn wait_for_resume(&self) -> Resumed {
        let mut st = self.shared.state.lock();
        loop {
            if let Some(value) = st.latched.take() {
                st.status = FiberState::Running;
                return value;
            }
            st.status = FiberState::Suspended;
            self.shared.cond.wait(&mut st);
        }
    }

    fn run_async(mut self: Box<Self>, mut step: Step) {
        loop {
            match self.run_segment(step) {
                Outcome::Done(result) => {
                    self.complete(result);
                    return;
                }
                Outcome::Suspended(resumption) => {
                    let shared = Arc::clone(&self.shared);
                    let mut st = shared.state.lock();
                    match st.latched.take() {
                        Some(value) => {
                            drop(st);
                            step = resumption.step(value);
                        }
                        None => {
                            log::trace!("[fiber] #{} suspended", self.id);
                            st.status = FiberState::Suspended;
                            st.parked = Some(Parked {
                                fiber: self,
                                resumption,
                            });
                            return;
                        }
                    }
                }
            }
        }
    }

    fn complete(self: Box<Self>, result: Result<Packet>) {
        let Fiber {
            id,
            tubeline,
            shared,
            callback,
            deliver_error_in_packet,
            skeleton,
            on_release,
            ..
        } = *self;

        let failed = match &result {
            Ok(p) => p.has_throwable(),
            Err(_) => true,
        };
        if let Some(release) = on_release {
            release(tubeline, failed);
        }
        {
            let mut st = shared.state.lock();
            st.status = FiberState::Completed;
            st.latched = None;
        }
        shared.cond.notify_all();

        let completion = match result {
            Ok(p) => Completion::Response(p),
            Err(e) if deliver_error_in_packet => {
                log::debug!("[fiber] #{} failed, delivering error in packet: {}", id, e);
                let mut p = skeleton.unwrap_or_default();
                p.set_satellite(ThrowableContainer::new(e));
                Completion::Response(p)
            }
            Err(e) => {
                log::debug!("[fiber] #{} failed: {}", id, e);
                Completion::Failure(e)
            }
        };

        match callback {
            Some(cb) => {
                if catch_unwind(AssertUnwindSafe(|| cb.on_completion(completion))).is_err() {
                    log::error!("[fiber] #{} completion callback panicked", id);
                }
            }
            None => log::warn!("[fiber] #{} completed without callback", id),
        }
    }

    fn run_segment(&mut self, step: Step) -> Outcome {
        if self.interceptors.is_empty() {
            return self.drive(step);
        }
        let interceptors = self.interceptors.clone();
        let id = self.id;
        let mut pending = Some(step);
        let mut outcome = None;
        {
            let mut work = || {
                if let Some(step) = pending.take() {
                    outcome = Some(self.drive(step));
                }
            };
            intercept(&interceptors, id, &mut work);
        }
        match (outcome, pending) {
            (Some(outcome), _) => outcome,
            (None, Some(step)) => {
                log::warn!("[fiber] #{} interceptor skipped the work, running it anyway", id);
                self.drive(step)
            }
            (None, None) => Outcome::Done(Err(Error::InvalidFiberState("interceptor lost the run segment"))),
        }
    }

    fn call_tube(
        &mut self,
        index: usize,
        cx: &FiberContext,
        f: impl FnOnce(&mut dyn Tube, &FiberContext) -> NextAction,
    ) -> NextAction {
        let Some(tube) = self.tubeline.tube_mut(index) else {
            return NextAction::Throw(Error::IllegalAction("continuation past the end of the tubeline"));
        };
        match catch_unwind(AssertUnwindSafe(|| f(&mut *tube, cx))) {
            Ok(action) => action,
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::debug!("[fiber] tube '{}' panicked: {}", tube.name(), msg);
                NextAction::Throw(Error::TubePanicked(format!("{}: {}", tube.name(), msg)))
            }
        }
    }

    fn drive(&mut self, mut step: Step) -> Outcome {
        let cx = FiberContext {
            handle: self.handle(),
            synchronous: self.synchronous,
        };
        loop {
            let (index, phase, action) = match step {
                Step::Request(index, packet) => {
                    if index >= self.tubeline.len() {
                        // No terminal tube: the request itself turns around.
                        step = Step::Response(packet);
                        continue;
                    }
                    let action = self.call_tube(index, &cx, |t, cx| t.process_request(packet, cx));
                    (index, Phase::Request, action)
                }
                Step::Response(packet) => match self.conts.pop() {
                    None => return Outcome::Done(Ok(packet)),
                    Some(index) => {
                        let action = self.call_tube(index, &cx, |t, cx| t.process_response(packet, cx));
                        (index, Phase::Response, action)
                    }
                },
                Step::Exception(error) => match self.conts.pop() {
                    None => return Outcome::Done(Err(error)),
                    Some(index) => {
                        let action = self.call_tube(index, &cx, |t, cx| t.process_exception(error, cx));
                        (index, Phase::Exception, action)
                    }
                },
            };

            step = match (action, phase) {
                (NextAction::Invoke(p), Phase::Request) => {
                    self.conts.push(index);
                    Step::Request(index + 1, p)
                }
                (NextAction::InvokeAndForget(p), Phase::Request) => Step::Request(index + 1, p),
                (NextAction::Invoke(_) | NextAction::InvokeAndForget(_), _) => {
                    Step::Exception(Error::IllegalAction("invoke during response processing"))
                }
                (NextAction::Return(p), _) => Step::Response(p),
                (NextAction::Throw(e), _) => Step::Exception(e),
                (NextAction::Suspend(SuspendMode::Invoke), Phase::Request) => {
                    self.conts.push(index);
                    return Outcome::Suspended(Resumption::Invoke(index + 1));
                }
                (NextAction::Suspend(SuspendMode::Invoke), _) => {
                    Step::Exception(Error::IllegalAction("suspend-invoke during response processing"))
                }
                (NextAction::Suspend(SuspendMode::Response), _) => {
                    return Outcome::Suspended(Resumption::Response);
                }
            };
        }
    }
}

fn intercept(chain: &[Arc<dyn FiberContextSwitchInterceptor>], id: u64, work: &mut dyn FnMut()) {
    match chain.split_first() {
        None => work(),
        Some((first, rest)) => first.execute(id, &mut || intercept(rest, id, &mut *work)),
    }
}

impl std::fmt::Debug for Fiber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("tubeline", &self.tubeline)
            .finish()
    }
}
