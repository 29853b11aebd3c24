// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The processing stage contract.

use crate::engine::FiberContext;
use crate::error::Error;
use crate::packet::Packet;
use std::fmt;

/// How a suspended fiber continues once resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendMode {
    /// Resume into response processing of the tubes already traversed.
    Response,
    /// Resume by invoking the next tube with the resumed packet
    /// (request direction only; the suspending tube will see the response).
    Invoke,
}

/// What the fiber should do after a tube returns.
pub enum NextAction {
    /// Pass the request to the next tube and come back for the response.
    Invoke(Packet),
    /// Pass the request to the next tube; skip this tube on the way back.
    InvokeAndForget(Packet),
    /// Turn around: start response processing with this packet.
    Return(Packet),
    /// Start exception processing.
    Throw(Error),
    /// Park the fiber until [`FiberHandle::resume`](crate::engine::FiberHandle::resume).
    ///
    /// The tube must have obtained a handle from the [`FiberContext`]
    /// before returning this action.
    Suspend(SuspendMode),
}

impl NextAction {
    fn label(&self) -> &'static str {
        match self {
            NextAction::Invoke(_) => "invoke",
            NextAction::InvokeAndForget(_) => "invoke-and-forget",
            NextAction::Return(_) => "return",
            NextAction::Throw(_) => "throw",
            NextAction::Suspend(_) => "suspend",
        }
    }
}

impl fmt::Debug for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextAction::Throw(e) => write!(f, "NextAction::Throw({})", e),
            NextAction::Suspend(mode) => write!(f, "NextAction::Suspend({:?})", mode),
            other => write!(f, "NextAction::{}", other.label()),
        }
    }
}

/// One stage of a tubeline.
///
/// A tube instance belongs to exactly one tubeline clone, and a clone is
/// driven by at most one fiber at a time, so tubes may keep per-request
/// state between `process_request` and `process_response`.
pub trait Tube: Send {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Request direction.
    fn process_request(&mut self, packet: Packet, cx: &FiberContext) -> NextAction;

    /// Response direction. Defaults to passing the response through.
    fn process_response(&mut self, packet: Packet, _cx: &FiberContext) -> NextAction {
        NextAction::Return(packet)
    }

    /// Exception direction. Defaults to propagating the error.
    fn process_exception(&mut self, error: Error, _cx: &FiberContext) -> NextAction {
        NextAction::Throw(error)
    }

    /// Independent copy for another tubeline clone.
    fn copy(&self) -> Box<dyn Tube>;

    /// Release resources; called once on the master tubeline at endpoint disposal.
    fn pre_destroy(&mut self) {}
}

impl fmt::Debug for dyn Tube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tube({})", self.name())
    }
}
