// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tubes, tubelines, assembly and pooling.
//!
//! ```text
//!  request ──► [must-understand] ──► [addressing] ──► [handlers] ──► [invoker]
//!  response ◄──────────────────────────────────────────────────────────┘
//! ```

mod assembler;
mod pool;
mod tube;
mod tubeline;
pub mod tubes;

pub use assembler::{AssemblyContext, TubeFactory, TubeRegistry, TubelineAssembler};
pub use pool::{Pool, PoolCell, PoolStats, Pooled};
pub use tube::{NextAction, SuspendMode, Tube};
pub use tubeline::Tubeline;
