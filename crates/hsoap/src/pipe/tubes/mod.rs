// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard tubes.

mod addressing;
mod dump;
mod handler;
mod must_understand;

pub use addressing::{AddressingProperties, AddressingTube, WSA_FAULT_ACTION};
pub use dump::DumpTube;
pub use handler::{Handler, HandlerTube, MessageContext};
pub use must_understand::MustUnderstandTube;
