// SPDX-License-Identifier: MIT
//! Language-server relay: framing codec and subprocess lifecycle.
//!
//! Payloads are opaque to this module — frames are decoded to
//! `serde_json::Value` and forwarded without interpretation.

pub mod error;
pub mod framing;
pub mod process;

pub use error::RelayError;
pub use process::LanguageServer;
