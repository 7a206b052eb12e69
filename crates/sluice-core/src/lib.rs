//! # sluice-core
//!
//! Foundation types shared by every sluice crate:
//!
//! - **Session IDs**: [`SessionId`] newtype over a UUID v7 string
//! - **Logging**: `tracing` subscriber setup and a capture layer for tests

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;

pub use ids::SessionId;
