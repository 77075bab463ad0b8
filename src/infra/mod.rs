//! Infrastructure adapters and runtime bootstrap.

pub mod diff;
pub mod error;
pub mod memory;
pub mod registry;
pub mod telemetry;
