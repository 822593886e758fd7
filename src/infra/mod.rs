//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod social;
pub mod telemetry;
