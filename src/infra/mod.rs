//! Infrastructure adapters and runtime bootstrap.

pub mod bootstrap;
pub mod db;
pub mod error;
pub mod markup;
pub mod memory;
pub mod telemetry;
