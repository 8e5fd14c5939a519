//! Domain layer types and invariants.

pub mod entities;
pub mod parts;
pub mod text;
pub mod types;
