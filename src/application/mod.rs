//! Application layer: derivation services and the contracts they depend on.

pub mod error;
pub mod hooks;
pub mod markup;
pub mod plain_text;
pub mod registry;
pub mod repos;
