//! Process-local adapters for embedding hosts and tests.

mod arena;
mod store;

pub use arena::ContentArena;
pub use store::InMemoryPlainTextStore;
