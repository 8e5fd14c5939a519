//! Derived plain-text maintenance for structured content.
//!
//! Content nodes declare which of their parts contribute to a plain-text
//! rendition. Edits mark the node and its ancestors dirty; reads regenerate
//! lazily, children first, and memoize results for the rest of the session.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
