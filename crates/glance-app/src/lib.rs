//! # glance-app
//!
//! Composition root for Glance. Owns the one [`AppContext`] per process:
//! the registry of supported data sources, the connector resolver, the
//! secrets store and the per-operation caches. A UI runtime drives
//! everything through [`AppContext::resolve`] and the memoized accessors.

pub mod accessors;
pub mod context;

pub use context::{AppContext, Caches};
