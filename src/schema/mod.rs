//! Schema resolution and caching.

pub mod store;

pub use store::{SchemaStore, AUTO, LATEST};
