//! Data types for the metadata pipeline.

pub mod config;
pub mod diff;
pub mod record;
pub mod report;
pub mod schema;
pub mod task;
pub mod vocabulary;
