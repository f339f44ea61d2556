//! Collaborator trait abstractions.
//!
//! The pipeline core never talks to a network; everything external —
//! the completion service, the schema/vocabulary source, the geocoder,
//! the target repository — hides behind one of these traits.

pub mod completion;
pub mod geocoder;
pub mod repository;
pub mod source;

pub use completion::Completion;
pub use geocoder::Geocoder;
pub use repository::{FieldWriteResult, Repository};
pub use source::SchemaSource;
