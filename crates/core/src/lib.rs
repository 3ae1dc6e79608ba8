//! `pantry-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod revision;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use revision::ExpectedRevision;
pub use value_object::ValueObject;
