//! Core domain types
//!
//! Value types used by both the registry client and the operator. They
//! carry no I/O and validate their contents on construction.

pub mod repository;
pub mod resource;

pub use repository::{InvalidRepositoryName, RepositoryName};
pub use resource::ResourceRef;
