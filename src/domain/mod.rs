//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod folders;
pub mod metadata;
pub mod ranks;
pub mod slug;
pub mod types;
