//! Application services layer.

pub mod content;
pub mod diffs;
pub mod error;
pub mod pagination;
pub mod ranks;
pub mod render;
pub mod repos;
pub mod version;
