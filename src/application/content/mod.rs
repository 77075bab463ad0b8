//! Public read/write facade over pages, folders, site configuration, version
//! lookups, ranks and revision history.

mod folders;
mod pages;
mod service;
mod types;

pub use service::ContentService;
pub use types::{
    ContentOptions, FolderDeletion, FolderUpdate, NewFolder, NewPage, PageUpdate, SiteConfigInput,
};
