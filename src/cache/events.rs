//! Mutations that affect cached state.

use std::fmt;

use crate::domain::entities::{ContentRecord, PageRecord};
use crate::domain::types::{FolderId, PageId};

#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
    /// A folder was created, renamed, moved or deleted.
    FolderChanged { folder_id: FolderId },
    /// A page was created or updated. `content` carries the new blob when the
    /// caller has it; otherwise the cached blob is dropped.
    PageUpserted {
        page: PageRecord,
        content: Option<ContentRecord>,
    },
    PageDeleted { page_id: PageId },
    SiteConfigUpdated,
    VersionUpdated,
}

impl MutationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MutationEvent::FolderChanged { .. } => "folder_changed",
            MutationEvent::PageUpserted { .. } => "page_upserted",
            MutationEvent::PageDeleted { .. } => "page_deleted",
            MutationEvent::SiteConfigUpdated => "site_config_updated",
            MutationEvent::VersionUpdated => "version_updated",
        }
    }
}

impl fmt::Display for MutationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationEvent::FolderChanged { folder_id } => write!(f, "folder_changed({folder_id})"),
            MutationEvent::PageUpserted { page, .. } => write!(f, "page_upserted({})", page.id),
            MutationEvent::PageDeleted { page_id } => write!(f, "page_deleted({page_id})"),
            other => f.write_str(other.kind()),
        }
    }
}
