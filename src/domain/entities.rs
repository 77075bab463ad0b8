//! Domain entities mirrored from the backing record store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{FolderId, PageId, Rank, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub folder_id: Option<FolderId>,
    pub tags: Vec<String>,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub author_id: UserId,
    pub contributor_ids: Vec<UserId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PageRecord {
    pub fn metadata(&self) -> PageMetadata {
        PageMetadata {
            slug: self.slug.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            folder_id: self.folder_id.clone(),
            tags: self.tags.clone(),
            published: self.published,
            published_at: self.published_at,
            author_id: self.author_id.clone(),
            contributor_ids: self.contributor_ids.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Overwrite every metadata field with the values of `metadata`.
    pub fn apply_metadata(&mut self, metadata: PageMetadata) {
        self.slug = metadata.slug;
        self.title = metadata.title;
        self.description = metadata.description;
        self.folder_id = metadata.folder_id;
        self.tags = metadata.tags;
        self.published = metadata.published;
        self.published_at = metadata.published_at;
        self.author_id = metadata.author_id;
        self.contributor_ids = metadata.contributor_ids;
        self.updated_at = metadata.updated_at;
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            folder_id: self.folder_id.clone(),
            published: self.published,
            updated_at: self.updated_at,
        }
    }
}

/// The mutable, snapshot-able part of a page record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub folder_id: Option<FolderId>,
    pub tags: Vec<String>,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub author_id: UserId,
    pub contributor_ids: Vec<UserId>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: PageId,
    pub slug: String,
    pub title: String,
    pub folder_id: Option<FolderId>,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub page_id: PageId,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Full projection of a page: its record plus the content blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDocument {
    pub record: PageRecord,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: FolderId,
    pub name: String,
    pub parent: Option<FolderId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub id: Uuid,
    pub page_id: PageId,
    pub user_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub diff_text: String,
    pub content_snapshot_start: String,
    /// JSON object `{ "start": PageMetadata, "end": PageMetadata }`.
    pub metadata_snapshot: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub user_id: UserId,
    pub rank: Rank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: UserId,
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfigRecord {
    pub title: String,
    pub description: String,
    pub base_url: String,
    pub locale: String,
    pub default_folder_id: Option<FolderId>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
