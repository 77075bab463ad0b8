//! Repository traits describing the data-access collaborator.
//!
//! Each trait covers one table. Implementations issue whatever queries they
//! like; the core only ever goes through these methods.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageWindow;
use crate::domain::entities::{
    ContentRecord, DiffRecord, FolderRecord, IdentityRecord, PageMetadata, PageRecord,
    PermissionRecord, SiteConfigRecord,
};
use crate::domain::types::{FolderId, PageId, UserId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("data store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQueryFilter {
    pub folder_id: Option<FolderId>,
    pub published: Option<bool>,
    /// Case-insensitive substring match against title and slug.
    pub search: Option<String>,
}

impl PageQueryFilter {
    pub fn matches(&self, page: &PageRecord) -> bool {
        if let Some(folder_id) = self.folder_id.as_ref()
            && page.folder_id.as_ref() != Some(folder_id)
        {
            return false;
        }
        if let Some(published) = self.published
            && page.published != published
        {
            return false;
        }
        if let Some(search) = self.search.as_ref() {
            let needle = search.to_lowercase();
            if !page.title.to_lowercase().contains(&needle)
                && !page.slug.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Listing order shared by every implementation: most recently updated first,
/// ties broken by id.
pub fn listing_order(lhs: &PageRecord, rhs: &PageRecord) -> std::cmp::Ordering {
    rhs.updated_at
        .cmp(&lhs.updated_at)
        .then_with(|| lhs.id.cmp(&rhs.id))
}

#[derive(Debug, Clone)]
pub struct CreatePageParams {
    pub id: PageId,
    pub metadata: PageMetadata,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateFolderParams {
    pub id: FolderId,
    pub name: String,
    pub parent: Option<FolderId>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateFolderParams {
    pub id: FolderId,
    pub name: String,
    pub parent: Option<FolderId>,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDiffParams {
    pub page_id: PageId,
    pub user_id: UserId,
    pub timestamp: OffsetDateTime,
    pub diff_text: String,
    pub content_snapshot_start: String,
    pub metadata_snapshot: serde_json::Value,
}

#[async_trait]
pub trait PagesRepo: Send + Sync {
    async fn find_by_id(&self, id: &PageId) -> Result<Option<PageRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError>;

    async fn list_all(&self) -> Result<Vec<PageRecord>, RepoError>;

    async fn list_pages(
        &self,
        filter: &PageQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PageRecord>, RepoError>;

    async fn count_pages(&self, filter: &PageQueryFilter) -> Result<u64, RepoError>;

    async fn list_in_folders(&self, folders: &[FolderId]) -> Result<Vec<PageRecord>, RepoError>;

    async fn create_page(&self, params: CreatePageParams) -> Result<PageRecord, RepoError>;

    async fn update_metadata(
        &self,
        id: &PageId,
        metadata: PageMetadata,
    ) -> Result<PageRecord, RepoError>;

    async fn delete_page(&self, id: &PageId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn find_content(&self, page_id: &PageId) -> Result<Option<ContentRecord>, RepoError>;

    /// Insert or replace the content blob of a page.
    async fn upsert_content(
        &self,
        page_id: &PageId,
        body: &str,
        updated_at: OffsetDateTime,
    ) -> Result<ContentRecord, RepoError>;

    async fn delete_content(&self, page_id: &PageId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait FoldersRepo: Send + Sync {
    async fn list_folders(&self) -> Result<Vec<FolderRecord>, RepoError>;

    async fn find_folder(&self, id: &FolderId) -> Result<Option<FolderRecord>, RepoError>;

    async fn create_folder(&self, params: CreateFolderParams) -> Result<FolderRecord, RepoError>;

    async fn update_folder(&self, params: UpdateFolderParams) -> Result<FolderRecord, RepoError>;

    async fn delete_folders(&self, ids: &[FolderId]) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait DiffsRepo: Send + Sync {
    /// All diffs of a page, oldest first.
    async fn list_for_page(&self, page_id: &PageId) -> Result<Vec<DiffRecord>, RepoError>;

    async fn find_diff(&self, id: Uuid) -> Result<Option<DiffRecord>, RepoError>;

    async fn insert_diff(&self, params: NewDiffParams) -> Result<DiffRecord, RepoError>;

    async fn delete_diff(&self, id: Uuid) -> Result<(), RepoError>;

    /// Delete every diff of `page_id` strictly newer than `after`.
    async fn delete_newer_than(
        &self,
        page_id: &PageId,
        after: OffsetDateTime,
    ) -> Result<u64, RepoError>;

    async fn delete_for_page(&self, page_id: &PageId) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait PermissionsRepo: Send + Sync {
    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, RepoError>;
}

#[async_trait]
pub trait IdentitiesRepo: Send + Sync {
    async fn list_identities(&self) -> Result<Vec<IdentityRecord>, RepoError>;
}

#[async_trait]
pub trait SiteConfigRepo: Send + Sync {
    async fn load_site_config(&self) -> Result<Option<SiteConfigRecord>, RepoError>;

    async fn save_site_config(
        &self,
        config: SiteConfigRecord,
    ) -> Result<SiteConfigRecord, RepoError>;
}

/// Every table of the data-access collaborator.
#[derive(Clone)]
pub struct Repositories {
    pub pages: Arc<dyn PagesRepo>,
    pub contents: Arc<dyn ContentRepo>,
    pub folders: Arc<dyn FoldersRepo>,
    pub diffs: Arc<dyn DiffsRepo>,
    pub permissions: Arc<dyn PermissionsRepo>,
    pub identities: Arc<dyn IdentitiesRepo>,
    pub site_config: Arc<dyn SiteConfigRepo>,
}

impl Repositories {
    /// Use one store for every table.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PagesRepo
            + ContentRepo
            + FoldersRepo
            + DiffsRepo
            + PermissionsRepo
            + IdentitiesRepo
            + SiteConfigRepo
            + 'static,
    {
        Self {
            pages: store.clone(),
            contents: store.clone(),
            folders: store.clone(),
            diffs: store.clone(),
            permissions: store.clone(),
            identities: store.clone(),
            site_config: store,
        }
    }
}
