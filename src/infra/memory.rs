//! In-process record store implementing every repository trait.
//!
//! Backs the CLI and the test suites. Read counters let callers observe how
//! often the cache fell through to the store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    ContentRepo, CreateFolderParams, CreatePageParams, DiffsRepo, FoldersRepo, IdentitiesRepo,
    NewDiffParams, PageQueryFilter, PagesRepo, PermissionsRepo, RepoError, SiteConfigRepo,
    UpdateFolderParams, listing_order,
};
use crate::domain::entities::{
    ContentRecord, DiffRecord, FolderRecord, IdentityRecord, PageMetadata, PageRecord,
    PermissionRecord, SiteConfigRecord,
};
use crate::domain::types::{FolderId, PageId};

const SLUG_CONSTRAINT: &str = "pages_slug_key";

#[derive(Default)]
struct ReadCounters {
    pages: AtomicUsize,
    contents: AtomicUsize,
    folders: AtomicUsize,
    diffs: AtomicUsize,
    permissions: AtomicUsize,
    identities: AtomicUsize,
    site_config: AtomicUsize,
}

#[derive(Default)]
pub struct InMemoryStore {
    pages: RwLock<BTreeMap<PageId, PageRecord>>,
    contents: RwLock<HashMap<PageId, ContentRecord>>,
    /// Listed in insertion order, which becomes sibling order in trees.
    folders: RwLock<Vec<FolderRecord>>,
    /// Insertion order is kept so equal timestamps list stably.
    diffs: RwLock<Vec<DiffRecord>>,
    permissions: RwLock<Vec<PermissionRecord>>,
    identities: RwLock<Vec<IdentityRecord>>,
    site_config: RwLock<Option<SiteConfigRecord>>,
    reads: ReadCounters,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site_config(config: SiteConfigRecord) -> Self {
        Self {
            site_config: RwLock::new(Some(config)),
            ..Self::default()
        }
    }

    pub async fn add_identity(&self, identity: IdentityRecord) {
        self.identities.write().await.push(identity);
    }

    pub async fn add_permission(&self, permission: PermissionRecord) {
        self.permissions.write().await.push(permission);
    }

    /// While offline every call fails with [`RepoError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn page_reads(&self) -> usize {
        self.reads.pages.load(Ordering::SeqCst)
    }

    pub fn content_reads(&self) -> usize {
        self.reads.contents.load(Ordering::SeqCst)
    }

    pub fn folder_reads(&self) -> usize {
        self.reads.folders.load(Ordering::SeqCst)
    }

    pub fn diff_reads(&self) -> usize {
        self.reads.diffs.load(Ordering::SeqCst)
    }

    pub fn site_config_reads(&self) -> usize {
        self.reads.site_config.load(Ordering::SeqCst)
    }

    pub fn total_reads(&self) -> usize {
        [
            &self.reads.pages,
            &self.reads.contents,
            &self.reads.folders,
            &self.reads.diffs,
            &self.reads.permissions,
            &self.reads.identities,
            &self.reads.site_config,
        ]
        .iter()
        .map(|counter| counter.load(Ordering::SeqCst))
        .sum()
    }

    fn available(&self) -> Result<(), RepoError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn read(&self, counter: &AtomicUsize) -> Result<(), RepoError> {
        self.available()?;
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn slug_taken(pages: &BTreeMap<PageId, PageRecord>, slug: &str, owner: &PageId) -> bool {
    pages
        .values()
        .any(|page| page.slug == slug && &page.id != owner)
}

#[async_trait]
impl PagesRepo for InMemoryStore {
    async fn find_by_id(&self, id: &PageId) -> Result<Option<PageRecord>, RepoError> {
        self.read(&self.reads.pages)?;
        Ok(self.pages.read().await.get(id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
        self.read(&self.reads.pages)?;
        Ok(self
            .pages
            .read()
            .await
            .values()
            .find(|page| page.slug == slug)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<PageRecord>, RepoError> {
        self.read(&self.reads.pages)?;
        let mut pages: Vec<PageRecord> = self.pages.read().await.values().cloned().collect();
        pages.sort_by(listing_order);
        Ok(pages)
    }

    async fn list_pages(
        &self,
        filter: &PageQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PageRecord>, RepoError> {
        self.read(&self.reads.pages)?;
        let pages = self.pages.read().await;
        let mut matching: Vec<&PageRecord> =
            pages.values().filter(|page| filter.matches(page)).collect();
        matching.sort_by(|lhs, rhs| listing_order(lhs, rhs));
        Ok(window
            .slice(&matching)
            .iter()
            .map(|page| (*page).clone())
            .collect())
    }

    async fn count_pages(&self, filter: &PageQueryFilter) -> Result<u64, RepoError> {
        self.read(&self.reads.pages)?;
        let pages = self.pages.read().await;
        Ok(pages.values().filter(|page| filter.matches(page)).count() as u64)
    }

    async fn list_in_folders(&self, folders: &[FolderId]) -> Result<Vec<PageRecord>, RepoError> {
        self.read(&self.reads.pages)?;
        Ok(self
            .pages
            .read()
            .await
            .values()
            .filter(|page| {
                page.folder_id
                    .as_ref()
                    .is_some_and(|folder| folders.contains(folder))
            })
            .cloned()
            .collect())
    }

    async fn create_page(&self, params: CreatePageParams) -> Result<PageRecord, RepoError> {
        self.available()?;
        let mut pages = self.pages.write().await;
        if pages.contains_key(&params.id) {
            return Err(RepoError::Duplicate {
                constraint: "pages_pkey".to_string(),
            });
        }
        if slug_taken(&pages, &params.metadata.slug, &params.id) {
            return Err(RepoError::Duplicate {
                constraint: SLUG_CONSTRAINT.to_string(),
            });
        }

        let metadata = params.metadata;
        let record = PageRecord {
            id: params.id.clone(),
            slug: metadata.slug,
            title: metadata.title,
            description: metadata.description,
            folder_id: metadata.folder_id,
            tags: metadata.tags,
            published: metadata.published,
            published_at: metadata.published_at,
            author_id: metadata.author_id,
            contributor_ids: metadata.contributor_ids,
            created_at: params.created_at,
            updated_at: metadata.updated_at,
        };
        pages.insert(params.id, record.clone());
        debug!(page_id = %record.id, "Stored page");
        Ok(record)
    }

    async fn update_metadata(
        &self,
        id: &PageId,
        metadata: PageMetadata,
    ) -> Result<PageRecord, RepoError> {
        self.available()?;
        let mut pages = self.pages.write().await;
        if slug_taken(&pages, &metadata.slug, id) {
            return Err(RepoError::Duplicate {
                constraint: SLUG_CONSTRAINT.to_string(),
            });
        }
        let page = pages.get_mut(id).ok_or(RepoError::NotFound)?;
        page.apply_metadata(metadata);
        Ok(page.clone())
    }

    async fn delete_page(&self, id: &PageId) -> Result<(), RepoError> {
        self.available()?;
        self.pages
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ContentRepo for InMemoryStore {
    async fn find_content(&self, page_id: &PageId) -> Result<Option<ContentRecord>, RepoError> {
        self.read(&self.reads.contents)?;
        Ok(self.contents.read().await.get(page_id).cloned())
    }

    async fn upsert_content(
        &self,
        page_id: &PageId,
        body: &str,
        updated_at: OffsetDateTime,
    ) -> Result<ContentRecord, RepoError> {
        self.available()?;
        let record = ContentRecord {
            page_id: page_id.clone(),
            body: body.to_string(),
            updated_at,
        };
        self.contents
            .write()
            .await
            .insert(page_id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_content(&self, page_id: &PageId) -> Result<(), RepoError> {
        self.available()?;
        self.contents.write().await.remove(page_id);
        Ok(())
    }
}

#[async_trait]
impl FoldersRepo for InMemoryStore {
    async fn list_folders(&self) -> Result<Vec<FolderRecord>, RepoError> {
        self.read(&self.reads.folders)?;
        Ok(self.folders.read().await.clone())
    }

    async fn find_folder(&self, id: &FolderId) -> Result<Option<FolderRecord>, RepoError> {
        self.read(&self.reads.folders)?;
        Ok(self
            .folders
            .read()
            .await
            .iter()
            .find(|folder| &folder.id == id)
            .cloned())
    }

    async fn create_folder(&self, params: CreateFolderParams) -> Result<FolderRecord, RepoError> {
        self.available()?;
        let mut folders = self.folders.write().await;
        if folders.iter().any(|folder| folder.id == params.id) {
            return Err(RepoError::Duplicate {
                constraint: "folders_pkey".to_string(),
            });
        }
        let record = FolderRecord {
            id: params.id.clone(),
            name: params.name,
            parent: params.parent,
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        folders.push(record.clone());
        Ok(record)
    }

    async fn update_folder(&self, params: UpdateFolderParams) -> Result<FolderRecord, RepoError> {
        self.available()?;
        let mut folders = self.folders.write().await;
        let folder = folders
            .iter_mut()
            .find(|folder| folder.id == params.id)
            .ok_or(RepoError::NotFound)?;
        folder.name = params.name;
        folder.parent = params.parent;
        folder.updated_at = params.updated_at;
        Ok(folder.clone())
    }

    async fn delete_folders(&self, ids: &[FolderId]) -> Result<u64, RepoError> {
        self.available()?;
        let mut folders = self.folders.write().await;
        let before = folders.len();
        folders.retain(|folder| !ids.contains(&folder.id));
        Ok((before - folders.len()) as u64)
    }
}

#[async_trait]
impl DiffsRepo for InMemoryStore {
    async fn list_for_page(&self, page_id: &PageId) -> Result<Vec<DiffRecord>, RepoError> {
        self.read(&self.reads.diffs)?;
        let mut diffs: Vec<DiffRecord> = self
            .diffs
            .read()
            .await
            .iter()
            .filter(|diff| &diff.page_id == page_id)
            .cloned()
            .collect();
        diffs.sort_by_key(|diff| diff.timestamp);
        Ok(diffs)
    }

    async fn find_diff(&self, id: Uuid) -> Result<Option<DiffRecord>, RepoError> {
        self.read(&self.reads.diffs)?;
        Ok(self
            .diffs
            .read()
            .await
            .iter()
            .find(|diff| diff.id == id)
            .cloned())
    }

    async fn insert_diff(&self, params: NewDiffParams) -> Result<DiffRecord, RepoError> {
        self.available()?;
        let record = DiffRecord {
            id: Uuid::new_v4(),
            page_id: params.page_id,
            user_id: params.user_id,
            timestamp: params.timestamp,
            diff_text: params.diff_text,
            content_snapshot_start: params.content_snapshot_start,
            metadata_snapshot: params.metadata_snapshot,
        };
        self.diffs.write().await.push(record.clone());
        Ok(record)
    }

    async fn delete_diff(&self, id: Uuid) -> Result<(), RepoError> {
        self.available()?;
        let mut diffs = self.diffs.write().await;
        let before = diffs.len();
        diffs.retain(|diff| diff.id != id);
        if diffs.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_newer_than(
        &self,
        page_id: &PageId,
        after: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        self.available()?;
        let mut diffs = self.diffs.write().await;
        let before = diffs.len();
        diffs.retain(|diff| !(&diff.page_id == page_id && diff.timestamp > after));
        Ok((before - diffs.len()) as u64)
    }

    async fn delete_for_page(&self, page_id: &PageId) -> Result<u64, RepoError> {
        self.available()?;
        let mut diffs = self.diffs.write().await;
        let before = diffs.len();
        diffs.retain(|diff| &diff.page_id != page_id);
        Ok((before - diffs.len()) as u64)
    }
}

#[async_trait]
impl PermissionsRepo for InMemoryStore {
    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, RepoError> {
        self.read(&self.reads.permissions)?;
        Ok(self.permissions.read().await.clone())
    }
}

#[async_trait]
impl IdentitiesRepo for InMemoryStore {
    async fn list_identities(&self) -> Result<Vec<IdentityRecord>, RepoError> {
        self.read(&self.reads.identities)?;
        Ok(self.identities.read().await.clone())
    }
}

#[async_trait]
impl SiteConfigRepo for InMemoryStore {
    async fn load_site_config(&self) -> Result<Option<SiteConfigRecord>, RepoError> {
        self.read(&self.reads.site_config)?;
        Ok(self.site_config.read().await.clone())
    }

    async fn save_site_config(
        &self,
        config: SiteConfigRecord,
    ) -> Result<SiteConfigRecord, RepoError> {
        self.available()?;
        *self.site_config.write().await = Some(config.clone());
        Ok(config)
    }
}
