#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use folio::application::content::{ContentOptions, ContentService, NewFolder, NewPage};
use folio::application::pagination::PageWindow;
use folio::application::version::{VersionInfo, VersionLookup, VersionLookupError};
use folio::application::repos::{
    CreatePageParams, PageQueryFilter, PagesRepo, RepoError, Repositories,
};
use folio::cache::{CacheConfig, CacheContext, Clock, ManualClock};
use folio::domain::entities::{FolderRecord, PageDocument, PageMetadata, PageRecord};
use folio::domain::types::{FolderId, PageId, UserId};
use folio::infra::diff::{DEFAULT_MAX_INPUT_BYTES, SimilarDiffRenderer};
use folio::infra::memory::InMemoryStore;
use time::macros::datetime;

pub const AUTHOR: &str = "u-author";

#[derive(Default)]
pub struct CountingVersion {
    pub calls: AtomicUsize,
}

impl CountingVersion {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionLookup for CountingVersion {
    async fn latest_version(&self, package: &str) -> Result<VersionInfo, VersionLookupError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(VersionInfo {
            package: package.to_string(),
            version: format!("1.0.{call}"),
        })
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub version: Arc<CountingVersion>,
    pub service: ContentService,
}

pub struct HarnessOptions {
    pub cache: CacheConfig,
    pub max_diffs: usize,
    pub max_input_bytes: usize,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            max_diffs: 50,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

pub fn harness() -> Harness {
    harness_with(HarnessOptions::default())
}

pub fn harness_with(options: HarnessOptions) -> Harness {
    assemble(options, |store| Repositories::from_store(store))
}

/// Harness whose pages table goes through `FlakyPages`.
pub fn harness_with_flaky_pages(options: HarnessOptions, faults: Arc<PageFaults>) -> Harness {
    assemble(options, move |store| Repositories {
        pages: Arc::new(FlakyPages {
            inner: Arc::clone(&store),
            faults,
        }),
        ..Repositories::from_store(store)
    })
}

fn assemble(
    options: HarnessOptions,
    repos: impl FnOnce(Arc<InMemoryStore>) -> Repositories,
) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(datetime!(2024-03-01 09:00 UTC)));
    let version = Arc::new(CountingVersion::default());

    let shared_clock: Arc<dyn Clock> = clock.clone();
    let cache = Arc::new(CacheContext::with_clock(options.cache, shared_clock));
    let service = ContentService::new(
        repos(Arc::clone(&store)),
        cache,
        Arc::new(SimilarDiffRenderer::new(options.max_input_bytes)),
        version.clone(),
        ContentOptions {
            max_diffs: options.max_diffs,
            package: "folio".to_string(),
        },
    );

    Harness {
        store,
        clock,
        version,
        service,
    }
}

pub fn author() -> UserId {
    UserId::new(AUTHOR)
}

pub fn new_page(slug: &str, folder: Option<&FolderId>, body: &str) -> NewPage {
    NewPage {
        slug: Some(slug.to_string()),
        title: format!("Title {slug}"),
        description: String::new(),
        folder_id: folder.cloned(),
        tags: Vec::new(),
        published: true,
        author_id: author(),
        body: body.to_string(),
    }
}

impl Harness {
    pub async fn folder(&self, name: &str, parent: Option<&FolderId>) -> FolderRecord {
        self.service
            .create_folder(NewFolder {
                name: name.to_string(),
                parent: parent.cloned(),
            })
            .await
            .expect("create folder")
    }

    pub async fn page(&self, slug: &str, folder: Option<&FolderId>, body: &str) -> PageDocument {
        self.service
            .create_page(new_page(slug, folder, body))
            .await
            .expect("create page")
    }
}

/// Failures to inject into [`FlakyPages`].
#[derive(Default)]
pub struct PageFaults {
    deletes: AtomicUsize,
    /// Deletes after this many successful ones fail.
    delete_budget: Mutex<Option<usize>>,
    pub fail_updates: AtomicBool,
}

impl PageFaults {
    pub fn fail_deletes_after(&self, successes: usize) {
        *self.delete_budget.lock().expect("faults lock") = Some(successes);
    }
}

/// Pages table that fails on demand and otherwise delegates to the store.
pub struct FlakyPages {
    inner: Arc<InMemoryStore>,
    faults: Arc<PageFaults>,
}

fn injected() -> RepoError {
    RepoError::Unavailable("injected failure".to_string())
}

#[async_trait]
impl PagesRepo for FlakyPages {
    async fn find_by_id(&self, id: &PageId) -> Result<Option<PageRecord>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
        self.inner.find_by_slug(slug).await
    }

    async fn list_all(&self) -> Result<Vec<PageRecord>, RepoError> {
        self.inner.list_all().await
    }

    async fn list_pages(
        &self,
        filter: &PageQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PageRecord>, RepoError> {
        self.inner.list_pages(filter, window).await
    }

    async fn count_pages(&self, filter: &PageQueryFilter) -> Result<u64, RepoError> {
        self.inner.count_pages(filter).await
    }

    async fn list_in_folders(&self, folders: &[FolderId]) -> Result<Vec<PageRecord>, RepoError> {
        self.inner.list_in_folders(folders).await
    }

    async fn create_page(&self, params: CreatePageParams) -> Result<PageRecord, RepoError> {
        self.inner.create_page(params).await
    }

    async fn update_metadata(
        &self,
        id: &PageId,
        metadata: PageMetadata,
    ) -> Result<PageRecord, RepoError> {
        if self.faults.fail_updates.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.update_metadata(id, metadata).await
    }

    async fn delete_page(&self, id: &PageId) -> Result<(), RepoError> {
        let limit = *self.faults.delete_budget.lock().expect("faults lock");
        let done = self.faults.deletes.fetch_add(1, Ordering::SeqCst);
        if limit.is_some_and(|limit| done >= limit) {
            return Err(injected());
        }
        self.inner.delete_page(id).await
    }
}
