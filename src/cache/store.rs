//! In-memory cache storage with read-through helpers.
//!
//! Locks guard plain maps and are released before any fetch is awaited, so
//! concurrent misses may both hit the data store; the later write wins.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use metrics::counter;
use time::{Duration, OffsetDateTime};

use crate::application::version::VersionInfo;
use crate::domain::entities::{ContentRecord, FolderRecord, PageRecord, SiteConfigRecord};
use crate::domain::folders::FolderNode;
use crate::domain::types::PageId;

use super::config::CacheConfig;
use super::entry::{CacheEntry, Clock, SystemClock};
use super::keys::SingletonKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "folio_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "folio_cache_miss_total";
pub const METRIC_CACHE_INVALIDATE: &str = "folio_cache_invalidate_total";

const PAGE_LABEL: &str = "page";
const CONTENT_LABEL: &str = "content";
const LISTING_LABEL: &str = "page_listing";

fn record_hit(entity: &'static str) {
    counter!(METRIC_CACHE_HIT, "entity" => entity).increment(1);
}

fn record_miss(entity: &'static str) {
    counter!(METRIC_CACHE_MISS, "entity" => entity).increment(1);
}

fn record_invalidate(entity: &'static str) {
    counter!(METRIC_CACHE_INVALIDATE, "entity" => entity).increment(1);
}

struct SingletonSlot<T> {
    key: SingletonKey,
    entry: RwLock<Option<CacheEntry<T>>>,
}

impl<T> SingletonSlot<T> {
    fn new(key: SingletonKey) -> Self {
        Self {
            key,
            entry: RwLock::new(None),
        }
    }

    fn fresh(&self, now: OffsetDateTime, ttl: Duration) -> Option<Arc<T>> {
        rw_read(&self.entry, SOURCE, "singleton.fresh")
            .as_ref()
            .filter(|entry| !entry.is_expired(now, ttl))
            .map(|entry| Arc::clone(&entry.data))
    }

    fn store(&self, value: T, now: OffsetDateTime) -> Arc<T> {
        let entry = CacheEntry::new(value, now);
        let data = Arc::clone(&entry.data);
        *rw_write(&self.entry, SOURCE, "singleton.store") = Some(entry);
        data
    }

    fn clear(&self) -> bool {
        let removed = rw_write(&self.entry, SOURCE, "singleton.clear")
            .take()
            .is_some();
        if removed {
            record_invalidate(self.key.as_str());
        }
        removed
    }

    fn is_populated(&self) -> bool {
        rw_read(&self.entry, SOURCE, "singleton.is_populated").is_some()
    }
}

#[derive(Default)]
struct PageMapping {
    entries: HashMap<PageId, CacheEntry<PageRecord>>,
    /// Set while `entries` holds every page the store knows about.
    listed_at: Option<OffsetDateTime>,
}

/// Owner of every cache entry in the process.
///
/// Singleton entities live under a fixed [`SingletonKey`]; pages and their
/// content blobs are keyed by page id.
pub struct CacheContext {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    site_config: SingletonSlot<SiteConfigRecord>,
    folder_tree: SingletonSlot<Vec<FolderNode>>,
    page_folder_tree: SingletonSlot<Vec<FolderNode>>,
    folder_list: SingletonSlot<Vec<FolderRecord>>,
    version: SingletonSlot<VersionInfo>,
    pages: RwLock<PageMapping>,
    contents: RwLock<HashMap<PageId, CacheEntry<ContentRecord>>>,
}

impl CacheContext {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            site_config: SingletonSlot::new(SingletonKey::SiteConfig),
            folder_tree: SingletonSlot::new(SingletonKey::FolderTree),
            page_folder_tree: SingletonSlot::new(SingletonKey::PageFolderTree),
            folder_list: SingletonSlot::new(SingletonKey::FolderList),
            version: SingletonSlot::new(SingletonKey::Version),
            pages: RwLock::new(PageMapping::default()),
            contents: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    // ========================================================================
    // Singleton read-through
    // ========================================================================

    pub async fn site_config<F, Fut, E>(&self, fetch: F) -> Result<Arc<SiteConfigRecord>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SiteConfigRecord, E>>,
    {
        self.read_through(&self.site_config, self.config.page_ttl, fetch)
            .await
    }

    pub async fn folder_tree<F, Fut, E>(&self, fetch: F) -> Result<Arc<Vec<FolderNode>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<FolderNode>, E>>,
    {
        self.read_through(&self.folder_tree, self.config.page_ttl, fetch)
            .await
    }

    pub async fn page_folder_tree<F, Fut, E>(&self, fetch: F) -> Result<Arc<Vec<FolderNode>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<FolderNode>, E>>,
    {
        self.read_through(&self.page_folder_tree, self.config.page_ttl, fetch)
            .await
    }

    pub async fn folder_list<F, Fut, E>(&self, fetch: F) -> Result<Arc<Vec<FolderRecord>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<FolderRecord>, E>>,
    {
        self.read_through(&self.folder_list, self.config.page_ttl, fetch)
            .await
    }

    pub async fn version<F, Fut, E>(&self, fetch: F) -> Result<Arc<VersionInfo>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VersionInfo, E>>,
    {
        self.read_through(&self.version, self.config.version_ttl, fetch)
            .await
    }

    async fn read_through<T, F, Fut, E>(
        &self,
        slot: &SingletonSlot<T>,
        ttl: Duration,
        fetch: F,
    ) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return fetch().await.map(Arc::new);
        }

        if let Some(hit) = slot.fresh(self.clock.now(), ttl) {
            record_hit(slot.key.as_str());
            return Ok(hit);
        }

        record_miss(slot.key.as_str());
        let value = fetch().await?;
        Ok(slot.store(value, self.clock.now()))
    }

    // ========================================================================
    // Page mapping
    // ========================================================================

    /// Page by id. A `None` from the store is passed through and never cached.
    pub async fn page<F, Fut, E>(&self, id: &PageId, fetch: F) -> Result<Option<Arc<PageRecord>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<PageRecord>, E>>,
    {
        if !self.config.enabled {
            return Ok(fetch().await?.map(Arc::new));
        }

        let now = self.clock.now();
        let cached = rw_read(&self.pages, SOURCE, "page")
            .entries
            .get(id)
            .filter(|entry| !entry.is_expired(now, self.config.page_ttl))
            .map(|entry| Arc::clone(&entry.data));
        if let Some(hit) = cached {
            record_hit(PAGE_LABEL);
            return Ok(Some(hit));
        }

        record_miss(PAGE_LABEL);
        Ok(fetch().await?.map(|record| self.upsert_page(record)))
    }

    /// Page by slug, answered from any fresh entry with that slug.
    pub async fn page_by_slug<F, Fut, E>(
        &self,
        slug: &str,
        fetch: F,
    ) -> Result<Option<Arc<PageRecord>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<PageRecord>, E>>,
    {
        if !self.config.enabled {
            return Ok(fetch().await?.map(Arc::new));
        }

        let now = self.clock.now();
        let cached = rw_read(&self.pages, SOURCE, "page_by_slug")
            .entries
            .values()
            .find(|entry| {
                entry.data.slug == slug && !entry.is_expired(now, self.config.page_ttl)
            })
            .map(|entry| Arc::clone(&entry.data));
        if let Some(hit) = cached {
            record_hit(PAGE_LABEL);
            return Ok(Some(hit));
        }

        record_miss(PAGE_LABEL);
        Ok(fetch().await?.map(|record| self.upsert_page(record)))
    }

    /// Every page, from the mapping when it holds a fresh complete listing.
    ///
    /// Otherwise the full result set is fetched and replaces the mapping
    /// before anything is returned. Order is unspecified.
    pub async fn page_listing<F, Fut, E>(&self, fetch_all: F) -> Result<Vec<Arc<PageRecord>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<PageRecord>, E>>,
    {
        if !self.config.enabled {
            return Ok(fetch_all().await?.into_iter().map(Arc::new).collect());
        }

        let now = self.clock.now();
        {
            let mapping = rw_read(&self.pages, SOURCE, "page_listing");
            let complete = mapping
                .listed_at
                .is_some_and(|listed_at| now - listed_at <= self.config.page_ttl);
            if complete {
                record_hit(LISTING_LABEL);
                return Ok(mapping
                    .entries
                    .values()
                    .map(|entry| Arc::clone(&entry.data))
                    .collect());
            }
        }

        record_miss(LISTING_LABEL);
        let records = fetch_all().await?;
        let stored_at = self.clock.now();
        let entries: HashMap<PageId, CacheEntry<PageRecord>> = records
            .into_iter()
            .map(|record| (record.id.clone(), CacheEntry::new(record, stored_at)))
            .collect();
        let listing = entries
            .values()
            .map(|entry| Arc::clone(&entry.data))
            .collect();

        let mut mapping = rw_write(&self.pages, SOURCE, "page_listing.store");
        mapping.entries = entries;
        mapping.listed_at = Some(stored_at);
        Ok(listing)
    }

    /// Write a page through to the mapping and return the shared value.
    pub fn upsert_page(&self, record: PageRecord) -> Arc<PageRecord> {
        let entry = CacheEntry::new(record, self.clock.now());
        let data = Arc::clone(&entry.data);
        if self.config.enabled {
            rw_write(&self.pages, SOURCE, "upsert_page")
                .entries
                .insert(data.id.clone(), entry);
        }
        data
    }

    pub fn remove_page(&self, id: &PageId) -> bool {
        let removed = rw_write(&self.pages, SOURCE, "remove_page")
            .entries
            .remove(id)
            .is_some();
        if removed {
            record_invalidate(PAGE_LABEL);
        }
        removed
    }

    /// Drop every page and content entry together with the listing marker.
    pub fn clear_pages(&self) {
        {
            let mut mapping = rw_write(&self.pages, SOURCE, "clear_pages");
            mapping.entries.clear();
            mapping.listed_at = None;
        }
        rw_write(&self.contents, SOURCE, "clear_pages.contents").clear();
        record_invalidate(PAGE_LABEL);
    }

    // ========================================================================
    // Content mapping
    // ========================================================================

    pub async fn content<F, Fut, E>(
        &self,
        page_id: &PageId,
        fetch: F,
    ) -> Result<Option<Arc<ContentRecord>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<ContentRecord>, E>>,
    {
        if !self.config.enabled {
            return Ok(fetch().await?.map(Arc::new));
        }

        let now = self.clock.now();
        let cached = rw_read(&self.contents, SOURCE, "content")
            .get(page_id)
            .filter(|entry| !entry.is_expired(now, self.config.page_ttl))
            .map(|entry| Arc::clone(&entry.data));
        if let Some(hit) = cached {
            record_hit(CONTENT_LABEL);
            return Ok(Some(hit));
        }

        record_miss(CONTENT_LABEL);
        Ok(fetch().await?.map(|record| self.upsert_content(record)))
    }

    pub fn upsert_content(&self, record: ContentRecord) -> Arc<ContentRecord> {
        let entry = CacheEntry::new(record, self.clock.now());
        let data = Arc::clone(&entry.data);
        if self.config.enabled {
            rw_write(&self.contents, SOURCE, "upsert_content").insert(data.page_id.clone(), entry);
        }
        data
    }

    pub fn remove_content(&self, page_id: &PageId) -> bool {
        let removed = rw_write(&self.contents, SOURCE, "remove_content")
            .remove(page_id)
            .is_some();
        if removed {
            record_invalidate(CONTENT_LABEL);
        }
        removed
    }

    // ========================================================================
    // Bulk operations and introspection
    // ========================================================================

    pub fn clear_singleton(&self, key: SingletonKey) -> bool {
        match key {
            SingletonKey::SiteConfig => self.site_config.clear(),
            SingletonKey::FolderTree => self.folder_tree.clear(),
            SingletonKey::PageFolderTree => self.page_folder_tree.clear(),
            SingletonKey::FolderList => self.folder_list.clear(),
            SingletonKey::Version => self.version.clear(),
        }
    }

    /// Clear all cached data.
    pub fn clear(&self) {
        for key in SingletonKey::ALL {
            self.clear_singleton(key);
        }
        self.clear_pages();
    }

    pub fn holds(&self, key: SingletonKey) -> bool {
        match key {
            SingletonKey::SiteConfig => self.site_config.is_populated(),
            SingletonKey::FolderTree => self.folder_tree.is_populated(),
            SingletonKey::PageFolderTree => self.page_folder_tree.is_populated(),
            SingletonKey::FolderList => self.folder_list.is_populated(),
            SingletonKey::Version => self.version.is_populated(),
        }
    }

    pub fn holds_page(&self, id: &PageId) -> bool {
        rw_read(&self.pages, SOURCE, "holds_page")
            .entries
            .contains_key(id)
    }

    pub fn holds_content(&self, page_id: &PageId) -> bool {
        rw_read(&self.contents, SOURCE, "holds_content").contains_key(page_id)
    }

    pub fn holds_complete_listing(&self) -> bool {
        rw_read(&self.pages, SOURCE, "holds_complete_listing")
            .listed_at
            .is_some()
    }

    pub fn page_entry_count(&self) -> usize {
        rw_read(&self.pages, SOURCE, "page_entry_count")
            .entries
            .len()
    }
}
