//! Cache trigger service.
//!
//! Write paths call these hooks after a successful mutation. Each hook turns
//! the mutation into an [`InvalidationPlan`] and applies it synchronously, so
//! the next read in the same call chain observes the invalidation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::entities::{ContentRecord, PageRecord};
use crate::domain::types::{FolderId, PageId};

use super::events::MutationEvent;
use super::keys::{CacheKey, SingletonKey};
use super::planner::InvalidationPlan;
use super::store::CacheContext;

pub struct CacheTrigger {
    cache: Arc<CacheContext>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<CacheContext>) -> Self {
        Self { cache }
    }

    pub fn context(&self) -> &Arc<CacheContext> {
        &self.cache
    }

    /// Plan and apply the invalidation for one mutation.
    pub fn trigger(&self, event: MutationEvent) {
        if !self.cache.is_enabled() {
            debug!(event_kind = event.kind(), "Cache trigger skipped: cache disabled");
            return;
        }

        let description = event.to_string();
        let plan = InvalidationPlan::from_event(event);
        info!(event = %description, plan = %plan, "Applying cache invalidation");
        self.apply(plan);
    }

    fn apply(&self, plan: InvalidationPlan) {
        for key in &plan.invalidate {
            match key {
                CacheKey::Singleton(singleton) => {
                    self.cache.clear_singleton(*singleton);
                }
                CacheKey::Page(id) => {
                    self.cache.remove_page(id);
                }
                CacheKey::Content(id) => {
                    self.cache.remove_content(id);
                }
                CacheKey::AllPages => self.cache.clear_pages(),
            }
        }

        if let Some(page) = plan.upsert_page {
            self.cache.upsert_page(page);
        }
        if let Some(content) = plan.upsert_content {
            self.cache.upsert_content(content);
        }
    }

    pub fn folder_changed(&self, folder_id: &FolderId) {
        self.trigger(MutationEvent::FolderChanged {
            folder_id: folder_id.clone(),
        });
    }

    /// A page was created or updated.
    pub fn page_upserted(&self, page: PageRecord, content: Option<ContentRecord>) {
        self.trigger(MutationEvent::PageUpserted { page, content });
    }

    pub fn page_deleted(&self, page_id: &PageId) {
        self.trigger(MutationEvent::PageDeleted {
            page_id: page_id.clone(),
        });
    }

    pub fn site_config_updated(&self) {
        self.trigger(MutationEvent::SiteConfigUpdated);
    }

    pub fn version_updated(&self) {
        self.trigger(MutationEvent::VersionUpdated);
    }

    pub fn clear_all(&self) {
        info!("Clearing every cache entry");
        self.cache.clear();
    }

    pub fn clear_singleton(&self, key: SingletonKey) -> bool {
        let removed = self.cache.clear_singleton(key);
        info!(key = %key, removed, "Cleared cache singleton");
        removed
    }

    pub fn clear_pages(&self) {
        info!("Clearing cached pages");
        self.cache.clear_pages();
    }
}
