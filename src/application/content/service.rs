use std::sync::Arc;

use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

use crate::application::diffs::{DiffTracker, RevertOutcome};
use crate::application::error::AppError;
use crate::application::ranks::RankService;
use crate::application::render::{DiffHtmlOptions, DiffRenderer};
use crate::application::repos::Repositories;
use crate::application::version::{VersionInfo, VersionLookup};
use crate::cache::{CacheContext, CacheTrigger, Clock};
use crate::domain::entities::{DiffRecord, SiteConfigRecord};
use crate::domain::metadata::FieldChange;
use crate::domain::ranks::RankEntry;
use crate::domain::types::{PageId, Rank, RevertMode};

use super::types::{ContentOptions, SiteConfigInput};

/// Cache-aware entry point for every read and write.
///
/// Reads go through the [`CacheContext`]; every successful mutation fires the
/// matching [`CacheTrigger`] hook before returning.
pub struct ContentService {
    pub(super) repos: Repositories,
    pub(super) trigger: Arc<CacheTrigger>,
    pub(super) diffs: DiffTracker,
    pub(super) ranks: RankService,
    pub(super) version: Arc<dyn VersionLookup>,
    pub(super) options: ContentOptions,
    pub(super) clock: Arc<dyn Clock>,
}

impl ContentService {
    pub fn new(
        repos: Repositories,
        cache: Arc<CacheContext>,
        renderer: Arc<dyn DiffRenderer>,
        version: Arc<dyn VersionLookup>,
        options: ContentOptions,
    ) -> Self {
        let clock = cache.clock();
        let trigger = Arc::new(CacheTrigger::new(cache));
        let diffs = DiffTracker::new(
            Arc::clone(&repos.pages),
            Arc::clone(&repos.contents),
            Arc::clone(&repos.diffs),
            renderer,
            Arc::clone(&trigger),
            Arc::clone(&clock),
        );
        let ranks = RankService::new(
            Arc::clone(&repos.permissions),
            Arc::clone(&repos.identities),
        );

        Self {
            repos,
            trigger,
            diffs,
            ranks,
            version,
            options,
            clock,
        }
    }

    /// Cache hooks for explicit clears and out-of-band updates.
    pub fn cache(&self) -> &Arc<CacheTrigger> {
        &self.trigger
    }

    pub(super) fn context(&self) -> &CacheContext {
        self.trigger.context()
    }

    // ========================================================================
    // Site configuration
    // ========================================================================

    pub async fn site_config(&self) -> Result<Arc<SiteConfigRecord>, AppError> {
        let repo = &self.repos.site_config;
        self.context()
            .site_config(move || async move {
                repo.load_site_config()
                    .await?
                    .ok_or_else(|| AppError::not_found("site config"))
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn update_site_config(
        &self,
        input: SiteConfigInput,
    ) -> Result<SiteConfigRecord, AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::validation("site title must not be empty"));
        }
        if input.locale.trim().is_empty() {
            return Err(AppError::validation("site locale must not be empty"));
        }
        let base_url = Url::parse(input.base_url.trim())
            .map_err(|err| AppError::validation(format!("invalid base url: {err}")))?;
        if let Some(folder_id) = input.default_folder_id.as_ref()
            && self.repos.folders.find_folder(folder_id).await?.is_none()
        {
            return Err(AppError::validation(format!("unknown folder `{folder_id}`")));
        }

        let saved = self
            .repos
            .site_config
            .save_site_config(SiteConfigRecord {
                title: input.title.trim().to_string(),
                description: input.description,
                base_url: base_url.to_string(),
                locale: input.locale.trim().to_string(),
                default_folder_id: input.default_folder_id,
                updated_at: self.clock.now(),
            })
            .await?;

        self.trigger.site_config_updated();
        info!(title = %saved.title, "Site configuration updated");
        Ok(saved)
    }

    // ========================================================================
    // Version lookup
    // ========================================================================

    pub async fn latest_version(&self) -> Result<Arc<VersionInfo>, AppError> {
        let lookup = &self.version;
        let package = self.options.package.as_str();
        self.context()
            .version(move || async move {
                lookup
                    .latest_version(package)
                    .await
                    .map_err(|err| AppError::upstream(err.to_string()))
            })
            .await
    }

    /// Drop the cached version and look it up again.
    pub async fn refresh_version(&self) -> Result<Arc<VersionInfo>, AppError> {
        self.trigger.version_updated();
        self.latest_version().await
    }

    // ========================================================================
    // Ranks
    // ========================================================================

    pub async fn rank_members(&self, rank: Rank) -> Result<Vec<RankEntry>, AppError> {
        self.ranks.members(rank).await
    }

    pub async fn all_ranks(&self) -> Result<Vec<RankEntry>, AppError> {
        self.ranks.all().await
    }

    // ========================================================================
    // Revision history
    // ========================================================================

    pub async fn list_diffs(&self, page_id: &PageId) -> Result<Vec<DiffRecord>, AppError> {
        self.diffs.list(page_id).await
    }

    pub async fn diff(&self, id: Uuid) -> Result<DiffRecord, AppError> {
        self.diffs.find(id).await
    }

    pub async fn revert_to_diff(
        &self,
        id: Uuid,
        mode: RevertMode,
    ) -> Result<RevertOutcome, AppError> {
        self.diffs.revert_to_diff(id, mode).await
    }

    pub async fn clear_diffs(&self, page_id: &PageId) -> Result<u64, AppError> {
        self.diffs.clear(page_id).await
    }

    pub fn diff_html(&self, diff_text: &str, options: &DiffHtmlOptions) -> Result<String, AppError> {
        self.diffs.diff_html(diff_text, options)
    }

    pub async fn diff_changes(&self, id: Uuid) -> Result<Vec<FieldChange>, AppError> {
        self.diffs.changes_for(id).await
    }
}
