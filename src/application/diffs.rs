//! Revision history: bounded per-page diffs that can be reverted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::render::{DiffHtmlOptions, DiffRenderer};
use crate::application::repos::{ContentRepo, DiffsRepo, NewDiffParams, PagesRepo};
use crate::cache::{CacheTrigger, Clock};
use crate::domain::entities::{ContentRecord, DiffRecord, PageMetadata, PageRecord};
use crate::domain::error::DomainError;
use crate::domain::metadata::{FieldChange, metadata_differences};
use crate::domain::types::{PageId, RevertMode, UserId};

pub const DEFAULT_MAX_DIFFS: usize = 50;

/// Before and after values of one edited aspect of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change<T> {
    pub start: T,
    pub end: T,
}

/// Everything an edit touched: the content blob and the page metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageChange {
    pub content: Change<String>,
    pub metadata: Change<PageMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevertOutcome {
    pub diff: DiffRecord,
    pub page: PageRecord,
    pub content: Option<ContentRecord>,
    /// Number of newer diffs deleted by the revert.
    pub discarded: u64,
}

/// A rendered edit waiting to be written to the history.
#[derive(Debug, Clone)]
pub struct PreparedDiff {
    params: NewDiffParams,
    max_diffs: usize,
}

pub struct DiffTracker {
    pages: Arc<dyn PagesRepo>,
    contents: Arc<dyn ContentRepo>,
    diffs: Arc<dyn DiffsRepo>,
    renderer: Arc<dyn DiffRenderer>,
    trigger: Arc<CacheTrigger>,
    clock: Arc<dyn Clock>,
}

impl DiffTracker {
    pub fn new(
        pages: Arc<dyn PagesRepo>,
        contents: Arc<dyn ContentRepo>,
        diffs: Arc<dyn DiffsRepo>,
        renderer: Arc<dyn DiffRenderer>,
        trigger: Arc<CacheTrigger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pages,
            contents,
            diffs,
            renderer,
            trigger,
            clock,
        }
    }

    /// Record an edit, evicting the oldest diffs so at most `max_diffs` remain.
    pub async fn insert(
        &self,
        user_id: &UserId,
        page_id: &PageId,
        change: &PageChange,
        max_diffs: usize,
    ) -> Result<DiffRecord, AppError> {
        let prepared = self.prepare(user_id, page_id, change, max_diffs)?;
        self.record(prepared).await
    }

    /// Render and validate an edit without touching the history.
    ///
    /// Size limits and snapshot encoding fail here, so callers can prepare
    /// before writing the page and [`record`](Self::record) afterwards.
    pub fn prepare(
        &self,
        user_id: &UserId,
        page_id: &PageId,
        change: &PageChange,
        max_diffs: usize,
    ) -> Result<PreparedDiff, AppError> {
        if max_diffs == 0 {
            return Err(AppError::validation("diff retention limit must be at least 1"));
        }

        let diff_text = self.renderer.unified_diff(
            page_id.as_str(),
            &change.content.start,
            &change.content.end,
        )?;
        let metadata_snapshot = metadata_snapshot(&change.metadata)?;

        Ok(PreparedDiff {
            params: NewDiffParams {
                page_id: page_id.clone(),
                user_id: user_id.clone(),
                timestamp: self.clock.now(),
                diff_text,
                content_snapshot_start: change.content.start.clone(),
                metadata_snapshot,
            },
            max_diffs,
        })
    }

    /// Persist a prepared diff, evicting the oldest ones first.
    #[instrument(
        skip(self, prepared),
        fields(page_id = %prepared.params.page_id, user_id = %prepared.params.user_id)
    )]
    pub async fn record(&self, prepared: PreparedDiff) -> Result<DiffRecord, AppError> {
        let PreparedDiff { params, max_diffs } = prepared;

        let existing = self.diffs.list_for_page(&params.page_id).await?;
        let excess = (existing.len() + 1).saturating_sub(max_diffs);
        for stale in existing.iter().take(excess) {
            self.diffs.delete_diff(stale.id).await?;
        }

        let record = self.diffs.insert_diff(params).await?;

        info!(
            diff_id = %record.id,
            evicted = excess,
            retained = existing.len() - excess + 1,
            "Recorded page diff"
        );
        Ok(record)
    }

    /// Diffs of a page, oldest first.
    pub async fn list(&self, page_id: &PageId) -> Result<Vec<DiffRecord>, AppError> {
        Ok(self.diffs.list_for_page(page_id).await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<DiffRecord, AppError> {
        self.diffs
            .find_diff(id)
            .await?
            .ok_or_else(|| AppError::not_found("diff"))
    }

    /// Restore the page to the state captured by diff `id`.
    ///
    /// Every diff of the page newer than the target is deleted; the target
    /// and older diffs stay.
    #[instrument(skip(self), fields(diff_id = %id, mode = ?mode))]
    pub async fn revert_to_diff(&self, id: Uuid, mode: RevertMode) -> Result<RevertOutcome, AppError> {
        let diff = self.find(id).await?;
        let page_id = diff.page_id.clone();
        let now = self.clock.now();

        let mut page = self
            .pages
            .find_by_id(&page_id)
            .await?
            .ok_or_else(|| AppError::not_found("page"))?;

        if mode.restores_data() {
            let mut metadata = snapshot_start(&diff)?;
            metadata.updated_at = now;
            page = self.pages.update_metadata(&page_id, metadata).await?;
        }

        let content = if mode.restores_content() {
            Some(
                self.contents
                    .upsert_content(&page_id, &diff.content_snapshot_start, now)
                    .await?,
            )
        } else {
            None
        };

        let discarded = self.diffs.delete_newer_than(&page_id, diff.timestamp).await?;

        self.trigger.page_upserted(page.clone(), content.clone());

        info!(page_id = %page_id, discarded, "Reverted page to diff");
        Ok(RevertOutcome {
            diff,
            page,
            content,
            discarded,
        })
    }

    /// Delete the whole history of a page.
    pub async fn clear(&self, page_id: &PageId) -> Result<u64, AppError> {
        let removed = self.diffs.delete_for_page(page_id).await?;
        info!(page_id = %page_id, removed, "Cleared page diffs");
        Ok(removed)
    }

    pub fn diff_html(&self, diff_text: &str, options: &DiffHtmlOptions) -> Result<String, AppError> {
        Ok(self.renderer.render_html(diff_text, options)?)
    }

    /// Metadata fields changed by the edit stored in diff `id`.
    pub async fn changes_for(&self, id: Uuid) -> Result<Vec<FieldChange>, AppError> {
        let diff = self.find(id).await?;
        let start = diff.metadata_snapshot.get("start").unwrap_or(&Value::Null);
        let end = diff.metadata_snapshot.get("end").unwrap_or(&Value::Null);
        Ok(metadata_differences(start, end))
    }
}

fn metadata_snapshot(metadata: &Change<PageMetadata>) -> Result<Value, AppError> {
    let start = serde_json::to_value(&metadata.start)
        .map_err(|err| AppError::unexpected(format!("serialize metadata snapshot: {err}")))?;
    let end = serde_json::to_value(&metadata.end)
        .map_err(|err| AppError::unexpected(format!("serialize metadata snapshot: {err}")))?;
    Ok(json!({ "start": start, "end": end }))
}

fn snapshot_start(diff: &DiffRecord) -> Result<PageMetadata, AppError> {
    let start = diff
        .metadata_snapshot
        .get("start")
        .cloned()
        .ok_or_else(|| DomainError::invariant(format!("diff {} has no metadata start", diff.id)))?;
    serde_json::from_value(start).map_err(|err| {
        warn!(diff_id = %diff.id, error = %err, "Stored metadata snapshot is unreadable");
        AppError::from(DomainError::invariant(format!(
            "diff {} metadata snapshot is malformed: {err}",
            diff.id
        )))
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::cache::{CacheConfig, CacheContext, ManualClock};
    use crate::domain::types::FolderId;
    use crate::infra::diff::SimilarDiffRenderer;
    use crate::infra::memory::InMemoryStore;

    fn tracker(store: &Arc<InMemoryStore>, clock: &Arc<ManualClock>) -> DiffTracker {
        let clock: Arc<dyn Clock> = clock.clone();
        let cache = Arc::new(CacheContext::with_clock(
            CacheConfig::default(),
            Arc::clone(&clock),
        ));
        DiffTracker::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(SimilarDiffRenderer::new(64)),
            Arc::new(CacheTrigger::new(cache)),
            clock,
        )
    }

    fn edit(start: &str, end: &str) -> PageChange {
        PageChange {
            content: Change {
                start: start.to_string(),
                end: end.to_string(),
            },
            metadata: Change {
                start: metadata("Title"),
                end: metadata("Title"),
            },
        }
    }

    fn metadata(title: &str) -> PageMetadata {
        PageMetadata {
            slug: "intro".to_string(),
            title: title.to_string(),
            description: String::new(),
            folder_id: Some(FolderId::new("f1")),
            tags: vec!["guide".to_string()],
            published: true,
            published_at: None,
            author_id: UserId::new("u1"),
            contributor_ids: Vec::new(),
            updated_at: datetime!(2024-02-01 10:00 UTC),
        }
    }

    #[test]
    fn snapshot_round_trips_start_metadata() {
        let change = Change {
            start: metadata("Before"),
            end: metadata("After"),
        };
        let snapshot = metadata_snapshot(&change).expect("snapshot");
        let diff = DiffRecord {
            id: Uuid::new_v4(),
            page_id: PageId::new("p1"),
            user_id: UserId::new("u1"),
            timestamp: datetime!(2024-02-01 10:00 UTC),
            diff_text: String::new(),
            content_snapshot_start: String::new(),
            metadata_snapshot: snapshot,
        };

        assert_eq!(snapshot_start(&diff).expect("start"), change.start);
    }

    #[test]
    fn malformed_snapshot_is_an_invariant_error() {
        let diff = DiffRecord {
            id: Uuid::new_v4(),
            page_id: PageId::new("p1"),
            user_id: UserId::new("u1"),
            timestamp: datetime!(2024-02-01 10:00 UTC),
            diff_text: String::new(),
            content_snapshot_start: String::new(),
            metadata_snapshot: json!({ "start": { "title": 7 } }),
        };

        let error = snapshot_start(&diff).expect_err("malformed");
        assert!(matches!(error, AppError::Domain(DomainError::Invariant { .. })));
    }

    #[tokio::test]
    async fn insert_evicts_oldest_beyond_retention() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(datetime!(2024-02-01 10:00 UTC)));
        let tracker = tracker(&store, &clock);
        let page_id = PageId::new("p1");
        let user_id = UserId::new("u1");

        for (start, end) in [("a\n", "b\n"), ("b\n", "c\n"), ("c\n", "d\n")] {
            tracker
                .insert(&user_id, &page_id, &edit(start, end), 2)
                .await
                .expect("insert");
            clock.advance(time::Duration::minutes(1));
        }

        let starts: Vec<String> = tracker
            .list(&page_id)
            .await
            .expect("list")
            .into_iter()
            .map(|diff| diff.content_snapshot_start)
            .collect();
        assert_eq!(starts, ["b\n", "c\n"]);
    }

    #[tokio::test]
    async fn prepare_rejects_oversized_edits_before_any_write() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(datetime!(2024-02-01 10:00 UTC)));
        let tracker = tracker(&store, &clock);
        let page_id = PageId::new("p1");

        let prepared = tracker
            .prepare(&UserId::new("u1"), &page_id, &edit("a\n", "b\n"), 5)
            .expect("prepare");
        assert!(tracker.list(&page_id).await.expect("list").is_empty());
        tracker.record(prepared).await.expect("record");
        assert_eq!(tracker.list(&page_id).await.expect("list").len(), 1);

        let oversized = "x".repeat(100);
        assert!(
            tracker
                .prepare(&UserId::new("u1"), &page_id, &edit("", &oversized), 5)
                .is_err()
        );
        assert_eq!(tracker.list(&page_id).await.expect("list").len(), 1);
    }
}
