use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::diffs::{Change, PageChange};
use crate::application::error::AppError;
use crate::application::pagination::{OffsetPage, PageRequest};
use crate::application::repos::{CreatePageParams, PageQueryFilter, listing_order};
use crate::domain::entities::{PageDocument, PageMetadata, PageRecord, PageSummary};
use crate::domain::folders::route_for;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async, validate_slug};
use crate::domain::types::{FolderId, PageId, UserId};

use super::service::ContentService;
use super::types::{NewPage, PageUpdate};

impl ContentService {
    // ========================================================================
    // Reads
    // ========================================================================

    async fn cached_page(&self, id: &PageId) -> Result<Arc<PageRecord>, AppError> {
        let repo = &self.repos.pages;
        self.context()
            .page(id, move || async move { repo.find_by_id(id).await })
            .await?
            .ok_or_else(|| AppError::not_found("page"))
    }

    async fn cached_page_by_slug(&self, slug: &str) -> Result<Arc<PageRecord>, AppError> {
        let repo = &self.repos.pages;
        self.context()
            .page_by_slug(slug, move || async move { repo.find_by_slug(slug).await })
            .await?
            .ok_or_else(|| AppError::not_found("page"))
    }

    async fn document_for(&self, record: Arc<PageRecord>) -> Result<PageDocument, AppError> {
        let repo = &self.repos.contents;
        let page_id = &record.id;
        let content = self
            .context()
            .content(page_id, move || async move { repo.find_content(page_id).await })
            .await?;

        Ok(PageDocument {
            record: record.as_ref().clone(),
            content: content.map(|content| content.body.clone()).unwrap_or_default(),
        })
    }

    /// Summary projection of a page.
    pub async fn page_summary(&self, id: &PageId) -> Result<PageSummary, AppError> {
        Ok(self.cached_page(id).await?.summary())
    }

    /// Full projection: record plus content blob.
    pub async fn page_document(&self, id: &PageId) -> Result<PageDocument, AppError> {
        let record = self.cached_page(id).await?;
        self.document_for(record).await
    }

    pub async fn page_summary_by_slug(&self, slug: &str) -> Result<PageSummary, AppError> {
        Ok(self.cached_page_by_slug(slug).await?.summary())
    }

    pub async fn page_document_by_slug(&self, slug: &str) -> Result<PageDocument, AppError> {
        let record = self.cached_page_by_slug(slug).await?;
        self.document_for(record).await
    }

    /// One window of the page listing, most recently updated first.
    ///
    /// With caching enabled the window is cut from the complete listing held
    /// in the page mapping, which is loaded in full on a miss.
    #[instrument(skip(self))]
    pub async fn list_pages(
        &self,
        filter: &PageQueryFilter,
        request: PageRequest,
    ) -> Result<OffsetPage<PageSummary>, AppError> {
        let window = request.validate()?;

        if !self.context().is_enabled() {
            let (records, total) = futures::try_join!(
                self.repos.pages.list_pages(filter, window),
                self.repos.pages.count_pages(filter)
            )?;
            let items = records.iter().map(PageRecord::summary).collect();
            return Ok(OffsetPage::new(items, total, window));
        }

        let repo = &self.repos.pages;
        let listing = self
            .context()
            .page_listing(move || async move { repo.list_all().await })
            .await?;

        let mut matching: Vec<&PageRecord> = listing
            .iter()
            .map(Arc::as_ref)
            .filter(|page| filter.matches(page))
            .collect();
        matching.sort_by(|lhs, rhs| listing_order(lhs, rhs));

        let total = matching.len() as u64;
        let items = window
            .slice(&matching)
            .iter()
            .map(|page| page.summary())
            .collect();
        Ok(OffsetPage::new(items, total, window))
    }

    /// `/`-joined route of a page through the folder tree.
    pub async fn page_route(&self, id: &PageId) -> Result<String, AppError> {
        let tree = self.folder_tree().await?;
        route_for(&tree, id.as_str()).ok_or_else(|| AppError::not_found("page"))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_page(&self, input: NewPage) -> Result<PageDocument, AppError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("page title must not be empty"));
        }
        self.ensure_folder_exists(input.folder_id.as_ref()).await?;

        let slug = match input.slug {
            Some(slug) => {
                self.ensure_slug_available(&slug, None).await?;
                slug
            }
            None => self.unique_slug(&title).await?,
        };

        let now = self.clock.now();
        let page_id = PageId::new(uuid::Uuid::new_v4().to_string());
        let page = self
            .repos
            .pages
            .create_page(CreatePageParams {
                id: page_id.clone(),
                metadata: PageMetadata {
                    slug,
                    title,
                    description: input.description,
                    folder_id: input.folder_id,
                    tags: input.tags,
                    published: input.published,
                    published_at: input.published.then_some(now),
                    author_id: input.author_id,
                    contributor_ids: Vec::new(),
                    updated_at: now,
                },
                created_at: now,
            })
            .await?;
        let content = self
            .repos
            .contents
            .upsert_content(&page_id, &input.body, now)
            .await?;

        self.trigger.page_upserted(page.clone(), Some(content.clone()));
        info!(page_id = %page.id, slug = %page.slug, "Page created");

        Ok(PageDocument {
            record: page,
            content: content.body,
        })
    }

    /// Apply `update` to a page, recording a diff when `track_diff` is set.
    ///
    /// The diff is rendered before the page is written, so an oversized edit
    /// is rejected without touching stored state. It joins the history only
    /// once both page writes have succeeded.
    #[instrument(skip(self, update), fields(page_id = %id, actor = %actor))]
    pub async fn update_page(
        &self,
        id: &PageId,
        actor: &UserId,
        update: PageUpdate,
        track_diff: bool,
    ) -> Result<PageDocument, AppError> {
        let current = self
            .repos
            .pages
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("page"))?;
        let current_body = self
            .repos
            .contents
            .find_content(id)
            .await?
            .map(|content| content.body)
            .unwrap_or_default();

        let now = self.clock.now();
        let before = current.metadata();
        let mut after = before.clone();

        if let Some(slug) = update.slug
            && slug != before.slug
        {
            self.ensure_slug_available(&slug, Some(id)).await?;
            after.slug = slug;
        }
        if let Some(title) = update.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::validation("page title must not be empty"));
            }
            after.title = title;
        }
        if let Some(description) = update.description {
            after.description = description;
        }
        if let Some(folder_id) = update.folder_id {
            self.ensure_folder_exists(folder_id.as_ref()).await?;
            after.folder_id = folder_id;
        }
        if let Some(tags) = update.tags {
            after.tags = tags;
        }
        if let Some(published) = update.published {
            if published && !before.published {
                after.published_at = Some(now);
            }
            after.published = published;
        }
        if actor != &before.author_id && !after.contributor_ids.contains(actor) {
            after.contributor_ids.push(actor.clone());
        }
        after.updated_at = now;

        let body = update.body.unwrap_or_else(|| current_body.clone());

        let prepared = if track_diff {
            let change = PageChange {
                content: Change {
                    start: current_body,
                    end: body.clone(),
                },
                metadata: Change {
                    start: before,
                    end: after.clone(),
                },
            };
            Some(self.diffs.prepare(actor, id, &change, self.options.max_diffs)?)
        } else {
            None
        };

        let page = self.repos.pages.update_metadata(id, after).await?;
        let content = match self.repos.contents.upsert_content(id, &body, now).await {
            Ok(content) => content,
            Err(err) => {
                self.trigger.page_upserted(page, None);
                return Err(err.into());
            }
        };

        self.trigger.page_upserted(page.clone(), Some(content.clone()));
        if let Some(prepared) = prepared {
            self.diffs.record(prepared).await?;
        }
        info!(slug = %page.slug, track_diff, "Page updated");

        Ok(PageDocument {
            record: page,
            content: content.body,
        })
    }

    /// Delete a page together with its content blob and revision history.
    #[instrument(skip(self))]
    pub async fn delete_page(&self, id: &PageId) -> Result<(), AppError> {
        if self.repos.pages.find_by_id(id).await?.is_none() {
            return Err(AppError::not_found("page"));
        }
        let outcome = self.remove_page_rows(id).await;
        // Content or diffs may already be gone even when the page row is not.
        self.trigger.page_deleted(id);
        outcome?;
        info!(page_id = %id, "Page deleted");
        Ok(())
    }

    pub(super) async fn remove_page_rows(&self, id: &PageId) -> Result<(), AppError> {
        self.repos.diffs.delete_for_page(id).await?;
        self.repos.contents.delete_content(id).await?;
        self.repos.pages.delete_page(id).await?;
        Ok(())
    }

    // ========================================================================
    // Validation helpers
    // ========================================================================

    pub(super) async fn ensure_folder_exists(
        &self,
        folder_id: Option<&FolderId>,
    ) -> Result<(), AppError> {
        let Some(folder_id) = folder_id else {
            return Ok(());
        };
        if self.repos.folders.find_folder(folder_id).await?.is_none() {
            return Err(AppError::validation(format!("unknown folder `{folder_id}`")));
        }
        Ok(())
    }

    async fn ensure_slug_available(
        &self,
        slug: &str,
        owner: Option<&PageId>,
    ) -> Result<(), AppError> {
        validate_slug(slug).map_err(|err| AppError::validation(err.to_string()))?;
        match self.repos.pages.find_by_slug(slug).await? {
            Some(existing) if Some(&existing.id) != owner => Err(AppError::validation(format!(
                "slug `{slug}` is already in use"
            ))),
            _ => Ok(()),
        }
    }

    async fn unique_slug(&self, title: &str) -> Result<String, AppError> {
        let repo = &self.repos.pages;
        generate_unique_slug_async(title, move |candidate| async move {
            Ok::<_, crate::application::repos::RepoError>(
                repo.find_by_slug(&candidate).await?.is_none(),
            )
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(err) => AppError::validation(err.to_string()),
            SlugAsyncError::Predicate(err) => AppError::from(err),
        })
    }
}
