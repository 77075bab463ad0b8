use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::application::error::AppError;
use crate::application::repos::{CreateFolderParams, UpdateFolderParams};
use crate::domain::entities::{FolderRecord, PageRecord, PageSummary};
use crate::domain::folders::{
    FolderNode, build_page_folder_tree, build_tree, subtree, would_create_cycle,
};
use crate::domain::types::FolderId;

use super::service::ContentService;
use super::types::{FolderDeletion, FolderUpdate, NewFolder};

impl ContentService {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Navigation tree: folders with their pages attached as leaves.
    pub async fn folder_tree(&self) -> Result<Arc<Vec<FolderNode>>, AppError> {
        let folders = &self.repos.folders;
        let pages = &self.repos.pages;
        self.context()
            .folder_tree(move || async move {
                let (records, page_rows) =
                    futures::try_join!(folders.list_folders(), pages.list_all())?;
                let summaries: Vec<PageSummary> =
                    page_rows.iter().map(PageRecord::summary).collect();
                Ok::<_, AppError>(build_page_folder_tree(&records, &summaries))
            })
            .await
    }

    /// Folders-only hierarchy.
    pub async fn page_folder_tree(&self) -> Result<Arc<Vec<FolderNode>>, AppError> {
        let folders = &self.repos.folders;
        self.context()
            .page_folder_tree(move || async move {
                let records = folders.list_folders().await?;
                Ok::<_, AppError>(build_tree(&records))
            })
            .await
    }

    pub async fn folder_list(&self) -> Result<Arc<Vec<FolderRecord>>, AppError> {
        let folders = &self.repos.folders;
        self.context()
            .folder_list(move || async move { folders.list_folders().await.map_err(AppError::from) })
            .await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn create_folder(&self, input: NewFolder) -> Result<FolderRecord, AppError> {
        let name = validate_folder_name(&input.name)?;
        self.ensure_folder_exists(input.parent.as_ref()).await?;

        let folder = self
            .repos
            .folders
            .create_folder(CreateFolderParams {
                id: FolderId::new(uuid::Uuid::new_v4().to_string()),
                name,
                parent: input.parent,
                created_at: self.clock.now(),
            })
            .await?;

        self.trigger.folder_changed(&folder.id);
        info!(folder_id = %folder.id, name = %folder.name, "Folder created");
        Ok(folder)
    }

    /// Rename and/or move a folder. Moving a folder under itself or one of its
    /// descendants is rejected.
    #[instrument(skip(self))]
    pub async fn update_folder(
        &self,
        id: &FolderId,
        update: FolderUpdate,
    ) -> Result<FolderRecord, AppError> {
        let records = self.repos.folders.list_folders().await?;
        let current = records
            .iter()
            .find(|record| &record.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("folder"))?;

        let name = match update.name {
            Some(name) => validate_folder_name(&name)?,
            None => current.name.clone(),
        };
        let parent = match update.parent {
            Some(parent) => {
                if let Some(parent_id) = parent.as_ref()
                    && !records.iter().any(|record| &record.id == parent_id)
                {
                    return Err(AppError::validation(format!("unknown folder `{parent_id}`")));
                }
                if would_create_cycle(&records, id, parent.as_ref()) {
                    return Err(AppError::validation(format!(
                        "moving folder `{id}` there would create a cycle"
                    )));
                }
                parent
            }
            None => current.parent.clone(),
        };

        let folder = self
            .repos
            .folders
            .update_folder(UpdateFolderParams {
                id: id.clone(),
                name,
                parent,
                updated_at: self.clock.now(),
            })
            .await?;

        self.trigger.folder_changed(&folder.id);
        info!(folder_id = %folder.id, "Folder updated");
        Ok(folder)
    }

    /// Delete a folder, every folder beneath it and every page they hold.
    #[instrument(skip(self))]
    pub async fn delete_folder(&self, id: &FolderId) -> Result<FolderDeletion, AppError> {
        let records = self.repos.folders.list_folders().await?;
        if !records.iter().any(|record| &record.id == id) {
            return Err(AppError::not_found("folder"));
        }

        let tree = build_tree(&records);
        let mut folders: Vec<FolderId> = subtree(&tree, id.as_str())
            .into_iter()
            .map(|node| FolderId::new(node.id.as_str()))
            .collect();
        if folders.is_empty() {
            warn!(folder_id = %id, "Folder is not reachable from a root; deleting it alone");
            folders.push(id.clone());
        }

        let pages = self.repos.pages.list_in_folders(&folders).await?;
        let mut touched_pages = Vec::with_capacity(pages.len());
        let mut outcome: Result<(), AppError> = Ok(());
        for page in pages {
            touched_pages.push(page.id.clone());
            if let Err(err) = self.remove_page_rows(&page.id).await {
                outcome = Err(err);
                break;
            }
        }
        if outcome.is_ok()
            && let Err(err) = self.repos.folders.delete_folders(&folders).await
        {
            outcome = Err(AppError::from(err));
        }

        // Rows removed before a failure are gone from the store too.
        self.trigger.folder_changed(id);
        for page_id in &touched_pages {
            self.trigger.page_deleted(page_id);
        }
        if let Err(err) = outcome {
            warn!(
                folder_id = %id,
                pages = touched_pages.len(),
                error = %err,
                "Folder delete failed partway"
            );
            return Err(err);
        }

        info!(
            folder_id = %id,
            folders = folders.len(),
            pages = touched_pages.len(),
            "Folder deleted"
        );
        Ok(FolderDeletion {
            folders,
            pages: touched_pages,
        })
    }
}

fn validate_folder_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("folder name must not be empty"));
    }
    if name.contains('/') {
        return Err(AppError::validation("folder name must not contain `/`"));
    }
    Ok(name.to_string())
}
