use serde::{Deserialize, Serialize};

use crate::domain::types::{FolderId, PageId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPage {
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    pub author_id: UserId,
    #[serde(default)]
    pub body: String,
}

/// Partial page update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageUpdate {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` moves the page to the root.
    pub folder_id: Option<Option<FolderId>>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFolder {
    pub name: String,
    pub parent: Option<FolderId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderUpdate {
    pub name: Option<String>,
    /// `Some(None)` moves the folder to the root.
    pub parent: Option<Option<FolderId>>,
}

/// What a recursive folder delete removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FolderDeletion {
    pub folders: Vec<FolderId>,
    pub pages: Vec<PageId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfigInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub base_url: String,
    pub locale: String,
    pub default_folder_id: Option<FolderId>,
}

/// Tunables of the content facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentOptions {
    /// Retention limit for per-page diffs.
    pub max_diffs: usize,
    /// Package whose latest published version `latest_version` reports.
    pub package: String,
}
