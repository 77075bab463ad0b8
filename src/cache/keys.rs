//! Cache key definitions.

use std::fmt;

use crate::domain::types::PageId;

/// Entities cached under one fixed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingletonKey {
    SiteConfig,
    /// Navigation tree: folders with their pages attached as leaves.
    FolderTree,
    /// Folders-only hierarchy used when assigning pages to folders.
    PageFolderTree,
    FolderList,
    Version,
}

impl SingletonKey {
    pub const ALL: [SingletonKey; 5] = [
        SingletonKey::SiteConfig,
        SingletonKey::FolderTree,
        SingletonKey::PageFolderTree,
        SingletonKey::FolderList,
        SingletonKey::Version,
    ];

    /// Metric and log label.
    pub fn as_str(self) -> &'static str {
        match self {
            SingletonKey::SiteConfig => "site_config",
            SingletonKey::FolderTree => "folder_tree",
            SingletonKey::PageFolderTree => "page_folder_tree",
            SingletonKey::FolderList => "folder_list",
            SingletonKey::Version => "version",
        }
    }
}

impl fmt::Display for SingletonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SingletonKey {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        SingletonKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or(())
    }
}

/// Anything an invalidation can target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Singleton(SingletonKey),
    Page(PageId),
    Content(PageId),
    /// Every page and content entry plus the complete-listing marker.
    AllPages,
}
