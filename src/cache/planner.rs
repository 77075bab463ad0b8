//! Invalidation planning.
//!
//! Maps one mutation to the exact set of cache keys it invalidates plus any
//! values written through.

use std::fmt;

use crate::domain::entities::{ContentRecord, PageRecord};

use super::events::MutationEvent;
use super::keys::{CacheKey, SingletonKey};

#[derive(Debug, Default, PartialEq)]
pub struct InvalidationPlan {
    /// Keys to drop, in application order.
    pub invalidate: Vec<CacheKey>,
    pub upsert_page: Option<PageRecord>,
    pub upsert_content: Option<ContentRecord>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ invalidate: {}, upsert_page: {}, upsert_content: {} }}",
            self.invalidate.len(),
            self.upsert_page.is_some(),
            self.upsert_content.is_some(),
        )
    }
}

impl InvalidationPlan {
    pub fn from_event(event: MutationEvent) -> Self {
        match event {
            MutationEvent::FolderChanged { .. } => Self {
                invalidate: vec![
                    CacheKey::Singleton(SingletonKey::FolderList),
                    CacheKey::Singleton(SingletonKey::FolderTree),
                    CacheKey::Singleton(SingletonKey::PageFolderTree),
                ],
                ..Self::default()
            },
            MutationEvent::PageUpserted { page, content } => {
                let mut invalidate = vec![
                    CacheKey::Singleton(SingletonKey::FolderList),
                    CacheKey::Singleton(SingletonKey::FolderTree),
                ];
                if content.is_none() {
                    invalidate.push(CacheKey::Content(page.id.clone()));
                }
                Self {
                    invalidate,
                    upsert_page: Some(page),
                    upsert_content: content,
                }
            }
            MutationEvent::PageDeleted { page_id } => Self {
                invalidate: vec![
                    CacheKey::Page(page_id.clone()),
                    CacheKey::Content(page_id),
                    CacheKey::AllPages,
                    CacheKey::Singleton(SingletonKey::FolderList),
                    CacheKey::Singleton(SingletonKey::FolderTree),
                ],
                ..Self::default()
            },
            MutationEvent::SiteConfigUpdated => Self {
                invalidate: vec![CacheKey::Singleton(SingletonKey::SiteConfig)],
                ..Self::default()
            },
            MutationEvent::VersionUpdated => Self {
                invalidate: vec![CacheKey::Singleton(SingletonKey::Version)],
                ..Self::default()
            },
        }
    }

    pub fn touches(&self, key: &CacheKey) -> bool {
        self.invalidate.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::{FolderId, PageId, UserId};

    fn page(id: &str) -> PageRecord {
        let at = datetime!(2024-05-01 8:00 UTC);
        PageRecord {
            id: PageId::new(id),
            slug: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            folder_id: None,
            tags: Vec::new(),
            published: false,
            published_at: None,
            author_id: UserId::new("u1"),
            contributor_ids: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    fn singleton(key: SingletonKey) -> CacheKey {
        CacheKey::Singleton(key)
    }

    #[test]
    fn folder_changes_invalidate_every_folder_view() {
        let plan = InvalidationPlan::from_event(MutationEvent::FolderChanged {
            folder_id: FolderId::new("f1"),
        });
        assert!(plan.touches(&singleton(SingletonKey::FolderList)));
        assert!(plan.touches(&singleton(SingletonKey::FolderTree)));
        assert!(plan.touches(&singleton(SingletonKey::PageFolderTree)));
        assert!(!plan.touches(&CacheKey::AllPages));
        assert!(!plan.touches(&singleton(SingletonKey::SiteConfig)));
    }

    #[test]
    fn page_upsert_writes_through_and_spares_page_folder_tree() {
        let plan = InvalidationPlan::from_event(MutationEvent::PageUpserted {
            page: page("p1"),
            content: None,
        });
        assert!(plan.touches(&singleton(SingletonKey::FolderList)));
        assert!(plan.touches(&singleton(SingletonKey::FolderTree)));
        assert!(!plan.touches(&singleton(SingletonKey::PageFolderTree)));
        assert!(!plan.touches(&CacheKey::AllPages));
        assert!(plan.touches(&CacheKey::Content(PageId::new("p1"))));
        assert_eq!(plan.upsert_page.map(|page| page.id), Some(PageId::new("p1")));
    }

    #[test]
    fn page_upsert_with_content_keeps_the_blob() {
        let content = ContentRecord {
            page_id: PageId::new("p1"),
            body: "# Hello".to_string(),
            updated_at: datetime!(2024-05-01 8:00 UTC),
        };
        let plan = InvalidationPlan::from_event(MutationEvent::PageUpserted {
            page: page("p1"),
            content: Some(content.clone()),
        });
        assert!(!plan.touches(&CacheKey::Content(PageId::new("p1"))));
        assert_eq!(plan.upsert_content, Some(content));
    }

    #[test]
    fn page_delete_clears_the_whole_mapping() {
        let plan = InvalidationPlan::from_event(MutationEvent::PageDeleted {
            page_id: PageId::new("p9"),
        });
        assert!(plan.touches(&CacheKey::Page(PageId::new("p9"))));
        assert!(plan.touches(&CacheKey::AllPages));
        assert!(plan.touches(&singleton(SingletonKey::FolderList)));
        assert!(plan.touches(&singleton(SingletonKey::FolderTree)));
        assert!(plan.upsert_page.is_none());
    }

    #[test]
    fn singleton_updates_touch_only_themselves() {
        let site = InvalidationPlan::from_event(MutationEvent::SiteConfigUpdated);
        assert_eq!(site.invalidate, vec![singleton(SingletonKey::SiteConfig)]);

        let version = InvalidationPlan::from_event(MutationEvent::VersionUpdated);
        assert_eq!(version.invalidate, vec![singleton(SingletonKey::Version)]);
    }
}
