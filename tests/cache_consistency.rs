//! Read-through and invalidation behaviour of the content facade.

mod common;

use std::sync::Arc;

use folio::application::content::{PageUpdate, SiteConfigInput};
use folio::application::error::AppError;
use folio::application::repos::RepoError;
use folio::cache::{CacheConfig, SingletonKey};
use folio::domain::folders::find_node_by_path;
use time::Duration;

use common::{HarnessOptions, author, harness, harness_with};

#[tokio::test]
async fn fresh_entry_is_shared_and_expired_entry_refetches_once() {
    let h = harness();
    let guides = h.folder("guides", None).await;
    h.page("intro", Some(&guides.id), "hello").await;

    let reads_before = h.store.folder_reads();
    let first = h.service.folder_tree().await.expect("tree");
    let second = h.service.folder_tree().await.expect("tree");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(h.store.folder_reads(), reads_before + 1);

    // Exactly one lifetime old is still fresh.
    h.clock.advance(Duration::seconds(300));
    let third = h.service.folder_tree().await.expect("tree");
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(h.store.folder_reads(), reads_before + 1);

    h.clock.advance(Duration::seconds(1));
    let refreshed = h.service.folder_tree().await.expect("tree");
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(refreshed.as_ref(), first.as_ref());
    assert_eq!(h.store.folder_reads(), reads_before + 2);

    h.service.folder_tree().await.expect("tree");
    assert_eq!(h.store.folder_reads(), reads_before + 2);
}

#[tokio::test]
async fn page_entry_expires_after_its_lifetime() {
    let h = harness();
    let page = h.page("p1", None, "body").await;
    h.service.cache().clear_pages();

    let reads = h.store.page_reads();
    let first = h.service.page_summary(&page.record.id).await.expect("miss");
    assert_eq!(h.store.page_reads(), reads + 1);

    h.clock.advance(Duration::minutes(2));
    let second = h.service.page_summary(&page.record.id).await.expect("hit");
    assert_eq!(first, second);
    assert_eq!(h.store.page_reads(), reads + 1);

    h.clock.advance(Duration::minutes(4));
    h.service.page_summary(&page.record.id).await.expect("refetch");
    h.service.page_summary(&page.record.id).await.expect("hit");
    assert_eq!(h.store.page_reads(), reads + 2);
}

#[tokio::test]
async fn page_update_is_visible_in_the_next_folder_tree() {
    let h = harness();
    let guides = h.folder("guides", None).await;
    let page = h.page("intro", Some(&guides.id), "hello").await;

    let tree = h.service.folder_tree().await.expect("tree");
    assert!(find_node_by_path(&tree, &["guides", "intro"]).is_some());

    h.service
        .update_page(
            &page.record.id,
            &author(),
            PageUpdate {
                slug: Some("getting-started".to_string()),
                ..PageUpdate::default()
            },
            true,
        )
        .await
        .expect("update");

    let tree = h.service.folder_tree().await.expect("tree");
    assert!(find_node_by_path(&tree, &["guides", "intro"]).is_none());
    assert!(find_node_by_path(&tree, &["guides", "getting-started"]).is_some());
    assert_eq!(
        h.service.page_route(&page.record.id).await.expect("route"),
        "/guides/getting-started"
    );
}

#[tokio::test]
async fn page_delete_is_visible_everywhere() {
    let h = harness();
    let guides = h.folder("guides", None).await;
    let page = h.page("intro", Some(&guides.id), "hello").await;

    let summary = h.service.page_summary(&page.record.id).await.expect("summary");
    assert_eq!(summary.slug, "intro");
    h.service.folder_tree().await.expect("tree");

    h.service.delete_page(&page.record.id).await.expect("delete");

    let tree = h.service.folder_tree().await.expect("tree");
    assert!(find_node_by_path(&tree, &["guides", "intro"]).is_none());
    let err = h
        .service
        .page_summary(&page.record.id)
        .await
        .expect_err("deleted");
    assert!(err.is_not_found());
    assert!(!h.service.cache().context().holds_content(&page.record.id));
}

#[tokio::test]
async fn created_page_is_served_without_a_store_read() {
    let h = harness();
    let page = h.page("intro", None, "hello").await;

    let reads = h.store.page_reads();
    let document = h.service.page_document(&page.record.id).await.expect("document");
    assert_eq!(document.content, "hello");
    assert_eq!(h.store.page_reads(), reads);
    assert_eq!(h.store.content_reads(), 0);

    let by_slug = h
        .service
        .page_document_by_slug("intro")
        .await
        .expect("by slug");
    assert_eq!(by_slug.record.id, page.record.id);
    assert_eq!(h.store.page_reads(), reads);
}

#[tokio::test]
async fn disabled_cache_reads_through_every_time() {
    let h = harness_with(HarnessOptions {
        cache: CacheConfig::disabled(),
        ..HarnessOptions::default()
    });
    let page = h.page("intro", None, "hello").await;

    let reads = h.store.page_reads();
    h.service.page_summary(&page.record.id).await.expect("summary");
    h.service.page_summary(&page.record.id).await.expect("summary");
    assert_eq!(h.store.page_reads(), reads + 2);

    let folder_reads = h.store.folder_reads();
    h.service.page_folder_tree().await.expect("tree");
    h.service.page_folder_tree().await.expect("tree");
    assert_eq!(h.store.folder_reads(), folder_reads + 2);
    assert_eq!(h.service.cache().context().page_entry_count(), 0);
}

#[tokio::test]
async fn site_config_round_trip_and_invalidation() {
    let h = harness();
    let err = h.service.site_config().await.expect_err("not configured");
    assert!(matches!(err, AppError::NotFound { entity: "site config" }));

    let input = SiteConfigInput {
        title: "Docs".to_string(),
        description: "Manual".to_string(),
        base_url: "https://docs.example.test".to_string(),
        locale: "en".to_string(),
        default_folder_id: None,
    };
    h.service
        .update_site_config(input.clone())
        .await
        .expect("save");
    let loaded = h.service.site_config().await.expect("config");
    assert_eq!(loaded.title, "Docs");
    assert_eq!(loaded.base_url, "https://docs.example.test/");

    h.service
        .update_site_config(SiteConfigInput {
            title: "Handbook".to_string(),
            ..input
        })
        .await
        .expect("save");
    assert_eq!(h.service.site_config().await.expect("config").title, "Handbook");
}

#[tokio::test]
async fn invalid_site_config_is_rejected_before_any_write() {
    let h = harness();
    let err = h
        .service
        .update_site_config(SiteConfigInput {
            title: "Docs".to_string(),
            description: String::new(),
            base_url: "not a url".to_string(),
            locale: "en".to_string(),
            default_folder_id: None,
        })
        .await
        .expect_err("invalid url");
    assert!(err.is_validation());
    assert_eq!(h.store.site_config_reads(), 0);
}

#[tokio::test]
async fn version_uses_its_own_lifetime() {
    let h = harness();

    let first = h.service.latest_version().await.expect("version");
    assert_eq!(first.version, "1.0.1");

    // Past the page lifetime but well inside the version lifetime.
    h.clock.advance(Duration::minutes(30));
    let cached = h.service.latest_version().await.expect("version");
    assert!(Arc::ptr_eq(&first, &cached));
    assert_eq!(h.version.calls(), 1);

    h.clock.advance(Duration::minutes(31));
    let refreshed = h.service.latest_version().await.expect("version");
    assert_eq!(refreshed.version, "1.0.2");

    let forced = h.service.refresh_version().await.expect("version");
    assert_eq!(forced.version, "1.0.3");
    assert_eq!(h.version.calls(), 3);
}

#[tokio::test]
async fn explicit_clear_forces_a_refetch() {
    let h = harness();
    h.folder("guides", None).await;

    h.service.folder_list().await.expect("list");
    let reads = h.store.folder_reads();
    h.service.folder_list().await.expect("list");
    assert_eq!(h.store.folder_reads(), reads);

    assert!(h.service.cache().clear_singleton(SingletonKey::FolderList));
    h.service.folder_list().await.expect("list");
    assert_eq!(h.store.folder_reads(), reads + 1);

    h.service.cache().clear_all();
    assert!(!h.service.cache().context().holds(SingletonKey::FolderList));
}

#[tokio::test]
async fn store_outage_surfaces_as_data_access_error() {
    let h = harness();
    h.store.set_offline(true);

    let err = h.service.folder_tree().await.expect_err("offline");
    assert!(matches!(err, AppError::DataAccess(RepoError::Unavailable(_))));
    assert!(!h.service.cache().context().holds(SingletonKey::FolderTree));

    h.store.set_offline(false);
    h.service.folder_tree().await.expect("back online");
}
