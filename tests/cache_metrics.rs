mod common;

use std::collections::HashSet;

use folio::cache::{METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS};
use folio::infra::telemetry;
use metrics_util::debugging::DebuggingRecorder;

use common::harness;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let h = harness();
    let docs = h.folder("docs", None).await;

    // miss, then hit
    h.service.folder_tree().await.expect("tree");
    h.service.folder_tree().await.expect("tree");
    // invalidation
    h.folder("guides", Some(&docs.id)).await;

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_INVALIDATE] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let labelled = snapshot.iter().any(|(composite_key, _, _, _)| {
        composite_key.key().name() == METRIC_CACHE_HIT
            && composite_key
                .key()
                .labels()
                .any(|label| label.key() == "entity" && label.value() == "folder_tree")
    });
    assert!(labelled, "hit counter should carry the entity label");
}
