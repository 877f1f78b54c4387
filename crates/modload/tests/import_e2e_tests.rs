//! End-to-end import tests against the in-memory store

#![allow(clippy::unwrap_used, clippy::expect_used)]

use modload::fixtures::{Dataset, FixtureLoader};
use modload::import::{DatasetOutcome, ImportStage, Importer, ResetOutcome};
use modload::store::{into_fields, Fields, MemoryStore};
use modload::ImportError;
use modload_common::types::{CollectionPath, DocumentPath};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

fn fixtures(files: &[(&str, Value)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, value) in files {
        std::fs::write(dir.path().join(name), value.to_string()).unwrap();
    }
    dir
}

fn doc(path: &str) -> DocumentPath {
    DocumentPath::parse(path).unwrap()
}

fn collection(module: &str, dataset: Dataset) -> CollectionPath {
    doc(&format!("modules/{}", module))
        .collection(dataset.collection_id())
        .unwrap()
}

fn quizzes(count: usize) -> Value {
    Value::Array(
        (1..=count)
            .map(|i| json!({"id": format!("q{}", i), "title": format!("Quiz {}", i)}))
            .collect(),
    )
}

async fn import(store: &MemoryStore, dir: &Path, reset: bool) -> modload::Result<modload::ImportSummary> {
    Importer::new(store, FixtureLoader::new(dir))
        .with_reset(reset)
        .run()
        .await
}

fn without(mut fields: Fields, key: &str) -> Fields {
    fields.remove(key);
    fields
}

#[tokio::test]
async fn test_count_quizzes_reflects_imported_quizzes() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1", "title": "Math", "countQuizzes": 42}])),
        ("quizzes_m1.json", quizzes(5)),
    ]);
    let store = MemoryStore::new();

    let summary = import(&store, dir.path(), false).await.unwrap();

    let module = store.get(&doc("modules/m1")).unwrap();
    assert_eq!(module["countQuizzes"], json!(5));
    assert_eq!(summary.modules[0].quizzes, DatasetOutcome::Imported(5));
    assert_eq!(store.documents_in(&collection("m1", Dataset::Quizzes)).len(), 5);
}

#[tokio::test]
async fn test_missing_quizzes_resets_count_to_zero() {
    let dir = fixtures(&[("modules.json", json!([{"id": "m1", "title": "Math"}]))]);
    let store = MemoryStore::new();
    store.insert(
        doc("modules/m1"),
        into_fields(json!({"title": "Math", "countQuizzes": 7})),
    );

    import(&store, dir.path(), false).await.unwrap();

    assert_eq!(store.get(&doc("modules/m1")).unwrap()["countQuizzes"], json!(0));
}

#[tokio::test]
async fn test_count_fiches_and_videos_taken_from_input() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1", "countFiches": 9, "countVideos": 4}])),
        ("fiches_m1.json", json!([{"id": "f1"}])),
    ]);
    let store = MemoryStore::new();

    import(&store, dir.path(), false).await.unwrap();

    let module = store.get(&doc("modules/m1")).unwrap();
    assert_eq!(module["countFiches"], json!(9));
    assert_eq!(module["countVideos"], json!(4));
}

#[tokio::test]
async fn test_repeated_import_is_idempotent() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1", "title": "Math", "tags": ["algebra"]}])),
        ("fiches_m1.json", json!([{"id": "f1", "title": "Fractions", "pages": 3}])),
        ("videos_m1.json", json!([{"id": "v1", "url": "https://example.com/v1"}])),
        ("quizzes_m1.json", quizzes(2)),
    ]);
    let store = MemoryStore::new();

    import(&store, dir.path(), false).await.unwrap();
    let module = store.get(&doc("modules/m1")).unwrap();
    let fiche = store.get(&doc("modules/m1/fichesSynthese/f1")).unwrap();
    let video = store.get(&doc("modules/m1/videos/v1")).unwrap();
    let quiz = store.get(&doc("modules/m1/quizzes/q1")).unwrap();

    import(&store, dir.path(), false).await.unwrap();
    let module_again = store.get(&doc("modules/m1")).unwrap();
    let quiz_again = store.get(&doc("modules/m1/quizzes/q1")).unwrap();

    assert_eq!(
        without(module_again.clone(), "updatedAt"),
        without(module.clone(), "updatedAt")
    );
    assert_ne!(module_again["updatedAt"], module["updatedAt"]);
    assert_eq!(store.get(&doc("modules/m1/fichesSynthese/f1")).unwrap(), fiche);
    assert_eq!(store.get(&doc("modules/m1/videos/v1")).unwrap(), video);
    assert_eq!(fiche["pages"], json!(3));

    // createdAt is overwritten on every import
    assert!(quiz_again["createdAt"].as_str().unwrap() > quiz["createdAt"].as_str().unwrap());
    assert_eq!(
        without(without(quiz_again, "createdAt"), "updatedAt"),
        without(without(quiz, "createdAt"), "updatedAt")
    );
    assert_eq!(store.len(), 5);
}

#[tokio::test]
async fn test_module_only_fixture() {
    let dir = fixtures(&[("modules.json", json!([{"id": "m1", "title": "Math"}]))]);
    let store = MemoryStore::new();

    let summary = import(&store, dir.path(), false).await.unwrap();

    let module = store.get(&doc("modules/m1")).unwrap();
    assert_eq!(module["title"], json!("Math"));
    assert_eq!(module["description"], json!(""));
    assert_eq!(module["tags"], json!([]));
    assert_eq!(module["imageUrl"], json!(""));
    for counter in ["countFiches", "countVideos", "countQuizzes"] {
        assert_eq!(module[counter], json!(0), "{}", counter);
    }
    for dataset in Dataset::ALL {
        assert!(store.documents_in(&collection("m1", dataset)).is_empty());
        assert_eq!(summary.modules[0].outcome(dataset), DatasetOutcome::Missing);
    }
}

#[tokio::test]
async fn test_normalized_quiz_is_stored() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1"}])),
        (
            "quizzes_m1.json",
            json!([{
                "id": "q1",
                "allowRetake": false,
                "questions": [{"question": "1+1?", "options": [1, 2], "correctIndex": "1"}]
            }]),
        ),
    ]);
    let store = MemoryStore::new();

    import(&store, dir.path(), false).await.unwrap();

    let quiz = store.get(&doc("modules/m1/quizzes/q1")).unwrap();
    assert_eq!(quiz["id"], json!("q1"));
    assert_eq!(quiz["moduleId"], json!("m1"));
    assert_eq!(quiz["title"], json!("Quiz"));
    assert_eq!(quiz["allowRetake"], json!(false));
    assert_eq!(quiz["durationSeconds"], Value::Null);
    assert_eq!(quiz["badgeThresholds"], json!({"gold": 90, "silver": 75, "bronze": 50}));
    assert_eq!(quiz["questionCount"], json!(1));
    assert_eq!(
        quiz["questions"],
        json!([{"question": "1+1?", "options": ["1", "2"], "correctIndex": 1, "explanation": ""}])
    );
    assert!(quiz["createdAt"].is_string());
    assert_eq!(quiz["createdAt"], quiz["updatedAt"]);
}

#[tokio::test]
async fn test_merge_preserves_untouched_fields() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1", "title": "Math"}])),
        ("fiches_m1.json", json!([{"id": "f1", "meta": {"level": 2}}])),
    ]);
    let store = MemoryStore::new();
    store.insert(doc("modules/m1"), into_fields(json!({"owner": "alice", "title": "Old"})));
    store.insert(
        doc("modules/m1/fichesSynthese/f1"),
        into_fields(json!({"id": "f1", "notes": "keep", "meta": {"author": "bob"}})),
    );

    import(&store, dir.path(), false).await.unwrap();

    let module = store.get(&doc("modules/m1")).unwrap();
    assert_eq!(module["owner"], json!("alice"));
    assert_eq!(module["title"], json!("Math"));

    let fiche = store.get(&doc("modules/m1/fichesSynthese/f1")).unwrap();
    assert_eq!(fiche["notes"], json!("keep"));
    assert_eq!(fiche["meta"], json!({"author": "bob", "level": 2}));
}

#[tokio::test]
async fn test_reset_removes_stale_children() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1"}])),
        ("quizzes_m1.json", quizzes(1)),
    ]);
    let store = MemoryStore::new();
    for i in 0..1001 {
        store.insert(doc(&format!("modules/m1/videos/old{}", i)), Fields::new());
    }
    store.insert(doc("modules/m1/quizzes/stale"), Fields::new());
    store.insert(doc("modules/m2/videos/other"), Fields::new());

    let summary = import(&store, dir.path(), true).await.unwrap();

    assert_eq!(
        summary.modules[0].reset,
        ResetOutcome::Completed {
            batches: 4,
            deleted: 1002
        }
    );
    assert!(store.documents_in(&collection("m1", Dataset::Videos)).is_empty());
    assert!(store.get(&doc("modules/m1/quizzes/stale")).is_none());
    assert!(store.get(&doc("modules/m1/quizzes/q1")).is_some());
    assert!(store.get(&doc("modules/m2/videos/other")).is_some());
}

#[tokio::test]
async fn test_without_reset_stale_children_remain() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1"}])),
        ("quizzes_m1.json", quizzes(1)),
    ]);
    let store = MemoryStore::new();
    store.insert(doc("modules/m1/quizzes/stale"), Fields::new());

    let summary = import(&store, dir.path(), false).await.unwrap();

    assert!(store.get(&doc("modules/m1/quizzes/stale")).is_some());
    assert_eq!(summary.modules[0].reset, ResetOutcome::Skipped);
    assert_eq!(store.stats().deletes, 0);
}

#[tokio::test]
async fn test_reset_failure_does_not_fail_run() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1"}, {"id": "m2"}])),
        ("quizzes_m1.json", quizzes(2)),
        ("quizzes_m2.json", quizzes(3)),
    ]);
    let store = MemoryStore::new();
    store.fail_collection(collection("m1", Dataset::Fiches));

    let summary = import(&store, dir.path(), true).await.unwrap();

    assert!(summary.modules[0].reset.is_failed());
    assert!(!summary.modules[1].reset.is_failed());
    assert_eq!(summary.reset_failures(), 1);
    assert_eq!(store.get(&doc("modules/m1")).unwrap()["countQuizzes"], json!(2));
    assert_eq!(store.get(&doc("modules/m2")).unwrap()["countQuizzes"], json!(3));
}

#[tokio::test]
async fn test_stage_order_per_module() {
    let dir = fixtures(&[("modules.json", json!([{"id": "m1"}, {"id": "m2"}]))]);
    let store = MemoryStore::new();

    let plain = import(&store, dir.path(), false).await.unwrap();
    let with_reset = import(&store, dir.path(), true).await.unwrap();

    for report in &plain.modules {
        assert!(!report.stages.contains(&ImportStage::Reset));
        assert_eq!(report.stages.first(), Some(&ImportStage::Start));
        assert_eq!(report.stages.last(), Some(&ImportStage::Done));
    }
    for report in &with_reset.modules {
        assert_eq!(report.stages, ImportStage::sequence(true));
    }
}

#[tokio::test]
async fn test_modules_imported_in_file_order() {
    let dir = fixtures(&[("modules.json", json!([{"id": "zeta"}, {"id": "alpha"}]))]);
    let store = MemoryStore::new();

    let summary = import(&store, dir.path(), false).await.unwrap();

    let ids: Vec<&str> = summary.modules.iter().map(|m| m.module_id.as_str()).collect();
    assert_eq!(ids, vec!["zeta", "alpha"]);
}

#[tokio::test]
async fn test_write_failure_aborts_and_keeps_earlier_modules() {
    let dir = fixtures(&[
        ("modules.json", json!([{"id": "m1"}, {"id": "m2"}, {"id": "m3"}])),
        ("videos_m2.json", json!([{"id": "v1"}, {"id": "v2"}])),
    ]);
    let store = MemoryStore::new();
    store.fail_document(doc("modules/m2/videos/v2"));

    let err = import(&store, dir.path(), false).await.unwrap_err();

    assert!(matches!(err, ImportError::Storage(_)));
    assert!(store.get(&doc("modules/m1")).is_some());
    assert!(store.get(&doc("modules/m2/videos/v1")).is_some());
    assert!(store.get(&doc("modules/m3")).is_none());
}

#[tokio::test]
async fn test_missing_modules_file_writes_nothing() {
    let dir = fixtures(&[]);
    let store = MemoryStore::new();

    let err = import(&store, dir.path(), true).await.unwrap_err();

    assert!(matches!(err, ImportError::FixtureNotFound(_)));
    assert!(store.is_empty());
    assert_eq!(store.stats().lists, 0);
}

#[tokio::test]
async fn test_unparsable_dataset_is_fatal() {
    let dir = fixtures(&[("modules.json", json!([{"id": "m1"}]))]);
    std::fs::write(dir.path().join("fiches_m1.json"), "[{not json").unwrap();
    let store = MemoryStore::new();

    let err = import(&store, dir.path(), false).await.unwrap_err();

    assert!(matches!(err, ImportError::FixtureParse { .. }));
    // the module document was written before the fiches failed
    assert!(store.get(&doc("modules/m1")).is_some());
}
