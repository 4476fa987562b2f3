use atelier_core::{GenerationRequestBuilder, GenerationTask, MediaKind, StoredArtifact, TaskStatus};
use atelier_database::InMemoryTaskStore;
use atelier_error::AtelierErrorKind;
use atelier_interface::{ProgressUpdate, TaskStore, UnitOutcome, UnitSettlement};
use chrono::Utc;

fn batch(task_id: &str, user_id: &str, count: u32) -> Vec<GenerationTask> {
    let params = GenerationRequestBuilder::default()
        .media_kind(MediaKind::Image)
        .prompt("foggy pier")
        .build()
        .unwrap()
        .resolve(None, "base-model");
    (0..count)
        .map(|i| {
            GenerationTask::placeholder(task_id, user_id, i, u64::from(i), &params, None, None, Utc::now())
        })
        .collect()
}

fn completed(unit_index: u32) -> UnitSettlement {
    UnitSettlement {
        unit_index,
        outcome: UnitOutcome::Completed(StoredArtifact {
            path: format!("generations/{unit_index}.png"),
            url: format!("https://cdn.example.com/generations/{unit_index}.png"),
        }),
    }
}

fn failed(unit_index: u32) -> UnitSettlement {
    UnitSettlement {
        unit_index,
        outcome: UnitOutcome::Failed("upload failed".into()),
    }
}

#[tokio::test]
async fn conflicting_batch_inserts_nothing() {
    let store = InMemoryTaskStore::new();
    store.insert_batch(&batch("T1", "alice", 2)).await.unwrap();

    let mut clash = batch("T2", "alice", 3);
    clash[2].task_id = "T1".into();
    clash[2].unit_index = 1;
    let err = store.insert_batch(&clash).await.unwrap_err();

    assert!(matches!(err.kind(), AtelierErrorKind::Persistence(_)));
    assert_eq!(store.len(), 2);
    assert!(store.find_batch("T2", "alice", &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn find_batch_is_scoped_to_owner_and_ordered() {
    let store = InMemoryTaskStore::new();
    let mut rows = batch("T1", "alice", 3);
    rows.reverse();
    store.insert_batch(&rows).await.unwrap();

    let found = store.find_batch("T1", "alice", &[]).await.unwrap();
    let indices: Vec<u32> = found.iter().map(|r| r.unit_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    assert!(store.find_batch("T1", "mallory", &[]).await.unwrap().is_empty());
    assert_eq!(store.owner_of("T1").await.unwrap().as_deref(), Some("alice"));
    assert_eq!(store.owner_of("T404").await.unwrap(), None);
}

#[tokio::test]
async fn progress_touches_only_pending_rows() {
    let store = InMemoryTaskStore::new();
    store.insert_batch(&batch("T1", "alice", 3)).await.unwrap();
    store.settle_units("T1", "alice", &[completed(0)]).await.unwrap();

    let changed = store
        .update_progress(
            "T1",
            "alice",
            ProgressUpdate {
                status: TaskStatus::Processing,
                progress: 40,
                eta: Some(9.0),
            },
        )
        .await
        .unwrap();
    assert_eq!(changed, 2);

    let pending = store
        .find_batch("T1", "alice", &TaskStatus::PENDING)
        .await
        .unwrap();
    assert!(pending.iter().all(|r| r.status == TaskStatus::Processing && r.progress == 40));

    let queued = store
        .update_progress(
            "T1",
            "alice",
            ProgressUpdate {
                status: TaskStatus::Queued,
                progress: 45,
                eta: Some(99.0),
            },
        )
        .await
        .unwrap();
    assert_eq!(queued, 2);

    let rows = store.find_batch("T1", "alice", &[]).await.unwrap();
    assert_eq!(rows[0].status, TaskStatus::Completed);
    assert_eq!(rows[0].eta, None);
    for row in &rows[1..] {
        assert_eq!(row.status, TaskStatus::Processing);
        assert_eq!(row.progress, 45);
        assert_eq!(row.eta, Some(99.0));
    }
}

#[tokio::test]
async fn settle_ignores_terminal_rows() {
    let store = InMemoryTaskStore::new();
    store.insert_batch(&batch("T1", "alice", 3)).await.unwrap();

    let first = store
        .settle_units("T1", "alice", &[completed(0), failed(1), failed(2)])
        .await
        .unwrap();
    assert_eq!(first, 3);
    let writes = store.writes();

    let second = store
        .settle_units("T1", "alice", &[failed(0), completed(1)])
        .await
        .unwrap();
    assert_eq!(second, 0);
    assert_eq!(store.writes(), writes);

    let rows = store.find_batch("T1", "alice", &[]).await.unwrap();
    assert_eq!(rows[0].status, TaskStatus::Completed);
    assert_eq!(rows[0].url.as_deref(), Some("https://cdn.example.com/generations/0.png"));
    assert_eq!(rows[1].status, TaskStatus::Failed);
    assert_eq!(rows[1].error_message.as_deref(), Some("upload failed"));
}

#[tokio::test]
async fn fail_pending_leaves_completed_units() {
    let store = InMemoryTaskStore::new();
    store.insert_batch(&batch("T1", "alice", 2)).await.unwrap();
    store.settle_units("T1", "alice", &[completed(1)]).await.unwrap();

    let changed = store.fail_pending("T1", "alice", "provider failed").await.unwrap();
    assert_eq!(changed, 1);

    let rows = store.find_batch("T1", "alice", &[]).await.unwrap();
    assert_eq!(rows[0].status, TaskStatus::Failed);
    assert_eq!(rows[0].progress, 0);
    assert_eq!(rows[1].status, TaskStatus::Completed);
}

#[tokio::test]
async fn injected_settle_failure_writes_nothing() {
    let store = InMemoryTaskStore::new();
    store.insert_batch(&batch("T1", "alice", 1)).await.unwrap();
    store.fail_next_settles(1);

    assert!(store.settle_units("T1", "alice", &[completed(0)]).await.is_err());
    assert_eq!(
        store.find_batch("T1", "alice", &TaskStatus::PENDING).await.unwrap().len(),
        1
    );
    assert_eq!(store.settle_units("T1", "alice", &[completed(0)]).await.unwrap(), 1);
}
