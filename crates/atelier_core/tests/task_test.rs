use atelier_core::{
    BatchStatus, GenerationRequestBuilder, GenerationTask, MediaKind, StoredArtifact, TaskStatus,
};
use chrono::{TimeZone, Utc};

fn units(count: u32) -> Vec<GenerationTask> {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let params = GenerationRequestBuilder::default()
        .media_kind(MediaKind::Image)
        .prompt("harbour at night")
        .build()
        .unwrap()
        .resolve(None, "base-model");
    (0..count)
        .map(|i| {
            GenerationTask::placeholder(
                "task-1",
                "user-1",
                i,
                100 + u64::from(i),
                &params,
                Some(format!("https://cdn.example.com/f/{i}.png")),
                None,
                now,
            )
        })
        .collect()
}

fn artifact(i: u32) -> StoredArtifact {
    StoredArtifact {
        path: format!("gallery/{i}.png"),
        url: format!("https://cdn.example.com/gallery/{i}.png"),
    }
}

#[test]
fn placeholder_starts_queued_without_artifact() {
    let rows = units(2);
    assert_eq!(rows[1].status, TaskStatus::Queued);
    assert_eq!(rows[1].seed, 101);
    assert_eq!(rows[1].progress, 0);
    assert!(rows[1].url.is_none());
    assert!(rows[1].verified_at.is_none());
}

#[test]
fn terminal_rows_reject_further_transitions() {
    let now = Utc::now();
    let mut row = units(1).remove(0);
    assert!(row.complete(&artifact(0), now));
    assert_eq!(row.progress, 100);
    assert!(row.verified_at.is_some());

    assert!(!row.fail("late failure", now));
    assert!(!row.apply_progress(TaskStatus::Processing, 50, None, now));
    assert_eq!(row.status, TaskStatus::Completed);
    assert!(row.error_message.is_none());
}

#[test]
fn queued_report_after_processing_keeps_status_but_records_eta() {
    let now = Utc::now();
    let mut row = units(1).remove(0);
    assert!(row.apply_progress(TaskStatus::Processing, 50, Some(12.0), now));
    assert!(row.apply_progress(TaskStatus::Queued, 55, Some(99.0), now));
    assert_eq!(row.status, TaskStatus::Processing);
    assert_eq!(row.progress, 55);
    assert_eq!(row.eta, Some(99.0));
}

#[test]
fn fail_clears_progress_and_records_reason() {
    let mut row = units(1).remove(0);
    row.apply_progress(TaskStatus::Processing, 50, None, Utc::now());
    assert!(row.fail("provider failed", Utc::now()));
    assert_eq!(row.progress, 0);
    assert_eq!(row.error_message.as_deref(), Some("provider failed"));
}

#[test]
fn batch_with_mixed_terminal_units_is_completed() {
    let now = Utc::now();
    let mut rows = units(3);
    rows[0].complete(&artifact(0), now);
    rows[1].fail("upload failed", now);
    rows[2].fail("no output", now);

    let batch = BatchStatus::from_units("task-1", rows);
    assert_eq!(batch.status, TaskStatus::Completed);
    assert_eq!(batch.outputs, vec!["https://cdn.example.com/gallery/0.png"]);
    assert_eq!(batch.message.as_deref(), Some("upload failed"));
    assert!(batch.is_settled());
}

#[test]
fn batch_with_only_failures_is_failed() {
    let now = Utc::now();
    let mut rows = units(2);
    rows.iter_mut().for_each(|r| {
        r.fail("provider failed", now);
    });
    let batch = BatchStatus::from_units("task-1", rows);
    assert_eq!(batch.status, TaskStatus::Failed);
    assert_eq!(batch.progress, 0);
}

#[test]
fn pending_batch_reports_processing_and_mean_progress() {
    let now = Utc::now();
    let mut rows = units(2);
    rows[0].apply_progress(TaskStatus::Processing, 40, Some(3.0), now);
    rows[1].apply_progress(TaskStatus::Processing, 60, Some(8.0), now);
    let mut reversed = rows.clone();
    reversed.reverse();

    let batch = BatchStatus::from_units("task-1", reversed);
    assert_eq!(batch.status, TaskStatus::Processing);
    assert_eq!(batch.progress, 50);
    assert_eq!(batch.eta, Some(8.0));
    assert_eq!(batch.units[0].unit_index, 0);
    assert!(!batch.is_settled());
}

#[test]
fn status_strings_round_trip() {
    use std::str::FromStr;
    assert_eq!(TaskStatus::from_str("processing").unwrap(), TaskStatus::Processing);
    assert_eq!(TaskStatus::Failed.as_ref(), "failed");
    assert_eq!(
        serde_json::to_string(&TaskStatus::Completed).unwrap(),
        "\"completed\""
    );
}
