//! End-to-end batch scenarios against in-memory collaborators.

mod test_utils;

use atelier_core::{Caller, MediaKind, Plan, Role, TaskStatus, UsageRecord};
use atelier_error::{AtelierErrorKind, GenerationErrorKind, QuotaKind};
use atelier_rate_limit::PricingConfig;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use test_utils::{
    ClosedDoor, Harness, ScriptedProvider, alice, default_config, failure, free_plan,
    image_request, processing, queued, success,
};

#[tokio::test]
async fn four_images_progress_then_complete() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T1"));

    let receipt = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", image_request(4, Some(100)))
        .await?;

    assert_eq!(receipt.task_id, "T1");
    assert_eq!(receipt.seeds, vec![100, 101, 102, 103]);
    assert_eq!(receipt.credits_charged, 4);
    let jobs = h.provider.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].seed, 100);
    assert_eq!(jobs[0].samples, 4);
    assert_eq!(
        jobs[0].webhook_url.as_deref(),
        Some("https://atelier.example.com/webhooks/image-generation")
    );
    let rows = h.tasks.rows();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.status == TaskStatus::Queued));
    assert!(rows.iter().all(|r| r.category_id.as_deref() == Some("landscape")));

    h.provider.push_status(processing(40.0));
    let batch = h.orchestrator.poll("alice", "T1").await?;
    assert_eq!(batch.status, TaskStatus::Processing);
    assert!(batch
        .units
        .iter()
        .all(|u| u.status == TaskStatus::Processing && u.progress == 40));
    assert_eq!(batch.progress, 40);

    h.provider.push_status(success(&[
        "https://p.example.com/u1.png",
        "https://p.example.com/u2.png",
        "https://p.example.com/u3.png",
        "https://p.example.com/u4.png",
    ]));
    let batch = h.orchestrator.poll("alice", "T1").await?;

    assert_eq!(batch.status, TaskStatus::Completed);
    assert_eq!(batch.outputs.len(), 4);
    assert!(batch.units.iter().all(|u| u.status == TaskStatus::Completed));
    let mut paths: Vec<_> = batch.units.iter().filter_map(|u| u.path.clone()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 4);
    assert!(paths.iter().all(|p| p.starts_with("generations/") && p.ends_with(".png")));
    assert_eq!(h.store.len(), 4);
    Ok(())
}

#[tokio::test]
async fn monthly_credits_rejection_reports_remaining() {
    let config = default_config().with_pricing(PricingConfig {
        image_credits: 5,
        video_credits: 10,
    });
    let h = Harness::with_config(free_plan(), ScriptedProvider::accepting("T1"), config);
    let mut record = UsageRecord::new("alice", Utc::now());
    record.nuts_used = 95;
    h.usage.put(record);

    let err = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await
        .unwrap_err();

    let quota = err.as_quota().expect("quota error");
    assert_eq!(quota.kind, QuotaKind::MonthlyCredits);
    assert_eq!(quota.remaining, 5);
    assert!(h.provider.jobs().is_empty());
    assert!(h.tasks.is_empty());
    assert_eq!(h.usage.get("alice").unwrap().nuts_used, 95);
}

#[tokio::test]
async fn per_generation_cap_is_enforced() {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T1"));
    let err = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", image_request(6, None))
        .await
        .unwrap_err();
    let quota = err.as_quota().expect("quota error");
    assert_eq!(quota.kind, QuotaKind::PerGenerationCap);
    assert_eq!(quota.remaining, 4);
}

#[tokio::test]
async fn units_settle_independently() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T2"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(3, Some(7)))
        .await?;

    h.provider.push_status(success(&[
        "https://p.example.com/ok.png",
        "https://p.example.com/broken.png",
    ]));
    let batch = h.orchestrator.poll("alice", "T2").await?;

    let states: Vec<TaskStatus> = batch.units.iter().map(|u| u.status).collect();
    assert_eq!(
        states,
        vec![TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Failed]
    );
    assert_eq!(batch.status, TaskStatus::Completed);
    assert_eq!(batch.outputs.len(), 1);
    assert!(batch.units[1]
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Upload failed"));
    assert!(batch.units[2].error_message.is_some());
    // Two attempts for the broken unit, one for the good one.
    assert_eq!(h.fetcher.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn polling_a_settled_batch_is_a_pure_read() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T3"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;
    h.provider.push_status(success(&[
        "https://p.example.com/a.png",
        "https://p.example.com/b.png",
    ]));
    h.orchestrator.poll("alice", "T3").await?;

    let writes = h.tasks.writes();
    let fetches = h.provider.fetches();
    let first = h.orchestrator.poll("alice", "T3").await?;
    let second = h.orchestrator.poll("alice", "T3").await?;

    assert_eq!(first, second);
    assert_eq!(h.tasks.writes(), writes);
    assert_eq!(h.provider.fetches(), fetches);
    Ok(())
}

#[tokio::test]
async fn provider_failure_fails_every_pending_unit() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T4"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;
    h.provider.push_status(failure("NSFW content detected"));

    let batch = h.orchestrator.poll("alice", "T4").await?;

    assert_eq!(batch.status, TaskStatus::Failed);
    assert_eq!(batch.message.as_deref(), Some("NSFW content detected"));
    assert!(batch.units.iter().all(|u| u.progress == 0));
    Ok(())
}

#[tokio::test]
async fn queued_report_after_processing_keeps_status_and_updates_eta() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T4q"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;
    h.provider.push_status(processing(40.0));
    h.orchestrator.poll("alice", "T4q").await?;

    h.provider.push_status(queued(99.0));
    let batch = h.orchestrator.poll("alice", "T4q").await?;

    assert_eq!(batch.status, TaskStatus::Processing);
    for unit in &batch.units {
        assert_eq!(unit.status, TaskStatus::Processing);
        assert_eq!(unit.eta, Some(99.0));
    }
    Ok(())
}

#[tokio::test]
async fn failed_status_fetch_sweeps_pending_units() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T5f"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;

    // nothing scripted, so the fetch fails
    let err = h.orchestrator.poll("alice", "T5f").await.unwrap_err();

    assert!(matches!(err.kind(), AtelierErrorKind::Provider(_)));
    let rows = h.tasks.rows();
    assert_eq!(
        rows.iter().map(|r| r.status).collect::<Vec<_>>(),
        vec![TaskStatus::Failed, TaskStatus::Failed]
    );
    assert!(rows
        .iter()
        .all(|r| r.error_message.as_deref().unwrap().starts_with("Reconciliation failed")));
    Ok(())
}

#[tokio::test]
async fn overlapping_polls_upload_each_artifact_once() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T5o"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;
    h.provider.push_status(success(&[
        "https://p.example.com/a.png",
        "https://p.example.com/b.png",
    ]));

    let (first, second) = tokio::join!(
        h.orchestrator.poll("alice", "T5o"),
        h.orchestrator.poll("alice", "T5o"),
    );

    assert_eq!(first?.status, TaskStatus::Completed);
    assert_eq!(second?.status, TaskStatus::Completed);
    assert_eq!(h.provider.fetches(), 1);
    assert_eq!(h.store.len(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_settle_write_sweeps_pending_units() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T5"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;
    h.tasks.fail_next_settles(1);
    h.provider.push_status(success(&[
        "https://p.example.com/a.png",
        "https://p.example.com/b.png",
    ]));

    let err = h.orchestrator.poll("alice", "T5").await.unwrap_err();

    assert!(matches!(err.kind(), AtelierErrorKind::Persistence(_)));
    let rows = h.tasks.rows();
    assert!(rows.iter().all(|r| r.status == TaskStatus::Failed));
    assert!(rows[0]
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Reconciliation failed"));
    Ok(())
}

#[tokio::test]
async fn bots_skip_quota_and_admission() -> anyhow::Result<()> {
    let broke = Plan::new("broke", "basic", Some(0), 4);
    let h = Harness::new(broke, ScriptedProvider::accepting("T6"));
    let orchestrator = h.orchestrator.with_admission(Arc::new(ClosedDoor));

    let bot = Caller::new("curator-bot", Role::Bot);
    let receipt = orchestrator
        .submit(&bot, "10.0.0.9", image_request(2, None))
        .await?;
    assert_eq!(receipt.credits_charged, 0);
    assert!(receipt.usage.is_none());
    assert!(h.usage.get("curator-bot").is_none());

    let err = orchestrator
        .submit(&alice(), "10.0.0.1", image_request(1, None))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), AtelierErrorKind::RateLimit(_)));
    Ok(())
}

#[tokio::test]
async fn invalid_requests_write_nothing() {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T7"));

    let mut blank = image_request(1, None);
    blank.prompt = "   ".into();
    let mut odd = image_request(1, None);
    odd.width = Some(500);
    let none = image_request(0, None);

    for request in [blank, odd, none] {
        let err = h
            .orchestrator
            .submit(&alice(), "10.0.0.1", request)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), AtelierErrorKind::Request(_)));
    }
    assert!(h.provider.jobs().is_empty());
    assert!(h.tasks.is_empty());
    assert!(h.usage.is_empty());
}

#[tokio::test]
async fn tier_ceilings_block_oversized_requests() {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T8"));
    let mut large = image_request(1, None);
    large.width = Some(1024);

    let err = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", large)
        .await
        .unwrap_err();
    assert_eq!(err.as_quota().unwrap().kind, QuotaKind::TierRestriction);
}

#[tokio::test]
async fn provider_rejection_writes_no_rows() {
    let h = Harness::new(free_plan(), ScriptedProvider::rejecting());
    let err = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        AtelierErrorKind::Generation(e) if matches!(e.kind, GenerationErrorKind::Rejected(_))
    ));
    assert!(h.tasks.is_empty());
}

#[tokio::test]
async fn inline_outputs_settle_during_submit() -> anyhow::Result<()> {
    let submission = atelier_core::Submission {
        task_id: "T9".into(),
        eta: None,
        future_links: vec![],
        ready_outputs: vec![
            atelier_core::ArtifactSource::Url("https://p.example.com/x.png".into()),
            atelier_core::ArtifactSource::Inline {
                data: "aGVsbG8=".into(),
                mime: Some("image/webp".into()),
            },
        ],
    };
    let h = Harness::new(
        free_plan(),
        ScriptedProvider::with_submission(Some(submission)),
    );

    let receipt = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;

    assert_eq!(receipt.batch.status, TaskStatus::Completed);
    assert_eq!(receipt.batch.outputs.len(), 2);
    assert!(receipt.batch.units[1].path.as_deref().unwrap().ends_with(".webp"));
    assert_eq!(h.provider.fetches(), 0);
    Ok(())
}

#[tokio::test]
async fn future_links_are_kept_by_index() -> anyhow::Result<()> {
    let submission = atelier_core::Submission {
        task_id: "T10".into(),
        eta: Some(30.0),
        future_links: vec!["https://p.example.com/f0.png".into()],
        ready_outputs: vec![],
    };
    let h = Harness::new(
        free_plan(),
        ScriptedProvider::with_submission(Some(submission)),
    );
    let receipt = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", image_request(2, None))
        .await?;

    let units = &receipt.batch.units;
    assert_eq!(units[0].future_link.as_deref(), Some("https://p.example.com/f0.png"));
    assert_eq!(units[1].future_link, None);
    Ok(())
}

#[tokio::test]
async fn webhooks_reconcile_by_provider_task_id() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T11"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(1, None))
        .await?;

    let batch = h
        .orchestrator
        .handle_webhook(
            MediaKind::Image,
            &json!({ "id": "T11", "status": "success", "output": ["https://p.example.com/w.png"] }),
        )
        .await?;
    assert_eq!(batch.status, TaskStatus::Completed);

    let err = h
        .orchestrator
        .handle_webhook(MediaKind::Image, &json!({ "id": "T404", "status": "success" }))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), AtelierErrorKind::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn batches_are_private_to_their_owner() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T12"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(1, None))
        .await?;

    let err = h.orchestrator.poll("mallory", "T12").await.unwrap_err();
    assert!(matches!(err.kind(), AtelierErrorKind::NotFound(_)));
    assert_eq!(h.provider.fetches(), 0);
    Ok(())
}

#[tokio::test]
async fn unsupported_media_has_no_provider() {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T13"));
    let mut video = image_request(1, None);
    video.media_kind = MediaKind::Video;
    let err = h
        .orchestrator
        .submit(&alice(), "10.0.0.1", video)
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        AtelierErrorKind::Generation(e) if matches!(e.kind, GenerationErrorKind::NoProvider(_))
    ));
}

#[tokio::test]
async fn quota_report_reflects_charges() -> anyhow::Result<()> {
    let h = Harness::new(free_plan(), ScriptedProvider::accepting("T14"));
    h.orchestrator
        .submit(&alice(), "10.0.0.1", image_request(3, None))
        .await?;

    let report = h.orchestrator.quota(&alice()).await?;
    assert_eq!(report.plan.name(), "free");
    assert_eq!(report.usage.nuts_used, 3);
    assert_eq!(report.usage.images_generated, 3);
    assert_eq!(report.usage.daily_image_count, 3);
    Ok(())
}
