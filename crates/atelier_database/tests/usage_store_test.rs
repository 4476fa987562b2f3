use atelier_core::{UsageCharge, UsageRecord};
use atelier_database::InMemoryUsageStore;
use atelier_error::{AtelierErrorKind, QuotaExceeded, QuotaKind};
use atelier_interface::{AdmitGuard, UsageStore};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

fn cap(limit: u64, cost: u64) -> AdmitGuard {
    Arc::new(move |record: &UsageRecord| {
        if record.nuts_used + cost > limit {
            Err(QuotaExceeded::new(
                QuotaKind::MonthlyCredits,
                limit.saturating_sub(record.nuts_used),
                "monthly credits exhausted",
            ))
        } else {
            Ok(())
        }
    })
}

const ONE: UsageCharge = UsageCharge {
    units: 1,
    credits: 1,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admits_never_overshoot() {
    let store = Arc::new(InMemoryUsageStore::new());
    let now = Utc::now();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.admit("alice", ONE, cap(10, 1), now).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 10);
    let record = store.load("alice", now).await.unwrap();
    assert_eq!(record.nuts_used, 10);
    assert_eq!(record.images_generated, 10);
}

#[tokio::test]
async fn rejection_reports_remaining_and_charges_nothing() {
    let store = InMemoryUsageStore::new();
    let now = Utc::now();
    let mut record = UsageRecord::new("bob", now);
    record.nuts_used = 95;
    store.put(record);

    let charge = UsageCharge {
        units: 10,
        credits: 10,
    };
    let err = store.admit("bob", charge, cap(100, 10), now).await.unwrap_err();

    let quota = err.as_quota().unwrap();
    assert_eq!(quota.kind, QuotaKind::MonthlyCredits);
    assert_eq!(quota.remaining, 5);
    assert!(matches!(err.kind(), AtelierErrorKind::Quota(_)));
    assert_eq!(store.get("bob").unwrap().nuts_used, 95);
}

#[tokio::test]
async fn stale_period_resets_before_the_guard_runs() {
    let store = InMemoryUsageStore::new();
    let last_month = Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap();
    let mut record = UsageRecord::new("carol", last_month);
    record.nuts_used = 100;
    record.images_generated = 40;
    store.put(record);

    let admitted = store.admit("carol", ONE, cap(100, 1), now).await.unwrap();

    assert_eq!(admitted.nuts_used, 1);
    assert_eq!(admitted.images_generated, 1);
    assert_eq!(
        admitted.period_start,
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn daily_counter_restarts_on_a_new_day() {
    let store = InMemoryUsageStore::new();
    let morning = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
    let evening = Utc.with_ymd_and_hms(2024, 6, 3, 21, 0, 0).unwrap();
    let next_day = Utc.with_ymd_and_hms(2024, 6, 4, 9, 0, 0).unwrap();
    let two = UsageCharge {
        units: 2,
        credits: 2,
    };

    store.admit("dave", two, cap(100, 2), morning).await.unwrap();
    let same_day = store.admit("dave", two, cap(100, 2), evening).await.unwrap();
    assert_eq!(same_day.daily_image_count, 4);

    let fresh = store.admit("dave", two, cap(100, 2), next_day).await.unwrap();
    assert_eq!(fresh.daily_image_count, 2);
    assert_eq!(fresh.images_generated, 6);
}

#[tokio::test]
async fn load_creates_a_zeroed_record() {
    let store = InMemoryUsageStore::new();
    let record = store.load("erin", Utc::now()).await.unwrap();
    assert_eq!(record.nuts_used, 0);
    assert!(!store.is_empty());
}
