//! Per-user usage records and billing periods.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Calendar-month billing window `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// First instant of the month
    pub start: DateTime<Utc>,
    /// First instant of the following month
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    /// The billing period containing `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use atelier_core::BillingPeriod;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let now = Utc.with_ymd_and_hms(2024, 12, 17, 9, 30, 0).unwrap();
    /// let period = BillingPeriod::containing(now);
    /// assert_eq!(period.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
    /// assert_eq!(period.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    /// ```
    pub fn containing(now: DateTime<Utc>) -> Self {
        let (year, month) = (now.year(), now.month());
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        Self {
            start: first_of_month(year, month),
            end: first_of_month(next_year, next_month),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Midnight on day 1 always exists in UTC.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// What an admitted generation consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageCharge {
    /// Units (images or videos) in the batch
    pub units: u32,
    /// Credits ("nuts") charged
    pub credits: u64,
}

/// One user's usage for the current billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Owning user
    pub user_id: String,
    /// Credits consumed this period
    pub nuts_used: u64,
    /// Units generated this period
    pub images_generated: u64,
    /// Units generated on `last_image_date`
    pub daily_image_count: u32,
    /// Day of the last admitted generation
    pub last_image_date: Option<NaiveDate>,
    /// First instant of the period
    pub period_start: DateTime<Utc>,
    /// First instant of the next period
    pub period_end: DateTime<Utc>,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

impl UsageRecord {
    /// A zeroed record for the period containing `now`.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let period = BillingPeriod::containing(now);
        Self {
            user_id: user_id.into(),
            nuts_used: 0,
            images_generated: 0,
            daily_image_count: 0,
            last_image_date: None,
            period_start: period.start,
            period_end: period.end,
            updated_at: now,
        }
    }

    /// Whether the stored period is not the one containing `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.period_start != BillingPeriod::containing(now).start
    }

    /// Reset counters if the stored period has rolled over. Returns true if reset.
    ///
    /// Must run before any quota check against this record is trusted.
    pub fn rollover(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_stale(now) {
            return false;
        }
        let period = BillingPeriod::containing(now);
        self.nuts_used = 0;
        self.images_generated = 0;
        self.daily_image_count = 0;
        self.last_image_date = None;
        self.period_start = period.start;
        self.period_end = period.end;
        self.updated_at = now;
        true
    }

    /// Apply an admitted charge.
    ///
    /// The daily counter accumulates when the last generation happened today and
    /// restarts at `charge.units` otherwise.
    pub fn charge(&mut self, charge: &UsageCharge, now: DateTime<Utc>) {
        let today = now.date_naive();
        self.nuts_used = self.nuts_used.saturating_add(charge.credits);
        self.images_generated = self.images_generated.saturating_add(u64::from(charge.units));
        if self.last_image_date == Some(today) {
            self.daily_image_count = self.daily_image_count.saturating_add(charge.units);
        } else {
            self.daily_image_count = charge.units;
            self.last_image_date = Some(today);
        }
        self.updated_at = now;
    }

    /// Read-only view handed to callers.
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            nuts_used: self.nuts_used,
            images_generated: self.images_generated,
            daily_image_count: self.daily_image_count,
            period_start: self.period_start,
            period_end: self.period_end,
        }
    }
}

/// Usage figures exposed by quota checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    /// Credits consumed this period
    pub nuts_used: u64,
    /// Units generated this period
    pub images_generated: u64,
    /// Units generated today
    pub daily_image_count: u32,
    /// Period start
    pub period_start: DateTime<Utc>,
    /// Period end
    pub period_end: DateTime<Utc>,
}
