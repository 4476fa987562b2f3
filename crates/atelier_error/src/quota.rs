//! Usage quota rejections.

/// Which quota rule rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum QuotaKind {
    /// Monthly credit budget would be exceeded
    #[display("monthly-credits")]
    MonthlyCredits,
    /// More units requested than the plan allows in one call
    #[display("per-generation-cap")]
    PerGenerationCap,
    /// The plan tier does not allow the requested parameters
    #[display("tier-restriction")]
    TierRestriction,
}

impl QuotaKind {
    /// Stable wire name, e.g. `monthly-credits`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaKind::MonthlyCredits => "monthly-credits",
            QuotaKind::PerGenerationCap => "per-generation-cap",
            QuotaKind::TierRestriction => "tier-restriction",
        }
    }
}

/// A request rejected by the usage ledger.
///
/// `remaining` is the figure a caller needs to act on: unspent credits for
/// [`QuotaKind::MonthlyCredits`], the per-call unit cap for
/// [`QuotaKind::PerGenerationCap`], and zero for [`QuotaKind::TierRestriction`].
///
/// # Examples
///
/// ```
/// use atelier_error::{QuotaExceeded, QuotaKind};
///
/// let err = QuotaExceeded::new(QuotaKind::MonthlyCredits, 5, "need 10 nuts");
/// assert_eq!(err.kind, QuotaKind::MonthlyCredits);
/// assert_eq!(err.remaining, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Quota Exceeded ({}): {} remaining, {} at line {} in {}", kind, remaining, detail, line, file)]
pub struct QuotaExceeded {
    /// Rule that rejected the request
    pub kind: QuotaKind,
    /// Remaining budget relevant to the rule
    pub remaining: u64,
    /// Explanation suitable for an end user
    pub detail: String,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl QuotaExceeded {
    /// Create a new rejection with automatic location tracking.
    #[track_caller]
    pub fn new(kind: QuotaKind, remaining: u64, detail: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            remaining,
            detail: detail.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
