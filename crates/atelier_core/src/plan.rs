//! Plans, tier ceilings and caller identity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Subscription plan reference data.
///
/// `nuts_per_month` is `None` for unlimited plans; configuration spells that `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Plan {
    /// Plan name
    name: String,
    /// Tier name used to gate advanced features
    tier: String,
    /// Monthly credit budget, `None` = unlimited
    #[serde(
        serialize_with = "serialize_credit_cap",
        deserialize_with = "deserialize_credit_cap"
    )]
    nuts_per_month: Option<u64>,
    /// Hard cap on units per generation call
    images_per_generation: u32,
}

impl Plan {
    /// Create a plan.
    pub fn new(
        name: impl Into<String>,
        tier: impl Into<String>,
        nuts_per_month: Option<u64>,
        images_per_generation: u32,
    ) -> Self {
        Self {
            name: name.into(),
            tier: tier.into(),
            nuts_per_month,
            images_per_generation,
        }
    }

    /// Credits left after `used`, or `None` when unlimited.
    ///
    /// # Examples
    ///
    /// ```
    /// use atelier_core::Plan;
    ///
    /// let plan = Plan::new("starter", "basic", Some(100), 4);
    /// assert_eq!(plan.remaining_credits(95), Some(5));
    /// assert_eq!(Plan::new("studio", "pro", None, 8).remaining_credits(10_000), None);
    /// ```
    pub fn remaining_credits(&self, used: u64) -> Option<u64> {
        self.nuts_per_month.map(|cap| cap.saturating_sub(used))
    }
}

fn serialize_credit_cap<S: Serializer>(cap: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
    match cap {
        Some(n) => s.serialize_u64(*n),
        None => s.serialize_i64(-1),
    }
}

fn deserialize_credit_cap<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let raw = i64::deserialize(d)?;
    Ok(u64::try_from(raw).ok())
}

/// Ceilings applied to restricted tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCeilings {
    /// Maximum output width
    pub max_width: u32,
    /// Maximum output height
    pub max_height: u32,
    /// Maximum step count
    pub max_steps: u32,
    /// Whether upscaling is permitted
    pub allow_upscale: bool,
}

impl TierCeilings {
    /// Describe the first ceiling the parameters break, if any.
    pub fn violation(&self, width: u32, height: u32, steps: u32, upscale: bool) -> Option<String> {
        if width > self.max_width {
            return Some(format!("width {} exceeds tier maximum {}", width, self.max_width));
        }
        if height > self.max_height {
            return Some(format!(
                "height {} exceeds tier maximum {}",
                height, self.max_height
            ));
        }
        if steps > self.max_steps {
            return Some(format!("steps {} exceed tier maximum {}", steps, self.max_steps));
        }
        if upscale && !self.allow_upscale {
            return Some("upscaling is not available on this tier".to_string());
        }
        None
    }
}

/// Account class of a caller.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Regular account
    #[default]
    #[display("user")]
    User,
    /// Administrator
    #[display("admin")]
    Admin,
    /// Automated account exempt from quota and rate limits
    #[display("bot")]
    Bot,
}

/// Identity handed over by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    /// User id
    pub user_id: String,
    /// Account class
    pub role: Role,
}

impl Caller {
    /// Create a caller.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Whether quota and admission checks are skipped.
    pub fn bypasses_limits(&self) -> bool {
        self.role == Role::Bot
    }
}
