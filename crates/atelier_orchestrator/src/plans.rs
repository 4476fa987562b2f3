//! Plan lookup from configuration.

use async_trait::async_trait;
use atelier_core::{Caller, Plan};
use atelier_error::{AtelierResult, ConfigError, ConfigErrorKind};
use atelier_interface::PlanDirectory;
use atelier_rate_limit::AtelierConfig;
use std::collections::HashMap;

/// Plan directory backed by the `[plans]` and `[assignments]` configuration tables.
#[derive(Debug, Clone)]
pub struct StaticPlanDirectory {
    plans: HashMap<String, Plan>,
    default_plan: String,
    assignments: HashMap<String, String>,
}

impl StaticPlanDirectory {
    /// Directory with explicit tables.
    pub fn new(
        plans: HashMap<String, Plan>,
        default_plan: impl Into<String>,
        assignments: HashMap<String, String>,
    ) -> Self {
        Self {
            plans,
            default_plan: default_plan.into(),
            assignments,
        }
    }

    /// Directory drawn from a loaded configuration.
    pub fn from_config(config: &AtelierConfig) -> Self {
        Self::new(
            config.plans.clone(),
            config.default_plan.clone(),
            config.assignments.clone(),
        )
    }
}

#[async_trait]
impl PlanDirectory for StaticPlanDirectory {
    async fn plan_for(&self, caller: &Caller) -> AtelierResult<Plan> {
        let name = self
            .assignments
            .get(&caller.user_id)
            .unwrap_or(&self.default_plan);
        self.plans
            .get(name)
            .cloned()
            .ok_or_else(|| {
                ConfigError::new(ConfigErrorKind::UnknownPlan {
                    plan: name.clone(),
                    referenced_by: format!("user {}", caller.user_id),
                })
                .into()
            })
    }
}
