//! Tenant Data Model

use crate::plan::{within_limit, PlanCatalog, PlanLimits, TenantPlan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Tenant ID
pub type TenantId = Uuid;

/// Tenant definition
///
/// Records are provisioned and persisted by an external store; this type is
/// the in-memory read model. `id` and `created_at` are fixed at creation and
/// have no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    id: TenantId,
    /// Display name
    pub name: String,
    /// URL-safe handle, unique per store
    pub slug: String,
    /// Subscription tier
    pub plan: TenantPlan,
    /// Whether the tenant may use the service
    pub is_active: bool,
    created_at: DateTime<Utc>,
    /// Tenant-owned settings
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

impl Tenant {
    /// Create new tenant
    pub fn new(name: impl Into<String>, slug: impl Into<String>, plan: TenantPlan) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            plan,
            is_active: true,
            created_at: Utc::now(),
            settings: HashMap::new(),
        }
    }

    /// Unique tenant ID
    pub fn id(&self) -> TenantId {
        self.id
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Plan limits
    pub fn limits(&self) -> &'static PlanLimits {
        PlanCatalog::limits_for(self.plan)
    }

    /// Check if feature is enabled for this plan
    pub fn has_feature(&self, feature: &str) -> bool {
        self.limits().includes(feature)
    }

    /// Check if another user fits under the plan's user limit.
    ///
    /// `current_count` is unsigned, so negative counts cannot be passed.
    pub fn can_add_user(&self, current_count: u64) -> bool {
        within_limit(self.limits().max_users, current_count)
    }

    /// Move to another plan, returning the previous one
    pub fn change_plan(&mut self, plan: TenantPlan) -> TenantPlan {
        let previous = std::mem::replace(&mut self.plan, plan);
        if previous != plan {
            tracing::info!(tenant = %self.id, from = %previous, to = %plan, "tenant plan changed");
        }
        previous
    }

    /// Re-enable the tenant
    pub fn activate(&mut self) {
        self.is_active = true;
    }

    /// Suspend the tenant
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Read a setting
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Insert or replace a setting, returning the old value
    pub fn set_setting(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.settings.insert(key.into(), value.into())
    }

    /// Remove a setting
    pub fn remove_setting(&mut self, key: &str) -> Option<Value> {
        self.settings.remove(key)
    }
}
