//! Plan Tiers and Entitlements
//!
//! Every tier maps to one immutable [`PlanLimits`] table compiled into the
//! binary. A limit of [`UNLIMITED`] (−1) means no ceiling.

use crate::error::TenancyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel for "no ceiling" on any numeric limit
pub const UNLIMITED: i64 = -1;

/// Plan-gated feature names
pub mod features {
    /// Standard reporting
    pub const BASIC_REPORTS: &str = "basic_reports";
    /// Programmatic API access
    pub const API_ACCESS: &str = "api_access";
    /// Email support channel
    pub const EMAIL_SUPPORT: &str = "email_support";
    /// Advanced analytics dashboards
    pub const ADVANCED_ANALYTICS: &str = "advanced_analytics";
    /// Third-party integrations
    pub const INTEGRATIONS: &str = "integrations";
    /// Single sign-on
    pub const SSO: &str = "sso";
    /// Audit log export
    pub const AUDIT_LOGS: &str = "audit_logs";
    /// Contractual SLA
    pub const SLA: &str = "sla";
}

use features::*;

/// Subscription plan tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    #[default]
    Free,
    Starter,
    Professional,
    Enterprise,
}

impl TenantPlan {
    /// All tiers
    pub const ALL: [TenantPlan; 4] = [
        TenantPlan::Free,
        TenantPlan::Starter,
        TenantPlan::Professional,
        TenantPlan::Enterprise,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    /// Limits for this tier
    pub fn limits(&self) -> &'static PlanLimits {
        PlanCatalog::limits_for(*self)
    }
}

impl fmt::Display for TenantPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantPlan {
    type Err = TenancyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|plan| plan.as_str() == s)
            .ok_or_else(|| TenancyError::UnknownPlan(s.to_string()))
    }
}

/// Metered resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Users,
    StorageGb,
    ApiCallsPerDay,
}

/// Limits for a subscription plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub max_users: i64,
    pub max_storage_gb: i64,
    pub max_api_calls_per_day: i64,
    features: &'static [&'static str],
}

impl PlanLimits {
    /// Ceiling for a resource, [`UNLIMITED`] when uncapped
    pub fn limit(&self, resource: Resource) -> i64 {
        match resource {
            Resource::Users => self.max_users,
            Resource::StorageGb => self.max_storage_gb,
            Resource::ApiCallsPerDay => self.max_api_calls_per_day,
        }
    }

    /// Whether the resource has no ceiling
    pub fn is_unlimited(&self, resource: Resource) -> bool {
        self.limit(resource) == UNLIMITED
    }

    /// Whether `current` units still leave room for one more
    pub fn has_capacity(&self, resource: Resource, current: u64) -> bool {
        within_limit(self.limit(resource), current)
    }

    /// Entitled feature names
    pub fn features(&self) -> impl Iterator<Item = &'static str> {
        let features: &'static [&'static str] = self.features;
        features.iter().copied()
    }

    /// Feature gate
    pub fn includes(&self, feature: &str) -> bool {
        self.features.iter().any(|f| *f == feature)
    }
}

pub(crate) fn within_limit(limit: i64, current: u64) -> bool {
    limit == UNLIMITED || i64::try_from(current).map_or(false, |current| current < limit)
}

static FREE: PlanLimits = PlanLimits {
    max_users: 3,
    max_storage_gb: 1,
    max_api_calls_per_day: 1_000,
    features: &[BASIC_REPORTS],
};

static STARTER: PlanLimits = PlanLimits {
    max_users: 10,
    max_storage_gb: 10,
    max_api_calls_per_day: 10_000,
    features: &[BASIC_REPORTS, API_ACCESS, EMAIL_SUPPORT],
};

static PROFESSIONAL: PlanLimits = PlanLimits {
    max_users: 50,
    max_storage_gb: 100,
    max_api_calls_per_day: 100_000,
    features: &[
        BASIC_REPORTS,
        API_ACCESS,
        EMAIL_SUPPORT,
        ADVANCED_ANALYTICS,
        INTEGRATIONS,
    ],
};

static ENTERPRISE: PlanLimits = PlanLimits {
    max_users: UNLIMITED,
    max_storage_gb: UNLIMITED,
    max_api_calls_per_day: UNLIMITED,
    features: &[
        BASIC_REPORTS,
        API_ACCESS,
        EMAIL_SUPPORT,
        ADVANCED_ANALYTICS,
        INTEGRATIONS,
        SSO,
        AUDIT_LOGS,
        SLA,
    ],
};

/// Static plan catalog
pub struct PlanCatalog;

impl PlanCatalog {
    /// Limits for a tier. Total over [`TenantPlan`]; the same reference is
    /// returned on every call.
    pub fn limits_for(plan: TenantPlan) -> &'static PlanLimits {
        match plan {
            TenantPlan::Free => &FREE,
            TenantPlan::Starter => &STARTER,
            TenantPlan::Professional => &PROFESSIONAL,
            TenantPlan::Enterprise => &ENTERPRISE,
        }
    }
}
