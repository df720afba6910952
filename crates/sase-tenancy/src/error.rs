//! Error types for tenant scoping

use thiserror::Error;

/// Tenancy error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenancyError {
    /// No tenant scope is active for the calling task, or the active
    /// identifier is empty
    #[error("no tenant context set")]
    NoTenantContext,

    /// The resolved tenant identifier was empty and the guard rejects it
    #[error("resolved tenant identifier is empty")]
    EmptyTenantId,

    /// Plan name outside the known tiers
    #[error("unknown tenant plan: {0}")]
    UnknownPlan(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for tenancy operations
pub type TenancyResult<T> = Result<T, TenancyError>;
