//! Tenancy configuration

use crate::error::{TenancyError, TenancyResult};
use serde::{Deserialize, Serialize};

/// Header carrying the tenant identifier when none is configured
pub const DEFAULT_TENANT_HEADER: &str = "X-Tenant-ID";

/// What the request guard does with an empty resolved identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyTenantPolicy {
    /// Enter a scope holding the empty identifier. `require()` still fails
    /// inside it, so unscoped queries cannot run.
    #[default]
    Enter,
    /// Refuse the request before the handler runs
    Reject,
}

/// Tenancy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Header name carrying the tenant identifier (matched case-insensitively)
    pub header_name: String,
    /// Empty identifier handling
    pub empty_tenant: EmptyTenantPolicy,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_TENANT_HEADER.to_string(),
            empty_tenant: EmptyTenantPolicy::Enter,
        }
    }
}

impl TenancyConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(raw: &str) -> TenancyResult<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| TenancyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the tenant header name
    pub fn with_header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }

    /// Set the empty identifier policy
    pub fn with_empty_tenant(mut self, policy: EmptyTenantPolicy) -> Self {
        self.empty_tenant = policy;
        self
    }

    /// Header names must be non-empty HTTP tokens
    pub fn validate(&self) -> TenancyResult<()> {
        if self.header_name.is_empty() {
            return Err(TenancyError::Config("header_name must not be empty".into()));
        }
        if let Some(c) = self.header_name.chars().find(|c| !is_token_char(*c)) {
            return Err(TenancyError::Config(format!(
                "header_name contains invalid character {:?}",
                c
            )));
        }
        Ok(())
    }
}

// RFC 7230 tchar
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}
