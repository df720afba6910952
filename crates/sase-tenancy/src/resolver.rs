//! Tenant Resolution from Inbound Requests
//!
//! Precedence: explicit header, then the first label of the host. Nothing
//! here checks that the tenant exists.

use crate::config::{TenancyConfig, DEFAULT_TENANT_HEADER};

/// Minimal view of an inbound request
pub trait InboundRequest {
    /// Header value by name, matched case-insensitively
    fn header(&self, name: &str) -> Option<&str>;

    /// Host the request was addressed to
    fn host(&self) -> Option<&str>;
}

/// Already-parsed request parts for transports without an `http` type
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    headers: Vec<(String, String)>,
    host: Option<String>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

impl InboundRequest for RequestParts {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn host(&self) -> Option<&str> {
        self.host
            .as_deref()
            .or_else(|| InboundRequest::header(self, "host"))
    }
}

impl<B> InboundRequest for http::Request<B> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    fn host(&self) -> Option<&str> {
        self.headers()
            .get(http::header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| self.uri().host())
    }
}

/// Where a tenant identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    Header,
    Subdomain,
}

/// Resolved tenant identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tenant_id: String,
    pub source: TenantSource,
}

/// Header/subdomain tenant resolver
#[derive(Debug, Clone)]
pub struct TenantResolver {
    header_name: String,
}

impl TenantResolver {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }

    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(config.header_name.clone())
    }

    /// Configured header name
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Resolve the tenant candidate for a request, `None` if neither the
    /// header nor the host yields one
    pub fn resolve<R: InboundRequest + ?Sized>(&self, request: &R) -> Option<Resolution> {
        let resolution = match request.header(&self.header_name).filter(|v| !v.is_empty()) {
            Some(tenant_id) => Resolution {
                tenant_id: tenant_id.to_string(),
                source: TenantSource::Header,
            },
            None => Resolution {
                tenant_id: request.host().and_then(subdomain)?.to_string(),
                source: TenantSource::Subdomain,
            },
        };
        tracing::debug!(tenant = %resolution.tenant_id, source = ?resolution.source, "tenant resolved");
        Some(resolution)
    }

    /// Resolved identifier, empty when nothing matched
    pub fn resolve_id<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        self.resolve(request)
            .map(|resolution| resolution.tenant_id)
            .unwrap_or_default()
    }
}

impl Default for TenantResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TENANT_HEADER)
    }
}

/// First dot-delimited label of a host; bare hosts like `localhost` have none
fn subdomain(host: &str) -> Option<&str> {
    let host = host.trim();
    if !host.contains('.') {
        return None;
    }
    host.split('.').next().filter(|label| !label.is_empty())
}
