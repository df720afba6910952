//! Request-scoped tenant binding

use crate::config::{EmptyTenantPolicy, TenancyConfig};
use crate::context::TenantContext;
use crate::error::{TenancyError, TenancyResult};
use crate::resolver::{InboundRequest, TenantResolver};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

/// Binds the resolved tenant for the duration of one request or task
#[derive(Debug, Clone)]
pub struct RequestScopeGuard {
    resolver: TenantResolver,
    empty_tenant: EmptyTenantPolicy,
}

impl RequestScopeGuard {
    pub fn new(config: &TenancyConfig) -> Self {
        Self {
            resolver: TenantResolver::from_config(config),
            empty_tenant: config.empty_tenant,
        }
    }

    /// Resolver used by [`admit`](Self::admit)
    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    /// Run `body` with `tenant_id` in scope. The previous tenant is restored
    /// when `body` returns or unwinds.
    ///
    /// An empty identifier still opens a scope; use [`TenantContext::require`]
    /// inside `body` to insist on a real tenant.
    pub fn with_tenant<R>(tenant_id: impl Into<Arc<str>>, body: impl FnOnce() -> R) -> R {
        let _scope = TenantContext::enter_scope(tenant_id);
        body()
    }

    /// Async form of [`with_tenant`](Self::with_tenant). The scope also ends
    /// if the returned future is dropped before completion.
    pub async fn with_tenant_async<F>(tenant_id: impl Into<Arc<str>>, body: F) -> F::Output
    where
        F: Future,
    {
        let tenant_id: Arc<str> = tenant_id.into();
        let span = tracing::debug_span!("tenant_scope", tenant = %tenant_id);
        TenantContext::scope(tenant_id, body).instrument(span).await
    }

    /// Resolve the tenant for `request` and apply the empty-identifier policy
    pub fn admit<R: InboundRequest + ?Sized>(&self, request: &R) -> TenancyResult<String> {
        let tenant_id = self.resolver.resolve_id(request);
        if tenant_id.is_empty() && self.empty_tenant == EmptyTenantPolicy::Reject {
            tracing::warn!(header = %self.resolver.header_name(), "request rejected: no tenant identifier");
            return Err(TenancyError::EmptyTenantId);
        }
        Ok(tenant_id)
    }

    /// Admit `request`, then run the future produced by `handler` inside the
    /// request's tenant scope
    pub async fn handle<R, H, Fut>(&self, request: &R, handler: H) -> TenancyResult<Fut::Output>
    where
        R: InboundRequest + ?Sized,
        H: FnOnce() -> Fut,
        Fut: Future,
    {
        let tenant_id = self.admit(request)?;
        Ok(Self::with_tenant_async(tenant_id, handler()).await)
    }
}

impl Default for RequestScopeGuard {
    fn default() -> Self {
        Self::new(&TenancyConfig::default())
    }
}
