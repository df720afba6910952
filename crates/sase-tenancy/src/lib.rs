//! Tenant Scoping & Entitlements
//!
//! Binds a tenant to each inbound request and carries it implicitly down the
//! call chain, so data access is always filtered by the right tenant without
//! threading an id through every function.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          TENANT SCOPING                                 │
//! │                                                                         │
//! │   inbound request ──► TenantResolver ──► RequestScopeGuard              │
//! │   (header / host)     X-Tenant-ID,        enter scope, run handler,     │
//! │                       then subdomain      restore on every exit         │
//! │                                               │                         │
//! │  ┌────────────────────────────────────────────▼─────────────────────┐  │
//! │  │                       TENANT CONTEXT                              │  │
//! │  │   per-task scope stack (task-local / thread-local), strict LIFO   │  │
//! │  └──────────────┬──────────────────────────────────┬────────────────┘  │
//! │                 │ require()                        │ current()          │
//! │  ┌──────────────▼──────────────┐   ┌───────────────▼────────────────┐  │
//! │  │   TenantFilterProvider      │   │  Tenant ──► PlanCatalog         │  │
//! │  │   organization_id = <id>    │   │  features, user/storage/API caps│  │
//! │  └─────────────────────────────┘   └────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use sase_tenancy::{RequestParts, RequestScopeGuard, TenantContext, TenancyConfig};
//!
//! let guard = RequestScopeGuard::new(&TenancyConfig::default());
//! let request = RequestParts::new().with_host("acme.example.com");
//! let tenant = guard.admit(&request).unwrap();
//!
//! RequestScopeGuard::with_tenant(tenant, || {
//!     assert_eq!(TenantContext::require().unwrap(), "acme");
//! });
//! assert!(TenantContext::current().is_none());
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod guard;
pub mod plan;
pub mod resolver;
pub mod tenant;

#[cfg(feature = "axum")]
pub mod middleware;

pub use config::{EmptyTenantPolicy, TenancyConfig, DEFAULT_TENANT_HEADER};
pub use context::{ScopeHandle, TenantContext};
pub use error::{TenancyError, TenancyResult};
pub use filter::{TenantFilter, TenantFilterProvider, TenantScoped};
pub use guard::RequestScopeGuard;
pub use plan::{PlanCatalog, PlanLimits, Resource, TenantPlan, UNLIMITED};
pub use resolver::{InboundRequest, RequestParts, Resolution, TenantResolver, TenantSource};
pub use tenant::{Tenant, TenantId};
