//! End-to-end request flow: resolve, scope, entitle, filter

use sase_tenancy::{
    plan::features, EmptyTenantPolicy, RequestParts, RequestScopeGuard, TenancyConfig,
    TenancyError, Tenant, TenantContext, TenantFilterProvider, TenantPlan, TenantScoped,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Order {
    id: u64,
    organization_id: String,
}

impl TenantScoped for Order {
    const ENTITY: &'static str = "orders";

    fn organization_id(&self) -> &str {
        &self.organization_id
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sase_tenancy=debug")
        .with_test_writer()
        .try_init();
}

fn orders() -> Vec<Order> {
    ["acme", "globex", "acme", "initech"]
        .iter()
        .enumerate()
        .map(|(id, tenant)| Order {
            id: id as u64,
            organization_id: tenant.to_string(),
        })
        .collect()
}

#[test]
fn test_scope_then_filter() {
    init_tracing();

    RequestScopeGuard::with_tenant("acme", || {
        let filter = TenantFilterProvider::filter_for::<Order>().unwrap();
        assert_eq!(filter.field(), "organization_id");
        assert_eq!(filter.tenant_id(), "acme");
        assert_eq!(filter.to_sql("$1"), "orders.organization_id = $1");

        let visible: Vec<u64> = filter.apply(orders()).map(|o| o.id).collect();
        assert_eq!(visible, vec![0, 2]);
    });

    assert_eq!(TenantContext::current(), None);
    assert_eq!(
        TenantFilterProvider::filter_for::<Order>(),
        Err(TenancyError::NoTenantContext)
    );
}

#[tokio::test]
async fn test_request_to_entitlements() {
    init_tracing();

    let directory: HashMap<&str, Tenant> = [
        ("acme", Tenant::new("Acme", "acme", TenantPlan::Enterprise)),
        ("globex", Tenant::new("Globex", "globex", TenantPlan::Free)),
    ]
    .into_iter()
    .collect();

    let guard = RequestScopeGuard::default();
    for (host, sso) in [("acme.example.com", true), ("globex.example.com", false)] {
        let request = RequestParts::new().with_host(host);
        let has_sso = guard
            .handle(&request, || async {
                let slug = TenantContext::require()?;
                let tenant = directory.get(slug.as_str()).ok_or(TenancyError::NoTenantContext)?;
                Ok::<_, TenancyError>(tenant.has_feature(features::SSO))
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(has_sso, sso, "{host}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_mix() {
    init_tracing();

    let guard = Arc::new(RequestScopeGuard::default());
    let mut tasks = Vec::new();
    for i in 0..100u64 {
        let guard = Arc::clone(&guard);
        tasks.push(tokio::spawn(async move {
            let tenant = format!("tenant{i}");
            let request = RequestParts::new().with_header("x-tenant-id", tenant.clone());
            guard
                .handle(&request, || async move {
                    for step in 0..10u64 {
                        tokio::time::sleep(Duration::from_micros((i * 7 + step) % 50)).await;
                        assert_eq!(TenantContext::current().as_deref(), Some(tenant.as_str()));
                    }
                    TenantContext::require()
                })
                .await
                .unwrap()
                .unwrap()
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), format!("tenant{i}"));
    }
}

#[tokio::test]
async fn test_single_thread_requests_never_mix() {
    init_tracing();

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let tasks: Vec<_> = ["acme", "globex", "initech"]
                .into_iter()
                .cycle()
                .take(12)
                .enumerate()
                .map(|(i, tenant)| {
                    tokio::task::spawn_local(async move {
                        let _scope = TenantContext::enter_scope(tenant);
                        for step in 0..5u64 {
                            tokio::time::sleep(Duration::from_micros((i as u64 * 3 + step) % 20))
                                .await;
                            let filter = TenantFilterProvider::filter_for::<Order>().unwrap();
                            assert_eq!(filter.tenant_id(), tenant);
                            assert!(filter.apply(orders()).all(|o| o.organization_id == tenant));
                        }
                        TenantContext::require().unwrap()
                    })
                })
                .collect();
            for (i, task) in tasks.into_iter().enumerate() {
                let expected = ["acme", "globex", "initech"][i % 3];
                assert_eq!(task.await.unwrap(), expected);
            }
        })
        .await;
    assert_eq!(TenantContext::current(), None);
}

#[test]
fn test_empty_identifier_policies() {
    init_tracing();
    let request = RequestParts::new().with_host("localhost");

    // default: scope entered with an empty id, queries still refused
    let guard = RequestScopeGuard::default();
    let tenant = guard.admit(&request).unwrap();
    RequestScopeGuard::with_tenant(tenant, || {
        assert_eq!(TenantContext::current().as_deref(), Some(""));
        assert_eq!(
            TenantFilterProvider::filter_for::<Order>(),
            Err(TenancyError::NoTenantContext)
        );
    });

    // reject: request never reaches a scope
    let config = TenancyConfig::default().with_empty_tenant(EmptyTenantPolicy::Reject);
    let guard = RequestScopeGuard::new(&config);
    assert_eq!(guard.admit(&request), Err(TenancyError::EmptyTenantId));
}

#[test]
fn test_worker_threads_reused_across_requests() {
    let pool = std::thread::spawn(|| {
        let first = RequestScopeGuard::with_tenant("acme", TenantContext::current);
        let second = TenantContext::current();
        (first, second)
    });
    let (first, second) = pool.join().unwrap();
    assert_eq!(first.as_deref(), Some("acme"));
    assert_eq!(second, None);
}
