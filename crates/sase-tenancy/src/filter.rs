//! Tenant Filters for the Query Layer
//!
//! Entity types opt in with [`TenantScoped`]; [`TenantFilterProvider`] turns
//! the current tenant into a [`TenantFilter`] the query layer ANDs into every
//! query. Building a filter outside a tenant scope fails, so an unscoped query
//! never silently spans tenants.

use crate::context::TenantContext;
use crate::error::TenancyResult;
use serde::Serialize;

/// Default column holding the owning tenant
pub const TENANT_FIELD: &str = "organization_id";

/// An entity whose rows belong to exactly one tenant
pub trait TenantScoped {
    /// Entity (table) name
    const ENTITY: &'static str;

    /// Column holding the owning tenant
    const TENANT_FIELD: &'static str = TENANT_FIELD;

    /// Owning tenant of this row
    fn organization_id(&self) -> &str;
}

/// Equality predicate `entity.field = tenant_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantFilter {
    entity: &'static str,
    field: &'static str,
    tenant_id: String,
}

impl TenantFilter {
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Whether `row` passes the filter
    pub fn matches<E: TenantScoped>(&self, row: &E) -> bool {
        E::ENTITY == self.entity && row.organization_id() == self.tenant_id
    }

    /// Keep only the rows owned by the filter's tenant
    pub fn apply<'a, E, I>(&'a self, rows: I) -> impl Iterator<Item = E> + 'a
    where
        E: TenantScoped + 'a,
        I: IntoIterator<Item = E>,
        I::IntoIter: 'a,
    {
        rows.into_iter().filter(move |row| self.matches(row))
    }

    /// SQL condition with the tenant bound to `placeholder`, e.g.
    /// `orders.organization_id = $1`
    pub fn to_sql(&self, placeholder: &str) -> String {
        format!("{}.{} = {}", self.entity, self.field, placeholder)
    }
}

/// Builds tenant filters from the current scope
pub struct TenantFilterProvider;

impl TenantFilterProvider {
    /// Filter for entity `E` bound to the current tenant. Fails with
    /// `NoTenantContext` outside a (non-empty) tenant scope.
    pub fn filter_for<E: TenantScoped>() -> TenancyResult<TenantFilter> {
        let tenant_id = TenantContext::require()?;
        tracing::debug!(entity = E::ENTITY, tenant = %tenant_id, "tenant filter built");
        Ok(TenantFilter {
            entity: E::ENTITY,
            field: E::TENANT_FIELD,
            tenant_id,
        })
    }

    /// Apply the current tenant's filter to `rows`
    pub fn scope_rows<E, I>(rows: I) -> TenancyResult<Vec<E>>
    where
        E: TenantScoped,
        I: IntoIterator<Item = E>,
    {
        let filter = Self::filter_for::<E>()?;
        Ok(filter.apply(rows).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TenancyError;
    use crate::guard::RequestScopeGuard;

    #[derive(Debug, Clone, PartialEq)]
    struct Order {
        id: u32,
        organization_id: String,
    }

    impl TenantScoped for Order {
        const ENTITY: &'static str = "orders";

        fn organization_id(&self) -> &str {
            &self.organization_id
        }
    }

    struct Invoice {
        account: String,
    }

    impl TenantScoped for Invoice {
        const ENTITY: &'static str = "invoices";
        const TENANT_FIELD: &'static str = "account_id";

        fn organization_id(&self) -> &str {
            &self.account
        }
    }

    fn order(id: u32, tenant: &str) -> Order {
        Order {
            id,
            organization_id: tenant.to_string(),
        }
    }

    #[test]
    fn test_filter_requires_scope() {
        assert_eq!(
            TenantFilterProvider::filter_for::<Order>(),
            Err(TenancyError::NoTenantContext)
        );
        let _empty = TenantContext::enter_scope("");
        assert_eq!(
            TenantFilterProvider::filter_for::<Order>(),
            Err(TenancyError::NoTenantContext)
        );
    }

    #[test]
    fn test_filter_for_order() {
        let _scope = TenantContext::enter_scope("acme");
        let filter = TenantFilterProvider::filter_for::<Order>().unwrap();

        assert_eq!(filter.entity(), "orders");
        assert_eq!(filter.field(), "organization_id");
        assert_eq!(filter.tenant_id(), "acme");
        assert_eq!(filter.to_sql("$1"), "orders.organization_id = $1");
        assert!(filter.matches(&order(1, "acme")));
        assert!(!filter.matches(&order(2, "globex")));
    }

    #[test]
    fn test_custom_field_and_entity_mismatch() {
        let _scope = TenantContext::enter_scope("acme");
        let filter = TenantFilterProvider::filter_for::<Invoice>().unwrap();
        assert_eq!(filter.to_sql("?"), "invoices.account_id = ?");
        assert!(filter.matches(&Invoice { account: "acme".into() }));
        // a filter built for invoices never admits orders
        assert!(!filter.matches(&order(1, "acme")));
    }

    #[test]
    fn test_scope_rows() {
        let rows = vec![order(1, "acme"), order(2, "globex"), order(3, "acme")];

        let scoped =
            RequestScopeGuard::with_tenant("acme", || TenantFilterProvider::scope_rows(rows.clone()));
        let ids: Vec<u32> = scoped.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 3]);

        assert!(TenantFilterProvider::scope_rows(rows).is_err());
    }
}
