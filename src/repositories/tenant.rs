//! # Tenant Repository
//!
//! Tenants are the root of isolation and are managed by platform operators.
//! A tenant can only be deleted once it owns no records at all.

use std::collections::BTreeMap;

use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ConnectionTrait, EntityTrait, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use super::{Page, clean_optional, now, scoped};
use crate::error::{ServiceError, UniqueField};
use crate::models::{
    appointment, customer, inventory_item, motorcycle, sale, sale_item, technician,
    tenant::{self, ActiveModel as TenantActiveModel, Entity as Tenant, Model as TenantModel},
    user, work_order,
};
use crate::tenant::TenantId;

const UNIQUE_FIELDS: &[UniqueField] = &[UniqueField::new("idx_tenants_domain", "tenants", "domain")];

#[derive(Debug, Clone)]
pub struct TenantInput {
    pub name: String,
    pub domain: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

/// Repository for Tenant database operations
pub struct TenantRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TenantRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: TenantInput) -> Result<TenantModel, ServiceError> {
        let stamp = now();
        let model = TenantActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            domain: Set(clean_optional(input.domain).map(|d| d.to_lowercase())),
            email: Set(input.email.trim().to_lowercase()),
            phone: Set(clean_optional(input.phone)),
            created_at: Set(stamp),
            updated_at: Set(stamp),
        };

        let created = model
            .insert(self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))?;
        tracing::info!(tenant_id = %created.id, name = %created.name, "Tenant created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<TenantModel, ServiceError> {
        Tenant::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant", id))
    }

    pub async fn list(&self, page: Page) -> Result<Vec<TenantModel>, ServiceError> {
        Ok(Tenant::find()
            .order_by_asc(tenant::Column::Name)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    pub async fn update(&self, id: Uuid, input: TenantInput) -> Result<TenantModel, ServiceError> {
        self.get(id).await?;

        let model = TenantActiveModel {
            id: Set(id),
            name: Set(input.name.trim().to_string()),
            domain: Set(clean_optional(input.domain).map(|d| d.to_lowercase())),
            email: Set(input.email.trim().to_lowercase()),
            phone: Set(clean_optional(input.phone)),
            created_at: NotSet,
            updated_at: Set(now()),
        };
        model
            .update(self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))
    }

    /// Number of records the tenant owns, per table.
    pub async fn dependent_counts(
        &self,
        tenant: TenantId,
    ) -> Result<BTreeMap<&'static str, u64>, ServiceError> {
        let db = self.db;
        let mut counts = BTreeMap::new();
        counts.insert("users", scoped::count::<user::Entity, _>(db, tenant).await?);
        counts.insert("customers", scoped::count::<customer::Entity, _>(db, tenant).await?);
        counts.insert("motorcycles", scoped::count::<motorcycle::Entity, _>(db, tenant).await?);
        counts.insert("technicians", scoped::count::<technician::Entity, _>(db, tenant).await?);
        counts.insert(
            "inventory_items",
            scoped::count::<inventory_item::Entity, _>(db, tenant).await?,
        );
        counts.insert("appointments", scoped::count::<appointment::Entity, _>(db, tenant).await?);
        counts.insert("work_orders", scoped::count::<work_order::Entity, _>(db, tenant).await?);
        counts.insert("sales", scoped::count::<sale::Entity, _>(db, tenant).await?);
        counts.insert("sale_items", scoped::count::<sale_item::Entity, _>(db, tenant).await?);
        Ok(counts)
    }
}

impl<'a, C: ConnectionTrait + TransactionTrait> TenantRepository<'a, C> {
    /// Delete a tenant that owns nothing. Otherwise fails with the
    /// non-zero dependent counts.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        if Tenant::find_by_id(id).one(&txn).await?.is_none() {
            txn.rollback().await?;
            return Err(ServiceError::not_found("Tenant", id));
        }

        let dependents: BTreeMap<&'static str, u64> = TenantRepository::new(&txn)
            .dependent_counts(TenantId::from(id))
            .await?
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        if !dependents.is_empty() {
            txn.rollback().await?;
            tracing::info!(tenant_id = %id, ?dependents, "Refusing to delete tenant with records");
            return Err(ServiceError::TenantHasDependents(dependents));
        }

        Tenant::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?;
        txn.commit().await?;

        tracing::info!(tenant_id = %id, "Tenant deleted");
        Ok(())
    }
}
