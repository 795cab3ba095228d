//! # Motorcycle Repository
//!
//! Plates are stored upper-cased and are unique per tenant. A motorcycle
//! always belongs to a customer of the same tenant.

use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::{Page, clean_optional, now, scoped};
use crate::error::{ServiceError, UniqueField};
use crate::models::{
    customer,
    motorcycle::{self, ActiveModel as MotorcycleActiveModel, Model as MotorcycleModel},
};
use crate::tenant::TenantId;

const UNIQUE_FIELDS: &[UniqueField] = &[UniqueField::new(
    "idx_motorcycles_tenant_plate",
    "motorcycles",
    "plate",
)];

#[derive(Debug, Clone)]
pub struct MotorcycleInput {
    pub customer_id: Uuid,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub mileage: Option<i32>,
}

/// Canonical plate form
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

impl MotorcycleInput {
    fn into_active_model(self, id: Option<Uuid>) -> MotorcycleActiveModel {
        let stamp = now();
        MotorcycleActiveModel {
            id: id.map(Set).unwrap_or(NotSet),
            tenant_id: NotSet,
            customer_id: Set(self.customer_id),
            plate: Set(normalize_plate(&self.plate)),
            brand: Set(self.brand.trim().to_string()),
            model: Set(self.model.trim().to_string()),
            year: Set(self.year),
            color: Set(clean_optional(self.color)),
            mileage: Set(self.mileage),
            created_at: if id.is_some() { Set(stamp) } else { NotSet },
            updated_at: Set(stamp),
        }
    }
}

pub struct MotorcycleRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> MotorcycleRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        tenant: TenantId,
        customer_id: Option<Uuid>,
        page: Page,
    ) -> Result<Vec<MotorcycleModel>, ServiceError> {
        let mut query = scoped::scoped::<motorcycle::Entity>(tenant);
        if let Some(customer_id) = customer_id {
            query = query.filter(motorcycle::Column::CustomerId.eq(customer_id));
        }
        Ok(query
            .order_by_asc(motorcycle::Column::Plate)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<MotorcycleModel, ServiceError> {
        scoped::find_one::<motorcycle::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Motorcycle", id))
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        input: MotorcycleInput,
    ) -> Result<MotorcycleModel, ServiceError> {
        self.ensure_customer(tenant, input.customer_id).await?;
        scoped::insert(self.db, tenant, input.into_active_model(Some(Uuid::new_v4())))
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))
    }

    pub async fn update(
        &self,
        tenant: TenantId,
        id: Uuid,
        input: MotorcycleInput,
    ) -> Result<MotorcycleModel, ServiceError> {
        self.ensure_customer(tenant, input.customer_id).await?;
        scoped::update(self.db, tenant, id, input.into_active_model(None))
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))?
            .ok_or_else(|| ServiceError::not_found("Motorcycle", id))
    }

    /// Delete a motorcycle; its work orders go with it.
    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), ServiceError> {
        let removed = scoped::delete::<motorcycle::Entity, _>(self.db, tenant, id)
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?;
        if !removed {
            return Err(ServiceError::not_found("Motorcycle", id));
        }
        Ok(())
    }

    async fn ensure_customer(&self, tenant: TenantId, customer_id: Uuid) -> Result<(), ServiceError> {
        match scoped::find_one::<customer::Entity, _>(self.db, tenant, customer_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::field("customer_id", "Customer not found")),
        }
    }
}
