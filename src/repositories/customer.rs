//! # Customer Repository

use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, Condition, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::{Page, clean_optional, now, scoped};
use crate::error::{ServiceError, UniqueField};
use crate::models::customer::{self, ActiveModel as CustomerActiveModel, Model as CustomerModel};
use crate::tenant::TenantId;

const UNIQUE_FIELDS: &[UniqueField] = &[
    UniqueField::new("idx_customers_tenant_email", "customers", "email"),
    UniqueField::new("idx_customers_tenant_cedula", "customers", "cedula"),
];

/// Customer fields accepted on create and update
#[derive(Debug, Clone)]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    /// National id number
    pub cedula: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerInput {
    fn into_active_model(self, id: Option<Uuid>) -> CustomerActiveModel {
        let stamp = now();
        CustomerActiveModel {
            id: id.map(Set).unwrap_or(NotSet),
            tenant_id: NotSet,
            name: Set(self.name.trim().to_string()),
            email: Set(self.email.trim().to_lowercase()),
            cedula: Set(self.cedula.trim().to_string()),
            phone: Set(clean_optional(self.phone)),
            address: Set(clean_optional(self.address)),
            created_at: if id.is_some() { Set(stamp) } else { NotSet },
            updated_at: Set(stamp),
        }
    }
}

pub struct CustomerRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CustomerRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// List customers ordered by name, optionally matching `search` against
    /// name, email or cedula.
    pub async fn list(
        &self,
        tenant: TenantId,
        search: Option<&str>,
        page: Page,
    ) -> Result<Vec<CustomerModel>, ServiceError> {
        let mut query = scoped::scoped::<customer::Entity>(tenant);
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(customer::Column::Name.contains(term))
                    .add(customer::Column::Email.contains(term.to_lowercase()))
                    .add(customer::Column::Cedula.contains(term)),
            );
        }

        Ok(query
            .order_by_asc(customer::Column::Name)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<CustomerModel, ServiceError> {
        scoped::find_one::<customer::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer", id))
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        input: CustomerInput,
    ) -> Result<CustomerModel, ServiceError> {
        let model = input.into_active_model(Some(Uuid::new_v4()));
        scoped::insert(self.db, tenant, model)
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))
    }

    pub async fn update(
        &self,
        tenant: TenantId,
        id: Uuid,
        input: CustomerInput,
    ) -> Result<CustomerModel, ServiceError> {
        scoped::update(self.db, tenant, id, input.into_active_model(None))
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))?
            .ok_or_else(|| ServiceError::not_found("Customer", id))
    }

    /// Delete a customer together with their motorcycles and appointments.
    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), ServiceError> {
        let removed = scoped::delete::<customer::Entity, _>(self.db, tenant, id)
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?;
        if !removed {
            return Err(ServiceError::not_found("Customer", id));
        }
        Ok(())
    }
}
