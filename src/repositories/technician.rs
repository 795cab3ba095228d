//! # Technician Repository

use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::{Page, clean_optional, now, scoped};
use crate::error::ServiceError;
use crate::models::technician::{
    self, ActiveModel as TechnicianActiveModel, Model as TechnicianModel,
};
use crate::tenant::TenantId;

#[derive(Debug, Clone)]
pub struct TechnicianInput {
    pub name: String,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
}

impl TechnicianInput {
    fn into_active_model(self, id: Option<Uuid>) -> TechnicianActiveModel {
        let stamp = now();
        TechnicianActiveModel {
            id: id.map(Set).unwrap_or(NotSet),
            tenant_id: NotSet,
            name: Set(self.name.trim().to_string()),
            specialty: Set(clean_optional(self.specialty)),
            phone: Set(clean_optional(self.phone)),
            active: Set(self.active),
            created_at: if id.is_some() { Set(stamp) } else { NotSet },
            updated_at: Set(stamp),
        }
    }
}

pub struct TechnicianRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TechnicianRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        tenant: TenantId,
        active_only: bool,
        page: Page,
    ) -> Result<Vec<TechnicianModel>, ServiceError> {
        let mut query = scoped::scoped::<technician::Entity>(tenant);
        if active_only {
            query = query.filter(technician::Column::Active.eq(true));
        }
        Ok(query
            .order_by_asc(technician::Column::Name)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<TechnicianModel, ServiceError> {
        scoped::find_one::<technician::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Technician", id))
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        input: TechnicianInput,
    ) -> Result<TechnicianModel, ServiceError> {
        scoped::insert(self.db, tenant, input.into_active_model(Some(Uuid::new_v4())))
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))
    }

    pub async fn update(
        &self,
        tenant: TenantId,
        id: Uuid,
        input: TechnicianInput,
    ) -> Result<TechnicianModel, ServiceError> {
        scoped::update(self.db, tenant, id, input.into_active_model(None))
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?
            .ok_or_else(|| ServiceError::not_found("Technician", id))
    }

    /// Technicians with work orders cannot be deleted; deactivate them instead.
    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), ServiceError> {
        let removed = scoped::delete::<technician::Entity, _>(self.db, tenant, id)
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?;
        if !removed {
            return Err(ServiceError::not_found("Technician", id));
        }
        Ok(())
    }
}
