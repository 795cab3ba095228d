//! # Appointment Repository

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::{Page, now, scoped};
use crate::error::ServiceError;
use crate::models::{
    appointment::{
        self, ActiveModel as AppointmentActiveModel, AppointmentStatus, Model as AppointmentModel,
    },
    customer, motorcycle,
};
use crate::tenant::TenantId;

#[derive(Debug, Clone)]
pub struct AppointmentInput {
    pub customer_id: Uuid,
    pub motorcycle_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
}

/// Optional filters for the appointment list
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentInput {
    fn into_active_model(self, id: Option<Uuid>) -> AppointmentActiveModel {
        let stamp = now();
        AppointmentActiveModel {
            id: id.map(Set).unwrap_or(NotSet),
            tenant_id: NotSet,
            customer_id: Set(self.customer_id),
            motorcycle_id: Set(self.motorcycle_id),
            scheduled_at: Set(self.scheduled_at.into()),
            reason: Set(self.reason.trim().to_string()),
            status: Set(self.status.as_str().to_string()),
            created_at: if id.is_some() { Set(stamp) } else { NotSet },
            updated_at: Set(stamp),
        }
    }
}

pub struct AppointmentRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AppointmentRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Appointments in schedule order.
    pub async fn list(
        &self,
        tenant: TenantId,
        filter: AppointmentFilter,
        page: Page,
    ) -> Result<Vec<AppointmentModel>, ServiceError> {
        let mut query = scoped::scoped::<appointment::Entity>(tenant);
        if let Some(from) = filter.from {
            query = query.filter(appointment::Column::ScheduledAt.gte(from.fixed_offset()));
        }
        if let Some(to) = filter.to {
            query = query.filter(appointment::Column::ScheduledAt.lt(to.fixed_offset()));
        }
        if let Some(status) = filter.status {
            query = query.filter(appointment::Column::Status.eq(status.as_str()));
        }
        Ok(query
            .order_by_asc(appointment::Column::ScheduledAt)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<AppointmentModel, ServiceError> {
        scoped::find_one::<appointment::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Appointment", id))
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        input: AppointmentInput,
    ) -> Result<AppointmentModel, ServiceError> {
        self.check_references(tenant, &input).await?;
        scoped::insert(self.db, tenant, input.into_active_model(Some(Uuid::new_v4())))
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))
    }

    pub async fn update(
        &self,
        tenant: TenantId,
        id: Uuid,
        input: AppointmentInput,
    ) -> Result<AppointmentModel, ServiceError> {
        self.check_references(tenant, &input).await?;
        scoped::update(self.db, tenant, id, input.into_active_model(None))
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?
            .ok_or_else(|| ServiceError::not_found("Appointment", id))
    }

    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), ServiceError> {
        let removed = scoped::delete::<appointment::Entity, _>(self.db, tenant, id)
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?;
        if !removed {
            return Err(ServiceError::not_found("Appointment", id));
        }
        Ok(())
    }

    /// The customer must be the tenant's, and a referenced motorcycle must
    /// belong to that customer.
    async fn check_references(
        &self,
        tenant: TenantId,
        input: &AppointmentInput,
    ) -> Result<(), ServiceError> {
        if scoped::find_one::<customer::Entity, _>(self.db, tenant, input.customer_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::field("customer_id", "Customer not found"));
        }

        if let Some(motorcycle_id) = input.motorcycle_id {
            let motorcycle =
                scoped::find_one::<motorcycle::Entity, _>(self.db, tenant, motorcycle_id).await?;
            match motorcycle {
                Some(m) if m.customer_id == input.customer_id => {}
                Some(_) => {
                    return Err(ServiceError::field(
                        "motorcycle_id",
                        "Motorcycle belongs to another customer",
                    ));
                }
                None => return Err(ServiceError::field("motorcycle_id", "Motorcycle not found")),
            }
        }
        Ok(())
    }
}
