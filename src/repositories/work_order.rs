//! # Work Order Repository
//!
//! Work orders move through `Diagnosticando` → `Reparado` → `Entregado`.
//! Each status owns a timestamp column that is stamped when the order
//! enters that status; `Entregado` also stamps `completed_at`. Re-applying
//! the current status writes nothing. By default any status may follow any
//! other; with order enforcement on, backwards moves are rejected.

use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::{Page, clean_optional, now, scoped};
use crate::error::ServiceError;
use crate::models::{
    motorcycle, technician,
    work_order::{
        self, ActiveModel as WorkOrderActiveModel, Model as WorkOrderModel, WorkOrderStatus,
    },
};
use crate::tenant::TenantId;

#[derive(Debug, Clone)]
pub struct WorkOrderInput {
    pub motorcycle_id: Uuid,
    pub technician_id: Uuid,
    pub description: String,
    pub diagnosis: Option<String>,
    pub labor_cost: i64,
}

#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub technician_id: Option<Uuid>,
    pub motorcycle_id: Option<Uuid>,
}

/// Result of a status change request
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order: WorkOrderModel,
    /// `false` when the order already had the requested status
    pub changed: bool,
}

impl WorkOrderInput {
    fn into_active_model(self, id: Option<Uuid>) -> WorkOrderActiveModel {
        let stamp = now();
        let mut model = WorkOrderActiveModel {
            id: id.map(Set).unwrap_or(NotSet),
            tenant_id: NotSet,
            motorcycle_id: Set(self.motorcycle_id),
            technician_id: Set(self.technician_id),
            description: Set(self.description.trim().to_string()),
            diagnosis: Set(clean_optional(self.diagnosis)),
            labor_cost: Set(self.labor_cost),
            updated_at: Set(stamp),
            ..Default::default()
        };
        if id.is_some() {
            // New orders start in diagnosis.
            model.status = Set(WorkOrderStatus::Diagnosticando.as_str().to_string());
            model.diagnosed_at = Set(Some(stamp));
            model.repaired_at = Set(None);
            model.delivered_at = Set(None);
            model.completed_at = Set(None);
            model.created_at = Set(stamp);
        }
        model
    }
}

pub struct WorkOrderRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> WorkOrderRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Newest first.
    pub async fn list(
        &self,
        tenant: TenantId,
        filter: WorkOrderFilter,
        page: Page,
    ) -> Result<Vec<WorkOrderModel>, ServiceError> {
        let mut query = scoped::scoped::<work_order::Entity>(tenant);
        if let Some(status) = filter.status {
            query = query.filter(work_order::Column::Status.eq(status.as_str()));
        }
        if let Some(technician_id) = filter.technician_id {
            query = query.filter(work_order::Column::TechnicianId.eq(technician_id));
        }
        if let Some(motorcycle_id) = filter.motorcycle_id {
            query = query.filter(work_order::Column::MotorcycleId.eq(motorcycle_id));
        }
        Ok(query
            .order_by_desc(work_order::Column::CreatedAt)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<WorkOrderModel, ServiceError> {
        scoped::find_one::<work_order::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Work order", id))
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        input: WorkOrderInput,
    ) -> Result<WorkOrderModel, ServiceError> {
        self.check_references(tenant, &input, true).await?;
        scoped::insert(self.db, tenant, input.into_active_model(Some(Uuid::new_v4())))
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))
    }

    /// Update the descriptive fields. Status changes go through
    /// [`WorkOrderRepository::set_status`].
    pub async fn update(
        &self,
        tenant: TenantId,
        id: Uuid,
        input: WorkOrderInput,
    ) -> Result<WorkOrderModel, ServiceError> {
        let current = self.get(tenant, id).await?;
        let reassigned = current.technician_id != input.technician_id;
        self.check_references(tenant, &input, reassigned).await?;

        scoped::update(self.db, tenant, id, input.into_active_model(None))
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?
            .ok_or_else(|| ServiceError::not_found("Work order", id))
    }

    pub async fn set_status(
        &self,
        tenant: TenantId,
        id: Uuid,
        next: WorkOrderStatus,
        enforce_order: bool,
    ) -> Result<StatusChange, ServiceError> {
        let current = self.get(tenant, id).await?;
        let current_status = current.status.parse::<WorkOrderStatus>().unwrap_or_else(|err| {
            tracing::warn!(work_order_id = %id, error = %err, "Stored work order status is unknown");
            WorkOrderStatus::Diagnosticando
        });

        if current_status == next {
            return Ok(StatusChange {
                order: current,
                changed: false,
            });
        }

        if enforce_order && !current_status.can_advance_to(next) {
            return Err(ServiceError::InvalidTransition {
                from: current_status,
                to: next,
            });
        }

        let stamp = now();
        let mut changes = WorkOrderActiveModel {
            status: Set(next.as_str().to_string()),
            updated_at: Set(stamp),
            ..Default::default()
        };
        // Leaving delivery reopens the order.
        if current_status.is_terminal() && !next.is_terminal() {
            changes.delivered_at = Set(None);
            changes.completed_at = Set(None);
        }
        match next {
            WorkOrderStatus::Diagnosticando => changes.diagnosed_at = Set(Some(stamp)),
            WorkOrderStatus::Reparado => changes.repaired_at = Set(Some(stamp)),
            WorkOrderStatus::Entregado => {
                changes.delivered_at = Set(Some(stamp));
                changes.completed_at = Set(Some(stamp));
            }
        }

        let order = scoped::update(self.db, tenant, id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("Work order", id))?;

        tracing::info!(
            work_order_id = %id,
            from = %current_status,
            to = %next,
            "Work order status changed"
        );
        Ok(StatusChange {
            order,
            changed: true,
        })
    }

    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), ServiceError> {
        let removed = scoped::delete::<work_order::Entity, _>(self.db, tenant, id)
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?;
        if !removed {
            return Err(ServiceError::not_found("Work order", id));
        }
        Ok(())
    }

    /// Motorcycle and technician must belong to the tenant. A technician
    /// newly assigned to an order must be active.
    async fn check_references(
        &self,
        tenant: TenantId,
        input: &WorkOrderInput,
        require_active_technician: bool,
    ) -> Result<(), ServiceError> {
        if scoped::find_one::<motorcycle::Entity, _>(self.db, tenant, input.motorcycle_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::field("motorcycle_id", "Motorcycle not found"));
        }

        match scoped::find_one::<technician::Entity, _>(self.db, tenant, input.technician_id)
            .await?
        {
            None => Err(ServiceError::field("technician_id", "Technician not found")),
            Some(tech) if require_active_technician && !tech.active => {
                Err(ServiceError::field("technician_id", "Technician is inactive"))
            }
            Some(_) => Ok(()),
        }
    }
}
