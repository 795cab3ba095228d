//! # User Repository
//!
//! Users log into one tenant; emails are unique within it.

use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, QueryFilter};
use uuid::Uuid;

use super::{now, scoped};
use crate::error::{ServiceError, UniqueField};
use crate::models::user::{self, Model as UserModel, Role};
use crate::password;
use crate::tenant::TenantId;

const UNIQUE_FIELDS: &[UniqueField] = &[UniqueField::new(
    "idx_users_tenant_email",
    "users",
    "email",
)];

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

pub struct UserRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, tenant: TenantId, input: NewUser) -> Result<UserModel, ServiceError> {
        let password_hash = password::hash_password(&input.password)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.into_uuid()),
            email: Set(input.email.trim().to_lowercase()),
            name: Set(input.name.trim().to_string()),
            password_hash: Set(password_hash),
            role: Set(input.role.as_str().to_string()),
            created_at: Set(now()),
        };

        let created = scoped::insert(self.db, tenant, model)
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))?;
        tracing::info!(tenant_id = %tenant, user_id = %created.id, "User provisioned");
        Ok(created)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<UserModel, ServiceError> {
        scoped::find_one::<user::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    pub async fn find_by_email(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> Result<Option<UserModel>, ServiceError> {
        Ok(scoped::scoped::<user::Entity>(tenant)
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db)
            .await?)
    }

    /// The user matching `email` and `password` in `tenant`, if any.
    pub async fn authenticate(
        &self,
        tenant: TenantId,
        email: &str,
        password: &str,
    ) -> Result<Option<UserModel>, ServiceError> {
        let Some(user) = self.find_by_email(tenant, email).await? else {
            return Ok(None);
        };
        match password::verify_password(password, &user.password_hash) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "Stored password hash is unusable");
                Ok(None)
            }
        }
    }
}
