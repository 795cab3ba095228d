//! Tenant-scoped data gateway.
//!
//! Every tenant-owned entity implements [`TenantScoped`], and every read or
//! write on such an entity goes through the functions here. Each one takes
//! the [`TenantId`] and folds it into the query: reads filter by it, inserts
//! stamp it over whatever the caller put in the model, and updates/deletes
//! only ever touch rows of that tenant. A row owned by another tenant is
//! indistinguishable from a missing row.
//!
//! The functions are generic over [`ConnectionTrait`], so the same calls
//! run against the pool or inside a transaction.

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Select,
};
use uuid::Uuid;

use crate::models::{
    appointment, customer, inventory_item, motorcycle, sale, sale_item, technician, user,
    work_order,
};
use crate::tenant::TenantId;

/// An entity whose rows belong to exactly one tenant.
pub trait TenantScoped: EntityTrait + 'static {
    fn tenant_column() -> Self::Column;
    fn id_column() -> Self::Column;
}

macro_rules! tenant_scoped {
    ($($module:ident),+ $(,)?) => {
        $(
            impl TenantScoped for $module::Entity {
                fn tenant_column() -> Self::Column {
                    $module::Column::TenantId
                }

                fn id_column() -> Self::Column {
                    $module::Column::Id
                }
            }
        )+
    };
}

tenant_scoped!(
    user,
    customer,
    motorcycle,
    technician,
    inventory_item,
    appointment,
    work_order,
    sale,
    sale_item,
);

/// Base select for `E` restricted to `tenant`.
pub fn scoped<E: TenantScoped>(tenant: TenantId) -> Select<E> {
    E::find().filter(E::tenant_column().eq(tenant))
}

pub async fn find_one<E, C>(db: &C, tenant: TenantId, id: Uuid) -> Result<Option<E::Model>, DbErr>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    scoped::<E>(tenant)
        .filter(E::id_column().eq(id))
        .one(db)
        .await
}

pub async fn find_many<E, C>(
    db: &C,
    tenant: TenantId,
    condition: Condition,
) -> Result<Vec<E::Model>, DbErr>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    scoped::<E>(tenant).filter(condition).all(db).await
}

/// Insert `model` as a row of `tenant`. The tenant column is always
/// overwritten.
pub async fn insert<A, C>(
    db: &C,
    tenant: TenantId,
    mut model: A,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    A::Entity: TenantScoped,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    model.set(<A::Entity as TenantScoped>::tenant_column(), tenant.into());
    model.insert(db).await
}

/// Apply the set columns of `changes` to row `id` of `tenant` and return
/// the refreshed row, or `None` when no such row exists for the tenant.
pub async fn update<A, C>(
    db: &C,
    tenant: TenantId,
    id: Uuid,
    mut changes: A,
) -> Result<Option<<A::Entity as EntityTrait>::Model>, DbErr>
where
    A: ActiveModelTrait + Send,
    A::Entity: TenantScoped,
    C: ConnectionTrait,
{
    let tenant_column = <A::Entity as TenantScoped>::tenant_column();
    let id_column = <A::Entity as TenantScoped>::id_column();

    changes.not_set(id_column);
    changes.set(tenant_column, tenant.into());

    let result = <A::Entity as EntityTrait>::update_many()
        .set(changes)
        .filter(id_column.eq(id))
        .filter(tenant_column.eq(tenant))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    find_one::<A::Entity, C>(db, tenant, id).await
}

/// Delete row `id` of `tenant`. Returns whether a row was removed.
pub async fn delete<E, C>(db: &C, tenant: TenantId, id: Uuid) -> Result<bool, DbErr>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    let result = E::delete_many()
        .filter(E::id_column().eq(id))
        .filter(E::tenant_column().eq(tenant))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Update the tenant row matching `matching`, or insert `insert_model` when
/// there is none. Both branches carry the tenant stamp. Callers that need
/// the check and the write to be atomic run this inside a transaction.
pub async fn upsert<A, C>(
    db: &C,
    tenant: TenantId,
    matching: Condition,
    insert_model: A,
    mut update_model: A,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    A::Entity: TenantScoped,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    let existing = scoped::<A::Entity>(tenant)
        .filter(matching.clone())
        .one(db)
        .await?;

    if existing.is_none() {
        return insert(db, tenant, insert_model).await;
    }

    let tenant_column = <A::Entity as TenantScoped>::tenant_column();
    update_model.not_set(<A::Entity as TenantScoped>::id_column());
    update_model.set(tenant_column, tenant.into());

    <A::Entity as EntityTrait>::update_many()
        .set(update_model)
        .filter(tenant_column.eq(tenant))
        .filter(matching.clone())
        .exec(db)
        .await?;

    scoped::<A::Entity>(tenant)
        .filter(matching)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("upserted row vanished".to_string()))
}

pub async fn count<E, C>(db: &C, tenant: TenantId) -> Result<u64, DbErr>
where
    E: TenantScoped,
    E::Model: Sync,
    C: ConnectionTrait,
{
    scoped::<E>(tenant).count(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveValue::Set, Database, DatabaseConnection};

    use crate::models::tenant;

    async fn setup() -> (DatabaseConnection, TenantId, TenantId) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let mut tenants = Vec::new();
        for name in ["Taller A", "Taller B"] {
            let id = Uuid::new_v4();
            tenant::ActiveModel {
                id: Set(id),
                name: Set(name.to_string()),
                domain: Set(None),
                email: Set(format!("{}@taller.test", id.simple())),
                phone: Set(None),
                created_at: Set(Utc::now().into()),
                updated_at: Set(Utc::now().into()),
            }
            .insert(&db)
            .await
            .unwrap();
            tenants.push(TenantId::from(id));
        }
        (db, tenants[0], tenants[1])
    }

    fn technician_model(name: &str, claimed_tenant: Uuid) -> technician::ActiveModel {
        technician::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(claimed_tenant),
            name: Set(name.to_string()),
            specialty: Set(None),
            phone: Set(None),
            active: Set(true),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        }
    }

    #[tokio::test]
    async fn insert_overrides_client_tenant() {
        let (db, t1, t2) = setup().await;

        let row = insert(&db, t1, technician_model("Luis", t2.into_uuid()))
            .await
            .unwrap();

        assert_eq!(row.tenant_id, t1.into_uuid());
        assert!(
            find_one::<technician::Entity, _>(&db, t2, row.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn other_tenant_rows_are_not_found_for_update_or_delete() {
        let (db, t1, t2) = setup().await;
        let row = insert(&db, t1, technician_model("Luis", t1.into_uuid()))
            .await
            .unwrap();

        let changes = technician::ActiveModel {
            name: Set("Hijacked".into()),
            ..Default::default()
        };
        assert!(update(&db, t2, row.id, changes).await.unwrap().is_none());
        assert!(!delete::<technician::Entity, _>(&db, t2, row.id).await.unwrap());

        let untouched = find_one::<technician::Entity, _>(&db, t1, row.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.name, "Luis");
        assert_eq!(count::<technician::Entity, _>(&db, t1).await.unwrap(), 1);
        assert_eq!(count::<technician::Entity, _>(&db, t2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_cannot_move_row_to_another_tenant() {
        let (db, t1, t2) = setup().await;
        let row = insert(&db, t1, technician_model("Luis", t1.into_uuid()))
            .await
            .unwrap();

        let changes = technician::ActiveModel {
            tenant_id: Set(t2.into_uuid()),
            name: Set("Luis Alberto".into()),
            ..Default::default()
        };
        let updated = update(&db, t1, row.id, changes).await.unwrap().unwrap();

        assert_eq!(updated.tenant_id, t1.into_uuid());
        assert_eq!(updated.name, "Luis Alberto");
    }

    #[tokio::test]
    async fn find_many_merges_tenant_into_condition() {
        let (db, t1, t2) = setup().await;
        insert(&db, t1, technician_model("Ana", t1.into_uuid()))
            .await
            .unwrap();
        insert(&db, t2, technician_model("Ana", t2.into_uuid()))
            .await
            .unwrap();

        let rows = find_many::<technician::Entity, _>(
            &db,
            t1,
            Condition::all().add(technician::Column::Name.eq("Ana")),
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tenant_id, t1.into_uuid());
    }

    #[tokio::test]
    async fn upsert_scopes_match_by_tenant() {
        let (db, t1, t2) = setup().await;
        let by_name = || Condition::all().add(technician::Column::Name.eq("Ana"));
        let rename = || technician::ActiveModel {
            specialty: Set(Some("frenos".into())),
            ..Default::default()
        };

        let first = upsert(&db, t1, by_name(), technician_model("Ana", t2.into_uuid()), rename())
            .await
            .unwrap();
        assert_eq!(first.tenant_id, t1.into_uuid());
        assert_eq!(first.specialty, None);

        let second = upsert(&db, t1, by_name(), technician_model("Ana", t1.into_uuid()), rename())
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.specialty.as_deref(), Some("frenos"));

        let other = upsert(&db, t2, by_name(), technician_model("Ana", t2.into_uuid()), rename())
            .await
            .unwrap();
        assert_ne!(other.id, first.id);
        assert_eq!(count::<technician::Entity, _>(&db, t1).await.unwrap(), 1);
    }
}
