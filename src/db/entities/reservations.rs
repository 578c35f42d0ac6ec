//! Slots booked by the starvation scenarios
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, Set};

/// Status stored for every booking the scenarios make.
pub const STATUS_BOOKED: &str = "Booked";

/// A booked slot
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    /// Row id
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Who booked it, eg `high-priority`
    pub username: String,
    /// Which slot, eg `Slot 3`
    pub slot: String,
    /// eg `Booked`
    pub status: String,
    /// When it was booked (UTC)
    pub created_at: DateTime,
}

/// No relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Insert a reservation stamped with the current time.
pub async fn record<C: ConnectionTrait>(
    db: &C,
    username: &str,
    slot: &str,
    status: &str,
) -> Result<Model, DbErr> {
    ActiveModel {
        username: Set(username.to_string()),
        slot: Set(slot.to_string()),
        status: Set(status.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Newest reservations first.
pub async fn recent<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .limit(limit)
        .all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_test_db, migrations::Migrator};
    use sea_orm_migration::MigratorTrait;

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let db = connect_test_db().await.expect("connect test db");
        Migrator::up(&db, None).await.expect("run migrations");

        for slot in ["Slot 1", "Slot 2", "Slot 3"] {
            record(&db, "high-priority", slot, STATUS_BOOKED)
                .await
                .expect("insert reservation");
        }
        record(&db, "low-priority", "Slot 4", STATUS_BOOKED)
            .await
            .expect("insert reservation");

        let rows = recent(&db, 2).await.expect("fetch reservations");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].slot, "Slot 4");
        assert_eq!(rows[0].username, "low-priority");
        assert_eq!(rows[1].slot, "Slot 3");
        assert_eq!(rows[1].status, STATUS_BOOKED);
    }

    #[tokio::test]
    async fn migrations_apply_cleanly() {
        let db = connect_test_db().await.expect("connect test db");
        Migrator::up(&db, None).await.expect("run migrations");
        assert!(recent(&db, 10).await.expect("empty table").is_empty());
    }
}
