use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Stored lowercased; uniqueness is case-insensitive by construction.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Quota tier. Levels above 0 require an emailed code at login.
    pub level: i32,

    /// Quota ceiling for this account.
    pub total_count: i64,

    /// Cumulative consumption across all model tiers.
    pub used_count: i64,

    /// Absolute account expiry, epoch millis.
    pub expire_time: i64,

    pub credits: i64,

    /// Per-model-tier counters, `{ "<tier>": { "numRequests": n } }`.
    pub usage: Json,

    pub is_admin: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
