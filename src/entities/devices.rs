use sea_orm::entity::prelude::*;

/// One bound client machine per row. The migration adds a unique index over
/// (`user_id`, `machine_id`) so registration races cannot create duplicates.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// Owner's email at registration time, echoed back as `currentAccount`.
    pub email: String,

    /// Client-supplied stable machine fingerprint.
    pub machine_id: String,

    /// Opaque secondary fingerprint generated by the client.
    pub machine_code: String,

    /// Server-issued credential for the downstream client application.
    pub cursor_token: String,

    pub is_active: bool,

    /// Epoch millis, bumped on register and info lookups.
    pub last_used: i64,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
