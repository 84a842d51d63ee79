use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "verification_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub username: String,

    /// 6-digit numeric code.
    pub code: String,

    /// "login" or "reset_password".
    pub purpose: String,

    /// Epoch millis. Checked at verify time; the background sweep only
    /// reclaims storage.
    pub expires_at: i64,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
