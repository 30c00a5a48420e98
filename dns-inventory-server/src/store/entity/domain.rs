use sea_orm::entity::prelude::*;

/// A registered domain observed from one registrar.
///
/// Identity is `(domain, registrar)`; `discovery_date` is immutable after
/// the first insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "domains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub domain: String,
    pub registrar: String,
    pub status: String,
    pub expiry_date: Option<Date>,
    pub discovery_date: Date,
    pub last_seen: Date,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub raw_data: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
