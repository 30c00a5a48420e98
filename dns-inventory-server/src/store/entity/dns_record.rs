use sea_orm::entity::prelude::*;

/// A DNS record observed from one provider.
///
/// Identity is the signature `(domain, subdomain, record_type, data,
/// source)`; a change to `ttl`/`priority`/`raw_data` is an update of the
/// same record, not a new one.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dns_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub domain: String,
    pub subdomain: String,
    pub record_type: String,
    #[sea_orm(column_type = "Text")]
    pub data: String,
    pub ttl: Option<i32>,
    pub priority: Option<i32>,
    pub source: String,
    pub status: String,
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
