//! Inventory store: SQL-backed tables behind a thin `SeaORM` wrapper.
//!
//! Writes go through the reconciler and lock manager as transactions; the
//! read operations here back the HTTP API and the snapshot exporter.

pub mod entity;
pub mod migration;

use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;

use dns_inventory_core::AssetStatus;

use crate::config::DatabaseConfig;
use crate::error::ServerResult;

use migration::Migrator;

/// A domain row projected for API responses and snapshot files.
///
/// Dates serialize as `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize)]
pub struct DomainView {
    pub domain: String,
    pub registrar: String,
    pub status: AssetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub discovery_date: NaiveDate,
    pub last_seen: NaiveDate,
}

/// A DNS record row projected for API responses and snapshot files.
#[derive(Debug, Clone, Serialize)]
pub struct DnsRecordView {
    pub domain: String,
    pub subdomain: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub data: String,
    pub source: String,
    pub status: AssetStatus,
    pub discovery_date: NaiveDate,
    pub last_seen: NaiveDate,
}

impl DomainView {
    fn from_model(model: entity::domain::Model) -> ServerResult<Self> {
        Ok(Self {
            status: parse_status(&model.status)?,
            domain: model.domain,
            registrar: model.registrar,
            expiry_date: model.expiry_date,
            discovery_date: model.discovery_date,
            last_seen: model.last_seen,
        })
    }
}

impl DnsRecordView {
    fn from_model(model: entity::dns_record::Model) -> ServerResult<Self> {
        Ok(Self {
            status: parse_status(&model.status)?,
            domain: model.domain,
            subdomain: model.subdomain,
            record_type: model.record_type,
            data: model.data,
            source: model.source,
            discovery_date: model.discovery_date,
            last_seen: model.last_seen,
        })
    }
}

fn parse_status(raw: &str) -> ServerResult<AssetStatus> {
    raw.parse()
        .map_err(|e| crate::error::ServerError::CorruptRow(format!("asset status: {e}")))
}

/// SQL-backed inventory store.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct InventoryStore {
    db: DatabaseConnection,
}

impl InventoryStore {
    /// Connects to the database, sizes the pool, and brings the schema up to
    /// date.
    pub async fn connect(cfg: &DatabaseConfig) -> ServerResult<Self> {
        let mut options = ConnectOptions::new(cfg.url.clone());
        options
            .max_connections(cfg.max_connections)
            .min_connections(cfg.max_idle)
            .connect_timeout(Duration::from_secs(10));

        let db = Database::connect(options).await?;
        Migrator::up(&db, None).await?;

        Ok(Self { db })
    }

    /// The underlying connection, for components that run their own
    /// transactions.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Domains filtered by optional status/registrar, ordered by name.
    pub async fn get_domains(
        &self,
        status: Option<AssetStatus>,
        registrar: Option<&str>,
    ) -> ServerResult<Vec<DomainView>> {
        let mut query = entity::domain::Entity::find();
        if let Some(status) = status {
            query = query.filter(entity::domain::Column::Status.eq(status.as_str()));
        }
        if let Some(registrar) = registrar {
            query = query.filter(entity::domain::Column::Registrar.eq(registrar));
        }

        let rows = query
            .order_by_asc(entity::domain::Column::Domain)
            .all(&self.db)
            .await?;

        rows.into_iter().map(DomainView::from_model).collect()
    }

    /// DNS records filtered by optional status/source/parent domain, ordered
    /// by `(domain, subdomain)`.
    pub async fn get_dns_records(
        &self,
        status: Option<AssetStatus>,
        source: Option<&str>,
        parent_domain: Option<&str>,
    ) -> ServerResult<Vec<DnsRecordView>> {
        let mut query = entity::dns_record::Entity::find();
        if let Some(status) = status {
            query = query.filter(entity::dns_record::Column::Status.eq(status.as_str()));
        }
        if let Some(source) = source {
            query = query.filter(entity::dns_record::Column::Source.eq(source));
        }
        if let Some(parent) = parent_domain {
            query = query.filter(entity::dns_record::Column::Domain.eq(parent));
        }

        let rows = query
            .order_by_asc(entity::dns_record::Column::Domain)
            .order_by_asc(entity::dns_record::Column::Subdomain)
            .all(&self.db)
            .await?;

        rows.into_iter().map(DnsRecordView::from_model).collect()
    }
}
