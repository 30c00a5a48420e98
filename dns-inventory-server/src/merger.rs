//! Reconciler: transactionally merges a collector's output into the
//! inventory.
//!
//! Each merge runs in a single database transaction, rolled back on any
//! error, with one reconciliation date (`today`) fixed for the whole call
//! regardless of wall-clock drift during a long sweep. Existing rows keep
//! their `discovery_date` forever; rows absent from the sweep are
//! tombstoned, never deleted.
//!
//! Tombstone scoping is the non-obvious contract: domain tombstoning is
//! unscoped (the domain list is one atomic upstream call, so a committed
//! merge implies the full set was seen), while DNS tombstoning is scoped to
//! the parents the sweep actually checked, because per-domain record fetches
//! succeed or fail independently.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, TransactionTrait,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use dns_inventory_core::{AssetStatus, CollectedDnsRecord, CollectedDomain, MergeStats};

use crate::error::{ServerError, ServerResult};
use crate::store::entity::{dns_record, domain};

/// Applies collector output to the inventory, preserving history and
/// tombstoning absences.
pub struct Merger {
    db: DatabaseConnection,
}

impl Merger {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Merges a domain sweep from `source`, using the current UTC date as
    /// the reconciliation date.
    pub async fn merge_domains(
        &self,
        source: &str,
        domains: &[CollectedDomain],
        cancel: &CancellationToken,
    ) -> ServerResult<MergeStats> {
        self.merge_domains_at(source, domains, Utc::now().date_naive(), cancel)
            .await
    }

    /// Merges a domain sweep with an explicit reconciliation date.
    ///
    /// The tombstone pass is unscoped: every active row of `source` not seen
    /// on `today` flips to removed.
    pub async fn merge_domains_at(
        &self,
        source: &str,
        domains: &[CollectedDomain],
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> ServerResult<MergeStats> {
        let mut stats = MergeStats::default();
        let txn = self.db.begin().await?;
        let now = Utc::now();

        for d in domains {
            if cancel.is_cancelled() {
                // Dropping the transaction rolls it back.
                return Err(ServerError::Cancelled);
            }

            let existing = domain::Entity::find()
                .filter(domain::Column::Domain.eq(&d.name))
                .filter(domain::Column::Registrar.eq(source))
                .one(&txn)
                .await?;

            match existing {
                Some(row) => {
                    let mut model: domain::ActiveModel = row.into();
                    model.status = Set(AssetStatus::Active.as_str().to_string());
                    model.expiry_date = Set(d.expiry_date);
                    model.last_seen = Set(today);
                    model.raw_data = Set(d.raw.clone());
                    model.updated_at = Set(now);
                    model.update(&txn).await?;
                    stats.updated += 1;
                }
                None => {
                    let model = domain::ActiveModel {
                        id: Set(Uuid::new_v4().to_string()),
                        domain: Set(d.name.clone()),
                        registrar: Set(source.to_string()),
                        status: Set(AssetStatus::Active.as_str().to_string()),
                        expiry_date: Set(d.expiry_date),
                        discovery_date: Set(today),
                        last_seen: Set(today),
                        raw_data: Set(d.raw.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    // A row committed by a racing writer turns the insert
                    // into an update; discovery_date stays untouched.
                    domain::Entity::insert(model)
                        .on_conflict(
                            OnConflict::columns([
                                domain::Column::Domain,
                                domain::Column::Registrar,
                            ])
                            .update_columns([
                                domain::Column::Status,
                                domain::Column::ExpiryDate,
                                domain::Column::LastSeen,
                                domain::Column::RawData,
                                domain::Column::UpdatedAt,
                            ])
                            .to_owned(),
                        )
                        .exec(&txn)
                        .await?;
                    stats.added += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(ServerError::Cancelled);
        }

        stats.removed = tombstone_domains(&txn, source, today, now).await?;

        txn.commit().await?;
        Ok(stats)
    }

    /// Merges a DNS record sweep from `source`, scoped to the parents
    /// present in the batch and using the current UTC date.
    pub async fn merge_dns_records(
        &self,
        source: &str,
        records: &[CollectedDnsRecord],
        cancel: &CancellationToken,
    ) -> ServerResult<MergeStats> {
        self.merge_dns_records_at(source, records, Utc::now().date_naive(), cancel)
            .await
    }

    /// Merges a DNS record sweep with an explicit reconciliation date,
    /// scoped to the parents present in the batch.
    pub async fn merge_dns_records_at(
        &self,
        source: &str,
        records: &[CollectedDnsRecord],
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> ServerResult<MergeStats> {
        let observed: Vec<String> = records
            .iter()
            .map(|r| r.domain.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        self.merge_dns_records_scoped(source, records, &observed, today, cancel)
            .await
    }

    /// Merges a DNS record sweep, tombstoning within an explicit set of
    /// checked parents.
    ///
    /// `observed` is the union of the batch's parents and the domains the
    /// collector fully swept; a domain that was checked and returned zero
    /// records still has its stale rows tombstoned, while domains the sweep
    /// never reached (quota, per-domain errors) are untouched.
    pub async fn merge_dns_records_scoped(
        &self,
        source: &str,
        records: &[CollectedDnsRecord],
        observed: &[String],
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> ServerResult<MergeStats> {
        let mut stats = MergeStats::default();
        let txn = self.db.begin().await?;
        let now = Utc::now();

        for r in records {
            if cancel.is_cancelled() {
                return Err(ServerError::Cancelled);
            }

            let existing = dns_record::Entity::find()
                .filter(dns_record::Column::Domain.eq(&r.domain))
                .filter(dns_record::Column::Subdomain.eq(&r.subdomain))
                .filter(dns_record::Column::RecordType.eq(&r.record_type))
                .filter(dns_record::Column::Data.eq(&r.data))
                .filter(dns_record::Column::Source.eq(source))
                .one(&txn)
                .await?;

            match existing {
                Some(row) => {
                    let mut model: dns_record::ActiveModel = row.into();
                    model.status = Set(AssetStatus::Active.as_str().to_string());
                    model.ttl = Set(r.ttl);
                    model.priority = Set(r.priority);
                    model.last_seen = Set(today);
                    model.raw_data = Set(r.raw.clone());
                    model.updated_at = Set(now);
                    model.update(&txn).await?;
                    stats.updated += 1;
                }
                None => {
                    let model = dns_record::ActiveModel {
                        id: Set(Uuid::new_v4().to_string()),
                        domain: Set(r.domain.clone()),
                        subdomain: Set(r.subdomain.clone()),
                        record_type: Set(r.record_type.clone()),
                        data: Set(r.data.clone()),
                        ttl: Set(r.ttl),
                        priority: Set(r.priority),
                        source: Set(source.to_string()),
                        status: Set(AssetStatus::Active.as_str().to_string()),
                        discovery_date: Set(today),
                        last_seen: Set(today),
                        raw_data: Set(r.raw.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    dns_record::Entity::insert(model)
                        .on_conflict(
                            OnConflict::columns([
                                dns_record::Column::Domain,
                                dns_record::Column::Subdomain,
                                dns_record::Column::RecordType,
                                dns_record::Column::Data,
                                dns_record::Column::Source,
                            ])
                            .update_columns([
                                dns_record::Column::Status,
                                dns_record::Column::Ttl,
                                dns_record::Column::Priority,
                                dns_record::Column::LastSeen,
                                dns_record::Column::RawData,
                                dns_record::Column::UpdatedAt,
                            ])
                            .to_owned(),
                        )
                        .exec(&txn)
                        .await?;
                    stats.added += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(ServerError::Cancelled);
        }

        if !observed.is_empty() {
            stats.removed = tombstone_dns_records(&txn, source, observed, today, now).await?;
        }

        txn.commit().await?;
        Ok(stats)
    }
}

/// Flips to removed every active domain of `source` not seen today.
async fn tombstone_domains(
    txn: &DatabaseTransaction,
    source: &str,
    today: NaiveDate,
    now: chrono::DateTime<Utc>,
) -> ServerResult<u64> {
    let result = domain::Entity::update_many()
        .col_expr(
            domain::Column::Status,
            Expr::value(AssetStatus::Removed.as_str()),
        )
        .col_expr(domain::Column::UpdatedAt, Expr::value(now))
        .filter(domain::Column::Registrar.eq(source))
        .filter(domain::Column::Status.eq(AssetStatus::Active.as_str()))
        .filter(domain::Column::LastSeen.lt(today))
        .exec(txn)
        .await?;

    Ok(result.rows_affected)
}

/// Flips to removed every active record of `source` under an observed
/// parent that was not seen today.
async fn tombstone_dns_records(
    txn: &DatabaseTransaction,
    source: &str,
    observed: &[String],
    today: NaiveDate,
    now: chrono::DateTime<Utc>,
) -> ServerResult<u64> {
    let result = dns_record::Entity::update_many()
        .col_expr(
            dns_record::Column::Status,
            Expr::value(AssetStatus::Removed.as_str()),
        )
        .col_expr(dns_record::Column::UpdatedAt, Expr::value(now))
        .filter(dns_record::Column::Source.eq(source))
        .filter(dns_record::Column::Domain.is_in(observed.iter().map(String::as_str)))
        .filter(dns_record::Column::Status.eq(AssetStatus::Active.as_str()))
        .filter(dns_record::Column::LastSeen.lt(today))
        .exec(txn)
        .await?;

    Ok(result.rows_affected)
}
