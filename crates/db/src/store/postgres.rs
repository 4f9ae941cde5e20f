//! PostgreSQL backend: one live table and one `_audit` table per entity.
//!
//! The compare-and-swap runs in a transaction that locks the live row with
//! `SELECT ... FOR UPDATE`, archives it with `INSERT ... SELECT`, and then
//! overwrites it. Concurrent writers on the same entity serialize on the row
//! lock and the loser observes the winner's version.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use todo_core::error::CoreError;

use crate::models::versioned::{FieldValue, VersionMeta, Versioned};
use crate::store::{Filter, RecordBackend, ReplaceOutcome, StoreResult};

/// Version-control columns, in the order [`push_meta`] binds them.
const META_COLUMNS: &[&str] = &[
    "entity_id",
    "version",
    "previous_version",
    "active",
    "changed_by_id",
    "changed_on",
];

/// Table binding for an entity persisted by [`PgBackend`].
pub trait PgRecord: Versioned + for<'r> FromRow<'r, PgRow> + Unpin {
    /// Live table name.
    const TABLE: &'static str;

    /// Audit table name.
    const AUDIT_TABLE: &'static str;

    /// Entity-specific columns, in the order [`PgRecord::push_values`] binds
    /// them.
    const COLUMNS: &'static [&'static str];

    /// Bind the entity-specific column values.
    fn push_values(&self, row: &mut Separated<'_, '_, Postgres, &'static str>);
}

/// PostgreSQL-backed [`RecordBackend`].
pub struct PgBackend<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: PgRecord> PgBackend<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Comma-separated list of every column, version-control ones first.
    fn column_list() -> String {
        META_COLUMNS
            .iter()
            .chain(T::COLUMNS.iter())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Column list for archiving: identical to [`Self::column_list`] except
    /// that `active` is selected as `false`.
    fn archive_select_list() -> String {
        META_COLUMNS
            .iter()
            .chain(T::COLUMNS.iter())
            .map(|column| if *column == "active" { "false" } else { *column })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Resolve a filter field to a known column name.
    fn column_for(field: &str) -> Result<&'static str, CoreError> {
        META_COLUMNS
            .iter()
            .chain(T::COLUMNS.iter())
            .find(|column| **column == field && **column != "active")
            .copied()
            .ok_or_else(|| {
                CoreError::Validation(format!("Unknown filter field '{field}' for {}", T::ENTITY))
            })
    }
}

/// Bind the version-control column values.
fn push_meta(row: &mut Separated<'_, '_, Postgres, &'static str>, meta: &VersionMeta) {
    row.push_bind(meta.entity_id.clone())
        .push_bind(meta.version.clone())
        .push_bind(meta.previous_version.clone())
        .push_bind(meta.active)
        .push_bind(meta.changed_by_id.clone())
        .push_bind(meta.changed_on);
}

#[async_trait]
impl<T: PgRecord> RecordBackend<T> for PgBackend<T> {
    async fn insert(&self, record: &T) -> StoreResult<()> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) ",
            T::TABLE,
            Self::column_list()
        ));
        query.push_values(std::iter::once(record), |mut row, record| {
            push_meta(&mut row, record.meta());
            record.push_values(&mut row);
        });
        query.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn replace(&self, expected_version: &str, next: &T) -> StoreResult<ReplaceOutcome> {
        let entity_id = next.meta().entity_id.clone();
        let mut tx = self.pool.begin().await?;

        let lock_query = format!(
            "SELECT version, active FROM {} WHERE entity_id = $1 FOR UPDATE",
            T::TABLE
        );
        let live: Option<(String, bool)> = sqlx::query_as(&lock_query)
            .bind(&entity_id)
            .fetch_optional(&mut *tx)
            .await?;

        match live {
            None => return Ok(ReplaceOutcome::Missing),
            Some((live_version, live_active))
                if !live_active || live_version != expected_version =>
            {
                return Ok(ReplaceOutcome::Conflict {
                    live_version,
                    live_active,
                });
            }
            Some(_) => {}
        }

        let archive_query = format!(
            "INSERT INTO {} ({}) SELECT {} FROM {} WHERE entity_id = $1",
            T::AUDIT_TABLE,
            Self::column_list(),
            Self::archive_select_list(),
            T::TABLE
        );
        sqlx::query(&archive_query)
            .bind(&entity_id)
            .execute(&mut *tx)
            .await?;

        let mut update = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} SET ({}) = (",
            T::TABLE,
            Self::column_list()
        ));
        {
            let mut row = update.separated(", ");
            push_meta(&mut row, next.meta());
            next.push_values(&mut row);
        }
        update.push(") WHERE entity_id = ");
        update.push_bind(entity_id);
        update.build().execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(ReplaceOutcome::Replaced)
    }

    async fn find_active(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {} WHERE active = true",
            Self::column_list(),
            T::TABLE
        ));
        for (field, value) in filter.terms() {
            let column = Self::column_for(field)?;
            query.push(" AND ").push(column).push(" = ");
            match value {
                FieldValue::Text(text) => query.push_bind(text.clone()),
                FieldValue::Bool(flag) => query.push_bind(*flag),
            };
        }
        let records = query.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok(records)
    }

    async fn find_live(&self, entity_id: &str) -> StoreResult<Option<T>> {
        let query = format!(
            "SELECT {} FROM {} WHERE entity_id = $1",
            Self::column_list(),
            T::TABLE
        );
        let record = sqlx::query_as::<_, T>(&query)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_archived(&self, entity_id: &str) -> StoreResult<Vec<T>> {
        let query = format!(
            "SELECT {} FROM {} WHERE entity_id = $1",
            Self::column_list(),
            T::AUDIT_TABLE
        );
        let records = sqlx::query_as::<_, T>(&query)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
