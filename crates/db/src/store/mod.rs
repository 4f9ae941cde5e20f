//! Versioned record store.
//!
//! [`RecordStore`] implements the versioning and audit contract once, on top
//! of the primitive operations of a [`RecordBackend`]:
//!
//! - A first save mints `entity_id` and `version` and links the revision to
//!   the sentinel.
//! - Every later save archives the live revision unmodified into the audit
//!   log and writes a new revision whose `previous_version` is the archived
//!   version. The write is a compare-and-swap on the version the caller read,
//!   so of two saves racing from the same base exactly one wins.
//! - Deletes are soft: the live revision is archived and replaced by an
//!   inactive one. Reads only ever see active rows.

pub mod filter;
pub mod memory;
pub mod postgres;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use todo_core::error::CoreError;
use chrono::SubsecRound;
use todo_core::types::{check_record_id, is_sentinel, new_record_id, RecordId, SENTINEL_VERSION};

use crate::models::versioned::Versioned;

pub use filter::Filter;
pub use memory::MemoryBackend;
pub use postgres::{PgBackend, PgRecord};

/// Attempts a delete makes to catch the live revision before giving up.
const MAX_DELETE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Validation, conflict, and not-found failures.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A single-record lookup matched several active records.
    #[error("Ambiguous result: {count} active {entity} records matched, expected at most one")]
    Ambiguous { entity: &'static str, count: usize },

    /// Connectivity or constraint failure in the underlying database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a compare-and-swap write on a live row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The previous revision was archived and the new one written.
    Replaced,
    /// No live row exists for the entity.
    Missing,
    /// The live row is not the active revision the caller expected.
    Conflict { live_version: RecordId, live_active: bool },
}

/// Primitive, individually atomic operations a storage backend provides.
#[async_trait]
pub trait RecordBackend<T: Versioned>: Send + Sync {
    /// Write the first revision of a new entity.
    async fn insert(&self, record: &T) -> StoreResult<()>;

    /// Atomically archive the live row of `next`'s entity and overwrite it
    /// with `next`, provided the live row is active at `expected_version`.
    async fn replace(&self, expected_version: &str, next: &T) -> StoreResult<ReplaceOutcome>;

    /// Active live rows matching `filter`.
    async fn find_active(&self, filter: &Filter) -> StoreResult<Vec<T>>;

    /// The live row of an entity, active or not.
    async fn find_live(&self, entity_id: &str) -> StoreResult<Option<T>>;

    /// Every archived revision of an entity, in no particular order.
    async fn find_archived(&self, entity_id: &str) -> StoreResult<Vec<T>>;

    /// Confirm the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

/// Versioned persistence for one entity type.
///
/// Cheap to clone; the backend is shared. `actor` is stamped into
/// `changed_by_id` of every revision this store writes.
pub struct RecordStore<T: Versioned> {
    backend: Arc<dyn RecordBackend<T>>,
    actor: Option<RecordId>,
}

impl<T: Versioned> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            actor: self.actor.clone(),
        }
    }
}

impl<T: Versioned> RecordStore<T> {
    pub fn new(backend: Arc<dyn RecordBackend<T>>) -> Self {
        Self {
            backend,
            actor: None,
        }
    }

    /// Attribute revisions written through this store to `actor`.
    pub fn acting_as(mut self, actor: impl Into<RecordId>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Persist `record`, inserting it if it has no `entity_id` and creating a
    /// new revision otherwise. Returns the record with generated fields set.
    ///
    /// Updates fail with a conflict if the entity has moved past the version
    /// `record` was read at, and with not-found if it was deleted.
    pub async fn save(&self, mut record: T) -> StoreResult<T> {
        record.validate()?;
        self.check_actor()?;

        if record.meta().is_new() {
            self.stamp(&mut record, SENTINEL_VERSION.to_string(), true);
            record.meta_mut().entity_id = new_record_id();
            self.backend.insert(&record).await?;
            tracing::debug!(
                entity = T::ENTITY,
                entity_id = %record.meta().entity_id,
                version = %record.meta().version,
                "Inserted first revision",
            );
            return Ok(record);
        }

        let entity_id = record.meta().entity_id.clone();
        let base_version = record.meta().version.clone();
        self.stamp(&mut record, base_version.clone(), true);

        match self.backend.replace(&base_version, &record).await? {
            ReplaceOutcome::Replaced => {
                tracing::debug!(
                    entity = T::ENTITY,
                    entity_id = %entity_id,
                    previous_version = %base_version,
                    version = %record.meta().version,
                    "Wrote new revision",
                );
                Ok(record)
            }
            ReplaceOutcome::Missing
            | ReplaceOutcome::Conflict {
                live_active: false, ..
            } => Err(CoreError::NotFound {
                entity: T::ENTITY,
                id: entity_id,
            }
            .into()),
            ReplaceOutcome::Conflict { live_version, .. } => {
                tracing::warn!(
                    entity = T::ENTITY,
                    entity_id = %entity_id,
                    expected_version = %base_version,
                    live_version = %live_version,
                    "Rejected save from a stale version",
                );
                Err(CoreError::Conflict(format!(
                    "{} {entity_id} was modified concurrently \
                     (expected version {base_version}, current version {live_version})",
                    T::ENTITY
                ))
                .into())
            }
        }
    }

    /// The single active record matching `filter`, if any.
    pub async fn get_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let mut matches = self.get_many(filter).await?;
        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(StoreError::Ambiguous {
                entity: T::ENTITY,
                count,
            }),
        }
    }

    /// All active records matching `filter`. Order is unspecified.
    pub async fn get_many(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        filter.check::<T>()?;
        let records = self.backend.find_active(filter).await?;
        tracing::debug!(entity = T::ENTITY, count = records.len(), "Fetched active records");
        Ok(records)
    }

    /// Soft-delete the entity `record` belongs to.
    ///
    /// Returns `true` if an active revision was deactivated and `false` if
    /// the entity was already inactive or never existed.
    pub async fn delete(&self, record: &T) -> StoreResult<bool> {
        let entity_id = record.meta().entity_id.as_str();
        if entity_id.is_empty() {
            return Ok(false);
        }
        self.check_actor()?;

        for _ in 0..MAX_DELETE_ATTEMPTS {
            let Some(current) = self.get_one(&Filter::by_entity_id(entity_id)).await? else {
                return Ok(false);
            };
            let live_version = current.meta().version.clone();
            let mut tombstone = current;
            self.stamp(&mut tombstone, live_version.clone(), false);

            match self.backend.replace(&live_version, &tombstone).await? {
                ReplaceOutcome::Replaced => {
                    tracing::info!(entity = T::ENTITY, entity_id = %entity_id, "Deactivated record");
                    return Ok(true);
                }
                ReplaceOutcome::Missing
                | ReplaceOutcome::Conflict {
                    live_active: false, ..
                } => return Ok(false),
                ReplaceOutcome::Conflict { .. } => continue,
            }
        }

        Err(CoreError::Conflict(format!(
            "{} {entity_id} kept changing while being deleted",
            T::ENTITY
        ))
        .into())
    }

    /// Archived revisions of an entity, newest first, found by following
    /// `previous_version` links from the live row.
    pub async fn history(&self, entity_id: &str) -> StoreResult<Vec<T>> {
        let live = self
            .backend
            .find_live(entity_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: T::ENTITY,
                id: entity_id.to_string(),
            })?;
        let archived = self.backend.find_archived(entity_id).await?;
        Ok(walk_chain(&live, archived)?)
    }

    /// Number of revisions in an entity's history, live row included.
    ///
    /// Fails if any archived revision is unreachable from the live row or a
    /// link points at a version that was never archived.
    pub async fn verify_chain(&self, entity_id: &str) -> StoreResult<usize> {
        Ok(self.history(entity_id).await?.len() + 1)
    }

    /// Confirm the backend is reachable.
    pub async fn ping(&self) -> StoreResult<()> {
        self.backend.ping().await
    }

    /// Fill in the version-control columns of a revision about to be written.
    fn stamp(&self, record: &mut T, previous_version: RecordId, active: bool) {
        let meta = record.meta_mut();
        meta.previous_version = previous_version;
        meta.version = new_record_id();
        meta.active = active;
        meta.changed_by_id = self.actor.clone();
        // TIMESTAMPTZ stores microseconds.
        meta.changed_on = chrono::Utc::now().trunc_subsecs(6);
    }

    fn check_actor(&self) -> Result<(), CoreError> {
        match &self.actor {
            Some(actor) => check_record_id("changed_by_id", actor),
            None => Ok(()),
        }
    }
}

/// Order `archived` by following `previous_version` links back from `live`
/// until the sentinel. Every archived revision must be visited exactly once.
fn walk_chain<T: Versioned>(live: &T, archived: Vec<T>) -> Result<Vec<T>, CoreError> {
    let entity_id = &live.meta().entity_id;
    let total = archived.len();
    let mut by_version: HashMap<RecordId, T> = archived
        .into_iter()
        .map(|revision| (revision.meta().version.clone(), revision))
        .collect();
    if by_version.len() != total {
        return Err(CoreError::Internal(format!(
            "{} {entity_id} has duplicate archived versions",
            T::ENTITY
        )));
    }

    let mut chain = Vec::with_capacity(total);
    let mut next = live.meta().previous_version.clone();
    while !is_sentinel(&next) {
        let revision = by_version.remove(&next).ok_or_else(|| {
            CoreError::Internal(format!(
                "{} {entity_id} history is broken: version {next} is not archived",
                T::ENTITY
            ))
        })?;
        next = revision.meta().previous_version.clone();
        chain.push(revision);
    }

    if !by_version.is_empty() {
        return Err(CoreError::Internal(format!(
            "{} {entity_id} has {} archived revisions unreachable from the live row",
            T::ENTITY,
            by_version.len()
        )));
    }
    Ok(chain)
}
