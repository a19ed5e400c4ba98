//! Persistent catalog store.
//!
//! The reconciliation engine talks to the store only through [`CatalogStore`]
//! and [`CatalogTx`]. Every row of an import runs inside one transaction; a
//! transaction dropped without [`CatalogTx::commit`] rolls back.
//!
//! Two backends are provided:
//!
//! - [`SqliteStore`]: the production backend, with a single-statement
//!   conditional insert for entities
//! - [`MemoryStore`]: a snapshot-per-transaction backend for tests, with
//!   fault injection hooks

mod memory;
mod sqlite;

pub use memory::{MemoryStore, StoredMovie};
pub use sqlite::SqliteStore;

use crate::types::{EntityId, EntityKind, MovieFields, MovieId, MovieKey, Relation};
use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An insert collided with an existing unique key.
    #[error("Uniqueness conflict in '{relation}'")]
    UniqueViolation { relation: String },

    /// The backend does not implement the requested operation.
    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// The backend refused the write.
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// A stored value could not be decoded.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What happened to a relationship insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Inserted,
    AlreadyPresent,
}

/// A catalog store holding the seven relations.
pub trait CatalogStore {
    /// Open a transaction. Dropping it without committing rolls back.
    fn begin(&mut self) -> StoreResult<Box<dyn CatalogTx + '_>>;

    /// Relations the import needs that the store does not have.
    fn missing_relations(&self) -> StoreResult<Vec<Relation>>;

    /// Round-trip check that the store is reachable.
    fn ping(&self) -> StoreResult<()>;

    /// Number of rows in a relation.
    fn count(&self, relation: Relation) -> StoreResult<u64>;
}

/// Operations available inside one store transaction.
pub trait CatalogTx {
    /// Whether [`insert_entity_if_absent`](Self::insert_entity_if_absent) is available.
    fn supports_conditional_insert(&self) -> bool {
        false
    }

    /// Look up an entity by exact name.
    fn find_entity(&self, kind: EntityKind, name: &str) -> StoreResult<Option<EntityId>>;

    /// Insert an entity. Fails with [`StoreError::UniqueViolation`] when the
    /// name already exists for the kind.
    fn insert_entity(&mut self, kind: EntityKind, id: EntityId, name: &str) -> StoreResult<()>;

    /// Insert an entity unless the name exists, in one statement.
    ///
    /// Returns the new identity, or `None` when another writer got there first.
    fn insert_entity_if_absent(
        &mut self,
        _kind: EntityKind,
        _id: EntityId,
        _name: &str,
    ) -> StoreResult<Option<EntityId>> {
        Err(StoreError::Unsupported("conditional insert"))
    }

    /// Look up a movie by case-insensitive title and, when given, start year.
    fn find_movie(&self, key: &MovieKey) -> StoreResult<Option<MovieId>>;

    fn insert_movie(
        &mut self,
        id: MovieId,
        key: &MovieKey,
        fields: &MovieFields,
        payload: &serde_json::Value,
    ) -> StoreResult<()>;

    /// Overwrite rating, gross, runtime and payload of an existing movie.
    fn update_movie(
        &mut self,
        id: MovieId,
        fields: &MovieFields,
        payload: &serde_json::Value,
    ) -> StoreResult<()>;

    /// Insert a relationship pair, absorbing an existing identical pair.
    fn insert_link(
        &mut self,
        kind: EntityKind,
        movie: MovieId,
        entity: EntityId,
    ) -> StoreResult<LinkOutcome>;

    fn commit(self: Box<Self>) -> StoreResult<()>;
}
