use super::{CatalogStore, CatalogTx, LinkOutcome, StoreError, StoreResult};
use crate::types::{EntityId, EntityKind, MovieFields, MovieId, MovieKey, Relation};
use rusqlite::{Connection, OptionalExtension, Transaction, ffi, params};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS movie (
    movie_id    TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    title_key   TEXT NOT NULL,
    year_start  INTEGER,
    year_end    INTEGER,
    rating      REAL,
    gross       REAL,
    runtime_min INTEGER,
    raw_row     TEXT
);
CREATE TABLE IF NOT EXISTS genre (
    genre_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS director (
    director_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS actor (
    actor_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS movie_genre (
    movie_id TEXT NOT NULL REFERENCES movie(movie_id),
    genre_id TEXT NOT NULL REFERENCES genre(genre_id),
    PRIMARY KEY (movie_id, genre_id)
);
CREATE TABLE IF NOT EXISTS movie_director (
    movie_id    TEXT NOT NULL REFERENCES movie(movie_id),
    director_id TEXT NOT NULL REFERENCES director(director_id),
    PRIMARY KEY (movie_id, director_id)
);
CREATE TABLE IF NOT EXISTS movie_actor (
    movie_id TEXT NOT NULL REFERENCES movie(movie_id),
    actor_id TEXT NOT NULL REFERENCES actor(actor_id),
    PRIMARY KEY (movie_id, actor_id)
);
CREATE INDEX IF NOT EXISTS movie_title_key ON movie (title_key, year_start);
";

/// SQLite-backed catalog.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!("Opening SQLite catalog at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create any of the seven relations that do not exist yet.
    pub fn bootstrap_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        info!("Catalog schema ready");
        Ok(())
    }

    /// Raw connection, for inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CatalogStore for SqliteStore {
    fn begin(&mut self) -> StoreResult<Box<dyn CatalogTx + '_>> {
        let tx = self.conn.transaction()?;
        Ok(Box::new(SqliteTx { tx }))
    }

    fn missing_relations(&self) -> StoreResult<Vec<Relation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let present = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Relation::ALL
            .into_iter()
            .filter(|relation| !present.contains(relation.name()))
            .collect())
    }

    fn ping(&self) -> StoreResult<()> {
        let one: i64 = self.conn.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(StoreError::Corrupt(format!("SELECT 1 returned {one}")));
        }
        Ok(())
    }

    fn count(&self, relation: Relation) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", relation.name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

struct SqliteTx<'conn> {
    tx: Transaction<'conn>,
}

impl CatalogTx for SqliteTx<'_> {
    fn supports_conditional_insert(&self) -> bool {
        true
    }

    fn find_entity(&self, kind: EntityKind, name: &str) -> StoreResult<Option<EntityId>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE name = ?1",
            kind.id_column(),
            kind.relation().name()
        );
        let raw = self
            .tx
            .query_row(&sql, params![name], |row| row.get::<_, String>(0))
            .optional()?;
        raw.map(|id| parse_id(&id).map(EntityId::from_uuid))
            .transpose()
    }

    fn insert_entity(&mut self, kind: EntityKind, id: EntityId, name: &str) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} ({}, name) VALUES (?1, ?2)",
            kind.relation().name(),
            kind.id_column()
        );
        self.tx
            .execute(&sql, params![id.to_string(), name])
            .map_err(|e| classify(kind.relation(), e))?;
        Ok(())
    }

    fn insert_entity_if_absent(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        name: &str,
    ) -> StoreResult<Option<EntityId>> {
        let sql = format!(
            "INSERT INTO {table} ({id_col}, name) VALUES (?1, ?2) \
             ON CONFLICT (name) DO NOTHING \
             RETURNING {id_col}",
            table = kind.relation().name(),
            id_col = kind.id_column()
        );
        let raw = self
            .tx
            .query_row(&sql, params![id.to_string(), name], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|e| classify(kind.relation(), e))?;
        raw.map(|id| parse_id(&id).map(EntityId::from_uuid))
            .transpose()
    }

    fn find_movie(&self, key: &MovieKey) -> StoreResult<Option<MovieId>> {
        let raw = self
            .tx
            .query_row(
                "SELECT movie_id FROM movie \
                 WHERE title_key = ?1 AND (?2 IS NULL OR year_start = ?2) \
                 ORDER BY rowid LIMIT 1",
                params![key.folded_title(), key.start_year],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        raw.map(|id| parse_id(&id).map(MovieId::from_uuid))
            .transpose()
    }

    fn insert_movie(
        &mut self,
        id: MovieId,
        key: &MovieKey,
        fields: &MovieFields,
        payload: &serde_json::Value,
    ) -> StoreResult<()> {
        self.tx
            .execute(
                "INSERT INTO movie \
                 (movie_id, title, title_key, year_start, year_end, rating, gross, \
                  runtime_min, raw_row) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.to_string(),
                    key.title,
                    key.folded_title(),
                    key.start_year,
                    fields.end_year,
                    fields.rating,
                    fields.gross,
                    fields.runtime_minutes,
                    payload.to_string(),
                ],
            )
            .map_err(|e| classify(Relation::Movie, e))?;
        Ok(())
    }

    fn update_movie(
        &mut self,
        id: MovieId,
        fields: &MovieFields,
        payload: &serde_json::Value,
    ) -> StoreResult<()> {
        let changed = self.tx.execute(
            "UPDATE movie SET rating = ?2, gross = ?3, runtime_min = ?4, raw_row = ?5 \
             WHERE movie_id = ?1",
            params![
                id.to_string(),
                fields.rating,
                fields.gross,
                fields.runtime_minutes,
                payload.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::Rejected(format!("movie {id} does not exist")));
        }
        Ok(())
    }

    fn insert_link(
        &mut self,
        kind: EntityKind,
        movie: MovieId,
        entity: EntityId,
    ) -> StoreResult<LinkOutcome> {
        let sql = format!(
            "INSERT INTO {} (movie_id, {}) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            kind.link_relation().name(),
            kind.id_column()
        );
        let inserted = self
            .tx
            .execute(&sql, params![movie.to_string(), entity.to_string()])
            .map_err(|e| classify(kind.link_relation(), e))?;
        Ok(if inserted == 0 {
            LinkOutcome::AlreadyPresent
        } else {
            LinkOutcome::Inserted
        })
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad identity '{raw}': {e}")))
}

/// Map unique and primary key failures to [`StoreError::UniqueViolation`].
fn classify(relation: Relation, err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err
        && (failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
            || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    {
        return StoreError::UniqueViolation {
            relation: relation.name().to_string(),
        };
    }
    StoreError::Sqlite(err)
}
