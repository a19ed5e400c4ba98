use super::{CatalogStore, CatalogTx, LinkOutcome, StoreError, StoreResult};
use crate::types::{EntityId, EntityKind, MovieFields, MovieId, MovieKey, Relation};
use std::collections::{BTreeMap, BTreeSet};

/// A movie row as held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMovie {
    pub id: MovieId,
    pub key: MovieKey,
    pub fields: MovieFields,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    movies: Vec<StoredMovie>,
    entities: BTreeMap<EntityKind, BTreeMap<String, EntityId>>,
    links: BTreeMap<EntityKind, BTreeSet<(MovieId, EntityId)>>,
}

/// In-memory catalog.
///
/// Each transaction works on a snapshot of the tables that replaces the
/// committed state on commit. There is no conditional insert, so entity
/// creation goes through the insert and re-read path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    missing: BTreeSet<Relation>,
    failing_titles: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every commit that touched a movie with this title fail.
    pub fn fail_commit_on(mut self, title: impl Into<String>) -> Self {
        self.failing_titles.push(title.into());
        self
    }

    /// Pretend the given relation does not exist.
    pub fn without_relation(mut self, relation: Relation) -> Self {
        self.missing.insert(relation);
        self
    }

    pub fn movies(&self) -> &[StoredMovie] {
        &self.tables.movies
    }

    /// First movie whose title matches case-insensitively.
    pub fn movie_by_title(&self, title: &str) -> Option<&StoredMovie> {
        self.tables
            .movies
            .iter()
            .find(|movie| movie.key.title.eq_ignore_ascii_case(title))
    }

    /// Entity names of a kind, sorted.
    pub fn entity_names(&self, kind: EntityKind) -> Vec<String> {
        self.tables
            .entities
            .get(&kind)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names linked to a movie for one relation kind, sorted.
    pub fn linked_names(&self, kind: EntityKind, movie: MovieId) -> Vec<String> {
        let Some(names) = self.tables.entities.get(&kind) else {
            return Vec::new();
        };
        let linked: BTreeSet<EntityId> = self
            .tables
            .links
            .get(&kind)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter(|(m, _)| *m == movie)
                    .map(|(_, e)| *e)
                    .collect()
            })
            .unwrap_or_default();
        names
            .iter()
            .filter(|(_, id)| linked.contains(id))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl CatalogStore for MemoryStore {
    fn begin(&mut self) -> StoreResult<Box<dyn CatalogTx + '_>> {
        let working = self.tables.clone();
        Ok(Box::new(MemoryTx {
            store: self,
            working,
            touched_titles: Vec::new(),
        }))
    }

    fn missing_relations(&self) -> StoreResult<Vec<Relation>> {
        Ok(self.missing.iter().copied().collect())
    }

    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn count(&self, relation: Relation) -> StoreResult<u64> {
        let tables = &self.tables;
        let count = match relation {
            Relation::Movie => tables.movies.len(),
            Relation::Genre => entity_count(tables, EntityKind::Genre),
            Relation::Director => entity_count(tables, EntityKind::Director),
            Relation::Actor => entity_count(tables, EntityKind::Actor),
            Relation::MovieGenre => link_count(tables, EntityKind::Genre),
            Relation::MovieDirector => link_count(tables, EntityKind::Director),
            Relation::MovieActor => link_count(tables, EntityKind::Actor),
        };
        Ok(count as u64)
    }
}

fn entity_count(tables: &Tables, kind: EntityKind) -> usize {
    tables.entities.get(&kind).map_or(0, BTreeMap::len)
}

fn link_count(tables: &Tables, kind: EntityKind) -> usize {
    tables.links.get(&kind).map_or(0, BTreeSet::len)
}

struct MemoryTx<'a> {
    store: &'a mut MemoryStore,
    working: Tables,
    touched_titles: Vec<String>,
}

impl MemoryTx<'_> {
    fn require(&self, relation: Relation) -> StoreResult<()> {
        if self.store.missing.contains(&relation) {
            return Err(StoreError::Rejected(format!(
                "no such relation: {}",
                relation.name()
            )));
        }
        Ok(())
    }
}

impl CatalogTx for MemoryTx<'_> {
    fn find_entity(&self, kind: EntityKind, name: &str) -> StoreResult<Option<EntityId>> {
        self.require(kind.relation())?;
        Ok(self
            .working
            .entities
            .get(&kind)
            .and_then(|names| names.get(name))
            .copied())
    }

    fn insert_entity(&mut self, kind: EntityKind, id: EntityId, name: &str) -> StoreResult<()> {
        self.require(kind.relation())?;
        let names = self.working.entities.entry(kind).or_default();
        if names.contains_key(name) {
            return Err(StoreError::UniqueViolation {
                relation: kind.relation().name().to_string(),
            });
        }
        names.insert(name.to_string(), id);
        Ok(())
    }

    fn find_movie(&self, key: &MovieKey) -> StoreResult<Option<MovieId>> {
        self.require(Relation::Movie)?;
        Ok(self
            .working
            .movies
            .iter()
            .find(|movie| key.matches(&movie.key.title, movie.key.start_year))
            .map(|movie| movie.id))
    }

    fn insert_movie(
        &mut self,
        id: MovieId,
        key: &MovieKey,
        fields: &MovieFields,
        payload: &serde_json::Value,
    ) -> StoreResult<()> {
        self.require(Relation::Movie)?;
        if self.working.movies.iter().any(|movie| movie.id == id) {
            return Err(StoreError::UniqueViolation {
                relation: Relation::Movie.name().to_string(),
            });
        }
        self.touched_titles.push(key.title.clone());
        self.working.movies.push(StoredMovie {
            id,
            key: key.clone(),
            fields: fields.clone(),
            payload: payload.clone(),
        });
        Ok(())
    }

    fn update_movie(
        &mut self,
        id: MovieId,
        fields: &MovieFields,
        payload: &serde_json::Value,
    ) -> StoreResult<()> {
        self.require(Relation::Movie)?;
        let movie = self
            .working
            .movies
            .iter_mut()
            .find(|movie| movie.id == id)
            .ok_or_else(|| StoreError::Rejected(format!("movie {id} does not exist")))?;

        movie.fields.rating = fields.rating;
        movie.fields.gross = fields.gross;
        movie.fields.runtime_minutes = fields.runtime_minutes;
        movie.payload = payload.clone();
        self.touched_titles.push(movie.key.title.clone());
        Ok(())
    }

    fn insert_link(
        &mut self,
        kind: EntityKind,
        movie: MovieId,
        entity: EntityId,
    ) -> StoreResult<LinkOutcome> {
        self.require(kind.link_relation())?;
        let inserted = self
            .working
            .links
            .entry(kind)
            .or_default()
            .insert((movie, entity));
        Ok(if inserted {
            LinkOutcome::Inserted
        } else {
            LinkOutcome::AlreadyPresent
        })
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx {
            store,
            working,
            touched_titles,
        } = *self;

        if let Some(title) = touched_titles.iter().find(|title| {
            store
                .failing_titles
                .iter()
                .any(|failing| failing.eq_ignore_ascii_case(title))
        }) {
            return Err(StoreError::Rejected(format!(
                "commit refused for movie '{title}'"
            )));
        }

        store.tables = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_has_no_conditional_insert() {
        let mut store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        assert!(!tx.supports_conditional_insert());
        let err = tx
            .insert_entity_if_absent(EntityKind::Genre, EntityId::new(), "Drama")
            .unwrap_err();
        assert!(matches!(err, StoreError::Unsupported(_)));
    }

    #[test]
    fn test_commit_publishes_snapshot() {
        let mut store = MemoryStore::new();
        {
            let mut tx = store.begin().unwrap();
            tx.insert_entity(EntityKind::Genre, EntityId::new(), "Drama")
                .unwrap();
            tx.commit().unwrap();
        }
        {
            let mut tx = store.begin().unwrap();
            tx.insert_entity(EntityKind::Genre, EntityId::new(), "Crime")
                .unwrap();
            // dropped without commit
        }
        assert_eq!(store.entity_names(EntityKind::Genre), vec!["Drama"]);
        assert_eq!(store.count(Relation::Genre).unwrap(), 1);
    }

    #[test]
    fn test_fail_commit_on_title() {
        let mut store = MemoryStore::new().fail_commit_on("broken");
        let mut tx = store.begin().unwrap();
        tx.insert_movie(
            MovieId::new(),
            &MovieKey::new("Broken", None),
            &MovieFields::default(),
            &json!({}),
        )
        .unwrap();
        assert!(tx.commit().is_err());
        assert!(store.movies().is_empty());
    }

    #[test]
    fn test_without_relation() {
        let mut store = MemoryStore::new().without_relation(Relation::Actor);
        assert_eq!(store.missing_relations().unwrap(), vec![Relation::Actor]);

        let tx = store.begin().unwrap();
        assert!(tx.find_entity(EntityKind::Actor, "Jane").is_err());
        assert!(tx.find_entity(EntityKind::Genre, "Drama").is_ok());
    }
}
