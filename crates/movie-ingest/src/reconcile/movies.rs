use crate::error::{IngestError, Result, ResultExt};
use crate::store::CatalogTx;
use crate::types::{MovieFields, MovieId, MovieKey};
use tracing::debug;

/// Creates or updates the movie addressed by a [`MovieKey`].
///
/// The lookup and the write are two statements. That is safe only because
/// the importer runs rows one at a time; nothing in the store enforces
/// uniqueness of `(folded title, start_year)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovieUpserter;

impl MovieUpserter {
    /// Returns the identity of the movie, creating it when no row matches.
    ///
    /// An existing movie gets rating, gross, runtime and payload overwritten
    /// (absent values included). A new movie is written with every field,
    /// end year included.
    pub fn upsert(
        &self,
        tx: &mut dyn CatalogTx,
        key: &MovieKey,
        fields: &MovieFields,
        payload: &serde_json::Value,
    ) -> Result<MovieId> {
        if key.title.is_empty() {
            return Err(IngestError::InvalidName(key.title.clone()));
        }
        let context = format!("processing movie '{}'", key.title);

        match tx.find_movie(key).context(&context)? {
            Some(id) => {
                tx.update_movie(id, fields, payload).context(&context)?;
                debug!("Updated movie '{}' ({})", key.title, id);
                Ok(id)
            }
            None => {
                let id = MovieId::new();
                tx.insert_movie(id, key, fields, payload)
                    .context(&context)?;
                debug!("Created movie '{}' ({})", key.title, id);
                Ok(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CatalogStore, MemoryStore, SqliteStore};
    use crate::types::Relation;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn fields(rating: f64) -> MovieFields {
        MovieFields {
            end_year: Some(2012),
            rating: Some(rating),
            gross: Some(0.0),
            runtime_minutes: Some(121),
        }
    }

    fn sqlite() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.bootstrap_schema().unwrap();
        store
    }

    fn upsert(
        tx: &mut dyn CatalogTx,
        title: &str,
        year: Option<i32>,
        fields: MovieFields,
        payload: Value,
    ) -> MovieId {
        MovieUpserter
            .upsert(tx, &MovieKey::new(title, year), &fields, &payload)
            .unwrap()
    }

    #[test]
    fn test_same_key_yields_one_movie() {
        let mut store = MemoryStore::new();
        let mut tx = store.begin().unwrap();

        let first = upsert(tx.as_mut(), "Foo", Some(2010), fields(7.0), json!({}));
        let second = upsert(tx.as_mut(), "FOO", Some(2010), fields(8.0), json!({"v": 2}));
        tx.commit().unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count(Relation::Movie).unwrap(), 1);

        let movie = store.movie_by_title("foo").unwrap();
        assert_eq!(movie.fields.rating, Some(8.0));
        assert_eq!(movie.payload, json!({"v": 2}));
    }

    #[test]
    fn test_update_keeps_end_year_and_nulls_absent_values() {
        let mut store = MemoryStore::new();
        let mut tx = store.begin().unwrap();

        upsert(tx.as_mut(), "Foo", Some(2010), fields(7.0), json!({}));
        upsert(tx.as_mut(), "Foo", Some(2010), MovieFields::default(), json!({}));
        tx.commit().unwrap();

        let movie = store.movie_by_title("Foo").unwrap();
        assert_eq!(movie.fields.end_year, Some(2012));
        assert_eq!(movie.fields.rating, None);
        assert_eq!(movie.fields.runtime_minutes, None);
    }

    #[test]
    fn test_different_start_years_are_different_movies() {
        let mut store = sqlite();
        let mut tx = store.begin().unwrap();

        let original = upsert(tx.as_mut(), "Dune", Some(1984), fields(6.0), json!({}));
        let remake = upsert(tx.as_mut(), "Dune", Some(2021), fields(8.0), json!({}));
        tx.commit().unwrap();

        assert_ne!(original, remake);
        assert_eq!(store.count(Relation::Movie).unwrap(), 2);
    }

    #[test]
    fn test_year_zero_does_not_match_dated_movie() {
        let mut store = sqlite();
        let mut tx = store.begin().unwrap();

        let series = upsert(tx.as_mut(), "Arcane", Some(2021), fields(9.0), json!({}));
        let episode = upsert(tx.as_mut(), "Arcane", Some(0), MovieFields::default(), json!({}));
        tx.commit().unwrap();

        assert_ne!(series, episode);
        assert_eq!(store.count(Relation::Movie).unwrap(), 2);
    }

    #[test]
    fn test_non_ascii_titles_fold_to_one_movie() {
        let mut store = sqlite();
        let mut tx = store.begin().unwrap();

        let lower = upsert(tx.as_mut(), "élite", Some(2018), fields(7.4), json!({}));
        let upper = upsert(tx.as_mut(), "ÉLITE", Some(2018), fields(7.5), json!({}));
        tx.commit().unwrap();

        assert_eq!(lower, upper);
        assert_eq!(store.count(Relation::Movie).unwrap(), 1);
    }

    #[test]
    fn test_missing_start_year_matches_on_title() {
        let mut store = MemoryStore::new();
        let mut tx = store.begin().unwrap();

        let dated = upsert(tx.as_mut(), "Dark", Some(2017), fields(8.7), json!({}));
        let undated = upsert(tx.as_mut(), "Dark", None, fields(8.8), json!({}));
        assert_eq!(dated, undated);
    }
}
