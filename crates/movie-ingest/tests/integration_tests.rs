//! Integration tests for the movie listing importer.
//!
//! These tests run the full pipeline from a CSV fixture into both store
//! backends.

use movie_ingest::{
    CatalogStore, EntityKind, ImportStage, Importer, IngestConfig, IngestError, ListingSource,
    MemoryStore, PreparedDataset, Relation, SqliteStore,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn sample_config() -> IngestConfig {
    IngestConfig::builder()
        .source_path(fixtures_path().join("movies_sample.csv"))
        .build()
        .unwrap()
}

fn importer(config: IngestConfig) -> Importer {
    Importer::builder().config(config).build().unwrap()
}

fn prepared_sample() -> PreparedDataset {
    let config = sample_config();
    let data = ListingSource::new(&config.source_path).load().unwrap();
    importer(config).prepare(data).unwrap()
}

fn sqlite_store(dir: &TempDir) -> SqliteStore {
    let store = SqliteStore::open(dir.path().join("catalog.db")).unwrap();
    store.bootstrap_schema().unwrap();
    store
}

fn relation_counts(store: &dyn CatalogStore) -> Vec<(Relation, u64)> {
    Relation::ALL
        .into_iter()
        .map(|relation| (relation, store.count(relation).unwrap()))
        .collect()
}

fn expected_counts() -> Vec<(Relation, u64)> {
    vec![
        (Relation::Movie, 3),
        (Relation::Genre, 3),
        (Relation::Director, 1),
        (Relation::Actor, 4),
        (Relation::MovieGenre, 4),
        (Relation::MovieDirector, 2),
        (Relation::MovieActor, 5),
    ]
}

// ============================================================================
// Repair Stage
// ============================================================================

#[test]
fn test_prepare_sample_removes_duplicate_row() {
    let prepared = prepared_sample();

    assert_eq!(prepared.rows_before, 6);
    assert_eq!(prepared.duplicates_removed, 1);
    assert_eq!(prepared.records.len(), 5);
}

#[test]
fn test_prepare_extracts_years_and_genres() {
    let prepared = prepared_sample();
    let foo = &prepared.records[0];

    assert_eq!(foo.title.as_deref(), Some("Foo"));
    assert_eq!(foo.start_year, Some(2010));
    assert_eq!(foo.end_year, Some(2012));
    assert_eq!(foo.genre.as_deref(), Some("Drama, Crime"));
    assert_eq!(foo.genres(), vec!["Drama", "Crime"]);
}

#[test]
fn test_prepare_splits_director_and_stars() {
    let prepared = prepared_sample();
    let foo = &prepared.records[0];

    assert_eq!(foo.director.as_deref(), Some("Jane Doe"));
    assert_eq!(foo.actors(), vec!["A", "B", "A"]);

    let bar = &prepared.records[1];
    assert_eq!(bar.director.as_deref(), Some("Unknown"));
    assert_eq!(bar.actors(), vec!["C", "D"]);
}

#[test]
fn test_prepare_repairs_shifted_votes() {
    let prepared = prepared_sample();

    let foo = &prepared.records[0];
    assert_eq!(foo.votes, Some(1_234_567));
    assert_eq!(foo.runtime_minutes, Some(121));

    let bar = &prepared.records[1];
    assert_eq!(bar.votes, Some(12));
    assert_eq!(bar.runtime_minutes, Some(45));
    assert_eq!(bar.gross, Some(100.0));
}

#[test]
fn test_prepare_keeps_audit_payload() {
    let prepared = prepared_sample();
    let payload = &prepared.records[1].payload;

    assert_eq!(payload["movies"], "Bar");
    assert_eq!(payload["one-line"], "Another story.");
    assert!(payload.get("year").is_none());
}

// ============================================================================
// Full Import
// ============================================================================

#[test]
fn test_full_import_into_sqlite() {
    let dir = TempDir::new().unwrap();
    let mut store = sqlite_store(&dir);

    let summary = importer(sample_config()).run(&mut store).unwrap();

    assert_eq!(summary.rows_read, 6);
    assert_eq!(summary.duplicates_removed, 1);
    assert_eq!(summary.rows_succeeded, 4);
    assert_eq!(summary.rows_failed, 1);
    assert_eq!(summary.failures[0].code, "MISSING_TITLE");
    assert_eq!(relation_counts(&store), expected_counts());
}

#[test]
fn test_repeated_title_and_year_updates_one_movie() {
    let dir = TempDir::new().unwrap();
    let mut store = sqlite_store(&dir);

    importer(sample_config()).run(&mut store).unwrap();

    let (title, rating, gross, runtime): (String, f64, f64, i64) = store
        .connection()
        .query_row(
            "SELECT title, rating, gross, runtime_min FROM movie WHERE title_key = 'baz'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();

    assert_eq!(title, "Baz");
    assert_eq!(rating, 7.5);
    assert_eq!(gross, 2.0);
    assert_eq!(runtime, 96);
}

#[test]
fn test_undated_row_does_not_overwrite_dated_movie() {
    let dir = TempDir::new().unwrap();
    let mut store = sqlite_store(&dir);
    let config = IngestConfig::builder()
        .source_path(fixtures_path().join("shared_title.csv"))
        .build()
        .unwrap();

    let summary = importer(config).run(&mut store).unwrap();
    assert_eq!(summary.rows_succeeded, 2);
    assert_eq!(store.count(Relation::Movie).unwrap(), 2);
    assert_eq!(store.count(Relation::Actor).unwrap(), 2);
    assert_eq!(store.count(Relation::MovieActor).unwrap(), 3);

    let mut stmt = store
        .connection()
        .prepare("SELECT year_start, rating FROM movie ORDER BY year_start DESC")
        .unwrap();
    let rows: Vec<(i64, Option<f64>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![(2021, Some(9.0)), (0, None)]);
}

#[test]
fn test_end_year_is_stored() {
    let dir = TempDir::new().unwrap();
    let mut store = sqlite_store(&dir);

    importer(sample_config()).run(&mut store).unwrap();

    let (start, end): (i64, i64) = store
        .connection()
        .query_row(
            "SELECT year_start, year_end FROM movie WHERE title = 'Foo'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((start, end), (2010, 2012));
}

#[test]
fn test_second_run_adds_nothing() {
    let dir = TempDir::new().unwrap();
    let mut store = sqlite_store(&dir);
    let importer = importer(sample_config());

    let first = importer.run(&mut store).unwrap();
    let after_first = relation_counts(&store);

    let second = importer.run(&mut store).unwrap();

    assert_eq!(relation_counts(&store), after_first);
    assert_eq!(second.rows_succeeded, first.rows_succeeded);
    for kind in EntityKind::ALL {
        assert_eq!(second.links_for(kind).created, 0, "{kind} links created twice");
    }
}

#[test]
fn test_memory_store_matches_sqlite() {
    let mut store = MemoryStore::new();

    let summary = importer(sample_config()).run(&mut store).unwrap();

    assert_eq!(summary.rows_succeeded, 4);
    assert_eq!(relation_counts(&store), expected_counts());
    assert_eq!(store.entity_names(EntityKind::Actor), vec!["A", "B", "C", "D"]);
}

#[test]
fn test_progress_ends_with_complete() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let stages_clone = stages.clone();

    let importer = Importer::builder()
        .config(sample_config())
        .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
        .build()
        .unwrap();
    importer.run(&mut MemoryStore::new()).unwrap();

    let stages = stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&ImportStage::Loading));
    assert_eq!(stages.last(), Some(&ImportStage::Complete));
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn test_missing_relations_abort_before_rows() {
    let dir = TempDir::new().unwrap();
    let mut store = SqliteStore::open(dir.path().join("empty.db")).unwrap();

    let err = importer(sample_config()).run(&mut store).unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.error_code(), "MISSING_RELATIONS");
    match err {
        IngestError::MissingRelations(missing) => assert_eq!(missing.len(), 7),
        other => panic!("expected MissingRelations, got {other:?}"),
    }
}

#[test]
fn test_missing_source_is_fatal() {
    let config = IngestConfig::builder()
        .source_path(fixtures_path().join("does_not_exist.csv"))
        .build()
        .unwrap();
    let mut store = MemoryStore::new();

    let err = importer(config).run(&mut store).unwrap_err();

    assert!(matches!(err, IngestError::SourceNotFound(_)));
    assert!(store.movies().is_empty());
}

#[test]
fn test_missing_column_is_fatal() {
    let config = IngestConfig::builder()
        .source_path(fixtures_path().join("missing_gross.csv"))
        .build()
        .unwrap();
    let mut store = MemoryStore::new();

    let err = importer(config).run(&mut store).unwrap_err();

    assert!(err.is_fatal());
    match err {
        IngestError::MissingColumns(missing) => assert_eq!(missing, vec!["gross"]),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    assert!(store.movies().is_empty());
}

#[test]
fn test_failed_row_rolls_back_its_links_only() {
    let mut store = MemoryStore::new().fail_commit_on("Bar");

    let summary = importer(sample_config()).run(&mut store).unwrap();

    assert_eq!(summary.rows_succeeded, 3);
    assert_eq!(summary.rows_failed, 2);
    assert!(store.movie_by_title("Bar").is_none());
    assert!(store.movie_by_title("Foo").is_some());
    assert_eq!(store.entity_names(EntityKind::Actor), vec!["A", "B", "C"]);
    assert_eq!(store.entity_names(EntityKind::Genre), vec!["Crime", "Drama"]);
}
