use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identities
// ============================================================================

/// Stable identity of a movie row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(Uuid);

impl MovieId {
    /// Generate a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MovieId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a genre, director or actor row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entity kinds and relations
// ============================================================================

/// The three shared entity tables. They have the same shape and differ only
/// in table naming and in whether the `"Unknown"` sentinel is filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Genre,
    Director,
    Actor,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Genre, EntityKind::Director, EntityKind::Actor];

    /// Relation holding the entities of this kind.
    pub fn relation(&self) -> Relation {
        match self {
            Self::Genre => Relation::Genre,
            Self::Director => Relation::Director,
            Self::Actor => Relation::Actor,
        }
    }

    /// Join relation linking movies to entities of this kind.
    pub fn link_relation(&self) -> Relation {
        match self {
            Self::Genre => Relation::MovieGenre,
            Self::Director => Relation::MovieDirector,
            Self::Actor => Relation::MovieActor,
        }
    }

    /// Primary key column, shared by the entity table and its join table.
    pub fn id_column(&self) -> &'static str {
        match self {
            Self::Genre => "genre_id",
            Self::Director => "director_id",
            Self::Actor => "actor_id",
        }
    }

    /// Whether `"unknown"` names are dropped before linking.
    ///
    /// The repair stage injects `"Unknown"` for missing directors and stars;
    /// genres never receive the sentinel.
    pub fn skips_unknown_sentinel(&self) -> bool {
        !matches!(self, Self::Genre)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Genre => "genre",
            Self::Director => "director",
            Self::Actor => "actor",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The seven relations the catalog store must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Movie,
    Genre,
    Director,
    Actor,
    MovieGenre,
    MovieDirector,
    MovieActor,
}

impl Relation {
    pub const ALL: [Relation; 7] = [
        Relation::Movie,
        Relation::Genre,
        Relation::Director,
        Relation::Actor,
        Relation::MovieGenre,
        Relation::MovieDirector,
        Relation::MovieActor,
    ];

    /// Table name in the store.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Genre => "genre",
            Self::Director => "director",
            Self::Actor => "actor",
            Self::MovieGenre => "movie_genre",
            Self::MovieDirector => "movie_director",
            Self::MovieActor => "movie_actor",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Movie upsert inputs
// ============================================================================

/// Lookup key of a movie: case-insensitive title plus optional start year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieKey {
    pub title: String,
    pub start_year: Option<i32>,
}

impl MovieKey {
    /// Build a key, trimming the title.
    pub fn new(title: impl AsRef<str>, start_year: Option<i32>) -> Self {
        Self {
            title: title.as_ref().trim().to_string(),
            start_year,
        }
    }

    /// Title folded with Unicode lowercasing, the form titles are compared in.
    pub fn folded_title(&self) -> String {
        self.title.to_lowercase()
    }

    /// Whether `other_title` / `other_year` address this key.
    ///
    /// A present start year narrows the match; an absent one matches on title alone.
    pub fn matches(&self, other_title: &str, other_year: Option<i32>) -> bool {
        if self.folded_title() != other_title.to_lowercase() {
            return false;
        }
        match self.start_year {
            Some(year) => other_year == Some(year),
            None => true,
        }
    }
}

/// Mutable movie attributes written on insert and overwritten on update.
///
/// `end_year` is written on insert only; updates touch rating, gross and runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieFields {
    pub end_year: Option<i32>,
    pub rating: Option<f64>,
    pub gross: Option<f64>,
    pub runtime_minutes: Option<i32>,
}

// ============================================================================
// Run summary
// ============================================================================

/// Counters for one relation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Pairs inserted by this run.
    pub created: usize,
    /// Pairs that already existed and were absorbed.
    pub existing: usize,
    /// Names dropped because reconciliation or linking failed.
    pub skipped: usize,
}

impl LinkStats {
    pub fn merge(&mut self, other: LinkStats) {
        self.created += other.created;
        self.existing += other.existing;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> usize {
        self.created + self.existing + self.skipped
    }
}

/// A row that was rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFailure {
    /// Position of the row in the cleaned dataset.
    pub row_index: usize,
    pub title: Option<String>,
    pub code: String,
    pub message: String,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,

    /// Rows read from the source.
    pub rows_read: usize,
    /// Rows left after the repair stage.
    pub rows_cleaned: usize,
    /// Exact duplicates collapsed by the repair stage.
    pub duplicates_removed: usize,

    pub rows_succeeded: usize,
    pub rows_failed: usize,
    pub failures: Vec<RowFailure>,

    /// Link counters per relation kind.
    pub links: BTreeMap<EntityKind, LinkStats>,
}

impl Default for ImportSummary {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            duration_ms: 0,
            rows_read: 0,
            rows_cleaned: 0,
            duplicates_removed: 0,
            rows_succeeded: 0,
            rows_failed: 0,
            failures: Vec::new(),
            links: BTreeMap::new(),
        }
    }
}

impl ImportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, links: &BTreeMap<EntityKind, LinkStats>) {
        self.rows_succeeded += 1;
        for (kind, stats) in links {
            self.links.entry(*kind).or_default().merge(*stats);
        }
    }

    pub fn record_failure(&mut self, failure: RowFailure) {
        self.rows_failed += 1;
        self.failures.push(failure);
    }

    /// Rows that reached the import stage.
    pub fn rows_attempted(&self) -> usize {
        self.rows_succeeded + self.rows_failed
    }

    pub fn links_for(&self, kind: EntityKind) -> LinkStats {
        self.links.get(&kind).copied().unwrap_or_default()
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data import completed in {}ms", self.duration_ms)?;
        writeln!(
            f,
            "  Rows read: {} (cleaned: {}, duplicates removed: {})",
            self.rows_read, self.rows_cleaned, self.duplicates_removed
        )?;
        writeln!(
            f,
            "  Successful: {}, Errors: {}",
            self.rows_succeeded, self.rows_failed
        )?;
        for kind in EntityKind::ALL {
            let stats = self.links_for(kind);
            writeln!(
                f,
                "  {:<9} links: {} new, {} existing, {} skipped",
                kind.display_name(),
                stats.created,
                stats.existing,
                stats.skipped
            )?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "  ✗ row {} ({}): {}",
                failure.row_index,
                failure.title.as_deref().unwrap_or("<untitled>"),
                failure.message
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_key_trims_title() {
        let key = MovieKey::new("  Foo  ", Some(2010));
        assert_eq!(key.title, "Foo");
    }

    #[test]
    fn test_movie_key_matches_case_insensitively() {
        let key = MovieKey::new("The Crown", Some(2016));
        assert!(key.matches("THE CROWN", Some(2016)));
        assert!(!key.matches("The Crown", Some(2017)));
        assert!(!key.matches("The Crown", None));
    }

    #[test]
    fn test_movie_key_folds_non_ascii_case() {
        let key = MovieKey::new("ÉLITE", Some(2018));
        assert_eq!(key.folded_title(), "élite");
        assert!(key.matches("élite", Some(2018)));
    }

    #[test]
    fn test_movie_key_without_year_matches_title_only() {
        let key = MovieKey::new("Dark", None);
        assert!(key.matches("dark", Some(2017)));
        assert!(key.matches("Dark", None));
    }

    #[test]
    fn test_entity_kind_tables() {
        assert_eq!(EntityKind::Genre.relation().name(), "genre");
        assert_eq!(EntityKind::Actor.link_relation().name(), "movie_actor");
        assert_eq!(EntityKind::Director.id_column(), "director_id");
        assert!(!EntityKind::Genre.skips_unknown_sentinel());
        assert!(EntityKind::Actor.skips_unknown_sentinel());
    }

    #[test]
    fn test_summary_merges_link_stats() {
        let mut summary = ImportSummary::new();
        let mut links = BTreeMap::new();
        links.insert(
            EntityKind::Genre,
            LinkStats {
                created: 2,
                existing: 0,
                skipped: 1,
            },
        );
        summary.record_success(&links);
        summary.record_success(&links);

        assert_eq!(summary.rows_succeeded, 2);
        assert_eq!(summary.links_for(EntityKind::Genre).created, 4);
        assert_eq!(summary.links_for(EntityKind::Genre).skipped, 2);
        assert_eq!(summary.links_for(EntityKind::Actor), LinkStats::default());
    }

    #[test]
    fn test_summary_display_lists_failures() {
        let mut summary = ImportSummary::new();
        summary.record_failure(RowFailure {
            row_index: 4,
            title: Some("Broken".to_string()),
            code: "STORE_ERROR".to_string(),
            message: "disk full".to_string(),
        });

        let text = summary.to_string();
        assert!(text.contains("Successful: 0, Errors: 1"));
        assert!(text.contains("row 4 (Broken): disk full"));
    }
}
