use super::EntityReconciler;
use crate::config::DEFAULT_ACTOR_LIMIT;
use crate::error::{Result, ResultExt};
use crate::normalize::{is_unknown_sentinel, normalize_entity_name};
use crate::records::MovieRecord;
use crate::store::{CatalogTx, LinkOutcome};
use crate::types::{EntityKind, LinkStats, MovieId};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Links a movie to its genres, directors and actors.
///
/// Failures here never fail the row: a name that cannot be reconciled or
/// linked is logged and counted as skipped.
#[derive(Debug, Clone)]
pub struct RelationshipLinker {
    actor_limit: usize,
    reconciler: EntityReconciler,
}

impl Default for RelationshipLinker {
    fn default() -> Self {
        Self::new(DEFAULT_ACTOR_LIMIT)
    }
}

impl RelationshipLinker {
    pub fn new(actor_limit: usize) -> Self {
        Self {
            actor_limit,
            reconciler: EntityReconciler,
        }
    }

    pub fn actor_limit(&self) -> usize {
        self.actor_limit
    }

    /// Link every relation kind of a record.
    pub fn link_record(
        &self,
        tx: &mut dyn CatalogTx,
        movie: MovieId,
        record: &MovieRecord,
    ) -> BTreeMap<EntityKind, LinkStats> {
        let mut stats = BTreeMap::new();
        stats.insert(
            EntityKind::Genre,
            self.link(tx, movie, EntityKind::Genre, &record.genres()),
        );
        stats.insert(
            EntityKind::Director,
            self.link(tx, movie, EntityKind::Director, &record.directors()),
        );
        stats.insert(
            EntityKind::Actor,
            self.link(tx, movie, EntityKind::Actor, &record.actors()),
        );
        stats
    }

    /// Link `names` of one kind to a movie.
    ///
    /// Actors are capped to the first `actor_limit` names before any
    /// filtering. Empty and `"nan"` names are dropped, as is the `"Unknown"`
    /// sentinel for directors and actors. A name repeated within the list is
    /// linked once.
    pub fn link(
        &self,
        tx: &mut dyn CatalogTx,
        movie: MovieId,
        kind: EntityKind,
        names: &[String],
    ) -> LinkStats {
        let limit = match kind {
            EntityKind::Actor => self.actor_limit,
            _ => usize::MAX,
        };

        let mut stats = LinkStats::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for raw in names.iter().take(limit) {
            let Some(name) = normalize_entity_name(raw) else {
                continue;
            };
            if kind.skips_unknown_sentinel() && is_unknown_sentinel(name) {
                continue;
            }
            if !seen.insert(name) {
                continue;
            }

            match self.link_one(tx, movie, kind, name) {
                Ok(LinkOutcome::Inserted) => stats.created += 1,
                Ok(LinkOutcome::AlreadyPresent) => stats.existing += 1,
                Err(e) if e.is_unique_violation() => stats.existing += 1,
                Err(e) => {
                    warn!("Skipping {} '{}' for movie {}: {}", kind, name, movie, e);
                    stats.skipped += 1;
                }
            }
        }

        debug!(
            "Linked {} {}(s) to {} ({} existing, {} skipped)",
            stats.created, kind, movie, stats.existing, stats.skipped
        );
        stats
    }

    fn link_one(
        &self,
        tx: &mut dyn CatalogTx,
        movie: MovieId,
        kind: EntityKind,
        name: &str,
    ) -> Result<LinkOutcome> {
        let entity = self.reconciler.reconcile(tx, kind, name)?;
        tx.insert_link(kind, movie, entity)
            .context(format!("linking {kind} '{name}'"))
    }
}
