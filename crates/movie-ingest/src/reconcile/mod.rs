//! Reconciliation engine: idempotent upserts of entities, movies and the
//! relationships between them.
//!
//! Everything here runs inside a caller-provided [`CatalogTx`](crate::store::CatalogTx),
//! so one row's movie, entities and links commit or roll back together.

mod entities;
mod links;
mod movies;

pub use entities::EntityReconciler;
pub use links::RelationshipLinker;
pub use movies::MovieUpserter;
