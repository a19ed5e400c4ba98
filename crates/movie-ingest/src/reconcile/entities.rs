use crate::error::{IngestError, Result, ResultExt};
use crate::normalize::normalize_entity_name;
use crate::store::{CatalogTx, StoreError};
use crate::types::{EntityId, EntityKind};
use tracing::debug;

/// Maps entity names to stable identities, creating them on first sight.
///
/// Names are matched exactly (case-sensitive) after trimming. Creation uses
/// the store's conditional insert when it has one; otherwise a plain insert
/// whose uniqueness conflict is resolved by reading back the row the other
/// writer created.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReconciler;

impl EntityReconciler {
    pub fn reconcile(
        &self,
        tx: &mut dyn CatalogTx,
        kind: EntityKind,
        name: &str,
    ) -> Result<EntityId> {
        let name =
            normalize_entity_name(name).ok_or_else(|| IngestError::InvalidName(name.to_string()))?;
        let context = format!("reconciling {kind} '{name}'");

        if let Some(id) = tx.find_entity(kind, name).context(&context)? {
            return Ok(id);
        }

        let candidate = EntityId::new();
        let attempt = if tx.supports_conditional_insert() {
            tx.insert_entity_if_absent(kind, candidate, name)
        } else {
            tx.insert_entity(kind, candidate, name)
                .map(|()| Some(candidate))
        };

        match attempt {
            Ok(Some(id)) => {
                debug!("Created {} '{}' ({})", kind, name, id);
                Ok(id)
            }
            Ok(None) => {
                debug!("{} '{}' appeared concurrently, re-reading", kind, name);
                tx.find_entity(kind, name)
                    .context(&context)?
                    .ok_or_else(|| {
                        IngestError::Store(StoreError::Corrupt(format!(
                            "{kind} '{name}' conflicted on insert but cannot be read back"
                        )))
                        .with_context(&context)
                    })
            }
            Err(e) => {
                debug!("Insert of {} '{}' failed ({}), re-reading", kind, name, e);
                match tx.find_entity(kind, name).context(&context)? {
                    Some(id) => Ok(id),
                    None => Err(IngestError::Store(e).with_context(&context)),
                }
            }
        }
    }
}
