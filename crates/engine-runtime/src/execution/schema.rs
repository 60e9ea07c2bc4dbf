use connectors::sql::base::{destination::TargetStore, error::DbError};
use model::entity::EntityKind;
use tracing::info;

/// Creates any missing auxiliary tables on the target. Tables owned by the
/// forum software are left alone. Returns the entities whose DDL was issued.
pub async fn ensure_tables(target: &dyn TargetStore) -> Result<Vec<EntityKind>, DbError> {
    let mut ensured = Vec::new();
    for entity in EntityKind::ALL {
        if target.ensure_table(entity).await? {
            ensured.push(entity);
        }
    }
    info!(tables = ensured.len(), "Auxiliary tables ensured");
    Ok(ensured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryTarget;

    #[tokio::test]
    async fn test_only_auxiliary_tables_are_created() {
        let target = MemoryTarget::new();
        let ensured = ensure_tables(&target).await.unwrap();

        assert_eq!(
            ensured,
            vec![
                EntityKind::Entities,
                EntityKind::Addresses,
                EntityKind::MissingUsers,
                EntityKind::TimeWindows,
                EntityKind::DrizzleMigrations,
            ]
        );
    }
}
