use crate::{
    error::{MigratorError, Stage},
    retry::classify_db_error,
};
use connectors::sql::base::destination::TargetStore;
use engine_core::retry::RetryPolicy;
use model::records::row::RowData;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, warn};

/// Candidates split by whether the target already has them.
#[derive(Debug, Default)]
pub struct Partition {
    pub fresh: Vec<(i64, RowData)>,
    pub existing: Vec<i64>,
}

/// Removes rows a previous run already wrote.
#[derive(Clone)]
pub struct ExistenceFilter {
    target: Arc<dyn TargetStore>,
    retry: RetryPolicy,
}

impl ExistenceFilter {
    pub fn new(target: Arc<dyn TargetStore>, retry: RetryPolicy) -> Self {
        Self { target, retry }
    }

    pub async fn existing_ids(
        &self,
        table: &str,
        id_column: &str,
        ids: &[i64],
    ) -> Result<HashSet<i64>, MigratorError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.retry
            .run_observed(
                || {
                    let target = self.target.clone();
                    async move { target.existing_keys(table, id_column, ids).await }
                },
                classify_db_error,
                |err, attempt| warn!(table, attempt, error = %err, "Existence check failed"),
            )
            .await
            .map_err(|e| MigratorError::from_retry(Stage::ExistenceCheck, table, e))
    }

    /// Splits `candidates` into rows to insert and ids already present,
    /// preserving source order.
    pub async fn partition(
        &self,
        table: &str,
        id_column: &str,
        candidates: Vec<(i64, RowData)>,
    ) -> Result<Partition, MigratorError> {
        let ids: Vec<i64> = candidates.iter().map(|(id, _)| *id).collect();
        let present = self.existing_ids(table, id_column, &ids).await?;

        let mut partition = Partition::default();
        for (id, row) in candidates {
            if present.contains(&id) {
                partition.existing.push(id);
            } else {
                partition.fresh.push((id, row));
            }
        }

        debug!(
            table,
            candidates = ids.len(),
            existing = partition.existing.len(),
            fresh = partition.fresh.len(),
            "Partitioned candidates"
        );
        Ok(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryTarget;
    use model::core::value::{FieldValue, Value};
    use std::time::Duration;

    fn user(id: i64) -> RowData {
        RowData::new(
            "users",
            vec![
                FieldValue::new("id", Value::Int(id)),
                FieldValue::new("username", Value::String(format!("user{id}"))),
            ],
        )
    }

    #[tokio::test]
    async fn test_partition_keeps_source_order() {
        let target = Arc::new(MemoryTarget::new());
        target.seed("users", vec![user(2)]);
        let filter = ExistenceFilter::new(target.clone(), RetryPolicy::fixed(1, Duration::ZERO));

        let partition = filter
            .partition("users", "id", vec![(3, user(3)), (2, user(2)), (1, user(1))])
            .await
            .unwrap();

        let fresh: Vec<i64> = partition.fresh.iter().map(|(id, _)| *id).collect();
        assert_eq!(fresh, vec![3, 1]);
        assert_eq!(partition.existing, vec![2]);
    }

    #[tokio::test]
    async fn test_empty_candidates_issue_no_query() {
        let target = Arc::new(MemoryTarget::new());
        let filter = ExistenceFilter::new(target.clone(), RetryPolicy::fixed(1, Duration::ZERO));

        let partition = filter.partition("users", "id", Vec::new()).await.unwrap();
        assert!(partition.fresh.is_empty());
        assert_eq!(target.existence_queries(), 0);
    }
}
