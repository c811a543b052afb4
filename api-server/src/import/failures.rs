//! Persistence of rows that failed validation.

use crate::import::error::ImportError;
use crate::import::row::Failure;
use crate::import::stats::ImportStats;
use crate::models::FailedEntry;
use crate::store::ImportStore;

/// Writes failure descriptors to the failed entries store with
/// first-or-create semantics.
#[derive(Default)]
pub struct FailureSink {
    stats: ImportStats,
}

impl FailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    /// Record every failure, returning the stored entries in the same order.
    pub async fn record<S>(
        &mut self,
        store: &S,
        failures: &[Failure],
    ) -> Result<Vec<FailedEntry>, ImportError>
    where
        S: ImportStore + ?Sized,
    {
        let mut entries = Vec::with_capacity(failures.len());

        for failure in failures {
            let (entry, created) = store
                .first_or_create_failed_entry(&failure.to_entry())
                .await
                .map_err(|source| ImportError::FailureWrite {
                    row: failure.row,
                    source,
                })?;

            if created {
                self.stats.failures_recorded += 1;
            } else {
                self.stats.failures_deduplicated += 1;
            }
            log::debug!(
                "row {}: {} failed ({}), entry {}{}",
                failure.row,
                failure.attribute,
                failure.message,
                entry.id,
                if created { "" } else { " (existing)" }
            );
            entries.push(entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::row::{FieldError, Row};
    use crate::store::MemoryImportStore;

    fn failure(row: usize, field: &'static str, message: &str) -> Failure {
        let values: Row = [("firstname", "Ann"), ("sex", "X"), ("email", "")]
            .into_iter()
            .collect();
        Failure::new(
            row,
            FieldError {
                field,
                message: message.into(),
            },
            &values,
        )
    }

    #[tokio::test]
    async fn rerecording_identical_failure_reuses_entry() {
        let store = MemoryImportStore::new();
        let mut sink = FailureSink::new();
        let failures = vec![failure(2, "sex", "The sex format is invalid.")];

        let first = sink.record(&store, &failures).await.expect("record");
        let second = sink.record(&store, &failures).await.expect("record again");

        assert_eq!(first, second);
        assert_eq!(store.failed_entries().len(), 1);
        assert_eq!(sink.stats().failures_recorded, 1);
        assert_eq!(sink.stats().failures_deduplicated, 1);
    }

    #[tokio::test]
    async fn each_failing_field_gets_its_own_entry() {
        let store = MemoryImportStore::new();
        let mut sink = FailureSink::new();
        let failures = vec![
            failure(3, "sex", "The sex format is invalid."),
            failure(3, "email", "The email field is required."),
        ];

        let entries = sink.record(&store, &failures).await.expect("record");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].attribute, "sex");
        assert_eq!(entries[1].attribute, "email");
        assert!(entries.iter().all(|e| e.row_id == 3));
        assert_eq!(entries[1].email, None);
    }
}
