//! Buffered bulk insertion of validated users.

use crate::import::error::{ImportError, StoreError};
use crate::import::stats::ImportStats;
use crate::models::NewUser;
use crate::store::ImportStore;

/// Accumulates users and writes them with one bulk insert per full batch.
///
/// Every user is linked to the owning company in the same store operation
/// that inserts its batch, so a batch is either fully written and linked or
/// not written at all. A failure is returned as [`ImportError::BatchWrite`]
/// naming every row of the batch.
pub struct BatchWriter {
    company_id: i64,
    batch_size: usize,
    rows: Vec<usize>,
    users: Vec<NewUser>,
    stats: ImportStats,
}

impl BatchWriter {
    pub fn new(company_id: i64, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            company_id,
            batch_size,
            rows: Vec::with_capacity(batch_size),
            users: Vec::with_capacity(batch_size),
            stats: ImportStats::default(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Users buffered but not yet written.
    pub fn pending(&self) -> usize {
        self.users.len()
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    /// Buffer `user` from input row `row`, flushing once the batch is full.
    pub async fn push<S>(&mut self, store: &S, row: usize, user: NewUser) -> Result<(), ImportError>
    where
        S: ImportStore + ?Sized,
    {
        self.rows.push(row);
        self.users.push(user);

        if self.users.len() >= self.batch_size {
            self.flush(store).await?;
        }
        Ok(())
    }

    /// Write whatever is buffered. Returns the number of users created.
    pub async fn flush<S>(&mut self, store: &S) -> Result<usize, ImportError>
    where
        S: ImportStore + ?Sized,
    {
        if self.users.is_empty() {
            return Ok(0);
        }

        let rows = std::mem::take(&mut self.rows);
        let users = std::mem::take(&mut self.users);
        self.stats.batches += 1;

        let created = match store.insert_users(&users, self.company_id).await {
            Ok(created) => created,
            Err(source) => return Err(ImportError::BatchWrite { rows, source }),
        };

        if created.len() != users.len() {
            return Err(ImportError::BatchWrite {
                source: StoreError::RowCountMismatch {
                    expected: users.len(),
                    actual: created.len(),
                },
                rows,
            });
        }

        self.stats.users_created += created.len();
        self.stats.company_links += created.len();
        log::debug!(
            "batch {}: inserted {} users (rows {}..={}) for company {}",
            self.stats.batches,
            created.len(),
            rows.first().copied().unwrap_or_default(),
            rows.last().copied().unwrap_or_default(),
            self.company_id
        );

        Ok(created.len())
    }
}
