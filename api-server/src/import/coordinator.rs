//! Import coordination for one user import run.
//!
//! The ImportCoordinator drives the pipeline row by row:
//! 1. Validate the row against the rule table
//! 2. Valid rows get a unique username and go to the batch writer
//! 3. Invalid rows are written to the failed entries store and kept in memory
//! 4. The final partial batch is flushed when the input ends

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::import::batch::BatchWriter;
use crate::import::config::ImportConfig;
use crate::import::error::ImportError;
use crate::import::failures::FailureSink;
use crate::import::row::{Failure, Row};
use crate::import::rules::USER_RULES;
use crate::import::stats::ImportStats;
use crate::import::username::UsernameGenerator;
use crate::import::validator::{ClaimedKeys, RowValidator, Validation};
use crate::store::ImportStore;

/// Lifecycle of a coordinator. Every coordinator runs at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    /// A store write failed and the run stopped early.
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Result of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportSummary {
    #[schemars(with = "String")]
    pub run_id: Uuid,
    pub company_id: i64,
    pub state: RunState,
    pub stats: ImportStats,
}

/// Runs the import pipeline over one row sequence for one company.
pub struct ImportCoordinator<S, R = StdRng> {
    run_id: Uuid,
    store: S,
    company_id: i64,
    state: RunState,
    validator: RowValidator,
    usernames: UsernameGenerator<R>,
    writer: BatchWriter,
    sink: FailureSink,
    claimed: ClaimedKeys,
    failures: Vec<Failure>,
    rows: usize,
    failed_rows: usize,
}

impl<S: ImportStore> ImportCoordinator<S, StdRng> {
    /// Create a coordinator with an entropy-seeded username generator.
    pub fn new(store: S, company_id: i64, config: ImportConfig) -> Result<Self, ImportError> {
        Self::with_rng(store, company_id, config, StdRng::from_entropy())
    }
}

impl<S, R> ImportCoordinator<S, R>
where
    S: ImportStore,
    R: Rng + Send,
{
    /// Create a coordinator drawing username suffixes from `rng`.
    pub fn with_rng(
        store: S,
        company_id: i64,
        config: ImportConfig,
        rng: R,
    ) -> Result<Self, ImportError> {
        Ok(Self {
            run_id: Uuid::new_v4(),
            store,
            company_id,
            state: RunState::Idle,
            validator: RowValidator::new(USER_RULES)?,
            usernames: UsernameGenerator::new(
                rng,
                config.username_suffix_max,
                config.max_username_attempts,
            ),
            writer: BatchWriter::new(company_id, config.batch_size),
            sink: FailureSink::new(),
            claimed: ClaimedKeys::default(),
            failures: Vec::new(),
            rows: 0,
            failed_rows: 0,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn company_id(&self) -> i64 {
        self.company_id
    }

    pub fn batch_size(&self) -> usize {
        self.writer.batch_size()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Failures collected so far, in input order.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    pub fn stats(&self) -> ImportStats {
        let mut stats = ImportStats {
            rows: self.rows,
            failed_rows: self.failed_rows,
            ..ImportStats::default()
        };
        stats.merge(self.writer.stats());
        stats.merge(self.sink.stats());
        stats
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            run_id: self.run_id,
            company_id: self.company_id,
            state: self.state,
            stats: self.stats(),
        }
    }

    /// Import `rows` in order.
    ///
    /// Validation failures never stop the run. A store error does: the run
    /// moves to [`RunState::Aborted`] and the error is returned, while the
    /// failures collected up to that point stay available.
    pub async fn run<I>(&mut self, rows: I) -> Result<ImportSummary, ImportError>
    where
        I: IntoIterator<Item = Row>,
    {
        if self.state != RunState::Idle {
            return Err(ImportError::InvalidState(self.state));
        }
        if !self.store.company_exists(self.company_id).await? {
            return Err(ImportError::UnknownCompany(self.company_id));
        }

        self.state = RunState::Running;
        log::info!(
            "import {}: started for company {} (batch size {})",
            self.run_id,
            self.company_id,
            self.writer.batch_size()
        );

        if let Err(err) = self.process_all(rows).await {
            self.state = RunState::Aborted;
            log::error!(
                "import {}: aborted after {} rows: {}",
                self.run_id,
                self.rows,
                err
            );
            return Err(err);
        }

        self.state = RunState::Completed;
        let summary = self.summary();
        log::info!(
            "import {}: completed, {} rows, {} users created in {} batches, {} rows failed",
            self.run_id,
            summary.stats.rows,
            summary.stats.users_created,
            summary.stats.batches,
            summary.stats.failed_rows
        );
        if summary.stats.failed_rows > 0 {
            log::warn!(
                "import {}: {} rows failed validation ({} new failed entries)",
                self.run_id,
                summary.stats.failed_rows,
                summary.stats.failures_recorded
            );
        }

        Ok(summary)
    }

    async fn process_all<I>(&mut self, rows: I) -> Result<(), ImportError>
    where
        I: IntoIterator<Item = Row>,
    {
        for (index, row) in rows.into_iter().enumerate() {
            self.process_row(index + 1, row).await?;
        }
        self.writer.flush(&self.store).await?;
        Ok(())
    }

    async fn process_row(&mut self, row_id: usize, row: Row) -> Result<(), ImportError> {
        self.rows += 1;

        match self.validator.validate(&row, &self.store, &self.claimed).await? {
            Validation::Valid(user) => {
                let username = self
                    .usernames
                    .generate(&user.firstname, &user.lastname, &self.store, &mut self.claimed)
                    .await?;
                self.claimed.claim_email(&user.email);
                log::trace!("row {}: accepted as {}", row_id, username);
                self.writer
                    .push(&self.store, row_id, user.with_username(username))
                    .await?;
            }
            Validation::Invalid(errors) => {
                let failures: Vec<Failure> = errors
                    .into_iter()
                    .map(|error| Failure::new(row_id, error, &row))
                    .collect();
                self.sink.record(&self.store, &failures).await?;
                self.failed_rows += 1;
                self.failures.extend(failures);
            }
        }

        Ok(())
    }
}
