//! Bulk user import engine.
//!
//! Turns an ordered sequence of spreadsheet rows into user records linked to
//! one company, capturing every row that fails validation:
//!
//! 1. **Validation** (`rules`, `validator`) - Applies the declarative rule table to each row
//! 2. **Usernames** (`username`) - Derives a collision-free `{firstname}{lastname}{n}` username
//! 3. **Batching** (`batch`) - Buffers users and bulk-inserts them, then links each to the company
//! 4. **Failures** (`failures`) - Writes failed rows to the failed entries store, deduplicated by content
//! 5. **Coordination** (`coordinator`) - Sequences the above for one run and aggregates the results
//!
//! Row sources (`csv_rows`) and persistence (`crate::store`) sit outside the engine.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use roster_api::import::{ImportConfig, ImportCoordinator};
//! use roster_api::store::PgImportStore;
//!
//! let store = PgImportStore::new(pool);
//! let mut importer = ImportCoordinator::new(store, company_id, ImportConfig::from_env())?;
//! let summary = importer.run(rows).await?;
//!
//! for failure in importer.failures() {
//!     println!("row {}: {}", failure.row, failure.message);
//! }
//! ```

pub mod batch;
pub mod config;
pub mod coordinator;
pub mod csv_rows;
pub mod error;
pub mod failures;
pub mod row;
pub mod rules;
pub mod stats;
pub mod username;
pub mod validator;

pub use batch::BatchWriter;
pub use config::ImportConfig;
pub use coordinator::{ImportCoordinator, ImportSummary, RunState};
pub use csv_rows::{CsvRowsError, read_csv_rows};
pub use error::{ImportError, StoreError, StoreResult};
pub use failures::FailureSink;
pub use row::{Failure, Row};
pub use stats::ImportStats;
pub use username::UsernameGenerator;
pub use validator::RowValidator;
