//! Persistence collaborator consumed by the import engine.
//!
//! The engine only needs existence checks, one bulk insert per batch that
//! also links the new users to their company, and first-or-create for failed
//! entries. Two backends
//! implement it:
//!
//! - [`PgImportStore`] writes to PostgreSQL and is used by the API and CLI.
//! - [`MemoryImportStore`] keeps everything in process; tests and dry runs use it.

pub mod memory;
pub mod postgres;

pub use memory::MemoryImportStore;
pub use postgres::PgImportStore;

use crate::import::StoreResult;
use crate::models::{FailedEntry, NewFailedEntry, NewUser, User};

#[rocket::async_trait]
pub trait ImportStore: Send + Sync {
    async fn company_exists(&self, company_id: i64) -> StoreResult<bool>;

    async fn country_exists(&self, code: &str) -> StoreResult<bool>;

    /// Case-insensitive lookup against persisted users.
    async fn email_exists(&self, email: &str) -> StoreResult<bool>;

    async fn username_exists(&self, username: &str) -> StoreResult<bool>;

    /// Insert all users in one operation and sync each one's company links
    /// to exactly `company_id`, returning the users in input order.
    ///
    /// Users and links commit together: either every user is created and
    /// linked, or nothing is written.
    async fn insert_users(&self, users: &[NewUser], company_id: i64) -> StoreResult<Vec<User>>;

    /// Return the stored entry with identical content, creating it if needed.
    ///
    /// The flag is `true` when a new entry was written.
    async fn first_or_create_failed_entry(
        &self,
        entry: &NewFailedEntry,
    ) -> StoreResult<(FailedEntry, bool)>;
}
