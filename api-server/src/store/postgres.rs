//! PostgreSQL implementation of the import store.
//!
//! Bulk inserts use UNNEST so one batch is one statement; the batch and its
//! company links share a transaction. Failed entries are
//! deduplicated through a SHA-256 digest of their full content, which keeps
//! the unique index small regardless of how long the raw values are.

use std::collections::HashMap;

use rocket_db_pools::sqlx::{self, PgPool, Postgres, Transaction};
use sha2::{Digest, Sha256};

use crate::import::{StoreError, StoreResult};
use crate::models::{FailedEntry, NewFailedEntry, NewUser, User};
use crate::store::ImportStore;

const UNIQUE_VIOLATION: &str = "23505";
const STRING_TOO_LONG: &str = "22001";
const VARCHAR_MAX_LENGTH: usize = 255;

#[derive(Debug, Clone)]
pub struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Digest identifying a failed entry by its full content.
///
/// Each field is length-prefixed and nulls are tagged, so `None` and `""`
/// or shifted values never collide.
pub fn failed_entry_hash(entry: &NewFailedEntry) -> String {
    let mut hasher = Sha256::new();
    let row_id = entry.row_id.to_string();
    let fields = [
        Some(row_id.as_str()),
        Some(entry.attribute.as_str()),
        Some(entry.error_msg.as_str()),
        entry.firstname.as_deref(),
        entry.lastname.as_deref(),
        entry.sex.as_deref(),
        entry.email.as_deref(),
        entry.country.as_deref(),
    ];
    for field in fields {
        match field {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Translate unique violations and overlong values on the users table into
/// [`StoreError`] variants the engine can report.
fn map_user_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(STRING_TOO_LONG) {
            return StoreError::ValueTooLong {
                field: "user",
                max: VARCHAR_MAX_LENGTH,
            };
        }
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let field = match db_err.constraint() {
                Some("users_username_key") => "username",
                Some("users_email_lower_key") => "email",
                _ => "user",
            };
            return StoreError::Conflict {
                field,
                value: db_err.message().to_string(),
            };
        }
    }
    StoreError::Database(err)
}

/// Replace the company links of every user in `user_ids` with `company_id`.
async fn sync_company_links(
    tx: &mut Transaction<'_, Postgres>,
    user_ids: &[i64],
    company_id: i64,
) -> StoreResult<()> {
    sqlx::query("DELETE FROM company_user WHERE user_id = ANY($1)")
        .bind(user_ids)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"INSERT INTO company_user (user_id, company_id)
           SELECT user_id, $2 FROM UNNEST($1::bigint[]) AS t (user_id)"#,
    )
    .bind(user_ids)
    .bind(company_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[rocket::async_trait]
impl ImportStore for PgImportStore {
    async fn company_exists(&self, company_id: i64) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1)",
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn country_exists(&self, code: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM countries WHERE code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_users(&self, users: &[NewUser], company_id: i64) -> StoreResult<Vec<User>> {
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let count = users.len();
        let mut usernames = Vec::with_capacity(count);
        let mut firstnames = Vec::with_capacity(count);
        let mut lastnames = Vec::with_capacity(count);
        let mut sexes = Vec::with_capacity(count);
        let mut countries = Vec::with_capacity(count);
        let mut emails = Vec::with_capacity(count);
        for user in users {
            usernames.push(user.username.as_str());
            firstnames.push(user.firstname.as_str());
            lastnames.push(user.lastname.as_str());
            sexes.push(user.sex.as_str());
            countries.push(user.country.as_str());
            emails.push(user.email.as_str());
        }

        let mut tx = self.pool.begin().await?;

        let inserted: Vec<User> = sqlx::query_as(
            r#"INSERT INTO users (username, firstname, lastname, sex, country, email)
               SELECT username, firstname, lastname, sex, country, email
               FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[])
                    AS t (username, firstname, lastname, sex, country, email)
               RETURNING id, username, firstname, lastname, sex, country, email, created_at"#,
        )
        .bind(&usernames)
        .bind(&firstnames)
        .bind(&lastnames)
        .bind(&sexes)
        .bind(&countries)
        .bind(&emails)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_user_write_error)?;

        log::trace!("bulk inserted {} users", inserted.len());

        // RETURNING order is unspecified; usernames are unique, so use them to
        // restore input order.
        let mut by_username: HashMap<String, User> = inserted
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();
        let mut ordered = Vec::with_capacity(count);
        for user in users {
            match by_username.remove(&user.username) {
                Some(created) => ordered.push(created),
                None => {
                    return Err(StoreError::RowCountMismatch {
                        expected: count,
                        actual: ordered.len() + by_username.len(),
                    });
                }
            }
        }

        let user_ids: Vec<i64> = ordered.iter().map(|user| user.id).collect();
        sync_company_links(&mut tx, &user_ids, company_id).await?;
        tx.commit().await?;

        Ok(ordered)
    }

    async fn first_or_create_failed_entry(
        &self,
        entry: &NewFailedEntry,
    ) -> StoreResult<(FailedEntry, bool)> {
        let hash = failed_entry_hash(entry);

        let created: Option<FailedEntry> = sqlx::query_as(
            r#"INSERT INTO failed_entries_users
                   (row_id, attribute, error_msg, firstname, lastname, sex, email, country, content_hash)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT (content_hash) DO NOTHING
               RETURNING id, row_id, attribute, error_msg, firstname, lastname, sex, email, country, created_at"#,
        )
        .bind(entry.row_id)
        .bind(&entry.attribute)
        .bind(&entry.error_msg)
        .bind(&entry.firstname)
        .bind(&entry.lastname)
        .bind(&entry.sex)
        .bind(&entry.email)
        .bind(&entry.country)
        .bind(&hash)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(entry) = created {
            return Ok((entry, true));
        }

        let existing: FailedEntry = sqlx::query_as(
            r#"SELECT id, row_id, attribute, error_msg, firstname, lastname, sex, email, country, created_at
               FROM failed_entries_users
               WHERE content_hash = $1"#,
        )
        .bind(&hash)
        .fetch_one(&self.pool)
        .await?;

        Ok((existing, false))
    }
}
