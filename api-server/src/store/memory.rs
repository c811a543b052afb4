use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::import::{StoreError, StoreResult};
use crate::models::{FailedEntry, NewFailedEntry, NewUser, User};
use crate::store::ImportStore;

/// Width of the VARCHAR columns of the users table.
const COLUMN_MAX_LENGTH: usize = 255;

#[derive(Debug, Default)]
struct MemoryState {
    countries: HashSet<String>,
    companies: HashSet<i64>,
    users: Vec<User>,
    links: BTreeSet<(i64, i64)>,
    failed_entries: Vec<FailedEntry>,
    insert_batches: Vec<usize>,
    country_lookups: usize,
    fail_next_insert: Option<String>,
}

/// In-process store with the same uniqueness rules as the database schema.
///
/// Clones share state, so a test can hand one clone to the coordinator and
/// inspect another afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryImportStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryImportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_countries<I, C>(self, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.state
            .lock()
            .countries
            .extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn with_company(self, company_id: i64) -> Self {
        self.state.lock().companies.insert(company_id);
        self
    }

    /// Seed a pre-existing user, bypassing the insert counters.
    pub fn with_user(self, user: NewUser) -> Self {
        {
            let mut state = self.state.lock();
            let id = state.users.len() as i64 + 1;
            state.users.push(stored_user(id, user));
        }
        self
    }

    /// Make the next `insert_users` call fail with `reason`.
    pub fn fail_next_insert(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_insert = Some(reason.into());
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().users.clone()
    }

    /// `(user_id, company_id)` pairs, ordered.
    pub fn links(&self) -> Vec<(i64, i64)> {
        self.state.lock().links.iter().copied().collect()
    }

    pub fn failed_entries(&self) -> Vec<FailedEntry> {
        self.state.lock().failed_entries.clone()
    }

    /// Size of every bulk insert received, in call order.
    pub fn insert_batches(&self) -> Vec<usize> {
        self.state.lock().insert_batches.clone()
    }

    pub fn country_lookups(&self) -> usize {
        self.state.lock().country_lookups
    }
}

fn stored_user(id: i64, user: NewUser) -> User {
    User {
        id,
        username: user.username,
        firstname: user.firstname,
        lastname: user.lastname,
        sex: user.sex,
        country: user.country,
        email: user.email,
        created_at: Some(Utc::now()),
    }
}

#[rocket::async_trait]
impl ImportStore for MemoryImportStore {
    async fn company_exists(&self, company_id: i64) -> StoreResult<bool> {
        Ok(self.state.lock().companies.contains(&company_id))
    }

    async fn country_exists(&self, code: &str) -> StoreResult<bool> {
        let mut state = self.state.lock();
        state.country_lookups += 1;
        Ok(state.countries.contains(code))
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let email = email.to_lowercase();
        Ok(self
            .state
            .lock()
            .users
            .iter()
            .any(|user| user.email.to_lowercase() == email))
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .users
            .iter()
            .any(|user| user.username == username))
    }

    async fn insert_users(&self, users: &[NewUser], company_id: i64) -> StoreResult<Vec<User>> {
        let mut state = self.state.lock();
        state.insert_batches.push(users.len());

        if let Some(reason) = state.fail_next_insert.take() {
            return Err(StoreError::Unavailable(reason));
        }
        if !users.is_empty() && !state.companies.contains(&company_id) {
            return Err(StoreError::Conflict {
                field: "company_id",
                value: company_id.to_string(),
            });
        }

        let mut usernames: HashSet<&str> = state.users.iter().map(|u| u.username.as_str()).collect();
        let mut emails: HashSet<String> = state.users.iter().map(|u| u.email.to_lowercase()).collect();
        for user in users {
            let columns = [
                ("username", &user.username),
                ("firstname", &user.firstname),
                ("lastname", &user.lastname),
                ("email", &user.email),
            ];
            if let Some(&(field, _)) = columns
                .iter()
                .find(|(_, value)| value.chars().count() > COLUMN_MAX_LENGTH)
            {
                return Err(StoreError::ValueTooLong {
                    field,
                    max: COLUMN_MAX_LENGTH,
                });
            }
            if !usernames.insert(&user.username) {
                return Err(StoreError::Conflict {
                    field: "username",
                    value: user.username.clone(),
                });
            }
            if !emails.insert(user.email.to_lowercase()) {
                return Err(StoreError::Conflict {
                    field: "email",
                    value: user.email.clone(),
                });
            }
            if !state.countries.contains(&user.country) {
                return Err(StoreError::Conflict {
                    field: "country",
                    value: user.country.clone(),
                });
            }
        }

        let mut created = Vec::with_capacity(users.len());
        for user in users {
            let id = state.users.len() as i64 + 1;
            let user = stored_user(id, user.clone());
            state.users.push(user.clone());
            state.links.retain(|(linked_user, _)| *linked_user != id);
            state.links.insert((id, company_id));
            created.push(user);
        }
        Ok(created)
    }

    async fn first_or_create_failed_entry(
        &self,
        entry: &NewFailedEntry,
    ) -> StoreResult<(FailedEntry, bool)> {
        let mut state = self.state.lock();
        if let Some(existing) = state.failed_entries.iter().find(|e| entry.matches(e)) {
            return Ok((existing.clone(), false));
        }

        let stored = FailedEntry {
            id: state.failed_entries.len() as i64 + 1,
            row_id: entry.row_id,
            attribute: entry.attribute.clone(),
            error_msg: entry.error_msg.clone(),
            firstname: entry.firstname.clone(),
            lastname: entry.lastname.clone(),
            sex: entry.sex.clone(),
            email: entry.email.clone(),
            country: entry.country.clone(),
            created_at: Some(Utc::now()),
        };
        state.failed_entries.push(stored.clone());
        Ok((stored, true))
    }
}
