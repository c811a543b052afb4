use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Reference Data =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Country {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ===== Users =====

/// A persisted user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub sex: String,
    pub country: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A validated user with its generated username, ready for bulk insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub sex: String,
    pub country: String,
    pub email: String,
}

// ===== Failed Entries =====

/// Persisted record of one validation failure.
///
/// Deduplicated by content: two failures with the same row id, attribute,
/// message and raw values map to the same stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct FailedEntry {
    pub id: i64,
    pub row_id: i64,
    pub attribute: String,
    pub error_msg: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub sex: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Content of a failed entry before it is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewFailedEntry {
    pub row_id: i64,
    pub attribute: String,
    pub error_msg: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub sex: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
}

impl NewFailedEntry {
    /// Whether a stored entry carries exactly this content.
    pub fn matches(&self, entry: &FailedEntry) -> bool {
        self.row_id == entry.row_id
            && self.attribute == entry.attribute
            && self.error_msg == entry.error_msg
            && self.firstname == entry.firstname
            && self.lastname == entry.lastname
            && self.sex == entry.sex
            && self.email == entry.email
            && self.country == entry.country
    }
}

// ===== Response Envelopes =====

/// Standard envelope for list and object responses.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Paginated envelope used by listing endpoints.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PageResponse<T> {
    pub data: T,
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}
