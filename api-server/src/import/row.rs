//! Row-level data flowing through the import pipeline.

use std::collections::HashMap;

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{NewFailedEntry, NewUser};

pub const FIRSTNAME: &str = "firstname";
pub const LASTNAME: &str = "lastname";
pub const SEX: &str = "sex";
pub const COUNTRY: &str = "country";
pub const EMAIL: &str = "email";

/// Header names every import source must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [FIRSTNAME, LASTNAME, SEX, COUNTRY, EMAIL];

/// One spreadsheet record as produced by the row source: column name to raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Row(HashMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    /// Raw value for `column`, or `None` when absent or blank.
    pub fn non_blank(&self, column: &str) -> Option<String> {
        self.get(column)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        )
    }
}

/// A row that passed validation, with trimmed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUser {
    pub firstname: String,
    pub lastname: String,
    pub sex: String,
    pub country: String,
    pub email: String,
}

impl ValidatedUser {
    pub fn with_username(self, username: String) -> NewUser {
        NewUser {
            username,
            firstname: self.firstname,
            lastname: self.lastname,
            sex: self.sex,
            country: self.country,
            email: self.email,
        }
    }
}

/// First failing constraint message for one field of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Failure descriptor collected for a row that did not validate.
///
/// `row` is the 1-based position of the row in the input sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Failure {
    pub row: usize,
    pub attribute: String,
    pub message: String,
    pub values: Row,
}

impl Failure {
    pub fn new(row: usize, error: FieldError, values: &Row) -> Self {
        Self {
            row,
            attribute: error.field.to_string(),
            message: error.message,
            values: values.clone(),
        }
    }

    /// Content written to the failed entries store. Blank values become null.
    pub fn to_entry(&self) -> NewFailedEntry {
        NewFailedEntry {
            row_id: i64::try_from(self.row).unwrap_or(i64::MAX),
            attribute: self.attribute.clone(),
            error_msg: self.message.clone(),
            firstname: self.values.non_blank(FIRSTNAME),
            lastname: self.values.non_blank(LASTNAME),
            sex: self.values.non_blank(SEX),
            email: self.values.non_blank(EMAIL),
            country: self.values.non_blank(COUNTRY),
        }
    }
}
