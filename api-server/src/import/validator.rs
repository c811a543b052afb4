//! Rule-table driven row validation.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::import::error::{ImportError, StoreResult};
use crate::import::row::{COUNTRY, EMAIL, FIRSTNAME, FieldError, LASTNAME, Row, SEX, ValidatedUser};
use crate::import::rules::{Constraint, FieldRule, Reference, UniqueKey};
use crate::store::ImportStore;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// Unique values claimed by rows earlier in the same run.
///
/// Uniqueness checks consult this alongside the store so rows still sitting
/// in an unflushed batch count as taken.
#[derive(Debug, Default)]
pub struct ClaimedKeys {
    emails: HashSet<String>,
    usernames: HashSet<String>,
}

impl ClaimedKeys {
    pub fn has_email(&self, email: &str) -> bool {
        self.emails.contains(&email.to_lowercase())
    }

    pub fn claim_email(&mut self, email: &str) {
        self.emails.insert(email.to_lowercase());
    }

    pub fn has_username(&self, username: &str) -> bool {
        self.usernames.contains(username)
    }

    pub fn claim_username(&mut self, username: &str) {
        self.usernames.insert(username.to_string());
    }
}

/// Outcome of validating one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(ValidatedUser),
    Invalid(Vec<FieldError>),
}

/// Applies a rule table to rows.
///
/// Constraints for a field run in table order and stop at the first failure,
/// so each failing field contributes exactly one message. Reference lookups
/// are memoised for the lifetime of the validator.
pub struct RowValidator {
    rules: &'static [FieldRule],
    patterns: HashMap<&'static str, Regex>,
    references: HashMap<(Reference, String), bool>,
}

impl RowValidator {
    pub fn new(rules: &'static [FieldRule]) -> Result<Self, ImportError> {
        let mut patterns = HashMap::new();
        for rule in rules {
            for constraint in rule.constraints {
                if let Constraint::Pattern(pattern) = constraint {
                    let regex = Regex::new(pattern).map_err(|source| ImportError::InvalidRule {
                        field: rule.field,
                        source,
                    })?;
                    patterns.insert(*pattern, regex);
                }
            }
        }

        Ok(Self {
            rules,
            patterns,
            references: HashMap::new(),
        })
    }

    pub async fn validate<S>(
        &mut self,
        row: &Row,
        store: &S,
        claimed: &ClaimedKeys,
    ) -> StoreResult<Validation>
    where
        S: ImportStore + ?Sized,
    {
        let mut errors = Vec::new();

        for rule in self.rules {
            let value = row.get(rule.field).map(str::trim).unwrap_or_default();
            for constraint in rule.constraints {
                if !self.check(constraint, value, store, claimed).await? {
                    errors.push(FieldError {
                        field: rule.field,
                        message: constraint.message(rule.field),
                    });
                    break;
                }
            }
        }

        if !errors.is_empty() {
            return Ok(Validation::Invalid(errors));
        }

        let field = |name: &str| row.get(name).map(str::trim).unwrap_or_default().to_string();
        Ok(Validation::Valid(ValidatedUser {
            firstname: field(FIRSTNAME),
            lastname: field(LASTNAME),
            sex: field(SEX),
            country: field(COUNTRY),
            email: field(EMAIL),
        }))
    }

    async fn check<S>(
        &mut self,
        constraint: &Constraint,
        value: &str,
        store: &S,
        claimed: &ClaimedKeys,
    ) -> StoreResult<bool>
    where
        S: ImportStore + ?Sized,
    {
        let passed = match constraint {
            Constraint::Required => !value.is_empty(),
            Constraint::MaxLength(max) => value.chars().count() <= *max,
            Constraint::Length(len) => value.chars().count() == *len,
            Constraint::Pattern(pattern) => self
                .patterns
                .get(pattern)
                .is_some_and(|regex| regex.is_match(value)),
            Constraint::Email => EMAIL_PATTERN.is_match(value),
            Constraint::Exists(reference) => self.reference_exists(*reference, value, store).await?,
            Constraint::Unique(UniqueKey::UserEmail) => {
                !claimed.has_email(value) && !store.email_exists(value).await?
            }
        };
        Ok(passed)
    }

    async fn reference_exists<S>(
        &mut self,
        reference: Reference,
        value: &str,
        store: &S,
    ) -> StoreResult<bool>
    where
        S: ImportStore + ?Sized,
    {
        let key = (reference, value.to_string());
        if let Some(known) = self.references.get(&key) {
            return Ok(*known);
        }

        let exists = match reference {
            Reference::CountryCode => store.country_exists(value).await?,
        };
        self.references.insert(key, exists);
        Ok(exists)
    }
}
