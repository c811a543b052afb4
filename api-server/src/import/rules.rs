//! Declarative validation rules for imported user rows.
//!
//! Rules are plain data: a field name plus an ordered list of constraints.
//! [`RowValidator`](crate::import::RowValidator) interprets the table, so new
//! fields or constraints are added here without touching the validator.

use crate::import::row::{COUNTRY, EMAIL, FIRSTNAME, LASTNAME, SEX};

/// Reference tables a value can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    CountryCode,
}

/// Persisted columns that must stay unique across users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueKey {
    UserEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Required,
    /// Maximum length in characters.
    MaxLength(usize),
    /// Exact length in characters.
    Length(usize),
    /// Regular expression the whole value must match.
    Pattern(&'static str),
    Email,
    Exists(Reference),
    Unique(UniqueKey),
}

impl Constraint {
    /// Message reported when the constraint fails.
    pub fn message(&self, field: &str) -> String {
        match self {
            Constraint::Required => format!("The {field} field is required."),
            Constraint::MaxLength(max) => {
                format!("The {field} may not be greater than {max} characters.")
            }
            Constraint::Length(len) => format!("The {field} must be {len} characters."),
            Constraint::Pattern(_) => format!("The {field} format is invalid."),
            Constraint::Email => format!("The {field} must be a valid email address."),
            Constraint::Exists(_) => format!("The selected {field} is invalid."),
            Constraint::Unique(_) => format!("The {field} has already been taken."),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub constraints: &'static [Constraint],
}

/// Rule set applied to every imported user row, in reporting order.
pub const USER_RULES: &[FieldRule] = &[
    FieldRule {
        field: FIRSTNAME,
        constraints: &[Constraint::Required, Constraint::MaxLength(255)],
    },
    FieldRule {
        field: LASTNAME,
        constraints: &[Constraint::Required, Constraint::MaxLength(255)],
    },
    FieldRule {
        field: SEX,
        constraints: &[
            Constraint::Required,
            Constraint::Length(1),
            Constraint::Pattern(r"^[MF]$"),
        ],
    },
    FieldRule {
        field: COUNTRY,
        constraints: &[
            Constraint::Required,
            Constraint::Exists(Reference::CountryCode),
        ],
    },
    FieldRule {
        field: EMAIL,
        constraints: &[
            Constraint::Required,
            Constraint::Email,
            Constraint::MaxLength(255),
            Constraint::Unique(UniqueKey::UserEmail),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::row::REQUIRED_COLUMNS;

    #[test]
    fn every_required_column_has_a_rule() {
        for column in REQUIRED_COLUMNS {
            let rule = USER_RULES
                .iter()
                .find(|rule| rule.field == column)
                .unwrap_or_else(|| panic!("no rule for {column}"));
            assert_eq!(rule.constraints.first(), Some(&Constraint::Required));
        }
    }

    #[test]
    fn messages_name_the_field() {
        assert_eq!(
            Constraint::Unique(UniqueKey::UserEmail).message("email"),
            "The email has already been taken."
        );
        assert_eq!(
            Constraint::MaxLength(255).message("lastname"),
            "The lastname may not be greater than 255 characters."
        );
    }
}
