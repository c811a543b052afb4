//! CSV row source.
//!
//! Reads a CSV document with a heading row into ordered [`Row`]s. Headers are
//! normalised the way spreadsheet heading rows usually are: trimmed,
//! lower-cased, inner whitespace replaced by `_`.

use std::io::Read;

use thiserror::Error;

use crate::import::row::{REQUIRED_COLUMNS, Row};

#[derive(Debug, Error)]
pub enum CsvRowsError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Normalise a heading cell into a column name.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Parse every data row of `reader`, keeping file order.
///
/// Short rows are allowed; absent cells are left out of the row. Cells past
/// the last header are ignored.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<Row>, CsvRowsError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv.headers()?.iter().map(normalize_header).collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CsvRowsError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    log::debug!("read {} rows from csv ({} columns)", rows.len(), headers.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_spreadsheet_headings() {
        assert_eq!(normalize_header("  First Name "), "first_name");
        assert_eq!(normalize_header("\u{feff}FirstName"), "firstname");
        assert_eq!(normalize_header("EMAIL"), "email");
    }

    #[test]
    fn reads_rows_in_file_order() {
        let data = "Firstname,Lastname,Sex,Country,Email\n\
                    Ann,Lee,F,US,ann@x.com\n\
                    Bob,Stone,M,DE,bob@x.com\n";

        let rows = read_csv_rows(data.as_bytes()).expect("valid csv");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("firstname"), Some("Ann"));
        assert_eq!(rows[1].get("country"), Some("DE"));
    }

    #[test]
    fn short_rows_leave_cells_absent() {
        let data = "firstname,lastname,sex,country,email\nAnn,Lee\n";

        let rows = read_csv_rows(data.as_bytes()).expect("valid csv");

        assert_eq!(rows[0].get("lastname"), Some("Lee"));
        assert_eq!(rows[0].get("email"), None);
    }

    #[test]
    fn rejects_missing_columns() {
        let data = "firstname,lastname,email\nAnn,Lee,ann@x.com\n";

        match read_csv_rows(data.as_bytes()) {
            Err(CsvRowsError::MissingColumns(columns)) => {
                assert_eq!(columns, vec!["sex".to_string(), "country".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
