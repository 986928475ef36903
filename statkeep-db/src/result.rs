//! Typed read-only views over query result rows.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    /// The column is not part of the row, or the stored cell is NULL.
    #[error("Column '{column}' is not present in the result row")]
    MissingColumn { column: String },
    /// The stored string does not parse as the requested type.
    #[error("Column '{column}' holds '{value}', which is not {wanted}")]
    TypeConversion {
        column: String,
        value: String,
        wanted: &'static str,
    },
}

/// One materialized result row: column name (case-preserved, as returned
/// by the driver) mapped to its value as a string. Typed accessors parse
/// on demand; the row itself never changes once produced.
#[derive(Debug, Clone)]
pub struct QueryResult {
    columns: HashMap<String, Option<String>>,
}

impl QueryResult {
    pub fn new(columns: HashMap<String, Option<String>>) -> Self {
        Self { columns }
    }

    pub fn contains(&self, column: &str) -> bool {
        matches!(self.columns.get(column), Some(Some(_)))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn get_string(&self, column: &str) -> Result<String, RowError> {
        self.raw(column).map(str::to_owned)
    }

    pub fn get_int(&self, column: &str) -> Result<i32, RowError> {
        self.parse(column, "an integer")
    }

    pub fn get_long(&self, column: &str) -> Result<i64, RowError> {
        self.parse(column, "an integer")
    }

    pub fn get_double(&self, column: &str) -> Result<f64, RowError> {
        self.parse(column, "a number")
    }

    /// Booleans are stored as integers; `0`/`1` are the canonical
    /// spellings, `true`/`false` are accepted for hand-written rows.
    pub fn get_bool(&self, column: &str) -> Result<bool, RowError> {
        match self.raw(column)? {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(RowError::TypeConversion {
                column: column.to_owned(),
                value: other.to_owned(),
                wanted: "a boolean",
            }),
        }
    }

    fn raw(&self, column: &str) -> Result<&str, RowError> {
        // A NULL cell carries no value to convert; it reads as absent.
        match self.columns.get(column) {
            Some(Some(value)) => Ok(value),
            _ => Err(RowError::MissingColumn {
                column: column.to_owned(),
            }),
        }
    }

    fn parse<T: std::str::FromStr>(
        &self,
        column: &str,
        wanted: &'static str,
    ) -> Result<T, RowError> {
        let raw = self.raw(column)?;
        raw.parse().map_err(|_| RowError::TypeConversion {
            column: column.to_owned(),
            value: raw.to_owned(),
            wanted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Option<&str>)]) -> QueryResult {
        QueryResult::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_owned)))
                .collect(),
        )
    }

    #[test]
    fn typed_accessors_parse_on_demand() {
        let row = row(&[
            ("logins", Some("7")),
            ("session_start", Some("1000")),
            ("foot", Some("12.5")),
            ("online", Some("1")),
            ("name", Some("dakota")),
        ]);
        assert_eq!(row.get_int("logins").unwrap(), 7);
        assert_eq!(row.get_long("session_start").unwrap(), 1000);
        assert_eq!(row.get_double("foot").unwrap(), 12.5);
        assert!(row.get_bool("online").unwrap());
        assert_eq!(row.get_string("name").unwrap(), "dakota");
    }

    #[test]
    fn missing_and_null_columns_read_as_absent() {
        let row = row(&[("online", None)]);
        assert_eq!(
            row.get_int("nope"),
            Err(RowError::MissingColumn {
                column: "nope".into()
            })
        );
        assert_eq!(
            row.get_bool("online"),
            Err(RowError::MissingColumn {
                column: "online".into()
            })
        );
        assert!(!row.contains("online"));
    }

    #[test]
    fn conversion_failures_name_the_offender() {
        let row = row(&[("logins", Some("lots"))]);
        let err = row.get_int("logins").unwrap_err();
        assert_eq!(
            err,
            RowError::TypeConversion {
                column: "logins".into(),
                value: "lots".into(),
                wanted: "an integer",
            }
        );
        assert!(row.get_bool("logins").is_err());
        // The string accessor still works; nothing is coerced silently.
        assert_eq!(row.get_string("logins").unwrap(), "lots");
    }
}
