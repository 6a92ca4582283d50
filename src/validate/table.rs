//! A trace chunk read back as text columns.
//!
//! Values stay as raw strings until a rule asks for a typed column, so that a
//! missing value is reported as a rule violation while an unparseable one is
//! a read error.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use thiserror::Error;

/// Field contents treated as missing, compared case-insensitively.
const NULL_MARKERS: &[&str] = &["", "nan", "null", "none", "na", "n/a"];

#[derive(Error, Debug)]
pub enum TableError {
    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("no column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: cannot parse {column} value '{value}' as {expected}")]
    Parse {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct TraceTable {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl TraceTable {
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        Self::from_csv(csv::Reader::from_path(path)?)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, TableError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self, TableError> {
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, index, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(row, column)` of every missing value, in row order.
    pub fn nulls(&self) -> Vec<(usize, &str)> {
        let mut found = Vec::new();
        for (row, record) in self.rows.iter().enumerate() {
            for (col, field) in record.iter().enumerate() {
                if is_null(field) {
                    found.push((row, self.headers.get(col).map_or("?", String::as_str)));
                }
            }
        }
        found
    }

    pub fn text(&self, column: &str) -> Result<Vec<&str>, TableError> {
        let col = self.column(column)?;
        Ok(self.rows.iter().map(|r| r.get(col).unwrap_or("").trim()).collect())
    }

    pub fn u64s(&self, column: &str) -> Result<Vec<u64>, TableError> {
        self.parsed(column, "an unsigned integer")
    }

    pub fn f64s(&self, column: &str) -> Result<Vec<f64>, TableError> {
        self.parsed(column, "a number")
    }

    fn parsed<T: std::str::FromStr>(&self, column: &str, expected: &'static str) -> Result<Vec<T>, TableError> {
        self.text(column)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.parse().map_err(|_| TableError::Parse {
                    column: column.to_string(),
                    row,
                    value: value.to_string(),
                    expected,
                })
            })
            .collect()
    }

    fn column(&self, column: &str) -> Result<usize, TableError> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| TableError::MissingColumn(column.to_string()))
    }
}

fn is_null(field: &str) -> bool {
    let field = field.trim();
    NULL_MARKERS.iter().any(|m| field.eq_ignore_ascii_case(m))
}
