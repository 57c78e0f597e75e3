use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// A single output value. Mart floats are already rounded when they land here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Cell {
        Cell::Text(value.into())
    }

    pub fn opt_text(value: Option<&str>) -> Cell {
        value.map(Cell::text).unwrap_or(Cell::Null)
    }

    pub fn count(value: usize) -> Cell {
        Cell::Int(value as i64)
    }

    /// Unrounded value, written with enough digits to read back exactly.
    pub fn exact(value: f64) -> Cell {
        if value.is_finite() {
            Cell::Float(value)
        } else {
            Cell::Null
        }
    }

    /// Round to `places` decimals; missing or non-finite values become null.
    pub fn decimal(value: Option<f64>, places: u32) -> Cell {
        match value {
            Some(v) if v.is_finite() => Cell::Float(round_to(v, places)),
            _ => Cell::Null,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    fn to_field(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => {
                let mut s = f.to_string();
                if !s.contains('.') {
                    s.push_str(".0");
                }
                s
            }
            Cell::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Cell::Null => String::new(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Null => Value::Null,
        }
    }
}

/// Half-away-from-zero rounding to a fixed number of decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// An ordered, fully computed mart. Built fresh each run and never mutated
/// after construction apart from result capping.
#[derive(Debug, Clone, PartialEq)]
pub struct MartTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl MartTable {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: Vec<S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width for {}", self.name);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// First row whose `key_column` equals `key` as text
    pub fn find(&self, key_column: &str, key: &str) -> Option<&[Cell]> {
        let idx = self.column_index(key_column)?;
        self.rows
            .iter()
            .find(|r| match &r[idx] {
                Cell::Text(s) => s == key,
                Cell::Int(i) => i.to_string() == key,
                _ => false,
            })
            .map(|r| r.as_slice())
    }

    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }

    /// Serialize as CSV with a header row. Output depends only on the table
    /// contents, so identical tables give identical bytes.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::to_field))?;
        }
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| crate::error::MartError::Io(e.into_error()))
    }

    /// Flat key/value records in row order, for the query facade
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.clone(), v.to_json()))
                    .collect()
            })
            .collect()
    }
}
