//! Dated row storage shared by every dataset.
//!
//! A [TimeSeries] is the raw, append-only storage for one instrument. Windowing, calendar
//! synchronization and access control live a level up in [crate::window].

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::DateTime;

/// Field layout of a dataset, fixed at construction.
///
/// Every row of a series must match the schema arity; mismatches are rejected at the series
/// boundary, not deep inside storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Schema of a calendar: dates only, no value fields.
    pub fn dates_only(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}

/// One dated observation. Absent fields are `None`, meaning "no data that day".
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub date: DateTime,
    pub values: Vec<Option<f64>>,
}

impl Row {
    pub fn new(date: impl Into<DateTime>, values: Vec<Option<f64>>) -> Self {
        Self {
            date: date.into(),
            values,
        }
    }

    /// A row with every field null, used by calendar synchronization as filler.
    pub fn empty(date: DateTime, arity: usize) -> Self {
        Self {
            date,
            values: vec![None; arity],
        }
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

/// Append-only sequence of [Row] in strictly ascending date order, sharing one [Schema].
#[derive(Clone, Debug)]
pub struct TimeSeries {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl TimeSeries {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            rows: Vec::new(),
        }
    }

    pub(crate) fn from_parts(schema: Arc<Schema>, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Row> {
        self.rows.get(pos)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first_date(&self) -> Option<DateTime> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<DateTime> {
        self.rows.last().map(|r| r.date)
    }

    /// Append one row, continuing the existing ordering.
    pub fn push(&mut self, row: Row) -> Result<()> {
        if row.values.len() != self.schema.arity() {
            return Err(Error::Configuration(format!(
                "row arity {} does not match schema {} (arity {})",
                row.values.len(),
                self.schema.name(),
                self.schema.arity()
            )));
        }
        if let Some(last) = self.last_date() {
            if row.date <= last {
                return Err(Error::Configuration(format!(
                    "row on {} does not continue series {} ending {}",
                    row.date,
                    self.schema.name(),
                    last
                )));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Bulk append. Rows must continue the existing ordering.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = Row>) -> Result<()> {
        for row in rows {
            self.push(row)?;
        }
        Ok(())
    }
}
