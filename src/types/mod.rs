//! Base types shared across the crate.

use std::collections::HashMap;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use time::{format_description, Date, OffsetDateTime};

use crate::error::{Error, Result};

///[DateTime] is a wrapper around the epoch time as i64. This type also wraps the time package
///which offers the datetime functionality required at the ingestion boundary.
//The internal representation with the time package should remain hidden from clients. Whilst this
//results in some duplication of the API, this retains the option to get rid of the dependency on
//time or change individual functions later.
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Copy, Ord, Serialize, Deserialize)]
pub struct DateTime(i64);

impl DateTime {
    /// Parse a date string with a `time` format description, for example `[year]-[month]-[day]`.
    pub fn from_date_string(val: &str, date_fmt: &str) -> Result<Self> {
        let format = format_description::parse(date_fmt)
            .map_err(|e| Error::Configuration(format!("bad date format {date_fmt}: {e}")))?;
        let parsed_date = Date::parse(val, &format)
            .map_err(|e| Error::Configuration(format!("bad date {val}: {e}")))?;
        Ok(Self::from(
            parsed_date.midnight().assume_utc().unix_timestamp(),
        ))
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Ok(date) = OffsetDateTime::from_unix_timestamp(self.0) {
            write!(f, "{}", date.date())
        } else {
            write!(f, "@{}", self.0)
        }
    }
}

impl Default for DateTime {
    fn default() -> Self {
        DateTime(0)
    }
}

impl Deref for DateTime {
    type Target = i64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime> for i64 {
    fn from(v: DateTime) -> Self {
        v.0
    }
}

impl From<i64> for DateTime {
    fn from(v: i64) -> Self {
        DateTime(v)
    }
}

/// Parameter map handed to alpha constructors.
pub type Params = HashMap<String, f64>;

///Allocation of the asset for one simulated day in terms of signed weight per instrument.
///
///Created once per day by the alpha, immutable afterwards except for the single [normalize]
///pass run by the simulator.
///
///[normalize]: Position::normalize
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Position {
    date: DateTime,
    weights: HashMap<String, f64>,
}

impl Position {
    pub fn new(date: DateTime) -> Self {
        Self {
            date,
            weights: HashMap::new(),
        }
    }

    pub fn date(&self) -> DateTime {
        self.date
    }

    pub fn insert(&mut self, instrument: impl AsRef<str>, weight: f64) {
        self.weights.insert(instrument.as_ref().to_string(), weight);
    }

    /// Weight held in `instrument`, zero when the position does not mention it.
    pub fn weight(&self, instrument: &str) -> f64 {
        self.weights.get(instrument).copied().unwrap_or(0.0)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &String> {
        self.weights.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Scale weights so that the sum of absolute values is 1. A zero-sum position cannot be
    /// scaled and fails with [Error::InvalidPosition].
    pub fn normalize(&mut self) -> Result<()> {
        let sum: f64 = self.weights.values().map(|w| w.abs()).sum();
        if sum == 0.0 {
            return Err(Error::InvalidPosition {
                date: self.date,
                reason: "zero position".to_string(),
            });
        }
        for weight in self.weights.values_mut() {
            *weight /= sum;
        }
        Ok(())
    }

    /// Check that every instrument in the position appears in `tradable`.
    pub fn is_tradable(&self, tradable: &[String]) -> bool {
        self.weights
            .keys()
            .all(|instrument| tradable.iter().any(|t| t == instrument))
    }

    /// Encode the position as a vector ordered by the catalogue instrument table.
    pub fn to_vec(&self, instruments: &[String]) -> Vec<f64> {
        instruments
            .iter()
            .map(|instrument| self.weight(instrument))
            .collect()
    }
}
