//! Data ingestion: CSV directories for real data, random generation for tests and benchmarks.
//!
//! The on-disk layout of a region is one directory per dataset holding one CSV per instrument,
//! plus a `workdays.csv` listing the trading days:
//!
//! ```text
//! region/
//!   workdays.csv
//!   currency_price_tw/
//!     USD.csv        date,buy,sell with one row per day, empty cells for missing quotes
//!     EUR.csv
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::error::{Error, Result};
use crate::series::{Row, Schema, TimeSeries};
use crate::store::{DataStore, RegionData};
use crate::types::DateTime;
use crate::window::{Calendar, TimeWindow};

const DATE_FORMAT: &str = "[year]-[month]-[day]";
const SECONDS_PER_DAY: i64 = 86_400;

/// Load one instrument series. The header names the value fields; the first column must be the
/// date.
pub fn load_series_csv(path: &Path, dataset: &str) -> Result<TimeSeries> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Configuration(format!("cannot open {}: {e}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| Error::Configuration(format!("bad header in {}: {e}", path.display())))?
        .clone();
    if headers.get(0) != Some("date") {
        return Err(Error::Configuration(format!(
            "{} must lead with a date column",
            path.display()
        )));
    }
    let fields: Vec<String> = headers.iter().skip(1).map(|f| f.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| Error::Configuration(format!("bad record in {}: {e}", path.display())))?;
        let date = DateTime::from_date_string(record.get(0).unwrap_or_default(), DATE_FORMAT)?;
        let mut values = Vec::with_capacity(fields.len());
        for cell in record.iter().skip(1) {
            if cell.is_empty() {
                values.push(None);
            } else {
                let value = cell.parse::<f64>().map_err(|e| {
                    Error::Configuration(format!("bad value {cell} in {}: {e}", path.display()))
                })?;
                values.push(Some(value));
            }
        }
        rows.push(Row::new(date, values));
    }
    rows.sort_by_key(|row| row.date);

    let mut series = TimeSeries::new(Schema::new(dataset, fields));
    series.extend(rows)?;
    Ok(series)
}

/// Load a dataset directory, one CSV per instrument, the file stem naming the instrument.
pub fn load_dataset_csv(dir: &Path, dataset: &str) -> Result<HashMap<String, TimeSeries>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", dir.display())))?;
    let mut data = HashMap::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", dir.display())))?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let instrument = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Configuration(format!("unusable file name {}", path.display()))
            })?
            .to_string();
        data.insert(instrument, load_series_csv(&path, dataset)?);
    }
    if data.is_empty() {
        return Err(Error::Configuration(format!(
            "dataset directory {} holds no CSV files",
            dir.display()
        )));
    }
    Ok(data)
}

/// Load the trading-day calendar: a single `date` column.
pub fn load_workdays_csv(path: &Path, region: &str) -> Result<Calendar> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Configuration(format!("cannot open {}: {e}", path.display())))?;
    let mut dates = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| Error::Configuration(format!("bad record in {}: {e}", path.display())))?;
        dates.push(DateTime::from_date_string(
            record.get(0).unwrap_or_default(),
            DATE_FORMAT,
        )?);
    }
    let dates: Vec<DateTime> = dates.into_iter().sorted().dedup().collect();
    TimeWindow::from_dates(format!("workdays_{region}"), dates)
}

/// Load a whole region directory and synchronize every dataset against its calendar.
pub fn load_region_csv(root: &Path, region: &str, price_dataset: &str) -> Result<RegionData> {
    let calendar = load_workdays_csv(&root.join("workdays.csv"), region)?;

    let mut price = None;
    let mut others = HashMap::new();
    let entries = fs::read_dir(root)
        .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", root.display())))?;
    for entry in entries {
        let path = entry
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", root.display())))?
            .path();
        if !path.is_dir() {
            continue;
        }
        let dataset = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Configuration(format!("unusable directory name {}", path.display()))
            })?
            .to_string();
        let store = DataStore::new(&dataset, load_dataset_csv(&path, &dataset)?);
        if dataset == price_dataset {
            price = Some(store);
        } else {
            others.insert(dataset, store);
        }
    }

    let price = price.ok_or_else(|| {
        Error::Configuration(format!(
            "region {} is missing its price dataset {price_dataset}",
            root.display()
        ))
    })?;
    let region_data = RegionData::new(calendar, price, others);
    region_data.synchronize()?;
    Ok(region_data)
}

/// Generate a region of random quotes for tests, benchmarks and demos.
///
/// Every instrument random-walks inside a narrow band with a fixed half-spread, except the base
/// instrument which stays quoted at 1.0 so liquidation always has a price.
pub fn random_region(
    days: i64,
    instruments: &[&str],
    base_instrument: &str,
    price_dataset: &str,
) -> Result<RegionData> {
    let price_dist = Uniform::new(28.0, 32.0);
    let mut rng = rand::thread_rng();

    let dates: Vec<DateTime> = (1..=days).map(|d| DateTime::from(d * SECONDS_PER_DAY)).collect();
    let calendar = TimeWindow::from_dates("workdays_random", dates)?;

    let mut data = HashMap::new();
    for instrument in instruments {
        let mut series = TimeSeries::new(Schema::new(
            price_dataset,
            vec!["buy".to_string(), "sell".to_string()],
        ));
        let mut mid: f64 = price_dist.sample(&mut rng);
        for day in 1..=days {
            let (buy, sell) = if *instrument == base_instrument {
                (1.0, 1.0)
            } else {
                mid = (mid + rng.gen_range(-0.5..0.5)).clamp(5.0, 100.0);
                (mid - 0.01, mid + 0.01)
            };
            series.push(Row::new(
                day * SECONDS_PER_DAY,
                vec![Some(buy), Some(sell)],
            ))?;
        }
        data.insert(instrument.to_string(), series);
    }

    let region = RegionData::new(calendar, DataStore::new(price_dataset, data), HashMap::new());
    region.synchronize()?;
    Ok(region)
}
