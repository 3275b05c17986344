//! Windowed, lookahead-safe views over time series.
//!
//! A [TimeWindow] presents a strategy with exactly the rows it is permitted to see. Reads are
//! addressed by non-positive relative index, with index 0 reserved for the still-unknown next
//! day. All mutation is gated behind an [AccessKey] held by the simulation engine, so a strategy
//! can observe history but can never advance time or see tomorrow's price.
//!
//! Windows are shared handles in the manner of a clock that synchronizes time across components:
//! cheap to clone, safe to hold from several places, with one moving boundary behind the handle.

use std::sync::{Arc, Mutex};

use rand::Rng;

use crate::error::{Error, Result};
use crate::series::{Row, Schema, TimeSeries};
use crate::types::DateTime;

/// Capability token authorizing mutation of windows it has been installed on.
///
/// Minted once per simulation run and never cloned or transferred; holding a reference to the
/// key is what authorizes `advance`/`seek`. Presenting a key to a window that has none
/// installed fails, as does presenting no key to a window that has one.
#[derive(Debug)]
pub struct AccessKey {
    id: u64,
}

impl AccessKey {
    pub fn mint() -> Self {
        Self {
            id: rand::thread_rng().gen(),
        }
    }
}

#[derive(Debug)]
struct WindowInner {
    series: TimeSeries,
    /// Rows strictly before `end` are visible; the row at `end` is the current simulating day.
    end: usize,
    key: Option<u64>,
    calendar: Option<TimeWindow>,
    /// Offset of the synchronized series within the calendar, set by [TimeWindow::synchronize].
    cal_offset: usize,
}

/// A calendar is a window over a dates-only series; it doubles as the authoritative trading-day
/// sequence every other window of a region synchronizes against.
pub type Calendar = TimeWindow;

/// Bounded, moving view of "already happened" rows of one [TimeSeries].
#[derive(Debug)]
pub struct TimeWindow {
    inner: Arc<Mutex<WindowInner>>,
}

impl Clone for TimeWindow {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn check_key(inner: &WindowInner, key: Option<&AccessKey>) -> Result<()> {
    let authorized = match (inner.key, key) {
        (None, None) => true,
        (Some(id), Some(key)) => id == key.id,
        _ => false,
    };
    if authorized {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "missing or mismatched access key for {}",
            inner.series.schema().name()
        )))
    }
}

/// Read one relative index. Shared by [TimeWindow::get] and [TimeWindow::range] so a range read
/// takes the window lock once.
fn read(inner: &WindowInner, index: i64) -> Result<Row> {
    if index >= 0 {
        return Err(Error::OutOfRange(format!(
            "index {index} is not strictly in the past"
        )));
    }
    let pos = inner.end as i64 + index;
    if pos >= 0 {
        // Always in range: pos < end <= series len.
        return Ok(inner.series.rows()[pos as usize].clone());
    }
    if let Some(calendar) = &inner.calendar {
        let cal_pos = inner.cal_offset as i64 + pos;
        if cal_pos >= 0 {
            if let Some(date) = calendar.date_at(cal_pos as usize) {
                return Ok(Row::empty(date, inner.series.schema().arity()));
            }
        }
    }
    Err(Error::OutOfRange(format!(
        "index {index} precedes the calendar span"
    )))
}

impl TimeWindow {
    /// Wrap a raw series. The boundary starts at the end of the series; no key is installed.
    pub fn new(series: TimeSeries) -> Self {
        let end = series.len();
        Self {
            inner: Arc::new(Mutex::new(WindowInner {
                series,
                end,
                key: None,
                calendar: None,
                cal_offset: 0,
            })),
        }
    }

    /// Build a calendar window from a trading-day sequence.
    pub fn from_dates(name: impl Into<String>, dates: Vec<DateTime>) -> Result<Calendar> {
        let mut series = TimeSeries::new(Schema::dates_only(name));
        series.extend(dates.into_iter().map(|d| Row::empty(d, 0)))?;
        Ok(Self::new(series))
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(self.inner.lock().unwrap().series.schema())
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().end
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Date of the current simulating day, or `None` when the next real-life trading day is not
    /// yet known (the boundary sits at the end of the series).
    pub fn today(&self) -> Option<DateTime> {
        let inner = self.inner.lock().unwrap();
        inner.series.get(inner.end).map(|row| row.date)
    }

    /// Last date known to the underlying series, regardless of the boundary. Used for end-date
    /// clamping at configuration time.
    pub fn last_date(&self) -> Option<DateTime> {
        self.inner.lock().unwrap().series.last_date()
    }

    /// Date at an absolute position of the underlying series, regardless of the boundary.
    pub fn date_at(&self, pos: usize) -> Option<DateTime> {
        self.inner.lock().unwrap().series.get(pos).map(|r| r.date)
    }

    /// Read the row `index` steps before the boundary; only negative indices are valid, `-1`
    /// being the most recent visible row.
    ///
    /// An offset that predates the synchronized series but not the calendar yields a row with a
    /// valid date and all-null fields; an offset before the calendar span fails.
    pub fn get(&self, index: i64) -> Result<Row> {
        let inner = self.inner.lock().unwrap();
        read(&inner, index)
    }

    /// Range read with slice semantics over relative indices. Defaults cover the whole visible
    /// window; explicit endpoints must be negative and the step nonzero.
    ///
    /// The result is an independently addressable window holding exactly the requested rows. It
    /// reuses the field schema and the parent's key, but carries no calendar, so reads past its
    /// rows fail rather than produce filler.
    pub fn range(&self, start: Option<i64>, stop: Option<i64>, step: i64) -> Result<TimeWindow> {
        if step == 0 {
            return Err(Error::OutOfRange("slice step cannot be zero".to_string()));
        }
        let inner = self.inner.lock().unwrap();
        let end = inner.end as i64;
        let start = start.unwrap_or(if step > 0 { -end } else { -1 });
        let stop = stop.unwrap_or(if step > 0 { 0 } else { -end - 1 });
        if start >= 0 || stop > 0 {
            return Err(Error::OutOfRange(format!(
                "slice [{start}, {stop}) is not strictly in the past"
            )));
        }
        let mut rows = Vec::new();
        let mut x = start;
        while (step > 0 && x < stop) || (step < 0 && x > stop) {
            rows.push(read(&inner, x)?);
            x += step;
        }
        let end = rows.len();
        Ok(Self {
            inner: Arc::new(Mutex::new(WindowInner {
                series: TimeSeries::from_parts(Arc::clone(inner.series.schema()), rows),
                end,
                key: inner.key,
                calendar: None,
                cal_offset: 0,
            })),
        })
    }

    /// Visible rows as an owned snapshot.
    pub fn snapshot(&self) -> Vec<Row> {
        let inner = self.inner.lock().unwrap();
        inner.series.rows()[..inner.end].to_vec()
    }

    /// Install the access key. May be called exactly once per window.
    pub fn set_key(&self, key: &AccessKey) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.key.is_some() {
            return Err(Error::PermissionDenied(format!(
                "the key on {} is unchangeable",
                inner.series.schema().name()
            )));
        }
        inner.key = Some(key.id);
        Ok(())
    }

    /// Move the boundary one row forward.
    ///
    /// Fails when no next day exists. When the boundary is at the very first row and that row's
    /// date is not the calendar's current date, the series has not started relative to the
    /// calendar yet and the call is a no-op.
    pub fn advance(&self, key: Option<&AccessKey>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        check_key(&inner, key)?;
        if inner.end == inner.series.len() {
            return Err(Error::OutOfRange(format!(
                "no trading day after {}",
                inner
                    .series
                    .last_date()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "empty series".to_string())
            )));
        }
        if inner.end == 0 {
            if let Some(calendar) = &inner.calendar {
                if calendar.today() != inner.series.first_date() {
                    return Ok(());
                }
            }
        }
        inner.end += 1;
        Ok(())
    }

    /// Reposition the boundary at the row with the largest date at or before `target`, clamping
    /// to the earliest row when `target` precedes all data. Fails when `target` is later than
    /// the last available date.
    pub fn seek(&self, target: DateTime, key: Option<&AccessKey>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        check_key(&inner, key)?;
        match inner.series.last_date() {
            Some(last) if last >= target => {
                let at_or_before = inner.series.rows().partition_point(|r| r.date <= target);
                inner.end = at_or_before.saturating_sub(1);
                Ok(())
            }
            _ => Err(Error::OutOfRange(format!("date {target} not found"))),
        }
    }

    /// Merge-join the raw series against `calendar`, replacing the internal series with one that
    /// contains exactly the calendar's dates from the series' first kept row onwards.
    ///
    /// Calendar dates missing from the raw data become all-null rows; raw dates missing from the
    /// calendar are dropped, as is everything before the first kept date. Trailing calendar
    /// dates are appended as null rows and the boundary resets to the series length.
    pub fn synchronize(&self, calendar: &Calendar, key: Option<&AccessKey>) -> Result<()> {
        let cal_dates: Vec<DateTime> = {
            let cal_inner = calendar.inner.lock().unwrap();
            cal_inner.series.rows().iter().map(|r| r.date).collect()
        };
        let mut inner = self.inner.lock().unwrap();
        check_key(&inner, key)?;

        let arity = inner.series.schema().arity();
        let rows = inner.series.rows();
        let mut synced: Vec<Row> = Vec::with_capacity(cal_dates.len());
        let mut di = 0;
        let mut wi = 0;
        while wi < cal_dates.len() && di < rows.len() {
            if rows[di].date > cal_dates[wi] {
                // A calendar day before the raw series has started produces nothing; one inside
                // a gap produces a null row.
                if di != 0 {
                    synced.push(Row::empty(cal_dates[wi], arity));
                }
                wi += 1;
            } else if rows[di].date < cal_dates[wi] {
                di += 1;
            } else {
                synced.push(rows[di].clone());
                wi += 1;
                di += 1;
            }
        }
        for date in &cal_dates[wi..] {
            synced.push(Row::empty(*date, arity));
        }

        inner.cal_offset = cal_dates.len() - synced.len();
        inner.end = synced.len();
        inner.series = TimeSeries::from_parts(Arc::clone(inner.series.schema()), synced);
        inner.calendar = Some(calendar.clone());
        Ok(())
    }

    /// Bulk append of new rows from another window of the same dataset. The boundary moves to
    /// the new end of the series.
    pub fn extend(&self, other: &TimeWindow, key: Option<&AccessKey>) -> Result<()> {
        let new_rows = other.snapshot();
        let other_schema = other.schema();
        let mut inner = self.inner.lock().unwrap();
        check_key(&inner, key)?;
        if *inner.series.schema().as_ref() != *other_schema {
            return Err(Error::Configuration(format!(
                "cannot extend {} with rows from {}",
                inner.series.schema().name(),
                other_schema.name()
            )));
        }
        let mut series = inner.series.clone();
        series.extend(new_rows)?;
        inner.end = series.len();
        inner.series = series;
        Ok(())
    }

    /// Independent copy of this window with no key installed and the boundary at the end,
    /// rebound to `calendar` when given. Used to isolate concurrent simulations.
    pub fn deep_clone(&self, calendar: Option<&Calendar>) -> Self {
        let inner = self.inner.lock().unwrap();
        let series = inner.series.clone();
        let end = series.len();
        Self {
            inner: Arc::new(Mutex::new(WindowInner {
                series,
                end,
                key: None,
                calendar: calendar.cloned(),
                cal_offset: inner.cal_offset,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessKey, TimeWindow};
    use crate::series::{Row, Schema, TimeSeries};
    use crate::types::DateTime;

    const DAY: i64 = 86_400;

    fn dates(days: &[i64]) -> Vec<DateTime> {
        days.iter().map(|d| DateTime::from(d * DAY)).collect()
    }

    fn series_with(days: &[i64], value: f64) -> TimeSeries {
        let mut series = TimeSeries::new(Schema::new(
            "prices",
            vec!["buy".to_string(), "sell".to_string()],
        ));
        for day in days {
            series
                .push(Row::new(day * DAY, vec![Some(value), Some(value)]))
                .unwrap();
        }
        series
    }

    #[test]
    fn test_that_only_negative_indices_are_readable() {
        let window = TimeWindow::new(series_with(&[1, 2, 3], 10.0));
        assert!(window.get(0).is_err());
        assert!(window.get(1).is_err());
        assert_eq!(window.get(-1).unwrap().date, DateTime::from(3 * DAY));
        assert_eq!(window.get(-3).unwrap().date, DateTime::from(DAY));
    }

    #[test]
    fn test_that_advancing_is_index_stable() {
        let window = TimeWindow::new(series_with(&[1, 2, 3, 4, 5], 10.0));
        let key = AccessKey::mint();
        window.set_key(&key).unwrap();
        window.seek(DateTime::from(2 * DAY), Some(&key)).unwrap();

        let before = window.get(-1).unwrap();
        window.advance(Some(&key)).unwrap();
        window.advance(Some(&key)).unwrap();
        // The row that was at -1 is now two steps further back.
        assert_eq!(window.get(-3).unwrap(), before);
        // Nothing at or after the boundary is ever exposed.
        assert_eq!(window.get(-1).unwrap().date, DateTime::from(3 * DAY));
        assert_eq!(window.today(), Some(DateTime::from(4 * DAY)));
    }

    #[test]
    fn test_that_synchronization_inserts_nulls_and_drops_off_calendar_rows() {
        // Calendar d1..d5, raw data on d1, d3, d4.
        let calendar = TimeWindow::from_dates("workdays", dates(&[1, 2, 3, 4, 5])).unwrap();
        let window = TimeWindow::new(series_with(&[1, 3, 4], 7.0));
        window.synchronize(&calendar, None).unwrap();

        assert_eq!(window.len(), 5);
        let got: Vec<(DateTime, Option<f64>)> = (-5..0)
            .map(|i| {
                let row = window.get(i).unwrap();
                (row.date, row.value(0))
            })
            .collect();
        assert_eq!(
            got,
            vec![
                (DateTime::from(DAY), Some(7.0)),
                (DateTime::from(2 * DAY), None),
                (DateTime::from(3 * DAY), Some(7.0)),
                (DateTime::from(4 * DAY), Some(7.0)),
                (DateTime::from(5 * DAY), None),
            ]
        );
    }

    #[test]
    fn test_that_synchronization_drops_leading_rows_before_first_workday() {
        // Raw data starts on d3 which is not a workday; the synchronized series starts at the
        // first workday after it and keeps nothing earlier.
        let calendar = TimeWindow::from_dates("workdays", dates(&[1, 2, 4, 5, 6])).unwrap();
        let window = TimeWindow::new(series_with(&[3, 5, 6], 7.0));
        window.synchronize(&calendar, None).unwrap();

        assert_eq!(window.len(), 3);
        assert_eq!(window.get(-3).unwrap().date, DateTime::from(4 * DAY));
        assert_eq!(window.get(-3).unwrap().value(0), None);
        assert_eq!(window.get(-2).unwrap().value(0), Some(7.0));
    }

    #[test]
    fn test_that_pre_data_reads_yield_null_rows_within_calendar_span() {
        let calendar = TimeWindow::from_dates("workdays", dates(&[1, 2, 4, 5, 6])).unwrap();
        let window = TimeWindow::new(series_with(&[3, 5, 6], 7.0));
        window.synchronize(&calendar, None).unwrap();

        // Offsets -4 and -5 predate the synchronized series but map onto d2 and d1.
        let filler = window.get(-4).unwrap();
        assert_eq!(filler.date, DateTime::from(2 * DAY));
        assert_eq!(filler.value(0), None);
        assert_eq!(window.get(-5).unwrap().date, DateTime::from(DAY));
        // Offset -6 predates the calendar span entirely.
        assert!(window.get(-6).is_err());
    }

    #[test]
    fn test_that_keys_are_single_shot_and_required() {
        let window = TimeWindow::new(series_with(&[1, 2, 3], 10.0));
        let key = AccessKey::mint();
        let other = AccessKey::mint();

        // Presenting a key before one is installed fails.
        assert!(window.advance(Some(&key)).is_err());

        window.set_key(&key).unwrap();
        assert!(window.set_key(&other).is_err());
        assert!(window.set_key(&key).is_err());

        assert!(window.advance(None).is_err());
        assert!(window.advance(Some(&other)).is_err());
        window.seek(DateTime::from(DAY), Some(&key)).unwrap();
        window.advance(Some(&key)).unwrap();
    }

    #[test]
    fn test_that_seek_lands_on_largest_date_at_or_before_target() {
        let window = TimeWindow::new(series_with(&[1, 2, 4, 7], 10.0));
        let key = AccessKey::mint();
        window.set_key(&key).unwrap();

        // Exact hit: today is the target row.
        window.seek(DateTime::from(2 * DAY), Some(&key)).unwrap();
        assert_eq!(window.today(), Some(DateTime::from(2 * DAY)));

        // Between rows: lands on the row just before.
        window.seek(DateTime::from(5 * DAY), Some(&key)).unwrap();
        assert_eq!(window.today(), Some(DateTime::from(4 * DAY)));

        // Before all data: clamps to the earliest row.
        window.seek(DateTime::from(0), Some(&key)).unwrap();
        assert_eq!(window.today(), Some(DateTime::from(DAY)));

        // Beyond the last date: fails.
        assert!(window.seek(DateTime::from(8 * DAY), Some(&key)).is_err());
    }

    #[test]
    fn test_that_advance_is_a_noop_before_the_series_starts() {
        let calendar = TimeWindow::from_dates("workdays", dates(&[1, 2, 3, 4])).unwrap();
        let cal_key = AccessKey::mint();
        calendar.set_key(&cal_key).unwrap();

        let window = TimeWindow::new(series_with(&[2, 3, 4], 10.0));
        window.synchronize(&calendar, None).unwrap();
        let key = AccessKey::mint();
        window.set_key(&key).unwrap();
        window.seek(DateTime::from(0), Some(&key)).unwrap();
        calendar.seek(DateTime::from(0), Some(&cal_key)).unwrap();

        // Calendar says d1 but the series starts on d2: advancing the window does nothing.
        window.advance(Some(&key)).unwrap();
        assert_eq!(window.len(), 0);
        calendar.advance(Some(&cal_key)).unwrap();

        // Now the calendar reads d2 and the window starts moving.
        window.advance(Some(&key)).unwrap();
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_that_advancing_past_the_end_fails() {
        let window = TimeWindow::new(series_with(&[1, 2], 10.0));
        let key = AccessKey::mint();
        window.set_key(&key).unwrap();
        // Boundary starts at the end of the series.
        assert!(window.advance(Some(&key)).is_err());
    }

    #[test]
    fn test_that_range_reads_produce_independent_windows() {
        let window = TimeWindow::new(series_with(&[1, 2, 3, 4, 5], 10.0));
        let view = window.range(Some(-4), Some(-1), 1).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.get(-3).unwrap().date, DateTime::from(2 * DAY));
        assert_eq!(view.get(-1).unwrap().date, DateTime::from(4 * DAY));

        // Full-window default and step traversal.
        let all = window.range(None, None, 1).unwrap();
        assert_eq!(all.len(), 5);
        let odd = window.range(Some(-5), None, 2).unwrap();
        assert_eq!(odd.len(), 3);

        // Invalid endpoints and zero step.
        assert!(window.range(Some(0), None, 1).is_err());
        assert!(window.range(Some(-3), Some(1), 1).is_err());
        assert!(window.range(None, None, 0).is_err());
    }

    #[test]
    fn test_that_extend_appends_and_moves_the_boundary() {
        let window = TimeWindow::new(series_with(&[1, 2], 10.0));
        let update = TimeWindow::new(series_with(&[3, 4], 11.0));
        window.extend(&update, None).unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(window.get(-1).unwrap().value(0), Some(11.0));

        let mismatched = TimeWindow::new(TimeSeries::new(Schema::new(
            "other",
            vec!["buy".to_string(), "sell".to_string()],
        )));
        assert!(window.extend(&mismatched, None).is_err());
    }
}
