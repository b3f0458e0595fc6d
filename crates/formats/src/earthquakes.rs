use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use foundation::GeoPoint;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::sampling::subsample_stride;
use crate::tabular::{TabularError, TabularReport, parse_number, read_rows};

pub const EXPECTED_EARTHQUAKE_HEADER: [&str; 7] = [
    "Date",
    "Time",
    "Latitude",
    "Longitude",
    "Depth",
    "Magnitude",
    "Location Source",
];

/// Data rows above this count are stride-subsampled before parsing.
pub const MAX_RECORDS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeRecord {
    pub id: String,
    pub date: String,
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: Option<f64>,
    pub magnitude: f64,
    pub place: String,
    pub mag_type: String,
    /// UTC epoch milliseconds, when date and time parse.
    pub timestamp: Option<i64>,
}

impl EarthquakeRecord {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EarthquakeCatalog {
    pub records: Vec<EarthquakeRecord>,
    pub report: TabularReport,
}

/// Parses the earthquake CSV with the default record threshold.
pub fn parse_earthquakes(text: &str) -> Result<EarthquakeCatalog, TabularError> {
    parse_earthquakes_with_limit(text, MAX_RECORDS)
}

/// Parses the earthquake CSV.
///
/// The first row is the header. A header differing from
/// [`EXPECTED_EARTHQUAKE_HEADER`] is logged but not fatal. Rows whose column
/// count differs from the header's, and rows whose latitude, longitude or
/// magnitude is not a number in range, are skipped with a warning.
pub fn parse_earthquakes_with_limit(
    text: &str,
    max_records: usize,
) -> Result<EarthquakeCatalog, TabularError> {
    let rows = read_rows(text)?;
    let Some((header, data)) = rows.split_first() else {
        warn!("earthquake CSV is empty");
        return Ok(EarthquakeCatalog::default());
    };

    let header_matched = header.iter().map(String::as_str).eq(EXPECTED_EARTHQUAKE_HEADER);
    if !header_matched {
        warn!(
            expected = ?EXPECTED_EARTHQUAKE_HEADER,
            got = ?header,
            "earthquake CSV header does not match expected format"
        );
    }

    let processed = if data.len() > max_records {
        info!(
            total = data.len(),
            limit = max_records,
            "subsampling earthquake rows"
        );
        subsample_stride(data, max_records)
    } else {
        data.to_vec()
    };

    let mut report = TabularReport {
        total_rows: data.len(),
        processed_rows: processed.len(),
        header_matched,
        ..TabularReport::default()
    };

    let mut records = Vec::with_capacity(processed.len());
    for (index, row) in processed.iter().enumerate() {
        if row.len() != header.len() {
            warn!(
                row = index,
                columns = row.len(),
                expected = header.len(),
                "skipping earthquake row with incorrect column count"
            );
            report.skipped_column_count += 1;
            continue;
        }
        match parse_row(index, row) {
            Some(record) => records.push(record),
            None => {
                warn!(row = index, line = %row.join(","), "skipping earthquake row with invalid numbers");
                report.skipped_invalid += 1;
            }
        }
    }

    report.accepted = records.len();
    info!(
        accepted = report.accepted,
        skipped = report.skipped_column_count + report.skipped_invalid,
        "earthquake CSV parsed"
    );
    Ok(EarthquakeCatalog { records, report })
}

fn parse_row(index: usize, row: &[String]) -> Option<EarthquakeRecord> {
    let latitude = parse_number(row.get(2))?;
    let longitude = parse_number(row.get(3))?;
    let magnitude = parse_number(row.get(5))?;
    if !GeoPoint::new(latitude, longitude).is_valid() {
        return None;
    }

    let date = row.first().cloned().unwrap_or_default();
    let time = row.get(1).cloned().unwrap_or_default();
    let timestamp = parse_timestamp_ms(&date, &time);
    if timestamp.is_none() {
        debug!(row = index, %date, %time, "earthquake row has no parseable timestamp");
    }

    Some(EarthquakeRecord {
        id: format!("csv_{index}"),
        latitude,
        longitude,
        depth: parse_number(row.get(4)),
        magnitude,
        place: row.get(6).cloned().unwrap_or_default(),
        mag_type: "unknown".to_string(),
        timestamp,
        date,
        time,
    })
}

/// UTC epoch milliseconds for `YYYY-MM-DD` or `MM/DD/YYYY` plus `HH:MM:SS`.
pub fn parse_timestamp_ms(date: &str, time: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%m/%d/%Y"))
        .ok()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    Some(NaiveDateTime::new(date, time).and_utc().timestamp_millis())
}
