use foundation::GeoPoint;
use serde::Serialize;
use tracing::{info, warn};

use crate::tabular::{TabularError, TabularReport, parse_number, read_rows};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolcanoRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl VolcanoRecord {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolcanoCatalog {
    pub records: Vec<VolcanoRecord>,
    pub report: TabularReport,
}

/// Parses `name,latitude,longitude,...` rows.
///
/// The first line is a header and is skipped without validation. Columns past
/// the third are ignored; rows with a missing or non-numeric coordinate are
/// dropped.
pub fn parse_volcanoes(text: &str) -> Result<VolcanoCatalog, TabularError> {
    let rows = read_rows(text)?;
    let data = rows.get(1..).unwrap_or_default();

    let mut report = TabularReport {
        total_rows: data.len(),
        processed_rows: data.len(),
        ..TabularReport::default()
    };

    let mut records = Vec::with_capacity(data.len());
    for (index, row) in data.iter().enumerate() {
        let latitude = parse_number(row.get(1));
        let longitude = parse_number(row.get(2));
        match (latitude, longitude) {
            (Some(latitude), Some(longitude))
                if GeoPoint::new(latitude, longitude).is_valid() =>
            {
                records.push(VolcanoRecord {
                    name: row.first().cloned().unwrap_or_default(),
                    latitude,
                    longitude,
                });
            }
            _ => {
                warn!(row = index, "skipping volcano row with invalid coordinates");
                report.skipped_invalid += 1;
            }
        }
    }

    report.accepted = records.len();
    info!(accepted = report.accepted, "volcano CSV parsed");
    Ok(VolcanoCatalog { records, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_rows_and_ignores_extra_columns() {
        let text = "name,latitude,longitude,elevation\n\
                    Etna,37.748,14.999,3357\n\
                    Fuji,35.361,138.728\n";
        let catalog = parse_volcanoes(text).expect("parse");
        assert_eq!(
            catalog.records,
            vec![
                VolcanoRecord {
                    name: "Etna".to_string(),
                    latitude: 37.748,
                    longitude: 14.999,
                },
                VolcanoRecord {
                    name: "Fuji".to_string(),
                    latitude: 35.361,
                    longitude: 138.728,
                },
            ]
        );
    }

    #[test]
    fn header_is_never_validated() {
        let text = "whatever\nKilauea,19.421,-155.287\n";
        let catalog = parse_volcanoes(text).expect("parse");
        assert_eq!(catalog.records.len(), 1);
    }

    #[test]
    fn filters_invalid_rows() {
        let text = "name,lat,lon\nA,abc,10\nB,10\nC,,\nD,-10.5,200\nE,1,2\n";
        let catalog = parse_volcanoes(text).expect("parse");
        assert_eq!(catalog.records.len(), 1);
        assert_eq!(catalog.records[0].name, "E");
        assert_eq!(catalog.report.skipped_invalid, 4);
    }

    #[test]
    fn empty_source_is_empty_catalog() {
        assert!(parse_volcanoes("").expect("parse").records.is_empty());
    }
}
