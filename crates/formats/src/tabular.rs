use std::fmt;

/// Errors that abort a whole tabular load. Individual bad rows never do.
#[derive(Debug)]
pub enum TabularError {
    Csv(csv::Error),
}

impl fmt::Display for TabularError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabularError::Csv(err) => write!(f, "CSV read error: {err}"),
        }
    }
}

impl std::error::Error for TabularError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TabularError::Csv(err) => Some(err),
        }
    }
}

impl From<csv::Error> for TabularError {
    fn from(err: csv::Error) -> Self {
        TabularError::Csv(err)
    }
}

/// What happened to the rows of one tabular source.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TabularReport {
    /// Data rows in the source (header excluded).
    pub total_rows: usize,
    /// Data rows considered after subsampling.
    pub processed_rows: usize,
    pub accepted: usize,
    pub skipped_column_count: usize,
    pub skipped_invalid: usize,
    pub header_matched: bool,
}

/// Reads comma-delimited text into trimmed string rows.
///
/// Fields are split on every comma; quotes are ordinary characters, so a
/// stray quote can only damage its own row. Rows may have differing lengths;
/// validating the column count is the caller's job. Blank lines are skipped.
pub fn read_rows(text: &str) -> Result<Vec<Vec<String>>, TabularError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Parses a required numeric field. Empty and non-numeric text is `None`.
pub fn parse_number(field: Option<&String>) -> Option<f64> {
    let value: f64 = field?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}
