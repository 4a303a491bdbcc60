//! CSV ingest of conformed predictor/predictand tables.
//!
//! Expected layout is long format, one row per station-date pair:
//!
//! ```text
//! station,date,pred01,pred02,...,tand01
//! KDCA,2020040112,281.4,0.6,...,283.0
//! ```
//!
//! - `date` is `YYYYMMDDHH` (or `YYYYMMDD`, taken as 00 UTC)
//! - empty, non-numeric, `NaN` and `>= 9999` cells become the missing sentinel
//! - the station and date axes are the sorted, de-duplicated values seen in the file;
//!   station-date pairs absent from the file stay missing
//! - bad rows are skipped and reported, a file with no usable row is an error

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{MISSING, PredictorKind, Variable, VariableSet};
use crate::error::{AppError, EXIT_CONFIG, EXIT_SHAPE};

/// Which file to read and how to interpret its columns.
#[derive(Debug, Clone, Default)]
pub struct IngestSpec {
    pub path: PathBuf,
    /// Columns holding predictands; all other value columns are predictors.
    pub predictands: Vec<String>,
    /// Predictor columns holding point binary (0/1) values.
    pub point_binary: Vec<String>,
    /// Predictor columns holding grid binary (0/1) values.
    pub grid_binary: Vec<String>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub station: Option<String>,
    pub message: String,
}

/// Ingest output: the variable set plus what happened to the rows.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub variables: VariableSet,
    pub rows_read: usize,
    pub rows_used: usize,
    pub row_errors: Vec<RowError>,
}

struct Column {
    index: usize,
    name: String,
    kind: Option<PredictorKind>,
}

struct ParsedRow {
    line: usize,
    station: String,
    date: NaiveDateTime,
    values: Vec<f64>,
}

/// Load a conformed CSV file.
pub fn load_conformed_csv(spec: &IngestSpec) -> Result<IngestedData, AppError> {
    let file = File::open(&spec.path).map_err(|e| {
        AppError::new(
            EXIT_CONFIG,
            format!("Failed to open CSV '{}': {e}", spec.path.display()),
        )
    })?;
    read_conformed_csv(file, spec)
}

/// Same as [`load_conformed_csv`], from any reader.
pub fn read_conformed_csv<R: Read>(input: R, spec: &IngestSpec) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let (station_col, date_col, columns) = resolve_columns(&headers, spec)?;

    let mut rows: Vec<ParsedRow> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    station: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, line, station_col, date_col, &columns) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                station: record.get(station_col).map(str::to_string),
                message,
            }),
        }
    }

    if rows.is_empty() {
        return Err(AppError::new(EXIT_SHAPE, "No valid rows in conformed CSV."));
    }

    let stations: Vec<String> = rows
        .iter()
        .map(|r| r.station.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let dates: Vec<NaiveDateTime> = rows
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let station_pos: HashMap<&str, usize> =
        stations.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();
    let date_pos: HashMap<NaiveDateTime, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let cells = stations.len() * dates.len();
    let mut arrays = vec![vec![MISSING; cells]; columns.len()];
    let mut filled = vec![false; cells];
    let mut rows_used = 0usize;

    for row in &rows {
        let (Some(&s), Some(&d)) = (station_pos.get(row.station.as_str()), date_pos.get(&row.date))
        else {
            continue;
        };
        let cell = s * dates.len() + d;
        if filled[cell] {
            row_errors.push(RowError {
                line: row.line,
                station: Some(row.station.clone()),
                message: format!("duplicate row for {} {}; first one kept", row.station, row.date),
            });
            continue;
        }
        filled[cell] = true;
        rows_used += 1;
        for (array, &value) in arrays.iter_mut().zip(&row.values) {
            array[cell] = value;
        }
    }

    let variables: Vec<Variable> = columns
        .iter()
        .zip(arrays)
        .map(|(col, values)| match col.kind {
            Some(kind) => Variable::predictor(col.name.clone(), kind, values),
            None => Variable::predictand(col.name.clone(), values),
        })
        .collect();

    let variables = VariableSet::new(stations, dates, variables)?;

    Ok(IngestedData {
        variables,
        rows_read,
        rows_used,
        row_errors,
    })
}

fn resolve_columns(
    headers: &StringRecord,
    spec: &IngestSpec,
) -> Result<(usize, usize, Vec<Column>), AppError> {
    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();
    let find = |wanted: &str| names.iter().position(|n| n.eq_ignore_ascii_case(wanted));

    let station_col = find("station")
        .ok_or_else(|| AppError::config("Missing required column 'station'."))?;
    let date_col =
        find("date").ok_or_else(|| AppError::config("Missing required column 'date'."))?;

    for name in spec.predictands.iter().chain(&spec.point_binary).chain(&spec.grid_binary) {
        if !names.iter().any(|n| n == name) {
            return Err(AppError::config(format!("Column '{name}' not found in CSV header.")));
        }
    }
    for name in spec.point_binary.iter().chain(&spec.grid_binary) {
        if spec.predictands.contains(name) {
            return Err(AppError::config(format!(
                "Column '{name}' cannot be both a predictand and a binary predictor."
            )));
        }
    }
    if let Some(name) = spec.point_binary.iter().find(|n| spec.grid_binary.contains(n)) {
        return Err(AppError::config(format!(
            "Column '{name}' listed as both point and grid binary."
        )));
    }

    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != station_col && *i != date_col)
        .map(|(index, name)| {
            let kind = if spec.predictands.contains(name) {
                None
            } else if spec.point_binary.contains(name) {
                Some(PredictorKind::PointBinary)
            } else if spec.grid_binary.contains(name) {
                Some(PredictorKind::GridBinary)
            } else {
                Some(PredictorKind::Continuous)
            };
            Column {
                index,
                name: name.clone(),
                kind,
            }
        })
        .collect();

    Ok((station_col, date_col, columns))
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_row(
    record: &StringRecord,
    line: usize,
    station_col: usize,
    date_col: usize,
    columns: &[Column],
) -> Result<ParsedRow, String> {
    let station = record.get(station_col).unwrap_or("").to_string();
    if station.is_empty() {
        return Err("missing station".to_string());
    }
    let date = parse_date(record.get(date_col).unwrap_or(""))?;
    let values = columns
        .iter()
        .map(|col| parse_value(record.get(col.index).unwrap_or("")))
        .collect();
    Ok(ParsedRow {
        line,
        station,
        date,
        values,
    })
}

/// Parse `YYYYMMDDHH` or `YYYYMMDD`.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid date '{raw}'"));
    }
    let (day, hour) = match raw.len() {
        10 => (&raw[..8], raw[8..].parse::<u32>().map_err(|e| format!("invalid hour in '{raw}': {e}"))?),
        8 => (raw, 0),
        _ => return Err(format!("invalid date '{raw}' (expected YYYYMMDDHH)")),
    };
    NaiveDate::parse_from_str(day, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| format!("invalid date '{raw}'"))
}

/// Parse one cell; anything unusable is the missing sentinel.
pub fn parse_value(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v < MISSING => v,
        _ => MISSING,
    }
}
