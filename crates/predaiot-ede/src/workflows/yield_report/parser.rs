use super::mapping::{column_for_header, ReportColumn};
use super::normalizer::clean_cell;
use super::{ImportIssue, YieldReport, YieldReportImportError};
use crate::workflows::portfolio::PlantRecord;
use calamine::{open_workbook, Reader, Xlsx};
use regex::Regex;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

static NUMBER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn number_pattern() -> &'static Regex {
    NUMBER_PATTERN.get_or_init(|| {
        Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d*)?|\d+(?:\.\d*)?").expect("number pattern compiles")
    })
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldParseError {
    #[error("{field} is empty")]
    Empty { field: &'static str },
    #[error("{field} has no numeric value in '{raw}'")]
    NoNumber { field: &'static str, raw: String },
    #[error("{field} value '{raw}' is out of range")]
    OutOfRange { field: &'static str, raw: String },
}

/// Pulls the first number out of a text cell such as `"1,234.5 OMR"`.
///
/// Comma thousands groups are accepted; signs are not part of the match, so
/// figures are read as magnitudes.
pub fn extract_number(field: &'static str, raw: &str) -> Result<f64, FieldParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldParseError::Empty { field });
    }

    let matched = number_pattern()
        .find(trimmed)
        .ok_or_else(|| FieldParseError::NoNumber {
            field,
            raw: trimmed.to_string(),
        })?;

    let digits = matched.as_str().replace(',', "");
    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FieldParseError::OutOfRange {
            field,
            raw: trimmed.to_string(),
        }),
    }
}

/// Column positions discovered from the header row.
#[derive(Debug)]
struct HeaderLayout {
    positions: HashMap<ReportColumn, usize>,
}

impl HeaderLayout {
    fn detect(record: &csv::StringRecord) -> Option<Self> {
        let mut positions = HashMap::new();
        for (index, cell) in record.iter().enumerate() {
            if let Some(column) = column_for_header(cell) {
                positions.entry(column).or_insert(index);
            }
        }

        // A title cell such as "Plant" alone must not pass for the header.
        (positions.contains_key(&ReportColumn::PlantName) && positions.len() >= 2)
            .then_some(Self { positions })
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, column: ReportColumn) -> Option<&'r str> {
        self.positions
            .get(&column)
            .and_then(|index| record.get(*index))
    }
}

pub(crate) fn parse_report<R: Read>(reader: R) -> Result<YieldReport, YieldReportImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let rows = csv_reader.records().map(|record| -> Result<_, YieldReportImportError> {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        Ok((line, record))
    });
    parse_rows(rows)
}

pub(crate) fn parse_workbook(
    path: &Path,
    sheet: &str,
) -> Result<YieldReport, YieldReportImportError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(YieldReportImportError::MissingSheet(sheet.to_string()));
    }

    let range = workbook.worksheet_range(sheet)?;
    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or_default();
    let rows = range.rows().enumerate().map(|(index, cells)| {
        let record = cells
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect::<csv::StringRecord>();
        Ok::<_, YieldReportImportError>((first_row + index as u64 + 1, record))
    });
    parse_rows(rows)
}

/// Walks `(line, record)` pairs from either source: title rows until the
/// header, then one plant per named row.
fn parse_rows<I>(rows: I) -> Result<YieldReport, YieldReportImportError>
where
    I: IntoIterator<Item = Result<(u64, csv::StringRecord), YieldReportImportError>>,
{
    let mut layout: Option<HeaderLayout> = None;
    let mut report = YieldReport::default();

    for row in rows {
        let (line, record) = row?;
        let Some(header) = layout.as_ref() else {
            // Exports carry a title row above the real header.
            layout = HeaderLayout::detect(&record);
            continue;
        };

        let name = header
            .cell(&record, ReportColumn::PlantName)
            .map(clean_cell)
            .unwrap_or_default();
        if name.is_empty() {
            report.dropped_rows += 1;
            continue;
        }

        let mut read = |column: ReportColumn| -> Option<f64> {
            let raw = header.cell(&record, column)?;
            if raw.trim().is_empty() {
                return None;
            }

            match extract_number(column.label(), raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(plant = %name, line, error = %err, "unparseable yield report cell");
                    report.issues.push(ImportIssue {
                        line,
                        plant: name.clone(),
                        column: column.label(),
                        error: err,
                    });
                    None
                }
            }
        };

        let plant = PlantRecord {
            revenue: read(ReportColumn::TotalRevenue),
            yield_kwh: read(ReportColumn::TotalYield),
            installed_power_kwp: read(ReportColumn::InstalledPower),
            equivalent_hours: read(ReportColumn::EquivalentHours),
            co2_reduction_kg: read(ReportColumn::Co2Reduction),
            name,
        };
        report.plants.push(plant);
    }

    if layout.is_none() {
        return Err(YieldReportImportError::MissingHeader);
    }

    Ok(report)
}
