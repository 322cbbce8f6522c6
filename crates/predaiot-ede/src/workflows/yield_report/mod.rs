mod mapping;
mod normalizer;
mod parser;

pub use parser::{extract_number, FieldParseError};

use crate::workflows::portfolio::PlantRecord;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum YieldReportImportError {
    #[error("failed to read yield report: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid yield report CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid yield report workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("workbook has no '{0}' sheet")]
    MissingSheet(String),
    #[error("yield report has no header row with a 'Plant name' column")]
    MissingHeader,
}

/// Sheet holding the plant table in workbook exports.
pub const YIELD_REPORT_SHEET: &str = "Yield report";

/// A cell that held text where a number was expected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportIssue {
    pub line: u64,
    pub plant: String,
    pub column: &'static str,
    #[serde(serialize_with = "serialize_display")]
    pub error: FieldParseError,
}

fn serialize_display<S>(value: &FieldParseError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YieldReport {
    pub plants: Vec<PlantRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ImportIssue>,
    /// Rows discarded because the plant name cell was empty.
    pub dropped_rows: usize,
}

pub struct YieldReportImporter;

impl YieldReportImporter {
    /// Reads a CSV export, or the yield sheet of an `.xlsx` workbook.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<YieldReport, YieldReportImportError> {
        let report = if is_workbook(path.as_ref()) {
            parser::parse_workbook(path.as_ref(), YIELD_REPORT_SHEET)?
        } else {
            Self::from_reader(std::fs::File::open(path.as_ref())?)?
        };
        info!(
            path = %path.as_ref().display(),
            plants = report.plants.len(),
            issues = report.issues.len(),
            "yield report imported"
        );
        Ok(report)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<YieldReport, YieldReportImportError> {
        parser::parse_report(reader)
    }

    pub fn from_workbook<P: AsRef<Path>>(
        path: P,
        sheet: &str,
    ) -> Result<YieldReport, YieldReportImportError> {
        parser::parse_workbook(path.as_ref(), sheet)
    }
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "xlsx" | "xlsm"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EXPORT: &str = "\u{feff}Yield report,,,,,\n\
Plant name,Installed power(kWp),Total yield(kWh),Equivalent hours(h),Total revenue,Total CO\u{2082} reduction(kg)\n\
Main Villa,130.5,\"210,294.5\",1611.4,8411.78 OMR,\"96,735.47\"\n\
Guest House,12,18400,1533,736 OMR,8464\n";

    #[test]
    fn extract_number_reads_first_number_in_cell() {
        assert_eq!(extract_number("revenue", "8411.78 OMR"), Ok(8411.78));
        assert_eq!(extract_number("revenue", "OMR 42"), Ok(42.0));
        assert_eq!(extract_number("revenue", "12."), Ok(12.0));
        assert_eq!(extract_number("yield", "210,294.5 kWh"), Ok(210_294.5));
        assert_eq!(extract_number("yield", "1,23"), Ok(1.0));
    }

    #[test]
    fn extract_number_reports_cells_without_numbers() {
        assert_eq!(
            extract_number("revenue", "  "),
            Err(FieldParseError::Empty { field: "revenue" })
        );
        assert_eq!(
            extract_number("revenue", "n/a"),
            Err(FieldParseError::NoNumber {
                field: "revenue",
                raw: "n/a".to_string()
            })
        );

        let huge = "9".repeat(400);
        assert!(matches!(
            extract_number("revenue", &huge),
            Err(FieldParseError::OutOfRange { .. })
        ));
    }

    #[test]
    fn header_normalization_ignores_case_subscripts_and_unit_spacing() {
        assert_eq!(
            normalizer::normalize_for_tests("\u{feff}Total  CO\u{2082} reduction (kg)"),
            "total co2 reduction(kg)"
        );
        assert_eq!(
            mapping::column_for_header("TOTAL CO2 REDUCTION(KG)"),
            Some(mapping::ReportColumn::Co2Reduction)
        );
    }

    #[test]
    fn importer_skips_title_row_and_reads_plants() {
        let report = YieldReportImporter::from_reader(Cursor::new(EXPORT)).expect("imports");

        assert_eq!(report.plants.len(), 2);
        let villa = &report.plants[0];
        assert_eq!(villa.name, "Main Villa");
        assert_eq!(villa.revenue, Some(8411.78));
        assert_eq!(villa.yield_kwh, Some(210_294.5));
        assert_eq!(villa.installed_power_kwp, Some(130.5));
        assert_eq!(villa.equivalent_hours, Some(1611.4));
        assert_eq!(villa.co2_reduction_kg, Some(96_735.47));
        assert!(report.issues.is_empty());
        assert_eq!(report.dropped_rows, 0);
    }

    #[test]
    fn importer_drops_unnamed_rows_and_records_bad_cells() {
        let csv = "Plant name,Total revenue,Total yield(kWh)\n\
Roof A,n/a,1200\n\
,100,50\n\
Roof B,,900\n";
        let report = YieldReportImporter::from_reader(Cursor::new(csv)).expect("imports");

        assert_eq!(report.plants.len(), 2);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.plants[0].revenue, None);
        assert_eq!(report.plants[0].yield_kwh, Some(1200.0));
        assert_eq!(report.plants[1].revenue, None);

        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.plant, "Roof A");
        assert_eq!(issue.column, "Total revenue");
        assert_eq!(issue.line, 2);
    }

    #[test]
    fn importer_requires_plant_name_header() {
        let err = YieldReportImporter::from_reader(Cursor::new("a,b\n1,2\n"))
            .expect_err("no header");
        assert!(matches!(err, YieldReportImportError::MissingHeader));
    }

    #[test]
    fn importer_ignores_title_cell_that_looks_like_a_column() {
        let csv = "Plant,Overview\n\
Plant name,Total revenue\n\
Roof A,120\n";
        let report = YieldReportImporter::from_reader(Cursor::new(csv)).expect("imports");

        assert_eq!(report.plants.len(), 1);
        assert_eq!(report.plants[0].name, "Roof A");
        assert_eq!(report.plants[0].revenue, Some(120.0));
    }

    #[test]
    fn importer_needs_a_second_known_column_beside_plant_name() {
        let err = YieldReportImporter::from_reader(Cursor::new("Plant name,Notes\nRoof A,x\n"))
            .expect_err("single column header");
        assert!(matches!(err, YieldReportImportError::MissingHeader));
    }

    #[test]
    fn workbook_extension_selects_the_sheet_reader() {
        assert!(is_workbook(Path::new("fleet/report.xlsx")));
        assert!(is_workbook(Path::new("REPORT.XLSX")));
        assert!(!is_workbook(Path::new("report.csv")));
        assert!(!is_workbook(Path::new("report")));
    }

    #[test]
    fn importer_from_path_propagates_io_errors() {
        let err = YieldReportImporter::from_path("./does-not-exist.csv").expect_err("io error");
        match err {
            YieldReportImportError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
