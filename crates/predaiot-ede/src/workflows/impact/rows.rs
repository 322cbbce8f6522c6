use crate::workflows::portfolio::{MetricProjection, ProjectedEntity};
use serde::Serialize;
use std::io::Write;

/// Spreadsheet tools detect UTF-8 from this prefix.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, thiserror::Error)]
pub enum ReportWriteError {
    #[error("failed to write impact report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode impact report row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to render impact chart: {0}")]
    Chart(String),
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for ReportWriteError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Self::Chart(err.to_string())
    }
}

/// Flat report row, one per projected plant. Missing metrics stay empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRow {
    #[serde(rename = "Plant name")]
    pub plant_name: String,
    #[serde(rename = "Decision")]
    pub decision: &'static str,
    #[serde(rename = "Savings")]
    pub savings: f64,
    #[serde(rename = "Boost")]
    pub boost: f64,
    #[serde(rename = "Installed_Power_kWp")]
    pub installed_power_kwp: Option<f64>,
    #[serde(rename = "Yield_Before_kWh")]
    pub yield_before_kwh: Option<f64>,
    #[serde(rename = "Yield_After_kWh")]
    pub yield_after_kwh: Option<f64>,
    #[serde(rename = "Yield_Gain_kWh")]
    pub yield_gain_kwh: Option<f64>,
    #[serde(rename = "Equivalent_Hours_Before")]
    pub equivalent_hours_before: Option<f64>,
    #[serde(rename = "Equivalent_Hours_After")]
    pub equivalent_hours_after: Option<f64>,
    #[serde(rename = "Equivalent_Hours_Gain")]
    pub equivalent_hours_gain: Option<f64>,
    #[serde(rename = "Revenue_Before_OMR")]
    pub revenue_before_omr: f64,
    #[serde(rename = "Revenue_After_OMR")]
    pub revenue_after_omr: f64,
    #[serde(rename = "Revenue_Gain_OMR")]
    pub revenue_gain_omr: f64,
    #[serde(rename = "CO2_Before_kg")]
    pub co2_before_kg: Option<f64>,
    #[serde(rename = "CO2_After_kg")]
    pub co2_after_kg: Option<f64>,
    #[serde(rename = "CO2_Gain_kg")]
    pub co2_gain_kg: Option<f64>,
}

impl ImpactRow {
    pub fn from_entity(entity: &ProjectedEntity) -> Self {
        let split = |metric: Option<MetricProjection>| match metric {
            Some(metric) => (Some(metric.before), Some(metric.after), Some(metric.gain)),
            None => (None, None, None),
        };
        let (yield_before_kwh, yield_after_kwh, yield_gain_kwh) = split(entity.yield_kwh);
        let (equivalent_hours_before, equivalent_hours_after, equivalent_hours_gain) =
            split(entity.equivalent_hours);
        let (co2_before_kg, co2_after_kg, co2_gain_kg) = split(entity.co2_reduction_kg);

        Self {
            plant_name: entity.name.clone(),
            decision: entity.decision.action.label(),
            savings: entity.decision.savings,
            boost: entity.boost,
            installed_power_kwp: entity.installed_power_kwp,
            yield_before_kwh,
            yield_after_kwh,
            yield_gain_kwh,
            equivalent_hours_before,
            equivalent_hours_after,
            equivalent_hours_gain,
            revenue_before_omr: entity.revenue.before,
            revenue_after_omr: entity.revenue.after,
            revenue_gain_omr: entity.revenue.gain,
            co2_before_kg,
            co2_after_kg,
            co2_gain_kg,
        }
    }
}

/// Writes a BOM-prefixed CSV table. The header row is written even when
/// there are no rows.
pub fn write_csv<W: Write>(mut writer: W, rows: &[ImpactRow]) -> Result<(), ReportWriteError> {
    writer.write_all(UTF8_BOM)?;
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(HEADERS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

const HEADERS: [&str; 17] = [
    "Plant name",
    "Decision",
    "Savings",
    "Boost",
    "Installed_Power_kWp",
    "Yield_Before_kWh",
    "Yield_After_kWh",
    "Yield_Gain_kWh",
    "Equivalent_Hours_Before",
    "Equivalent_Hours_After",
    "Equivalent_Hours_Gain",
    "Revenue_Before_OMR",
    "Revenue_After_OMR",
    "Revenue_Gain_OMR",
    "CO2_Before_kg",
    "CO2_After_kg",
    "CO2_Gain_kg",
];
