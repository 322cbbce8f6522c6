mod chart;
mod rows;
mod summary;

pub use chart::{before_after_chart_svg, gain_chart_svg};
pub use rows::{write_csv, ImpactRow, ReportWriteError};
pub use summary::{ActionCount, ImpactSummary, MetricTotals, PlantHighlight};
