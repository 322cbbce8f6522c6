use super::normalizer::normalize_header;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Columns of the plant yield export the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ReportColumn {
    PlantName,
    TotalYield,
    TotalRevenue,
    InstalledPower,
    EquivalentHours,
    Co2Reduction,
}

impl ReportColumn {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::PlantName => "Plant name",
            Self::TotalYield => "Total yield(kWh)",
            Self::TotalRevenue => "Total revenue",
            Self::InstalledPower => "Installed power(kWp)",
            Self::EquivalentHours => "Equivalent hours(h)",
            Self::Co2Reduction => "Total CO\u{2082} reduction(kg)",
        }
    }
}

static HEADER_MAP: OnceLock<HashMap<String, ReportColumn>> = OnceLock::new();

pub(crate) fn column_for_header(header: &str) -> Option<ReportColumn> {
    header_map().get(&normalize_header(header)).copied()
}

fn header_map() -> &'static HashMap<String, ReportColumn> {
    HEADER_MAP.get_or_init(|| {
        const HEADER_TO_COLUMN: &[(&str, ReportColumn)] = &[
            ("Plant name", ReportColumn::PlantName),
            ("Plant", ReportColumn::PlantName),
            ("Total yield(kWh)", ReportColumn::TotalYield),
            ("Yield(kWh)", ReportColumn::TotalYield),
            ("Total revenue", ReportColumn::TotalRevenue),
            ("Total revenue(OMR)", ReportColumn::TotalRevenue),
            ("Revenue", ReportColumn::TotalRevenue),
            ("Installed power(kWp)", ReportColumn::InstalledPower),
            ("Installed capacity(kWp)", ReportColumn::InstalledPower),
            ("Equivalent hours(h)", ReportColumn::EquivalentHours),
            ("Equivalent hours", ReportColumn::EquivalentHours),
            ("Total CO\u{2082} reduction(kg)", ReportColumn::Co2Reduction),
            ("CO\u{2082} reduction(kg)", ReportColumn::Co2Reduction),
        ];

        let mut map = HashMap::with_capacity(HEADER_TO_COLUMN.len());
        for (header, column) in HEADER_TO_COLUMN {
            map.insert(normalize_header(header), *column);
        }
        map
    })
}
