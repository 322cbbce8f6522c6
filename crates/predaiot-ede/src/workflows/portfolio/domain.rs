use crate::workflows::decision::{DecisionAction, DecisionResult};
use serde::{Deserialize, Serialize};

/// One plant row as handed over by ingestion.
///
/// Numeric fields are `None` when the source cell was empty or carried no
/// number; the applier decides what a missing figure means.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlantRecord {
    pub name: String,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub yield_kwh: Option<f64>,
    #[serde(default)]
    pub installed_power_kwp: Option<f64>,
    #[serde(default)]
    pub equivalent_hours: Option<f64>,
    #[serde(default)]
    pub co2_reduction_kg: Option<f64>,
}

impl PlantRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }

    pub fn with_yield(mut self, yield_kwh: f64) -> Self {
        self.yield_kwh = Some(yield_kwh);
        self
    }

    pub fn with_installed_power(mut self, installed_power_kwp: f64) -> Self {
        self.installed_power_kwp = Some(installed_power_kwp);
        self
    }

    pub fn with_equivalent_hours(mut self, equivalent_hours: f64) -> Self {
        self.equivalent_hours = Some(equivalent_hours);
        self
    }

    pub fn with_co2_reduction(mut self, co2_reduction_kg: f64) -> Self {
        self.co2_reduction_kg = Some(co2_reduction_kg);
        self
    }
}

/// Before/after pair for one boosted metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricProjection {
    pub before: f64,
    pub after: f64,
    pub gain: f64,
}

impl MetricProjection {
    pub fn boosted(before: f64, boost: f64) -> Self {
        let after = before * boost;
        Self {
            before,
            after,
            gain: after - before,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedEntity {
    pub name: String,
    pub maintenance_cost: f64,
    pub financial_loss_without: f64,
    pub decision: DecisionResult,
    pub boost: f64,
    pub revenue: MetricProjection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_kwh: Option<MetricProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equivalent_hours: Option<MetricProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_reduction_kg: Option<MetricProjection>,
    /// Capacity does not change with maintenance; carried for reporting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_power_kwp: Option<f64>,
}

impl ProjectedEntity {
    pub fn action(&self) -> DecisionAction {
        self.decision.action
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingRevenue,
    InvalidFigures { detail: String },
}

impl SkipReason {
    pub fn summary(&self) -> String {
        match self {
            SkipReason::MissingRevenue => "revenue missing or unparseable".to_string(),
            SkipReason::InvalidFigures { detail } => format!("invalid figures: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntity {
    /// Zero-based position in the applier input.
    pub position: usize,
    pub name: String,
    pub reason: SkipReason,
}

/// Applier output: projected plants in input order plus the ones left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioProjection {
    pub policy: String,
    pub entities: Vec<ProjectedEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntity>,
}

impl PortfolioProjection {
    pub fn count(&self, action: DecisionAction) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.action() == action)
            .count()
    }
}
