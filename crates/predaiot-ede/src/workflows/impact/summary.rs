use crate::workflows::decision::DecisionAction;
use crate::workflows::portfolio::{
    MetricProjection, PortfolioProjection, ProjectedEntity, SkipReason,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricTotals {
    pub before: f64,
    pub after: f64,
    pub gain: f64,
    /// Plants that reported this metric.
    pub plants: usize,
}

impl MetricTotals {
    fn collect<'a>(metrics: impl Iterator<Item = Option<&'a MetricProjection>>) -> Self {
        metrics.flatten().fold(Self::default(), |mut totals, metric| {
            totals.before += metric.before;
            totals.after += metric.after;
            totals.gain += metric.gain;
            totals.plants += 1;
            totals
        })
    }

    pub fn percent_change(&self) -> Option<f64> {
        (self.before != 0.0).then(|| self.gain / self.before * 100.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionCount {
    pub action: DecisionAction,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantHighlight {
    pub plant: String,
    pub value: f64,
}

/// Fleet-level roll-up of a projection, used for the report body and the API.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactSummary {
    pub policy: String,
    pub plants: usize,
    pub skipped: usize,
    /// Skipped plants split by reason.
    pub skipped_missing_revenue: usize,
    pub skipped_invalid_figures: usize,
    pub actions: Vec<ActionCount>,
    pub total_savings: f64,
    pub yield_kwh: MetricTotals,
    pub revenue_omr: MetricTotals,
    pub equivalent_hours: MetricTotals,
    pub co2_reduction_kg: MetricTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_boost: Option<PlantHighlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_yield_gain: Option<PlantHighlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_revenue_gain: Option<PlantHighlight>,
}

impl ImpactSummary {
    pub fn from_projection(projection: &PortfolioProjection) -> Self {
        let entities = &projection.entities;

        let actions = DecisionAction::ordered()
            .into_iter()
            .rev()
            .map(|action| ActionCount {
                action,
                label: action.label(),
                count: projection.count(action),
            })
            .collect();

        let skipped_missing_revenue = projection
            .skipped
            .iter()
            .filter(|entry| entry.reason == SkipReason::MissingRevenue)
            .count();

        Self {
            policy: projection.policy.clone(),
            plants: entities.len(),
            skipped: projection.skipped.len(),
            skipped_missing_revenue,
            skipped_invalid_figures: projection.skipped.len() - skipped_missing_revenue,
            actions,
            total_savings: entities.iter().map(|entity| entity.decision.savings).sum(),
            yield_kwh: MetricTotals::collect(entities.iter().map(|e| e.yield_kwh.as_ref())),
            revenue_omr: MetricTotals::collect(entities.iter().map(|e| Some(&e.revenue))),
            equivalent_hours: MetricTotals::collect(
                entities.iter().map(|e| e.equivalent_hours.as_ref()),
            ),
            co2_reduction_kg: MetricTotals::collect(
                entities.iter().map(|e| e.co2_reduction_kg.as_ref()),
            ),
            largest_boost: top_plant(entities, |entity| Some(entity.boost)),
            top_yield_gain: top_plant(entities, |entity| entity.yield_kwh.map(|m| m.gain)),
            top_revenue_gain: top_plant(entities, |entity| Some(entity.revenue.gain)),
        }
    }

    pub fn count(&self, action: DecisionAction) -> usize {
        self.actions
            .iter()
            .find(|entry| entry.action == action)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// Short statements suitable for a report body, most significant first.
    pub fn highlights(&self) -> Vec<String> {
        if self.plants == 0 {
            let mut lines = vec!["No plants could be projected from the yield report".to_string()];
            lines.extend(self.skipped_line());
            return lines;
        }

        let mut lines = Vec::new();

        match &self.largest_boost {
            Some(boost) if boost.value > 1.0 => lines.push(format!(
                "Up to +{:.1}% uplift ({})",
                (boost.value - 1.0) * 100.0,
                boost.plant
            )),
            _ => lines.push("No plant received an uplift".to_string()),
        }

        if let Some(top) = &self.top_yield_gain {
            lines.push(format!(
                "Largest yield gain: {} +{:.0} kWh",
                top.plant, top.value
            ));
        }

        if self.yield_kwh.plants > 0 {
            lines.push(format!(
                "Fleet yield +{:.0} kWh{}",
                self.yield_kwh.gain,
                percent_suffix(&self.yield_kwh)
            ));
        }

        lines.push(format!(
            "Revenue +{:.2} OMR across {} plant(s){}",
            self.revenue_omr.gain,
            self.plants,
            percent_suffix(&self.revenue_omr)
        ));

        if self.co2_reduction_kg.plants > 0 {
            lines.push(format!(
                "CO\u{2082} reduction +{:.0} kg",
                self.co2_reduction_kg.gain
            ));
        }

        let decisions = self
            .actions
            .iter()
            .map(|entry| format!("{} {}", entry.count, entry.label))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Decisions: {decisions}"));
        lines.extend(self.skipped_line());

        lines
    }

    fn skipped_line(&self) -> Option<String> {
        if self.skipped == 0 {
            return None;
        }

        let mut reasons = Vec::new();
        if self.skipped_missing_revenue > 0 {
            reasons.push(format!("{} missing revenue", self.skipped_missing_revenue));
        }
        if self.skipped_invalid_figures > 0 {
            reasons.push(format!("{} invalid figures", self.skipped_invalid_figures));
        }
        Some(format!(
            "{} plant(s) skipped ({})",
            self.skipped,
            reasons.join(", ")
        ))
    }
}

fn percent_suffix(totals: &MetricTotals) -> String {
    match totals.percent_change() {
        Some(pct) => format!(" ({pct:+.1}%)"),
        None => String::new(),
    }
}

fn top_plant<F>(entities: &[ProjectedEntity], value: F) -> Option<PlantHighlight>
where
    F: Fn(&ProjectedEntity) -> Option<f64>,
{
    entities
        .iter()
        .filter_map(|entity| value(entity).map(|v| (entity, v)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(entity, value)| PlantHighlight {
            plant: entity.name.clone(),
            value,
        })
}
