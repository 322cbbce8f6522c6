mod boost;
pub mod domain;

pub use boost::{
    standard_tiers, BoostContext, BoostPolicy, BoostPolicyKind, BoostSettings, BoostTier,
    RatioBoost, TieredBoost,
};
pub use domain::{
    MetricProjection, PlantRecord, PortfolioProjection, ProjectedEntity, SkipReason,
    SkippedEntity,
};

use crate::workflows::decision::classify;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Revenue shares used to derive the decision inputs for each plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub cost_fraction: f64,
    pub loss_fraction: f64,
    pub boost: BoostSettings,
}

impl PortfolioConfig {
    pub const DEFAULT_COST_FRACTION: f64 = 0.1;
    pub const DEFAULT_LOSS_FRACTION: f64 = 0.2;
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            cost_fraction: Self::DEFAULT_COST_FRACTION,
            loss_fraction: Self::DEFAULT_LOSS_FRACTION,
            boost: BoostSettings::default(),
        }
    }
}

/// Runs the decision engine across a fleet and projects each plant's metrics.
#[derive(Debug)]
pub struct PortfolioApplier {
    cost_fraction: f64,
    loss_fraction: f64,
    policy: Box<dyn BoostPolicy>,
}

impl PortfolioApplier {
    pub fn new(cost_fraction: f64, loss_fraction: f64, policy: Box<dyn BoostPolicy>) -> Self {
        Self {
            cost_fraction,
            loss_fraction,
            policy,
        }
    }

    pub fn from_config(config: &PortfolioConfig) -> Self {
        Self::new(
            config.cost_fraction,
            config.loss_fraction,
            config.boost.build(),
        )
    }

    /// Projects every plant in order. Plants without a usable revenue figure
    /// are reported in `skipped` instead of carrying NaN into the totals.
    pub fn apply(&self, plants: &[PlantRecord]) -> PortfolioProjection {
        let mut entities = Vec::with_capacity(plants.len());
        let mut skipped = Vec::new();

        for (position, plant) in plants.iter().enumerate() {
            match self.project(plant) {
                Ok(entity) => {
                    debug!(
                        plant = %entity.name,
                        decision = %entity.decision.action,
                        boost = entity.boost,
                        "plant projected"
                    );
                    entities.push(entity);
                }
                Err(reason) => {
                    warn!(
                        plant = %plant.name,
                        position,
                        reason = %reason.summary(),
                        "plant skipped"
                    );
                    skipped.push(SkippedEntity {
                        position,
                        name: plant.name.clone(),
                        reason,
                    });
                }
            }
        }

        PortfolioProjection {
            policy: self.policy.name().to_string(),
            entities,
            skipped,
        }
    }

    pub fn project(&self, plant: &PlantRecord) -> Result<ProjectedEntity, SkipReason> {
        let revenue = plant.revenue.ok_or(SkipReason::MissingRevenue)?;
        let maintenance_cost = revenue * self.cost_fraction;
        let financial_loss_without = revenue * self.loss_fraction;

        let decision = classify(maintenance_cost, financial_loss_without).map_err(|err| {
            SkipReason::InvalidFigures {
                detail: err.to_string(),
            }
        })?;

        let boost = self.policy.boost(&BoostContext {
            revenue,
            maintenance_cost,
            financial_loss_without,
            decision,
        });
        if !boost.is_finite() {
            return Err(SkipReason::InvalidFigures {
                detail: format!("{} policy produced boost {boost}", self.policy.name()),
            });
        }

        // Huge figures can still overflow once multiplied.
        let boosted = |metric: &str, before: f64| -> Result<MetricProjection, SkipReason> {
            let projection = MetricProjection::boosted(before, boost);
            if projection.after.is_finite() && projection.gain.is_finite() {
                Ok(projection)
            } else {
                Err(SkipReason::InvalidFigures {
                    detail: format!("{metric} {before} overflows when boosted by {boost}"),
                })
            }
        };
        let optional = |metric: &str, value: Option<f64>| {
            value.map(|before| boosted(metric, before)).transpose()
        };

        Ok(ProjectedEntity {
            name: plant.name.clone(),
            maintenance_cost,
            financial_loss_without,
            decision,
            boost,
            revenue: boosted("revenue", revenue)?,
            yield_kwh: optional("yield", plant.yield_kwh)?,
            equivalent_hours: optional("equivalent hours", plant.equivalent_hours)?,
            co2_reduction_kg: optional("CO2 reduction", plant.co2_reduction_kg)?,
            installed_power_kwp: plant.installed_power_kwp,
        })
    }
}

impl Default for PortfolioApplier {
    fn default() -> Self {
        Self::from_config(&PortfolioConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::decision::DecisionAction;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn reference_plant_projects_with_ratio_boost() {
        let applier = PortfolioApplier::default();
        let plant = PlantRecord::new("Main Villa")
            .with_revenue(1000.0)
            .with_yield(500.0);

        let entity = applier.project(&plant).expect("projects");
        assert!(approx(entity.maintenance_cost, 100.0));
        assert!(approx(entity.financial_loss_without, 200.0));
        assert_eq!(entity.decision.action, DecisionAction::Execute);
        assert!(approx(entity.decision.savings, 100.0));
        assert!(approx(entity.boost, 1.075));

        let yield_kwh = entity.yield_kwh.expect("yield projected");
        assert_eq!(yield_kwh.before, 500.0);
        assert!(approx(yield_kwh.after, 537.5));
        assert!(approx(yield_kwh.gain, 37.5));
        assert!(approx(entity.revenue.after, 1075.0));
    }

    #[test]
    fn apply_preserves_input_order_and_duplicate_names() {
        let applier = PortfolioApplier::default();
        let plants = vec![
            PlantRecord::new("Plant B").with_revenue(10.0),
            PlantRecord::new("Plant A").with_revenue(20.0),
            PlantRecord::new("Plant B").with_revenue(30.0),
        ];

        let projection = applier.apply(&plants);
        let revenues: Vec<f64> = projection
            .entities
            .iter()
            .map(|entity| entity.revenue.before)
            .collect();
        assert_eq!(revenues, vec![10.0, 20.0, 30.0]);
        assert_eq!(projection.entities[0].name, "Plant B");
        assert_eq!(projection.entities[2].name, "Plant B");
    }

    #[test]
    fn plants_without_revenue_are_skipped() {
        let applier = PortfolioApplier::default();
        let plants = vec![
            PlantRecord::new("Known").with_revenue(100.0),
            PlantRecord::new("Unknown").with_yield(42.0),
        ];

        let projection = applier.apply(&plants);
        assert_eq!(projection.entities.len(), 1);
        assert_eq!(projection.skipped.len(), 1);
        assert_eq!(projection.skipped[0].position, 1);
        assert_eq!(projection.skipped[0].reason, SkipReason::MissingRevenue);
    }

    #[test]
    fn non_finite_revenue_is_skipped_as_invalid() {
        let applier = PortfolioApplier::default();
        let plant = PlantRecord::new("Overflow").with_revenue(f64::INFINITY);

        let reason = applier.project(&plant).expect_err("skipped");
        assert!(matches!(reason, SkipReason::InvalidFigures { .. }));
    }

    #[test]
    fn metric_overflowing_after_boost_is_skipped_as_invalid() {
        let applier = PortfolioApplier::default();
        let plant = PlantRecord::new("Giant")
            .with_revenue(1000.0)
            .with_yield(1.797e308);

        match applier.project(&plant) {
            Err(SkipReason::InvalidFigures { detail }) => assert!(detail.contains("yield")),
            other => panic!("expected invalid figures, got {other:?}"),
        }

        let projection = applier.apply(&[plant, PlantRecord::new("Small").with_revenue(10.0)]);
        assert_eq!(projection.entities.len(), 1);
        assert_eq!(projection.skipped[0].name, "Giant");
        assert!(projection
            .entities
            .iter()
            .all(|entity| entity.revenue.after.is_finite()));
    }

    #[test]
    fn zero_revenue_projects_without_boost() {
        let applier = PortfolioApplier::default();
        let plant = PlantRecord::new("Idle").with_revenue(0.0).with_yield(10.0);

        let entity = applier.project(&plant).expect("projects");
        assert_eq!(entity.decision.action, DecisionAction::NoAction);
        assert_eq!(entity.boost, 1.0);
        assert_eq!(entity.yield_kwh.expect("yield").gain, 0.0);
    }

    #[test]
    fn missing_optional_metrics_stay_missing() {
        let applier = PortfolioApplier::default();
        let plant = PlantRecord::new("Sparse").with_revenue(100.0);

        let entity = applier.project(&plant).expect("projects");
        assert!(entity.yield_kwh.is_none());
        assert!(entity.equivalent_hours.is_none());
        assert!(entity.co2_reduction_kg.is_none());
        assert!(entity.installed_power_kwp.is_none());
    }

    #[test]
    fn tiered_policy_applies_boost_to_every_metric() {
        let config = PortfolioConfig {
            boost: BoostSettings::default().with_kind(BoostPolicyKind::Tiered),
            ..PortfolioConfig::default()
        };
        let applier = PortfolioApplier::from_config(&config);
        let plant = PlantRecord::new("Main Villa")
            .with_revenue(8000.0)
            .with_yield(210_000.0)
            .with_equivalent_hours(1600.0)
            .with_co2_reduction(100_000.0)
            .with_installed_power(130.0);

        let projection = applier.apply(std::slice::from_ref(&plant));
        assert_eq!(projection.policy, "tiered");
        let entity = &projection.entities[0];
        assert_eq!(entity.boost, 1.25);
        assert!(approx(entity.yield_kwh.expect("yield").after, 262_500.0));
        assert!(approx(entity.equivalent_hours.expect("hours").after, 2000.0));
        assert!(approx(entity.co2_reduction_kg.expect("co2").gain, 25_000.0));
        assert_eq!(entity.installed_power_kwp, Some(130.0));
    }

    #[test]
    fn fractions_are_configurable() {
        let applier = PortfolioApplier::new(0.3, 0.2, Box::new(RatioBoost::default()));
        let entity = applier
            .project(&PlantRecord::new("Costly").with_revenue(1000.0))
            .expect("projects");

        assert_eq!(entity.decision.action, DecisionAction::Postpone);
        assert!(approx(entity.decision.savings, 100.0));
        assert!(approx(entity.boost, 1.075));
    }
}
