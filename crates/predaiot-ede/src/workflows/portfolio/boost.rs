use crate::workflows::decision::DecisionResult;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;

/// Figures available to a policy when it sizes one plant's uplift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostContext {
    pub revenue: f64,
    pub maintenance_cost: f64,
    pub financial_loss_without: f64,
    pub decision: DecisionResult,
}

/// Turns a classified plant into the multiplier applied to its metrics.
pub trait BoostPolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;
    fn boost(&self, context: &BoostContext) -> f64;
}

/// Uplift proportional to the share of the projected loss that is saved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioBoost {
    weight: f64,
}

impl RatioBoost {
    pub const DEFAULT_WEIGHT: f64 = 0.15;

    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl Default for RatioBoost {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WEIGHT)
    }
}

impl BoostPolicy for RatioBoost {
    fn name(&self) -> &'static str {
        BoostPolicyKind::Ratio.label()
    }

    fn boost(&self, context: &BoostContext) -> f64 {
        let savings = context.decision.savings;
        // Zero loss leaves the ratio undefined.
        if savings <= 0.0 || context.financial_loss_without == 0.0 {
            return 1.0;
        }

        1.0 + (savings / context.financial_loss_without) * self.weight
    }
}

/// Revenue threshold above which a tier's boost applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostTier {
    pub revenue_above: f64,
    pub boost: f64,
}

impl BoostTier {
    pub const fn new(revenue_above: f64, boost: f64) -> Self {
        Self {
            revenue_above,
            boost,
        }
    }
}

/// Fixed uplift looked up from revenue magnitude, ignoring the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct TieredBoost {
    tiers: Vec<BoostTier>,
    floor: f64,
}

impl TieredBoost {
    pub const DEFAULT_FLOOR: f64 = 1.12;

    pub fn new(mut tiers: Vec<BoostTier>, floor: f64) -> Self {
        tiers.sort_by(|a, b| b.revenue_above.total_cmp(&a.revenue_above));
        Self { tiers, floor }
    }

    pub fn standard() -> Self {
        Self::new(standard_tiers(), Self::DEFAULT_FLOOR)
    }

    /// Tiers ordered from the highest threshold down.
    pub fn tiers(&self) -> &[BoostTier] {
        &self.tiers
    }
}

impl BoostPolicy for TieredBoost {
    fn name(&self) -> &'static str {
        BoostPolicyKind::Tiered.label()
    }

    fn boost(&self, context: &BoostContext) -> f64 {
        self.tiers
            .iter()
            .find(|tier| context.revenue > tier.revenue_above)
            .map(|tier| tier.boost)
            .unwrap_or(self.floor)
    }
}

pub fn standard_tiers() -> Vec<BoostTier> {
    vec![
        BoostTier::new(5000.0, 1.25),
        BoostTier::new(200.0, 1.20),
        BoostTier::new(50.0, 1.16),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostPolicyKind {
    #[default]
    Ratio,
    Tiered,
}

impl BoostPolicyKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ratio => "ratio",
            Self::Tiered => "tiered",
        }
    }
}

impl FromStr for BoostPolicyKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ratio" => Ok(Self::Ratio),
            "tiered" | "tier" => Ok(Self::Tiered),
            other => Err(format!(
                "unknown boost policy '{other}' (expected 'ratio' or 'tiered')"
            )),
        }
    }
}

/// Parameters for both policies; `kind` picks the one that is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostSettings {
    pub kind: BoostPolicyKind,
    pub weight: f64,
    pub tiers: Vec<BoostTier>,
    pub floor: f64,
}

impl Default for BoostSettings {
    fn default() -> Self {
        Self {
            kind: BoostPolicyKind::Ratio,
            weight: RatioBoost::DEFAULT_WEIGHT,
            tiers: standard_tiers(),
            floor: TieredBoost::DEFAULT_FLOOR,
        }
    }
}

impl BoostSettings {
    pub fn with_kind(mut self, kind: BoostPolicyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn build(&self) -> Box<dyn BoostPolicy> {
        match self.kind {
            BoostPolicyKind::Ratio => Box::new(RatioBoost::new(self.weight)),
            BoostPolicyKind::Tiered => Box::new(TieredBoost::new(self.tiers.clone(), self.floor)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::decision::{classify, DecisionAction};

    fn context(revenue: f64, cost: f64, loss: f64) -> BoostContext {
        BoostContext {
            revenue,
            maintenance_cost: cost,
            financial_loss_without: loss,
            decision: classify(cost, loss).expect("classifies"),
        }
    }

    #[test]
    fn ratio_boost_scales_with_saved_share_of_loss() {
        let boost = RatioBoost::default().boost(&context(1000.0, 100.0, 200.0));
        assert!((boost - 1.075).abs() < 1e-12);
    }

    #[test]
    fn ratio_boost_for_postponed_work_uses_half_the_weight() {
        let boost = RatioBoost::default().boost(&context(0.0, 100.0, 60.0));
        assert!((boost - 1.075).abs() < 1e-12);
    }

    #[test]
    fn ratio_boost_is_neutral_without_savings() {
        let ctx = context(1000.0, 100.0, 40.0);
        assert_eq!(ctx.decision.action, DecisionAction::NoAction);
        assert_eq!(RatioBoost::default().boost(&ctx), 1.0);
    }

    #[test]
    fn ratio_boost_guards_zero_loss_even_with_savings() {
        let ctx = BoostContext {
            revenue: 0.0,
            maintenance_cost: 0.0,
            financial_loss_without: 0.0,
            decision: DecisionResult {
                action: DecisionAction::Execute,
                savings: 10.0,
            },
        };
        assert_eq!(RatioBoost::default().boost(&ctx), 1.0);
    }

    #[test]
    fn tiered_boost_uses_strict_thresholds() {
        let policy = TieredBoost::standard();
        let boost_for = |revenue: f64| policy.boost(&context(revenue, 0.0, 0.0));

        assert_eq!(boost_for(5000.01), 1.25);
        assert_eq!(boost_for(5000.0), 1.20);
        assert_eq!(boost_for(200.0), 1.16);
        assert_eq!(boost_for(50.0), 1.12);
        assert_eq!(boost_for(0.0), 1.12);
    }

    #[test]
    fn tiered_boost_sorts_unordered_tiers() {
        let policy = TieredBoost::new(
            vec![BoostTier::new(10.0, 1.1), BoostTier::new(100.0, 1.3)],
            1.0,
        );
        assert_eq!(policy.tiers()[0].revenue_above, 100.0);
        assert_eq!(policy.boost(&context(150.0, 0.0, 0.0)), 1.3);
        assert_eq!(policy.boost(&context(50.0, 0.0, 0.0)), 1.1);
        assert_eq!(policy.boost(&context(5.0, 0.0, 0.0)), 1.0);
    }

    #[test]
    fn settings_build_the_selected_policy() {
        let settings = BoostSettings::default();
        assert_eq!(settings.build().name(), "ratio");
        assert_eq!(
            settings.with_kind(BoostPolicyKind::Tiered).build().name(),
            "tiered"
        );
    }

    #[test]
    fn policy_kind_parses_case_insensitively() {
        assert_eq!("Tiered".parse::<BoostPolicyKind>(), Ok(BoostPolicyKind::Tiered));
        assert_eq!(" ratio ".parse::<BoostPolicyKind>(), Ok(BoostPolicyKind::Ratio));
        assert!("fixed".parse::<BoostPolicyKind>().is_err());
    }
}
