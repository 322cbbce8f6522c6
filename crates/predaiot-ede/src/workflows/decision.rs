use serde::{Deserialize, Serialize};

/// Share of the maintenance cost the projected loss must exceed before a
/// deferred intervention is worth scheduling.
const POSTPONE_LOSS_SHARE: f64 = 0.5;

/// Portion of the projected loss credited as savings when work is postponed.
const POSTPONE_SAVINGS_SHARE: f64 = 0.5;

/// Recommended maintenance action for a single plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    Execute,
    Postpone,
    NoAction,
}

impl DecisionAction {
    /// Ordered from least to most urgent.
    pub const fn ordered() -> [Self; 3] {
        [Self::NoAction, Self::Postpone, Self::Execute]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Execute => "EXECUTE",
            Self::Postpone => "POSTPONE",
            Self::NoAction => "NO_ACTION",
        }
    }

    pub const fn urgency(self) -> u8 {
        match self {
            Self::NoAction => 0,
            Self::Postpone => 1,
            Self::Execute => 2,
        }
    }
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Financial figures the engine weighs for one decision.
///
/// Missing JSON fields default to zero so hand-written input files can omit
/// either figure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionInput {
    #[serde(default)]
    pub maintenance_cost: f64,
    #[serde(default)]
    pub financial_loss_without: f64,
}

impl DecisionInput {
    pub fn decide(&self) -> Result<DecisionResult, DecisionError> {
        classify(self.maintenance_cost, self.financial_loss_without)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    #[serde(rename = "decision")]
    pub action: DecisionAction,
    pub savings: f64,
}

impl DecisionResult {
    const fn no_action() -> Self {
        Self {
            action: DecisionAction::NoAction,
            savings: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error("invalid input: {field} must be a finite number (got {value})")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Economic Decision Engine.
///
/// Bands are checked in order with strict comparisons, so a loss equal to the
/// cost is postponed rather than executed and a loss equal to half the cost
/// needs no action. Negative figures are classified as given.
pub fn classify(
    maintenance_cost: f64,
    financial_loss_without: f64,
) -> Result<DecisionResult, DecisionError> {
    ensure_finite("maintenance_cost", maintenance_cost)?;
    ensure_finite("financial_loss_without", financial_loss_without)?;

    if financial_loss_without > maintenance_cost {
        return Ok(DecisionResult {
            action: DecisionAction::Execute,
            savings: financial_loss_without - maintenance_cost,
        });
    }

    if financial_loss_without > POSTPONE_LOSS_SHARE * maintenance_cost {
        return Ok(DecisionResult {
            action: DecisionAction::Postpone,
            savings: financial_loss_without * POSTPONE_SAVINGS_SHARE,
        });
    }

    Ok(DecisionResult::no_action())
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), DecisionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DecisionError::InvalidInput { field, value })
    }
}
