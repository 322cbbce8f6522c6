use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use predaiot_ede::workflows::portfolio::{BoostPolicyKind, PortfolioConfig};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Portfolio settings loaded at startup; requests may override the policy.
#[derive(Debug, Clone)]
pub(crate) struct ProjectionDefaults {
    pub(crate) portfolio: Arc<PortfolioConfig>,
}

impl ProjectionDefaults {
    pub(crate) fn new(portfolio: PortfolioConfig) -> Self {
        Self {
            portfolio: Arc::new(portfolio),
        }
    }

    pub(crate) fn with_policy(&self, policy: Option<BoostPolicyKind>) -> PortfolioConfig {
        let mut config = (*self.portfolio).clone();
        if let Some(kind) = policy {
            config.boost.kind = kind;
        }
        config
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_policy(raw: &str) -> Result<BoostPolicyKind, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_policy_overrides_only_the_kind() {
        let defaults = ProjectionDefaults::new(PortfolioConfig {
            cost_fraction: 0.05,
            ..PortfolioConfig::default()
        });

        let config = defaults.with_policy(Some(BoostPolicyKind::Tiered));
        assert_eq!(config.boost.kind, BoostPolicyKind::Tiered);
        assert_eq!(config.cost_fraction, 0.05);
        assert_eq!(defaults.with_policy(None), *defaults.portfolio);
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert_eq!(
            parse_date(" 2025-11-30 "),
            Ok(NaiveDate::from_ymd_opt(2025, 11, 30).expect("valid date"))
        );
        assert!(parse_date("30/11/2025").is_err());
    }
}
