use crate::infra::{parse_date, parse_policy};
use chrono::{Local, NaiveDate};
use clap::Args;
use predaiot_ede::config::AppConfig;
use predaiot_ede::error::AppError;
use predaiot_ede::telemetry;
use predaiot_ede::workflows::decision::{DecisionInput, DecisionResult};
use predaiot_ede::workflows::delivery::{
    DeliveryConfig, OutboxDispatcher, ReportAttachment, ReportDispatcher, SmtpDispatcher,
};
use predaiot_ede::workflows::pipeline::{
    ImpactPipeline, ImpactRun, PipelineError, REPORT_FILE_NAME,
};
use predaiot_ede::workflows::portfolio::BoostPolicyKind;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct DecideArgs {
    /// JSON file with `maintenance_cost` and `financial_loss_without`
    #[arg(default_value = "input.json")]
    pub(crate) input: PathBuf,
    /// Where the decision JSON is written
    #[arg(default_value = "output.json")]
    pub(crate) output: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct PortfolioArgs {
    /// Plant yield export to project (CSV, or an .xlsx workbook)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Where the impact report CSV is written
    #[arg(long, default_value = REPORT_FILE_NAME)]
    pub(crate) output: PathBuf,
    /// Boost policy override: ratio or tiered
    #[arg(long, value_parser = parse_policy)]
    pub(crate) policy: Option<BoostPolicyKind>,
    /// Stage the report for delivery to the configured recipients
    #[arg(long)]
    pub(crate) deliver: bool,
    /// Stage in this outbox directory even when EDE_SMTP_HOST is set
    #[arg(long)]
    pub(crate) outbox: Option<PathBuf>,
    /// Extra files attached alongside the report and charts when delivering
    #[arg(long = "attach")]
    pub(crate) attachments: Vec<PathBuf>,
    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) fn run_decide(args: DecideArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let result = decide_file(&args.input, &args.output)?;
    info!(
        decision = %result.action,
        savings = result.savings,
        output = %args.output.display(),
        "decision made"
    );
    println!(
        "Decision made: {} (savings {:.2}) -> {}",
        result.action,
        result.savings,
        args.output.display()
    );
    Ok(())
}

fn decide_file(input: &Path, output: &Path) -> Result<DecisionResult, AppError> {
    let raw = std::fs::read_to_string(input)?;
    let request: DecisionInput = serde_json::from_str(&raw)?;
    let result = request.decide()?;
    std::fs::write(output, serde_json::to_string_pretty(&result)?)?;
    Ok(result)
}

pub(crate) fn run_portfolio(args: PortfolioArgs) -> Result<(), AppError> {
    let PortfolioArgs {
        input,
        output,
        policy,
        deliver,
        outbox,
        attachments,
        date,
    } = args;

    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    if let Some(kind) = policy {
        config.portfolio.boost.kind = kind;
    }
    if let Some(outbox) = outbox {
        config.delivery.outbox_dir = outbox;
        config.delivery.smtp = None;
    }

    let pipeline = ImpactPipeline::from_config(&config.portfolio);
    let run = pipeline.run_path(&input)?;
    run.write_csv_to(&output)?;
    render_summary(&run, &output);

    if !deliver {
        return Ok(());
    }

    let extras = attachments
        .iter()
        .map(|path| ReportAttachment::from_path(path))
        .collect::<Result<Vec<_>, _>>()
        .map_err(PipelineError::from)?;
    let dispatcher = dispatcher_for(&config.delivery);
    let generated_on = date.unwrap_or_else(|| Local::now().date_naive());
    let receipt = pipeline.deliver(
        &run,
        dispatcher.as_ref(),
        &config.delivery,
        generated_on,
        extras,
    )?;

    println!(
        "\nReport delivered to {} recipient(s) via {}",
        config.delivery.recipients.len(),
        receipt.location
    );
    Ok(())
}

fn dispatcher_for(config: &DeliveryConfig) -> Box<dyn ReportDispatcher> {
    match &config.smtp {
        Some(smtp) => Box::new(SmtpDispatcher::new(smtp.clone())),
        None => Box::new(OutboxDispatcher::new(&config.outbox_dir)),
    }
}

fn render_summary(run: &ImpactRun, output: &Path) {
    let summary = &run.summary;
    println!("PredAIoT + EDE impact report ({} boost)", summary.policy);
    println!(
        "- {} plant(s) projected | {} skipped | {} row(s) without a plant name",
        summary.plants, summary.skipped, run.import.dropped_rows
    );
    for line in summary.highlights() {
        println!("- {line}");
    }

    if !run.projection.skipped.is_empty() {
        println!("Skipped plants:");
        for skipped in &run.projection.skipped {
            println!(
                "  - row {}: {} ({})",
                skipped.position + 1,
                skipped.name,
                skipped.reason.summary()
            );
        }
    }

    if !run.import.issues.is_empty() {
        println!("Unreadable cells:");
        for issue in &run.import.issues {
            println!("  - line {} {}: {}", issue.line, issue.plant, issue.error);
        }
    }

    println!("Report written to {}", output.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use predaiot_ede::workflows::decision::DecisionAction;
    use predaiot_ede::workflows::delivery::SmtpConfig;

    #[test]
    fn dispatcher_prefers_smtp_relay_when_configured() {
        let mut config = DeliveryConfig::default();
        assert!(format!("{:?}", dispatcher_for(&config)).starts_with("OutboxDispatcher"));

        config.smtp = Some(SmtpConfig::new("smtp.example.com"));
        assert!(format!("{:?}", dispatcher_for(&config)).starts_with("SmtpDispatcher"));
    }

    #[test]
    fn decide_file_round_trips_through_json_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("input.json");
        let output = dir.path().join("output.json");
        std::fs::write(&input, r#"{"maintenance_cost": 100, "financial_loss_without": 70}"#)
            .expect("input written");

        let result = decide_file(&input, &output).expect("decision made");
        assert_eq!(result.action, DecisionAction::Postpone);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("output readable"))
                .expect("output is json");
        assert_eq!(written["decision"], "POSTPONE");
        assert_eq!(written["savings"], 35.0);
    }

    #[test]
    fn decide_file_defaults_missing_fields_to_zero() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("input.json");
        let output = dir.path().join("output.json");
        std::fs::write(&input, "{}").expect("input written");

        let result = decide_file(&input, &output).expect("decision made");
        assert_eq!(result.action, DecisionAction::NoAction);
        assert_eq!(result.savings, 0.0);
    }

    #[test]
    fn decide_file_rejects_malformed_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("input.json");
        std::fs::write(&input, "maintenance_cost=100").expect("input written");

        let err = decide_file(&input, &dir.path().join("output.json")).expect_err("bad json");
        assert!(matches!(err, AppError::Encoding(_)));
        assert!(!dir.path().join("output.json").exists());
    }
}
