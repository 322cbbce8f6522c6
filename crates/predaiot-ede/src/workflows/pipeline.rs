use crate::workflows::delivery::{
    DeliveryConfig, DispatchError, DispatchReceipt, ReportAttachment, ReportDispatcher,
    ReportEnvelope,
};
use crate::workflows::impact::{
    before_after_chart_svg, gain_chart_svg, write_csv, ImpactRow, ImpactSummary,
    ReportWriteError,
};
use crate::workflows::portfolio::{PortfolioApplier, PortfolioConfig, PortfolioProjection};
use crate::workflows::yield_report::{YieldReport, YieldReportImportError, YieldReportImporter};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub const REPORT_FILE_NAME: &str = "PredAIoT_Impact_Report.csv";
pub const GAIN_CHART_FILE_NAME: &str = "PredAIoT_Gain_Chart.svg";
pub const BEFORE_AFTER_CHART_FILE_NAME: &str = "PredAIoT_Before_After_Chart.svg";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Import(#[from] YieldReportImportError),
    #[error(transparent)]
    Write(#[from] ReportWriteError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Ingestion, projection and reporting wired together. Readers and
/// dispatchers are passed in so every stage runs without touching disk.
#[derive(Debug)]
pub struct ImpactPipeline {
    applier: PortfolioApplier,
}

impl ImpactPipeline {
    pub fn new(applier: PortfolioApplier) -> Self {
        Self { applier }
    }

    pub fn from_config(config: &PortfolioConfig) -> Self {
        Self::new(PortfolioApplier::from_config(config))
    }

    pub fn run<R: Read>(&self, reader: R) -> Result<ImpactRun, PipelineError> {
        let import = YieldReportImporter::from_reader(reader)?;
        Ok(self.project(import))
    }

    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<ImpactRun, PipelineError> {
        let import = YieldReportImporter::from_path(path)?;
        Ok(self.project(import))
    }

    pub fn project(&self, import: YieldReport) -> ImpactRun {
        let projection = self.applier.apply(&import.plants);
        let summary = ImpactSummary::from_projection(&projection);
        info!(
            policy = %summary.policy,
            plants = summary.plants,
            skipped = summary.skipped,
            revenue_gain = summary.revenue_omr.gain,
            "portfolio projected"
        );

        ImpactRun {
            import,
            projection,
            summary,
        }
    }

    pub fn deliver(
        &self,
        run: &ImpactRun,
        dispatcher: &dyn ReportDispatcher,
        config: &DeliveryConfig,
        generated_on: NaiveDate,
        extra_attachments: Vec<ReportAttachment>,
    ) -> Result<DispatchReceipt, PipelineError> {
        let mut envelope = run.envelope(config, generated_on)?;
        envelope.attachments.extend(extra_attachments);
        Ok(dispatcher.dispatch(&envelope)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactRun {
    pub import: YieldReport,
    pub projection: PortfolioProjection,
    pub summary: ImpactSummary,
}

impl ImpactRun {
    pub fn rows(&self) -> Vec<ImpactRow> {
        self.projection
            .entities
            .iter()
            .map(ImpactRow::from_entity)
            .collect()
    }

    pub fn csv_bytes(&self) -> Result<Vec<u8>, ReportWriteError> {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &self.rows())?;
        Ok(buffer)
    }

    pub fn write_csv_to(&self, path: &Path) -> Result<(), ReportWriteError> {
        let file = std::fs::File::create(path)?;
        write_csv(std::io::BufWriter::new(file), &self.rows())
    }

    /// Gain and before/after charts, or nothing when no plant was projected.
    pub fn charts(&self) -> Result<Vec<ReportAttachment>, ReportWriteError> {
        let entities = &self.projection.entities;
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![
            ReportAttachment::new(GAIN_CHART_FILE_NAME, gain_chart_svg(entities)?.into_bytes()),
            ReportAttachment::new(
                BEFORE_AFTER_CHART_FILE_NAME,
                before_after_chart_svg(entities)?.into_bytes(),
            ),
        ])
    }

    pub fn body(&self, generated_on: NaiveDate) -> String {
        let mut lines = vec![
            "Dear Team,".to_string(),
            String::new(),
            format!(
                "Attached is the automated PredAIoT + EDE impact report generated on {} \
                 with the {} boost policy.",
                generated_on.format("%B %d, %Y"),
                self.summary.policy
            ),
            String::new(),
            "Key highlights:".to_string(),
        ];
        lines.extend(
            self.summary
                .highlights()
                .into_iter()
                .map(|line| format!("- {line}")),
        );

        if !self.import.issues.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "{} cell(s) in the yield report could not be read and were left blank.",
                self.import.issues.len()
            ));
        }

        lines.join("\n")
    }

    pub fn envelope(
        &self,
        config: &DeliveryConfig,
        generated_on: NaiveDate,
    ) -> Result<ReportEnvelope, ReportWriteError> {
        let mut attachments = vec![ReportAttachment::new(REPORT_FILE_NAME, self.csv_bytes()?)];
        attachments.extend(self.charts()?);

        Ok(ReportEnvelope {
            sender: config.sender.clone(),
            recipients: config.recipients.clone(),
            subject: format!("{} ({})", config.subject, generated_on.format("%Y-%m-%d")),
            body: self.body(generated_on),
            attachments,
        })
    }
}
