//! Batch orchestration: validate, compute, classify, aggregate.
//!
//! The whole batch is validated before any metric is computed, and every
//! metric is computed before anything is classified. A failure in either of
//! the first two stages ends the run; no summary is produced for a partial
//! batch.

use crate::core::classifier::ThresholdTable;
use crate::core::metric::{compute_metric, Formula};
use crate::core::report::summarize;
use crate::core::validator::{validate_batch, ConstraintSet};
use crate::domain::model::{ClassifiedRecord, PipelineOutput, Record, Summary, ValidRecord};
use crate::utils::error::{Result, RiskError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    Loading,
    Validating,
    Computing,
    Classifying,
    Aggregating,
    Done,
    Failed(String),
}

impl PipelineStage {
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Loading => Some(PipelineStage::Validating),
            PipelineStage::Validating => Some(PipelineStage::Computing),
            PipelineStage::Computing => Some(PipelineStage::Classifying),
            PipelineStage::Classifying => Some(PipelineStage::Aggregating),
            PipelineStage::Aggregating => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed(_) => None,
        }
    }

    pub fn can_fail(&self) -> bool {
        matches!(self, PipelineStage::Validating | PipelineStage::Computing)
    }

    pub fn fail(&self, reason: impl Into<String>) -> Option<PipelineStage> {
        self.can_fail().then(|| PipelineStage::Failed(reason.into()))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed(_))
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Loading => write!(f, "loading"),
            PipelineStage::Validating => write!(f, "validating"),
            PipelineStage::Computing => write!(f, "computing"),
            PipelineStage::Classifying => write!(f, "classifying"),
            PipelineStage::Aggregating => write!(f, "aggregating"),
            PipelineStage::Done => write!(f, "done"),
            PipelineStage::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Records every stage a run passes through.
#[derive(Debug)]
struct StageTracker {
    history: Vec<PipelineStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            history: vec![PipelineStage::Loading],
        }
    }

    fn current(&self) -> &PipelineStage {
        // history always holds at least Loading
        &self.history[self.history.len() - 1]
    }

    fn advance(&mut self) -> Result<()> {
        let next = self.current().next().ok_or_else(|| {
            RiskError::config(format!("pipeline cannot advance from '{}'", self.current()))
        })?;
        tracing::debug!("Pipeline stage: {}", next);
        self.history.push(next);
        Ok(())
    }

    fn fail(&mut self, error: RiskError) -> RiskError {
        match self.current().fail(error.to_string()) {
            Some(failed) => {
                tracing::warn!("Pipeline {} ({})", failed, self.current());
                self.history.push(failed);
            }
            None => tracing::error!("Unexpected failure while {}: {}", self.current(), error),
        }
        error
    }
}

#[derive(Debug, Clone)]
pub struct RiskPipelineConfig {
    pub constraints: ConstraintSet,
    pub formula: Formula,
    pub thresholds: ThresholdTable,
}

#[derive(Debug, Clone)]
pub struct RiskPipeline {
    config: RiskPipelineConfig,
}

impl RiskPipeline {
    /// Fails if any formula input is not a required, constrained field.
    pub fn new(config: RiskPipelineConfig) -> Result<Self> {
        for field in config.formula.required_fields() {
            if !config.constraints.is_required(field) {
                return Err(RiskError::config(format!(
                    "formula '{}' needs '{}' declared as a required field",
                    config.formula, field
                )));
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskPipelineConfig {
        &self.config
    }

    pub fn run(&self, records: &[Record]) -> Result<PipelineOutput> {
        self.run_traced(records).0
    }

    /// Runs the batch and returns the stages it went through alongside the result.
    pub fn run_traced(&self, records: &[Record]) -> (Result<PipelineOutput>, Vec<PipelineStage>) {
        let mut tracker = StageTracker::new();
        let result = self.execute(records, &mut tracker);
        (result, tracker.history)
    }

    fn execute(&self, records: &[Record], tracker: &mut StageTracker) -> Result<PipelineOutput> {
        tracing::info!(
            "Analyzing {} patients ({})",
            records.len(),
            self.config.formula.display_name()
        );

        tracker.advance()?;
        let valid = validate_batch(records, &self.config.constraints)
            .map_err(|e| tracker.fail(e))?;

        tracker.advance()?;
        let metrics = self.compute_all(&valid).map_err(|e| tracker.fail(e))?;

        tracker.advance()?;
        let classified = self.classify_all(valid, metrics);

        tracker.advance()?;
        let summary = summarize(&classified, &self.config.thresholds, self.config.formula);

        tracker.advance()?;
        tracing::info!(
            "Analysis complete: {} patients processed, {} prioritized",
            summary.total,
            summary.priority
        );

        Ok(PipelineOutput {
            classified,
            summary,
        })
    }

    fn compute_all(&self, valid: &[ValidRecord]) -> Result<Vec<f64>> {
        valid
            .iter()
            .map(|record| compute_metric(record, self.config.formula))
            .collect()
    }

    fn classify_all(&self, valid: Vec<ValidRecord>, metrics: Vec<f64>) -> Vec<ClassifiedRecord> {
        valid
            .into_iter()
            .zip(metrics)
            .map(|(record, metric)| {
                let tier_index = self.config.thresholds.tier_index(metric);
                let tier_label = self.config.thresholds.tiers()[tier_index].label.clone();
                ClassifiedRecord {
                    record,
                    metric,
                    tier_index,
                    tier_label,
                }
            })
            .collect()
    }
}

/// One-shot run over a batch.
pub fn run(
    records: &[Record],
    constraints: &ConstraintSet,
    formula: Formula,
    thresholds: &ThresholdTable,
) -> Result<Summary> {
    let pipeline = RiskPipeline::new(RiskPipelineConfig {
        constraints: constraints.clone(),
        formula,
        thresholds: thresholds.clone(),
    })?;
    pipeline.run(records).map(|output| output.summary)
}
