pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::csv_pipeline::CsvRiskPipeline;
pub use config::cli::LocalStorage;
pub use config::toml_config::RiskConfig;
pub use crate::core::etl::EtlEngine;
pub use crate::core::classifier::{classify, RiskTier, ThresholdConfig, ThresholdTable};
pub use crate::core::metric::{compute_metric, Formula};
pub use crate::core::pipeline::{run, PipelineStage, RiskPipeline, RiskPipelineConfig};
pub use crate::core::report::{format_report, summarize};
pub use crate::core::validator::{validate, validate_batch, ConstraintSet, FieldConstraint};
pub use domain::model::{ClassifiedRecord, PipelineOutput, Record, Summary, ValidRecord};
pub use utils::error::{Result, RiskError};
