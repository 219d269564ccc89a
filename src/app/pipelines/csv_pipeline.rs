use crate::config::toml_config::RiskConfig;
use crate::core::pipeline::RiskPipeline;
use crate::core::report::{format_classified_csv, format_patient_table, format_report};
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::utils::error::Result;
use std::collections::HashMap;
use std::path::Path;

/// Reads a CSV patient table, runs the risk pipeline and writes the report.
pub struct CsvRiskPipeline<S: Storage> {
    storage: S,
    config: RiskConfig,
    core: RiskPipeline,
}

impl<S: Storage> CsvRiskPipeline<S> {
    pub fn new(storage: S, config: RiskConfig) -> Result<Self> {
        let core = RiskPipeline::new(config.pipeline_config()?)?;
        Ok(Self {
            storage,
            config,
            core,
        })
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }
}

pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let data: HashMap<String, serde_json::Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| {
                (
                    header.to_string(),
                    serde_json::Value::String(cell.to_string()),
                )
            })
            .collect();
        records.push(Record { data });
    }

    Ok(records)
}

impl<S: Storage> Pipeline for CsvRiskPipeline<S> {
    fn extract(&self) -> Result<Vec<Record>> {
        tracing::info!("📁 Reading patients from: {}", self.config.input_file());
        let bytes = self.storage.read_file(self.config.input_file())?;
        parse_csv(&bytes)
    }

    fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let output = self.core.run(&data)?;
        let formula = self.config.formula();

        let report = format!(
            "{}\n{}",
            format_patient_table(&output.classified, formula),
            format_report(&output.summary)
        );
        let classified_csv = format_classified_csv(&output.classified, formula)?;

        Ok(TransformResult {
            output,
            report,
            classified_csv,
        })
    }

    fn load(&self, result: TransformResult) -> Result<String> {
        let report_path = self.output_file(&self.config.output.report_file);
        self.storage
            .write_file(&report_path, result.report.as_bytes())?;

        if let Some(summary_file) = &self.config.output.summary_file {
            let json = serde_json::to_string_pretty(&result.output.summary)?;
            self.storage
                .write_file(&self.output_file(summary_file), json.as_bytes())?;
        }

        if let Some(classified_file) = &self.config.output.classified_file {
            self.storage.write_file(
                &self.output_file(classified_file),
                result.classified_csv.as_bytes(),
            )?;
        }

        Ok(report_path)
    }
}
