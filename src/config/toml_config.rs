use crate::core::classifier::{BmiThresholds, ThresholdConfig, ThresholdTable};
use crate::core::metric::{Formula, AGE_FIELD, HEIGHT_FIELD, WEIGHT_FIELD};
use crate::core::pipeline::RiskPipelineConfig;
use crate::core::validator::{ConstraintSet, FieldConstraint};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub pipeline: PipelineConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConstraint>,
    pub thresholds: Option<ThresholdConfig>,
    pub bmi_thresholds: Option<BmiThresholds>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub formula: Formula,
}

fn default_id_field() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Read by the CSV adapter; the core never opens files.
    pub input_file: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_report_file() -> String {
    "risk_report.txt".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default = "default_report_file")]
    pub report_file: String,
    pub summary_file: Option<String>,
    pub classified_file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            report_file: default_report_file(),
            summary_file: None,
            classified_file: None,
        }
    }
}

/// Field limits used when a config has no `[fields]` block.
pub fn default_constraints(formula: Formula) -> Vec<(String, FieldConstraint)> {
    let weight = (WEIGHT_FIELD.to_string(), FieldConstraint::required(1.0, 500.0));
    match formula {
        Formula::Bmi => vec![
            weight,
            (HEIGHT_FIELD.to_string(), FieldConstraint::required(30.0, 272.0)),
        ],
        Formula::Glucose => vec![
            weight,
            (AGE_FIELD.to_string(), FieldConstraint::required(0.0, 130.0)),
        ],
    }
}

impl RiskConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RiskError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RiskError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RiskError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validate_path("data.input_file", &self.data.input_file)?;
        validate_file_extension("data.input_file", &self.data.input_file, &["csv"])?;
        validate_path("output.path", &self.output.path)?;
        validate_path("output.report_file", &self.output.report_file)?;
        if let Some(summary) = &self.output.summary_file {
            validate_path("output.summary_file", summary)?;
        }
        if let Some(classified) = &self.output.classified_file {
            validate_path("output.classified_file", classified)?;
        }

        // Building the pipeline config checks thresholds and field limits.
        self.pipeline_config().map(|_| ())
    }

    pub fn constraints(&self) -> Result<ConstraintSet> {
        if self.fields.is_empty() {
            ConstraintSet::new(
                self.data.id_field.clone(),
                default_constraints(self.pipeline.formula),
            )
        } else {
            ConstraintSet::new(self.data.id_field.clone(), self.fields.clone())
        }
    }

    pub fn threshold_config(&self) -> Result<ThresholdConfig> {
        match (&self.thresholds, &self.bmi_thresholds) {
            (Some(_), Some(_)) => Err(RiskError::config(
                "use either [thresholds] or [bmi_thresholds], not both",
            )),
            (Some(thresholds), None) => Ok(thresholds.clone()),
            (None, Some(bmi)) if self.pipeline.formula == Formula::Bmi => {
                Ok(ThresholdConfig::from(bmi))
            }
            (None, Some(_)) => Err(RiskError::config(format!(
                "[bmi_thresholds] does not apply to the '{}' formula",
                self.pipeline.formula
            ))),
            (None, None) => Ok(ThresholdConfig::canonical(self.pipeline.formula)),
        }
    }

    pub fn threshold_table(&self) -> Result<ThresholdTable> {
        ThresholdTable::from_config(&self.threshold_config()?)
    }

    pub fn pipeline_config(&self) -> Result<RiskPipelineConfig> {
        Ok(RiskPipelineConfig {
            constraints: self.constraints()?,
            formula: self.pipeline.formula,
            thresholds: self.threshold_table()?,
        })
    }

    pub fn formula(&self) -> Formula {
        self.pipeline.formula
    }
}

impl ConfigProvider for RiskConfig {
    fn input_file(&self) -> &str {
        &self.data.input_file
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }
}

impl Validate for RiskConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
