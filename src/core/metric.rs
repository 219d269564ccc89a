use crate::domain::model::ValidRecord;
use crate::utils::error::{Result, RiskError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const WEIGHT_FIELD: &str = "weight_kg";
pub const HEIGHT_FIELD: &str = "height_cm";
pub const AGE_FIELD: &str = "age";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// `weight_kg / (height_cm / 100)^2`
    Bmi,
    /// `weight_kg * 1.2 + age * 0.3`, rounded to the nearest integer (ties to even).
    #[serde(alias = "glucose_estimate")]
    Glucose,
}

impl Formula {
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Formula::Bmi => &[WEIGHT_FIELD, HEIGHT_FIELD],
            Formula::Glucose => &[WEIGHT_FIELD, AGE_FIELD],
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Formula::Bmi => "BMI",
            Formula::Glucose => "Glucose",
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Bmi => write!(f, "bmi"),
            Formula::Glucose => write!(f, "glucose"),
        }
    }
}

impl FromStr for Formula {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bmi" => Ok(Formula::Bmi),
            "glucose" | "glucose_estimate" => Ok(Formula::Glucose),
            other => Err(RiskError::InvalidConfigValueError {
                field: "pipeline.formula".to_string(),
                value: other.to_string(),
                reason: "Supported formulas: bmi, glucose".to_string(),
            }),
        }
    }
}

pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

pub fn glucose_estimate(weight_kg: f64, age: f64) -> f64 {
    (weight_kg * 1.2 + age * 0.3).round_ties_even()
}

fn input(record: &ValidRecord, field: &str) -> Result<f64> {
    record.value(field).ok_or_else(|| RiskError::ComputationError {
        record: record.id().to_string(),
        message: format!("input '{}' is not available", field),
    })
}

fn positive(record: &ValidRecord, field: &str) -> Result<f64> {
    let value = input(record, field)?;
    if value <= 0.0 {
        return Err(RiskError::ComputationError {
            record: record.id().to_string(),
            message: format!("{} must be positive, got {}", field, value),
        });
    }
    Ok(value)
}

pub fn compute_metric(record: &ValidRecord, formula: Formula) -> Result<f64> {
    let metric = match formula {
        Formula::Bmi => bmi(
            positive(record, WEIGHT_FIELD)?,
            positive(record, HEIGHT_FIELD)?,
        ),
        Formula::Glucose => {
            let weight = positive(record, WEIGHT_FIELD)?;
            let age = input(record, AGE_FIELD)?;
            if age < 0.0 {
                return Err(RiskError::ComputationError {
                    record: record.id().to_string(),
                    message: format!("{} must not be negative, got {}", AGE_FIELD, age),
                });
            }
            glucose_estimate(weight, age)
        }
    };

    if !metric.is_finite() {
        return Err(RiskError::ComputationError {
            record: record.id().to_string(),
            message: format!("{} is not a finite number", formula.display_name()),
        });
    }

    Ok(metric)
}
