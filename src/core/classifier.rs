//! Threshold-based risk classification.
//!
//! A [`ThresholdTable`] is an ordered list of half-open tiers `[lower, upper)`
//! covering the whole real line. The first tier starts at negative infinity and
//! the last ends at positive infinity, so every finite metric lands in exactly
//! one tier. Tables are validated once, when built.

use crate::core::metric::Formula;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{validate_non_empty_string, validate_strictly_increasing};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const BMI_UNDERWEIGHT: &str = "Moderate risk (underweight)";
pub const BMI_NORMAL: &str = "Low risk (normal)";
pub const BMI_OVERWEIGHT: &str = "Moderate risk (overweight)";
pub const BMI_OBESE: &str = "High risk (obese)";

pub const GLUCOSE_NORMAL: &str = "Low risk (normal)";
pub const GLUCOSE_PREDIABETES: &str = "High risk (prediabetes)";
pub const GLUCOSE_DIABETES: &str = "Very high risk (diabetes)";

/// Threshold block as supplied by configuration.
///
/// `labels` has one more entry than `boundaries`. `priority` lists the labels
/// that count toward intervention; when absent every tier but the lowest does.
/// `high_risk_from` names the lowest tier counted as high risk; when absent
/// it is the second tier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub boundaries: Vec<f64>,
    pub labels: Vec<String>,
    pub priority: Option<Vec<String>>,
    pub high_risk_from: Option<String>,
}

/// `[bmi_thresholds]` shorthand: lower bound of each named BMI tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiThresholds {
    pub normal: f64,
    pub overweight: f64,
    pub obese: f64,
}

impl Default for BmiThresholds {
    fn default() -> Self {
        Self {
            normal: 18.5,
            overweight: 25.0,
            obese: 30.0,
        }
    }
}

impl From<&BmiThresholds> for ThresholdConfig {
    fn from(bmi: &BmiThresholds) -> Self {
        ThresholdConfig {
            boundaries: vec![bmi.normal, bmi.overweight, bmi.obese],
            labels: [BMI_UNDERWEIGHT, BMI_NORMAL, BMI_OVERWEIGHT, BMI_OBESE]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            priority: Some(
                [BMI_UNDERWEIGHT, BMI_OVERWEIGHT, BMI_OBESE]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            high_risk_from: Some(BMI_OBESE.to_string()),
        }
    }
}

impl ThresholdConfig {
    pub fn canonical(formula: Formula) -> Self {
        match formula {
            Formula::Bmi => ThresholdConfig::from(&BmiThresholds::default()),
            Formula::Glucose => ThresholdConfig {
                boundaries: vec![100.0, 126.0],
                labels: [GLUCOSE_NORMAL, GLUCOSE_PREDIABETES, GLUCOSE_DIABETES]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                priority: None,
                high_risk_from: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskTier {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub priority: bool,
}

impl RiskTier {
    pub fn contains(&self, metric: f64) -> bool {
        self.lower <= metric && metric < self.upper
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    boundaries: Vec<f64>,
    tiers: Vec<RiskTier>,
    high_risk_from: usize,
}

impl ThresholdTable {
    pub fn from_config(config: &ThresholdConfig) -> Result<Self> {
        if config.labels.is_empty() {
            return Err(RiskError::config("threshold table needs at least one tier label"));
        }
        if config.labels.len() != config.boundaries.len() + 1 {
            return Err(RiskError::config(format!(
                "{} boundaries need {} labels, got {}",
                config.boundaries.len(),
                config.boundaries.len() + 1,
                config.labels.len()
            )));
        }
        validate_strictly_increasing("thresholds.boundaries", &config.boundaries)?;

        let mut unique = HashSet::new();
        for label in &config.labels {
            validate_non_empty_string("thresholds.labels", label)?;
            if !unique.insert(label.as_str()) {
                return Err(RiskError::config(format!("duplicate tier label '{}'", label)));
            }
        }

        let position = |label: &str, key: &str| -> Result<usize> {
            config
                .labels
                .iter()
                .position(|l| l == label)
                .ok_or_else(|| RiskError::InvalidConfigValueError {
                    field: format!("thresholds.{}", key),
                    value: label.to_string(),
                    reason: "not one of the configured tier labels".to_string(),
                })
        };

        let mut priority = vec![false; config.labels.len()];
        match &config.priority {
            Some(flagged) => {
                for label in flagged {
                    priority[position(label.as_str(), "priority")?] = true;
                }
            }
            None => priority.iter_mut().skip(1).for_each(|p| *p = true),
        }

        let high_risk_from = match &config.high_risk_from {
            Some(label) => position(label.as_str(), "high_risk_from")?,
            None => 1,
        };

        let tiers = config
            .labels
            .iter()
            .enumerate()
            .map(|(index, label)| RiskTier {
                label: label.clone(),
                lower: if index == 0 {
                    f64::NEG_INFINITY
                } else {
                    config.boundaries[index - 1]
                },
                upper: config
                    .boundaries
                    .get(index)
                    .copied()
                    .unwrap_or(f64::INFINITY),
                priority: priority[index],
            })
            .collect();

        Ok(Self {
            boundaries: config.boundaries.clone(),
            tiers,
            high_risk_from,
        })
    }

    pub fn canonical(formula: Formula) -> Result<Self> {
        Self::from_config(&ThresholdConfig::canonical(formula))
    }

    pub fn tiers(&self) -> &[RiskTier] {
        &self.tiers
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Ordinal of the tier holding `metric`. NaN falls in the lowest tier;
    /// callers reject non-finite metrics before classifying.
    pub fn tier_index(&self, metric: f64) -> usize {
        self.boundaries.partition_point(|boundary| *boundary <= metric)
    }

    pub fn classify(&self, metric: f64) -> &RiskTier {
        &self.tiers[self.tier_index(metric)]
    }

    pub fn is_priority(&self, index: usize) -> bool {
        self.tiers.get(index).is_some_and(|tier| tier.priority)
    }

    pub fn is_high_risk(&self, index: usize) -> bool {
        index >= self.high_risk_from
    }

    pub fn high_risk_from(&self) -> &str {
        self.tiers
            .get(self.high_risk_from)
            .map(|tier| tier.label.as_str())
            .unwrap_or("")
    }
}

pub fn classify(metric: f64, thresholds: &ThresholdTable) -> &RiskTier {
    thresholds.classify(metric)
}
