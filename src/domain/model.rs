use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One raw ingested row, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }
}

/// A record that passed validation. Numeric fields are coerced to `f64`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidRecord {
    id: String,
    row: usize,
    values: BTreeMap<String, f64>,
}

impl ValidRecord {
    pub(crate) fn new(id: String, row: usize, values: BTreeMap<String, f64>) -> Self {
        Self { id, row, values }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based position of the record in its batch.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    pub record: ValidRecord,
    pub metric: f64,
    pub tier_index: usize,
    pub tier_label: String,
}

impl ClassifiedRecord {
    pub fn id(&self) -> &str {
        self.record.id()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierCount {
    pub label: String,
    pub count: usize,
    pub priority: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub metric_name: String,
    pub total: usize,
    pub tier_counts: Vec<TierCount>,
    pub high_risk: usize,
    pub priority: usize,
    pub average_metric: Option<f64>,
}

impl Summary {
    pub fn count_for(&self, label: &str) -> usize {
        self.tier_counts
            .iter()
            .find(|tier| tier.label == label)
            .map(|tier| tier.count)
            .unwrap_or(0)
    }
}

/// Result of a completed core run: the classified batch plus its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub classified: Vec<ClassifiedRecord>,
    pub summary: Summary,
}

/// What the transform stage hands to the load stage.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub output: PipelineOutput,
    pub report: String,
    pub classified_csv: String,
}
