//! Record validation.
//!
//! Every record in a batch is checked against a [`ConstraintSet`] before any
//! metric is computed. The first failing record aborts the batch.

use crate::domain::model::{Record, ValidRecord};
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{validate_finite, validate_non_empty_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

fn default_required() -> bool {
    true
}

/// Per-field rule: presence, numeric type and an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraint {
    #[serde(default = "default_required")]
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldConstraint {
    pub fn required(min: f64, max: f64) -> Self {
        Self {
            required: true,
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn optional(min: f64, max: f64) -> Self {
        Self {
            required: false,
            min: Some(min),
            max: Some(max),
        }
    }

    fn lower(&self) -> f64 {
        self.min.unwrap_or(f64::NEG_INFINITY)
    }

    fn upper(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }
}

impl Default for FieldConstraint {
    fn default() -> Self {
        Self {
            required: true,
            min: None,
            max: None,
        }
    }
}

/// The identifier field plus the numeric field rules, checked in field-name order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    id_field: String,
    fields: BTreeMap<String, FieldConstraint>,
}

impl ConstraintSet {
    pub fn new(
        id_field: impl Into<String>,
        fields: impl IntoIterator<Item = (String, FieldConstraint)>,
    ) -> Result<Self> {
        let id_field = id_field.into();
        validate_non_empty_string("data.id_field", &id_field)?;

        let fields: BTreeMap<String, FieldConstraint> = fields.into_iter().collect();
        for (name, constraint) in &fields {
            validate_non_empty_string("fields", name)?;
            if name == &id_field {
                return Err(RiskError::config(format!(
                    "identifier field '{}' cannot also be a numeric field",
                    name
                )));
            }
            if let Some(min) = constraint.min {
                validate_finite(&format!("fields.{}.min", name), min)?;
            }
            if let Some(max) = constraint.max {
                validate_finite(&format!("fields.{}.max", name), max)?;
            }
            if constraint.lower() > constraint.upper() {
                return Err(RiskError::InvalidConfigValueError {
                    field: format!("fields.{}", name),
                    value: format!("[{}, {}]", constraint.lower(), constraint.upper()),
                    reason: "min must not exceed max".to_string(),
                });
            }
        }

        Ok(Self { id_field, fields })
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldConstraint> {
        &self.fields
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|c| c.required)
    }
}

enum Coerced {
    Missing,
    Number(f64),
    Invalid(String),
}

fn coerce_number(value: Option<&Value>) -> Coerced {
    match value {
        None | Some(Value::Null) => Coerced::Missing,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Coerced::Number(v),
            _ => Coerced::Invalid(n.to_string()),
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Coerced::Missing;
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Coerced::Number(v),
                _ => Coerced::Invalid(s.clone()),
            }
        }
        Some(other) => Coerced::Invalid(other.to_string()),
    }
}

fn extract_id(record: &Record, row: usize, id_field: &str) -> Result<String> {
    let row_label = format!("row {}", row);
    match record.get(id_field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) | Some(Value::String(_)) => Err(RiskError::MissingFieldError {
            record: row_label,
            field: id_field.to_string(),
        }),
        Some(other) => Err(RiskError::TypeError {
            record: row_label,
            field: id_field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Checks one record. `row` is its 1-based position, used when the identifier itself is bad.
pub fn validate(record: &Record, row: usize, constraints: &ConstraintSet) -> Result<ValidRecord> {
    let id = extract_id(record, row, constraints.id_field())?;
    let mut values = BTreeMap::new();

    for (field, constraint) in constraints.fields() {
        let value = match coerce_number(record.get(field)) {
            Coerced::Missing if constraint.required => {
                return Err(RiskError::MissingFieldError {
                    record: id,
                    field: field.clone(),
                });
            }
            Coerced::Missing => continue,
            Coerced::Invalid(raw) => {
                return Err(RiskError::TypeError {
                    record: id,
                    field: field.clone(),
                    value: raw,
                });
            }
            Coerced::Number(v) => v,
        };

        if value < constraint.lower() || value > constraint.upper() {
            return Err(RiskError::RangeError {
                record: id,
                field: field.clone(),
                value,
                min: constraint.lower(),
                max: constraint.upper(),
            });
        }

        values.insert(field.clone(), value);
    }

    Ok(ValidRecord::new(id, row, values))
}

/// Validates the whole batch up front; nothing is returned unless every record passes.
pub fn validate_batch(records: &[Record], constraints: &ConstraintSet) -> Result<Vec<ValidRecord>> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut valid = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let row = index + 1;
        let checked = validate(record, row, constraints)?;

        if let Some(first_row) = seen.get(checked.id()) {
            return Err(RiskError::DuplicateRecordError {
                record: checked.id().to_string(),
                first_row: *first_row,
            });
        }
        seen.insert(checked.id().to_string(), row);
        valid.push(checked);
    }

    tracing::debug!("Validated {} records", valid.len());
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bmi_constraints() -> ConstraintSet {
        ConstraintSet::new(
            "name",
            [
                ("weight_kg".to_string(), FieldConstraint::required(1.0, 500.0)),
                ("height_cm".to_string(), FieldConstraint::required(30.0, 272.0)),
                ("age".to_string(), FieldConstraint::optional(0.0, 130.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_valid_record_coerces_strings() {
        let record = Record::new()
            .with_field("name", "Patient A")
            .with_field("weight_kg", " 68 ")
            .with_field("height_cm", 170);

        let valid = validate(&record, 1, &bmi_constraints()).unwrap();
        assert_eq!(valid.id(), "Patient A");
        assert_eq!(valid.value("weight_kg"), Some(68.0));
        assert_eq!(valid.value("height_cm"), Some(170.0));
        assert_eq!(valid.value("age"), None);
    }

    #[test]
    fn test_missing_required_field() {
        let record = Record::new()
            .with_field("name", "Patient A")
            .with_field("weight_kg", "")
            .with_field("height_cm", 170);

        let err = validate(&record, 1, &bmi_constraints()).unwrap_err();
        assert!(matches!(
            err,
            RiskError::MissingFieldError { ref record, ref field }
                if record == "Patient A" && field == "weight_kg"
        ));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let record = Record::new()
            .with_field("name", "Patient A")
            .with_field("weight_kg", 70)
            .with_field("height_cm", Value::Null);

        let err = validate(&record, 1, &bmi_constraints()).unwrap_err();
        assert!(matches!(err, RiskError::MissingFieldError { ref field, .. } if field == "height_cm"));
    }

    #[test]
    fn test_non_numeric_value() {
        let record = Record::new()
            .with_field("name", "Patient A")
            .with_field("weight_kg", "seventy")
            .with_field("height_cm", 170);

        let err = validate(&record, 1, &bmi_constraints()).unwrap_err();
        assert!(matches!(err, RiskError::TypeError { ref value, .. } if value == "seventy"));
    }

    #[test]
    fn test_out_of_range_value() {
        let record = Record::new()
            .with_field("name", "Patient A")
            .with_field("weight_kg", -70)
            .with_field("height_cm", 170);

        let err = validate(&record, 1, &bmi_constraints()).unwrap_err();
        assert!(matches!(err, RiskError::RangeError { value, .. } if value == -70.0));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let record = Record::new()
            .with_field("name", "Edge")
            .with_field("weight_kg", 500)
            .with_field("height_cm", 30);

        assert!(validate(&record, 1, &bmi_constraints()).is_ok());
    }

    #[test]
    fn test_missing_identifier_reports_row() {
        let record = Record::new()
            .with_field("weight_kg", 70)
            .with_field("height_cm", 170);

        let err = validate(&record, 4, &bmi_constraints()).unwrap_err();
        assert_eq!(err.record_id(), Some("row 4"));
    }

    #[test]
    fn test_batch_rejects_duplicates() {
        let row = Record::new()
            .with_field("name", "Patient A")
            .with_field("weight_kg", 70)
            .with_field("height_cm", 170);

        let err = validate_batch(&[row.clone(), row], &bmi_constraints()).unwrap_err();
        assert!(matches!(err, RiskError::DuplicateRecordError { first_row: 1, .. }));
    }

    #[test]
    fn test_batch_stops_at_first_invalid_record() {
        let good = Record::new()
            .with_field("name", "Patient A")
            .with_field("weight_kg", 70)
            .with_field("height_cm", 170);
        let bad = Record::new()
            .with_field("name", "Patient B")
            .with_field("weight_kg", 70)
            .with_field("height_cm", 900);

        let err = validate_batch(&[good, bad], &bmi_constraints()).unwrap_err();
        assert_eq!(err.record_id(), Some("Patient B"));
    }

    #[test]
    fn test_constraint_set_rejects_inverted_range() {
        let result = ConstraintSet::new(
            "id",
            [("weight_kg".to_string(), FieldConstraint::required(500.0, 1.0))],
        );
        assert!(result.is_err());
    }
}
