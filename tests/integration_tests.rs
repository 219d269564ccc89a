use anyhow::Result;
use risk_etl::core::classifier::{BMI_NORMAL, BMI_OVERWEIGHT};
use risk_etl::{
    run, ConstraintSet, CsvRiskPipeline, EtlEngine, FieldConstraint, Formula, LocalStorage,
    Record, RiskConfig, RiskError, RiskPipeline, ThresholdConfig, ThresholdTable,
};
use std::path::Path;
use tempfile::TempDir;

fn manifest_path(relative: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join(relative)
        .to_string_lossy()
        .into_owned()
}

fn run_to_report(config: RiskConfig, base: &TempDir) -> risk_etl::Result<String> {
    let storage = LocalStorage::new(base.path().to_string_lossy().into_owned());
    let pipeline = CsvRiskPipeline::new(storage, config)?;
    let report_path = EtlEngine::new(pipeline).run()?;
    Ok(std::fs::read_to_string(base.path().join(report_path))?)
}

#[test]
fn test_shipped_bmi_config_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = RiskConfig::from_file(manifest_path("configs/bmi-risk.toml"))?;
    config.data.input_file = manifest_path("data/patients.csv");
    config.output.path = "out".to_string();

    let report = run_to_report(config, &temp_dir)?;

    assert!(report.contains("Analysis complete: 4 patients processed"));
    assert!(report.contains("Patient A       | BMI:  23.5 | Risk: Low risk (normal)"));
    assert!(report.contains("Patient B       | BMI:  29.3 | Risk: Moderate risk (overweight)"));
    assert!(report.contains("Patient C       | BMI:  20.3 | Risk: Low risk (normal)"));
    assert!(report.contains("Patient D       | BMI:  33.3 | Risk: High risk (obese)"));
    assert!(report.contains("  Low risk (normal): 2\n"));
    assert!(report.contains("High-risk patients: 1\n"));
    assert!(report.contains("Patients prioritized for intervention: 2\n"));

    let summary = std::fs::read_to_string(temp_dir.path().join("out/bmi_summary.json"))?;
    let json: serde_json::Value = serde_json::from_str(&summary)?;
    assert_eq!(json["total"], 4);
    Ok(())
}

#[test]
fn test_glucose_counts_match_independent_bucketing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = RiskConfig::from_file(manifest_path("configs/glucose-risk.toml"))?;
    config.data.input_file = manifest_path("data/glucose_patients.csv");
    config.output.path = "out".to_string();

    let report = run_to_report(config, &temp_dir)?;

    // bins = [-inf, 100, 126, inf]; high risk is everything from 100 up
    let csv = std::fs::read_to_string(manifest_path("data/glucose_patients.csv"))?;
    let expected = csv
        .lines()
        .skip(1)
        .filter(|line| {
            let cells: Vec<f64> = line
                .split(',')
                .skip(1)
                .map(|c| c.trim().parse().unwrap())
                .collect();
            let glucose = (cells[1] * 1.2 + cells[0] * 0.3).round_ties_even();
            glucose >= 100.0
        })
        .count();

    assert_eq!(expected, 5);
    assert!(report.contains(&format!("High-risk patients: {}\n", expected)));
    assert!(report.contains(&format!(
        "Patients prioritized for intervention: {}\n",
        expected
    )));
    assert!(report.contains("  Low risk (normal): 3\n"));
    assert!(report.contains("  High risk (prediabetes): 3\n"));
    assert!(report.contains("  Very high risk (diabetes): 2\n"));

    let classified = std::fs::read_to_string(temp_dir.path().join("out/glucose_classified.csv"))?;
    assert_eq!(classified.lines().count(), 9);
    Ok(())
}

#[test]
fn test_identical_runs_produce_identical_reports() -> Result<()> {
    let first_dir = TempDir::new()?;
    let second_dir = TempDir::new()?;

    let mut config = RiskConfig::from_file(manifest_path("configs/glucose-risk.toml"))?;
    config.data.input_file = manifest_path("data/glucose_patients.csv");

    let first = run_to_report(config.clone(), &first_dir)?;
    let second = run_to_report(config, &second_dir)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_invalid_batch_produces_no_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(
        temp_dir.path().join("patients.csv"),
        "name,weight_kg,height_cm\nPatient A,68,170\nPatient B,-95,180\n",
    )?;

    let mut config = RiskConfig::from_file(manifest_path("configs/bmi-risk.toml"))?;
    config.data.input_file = "patients.csv".to_string();
    config.output.path = "out".to_string();

    let err = run_to_report(config, &temp_dir).unwrap_err();
    assert!(matches!(err, RiskError::RangeError { .. }));
    assert_eq!(err.record_id(), Some("Patient B"));
    assert!(!temp_dir.path().join("out").exists());
    Ok(())
}

#[test]
fn test_implausible_height_is_rejected() {
    let constraints = ConstraintSet::new(
        "name",
        [
            ("weight_kg".to_string(), FieldConstraint::required(1.0, 500.0)),
            ("height_cm".to_string(), FieldConstraint::required(30.0, 272.0)),
        ],
    )
    .unwrap();
    let thresholds = ThresholdTable::canonical(Formula::Bmi).unwrap();
    let records = vec![Record::new()
        .with_field("name", "Giant")
        .with_field("weight_kg", 80)
        .with_field("height_cm", 1750)];

    let result = run(&records, &constraints, Formula::Bmi, &thresholds);
    assert!(matches!(result, Err(RiskError::RangeError { .. })));
}

#[test]
fn test_zero_height_without_range_is_a_computation_error() {
    // No lower bound on height, so only the metric check can catch it.
    let constraints = ConstraintSet::new(
        "name",
        [
            ("weight_kg".to_string(), FieldConstraint::default()),
            ("height_cm".to_string(), FieldConstraint::default()),
        ],
    )
    .unwrap();
    let thresholds = ThresholdTable::canonical(Formula::Bmi).unwrap();
    let records = vec![Record::new()
        .with_field("name", "Zero")
        .with_field("weight_kg", 80)
        .with_field("height_cm", 0)];

    let result = run(&records, &constraints, Formula::Bmi, &thresholds);
    assert!(matches!(result, Err(RiskError::ComputationError { .. })));
}

#[test]
fn test_overweight_boundary_change_is_deterministic() {
    let constraints = ConstraintSet::new(
        "id",
        [
            ("weight_kg".to_string(), FieldConstraint::required(1.0, 500.0)),
            ("height_cm".to_string(), FieldConstraint::required(30.0, 272.0)),
        ],
    )
    .unwrap();

    // 100 cm tall, so weight in kg equals BMI
    let patient = |id: &str, weight: i32| {
        Record::new()
            .with_field("id", id)
            .with_field("weight_kg", weight)
            .with_field("height_cm", 100)
    };
    let records = vec![patient("bmi-29", 29), patient("bmi-22", 22)];

    let table = |boundary: f64| {
        ThresholdTable::from_config(&ThresholdConfig {
            boundaries: vec![boundary],
            labels: vec![BMI_NORMAL.to_string(), BMI_OVERWEIGHT.to_string()],
            priority: None,
            high_risk_from: None,
        })
        .unwrap()
    };

    let classify_all = |boundary: f64| {
        let pipeline = RiskPipeline::new(risk_etl::RiskPipelineConfig {
            constraints: constraints.clone(),
            formula: Formula::Bmi,
            thresholds: table(boundary),
        })
        .unwrap();
        pipeline
            .run(&records)
            .unwrap()
            .classified
            .into_iter()
            .map(|r| r.tier_label)
            .collect::<Vec<_>>()
    };

    assert_eq!(classify_all(30.0), vec![BMI_NORMAL, BMI_NORMAL]);
    assert_eq!(classify_all(28.0), vec![BMI_OVERWEIGHT, BMI_NORMAL]);
}
