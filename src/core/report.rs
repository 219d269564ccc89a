use crate::core::classifier::ThresholdTable;
use crate::core::metric::Formula;
use crate::domain::model::{ClassifiedRecord, Summary, TierCount};
use crate::utils::error::{Result, RiskError};
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

pub fn summarize(
    classified: &[ClassifiedRecord],
    thresholds: &ThresholdTable,
    formula: Formula,
) -> Summary {
    let mut tier_counts: Vec<TierCount> = thresholds
        .tiers()
        .iter()
        .map(|tier| TierCount {
            label: tier.label.clone(),
            count: 0,
            priority: tier.priority,
        })
        .collect();

    let mut high_risk = 0;
    let mut priority = 0;
    let mut metric_sum = 0.0;

    for record in classified {
        if let Some(tier) = tier_counts.get_mut(record.tier_index) {
            tier.count += 1;
        }
        if thresholds.is_high_risk(record.tier_index) {
            high_risk += 1;
        }
        if thresholds.is_priority(record.tier_index) {
            priority += 1;
        }
        metric_sum += record.metric;
    }

    let average_metric = if classified.is_empty() {
        None
    } else {
        Some(metric_sum / classified.len() as f64)
    };

    Summary {
        metric_name: formula.display_name().to_string(),
        total: classified.len(),
        tier_counts,
        high_risk,
        priority,
        average_metric,
    }
}

pub fn format_report(summary: &Summary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Analysis complete: {} patients processed", summary.total);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out);
    let _ = writeln!(out, "Risk tiers:");
    for tier in summary.tier_counts.iter().filter(|tier| tier.count > 0) {
        let _ = writeln!(out, "  {}: {}", tier.label, tier.count);
    }
    let _ = writeln!(out);
    match summary.average_metric {
        Some(average) => {
            let _ = writeln!(out, "Average {}: {:.1}", summary.metric_name, average);
        }
        None => {
            let _ = writeln!(out, "Average {}: n/a", summary.metric_name);
        }
    }
    let _ = writeln!(out, "High-risk patients: {}", summary.high_risk);
    let _ = writeln!(
        out,
        "Patients prioritized for intervention: {}",
        summary.priority
    );

    out
}

pub fn format_patient_table(classified: &[ClassifiedRecord], formula: Formula) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Patient Analysis:");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    for record in classified {
        let _ = writeln!(
            out,
            "{:15} | {}: {:5.1} | Risk: {}",
            record.id(),
            formula.display_name(),
            record.metric,
            record.tier_label
        );
    }
    out
}

/// `id,<metric>,tier` rows in input order.
pub fn format_classified_csv(classified: &[ClassifiedRecord], formula: Formula) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let metric_column = formula.to_string();
    writer.write_record(["id", metric_column.as_str(), "tier"])?;
    for record in classified {
        let metric = format!("{:.1}", record.metric);
        writer.write_record([record.id(), metric.as_str(), record.tier_label.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RiskError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        RiskError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{GLUCOSE_DIABETES, GLUCOSE_NORMAL, GLUCOSE_PREDIABETES};
    use crate::domain::model::ValidRecord;
    use std::collections::BTreeMap;

    fn classified(table: &ThresholdTable, id: &str, metric: f64) -> ClassifiedRecord {
        let index = table.tier_index(metric);
        ClassifiedRecord {
            record: ValidRecord::new(id.to_string(), 1, BTreeMap::new()),
            metric,
            tier_index: index,
            tier_label: table.tiers()[index].label.clone(),
        }
    }

    #[test]
    fn test_summarize_counts_tiers_in_table_order() {
        let table = ThresholdTable::canonical(Formula::Glucose).unwrap();
        let records = vec![
            classified(&table, "a", 90.0),
            classified(&table, "b", 130.0),
            classified(&table, "c", 110.0),
            classified(&table, "d", 95.0),
        ];

        let summary = summarize(&records, &table, Formula::Glucose);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.count_for(GLUCOSE_NORMAL), 2);
        assert_eq!(summary.count_for(GLUCOSE_PREDIABETES), 1);
        assert_eq!(summary.count_for(GLUCOSE_DIABETES), 1);
        assert_eq!(summary.high_risk, 2);
        assert_eq!(summary.priority, 2);
        assert_eq!(summary.average_metric, Some(106.25));
    }

    #[test]
    fn test_report_lists_only_occurring_tiers() {
        let table = ThresholdTable::canonical(Formula::Glucose).unwrap();
        let records = vec![classified(&table, "a", 90.0), classified(&table, "b", 101.0)];
        let report = format_report(&summarize(&records, &table, Formula::Glucose));

        assert!(report.contains("Analysis complete: 2 patients processed"));
        assert!(report.contains("  Low risk (normal): 1\n"));
        assert!(report.contains("  High risk (prediabetes): 1\n"));
        assert!(!report.contains(GLUCOSE_DIABETES));
        assert!(report.contains("Average Glucose: 95.5\n"));
        assert!(report.contains("High-risk patients: 1\n"));
        assert!(report.contains("Patients prioritized for intervention: 1\n"));
    }

    #[test]
    fn test_empty_batch_report() {
        let table = ThresholdTable::canonical(Formula::Bmi).unwrap();
        let summary = summarize(&[], &table, Formula::Bmi);
        assert_eq!(summary.average_metric, None);

        let report = format_report(&summary);
        assert!(report.contains("Analysis complete: 0 patients processed"));
        assert!(report.contains("Average BMI: n/a"));
        assert!(report.contains("High-risk patients: 0"));
    }

    #[test]
    fn test_patient_table_line_format() {
        let table = ThresholdTable::canonical(Formula::Bmi).unwrap();
        let records = vec![classified(&table, "Patient A", 23.529)];
        let text = format_patient_table(&records, Formula::Bmi);
        assert!(text.contains("Patient A       | BMI:  23.5 | Risk: Low risk (normal)"));
    }

    #[test]
    fn test_classified_csv() {
        let table = ThresholdTable::canonical(Formula::Bmi).unwrap();
        let records = vec![classified(&table, "Patient, A", 33.3)];
        let csv = format_classified_csv(&records, Formula::Bmi).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["id,bmi,tier", "\"Patient, A\",33.3,High risk (obese)"]);
    }
}
