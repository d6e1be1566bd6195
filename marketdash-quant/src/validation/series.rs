//! Precondition checks for dated series.
//!
//! Transforms process samples positionally and never sort or dedupe. This
//! validator reports whether a series meets the expected shape:
//! - Finite values (no NaN or infinity)
//! - Date order (non-decreasing)
//! - Unique dates
//! - Date gaps (no gap longer than the configured number of days)

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data::Sample;

/// Result of a single validation check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// All checks for one series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
    pub name: String,
    pub samples: usize,
    pub checks: Vec<CheckResult>,
}

impl SeriesReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        format!(
            "{} ({} samples): {}/{} checks passed",
            self.name,
            self.samples,
            passed,
            self.checks.len()
        )
    }
}

/// Validator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesValidatorConfig {
    /// Largest allowed distance between consecutive dates, in days.
    pub max_gap_days: i64,
    /// Examples listed in a failing check's details.
    pub max_examples: usize,
}

impl Default for SeriesValidatorConfig {
    fn default() -> Self {
        Self {
            max_gap_days: 7,
            max_examples: 5,
        }
    }
}

/// Validator for series preconditions.
#[derive(Debug, Clone, Default)]
pub struct SeriesValidator {
    config: SeriesValidatorConfig,
}

impl SeriesValidator {
    pub fn new(config: SeriesValidatorConfig) -> Self {
        Self { config }
    }

    /// Run every check on `series`.
    pub fn validate(&self, name: &str, series: &[Sample]) -> SeriesReport {
        SeriesReport {
            name: name.to_string(),
            samples: series.len(),
            checks: vec![
                self.check_finite(series),
                self.check_order(series),
                self.check_unique(series),
                self.check_gaps(series),
            ],
        }
    }

    fn check_finite(&self, series: &[Sample]) -> CheckResult {
        let bad: Vec<String> = series
            .iter()
            .filter(|s| !s.value.is_finite())
            .map(|s| format!("{}={}", s.date, s.value))
            .collect();

        if bad.is_empty() {
            CheckResult::pass("finite_values", "All values finite")
        } else {
            CheckResult::fail(
                "finite_values",
                &format!("{} non-finite values", bad.len()),
                Some(self.examples(bad)),
            )
        }
    }

    fn check_order(&self, series: &[Sample]) -> CheckResult {
        let bad: Vec<String> = series
            .windows(2)
            .filter(|w| w[1].date < w[0].date)
            .map(|w| format!("{} after {}", w[1].date, w[0].date))
            .collect();

        if bad.is_empty() {
            CheckResult::pass("date_order", "Dates non-decreasing")
        } else {
            CheckResult::fail(
                "date_order",
                &format!("{} out-of-order dates", bad.len()),
                Some(self.examples(bad)),
            )
        }
    }

    fn check_unique(&self, series: &[Sample]) -> CheckResult {
        let mut seen = HashSet::with_capacity(series.len());
        let dupes: Vec<String> = series
            .iter()
            .filter(|s| !seen.insert(s.date))
            .map(|s| s.date.to_string())
            .collect();

        if dupes.is_empty() {
            CheckResult::pass("unique_dates", "No duplicate dates")
        } else {
            CheckResult::fail(
                "unique_dates",
                &format!("{} duplicate dates", dupes.len()),
                Some(self.examples(dupes)),
            )
        }
    }

    fn check_gaps(&self, series: &[Sample]) -> CheckResult {
        let gaps: Vec<String> = series
            .windows(2)
            .filter_map(|w| {
                let days = (w[1].date - w[0].date).num_days();
                (days > self.config.max_gap_days)
                    .then(|| format!("{} to {} ({} days)", w[0].date, w[1].date, days))
            })
            .collect();

        if gaps.is_empty() {
            CheckResult::pass(
                "date_gaps",
                &format!("No gaps over {} days", self.config.max_gap_days),
            )
        } else {
            CheckResult::fail(
                "date_gaps",
                &format!("{} major gaps found", gaps.len()),
                Some(self.examples(gaps)),
            )
        }
    }

    fn examples(&self, items: Vec<String>) -> String {
        let total = items.len();
        let mut shown: Vec<String> = items.into_iter().take(self.config.max_examples).collect();
        if total > shown.len() {
            shown.push(format!("... {} more", total - shown.len()));
        }
        shown.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample(day: u32, value: f64) -> Sample {
        Sample {
            date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            value,
        }
    }

    #[test]
    fn test_clean_series_passes() {
        let series = vec![sample(1, 1.0), sample(2, 2.0), sample(5, 3.0)];
        let report = SeriesValidator::default().validate("vix", &series);
        assert!(report.all_passed());
        assert_eq!(report.summary(), "vix (3 samples): 4/4 checks passed");
    }

    #[test]
    fn test_detects_duplicates_and_order() {
        let series = vec![sample(3, 1.0), sample(2, 2.0), sample(2, 3.0)];
        let report = SeriesValidator::default().validate("cot", &series);

        let failed: Vec<&str> = report.failed_checks().into_iter().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["date_order", "unique_dates"]);
    }

    #[test]
    fn test_detects_non_finite_and_gaps() {
        // Sample::new would reject NaN; build the struct directly.
        let series = vec![sample(1, 1.0), sample(20, f64::NAN)];
        let report = SeriesValidator::default().validate("raw", &series);

        let failed: Vec<&str> = report.failed_checks().into_iter().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["finite_values", "date_gaps"]);
    }

    #[test]
    fn test_example_truncation() {
        let validator = SeriesValidator::new(SeriesValidatorConfig {
            max_gap_days: 7,
            max_examples: 2,
        });
        let series: Vec<Sample> = (1..=5).map(|_| sample(1, 1.0)).collect();
        let report = validator.validate("dupes", &series);
        let unique = &report.checks[2];
        assert!(!unique.passed);
        assert_eq!(unique.details.as_deref(), Some("2024-02-01, 2024-02-01, ... 2 more"));
    }
}
