//! Validate stage: advisory quality checks over the cleaned datasets
//!
//! The validator never mutates or rejects data. It accumulates structured
//! findings the caller can log, alert on, or (when the validation gate is
//! enforced) use to skip the load step.

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::pipeline::artifacts::{ArtifactStore, DatasetKind, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

/// One quality issue: which dataset, which rule, how many rows
#[derive(Debug, Clone)]
pub struct Finding {
    pub dataset: String,
    pub rule: String,
    pub severity: Severity,
    pub count: usize,
    pub message: String,
}

/// All findings from one validation run
#[derive(Debug, Default)]
pub struct ValidationReport {
    findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn has_errors(&self) -> bool {
        self.findings
            .iter()
            .any(|f| matches!(f.severity, Severity::Error | Severity::Critical))
    }

    fn push(&mut self, dataset: &str, rule: &str, severity: Severity, count: usize, message: String) {
        match severity {
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
            Severity::Critical => error!("CRITICAL: {}", message),
        }
        self.findings.push(Finding {
            dataset: dataset.to_string(),
            rule: rule.to_string(),
            severity,
            count,
            message,
        });
    }
}

/// Validation expectations for one dataset
struct DatasetChecks {
    kind: DatasetKind,
    required_columns: &'static [&'static str],
    primary_keys: &'static [&'static str],
}

const CHECKS: [DatasetChecks; 3] = [
    DatasetChecks {
        kind: DatasetKind::ArtistStreams,
        required_columns: &["artist_id", "artist_name", "popularity", "followers"],
        primary_keys: &["artist_id"],
    },
    DatasetChecks {
        kind: DatasetKind::Playlists,
        required_columns: &["playlist_id", "playlist_name", "total_tracks"],
        primary_keys: &["playlist_id"],
    },
    DatasetChecks {
        kind: DatasetKind::PlaylistStreams,
        required_columns: &["playlist_id", "track_id", "track_name", "duration_ms"],
        primary_keys: &["playlist_id", "track_id"],
    },
];

/// Read-only checks over one dataset's untyped rows
pub struct DatasetValidator<'a> {
    rows: &'a [Map<String, Value>],
    name: &'a str,
}

impl<'a> DatasetValidator<'a> {
    pub fn new(rows: &'a [Map<String, Value>], name: &'a str) -> Self {
        Self { rows, name }
    }

    /// All required columns must be present in every row's schema.
    /// Returns false on a mismatch, which skips the remaining checks.
    pub fn validate_schema(&self, report: &mut ValidationReport, required: &[&str]) -> bool {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|col| !self.rows.iter().any(|row| row.contains_key(*col)))
            .collect();

        if !self.rows.is_empty() && !missing.is_empty() {
            report.push(
                self.name,
                "schema",
                Severity::Error,
                missing.len(),
                format!("SCHEMA MISMATCH in {}: missing columns {:?}", self.name, missing),
            );
            return false;
        }
        info!("Schema check passed for {}", self.name);
        true
    }

    /// Count nulls in each critical column (warning, not blocking)
    pub fn check_nulls(&self, report: &mut ValidationReport, critical: &[&str]) {
        for col in critical {
            let null_count = self
                .rows
                .iter()
                .filter(|row| row.get(*col).map(Value::is_null).unwrap_or(true))
                .count();
            if null_count > 0 {
                report.push(
                    self.name,
                    "nulls",
                    Severity::Warning,
                    null_count,
                    format!(
                        "DATA QUALITY ALERT: found {} NULLs in {} column '{}'",
                        null_count, self.name, col
                    ),
                );
            }
        }
        info!("Null value check complete for {}", self.name);
    }

    /// Domain rules, applied wherever the relevant column exists:
    /// popularity in [0,100], duration_ms > 0, followers >= 0
    pub fn validate_logical_rules(&self, report: &mut ValidationReport) {
        self.count_violations(report, "popularity", |v| !(0..=100).contains(&v), |n| {
            format!("INTEGRITY ERROR: {n} records with invalid popularity")
        });
        self.count_violations(report, "duration_ms", |v| v <= 0, |n| {
            format!("INTEGRITY ERROR: {n} tracks with 0 or negative duration")
        });
        self.count_violations(report, "followers", |v| v < 0, |n| {
            format!("INTEGRITY ERROR: {n} records with negative follower counts")
        });
    }

    fn count_violations(
        &self,
        report: &mut ValidationReport,
        column: &str,
        is_invalid: impl Fn(i64) -> bool,
        describe: impl Fn(usize) -> String,
    ) {
        if !self.rows.iter().any(|row| row.contains_key(column)) {
            return;
        }
        let count = self
            .rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Value::as_i64))
            .filter(|v| is_invalid(*v))
            .count();
        if count > 0 {
            report.push(
                self.name,
                column,
                Severity::Error,
                count,
                format!("{} in {}", describe(count), self.name),
            );
        }
    }

    /// Count duplicate primary-key combinations (warning, not blocking)
    pub fn check_uniqueness(&self, report: &mut ValidationReport, primary_keys: &[&str]) {
        let all_present = primary_keys
            .iter()
            .all(|key| self.rows.iter().any(|row| row.contains_key(*key)));
        if !all_present {
            return;
        }

        let mut seen = std::collections::HashSet::new();
        let mut duplicates = 0;
        for row in self.rows {
            let key: Vec<String> = primary_keys
                .iter()
                .map(|k| row.get(*k).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            if !seen.insert(key) {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            report.push(
                self.name,
                "uniqueness",
                Severity::Warning,
                duplicates,
                format!(
                    "DUPLICATE ALERT: found {} duplicate records in {} based on keys {:?}",
                    duplicates, self.name, primary_keys
                ),
            );
        } else {
            info!("Uniqueness check passed for {}", self.name);
        }
    }
}

/// Validate all three cleaned datasets. A failure reading one dataset is
/// recorded as a critical finding; the remaining datasets are still
/// validated.
pub fn run_validation(store: &ArtifactStore) -> ValidationReport {
    let mut report = ValidationReport::default();

    info!("Starting data validation suite");

    for checks in &CHECKS {
        let name = checks.kind.name();
        let artifact = store.artifact(checks.kind, Stage::Cleaned);

        let rows = match artifact.read_rows() {
            Ok(Some(rows)) => rows,
            Ok(None) => {
                report.push(
                    name,
                    "artifact_missing",
                    Severity::Warning,
                    0,
                    format!("Skipping {}: artifact not found at {:?}", name, artifact.path()),
                );
                continue;
            }
            Err(e) => {
                report.push(
                    name,
                    "read_failure",
                    Severity::Critical,
                    0,
                    format!("Validation crashed for {}: {}", name, e),
                );
                continue;
            }
        };

        let validator = DatasetValidator::new(&rows, name);
        if !validator.validate_schema(&mut report, checks.required_columns) {
            continue;
        }
        validator.check_nulls(&mut report, checks.required_columns);
        validator.validate_logical_rules(&mut report);
        validator.check_uniqueness(&mut report, checks.primary_keys);
    }

    info!(
        "Validation complete: {} findings ({} blocking)",
        report.findings().len(),
        report
            .findings()
            .iter()
            .filter(|f| f.severity != Severity::Warning)
            .count()
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_from(json: &[&str]) -> Vec<Map<String, Value>> {
        json.iter()
            .map(|j| serde_json::from_str(j).unwrap())
            .collect()
    }

    #[test]
    fn test_out_of_range_popularity_is_one_error_finding() {
        let rows = rows_from(&[
            r#"{"artist_id":"A1","artist_name":"X","popularity":150,"followers":10}"#,
            r#"{"artist_id":"A2","artist_name":"Y","popularity":50,"followers":10}"#,
        ]);
        let mut report = ValidationReport::default();
        let validator = DatasetValidator::new(&rows, "artist_streams");
        validator.validate_logical_rules(&mut report);

        let errors: Vec<_> = report
            .findings()
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "popularity");
        assert_eq!(errors[0].count, 1);

        // advisory only: the offending row is untouched
        assert_eq!(rows[0]["popularity"], Value::from(150));
    }

    #[test]
    fn test_missing_column_fails_schema_check() {
        let rows = rows_from(&[r#"{"artist_id":"A1","popularity":50}"#]);
        let mut report = ValidationReport::default();
        let validator = DatasetValidator::new(&rows, "artist_streams");

        let ok = validator.validate_schema(
            &mut report,
            &["artist_id", "artist_name", "popularity", "followers"],
        );

        assert!(!ok);
        assert!(report.has_errors());
        assert_eq!(report.findings()[0].rule, "schema");
        assert_eq!(report.findings()[0].count, 2);
    }

    #[test]
    fn test_null_counts_are_warnings() {
        let rows = rows_from(&[
            r#"{"playlist_id":"p1","playlist_name":null,"total_tracks":3}"#,
            r#"{"playlist_id":"p2","playlist_name":"Mix","total_tracks":5}"#,
        ]);
        let mut report = ValidationReport::default();
        let validator = DatasetValidator::new(&rows, "playlists");
        validator.check_nulls(&mut report, &["playlist_id", "playlist_name", "total_tracks"]);

        assert!(!report.has_errors());
        let finding = &report.findings()[0];
        assert_eq!(finding.rule, "nulls");
        assert_eq!(finding.count, 1);
    }

    #[test]
    fn test_duplicate_keys_are_warnings() {
        let rows = rows_from(&[
            r#"{"playlist_id":"p1","track_id":"t1","track_name":"a","duration_ms":1}"#,
            r#"{"playlist_id":"p1","track_id":"t1","track_name":"b","duration_ms":2}"#,
            r#"{"playlist_id":"p1","track_id":"t2","track_name":"c","duration_ms":3}"#,
        ]);
        let mut report = ValidationReport::default();
        let validator = DatasetValidator::new(&rows, "playlist_streams");
        validator.check_uniqueness(&mut report, &["playlist_id", "track_id"]);

        assert_eq!(report.findings().len(), 1);
        assert_eq!(report.findings()[0].severity, Severity::Warning);
        assert_eq!(report.findings()[0].count, 1);
    }

    #[test]
    fn test_rules_skip_absent_columns() {
        // playlists have no popularity or duration_ms columns
        let rows = rows_from(&[
            r#"{"playlist_id":"p1","playlist_name":"Mix","total_tracks":3,"followers":4}"#,
        ]);
        let mut report = ValidationReport::default();
        let validator = DatasetValidator::new(&rows, "playlists");
        validator.validate_logical_rules(&mut report);

        assert!(report.findings().is_empty());
    }

    #[test]
    fn test_missing_artifact_is_warning_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let report = run_validation(&store);

        // one missing-artifact warning per dataset, nothing blocking
        assert_eq!(report.findings().len(), 3);
        assert!(!report.has_errors());
        assert!(report
            .findings()
            .iter()
            .all(|f| f.rule == "artifact_missing"));
    }
}
