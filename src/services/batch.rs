// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directory batch anonymization.
//!
//! All files of a run are merged into one new study. Files named
//! `IM-<series>-<image>.dcm` are ordered numerically and keep their series
//! grouping; every other file lands in a single trailing series.

use crate::dicom::{generate_uid, DataSet, DicomError, FileObject};
use crate::services::anonymizer::{sync_file_meta, AnonymizerEngine, UidOverrides};
use crate::services::audit::{self, AuditEntry, TagComparison};
use crate::services::reports::{self, ReportError, ReportOptions};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const DEIDENTIFICATION_METHOD: &str = "DICOM PS3.15 Basic Profile + SHA256";

const NON_PATTERN_SERIES: &str = "NON_PATTERN";

static IMAGE_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^IM-(\d+)-(\d+)\.dcm$").expect("valid file name pattern")
});

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] DicomError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Output directory {0} contains the input directory")]
    OutputContainsInput(PathBuf),
}

/// An input file and its place in the output ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: PathBuf,
    /// `(series, image)` digits when the name matches `IM-<s>-<i>.dcm`.
    pub image_key: Option<(String, String)>,
}

impl PlannedFile {
    fn series_key(&self) -> &str {
        self.image_key
            .as_ref()
            .map(|(series, _)| series.as_str())
            .unwrap_or(NON_PATTERN_SERIES)
    }

    fn sort_key(&self) -> (u64, u64) {
        match &self.image_key {
            Some((series, image)) => (
                series.parse().unwrap_or(u64::MAX),
                image.parse().unwrap_or(u64::MAX),
            ),
            None => (u64::MAX, u64::MAX),
        }
    }

    /// Name of the anonymized output file.
    pub fn output_name(&self, index: usize, padding: usize, study_suffix: &str) -> String {
        match &self.image_key {
            Some((series, image)) => format!("AN-{}-{}.dcm", series, image),
            None => format!("ST_{}_{:0width$}.dcm", study_suffix, index, width = padding),
        }
    }
}

/// All `.dcm` files directly inside `dir`, sorted by name.
pub fn collect_input_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_dicom = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("dcm"));
        if path.is_file() && is_dicom {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Clear `output_dir` for a fresh run.
///
/// Refuses an output directory that is the input directory or one of its
/// ancestors, so clearing it can never delete the source files.
pub fn prepare_output_dir(input_dir: &Path, output_dir: &Path) -> Result<(), BatchError> {
    if !output_dir.exists() {
        return Ok(());
    }
    let input = fs::canonicalize(input_dir)?;
    let output = fs::canonicalize(output_dir)?;
    if input.starts_with(&output) {
        return Err(BatchError::OutputContainsInput(output));
    }
    fs::remove_dir_all(output_dir)?;
    Ok(())
}

/// Order files for processing: pattern files by numeric (series, image),
/// then everything else in name order.
pub fn plan_files(mut files: Vec<PathBuf>) -> Vec<PlannedFile> {
    files.sort();
    let mut planned: Vec<PlannedFile> = files
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let image_key = IMAGE_FILE_NAME
                .captures(&name)
                .map(|c| (c[1].to_string(), c[2].to_string()));
            PlannedFile { path, image_key }
        })
        .collect();
    // Stable, so non-pattern files keep name order.
    planned.sort_by_key(PlannedFile::sort_key);
    planned
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub reports: ReportOptions,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub study_uid: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub audit_entries: usize,
    pub audit_failures: usize,
    /// Files anonymized and saved whose JSON or HTML report could not be written.
    pub report_failures: usize,
}

pub struct BatchAnonymizer {
    engine: AnonymizerEngine,
    options: BatchOptions,
}

impl BatchAnonymizer {
    pub fn new(engine: AnonymizerEngine, options: BatchOptions) -> Self {
        Self { engine, options }
    }

    /// Profile coverage of the first planned file.
    pub fn tag_comparison(
        &self,
        files: &[PlannedFile],
    ) -> Result<Option<TagComparison>, BatchError> {
        let Some(first) = files.first() else {
            return Ok(None);
        };
        let file = FileObject::open(&first.path)?;
        Ok(Some(TagComparison::new(&file.dataset, self.engine.profile())))
    }

    /// Anonymize every planned file into the output directory.
    ///
    /// Failures on individual files are logged and counted; they do not
    /// stop the run.
    pub fn run(&self, files: &[PlannedFile]) -> Result<BatchSummary, BatchError> {
        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir)?;

        let study_uid = generate_uid();
        let study_suffix = last_chars(&study_uid, 6);
        let total = files.len();
        let padding = total.to_string().len();
        tracing::info!(total, study_uid = %study_uid, "Starting batch anonymization");

        let mut series_key: Option<&str> = None;
        let mut series_uid = String::new();
        let mut audit_entries = Vec::new();
        let mut summary = BatchSummary {
            study_uid: study_uid.clone(),
            total,
            ..Default::default()
        };

        for (i, item) in files.iter().enumerate() {
            let index = i + 1;
            eprintln!("::PROGRESS::{}/{}::Anonymizing", index, total);

            if series_key != Some(item.series_key()) {
                series_key = Some(item.series_key());
                series_uid = generate_uid();
            }

            let overrides = UidOverrides {
                study_uid: Some(study_uid.clone()),
                series_uid: Some(series_uid.clone()),
            };
            let name = item.output_name(index, padding, &study_suffix);

            match self.process_file(item, index, &name, &overrides) {
                Ok(entries) => {
                    summary.succeeded += 1;
                    if let Err(e) = self.write_file_reports(&name, &entries) {
                        summary.report_failures += 1;
                        tracing::error!(file = %name, error = %e, "Error writing audit report");
                    }
                    audit_entries.extend(entries);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        path = %item.path.display(),
                        error = %e,
                        "Error processing file"
                    );
                }
            }
        }

        if self.options.reports.summary && !audit_entries.is_empty() {
            reports::write_summary_report(&output_dir.join(reports::SUMMARY_FILE), &audit_entries)?;
        }

        summary.audit_entries = audit_entries.len();
        summary.audit_failures = audit_entries
            .iter()
            .filter(|e| e.status.is_failure())
            .count();

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            audit_failures = summary.audit_failures,
            report_failures = summary.report_failures,
            "Batch anonymization finished"
        );
        Ok(summary)
    }

    fn process_file(
        &self,
        item: &PlannedFile,
        index: usize,
        name: &str,
        overrides: &UidOverrides,
    ) -> Result<Vec<AuditEntry>, BatchError> {
        let mut file = FileObject::open(&item.path)?;
        let original = file.dataset.clone();
        let original_patient_id = original.keyword_string("PatientID").unwrap_or_default();

        self.engine.anonymize_dataset(&mut file.dataset, overrides);
        self.engine
            .pseudonymize_patient(&mut file.dataset, &original_patient_id)?;
        finalize(&mut file.dataset, index)?;
        sync_file_meta(&mut file);

        file.save(self.options.output_dir.join(name))?;

        Ok(audit::compare(&original, &file.dataset, self.engine.profile(), name))
    }

    fn write_file_reports(&self, name: &str, entries: &[AuditEntry]) -> Result<(), ReportError> {
        let output_dir = &self.options.output_dir;
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        if self.options.reports.json {
            reports::write_json_report(output_dir, &stem, entries)?;
        }
        if self.options.reports.html {
            reports::write_html_report(output_dir, &stem, entries)?;
        }
        Ok(())
    }
}

/// Stamp batch-level attributes on an anonymized dataset.
fn finalize(ds: &mut DataSet, index: usize) -> Result<(), DicomError> {
    let today = chrono::Local::now().format("%Y%m%d").to_string();
    ds.set_keyword("StudyDate", &today)?;
    ds.set_keyword("SeriesDate", &today)?;
    ds.set_keyword("ContentDate", &today)?;
    ds.set_keyword("InstanceNumber", &index.to_string())?;
    ds.set_keyword("DeidentificationMethod", DEIDENTIFICATION_METHOD)?;
    Ok(())
}

fn last_chars(value: &str, n: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    chars[chars.len().saturating_sub(n)..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/in").join(n)).collect()
    }

    fn names(planned: &[PlannedFile]) -> Vec<String> {
        planned
            .iter()
            .map(|p| p.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_plan_orders_pattern_files_numerically() {
        let planned = plan_files(paths(&[
            "zeta.dcm",
            "IM-2-1.dcm",
            "IM-1-10.dcm",
            "alpha.dcm",
            "im-1-2.DCM",
        ]));
        assert_eq!(
            names(&planned),
            vec!["im-1-2.DCM", "IM-1-10.dcm", "IM-2-1.dcm", "alpha.dcm", "zeta.dcm"]
        );
        assert_eq!(planned[0].series_key(), "1");
        assert_eq!(planned[3].series_key(), NON_PATTERN_SERIES);
    }

    #[test]
    fn test_output_names() {
        let planned = plan_files(paths(&["IM-0003-0012.dcm", "scan.dcm"]));
        assert_eq!(planned[0].output_name(1, 3, "123456"), "AN-0003-0012.dcm");
        assert_eq!(planned[1].output_name(2, 3, "123456"), "ST_123456_002.dcm");
    }

    #[test]
    fn test_output_dir_must_not_contain_input() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("study");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("IM-1-1.dcm"), b"source").unwrap();

        for output in [input.clone(), root.path().to_path_buf(), input.join("..")] {
            let err = prepare_output_dir(&input, &output).unwrap_err();
            assert!(matches!(err, BatchError::OutputContainsInput(_)), "{}", output.display());
        }
        assert!(input.join("IM-1-1.dcm").exists());
    }

    #[test]
    fn test_stale_output_dir_is_cleared() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("study");
        let output = root.path().join("out");
        fs::create_dir(&input).unwrap();
        fs::create_dir(&output).unwrap();
        fs::write(output.join("AN-1-1.dcm"), b"stale").unwrap();

        prepare_output_dir(&input, &output).unwrap();
        assert!(!output.exists());
        prepare_output_dir(&input, &root.path().join("missing")).unwrap();
    }

    #[test]
    fn test_last_chars() {
        assert_eq!(last_chars("2.25.1234567890", 6), "567890");
        assert_eq!(last_chars("123", 6), "123");
    }
}
