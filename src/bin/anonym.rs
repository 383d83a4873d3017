// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Batch DICOM anonymizer.
//!
//! Anonymizes every `.dcm` file of a directory into a single new study and
//! optionally writes per-file audit reports and a spreadsheet summary.

use clap::Parser;
use measurement_api::config::DEFAULT_PROFILE_PATH;
use measurement_api::services::batch::{self, BatchAnonymizer, BatchOptions};
use measurement_api::services::reports::ReportOptions;
use measurement_api::services::{AnonymizerEngine, Profile};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_PEPPER: &str = "default_pepper_if_env_missing";

#[derive(Parser, Debug)]
#[command(name = "anonym", about = "Anonymize a directory of DICOM files")]
struct Args {
    /// Directory containing the input .dcm files
    #[arg(long = "input_dir", alias = "input-dir")]
    input_dir: Option<PathBuf>,

    /// Output directory (defaults to output/<input dir name>)
    #[arg(long = "output_dir", alias = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Anonymization profile JSON
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Write a JSON audit report per file
    #[arg(long = "json_report", alias = "json-report")]
    json_report: bool,

    /// Write an HTML audit report per file
    #[arg(long = "html_report", alias = "html-report")]
    html_report: bool,

    /// Write SUMMARY_REPORT.xlsx for the whole run
    #[arg(long = "summary_report", alias = "summary-report")]
    summary_report: bool,

    /// Show detailed tag comparison between the first file and the profile
    #[arg(long)]
    comparison: bool,

    /// Log each tag processing action as it happens
    #[arg(long)]
    actions: bool,

    /// Keep private (odd group) attributes instead of removing them
    #[arg(long = "keep_private_tags", alias = "keep-private-tags")]
    keep_private_tags: bool,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let Some(input_dir) = args.input_dir.clone() else {
        eprintln!("Please provide --input_dir argument");
        return ExitCode::FAILURE;
    };

    match run(&args, &input_dir) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Batch anonymization failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, input_dir: &Path) -> anyhow::Result<ExitCode> {
    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        let stem = input_dir
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch".to_string());
        PathBuf::from("output").join(stem)
    });

    // Inputs are gathered before the output directory is touched.
    let files = batch::collect_input_files(input_dir)?;
    if files.is_empty() {
        println!("No files found.");
        return Ok(ExitCode::SUCCESS);
    }
    let planned = batch::plan_files(files);

    let profile = load_profile(args.profile.as_deref())?;
    batch::prepare_output_dir(input_dir, &output_dir)?;

    let pepper = std::env::var("PEPPER")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PEPPER.to_string());
    let engine = AnonymizerEngine::new(profile, pepper)
        .with_private_tags_removed(!args.keep_private_tags)
        .with_trace_actions(args.actions);

    let runner = BatchAnonymizer::new(
        engine,
        BatchOptions {
            output_dir: output_dir.clone(),
            reports: ReportOptions {
                json: args.json_report,
                html: args.html_report,
                summary: args.summary_report,
            },
        },
    );

    if args.comparison {
        if let Some(comparison) = runner.tag_comparison(&planned)? {
            println!("{}", comparison);
        }
    }

    let summary = runner.run(&planned)?;
    println!(
        "Done! {} of {} files anonymized, {} audit failures. Folder: {}",
        summary.succeeded,
        summary.total,
        summary.audit_failures,
        output_dir.display()
    );

    Ok(if summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `--profile`, then the default profile path if present, then the built-in one.
///
/// A profile named on the command line must load; the default path falls
/// back to the built-in profile with a warning.
fn load_profile(explicit: Option<&Path>) -> anyhow::Result<Profile> {
    if let Some(path) = explicit {
        return Ok(Profile::load_from_file(path)?);
    }
    let default = Path::new(DEFAULT_PROFILE_PATH);
    if default.exists() {
        return Ok(Profile::load_or_builtin(default));
    }
    Ok(Profile::builtin())
}

/// Plain text logs on stderr, leaving stdout for results.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("anonym=info,measurement_api=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
