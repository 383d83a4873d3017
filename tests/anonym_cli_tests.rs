// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests that drive the `anonym` binary end to end.

use measurement_api::dicom::{FileObject, Tag};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

mod common;

use common::{sample_file, INSTITUTION_NAME};

const MODALITY: Tag = Tag::new(0x0008, 0x0060);
const PRIVATE_CREATOR: Tag = Tag::new(0x0029, 0x0010);

fn write_study(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for (i, name) in names.iter().enumerate() {
        let sop = format!("1.2.826.0.1.3680043.2.1.{}", i + 1);
        fs::write(dir.join(name), sample_file("PAT-7", &sop)).unwrap();
    }
}

fn anonym(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_anonym"))
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .env("PEPPER", "cli_pepper")
        .args(args)
        .output()
        .unwrap()
}

fn open(path: &Path) -> FileObject {
    FileObject::open(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

#[test]
fn test_default_output_is_named_after_the_input() {
    let root = tempfile::tempdir().unwrap();
    write_study(&root.path().join("study_a"), &["IM-1-1.dcm", "IM-1-2.dcm"]);

    let out = anonym(root.path(), &["--input_dir", "study_a", "--json_report"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let output = root.path().join("output").join("study_a");
    assert!(output.join("AN-1-1.dcm").is_file());
    assert!(output.join("AN-1-2.dcm").is_file());
    assert!(output.join("reports_json").join("AN-1-2.json").is_file());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("::PROGRESS::2/2::Anonymizing"));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Done!"));
}

#[test]
fn test_output_enclosing_the_input_is_refused() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("study");
    write_study(&input, &["IM-1-1.dcm"]);

    for output in ["study", "."] {
        let out = anonym(
            root.path(),
            &["--input_dir", "study", "--output_dir", output],
        );
        assert!(!out.status.success(), "output {} accepted", output);
        assert!(input.join("IM-1-1.dcm").is_file());
    }
    assert!(!input.join("AN-1-1.dcm").exists());
}

#[test]
fn test_stale_output_is_replaced() {
    let root = tempfile::tempdir().unwrap();
    write_study(&root.path().join("study"), &["IM-1-1.dcm"]);
    let output = root.path().join("out");
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("AN-9-9.dcm"), b"previous run").unwrap();

    let out = anonym(root.path(), &["--input_dir", "study", "--output_dir", "out"]);
    assert!(out.status.success());
    assert!(output.join("AN-1-1.dcm").is_file());
    assert!(!output.join("AN-9-9.dcm").exists());
}

#[test]
fn test_profile_precedence() {
    let root = tempfile::tempdir().unwrap();
    write_study(&root.path().join("study"), &["IM-1-1.dcm"]);
    fs::create_dir_all(root.path().join("config")).unwrap();
    fs::write(
        root.path().join("config").join("dicom_ps3_15_profile.json"),
        r#"{"Modality": "X"}"#,
    )
    .unwrap();
    fs::write(root.path().join("custom.json"), r#"{"InstitutionName": "X"}"#).unwrap();

    // The profile under config/ beats the built-in one.
    let out = anonym(root.path(), &["--input_dir", "study", "--output_dir", "a"]);
    assert!(out.status.success());
    let ds = open(&root.path().join("a").join("AN-1-1.dcm")).dataset;
    assert!(!ds.contains(MODALITY));
    assert!(ds.contains(INSTITUTION_NAME));

    // --profile beats both.
    let out = anonym(
        root.path(),
        &["--input_dir", "study", "--output_dir", "b", "--profile", "custom.json"],
    );
    assert!(out.status.success());
    let ds = open(&root.path().join("b").join("AN-1-1.dcm")).dataset;
    assert!(ds.contains(MODALITY));
    assert!(!ds.contains(INSTITUTION_NAME));
}

#[test]
fn test_bad_explicit_profile_fails_before_writing() {
    let root = tempfile::tempdir().unwrap();
    write_study(&root.path().join("study"), &["IM-1-1.dcm"]);
    fs::write(root.path().join("typo.json"), r#"{"PatientNmae": "X"}"#).unwrap();

    let out = anonym(
        root.path(),
        &["--input_dir", "study", "--output_dir", "out", "--profile", "typo.json"],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("PatientNmae"));
    assert!(!root.path().join("out").exists());
}

#[test]
fn test_failed_file_sets_exit_code() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("study");
    write_study(&input, &["IM-1-1.dcm"]);
    fs::write(input.join("IM-1-2.dcm"), b"truncated").unwrap();

    let out = anonym(root.path(), &["--input_dir", "study", "--output_dir", "out"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(root.path().join("out").join("AN-1-1.dcm").is_file());
}

#[test]
fn test_private_tags_can_be_kept() {
    let root = tempfile::tempdir().unwrap();
    write_study(&root.path().join("study"), &["IM-1-1.dcm"]);

    let out = anonym(root.path(), &["--input_dir", "study", "--output_dir", "removed"]);
    assert!(out.status.success());
    let ds = open(&root.path().join("removed").join("AN-1-1.dcm")).dataset;
    assert!(!ds.contains(PRIVATE_CREATOR));

    let out = anonym(
        root.path(),
        &["--input_dir", "study", "--output_dir", "kept", "--keep_private_tags"],
    );
    assert!(out.status.success());
    let ds = open(&root.path().join("kept").join("AN-1-1.dcm")).dataset;
    assert!(ds.contains(PRIVATE_CREATOR));
}

#[test]
fn test_empty_input_is_not_an_error() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("empty")).unwrap();

    let out = anonym(root.path(), &["--input_dir", "empty"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("No files found."));
    assert!(!root.path().join("output").exists());
}
