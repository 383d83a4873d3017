// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Audit report output.

use crate::services::audit::AuditEntry;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::{Path, PathBuf};

pub const JSON_DIR: &str = "reports_json";
pub const HTML_DIR: &str = "reports_html";
pub const SUMMARY_FILE: &str = "SUMMARY_REPORT.xlsx";

const HTML_VALUE_WIDTH: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel error: {0}")]
    Excel(String),
}

/// Which reports a batch run produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub json: bool,
    pub html: bool,
    pub summary: bool,
}

/// Write `<output>/reports_json/<stem>.json`.
pub fn write_json_report(
    output_dir: &Path,
    stem: &str,
    entries: &[AuditEntry],
) -> Result<PathBuf, ReportError> {
    let dir = output_dir.join(JSON_DIR);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.json", stem));
    fs::write(&path, serde_json::to_string_pretty(entries)?)?;
    Ok(path)
}

/// Write `<output>/reports_html/<stem>.html`.
pub fn write_html_report(
    output_dir: &Path,
    stem: &str,
    entries: &[AuditEntry],
) -> Result<PathBuf, ReportError> {
    let dir = output_dir.join(HTML_DIR);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.html", stem));
    fs::write(&path, render_html(stem, entries))?;
    Ok(path)
}

pub fn render_html(title: &str, entries: &[AuditEntry]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    html.push_str(
        "<style>\
         body{font-family:sans-serif}\
         table{border-collapse:collapse}\
         td,th{border:1px solid #ccc;padding:2px 6px}\
         .ok{color:#2a7a2a}.fail{color:#b00020;font-weight:bold}\
         </style>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(title)));
    html.push_str(
        "<table>\n<tr><th>TAG</th><th>ACT</th><th>STATUS</th><th>ORIGINAL</th><th>ANON</th></tr>\n",
    );
    for entry in entries {
        let class = if entry.status.is_failure() { "fail" } else { "ok" };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&entry.tag),
            escape_html(&entry.action),
            class,
            escape_html(entry.status.label()),
            escape_html(&truncate(&entry.original)),
            escape_html(&truncate(&entry.anonymized)),
        ));
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn truncate(value: &str) -> String {
    value.chars().take(HTML_VALUE_WIDTH).collect()
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write the aggregated audit of a whole run as a spreadsheet.
pub fn write_summary_report(path: &Path, entries: &[AuditEntry]) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Audit")
        .map_err(|e| ReportError::Excel(e.to_string()))?;

    let header_format = Format::new().set_bold();
    let headers = ["File", "Tag", "Action", "Status", "Original", "Anonymized"];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(|e| ReportError::Excel(e.to_string()))?;
    }

    for (i, entry) in entries.iter().enumerate() {
        let row = (i + 1) as u32;
        let cells = [
            entry.file.as_str(),
            entry.tag.as_str(),
            entry.action.as_str(),
            entry.status.label(),
            entry.original.as_str(),
            entry.anonymized.as_str(),
        ];
        for (col, value) in cells.iter().enumerate() {
            sheet
                .write_string(row, col as u16, *value)
                .map_err(|e| ReportError::Excel(e.to_string()))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| ReportError::Excel(e.to_string()))?;

    Ok(())
}
