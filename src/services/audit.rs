// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Before/after verification of anonymized datasets.

use crate::dicom::DataSet;
use crate::services::anonymizer::{SERIES_INSTANCE_UID, STUDY_INSTANCE_UID};
use crate::services::profile::{Action, Profile};
use serde::{Serialize, Serializer};
use std::fmt;

/// Placeholder for an attribute absent from the anonymized dataset.
pub const MISSING: &str = "MISSING";

/// Verdict for one audited attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Ok,
    Leak,
    NotEmpty,
    NoChange,
    UidMatch,
    ShouldDelete,
}

impl AuditStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AuditStatus::Ok => "OK",
            AuditStatus::Leak => "FAIL (Leak)",
            AuditStatus::NotEmpty => "FAIL (Not Empty)",
            AuditStatus::NoChange => "FAIL (No Change)",
            AuditStatus::UidMatch => "FAIL (UID match)",
            AuditStatus::ShouldDelete => "FAIL (Should delete)",
        }
    }

    pub fn is_failure(&self) -> bool {
        *self != AuditStatus::Ok
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AuditStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One row of an audit report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditEntry {
    pub file: String,
    pub tag: String,
    pub action: String,
    pub status: AuditStatus,
    pub original: String,
    pub anonymized: String,
}

/// Compare a dataset before and after anonymization against the profile.
///
/// Only attributes the profile names are audited. Nested attributes are
/// reported with a `Sequence[index].Keyword` path.
pub fn compare(
    original: &DataSet,
    anonymized: &DataSet,
    profile: &Profile,
    file: &str,
) -> Vec<AuditEntry> {
    let mut entries = Vec::new();
    compare_into(original, Some(anonymized), profile, file, "", &mut entries);
    entries
}

fn compare_into(
    original: &DataSet,
    anonymized: Option<&DataSet>,
    profile: &Profile,
    file: &str,
    path: &str,
    entries: &mut Vec<AuditEntry>,
) {
    for element in original.iter() {
        let Some(keyword) = element.keyword() else {
            continue;
        };
        let current = if path.is_empty() {
            keyword.to_string()
        } else {
            format!("{}.{}", path, keyword)
        };
        let out = anonymized.and_then(|ds| ds.get(element.tag));
        let anonymized_value = out
            .map(|e| e.display_value())
            .unwrap_or_else(|| MISSING.to_string());
        let action = profile.action(keyword);

        if let Some(items) = element.items() {
            if action == Some(Action::Remove) {
                let status = if out.is_none() {
                    AuditStatus::Ok
                } else {
                    AuditStatus::ShouldDelete
                };
                entries.push(AuditEntry {
                    file: file.to_string(),
                    tag: current,
                    action: "X (Seq)".to_string(),
                    status,
                    original: "Seq".to_string(),
                    anonymized: anonymized_value,
                });
            } else if let Some(out_items) = out.and_then(|e| e.items()) {
                for (i, (item, out_item)) in items.iter().zip(out_items).enumerate() {
                    let nested = format!("{}[{}]", current, i);
                    compare_into(item, Some(out_item), profile, file, &nested, entries);
                }
            }
            continue;
        }

        let Some(action) = action else {
            continue;
        };
        let original_value = element.display_value();

        let status = if keyword == STUDY_INSTANCE_UID || keyword == SERIES_INSTANCE_UID {
            // Replaced with batch-wide UIDs.
            AuditStatus::Ok
        } else {
            match action {
                Action::Remove if out.is_some() && !anonymized_value.is_empty() => {
                    AuditStatus::Leak
                }
                Action::Dummy if !anonymized_value.is_empty() => AuditStatus::NotEmpty,
                Action::Zero
                    if out.is_some()
                        && !original_value.is_empty()
                        && original_value == anonymized_value =>
                {
                    AuditStatus::NoChange
                }
                Action::Uid if original_value == anonymized_value => AuditStatus::UidMatch,
                _ => AuditStatus::Ok,
            }
        };

        entries.push(AuditEntry {
            file: file.to_string(),
            tag: current,
            action: action.code().to_string(),
            status,
            original: original_value,
            anonymized: anonymized_value,
        });
    }
}

/// Coverage of a dataset's top-level attributes by a profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagComparison {
    pub dataset_keywords: Vec<String>,
    pub covered: Vec<(String, Action)>,
    pub not_in_profile: Vec<String>,
    pub profile_only: Vec<String>,
}

impl TagComparison {
    pub fn new(ds: &DataSet, profile: &Profile) -> Self {
        let mut dataset_keywords: Vec<String> = ds
            .iter()
            .filter_map(|e| e.keyword())
            .map(str::to_string)
            .collect();
        dataset_keywords.sort();

        let mut covered = Vec::new();
        let mut not_in_profile = Vec::new();
        for keyword in &dataset_keywords {
            match profile.action(keyword) {
                Some(action) => covered.push((keyword.clone(), action)),
                None => not_in_profile.push(keyword.clone()),
            }
        }

        let profile_only = profile
            .keywords()
            .filter(|k| !dataset_keywords.iter().any(|d| d == k))
            .map(str::to_string)
            .collect();

        Self {
            dataset_keywords,
            covered,
            not_in_profile,
            profile_only,
        }
    }
}

const RULE: &str = "==================================================";

impl fmt::Display for TagComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "DICOM TAG vs CONFIG PROFILE COMPARISON")?;
        writeln!(f, "{}", RULE)?;

        writeln!(f)?;
        writeln!(f, "ALL TAGS PRESENT IN THIS DICOM FILE ({}):", self.dataset_keywords.len())?;
        for keyword in &self.dataset_keywords {
            writeln!(f, "  - {}", keyword)?;
        }

        writeln!(f)?;
        writeln!(f, "MATCHING TAGS (Found in both DICOM and Config - {}):", self.covered.len())?;
        for (keyword, action) in &self.covered {
            writeln!(f, "  - {} (Action: {})", keyword, action)?;
        }

        writeln!(f)?;
        writeln!(f, "TAGS IN DICOM BUT NOT IN CONFIG ({}):", self.not_in_profile.len())?;
        for keyword in &self.not_in_profile {
            writeln!(f, "  - {}", keyword)?;
        }

        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "SUMMARY")?;
        writeln!(f, "Total Tags in File:   {}", self.dataset_keywords.len())?;
        writeln!(f, "Matching Rules:       {}", self.covered.len())?;
        writeln!(f, "Missing from Config:  {}", self.not_in_profile.len())?;
        writeln!(f, "{}", RULE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::{Element, Tag, Vr};

    const PATIENT_NAME: Tag = Tag::new(0x0010, 0x0010);
    const PATIENT_AGE: Tag = Tag::new(0x0010, 0x1010);
    const INSTITUTION_NAME: Tag = Tag::new(0x0008, 0x0080);
    const SOP_INSTANCE: Tag = Tag::new(0x0008, 0x0018);
    const STUDY_UID: Tag = Tag::new(0x0020, 0x000D);
    const OTHER_IDS: Tag = Tag::new(0x0010, 0x1002);
    const MODALITY: Tag = Tag::new(0x0008, 0x0060);

    fn profile() -> Profile {
        Profile::from_json(
            r#"{
                "PatientName": "Z",
                "PatientAge": "D",
                "InstitutionName": "X",
                "SOPInstanceUID": "U",
                "StudyInstanceUID": "U",
                "OtherPatientIDsSequence": "X",
                "AccessionNumber": "Z"
            }"#,
        )
        .unwrap()
    }

    fn original() -> DataSet {
        [
            Element::from_text(PATIENT_NAME, Vr::PN, "Kowalski^Jan"),
            Element::from_text(PATIENT_AGE, Vr::AS, "039Y"),
            Element::from_text(INSTITUTION_NAME, Vr::LO, "Szpital"),
            Element::from_text(SOP_INSTANCE, Vr::UI, "1.2.3"),
            Element::from_text(STUDY_UID, Vr::UI, "1.2"),
            Element::from_text(MODALITY, Vr::CS, "CT"),
            Element::sequence(OTHER_IDS, vec![DataSet::new()]),
        ]
        .into_iter()
        .collect()
    }

    fn status_of<'a>(entries: &'a [AuditEntry], tag: &str) -> &'a AuditEntry {
        entries.iter().find(|e| e.tag == tag).unwrap()
    }

    #[test]
    fn test_clean_anonymization_passes() {
        let anonymized: DataSet = [
            Element::from_text(PATIENT_NAME, Vr::PN, "ANONYMIZED"),
            Element::from_text(PATIENT_AGE, Vr::AS, ""),
            Element::from_text(SOP_INSTANCE, Vr::UI, "2.25.1"),
            Element::from_text(STUDY_UID, Vr::UI, "1.2"),
        ]
        .into_iter()
        .collect();

        let entries = compare(&original(), &anonymized, &profile(), "AN-1-1.dcm");
        assert!(entries.iter().all(|e| !e.status.is_failure()), "{:?}", entries);
        // Modality has no rule and is not audited.
        assert!(entries.iter().all(|e| e.tag != "Modality"));

        let removed = status_of(&entries, "InstitutionName");
        assert_eq!(removed.anonymized, MISSING);
        let seq = status_of(&entries, "OtherPatientIDsSequence");
        assert_eq!(seq.action, "X (Seq)");
        assert_eq!(seq.original, "Seq");
    }

    #[test]
    fn test_failures_are_detected() {
        let anonymized = original();
        let entries = compare(&original(), &anonymized, &profile(), "f.dcm");

        assert_eq!(status_of(&entries, "PatientName").status, AuditStatus::NoChange);
        assert_eq!(status_of(&entries, "PatientAge").status, AuditStatus::NotEmpty);
        assert_eq!(status_of(&entries, "InstitutionName").status, AuditStatus::Leak);
        assert_eq!(status_of(&entries, "SOPInstanceUID").status, AuditStatus::UidMatch);
        assert_eq!(
            status_of(&entries, "OtherPatientIDsSequence").status,
            AuditStatus::ShouldDelete
        );
        // Study UID is always accepted.
        assert_eq!(status_of(&entries, "StudyInstanceUID").status, AuditStatus::Ok);
    }

    #[test]
    fn test_nested_paths() {
        let mut item = DataSet::new();
        item.insert(Element::from_text(PATIENT_NAME, Vr::PN, "Nested^Name"));
        let seq_tag = Tag::new(0x0008, 0x1140);
        let before: DataSet = [Element::sequence(seq_tag, vec![item])].into_iter().collect();

        let mut out_item = DataSet::new();
        out_item.insert(Element::from_text(PATIENT_NAME, Vr::PN, "ANONYMIZED"));
        let after: DataSet = [Element::sequence(seq_tag, vec![out_item])]
            .into_iter()
            .collect();

        let entries = compare(&before, &after, &profile(), "f.dcm");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tag, "ReferencedImageSequence[0].PatientName");
        assert_eq!(entries[0].status, AuditStatus::Ok);
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = AuditEntry {
            file: "f.dcm".to_string(),
            tag: "PatientName".to_string(),
            action: "Z".to_string(),
            status: AuditStatus::Leak,
            original: "a".to_string(),
            anonymized: "b".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["File"], "f.dcm");
        assert_eq!(json["Status"], "FAIL (Leak)");
        assert_eq!(json["Anonymized"], "b");
    }

    #[test]
    fn test_tag_comparison() {
        let comparison = TagComparison::new(&original(), &profile());
        assert_eq!(comparison.dataset_keywords.len(), 7);
        assert!(comparison.not_in_profile.contains(&"Modality".to_string()));
        assert_eq!(comparison.profile_only, vec!["AccessionNumber".to_string()]);
        assert!(comparison
            .covered
            .contains(&("InstitutionName".to_string(), Action::Remove)));

        let text = comparison.to_string();
        let listed: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.starts_with("ALL TAGS PRESENT"))
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(
            listed,
            vec![
                "  - InstitutionName",
                "  - Modality",
                "  - OtherPatientIDsSequence",
                "  - PatientAge",
                "  - PatientName",
                "  - SOPInstanceUID",
                "  - StudyInstanceUID",
            ]
        );
        assert!(text.contains("  - InstitutionName (Action: X)"));
        assert!(text.contains("TAGS IN DICOM BUT NOT IN CONFIG (1):\n  - Modality\n"));
        assert!(text.contains(
            "SUMMARY\nTotal Tags in File:   7\nMatching Rules:       6\nMissing from Config:  1\n"
        ));
    }

    #[test]
    fn test_comparison_sees_every_standard_attribute() {
        let ds: DataSet = [
            Element::from_text(Tag::new(0x0038, 0x0500), Vr::LO, "Stable"),
            Element::from_text(Tag::new(0x0018, 0x0010), Vr::LO, "Iohexol"),
        ]
        .into_iter()
        .collect();
        let profile = Profile::from_json(r#"{"PatientState": "X"}"#).unwrap();

        let comparison = TagComparison::new(&ds, &profile);
        assert_eq!(
            comparison.dataset_keywords,
            vec!["ContrastBolusAgent".to_string(), "PatientState".to_string()]
        );
        assert_eq!(comparison.not_in_profile, vec!["ContrastBolusAgent".to_string()]);
    }
}
