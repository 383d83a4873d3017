// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile-driven DICOM de-identification.
//!
//! The engine is shared by the HTTP endpoints and the batch tool. UID
//! remapping is consistent for the lifetime of an engine, so references
//! between instances (frame of reference, referenced SOP instances, ...)
//! stay intact across files and requests.

use crate::dicom::dataset::{DataSet, Element, Value};
use crate::dicom::tag;
use crate::dicom::{dictionary, generate_uid, DicomError, FileObject, Vr};
use crate::services::hashing::peppered_sha256;
use crate::services::profile::{Action, Profile};
use dashmap::DashMap;

pub const STUDY_INSTANCE_UID: &str = "StudyInstanceUID";
pub const SERIES_INSTANCE_UID: &str = "SeriesInstanceUID";

const ANONYMIZED: &str = "ANONYMIZED";

/// Batch-wide UIDs that replace the study/series UIDs wherever they appear.
#[derive(Debug, Clone, Default)]
pub struct UidOverrides {
    pub study_uid: Option<String>,
    pub series_uid: Option<String>,
}

/// De-identification engine.
pub struct AnonymizerEngine {
    profile: Profile,
    pepper: String,
    uid_map: DashMap<String, String>,
    remove_private_tags: bool,
    trace_actions: bool,
}

impl AnonymizerEngine {
    pub fn new(profile: Profile, pepper: impl Into<String>) -> Self {
        Self {
            profile,
            pepper: pepper.into(),
            uid_map: DashMap::new(),
            remove_private_tags: true,
            trace_actions: false,
        }
    }

    /// Log every profile action as it is applied.
    pub fn with_trace_actions(mut self, enabled: bool) -> Self {
        self.trace_actions = enabled;
        self
    }

    pub fn with_private_tags_removed(mut self, enabled: bool) -> Self {
        self.remove_private_tags = enabled;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Replacement for `original`, stable for the lifetime of the engine.
    pub fn consistent_uid(&self, original: &str) -> String {
        self.uid_map
            .entry(original.to_string())
            .or_insert_with(generate_uid)
            .clone()
    }

    /// Apply the profile to a dataset in place.
    pub fn anonymize_dataset(&self, ds: &mut DataSet, overrides: &UidOverrides) {
        if self.remove_private_tags {
            ds.remove_private_tags();
        }
        self.apply_rules(ds, overrides);
    }

    fn apply_rules(&self, ds: &mut DataSet, overrides: &UidOverrides) {
        for tag in ds.tags() {
            let Some(keyword) = dictionary::keyword_of(tag) else {
                continue;
            };

            let forced = match keyword {
                STUDY_INSTANCE_UID => overrides.study_uid.as_deref(),
                SERIES_INSTANCE_UID => overrides.series_uid.as_deref(),
                _ => None,
            };
            if let Some(uid) = forced {
                ds.set_string(tag, uid);
                continue;
            }

            let action = self.profile.action(keyword);
            let Some(element) = ds.get_mut(tag) else {
                continue;
            };

            if let Value::Sequence(items) = &mut element.value {
                if action == Some(Action::Remove) {
                    self.trace(keyword, Action::Remove);
                    ds.remove(tag);
                } else {
                    for item in items.iter_mut() {
                        self.apply_rules(item, overrides);
                    }
                }
                continue;
            }

            let Some(action) = action else {
                continue;
            };
            self.trace(keyword, action);

            match action {
                Action::Remove => {
                    ds.remove(tag);
                }
                Action::Uid => {
                    if element.vr.is_string() && !element.is_empty() {
                        let mapped: Vec<String> = element
                            .strings()
                            .iter()
                            .map(|uid| self.consistent_uid(uid))
                            .collect();
                        *element = Element::from_texts(tag, element.vr, &mapped);
                    }
                }
                Action::Zero | Action::Dummy => {
                    *element = replacement(element, action);
                }
                Action::Keep => {}
            }
        }
    }

    fn trace(&self, keyword: &str, action: Action) {
        if self.trace_actions {
            tracing::info!(keyword, action = %action, "Processing tag from profile");
        }
    }

    /// Pseudonymous patient ID for an original identifier.
    pub fn patient_pseudonym(&self, original_patient_id: &str) -> String {
        peppered_sha256(original_patient_id, &self.pepper)
    }

    /// Replace patient identity with a peppered hash of the original ID.
    pub fn pseudonymize_patient(
        &self,
        ds: &mut DataSet,
        original_patient_id: &str,
    ) -> Result<(), DicomError> {
        let hashed = self.patient_pseudonym(original_patient_id);
        ds.set_keyword("PatientName", &format!("{}^Anonym", &hashed[..8]))?;
        ds.set_keyword("PatientID", &hashed)?;
        ds.set_keyword("PatientIdentityRemoved", "YES")?;
        Ok(())
    }

    /// Anonymize a single file as served over HTTP.
    pub fn anonymize_file(&self, file: &mut FileObject) -> Result<(), DicomError> {
        let original_patient_id = file
            .dataset
            .keyword_string("PatientID")
            .unwrap_or_else(|| "UNKNOWN".to_string());

        self.anonymize_dataset(&mut file.dataset, &UidOverrides::default());
        self.pseudonymize_patient(&mut file.dataset, &original_patient_id)?;
        sync_file_meta(file);
        Ok(())
    }

    /// Parse, anonymize and re-encode a Part 10 file.
    pub fn anonymize_bytes(&self, data: &[u8]) -> Result<Vec<u8>, DicomError> {
        let mut file = FileObject::from_bytes(data)?;
        self.anonymize_file(&mut file)?;
        file.to_bytes()
    }
}

/// Keep the file meta SOP instance UID in step with the dataset.
pub fn sync_file_meta(file: &mut FileObject) {
    if let Some(uid) = file.dataset.string(tag::SOP_INSTANCE_UID) {
        file.meta.set_string(tag::MEDIA_STORAGE_SOP_INSTANCE_UID, &uid);
    }
}

fn replacement(element: &Element, action: Action) -> Element {
    let vr = element.vr;
    if !vr.is_string() {
        return Element::new(element.tag, vr, Value::Bytes(Vec::new()));
    }
    if action == Action::Dummy {
        return Element::from_text(element.tag, vr, "");
    }

    let value = match vr {
        Vr::UI => generate_uid(),
        Vr::DA | Vr::TM | Vr::DT => String::new(),
        Vr::AS => "000Y".to_string(),
        Vr::CS => "U".to_string(),
        Vr::DS | Vr::IS => "0".to_string(),
        _ => ANONYMIZED.to_string(),
    };
    Element::from_text(element.tag, vr, &value)
}
