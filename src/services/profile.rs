// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! De-identification profile: attribute keyword → action.

use crate::dicom::dictionary;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

const BUILTIN_PROFILE: &str = include_str!("../../config/dicom_ps3_15_profile.json");

/// Action applied to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Action {
    /// Remove the attribute.
    #[serde(rename = "X")]
    Remove,
    /// Replace with a zero-length or dummy value.
    #[serde(rename = "Z")]
    Zero,
    /// Replace with an empty dummy value.
    #[serde(rename = "D")]
    Dummy,
    /// Replace UIDs through a consistent mapping.
    #[serde(rename = "U")]
    Uid,
    /// Leave unchanged.
    #[serde(other)]
    Keep,
}

impl Action {
    pub fn code(&self) -> &'static str {
        match self {
            Action::Remove => "X",
            Action::Zero => "Z",
            Action::Dummy => "D",
            Action::Uid => "U",
            Action::Keep => "K",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Keyword-indexed action table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    rules: BTreeMap<String, Action>,
}

impl Profile {
    /// The PS3.15 basic confidentiality profile shipped with the crate.
    pub fn builtin() -> Self {
        // The embedded profile is covered by tests.
        Self::from_json(BUILTIN_PROFILE).unwrap_or_default()
    }

    /// Parse a profile. Every keyword must name a standard attribute, so a
    /// typo cannot silently leave an attribute untouched.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let profile: Self =
            serde_json::from_str(json).map_err(|e| ProfileError::Parse(e.to_string()))?;
        let unknown: Vec<String> = profile
            .keywords()
            .filter(|k| dictionary::by_keyword(k).is_none())
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(ProfileError::UnknownKeywords(unknown.join(", ")));
        }
        Ok(profile)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| ProfileError::Io(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Load from `path`, falling back to the built-in profile when unreadable.
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(path.as_ref()) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "Could not load anonymization profile, using built-in profile"
                );
                Self::builtin()
            }
        }
    }

    pub fn action(&self, keyword: &str) -> Option<Action> {
        self.rules.get(keyword).copied()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.rules.contains_key(keyword)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Errors from profile loading.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to read profile: {0}")]
    Io(String),

    #[error("Failed to parse profile: {0}")]
    Parse(String),

    #[error("Profile names unknown attributes: {0}")]
    UnknownKeywords(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profile_parses() {
        let profile = Profile::from_json(BUILTIN_PROFILE).expect("built-in profile is valid JSON");
        assert!(!profile.is_empty());
        assert_eq!(profile.action("PatientName"), Some(Action::Zero));
        assert_eq!(profile.action("SOPInstanceUID"), Some(Action::Uid));
        assert_eq!(profile.action("OtherPatientIDsSequence"), Some(Action::Remove));
    }

    #[test]
    fn test_builtin_keywords_are_in_dictionary() {
        for keyword in Profile::builtin().keywords() {
            assert!(
                dictionary::by_keyword(keyword).is_some(),
                "profile keyword {} missing from dictionary",
                keyword
            );
        }
    }

    #[test]
    fn test_unknown_action_is_keep() {
        let profile = Profile::from_json(r#"{"Modality": "K", "PatientName": "X"}"#).unwrap();
        assert_eq!(profile.action("Modality"), Some(Action::Keep));
        assert_eq!(profile.action("PatientName"), Some(Action::Remove));
        assert_eq!(profile.action("StudyDate"), None);
    }

    #[test]
    fn test_unknown_keywords_are_rejected() {
        let err = Profile::from_json(r#"{"PatientName": "Z", "PatientNmae": "X"}"#).unwrap_err();
        assert!(matches!(err, ProfileError::UnknownKeywords(ref k) if k == "PatientNmae"));

        let profile = Profile::from_json(r#"{"PatientState": "X"}"#).unwrap();
        assert_eq!(profile.action("PatientState"), Some(Action::Remove));
    }

    #[test]
    fn test_load_or_builtin_falls_back() {
        let profile = Profile::load_or_builtin("/nonexistent/profile.json");
        assert_eq!(profile.len(), Profile::builtin().len());
    }
}
