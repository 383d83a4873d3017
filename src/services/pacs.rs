// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PACS (DICOMweb proxy) and RIS HTTP client.

use crate::error::AppError;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// DICOMweb JSON key for SeriesInstanceUID.
pub const SERIES_INSTANCE_UID_KEY: &str = "0020000E";
/// DICOMweb JSON key for SOPInstanceUID.
pub const SOP_INSTANCE_UID_KEY: &str = "00080018";

pub const ANONYMIZER_KEY_HEADER: &str = "X-Anonymizer-Key";

/// Study located through the RIS index lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct RisStudy {
    pub study_uid: String,
    pub token: String,
}

/// First string value of a DICOMweb JSON attribute, or "" if absent.
pub fn first_value(object: &Value, key: &str) -> String {
    object
        .get(key)
        .and_then(|attr| attr.get("Value"))
        .and_then(|values| values.get(0))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Clone)]
pub struct PacsClient {
    http: reqwest::Client,
}

impl PacsClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Look up a study by its 1-based RIS index.
    pub async fn resolve_study(
        &self,
        ris_url: &str,
        study_index: u32,
        anonymizer_key: &str,
    ) -> Result<RisStudy, AppError> {
        let url = format!(
            "{}/referrals/study-by-index/{}/",
            ris_url.trim_end_matches('/'),
            study_index
        );

        let response = self
            .http
            .get(&url)
            .header(ANONYMIZER_KEY_HEADER, anonymizer_key)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message: format!("RIS request failed: {}", e),
            })?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            tracing::warn!(study_index, status = %status, "RIS study lookup failed");
            return Err(AppError::Upstream {
                status,
                message: "Failed to find study in RIS".to_string(),
            });
        }

        response.json().await.map_err(|e| AppError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            message: format!("Invalid RIS response: {}", e),
        })
    }

    pub async fn list_study_instances(
        &self,
        base_url: &str,
        study_uid: &str,
        token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let url = format!("{}/instances", study_url(base_url, study_uid));
        self.get_json_list(&url, token).await
    }

    pub async fn list_series(
        &self,
        base_url: &str,
        study_uid: &str,
        token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let url = format!("{}/series", study_url(base_url, study_uid));
        self.get_json_list(&url, token).await
    }

    pub async fn list_series_instances(
        &self,
        base_url: &str,
        study_uid: &str,
        series_uid: &str,
        token: &str,
    ) -> Result<Vec<Value>, AppError> {
        let url = format!(
            "{}/series/{}/instances",
            study_url(base_url, study_uid),
            urlencoding::encode(series_uid)
        );
        self.get_json_list(&url, token).await
    }

    /// Download one instance. Non-200 responses yield `None`.
    pub async fn fetch_instance(
        &self,
        base_url: &str,
        study_uid: &str,
        series_uid: &str,
        instance_uid: &str,
        token: &str,
    ) -> Result<Option<Vec<u8>>, AppError> {
        let url = format!(
            "{}/series/{}/instances/{}/frames/1",
            study_url(base_url, study_uid),
            urlencoding::encode(series_uid),
            urlencoding::encode(instance_uid)
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Pacs(e.to_string()))?;

        if response.status() != StatusCode::OK {
            tracing::warn!(
                instance_uid,
                status = %response.status(),
                "PACS instance download failed"
            );
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Pacs(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn get_json_list(&self, url: &str, token: &str) -> Result<Vec<Value>, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Pacs(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Pacs(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Pacs(format!("JSON parse error: {}", e)))
    }
}

fn study_url(base_url: &str, study_uid: &str) -> String {
    format!(
        "{}/studies/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(study_uid)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_value() {
        let object = json!({
            "0020000E": {"vr": "UI", "Value": ["1.2.3"]},
            "00080018": {"vr": "UI"}
        });
        assert_eq!(first_value(&object, SERIES_INSTANCE_UID_KEY), "1.2.3");
        assert_eq!(first_value(&object, SOP_INSTANCE_UID_KEY), "");
        assert_eq!(first_value(&json!({}), SOP_INSTANCE_UID_KEY), "");
    }

    #[test]
    fn test_study_url_trims_and_encodes() {
        assert_eq!(
            study_url("http://pacs/dicom-web/", "1.2.3"),
            "http://pacs/dicom-web/studies/1.2.3"
        );
        assert_eq!(study_url("http://pacs", "a/b"), "http://pacs/studies/a%2Fb");
    }
}
