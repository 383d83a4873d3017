// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{Request, Response};
use measurement_api::config::Config;
use measurement_api::db::MemoryDb;
use measurement_api::dicom::{DataSet, Element, FileObject, Tag, TransferSyntax, Vr};
use measurement_api::models::{Referral, StudyDescription, STATUS_SIGNED};
use measurement_api::routes::create_router;
use measurement_api::services::{AnonymizerEngine, PacsClient, Profile};
use measurement_api::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_API_KEY: &str = "test_api_key";

pub const PATIENT_NAME: Tag = Tag::new(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag::new(0x0010, 0x0020);
pub const STUDY_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000E);
pub const SOP_INSTANCE_UID: Tag = Tag::new(0x0008, 0x0018);
pub const INSTITUTION_NAME: Tag = Tag::new(0x0008, 0x0080);

/// Create a test app over the given referrals.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(referrals: Vec<Referral>) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::default(), referrals)
}

#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
    referrals: Vec<Referral>,
) -> (axum::Router, Arc<AppState>) {
    let anonymizer = Arc::new(AnonymizerEngine::new(
        Profile::builtin(),
        config.pepper.clone(),
    ));
    let pacs = PacsClient::new(Duration::from_secs(5)).unwrap();

    let state = Arc::new(AppState {
        config,
        db: Arc::new(MemoryDb::with_referrals(referrals)),
        anonymizer,
        pacs,
    });

    (create_router(state.clone()), state)
}

/// A referral with one study description per measurement value.
#[allow(dead_code)]
pub fn referral(id: i32, status: i32, patient_id: &str, measurements: &[Value]) -> Referral {
    Referral {
        id,
        study_id: format!("1.2.826.0.1.{}", id),
        patient_id: patient_id.to_string(),
        patient_firstname: Some("Jan".to_string()),
        patient_lastname: Some("Kowalski".to_string()),
        status,
        descriptions: measurements
            .iter()
            .enumerate()
            .map(|(i, m)| StudyDescription {
                id: id * 10 + i as i32,
                referral_id: id,
                measurements: m.clone(),
                description: Some(format!("Description {}", i)),
            })
            .collect(),
    }
}

#[allow(dead_code)]
pub fn signed(id: i32, patient_id: &str, measurements: &[Value]) -> Referral {
    referral(id, STATUS_SIGNED, patient_id, measurements)
}

#[allow(dead_code)]
pub fn sample_measurements() -> Value {
    json!([{"name": "LVEF", "value": 55.0, "unit": "%"}])
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn get_with_header(uri: &str, name: &str, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn get_with_api_key(uri: &str) -> Request<Body> {
    get_with_header(uri, "X-API-Key", TEST_API_KEY)
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// A small CT-like dataset with identifying attributes and a private tag.
#[allow(dead_code)]
pub fn sample_dataset(patient_id: &str, sop_instance_uid: &str) -> DataSet {
    let mut ds = DataSet::new();
    ds.insert(Element::from_text(Tag::new(0x0008, 0x0016), Vr::UI, "1.2.840.10008.5.1.4.1.1.2"));
    ds.insert(Element::from_text(SOP_INSTANCE_UID, Vr::UI, sop_instance_uid));
    ds.insert(Element::from_text(Tag::new(0x0008, 0x0020), Vr::DA, "20240115"));
    ds.insert(Element::from_text(Tag::new(0x0008, 0x0060), Vr::CS, "CT"));
    ds.insert(Element::from_text(INSTITUTION_NAME, Vr::LO, "Szpital Wojewodzki"));
    ds.insert(Element::from_text(PATIENT_NAME, Vr::PN, "Kowalski^Jan"));
    ds.insert(Element::from_text(PATIENT_ID, Vr::LO, patient_id));
    ds.insert(Element::from_text(Tag::new(0x0010, 0x0030), Vr::DA, "19800101"));
    ds.insert(Element::from_text(STUDY_INSTANCE_UID, Vr::UI, "1.2.826.0.1.3680043.1"));
    ds.insert(Element::from_text(SERIES_INSTANCE_UID, Vr::UI, "1.2.826.0.1.3680043.1.1"));
    ds.insert(Element::from_text(Tag::new(0x0029, 0x0010), Vr::LO, "SIEMENS CSA HEADER"));
    ds.insert(Element::new(
        Tag::new(0x0028, 0x0010),
        Vr::US,
        measurement_api::dicom::Value::Bytes(2u16.to_le_bytes().to_vec()),
    ));
    ds
}

/// Encoded Part 10 file for `sample_dataset`.
#[allow(dead_code)]
pub fn sample_file(patient_id: &str, sop_instance_uid: &str) -> Vec<u8> {
    FileObject::new(
        sample_dataset(patient_id, sop_instance_uid),
        TransferSyntax::ExplicitVrLittleEndian,
    )
    .to_bytes()
    .unwrap()
}
