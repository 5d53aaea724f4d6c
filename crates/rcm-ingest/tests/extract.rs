//! Extraction over a raw data directory laid out like the hospital exports.

use std::fs;
use std::path::Path;

use rcm_common::column_strings;
use rcm_ingest::{HospitalSource, SourceLayout, extract_sources};
use rcm_model::TableName;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn layout(root: &Path) -> SourceLayout {
    SourceLayout {
        hospitals: vec![
            HospitalSource::new("hospital_a", root.join("hospital_a")),
            HospitalSource::new("hospital_b", root.join("hospital_b")),
        ],
        claims_dir: root.join("claims"),
        cpt_file: root.join("reference/cptcodes.csv"),
    }
}

#[test]
fn tags_and_stacks_every_source() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        &root.join("hospital_a/patients.csv"),
        "PatientID,FirstName,PhoneNumber\nP1,Jane,555-1111\n",
    );
    write(
        &root.join("hospital_b/patients.csv"),
        "PatientID,FirstName,Address\nP1,Raj,9 Elm St\nP2,Ana,1 Main St\n",
    );
    write(
        &root.join("hospital_a/providers.csv"),
        "ProviderID,FirstName\nD1,Rao\n",
    );
    write(
        &root.join("claims/claims_2.csv"),
        "ClaimID,PatientID,ClaimAmount\nC2,P2,80\n",
    );
    write(
        &root.join("claims/claims_1.csv"),
        "ClaimID,PatientID,ClaimAmount\nC1,P1,150\n",
    );
    write(
        &root.join("reference/cptcodes.csv"),
        "procedure code category,cpt codes,procedure code descriptions,code status\n\
         Medicine Services,99213,Office visit,Active\n",
    );

    let extraction = extract_sources(&layout(root)).unwrap();

    let patients = extraction.table(TableName::Patients).unwrap();
    assert_eq!(patients.height(), 3);
    assert_eq!(
        column_strings(patients, "source_db").unwrap(),
        vec!["hospital_a", "hospital_b", "hospital_b"]
    );
    assert_eq!(
        column_strings(patients, "PhoneNumber").unwrap(),
        vec!["555-1111", "", ""]
    );

    let claims = extraction.table(TableName::Claims).unwrap();
    assert_eq!(
        column_strings(claims, "source_file").unwrap(),
        vec!["claims_1.csv", "claims_2.csv"]
    );
    assert_eq!(extraction.row_count(TableName::Procedures), 1);
    assert_eq!(extraction.row_count(TableName::Providers), 1);

    // hospital_a/transactions, hospital_b/providers, hospital_b/transactions
    assert_eq!(extraction.missing.len(), 3);
    assert!(extraction.table(TableName::Transactions).is_none());
}

#[test]
fn missing_claims_directory_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("hospital_a/patients.csv"), "PatientID\nP1\n");

    let extraction = extract_sources(&layout(root)).unwrap();

    assert!(extraction.table(TableName::Claims).is_none());
    assert!(
        extraction
            .missing
            .iter()
            .any(|m| m.table == TableName::Claims && m.path == root.join("claims"))
    );
}
