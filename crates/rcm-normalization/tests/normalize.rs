//! Normalization of stacked hospital extracts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use rcm_common::{column_value_string, text_frame};
use rcm_model::{Diagnostics, IssueKind, TableName};
use rcm_normalization::{NormalizationContext, normalize_all, normalize_table};

fn context() -> NormalizationContext {
    NormalizationContext::new(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
}

fn render(df: &DataFrame) -> String {
    let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
    let mut lines = vec![names.join(",")];
    for row in 0..df.height() {
        let cells: Vec<String> = names
            .iter()
            .map(|name| column_value_string(df, name, row))
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

#[test]
fn patients_from_two_hospitals() {
    let raw = text_frame(vec![
        ("PatientID", vec!["P1", "P1", "P1"]),
        ("FirstName", vec!["Jane", "Jane", "Raj"]),
        ("LastName", vec!["Doe", "Doe", "Iyer"]),
        ("DOB", vec!["1980-02-01", "1980-02-01", "07/15/1975"]),
        ("Gender", vec!["F", "F", "male"]),
        ("PhoneNumber", vec!["555-123-4567", "555-123-4567", "+91 98765 43210"]),
        ("source_db", vec!["hospital_a", "hospital_a", "hospital_b"]),
    ])
    .unwrap();
    let mut diagnostics = Diagnostics::new();

    let cleaned = normalize_table(TableName::Patients, &raw, &context(), &mut diagnostics).unwrap();

    insta::assert_snapshot!(render(&cleaned), @r"
    patient_id,first_name,last_name,dob,gender,phone,age,source_db
    P1,Jane,Doe,1980-02-01,Female,5551234567,44,hospital_a
    P1,Raj,Iyer,1975-07-15,Male,9876543210,48,hospital_b
    ");
    assert_eq!(diagnostics.count(IssueKind::DuplicateIdentity), 1);
}

#[test]
fn normalize_all_covers_every_source_table() {
    let mut raw = BTreeMap::new();
    raw.insert(
        TableName::Providers,
        text_frame(vec![
            ("ProviderID", vec!["D1", "D1"]),
            ("Specialization", vec!["Cardiology", "Cardiology"]),
        ])
        .unwrap(),
    );
    raw.insert(
        TableName::Claims,
        text_frame(vec![
            ("ClaimID", vec!["C1"]),
            ("PatientID", vec!["P1"]),
            ("ClaimAmount", vec!["$150.50"]),
            ("ClaimStatus", vec!["Approved"]),
            ("source_file", vec!["claims_1.csv"]),
        ])
        .unwrap(),
    );
    let mut diagnostics = Diagnostics::new();

    let cleaned = normalize_all(&raw, &context(), &mut diagnostics).unwrap();

    assert_eq!(cleaned.len(), 2);
    let providers = &cleaned[&TableName::Providers];
    assert_eq!(providers.height(), 1);
    assert_eq!(column_value_string(providers, "specialty", 0), "Cardiology");

    let claims = &cleaned[&TableName::Claims];
    assert_eq!(column_value_string(claims, "amount_claimed", 0), "150.5");
    assert_eq!(column_value_string(claims, "claim_status", 0), "Approved");
    assert_eq!(column_value_string(claims, "source_file", 0), "claims_1.csv");
    assert_eq!(diagnostics.count(IssueKind::DuplicateBusinessKey), 1);
}

#[test]
fn output_tables_are_rejected() {
    let df = text_frame(vec![("patient_key", vec!["1"])]).unwrap();
    let mut diagnostics = Diagnostics::new();
    assert!(normalize_table(TableName::DimPatientsScd, &df, &context(), &mut diagnostics).is_err());
}
