//! Loading tables through the CSV sink.

use std::fs;

use polars::prelude::{DataFrame, IntoColumn, NamedFrom, Series};

use rcm_common::text_frame;
use rcm_model::{SemanticType, TableName};
use rcm_output::{CsvSink, Layer, LoadManifest, LoadOptions, Sink};

fn fact_frame() -> DataFrame {
    DataFrame::new(vec![
        Series::new("transaction_id".into(), vec!["T1", "T2"]).into_column(),
        Series::new("amount".into(), vec![150.0, 80.5]).into_column(),
        Series::new("provider_key".into(), vec![Some(1_i64), None]).into_column(),
    ])
    .unwrap()
}

#[test]
fn tables_land_in_their_layer() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvSink::new(dir.path());
    let raw = text_frame(vec![("PatientID", vec!["P1"])]).unwrap();

    sink.load_table("patients", &raw, &LoadOptions::default()).unwrap();
    sink.load_table("patients_cleaned", &raw, &LoadOptions::default()).unwrap();
    let record = sink
        .load_table(
            "fact_transactions",
            &fact_frame(),
            &LoadOptions::for_table(TableName::FactTransactions),
        )
        .unwrap();

    assert!(dir.path().join("bronze/patients.csv").exists());
    assert!(dir.path().join("silver/patients_cleaned.csv").exists());
    assert_eq!(record.layer, Layer::Gold);
    assert_eq!(
        fs::read_to_string(dir.path().join("gold/fact_transactions.csv")).unwrap(),
        "transaction_id,amount,provider_key\nT1,150,1\nT2,80.5,\n"
    );
}

#[test]
fn reloading_a_table_truncates_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvSink::new(dir.path());
    let options = LoadOptions::default();

    let first = text_frame(vec![("date_key", vec!["20240305", "20240306"])]).unwrap();
    let second = text_frame(vec![("date_key", vec!["20240307"])]).unwrap();

    sink.load_table("dim_date", &first, &options).unwrap();
    sink.load_table("dim_date", &second, &options).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("gold/dim_date.csv")).unwrap(),
        "date_key\n20240307\n"
    );
}

#[test]
fn manifest_records_every_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvSink::new(dir.path());

    sink.load_table(
        "fact_transactions",
        &fact_frame(),
        &LoadOptions::for_table(TableName::FactTransactions),
    )
    .unwrap();
    sink.finish().unwrap();

    let manifest: LoadManifest =
        serde_json::from_str(&fs::read_to_string(sink.manifest_path()).unwrap()).unwrap();
    assert_eq!(manifest, *sink.manifest());
    assert_eq!(manifest.rows_written(), 2);

    let load = &manifest.loads[0];
    assert_eq!(load.options.partition_column.as_deref(), Some("transaction_date"));
    assert_eq!(load.options.cluster_columns, vec!["unified_patient_id"]);
    let amount = load.columns.iter().find(|c| c.name == "amount").unwrap();
    assert_eq!(amount.semantic_type, Some(SemanticType::Decimal));
}
