//! Typed rows of the star schema.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::identity::UnifiedKey;

/// Descriptive patient attributes carried by each SCD2 version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientAttributes {
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<NaiveDate>,
    pub gender: String,
    pub phone: String,
    pub address: String,
    pub age: Option<i64>,
    pub source_db: String,
}

/// A normalized patient row after identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    pub unified_patient_id: UnifiedKey,
    pub attributes: PatientAttributes,
}

/// One version of a patient in `dim_patients_scd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientVersion {
    pub patient_key: i64,
    pub unified_patient_id: UnifiedKey,
    #[serde(flatten)]
    pub attributes: PatientAttributes,
    pub effective_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub is_current: bool,
}

impl PatientVersion {
    pub fn current(
        patient_key: i64,
        record: &PatientRecord,
        effective_date: NaiveDateTime,
    ) -> Self {
        Self {
            patient_key,
            unified_patient_id: record.unified_patient_id.clone(),
            attributes: record.attributes.clone(),
            effective_date,
            end_date: None,
            is_current: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRow {
    /// `None` when the row has no business key to assign one from.
    pub provider_key: Option<i64>,
    pub provider_id: String,
    pub name: String,
    pub specialty: String,
    pub dept_id: i64,
    pub npi: i64,
    pub source_db: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureRow {
    pub procedure_key: Option<i64>,
    pub procedure_code: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRow {
    pub date_key: i64,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub quarter: u32,
    pub day_of_week: u32,
}

/// Dimension keys resolved for one fact row. `None` means unresolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactKeys {
    pub patient_key: Option<i64>,
    pub provider_key: Option<i64>,
    pub procedure_key: Option<i64>,
    pub date_key: Option<i64>,
}

impl FactKeys {
    pub fn is_fully_resolved(&self) -> bool {
        self.patient_key.is_some()
            && self.provider_key.is_some()
            && self.procedure_key.is_some()
            && self.date_key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFact {
    pub transaction_id: String,
    pub unified_patient_id: UnifiedKey,
    pub patient_id: String,
    pub provider_id: String,
    pub procedure_code: String,
    pub transaction_date: Option<NaiveDate>,
    pub amount: f64,
    pub paid_amount: f64,
    pub payment_status: String,
    pub source_db: String,
    pub source_file: String,
    pub keys: FactKeys,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimFact {
    pub claim_id: String,
    pub unified_patient_id: UnifiedKey,
    pub patient_id: String,
    pub provider_id: String,
    pub procedure_code: String,
    pub claim_date: Option<NaiveDate>,
    pub amount_claimed: f64,
    pub amount_approved: f64,
    pub insurance_company: String,
    pub claim_status: String,
    pub source_db: String,
    pub source_file: String,
    pub keys: FactKeys,
}
