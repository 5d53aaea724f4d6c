//! Typed model rows to polars frames.
//!
//! Every output frame carries exactly the columns of its declared schema, in
//! declared order. Dates and timestamps are written as ISO strings.

use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};

use rcm_model::TableName;

use crate::calendar::{format_date, format_timestamp};
use crate::error::{ModelError, Result};
use crate::records::{
    ClaimFact, DateRow, FactKeys, PatientVersion, ProcedureRow, ProviderRow, TransactionFact,
};

struct FrameBuilder {
    table: TableName,
    columns: Vec<Column>,
}

impl FrameBuilder {
    fn new(table: TableName) -> Self {
        Self {
            table,
            columns: Vec::with_capacity(table.schema().columns.len()),
        }
    }

    fn push<T>(mut self, name: &str, values: Vec<T>) -> Self
    where
        Series: NamedFrom<Vec<T>, [T]>,
    {
        self.columns
            .push(Series::new(name.into(), values).into_column());
        self
    }

    fn keys<'a>(self, keys: impl Iterator<Item = &'a FactKeys> + Clone) -> Self {
        self.push(
            "patient_key",
            keys.clone().map(|k| k.patient_key).collect::<Vec<_>>(),
        )
        .push(
            "provider_key",
            keys.clone().map(|k| k.provider_key).collect::<Vec<_>>(),
        )
        .push(
            "procedure_key",
            keys.clone().map(|k| k.procedure_key).collect::<Vec<_>>(),
        )
        .push("date_key", keys.map(|k| k.date_key).collect::<Vec<_>>())
    }

    fn finish(self) -> Result<DataFrame> {
        let table = self.table;
        DataFrame::new(self.columns)
            .and_then(|df| df.select(table.schema().column_names()))
            .map_err(|source| ModelError::frame(table, source))
    }
}

fn texts<R>(rows: &[R], field: impl Fn(&R) -> &str) -> Vec<String> {
    rows.iter().map(|row| field(row).to_string()).collect()
}

pub fn patient_frame(versions: &[PatientVersion]) -> Result<DataFrame> {
    FrameBuilder::new(TableName::DimPatientsScd)
        .push(
            "patient_key",
            versions.iter().map(|v| v.patient_key).collect::<Vec<_>>(),
        )
        .push(
            "unified_patient_id",
            texts(versions, |v| v.unified_patient_id.as_str()),
        )
        .push("first_name", texts(versions, |v| &v.attributes.first_name))
        .push("last_name", texts(versions, |v| &v.attributes.last_name))
        .push(
            "dob",
            versions
                .iter()
                .map(|v| v.attributes.dob.map(format_date))
                .collect::<Vec<_>>(),
        )
        .push("gender", texts(versions, |v| &v.attributes.gender))
        .push("phone", texts(versions, |v| &v.attributes.phone))
        .push("address", texts(versions, |v| &v.attributes.address))
        .push(
            "age",
            versions.iter().map(|v| v.attributes.age).collect::<Vec<_>>(),
        )
        .push("source_db", texts(versions, |v| &v.attributes.source_db))
        .push(
            "effective_date",
            versions
                .iter()
                .map(|v| format_timestamp(v.effective_date))
                .collect::<Vec<_>>(),
        )
        .push(
            "end_date",
            versions
                .iter()
                .map(|v| v.end_date.map(format_timestamp))
                .collect::<Vec<_>>(),
        )
        .push(
            "is_current",
            versions.iter().map(|v| v.is_current).collect::<Vec<_>>(),
        )
        .finish()
}

pub fn provider_frame(rows: &[ProviderRow]) -> Result<DataFrame> {
    FrameBuilder::new(TableName::DimProviders)
        .push(
            "provider_key",
            rows.iter().map(|r| r.provider_key).collect::<Vec<_>>(),
        )
        .push("provider_id", texts(rows, |r| &r.provider_id))
        .push("name", texts(rows, |r| &r.name))
        .push("specialty", texts(rows, |r| &r.specialty))
        .push("dept_id", rows.iter().map(|r| r.dept_id).collect::<Vec<_>>())
        .push("npi", rows.iter().map(|r| r.npi).collect::<Vec<_>>())
        .push("source_db", texts(rows, |r| &r.source_db))
        .finish()
}

pub fn procedure_frame(rows: &[ProcedureRow]) -> Result<DataFrame> {
    FrameBuilder::new(TableName::DimProcedures)
        .push(
            "procedure_key",
            rows.iter().map(|r| r.procedure_key).collect::<Vec<_>>(),
        )
        .push("procedure_code", texts(rows, |r| &r.procedure_code))
        .push("description", texts(rows, |r| &r.description))
        .push("category", texts(rows, |r| &r.category))
        .finish()
}

pub fn date_frame(rows: &[DateRow]) -> Result<DataFrame> {
    let int = |field: fn(&DateRow) -> i64| rows.iter().map(field).collect::<Vec<i64>>();
    FrameBuilder::new(TableName::DimDate)
        .push("date_key", int(|r| r.date_key))
        .push(
            "date",
            rows.iter().map(|r| format_date(r.date)).collect::<Vec<_>>(),
        )
        .push("year", int(|r| i64::from(r.year)))
        .push("month", int(|r| i64::from(r.month)))
        .push("day", int(|r| i64::from(r.day)))
        .push("quarter", int(|r| i64::from(r.quarter)))
        .push("day_of_week", int(|r| i64::from(r.day_of_week)))
        .finish()
}

pub fn transaction_frame(facts: &[TransactionFact]) -> Result<DataFrame> {
    FrameBuilder::new(TableName::FactTransactions)
        .push("transaction_id", texts(facts, |f| &f.transaction_id))
        .push(
            "unified_patient_id",
            texts(facts, |f| f.unified_patient_id.as_str()),
        )
        .push("patient_id", texts(facts, |f| &f.patient_id))
        .push("provider_id", texts(facts, |f| &f.provider_id))
        .push("procedure_code", texts(facts, |f| &f.procedure_code))
        .push(
            "transaction_date",
            facts
                .iter()
                .map(|f| f.transaction_date.map(format_date))
                .collect::<Vec<_>>(),
        )
        .push("amount", facts.iter().map(|f| f.amount).collect::<Vec<_>>())
        .push(
            "paid_amount",
            facts.iter().map(|f| f.paid_amount).collect::<Vec<_>>(),
        )
        .push("payment_status", texts(facts, |f| &f.payment_status))
        .push("source_db", texts(facts, |f| &f.source_db))
        .push("source_file", texts(facts, |f| &f.source_file))
        .keys(facts.iter().map(|f| &f.keys))
        .finish()
}

pub fn claim_frame(facts: &[ClaimFact]) -> Result<DataFrame> {
    FrameBuilder::new(TableName::FactClaims)
        .push("claim_id", texts(facts, |f| &f.claim_id))
        .push(
            "unified_patient_id",
            texts(facts, |f| f.unified_patient_id.as_str()),
        )
        .push("patient_id", texts(facts, |f| &f.patient_id))
        .push("provider_id", texts(facts, |f| &f.provider_id))
        .push("procedure_code", texts(facts, |f| &f.procedure_code))
        .push(
            "claim_date",
            facts
                .iter()
                .map(|f| f.claim_date.map(format_date))
                .collect::<Vec<_>>(),
        )
        .push(
            "amount_claimed",
            facts.iter().map(|f| f.amount_claimed).collect::<Vec<_>>(),
        )
        .push(
            "amount_approved",
            facts.iter().map(|f| f.amount_approved).collect::<Vec<_>>(),
        )
        .push("insurance_company", texts(facts, |f| &f.insurance_company))
        .push("claim_status", texts(facts, |f| &f.claim_status))
        .push("source_db", texts(facts, |f| &f.source_db))
        .push("source_file", texts(facts, |f| &f.source_file))
        .keys(facts.iter().map(|f| &f.keys))
        .finish()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::date_dimension::date_row;
    use crate::identity::UnifiedKey;
    use rcm_common::column_value_string;

    #[test]
    fn frames_follow_declared_column_order() {
        let rows = vec![date_row(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())];
        let df = date_frame(&rows).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        let declared: Vec<&str> = TableName::DimDate.schema().column_names().collect();
        assert_eq!(names, declared);
        assert_eq!(column_value_string(&df, "date", 0), "2024-03-05");
        assert_eq!(column_value_string(&df, "date_key", 0), "20240305");
    }

    #[test]
    fn unresolved_keys_are_null() {
        let fact = ClaimFact {
            claim_id: "C1".to_string(),
            unified_patient_id: UnifiedKey::unknown(),
            patient_id: String::new(),
            provider_id: "D1".to_string(),
            procedure_code: "99213".to_string(),
            claim_date: None,
            amount_claimed: 10.0,
            amount_approved: 0.0,
            insurance_company: String::new(),
            claim_status: "Denied".to_string(),
            source_db: String::new(),
            source_file: "claims_1.csv".to_string(),
            keys: FactKeys {
                provider_key: Some(1),
                ..FactKeys::default()
            },
        };
        let df = claim_frame(&[fact]).unwrap();
        assert_eq!(df.width(), TableName::FactClaims.schema().columns.len());
        assert_eq!(df.column("patient_key").unwrap().null_count(), 1);
        assert_eq!(df.column("claim_date").unwrap().null_count(), 1);
        assert_eq!(column_value_string(&df, "provider_key", 0), "1");
        assert_eq!(column_value_string(&df, "unified_patient_id", 0), "unknown");
    }

    #[test]
    fn empty_inputs_give_empty_frames_with_full_schema() {
        let df = transaction_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(
            df.width(),
            TableName::FactTransactions.schema().columns.len()
        );
    }
}
