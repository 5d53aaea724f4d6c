//! Pipelines derived from the declared source schemas.
//!
//! The target columns and their types come from `rcm_model`; this module
//! only adds the raw header aliases seen in hospital exports and the few
//! columns that need a dedicated transform.

use rcm_model::{SemanticType, TableName};

use crate::error::NormalizationError;
use crate::normalization::canonical_header;
use crate::types::{NormalizationPipeline, NormalizationRule, NormalizationType};

/// Raw header spellings accepted besides the column's own name.
fn aliases(table: TableName, column: &str) -> &'static [&'static str] {
    match (table, column) {
        (_, "patient_id") => &["patient", "patid"],
        (_, "provider_id") => &["provider", "doctorid"],
        (_, "procedure_code") => &["cptcodes", "cptcode", "cpt", "code"],
        (TableName::Patients, "first_name") => &["firstname", "fname"],
        (TableName::Patients, "last_name") => &["lastname", "lname"],
        (TableName::Patients, "dob") => &["dateofbirth", "birthdate"],
        (TableName::Patients, "phone") => &["phonenumber", "phoneno", "contactnumber"],
        (TableName::Providers, "name") => &["providername", "fullname"],
        (TableName::Providers, "specialty") => &["specialization", "speciality"],
        (TableName::Providers, "dept_id") => &["departmentid", "department"],
        (TableName::Procedures, "description") => {
            &["procedurecodedescriptions", "proceduredescription", "cptdescription"]
        }
        (TableName::Procedures, "category") => &["procedurecodecategory", "cptcategory"],
        (TableName::Transactions, "transaction_date") => &["transactiondate", "servicedate"],
        (TableName::Transactions, "paid_amount") => &["paidamount", "amountpaid"],
        (TableName::Transactions, "payment_status") => &["paymentstatus", "status"],
        (TableName::Claims, "claim_date") => &["claimdate", "servicedate"],
        (TableName::Claims, "amount_claimed") => &["amountclaimed", "claimamount"],
        (TableName::Claims, "amount_approved") => &["amountapproved", "approvedamount", "paidamount"],
        (TableName::Claims, "insurance_company") => &["insurancecompany", "insurer", "payor", "payer"],
        (TableName::Claims, "claim_status") => &["claimstatus", "status"],
        _ => &[],
    }
}

fn transform_for(column: &str, semantic: SemanticType) -> NormalizationType {
    match (column, semantic) {
        ("gender", _) => NormalizationType::Gender,
        ("phone", _) => NormalizationType::Phone,
        ("age", _) => NormalizationType::AgeFromDob,
        (_, SemanticType::Date | SemanticType::Timestamp) => NormalizationType::IsoDate,
        (_, SemanticType::Decimal) => NormalizationType::Decimal,
        _ => NormalizationType::CopyDirect,
    }
}

/// Build the normalization pipeline of a source table.
pub fn infer_normalization_rules(
    table: TableName,
) -> Result<NormalizationPipeline, NormalizationError> {
    if !table.is_input() {
        return Err(NormalizationError::NotASourceTable(table));
    }
    let rules = table
        .schema()
        .columns
        .iter()
        .map(|column| {
            let mut source_aliases = vec![canonical_header(column.name)];
            source_aliases.extend(aliases(table, column.name).iter().copied().map(String::from));
            NormalizationRule {
                target_column: column.name,
                source_aliases,
                transform_type: transform_for(column.name, column.semantic),
            }
        })
        .collect();
    Ok(NormalizationPipeline { table, rules })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_follows_declared_columns() {
        let pipeline = infer_normalization_rules(TableName::Patients).unwrap();
        let targets: Vec<&str> = pipeline.rules.iter().map(|r| r.target_column).collect();
        let declared: Vec<&str> = TableName::Patients.schema().column_names().collect();
        assert_eq!(targets, declared);

        let phone = pipeline.rule("phone").unwrap();
        assert_eq!(phone.transform_type, NormalizationType::Phone);
        assert_eq!(phone.source_aliases[0], "phone");
        assert!(phone.source_aliases.contains(&"phonenumber".to_string()));
        assert_eq!(
            pipeline.rule("dob").unwrap().transform_type,
            NormalizationType::IsoDate
        );
    }

    #[test]
    fn measures_are_decimals() {
        let pipeline = infer_normalization_rules(TableName::Claims).unwrap();
        assert_eq!(
            pipeline.rule("amount_claimed").unwrap().transform_type,
            NormalizationType::Decimal
        );
        assert_eq!(
            pipeline.rule("insurance_company").unwrap().transform_type,
            NormalizationType::CopyDirect
        );
    }

    #[test]
    fn output_tables_have_no_pipeline() {
        assert!(infer_normalization_rules(TableName::FactClaims).is_err());
    }
}
