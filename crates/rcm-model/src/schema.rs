//! Declared column contracts.
//!
//! Every logical table has an explicit list of columns with a semantic type
//! and a role. Readers consult these declarations to backfill columns a source
//! did not provide, and writers consult them to describe output types. Column
//! types are never inferred from column names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::table::TableName;

/// Logical type of a column, independent of how a store persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Text,
    Identifier,
    Integer,
    Decimal,
    Flag,
    Date,
    Timestamp,
}

/// Value used when a source table lacks a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backfill {
    Null,
    Zero,
    False,
    Empty,
}

impl SemanticType {
    pub fn backfill(self) -> Backfill {
        match self {
            SemanticType::Date | SemanticType::Timestamp => Backfill::Null,
            SemanticType::Identifier | SemanticType::Integer | SemanticType::Decimal => {
                Backfill::Zero
            }
            SemanticType::Flag => Backfill::False,
            SemanticType::Text => Backfill::Empty,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SemanticType::Text => "text",
            SemanticType::Identifier => "identifier",
            SemanticType::Integer => "integer",
            SemanticType::Decimal => "decimal",
            SemanticType::Flag => "flag",
            SemanticType::Date => "date",
            SemanticType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a column means to the dimensional model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Source identifier of a dimension member. Required.
    BusinessKey,
    /// Warehouse-assigned key.
    SurrogateKey,
    /// Business key of another dimension, carried by a fact.
    ForeignKey,
    Attribute,
    Measure,
    /// Source database or file the row came from.
    Provenance,
    /// Computed by the pipeline rather than read from a source.
    Derived,
    /// SCD2 bookkeeping.
    Validity,
}

impl ColumnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnRole::BusinessKey => "business key",
            ColumnRole::SurrogateKey => "surrogate key",
            ColumnRole::ForeignKey => "foreign key",
            ColumnRole::Attribute => "attribute",
            ColumnRole::Measure => "measure",
            ColumnRole::Provenance => "provenance",
            ColumnRole::Derived => "derived",
            ColumnRole::Validity => "validity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub semantic: SemanticType,
    pub role: ColumnRole,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, semantic: SemanticType, role: ColumnRole) -> Self {
        Self {
            name,
            semantic,
            role,
        }
    }

    pub fn is_required(&self) -> bool {
        self.role == ColumnRole::BusinessKey
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TableSchema {
    pub table: TableName,
    pub columns: &'static [ColumnSpec],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }

    /// The required business-key column, if this table has one.
    pub fn business_key(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.is_required())
    }
}

use ColumnRole::{
    Attribute, BusinessKey, Derived, ForeignKey, Measure, Provenance, SurrogateKey, Validity,
};
use SemanticType::{Date, Decimal, Flag, Identifier, Integer, Text, Timestamp};

const fn c(name: &'static str, semantic: SemanticType, role: ColumnRole) -> ColumnSpec {
    ColumnSpec::new(name, semantic, role)
}

pub static PATIENTS: TableSchema = TableSchema {
    table: TableName::Patients,
    columns: &[
        c("patient_id", Text, BusinessKey),
        c("first_name", Text, Attribute),
        c("last_name", Text, Attribute),
        c("dob", Date, Attribute),
        c("gender", Text, Attribute),
        c("phone", Text, Attribute),
        c("address", Text, Attribute),
        c("age", Integer, Derived),
        c("source_db", Text, Provenance),
        c("source_file", Text, Provenance),
    ],
};

pub static PROVIDERS: TableSchema = TableSchema {
    table: TableName::Providers,
    columns: &[
        c("provider_id", Text, BusinessKey),
        c("name", Text, Attribute),
        c("specialty", Text, Attribute),
        c("dept_id", Identifier, Attribute),
        c("npi", Identifier, Attribute),
        c("source_db", Text, Provenance),
    ],
};

pub static PROCEDURES: TableSchema = TableSchema {
    table: TableName::Procedures,
    columns: &[
        c("procedure_code", Text, BusinessKey),
        c("description", Text, Attribute),
        c("category", Text, Attribute),
    ],
};

pub static TRANSACTIONS: TableSchema = TableSchema {
    table: TableName::Transactions,
    columns: &[
        c("transaction_id", Text, Attribute),
        c("patient_id", Text, ForeignKey),
        c("provider_id", Text, ForeignKey),
        c("procedure_code", Text, ForeignKey),
        c("transaction_date", Date, Attribute),
        c("amount", Decimal, Measure),
        c("paid_amount", Decimal, Measure),
        c("payment_status", Text, Attribute),
        c("source_db", Text, Provenance),
        c("source_file", Text, Provenance),
    ],
};

pub static CLAIMS: TableSchema = TableSchema {
    table: TableName::Claims,
    columns: &[
        c("claim_id", Text, Attribute),
        c("patient_id", Text, ForeignKey),
        c("provider_id", Text, ForeignKey),
        c("procedure_code", Text, ForeignKey),
        c("claim_date", Date, Attribute),
        c("amount_claimed", Decimal, Measure),
        c("amount_approved", Decimal, Measure),
        c("insurance_company", Text, Attribute),
        c("claim_status", Text, Attribute),
        c("source_db", Text, Provenance),
        c("source_file", Text, Provenance),
    ],
};

pub static DIM_PATIENTS_SCD: TableSchema = TableSchema {
    table: TableName::DimPatientsScd,
    columns: &[
        c("patient_key", Identifier, SurrogateKey),
        c("unified_patient_id", Text, BusinessKey),
        c("first_name", Text, Attribute),
        c("last_name", Text, Attribute),
        c("dob", Date, Attribute),
        c("gender", Text, Attribute),
        c("phone", Text, Attribute),
        c("address", Text, Attribute),
        c("age", Integer, Derived),
        c("source_db", Text, Provenance),
        c("effective_date", Timestamp, Validity),
        c("end_date", Timestamp, Validity),
        c("is_current", Flag, Validity),
    ],
};

pub static DIM_PROVIDERS: TableSchema = TableSchema {
    table: TableName::DimProviders,
    columns: &[
        c("provider_key", Identifier, SurrogateKey),
        c("provider_id", Text, BusinessKey),
        c("name", Text, Attribute),
        c("specialty", Text, Attribute),
        c("dept_id", Identifier, Attribute),
        c("npi", Identifier, Attribute),
        c("source_db", Text, Provenance),
    ],
};

pub static DIM_PROCEDURES: TableSchema = TableSchema {
    table: TableName::DimProcedures,
    columns: &[
        c("procedure_key", Identifier, SurrogateKey),
        c("procedure_code", Text, BusinessKey),
        c("description", Text, Attribute),
        c("category", Text, Attribute),
    ],
};

pub static DIM_DATE: TableSchema = TableSchema {
    table: TableName::DimDate,
    columns: &[
        c("date_key", Integer, SurrogateKey),
        c("date", Date, BusinessKey),
        c("year", Integer, Derived),
        c("month", Integer, Derived),
        c("day", Integer, Derived),
        c("quarter", Integer, Derived),
        c("day_of_week", Integer, Derived),
    ],
};

pub static FACT_TRANSACTIONS: TableSchema = TableSchema {
    table: TableName::FactTransactions,
    columns: &[
        c("transaction_id", Text, Attribute),
        c("unified_patient_id", Text, Derived),
        c("patient_id", Text, ForeignKey),
        c("provider_id", Text, ForeignKey),
        c("procedure_code", Text, ForeignKey),
        c("transaction_date", Date, Attribute),
        c("amount", Decimal, Measure),
        c("paid_amount", Decimal, Measure),
        c("payment_status", Text, Attribute),
        c("source_db", Text, Provenance),
        c("source_file", Text, Provenance),
        c("patient_key", Identifier, SurrogateKey),
        c("provider_key", Identifier, SurrogateKey),
        c("procedure_key", Identifier, SurrogateKey),
        c("date_key", Integer, SurrogateKey),
    ],
};

pub static FACT_CLAIMS: TableSchema = TableSchema {
    table: TableName::FactClaims,
    columns: &[
        c("claim_id", Text, Attribute),
        c("unified_patient_id", Text, Derived),
        c("patient_id", Text, ForeignKey),
        c("provider_id", Text, ForeignKey),
        c("procedure_code", Text, ForeignKey),
        c("claim_date", Date, Attribute),
        c("amount_claimed", Decimal, Measure),
        c("amount_approved", Decimal, Measure),
        c("insurance_company", Text, Attribute),
        c("claim_status", Text, Attribute),
        c("source_db", Text, Provenance),
        c("source_file", Text, Provenance),
        c("patient_key", Identifier, SurrogateKey),
        c("provider_key", Identifier, SurrogateKey),
        c("procedure_key", Identifier, SurrogateKey),
        c("date_key", Integer, SurrogateKey),
    ],
};

pub fn schema_for(table: TableName) -> &'static TableSchema {
    match table {
        TableName::Patients => &PATIENTS,
        TableName::Providers => &PROVIDERS,
        TableName::Procedures => &PROCEDURES,
        TableName::Transactions => &TRANSACTIONS,
        TableName::Claims => &CLAIMS,
        TableName::DimPatientsScd => &DIM_PATIENTS_SCD,
        TableName::DimProviders => &DIM_PROVIDERS,
        TableName::DimProcedures => &DIM_PROCEDURES,
        TableName::DimDate => &DIM_DATE,
        TableName::FactTransactions => &FACT_TRANSACTIONS,
        TableName::FactClaims => &FACT_CLAIMS,
    }
}
