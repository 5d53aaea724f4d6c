//! Logical table names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::{self, TableSchema};

/// Every logical table the pipeline reads or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Patients,
    Providers,
    Procedures,
    Transactions,
    Claims,
    DimPatientsScd,
    DimProviders,
    DimProcedures,
    DimDate,
    FactTransactions,
    FactClaims,
}

impl TableName {
    /// Normalized tables the dimensional model requires, in build order.
    pub const INPUTS: [TableName; 5] = [
        TableName::Patients,
        TableName::Providers,
        TableName::Procedures,
        TableName::Transactions,
        TableName::Claims,
    ];

    /// Star-schema tables handed to the sink.
    pub const OUTPUTS: [TableName; 6] = [
        TableName::DimPatientsScd,
        TableName::DimProviders,
        TableName::DimProcedures,
        TableName::DimDate,
        TableName::FactTransactions,
        TableName::FactClaims,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Patients => "patients",
            TableName::Providers => "providers",
            TableName::Procedures => "procedures",
            TableName::Transactions => "transactions",
            TableName::Claims => "claims",
            TableName::DimPatientsScd => "dim_patients_scd",
            TableName::DimProviders => "dim_providers",
            TableName::DimProcedures => "dim_procedures",
            TableName::DimDate => "dim_date",
            TableName::FactTransactions => "fact_transactions",
            TableName::FactClaims => "fact_claims",
        }
    }

    pub fn is_input(self) -> bool {
        Self::INPUTS.contains(&self)
    }

    pub fn is_fact(self) -> bool {
        matches!(self, TableName::FactTransactions | TableName::FactClaims)
    }

    /// Declared column contract for this table.
    pub fn schema(self) -> &'static TableSchema {
        schema::schema_for(self)
    }

    /// Partition hint for the sink. Only fact tables are partitioned.
    pub fn partition_column(self) -> Option<&'static str> {
        match self {
            TableName::FactTransactions => Some("transaction_date"),
            TableName::FactClaims => Some("claim_date"),
            _ => None,
        }
    }

    /// Clustering hint for the sink.
    pub fn cluster_columns(self) -> &'static [&'static str] {
        match self {
            TableName::FactTransactions | TableName::FactClaims => &["unified_patient_id"],
            _ => &[],
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown table name: {0}")]
pub struct UnknownTable(pub String);

impl FromStr for TableName {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let table = match s.trim().to_ascii_lowercase().as_str() {
            "patients" => TableName::Patients,
            "providers" => TableName::Providers,
            // CPT reference extracts keep their historical name.
            "procedures" | "cptcodes" => TableName::Procedures,
            "transactions" => TableName::Transactions,
            "claims" => TableName::Claims,
            "dim_patients_scd" => TableName::DimPatientsScd,
            "dim_providers" => TableName::DimProviders,
            "dim_procedures" => TableName::DimProcedures,
            "dim_date" => TableName::DimDate,
            "fact_transactions" => TableName::FactTransactions,
            "fact_claims" => TableName::FactClaims,
            _ => return Err(UnknownTable(s.to_string())),
        };
        Ok(table)
    }
}
