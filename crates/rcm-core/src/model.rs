//! Dimensional model orchestration.
//!
//! Runs the stages in dependency order: patient history, static dimensions,
//! the date dimension, then both fact tables. Every dimension snapshot is
//! complete before fact resolution starts.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use rcm_model::{Diagnostics, Stage, TableName};

use crate::date_dimension::build_date_dimension_from_facts;
use crate::dimensions::{build_procedure_dimension, build_provider_dimension};
use crate::error::{ModelError, Result};
use crate::facts::{DimensionLookups, resolve_claims, resolve_transactions};
use crate::frames::{
    claim_frame, date_frame, patient_frame, procedure_frame, provider_frame, transaction_frame,
};
use crate::keys::KeyRegistry;
use crate::records::{
    ClaimFact, DateRow, PatientVersion, ProcedureRow, ProviderRow, TransactionFact,
};
use crate::scd::{HistoryStats, build_patient_history, read_patient_records};

/// Normalized input tables keyed by logical name.
#[derive(Debug, Default, Clone)]
pub struct ModelInputs {
    tables: BTreeMap<TableName, DataFrame>,
}

impl ModelInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: TableName, frame: DataFrame) {
        self.tables.insert(table, frame);
    }

    pub fn with(mut self, table: TableName, frame: DataFrame) -> Self {
        self.insert(table, frame);
        self
    }

    pub fn get(&self, table: TableName) -> Option<&DataFrame> {
        self.tables.get(&table)
    }

    /// The table a stage cannot run without.
    pub fn require(&self, stage: Stage, table: TableName) -> Result<&DataFrame> {
        self.get(table)
            .ok_or(ModelError::MissingTable { stage, table })
    }
}

impl FromIterator<(TableName, DataFrame)> for ModelInputs {
    fn from_iter<I: IntoIterator<Item = (TableName, DataFrame)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

/// The star schema produced by one build.
#[derive(Debug, Clone, Default)]
pub struct DimensionalModel {
    pub patients: Vec<PatientVersion>,
    pub providers: Vec<ProviderRow>,
    pub procedures: Vec<ProcedureRow>,
    pub dates: Vec<DateRow>,
    pub transactions: Vec<TransactionFact>,
    pub claims: Vec<ClaimFact>,
}

impl DimensionalModel {
    pub fn current_patients(&self) -> impl Iterator<Item = &PatientVersion> {
        self.patients.iter().filter(|version| version.is_current)
    }

    pub fn row_count(&self, table: TableName) -> usize {
        match table {
            TableName::DimPatientsScd => self.patients.len(),
            TableName::DimProviders => self.providers.len(),
            TableName::DimProcedures => self.procedures.len(),
            TableName::DimDate => self.dates.len(),
            TableName::FactTransactions => self.transactions.len(),
            TableName::FactClaims => self.claims.len(),
            _ => 0,
        }
    }

    /// All six output tables as frames, keyed by name.
    pub fn to_frames(&self) -> Result<BTreeMap<TableName, DataFrame>> {
        let mut frames = BTreeMap::new();
        frames.insert(TableName::DimPatientsScd, patient_frame(&self.patients)?);
        frames.insert(TableName::DimProviders, provider_frame(&self.providers)?);
        frames.insert(TableName::DimProcedures, procedure_frame(&self.procedures)?);
        frames.insert(TableName::DimDate, date_frame(&self.dates)?);
        frames.insert(
            TableName::FactTransactions,
            transaction_frame(&self.transactions)?,
        );
        frames.insert(TableName::FactClaims, claim_frame(&self.claims)?);
        Ok(frames)
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct ModelRun {
    pub model: DimensionalModel,
    /// Registry to persist for the next run.
    pub registry: KeyRegistry,
    pub diagnostics: Diagnostics,
    pub history: HistoryStats,
}

/// Build the dimensional model from normalized inputs.
///
/// `prior` is the patient snapshot of the previous run (empty on first load)
/// and `registry` the key registry saved with it. Neither is modified; the
/// updated registry is returned in the [`ModelRun`].
pub fn build_dimensional_model(
    inputs: &ModelInputs,
    prior: &[PatientVersion],
    registry: &KeyRegistry,
    build_time: NaiveDateTime,
) -> Result<ModelRun> {
    let mut registry = registry.clone();
    let mut diagnostics = Diagnostics::new();

    let (patients, history) = info_span!("patient_history").in_scope(|| -> Result<_> {
        let frame = inputs.require(Stage::PatientHistory, TableName::Patients)?;
        let records = read_patient_records(frame, &mut diagnostics)?;
        build_patient_history(&records, prior, build_time, &mut registry, &mut diagnostics)
    })?;

    let (providers, procedures) = info_span!("static_dimensions").in_scope(|| -> Result<_> {
        let providers = build_provider_dimension(
            inputs.require(Stage::StaticDimension, TableName::Providers)?,
            &mut registry,
            &mut diagnostics,
        )?;
        let procedures = build_procedure_dimension(
            inputs.require(Stage::StaticDimension, TableName::Procedures)?,
            &mut registry,
            &mut diagnostics,
        )?;
        Ok((providers, procedures))
    })?;

    let transactions_frame = inputs.require(Stage::DateDimension, TableName::Transactions)?;
    let claims_frame = inputs.require(Stage::DateDimension, TableName::Claims)?;
    let dates = info_span!("date_dimension").in_scope(|| {
        build_date_dimension_from_facts(transactions_frame, claims_frame, &mut diagnostics)
    });

    let lookups = DimensionLookups::new(&patients, &providers, &procedures, &dates);
    let (transactions, claims) = info_span!("fact_resolution").in_scope(|| -> Result<_> {
        let transactions = resolve_transactions(transactions_frame, &lookups, &mut diagnostics)?;
        let claims = resolve_claims(claims_frame, &lookups, &mut diagnostics)?;
        Ok((transactions, claims))
    })?;

    let model = DimensionalModel {
        patients,
        providers,
        procedures,
        dates,
        transactions,
        claims,
    };
    info!(
        patient_versions = model.patients.len(),
        providers = model.providers.len(),
        procedures = model.procedures.len(),
        dates = model.dates.len(),
        transactions = model.transactions.len(),
        claims = model.claims.len(),
        issues = diagnostics.len(),
        "dimensional model built"
    );
    Ok(ModelRun {
        model,
        registry,
        diagnostics,
        history,
    })
}
