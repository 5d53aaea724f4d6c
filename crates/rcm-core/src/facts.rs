//! Fact resolution.
//!
//! Each fact row is left-joined to the dimension snapshots. Nothing is ever
//! dropped here: a reference that does not resolve leaves its key empty and
//! is reported.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::info;

use rcm_model::{DataQualityIssue, Diagnostics, IssueKind, Stage, TableName};

use crate::calendar::date_key;
use crate::error::Result;
use crate::identity::{UnifiedKey, provenance_tag, resolve_unified_key};
use crate::reader::TableReader;
use crate::records::{
    ClaimFact, DateRow, FactKeys, PatientVersion, ProcedureRow, ProviderRow, TransactionFact,
};

/// Business key to surrogate key, remembering keys that matched several rows.
#[derive(Debug, Default, Clone)]
pub struct KeyLookup {
    keys: BTreeMap<String, i64>,
    ambiguous: BTreeSet<String>,
}

impl KeyLookup {
    pub fn insert(&mut self, business_key: &str, surrogate: i64) {
        if business_key.is_empty() {
            return;
        }
        match self.keys.get_mut(business_key) {
            Some(existing) if *existing == surrogate => {}
            Some(existing) => {
                *existing = (*existing).min(surrogate);
                self.ambiguous.insert(business_key.to_string());
            }
            None => {
                self.keys.insert(business_key.to_string(), surrogate);
            }
        }
    }

    pub fn get(&self, business_key: &str) -> Option<i64> {
        self.keys.get(business_key).copied()
    }

    pub fn is_ambiguous(&self, business_key: &str) -> bool {
        self.ambiguous.contains(business_key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Lookups over the finished dimension snapshots.
#[derive(Debug, Default, Clone)]
pub struct DimensionLookups {
    pub patients: KeyLookup,
    pub providers: KeyLookup,
    pub procedures: KeyLookup,
    pub dates: BTreeSet<i64>,
}

impl DimensionLookups {
    pub fn new(
        patients: &[PatientVersion],
        providers: &[ProviderRow],
        procedures: &[ProcedureRow],
        dates: &[DateRow],
    ) -> Self {
        let mut lookups = Self::default();
        for version in patients.iter().filter(|version| version.is_current) {
            lookups
                .patients
                .insert(version.unified_patient_id.as_str(), version.patient_key);
        }
        for provider in providers {
            if let Some(key) = provider.provider_key {
                lookups.providers.insert(&provider.provider_id, key);
            }
        }
        for procedure in procedures {
            if let Some(key) = procedure.procedure_key {
                lookups.procedures.insert(&procedure.procedure_code, key);
            }
        }
        lookups.dates = dates.iter().map(|row| row.date_key).collect();
        lookups
    }
}

/// Which dimension a fact reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    Patient,
    Provider,
    Procedure,
    Date,
}

impl Reference {
    fn column(self, table: TableName) -> &'static str {
        match (self, table) {
            (Reference::Patient, _) => "unified_patient_id",
            (Reference::Provider, _) => "provider_id",
            (Reference::Procedure, _) => "procedure_code",
            (Reference::Date, TableName::Claims) => "claim_date",
            (Reference::Date, _) => "transaction_date",
        }
    }

    fn dimension(self) -> TableName {
        match self {
            Reference::Patient => TableName::DimPatientsScd,
            Reference::Provider => TableName::DimProviders,
            Reference::Procedure => TableName::DimProcedures,
            Reference::Date => TableName::DimDate,
        }
    }
}

/// Per-table resolution state: reports issues and counts misses.
struct Resolver<'l, 'd> {
    lookups: &'l DimensionLookups,
    table: TableName,
    diagnostics: &'d mut Diagnostics,
    unresolved: BTreeMap<&'static str, usize>,
}

impl<'l, 'd> Resolver<'l, 'd> {
    fn new(
        lookups: &'l DimensionLookups,
        table: TableName,
        diagnostics: &'d mut Diagnostics,
    ) -> Self {
        Self {
            lookups,
            table,
            diagnostics,
            unresolved: BTreeMap::new(),
        }
    }

    fn keys(
        &mut self,
        row: usize,
        unified: &UnifiedKey,
        provider_id: &str,
        procedure_code: &str,
        date: Option<NaiveDate>,
    ) -> FactKeys {
        let lookups = self.lookups;
        let patient_key = if unified.is_unknown() {
            self.miss(row, Reference::Patient, "no usable patient identity");
            None
        } else {
            self.resolve(row, Reference::Patient, &lookups.patients, unified.as_str())
        };
        let provider_key = self.resolve(row, Reference::Provider, &lookups.providers, provider_id);
        let procedure_key = self.resolve(
            row,
            Reference::Procedure,
            &lookups.procedures,
            procedure_code,
        );
        let date_key = date
            .map(date_key)
            .filter(|key| lookups.dates.contains(key));
        if date_key.is_none() {
            self.miss(row, Reference::Date, "no parseable date");
        }
        FactKeys {
            patient_key,
            provider_key,
            procedure_key,
            date_key,
        }
    }

    fn resolve(
        &mut self,
        row: usize,
        reference: Reference,
        lookup: &KeyLookup,
        business_key: &str,
    ) -> Option<i64> {
        let Some(key) = lookup.get(business_key) else {
            let detail = if business_key.is_empty() {
                "empty reference".to_string()
            } else {
                format!("`{business_key}` not found")
            };
            self.miss(row, reference, &detail);
            return None;
        };
        if lookup.is_ambiguous(business_key) {
            self.diagnostics.record(
                DataQualityIssue::new(
                    Stage::FactResolution,
                    self.table,
                    IssueKind::AmbiguousMatch,
                    format!(
                        "`{business_key}` matches several rows of {}, using lowest key {key}",
                        reference.dimension()
                    ),
                )
                .at_row(row)
                .in_column(reference.column(self.table)),
            );
        }
        Some(key)
    }

    fn miss(&mut self, row: usize, reference: Reference, detail: &str) {
        let column = reference.column(self.table);
        *self.unresolved.entry(column).or_insert(0) += 1;
        self.diagnostics.record(
            DataQualityIssue::new(
                Stage::FactResolution,
                self.table,
                IssueKind::UnresolvedReference,
                format!("{detail} in {}", reference.dimension()),
            )
            .at_row(row)
            .in_column(column),
        );
    }

    fn finish(self, rows: usize) {
        info!(
            table = %self.table,
            rows,
            unresolved = ?self.unresolved,
            "facts resolved"
        );
    }
}

fn unified_key_of(reader: &TableReader<'_>, row: usize) -> UnifiedKey {
    let source_db = reader.text(row, "source_db");
    let source_file = reader.text(row, "source_file");
    resolve_unified_key(
        &reader.text(row, "patient_id"),
        provenance_tag(&source_db, &source_file),
    )
}

pub fn resolve_transactions(
    df: &DataFrame,
    lookups: &DimensionLookups,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<TransactionFact>> {
    let reader = TableReader::new(
        df,
        TableName::Transactions,
        Stage::FactResolution,
        diagnostics,
    )?;
    let mut facts = Vec::with_capacity(reader.height());
    for row in 0..reader.height() {
        let amount = reader.decimal(row, "amount", diagnostics);
        let paid_amount = reader.decimal(row, "paid_amount", diagnostics);
        facts.push(TransactionFact {
            transaction_id: reader.text(row, "transaction_id"),
            unified_patient_id: unified_key_of(&reader, row),
            patient_id: reader.text(row, "patient_id"),
            provider_id: reader.text(row, "provider_id"),
            procedure_code: reader.text(row, "procedure_code"),
            transaction_date: reader.date(row, "transaction_date"),
            amount,
            paid_amount,
            payment_status: reader.text(row, "payment_status"),
            source_db: reader.text(row, "source_db"),
            source_file: reader.text(row, "source_file"),
            keys: FactKeys::default(),
        });
    }

    let mut resolver = Resolver::new(lookups, TableName::Transactions, diagnostics);
    for (row, fact) in facts.iter_mut().enumerate() {
        fact.keys = resolver.keys(
            row,
            &fact.unified_patient_id,
            &fact.provider_id,
            &fact.procedure_code,
            fact.transaction_date,
        );
    }
    resolver.finish(facts.len());
    Ok(facts)
}

pub fn resolve_claims(
    df: &DataFrame,
    lookups: &DimensionLookups,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ClaimFact>> {
    let reader = TableReader::new(df, TableName::Claims, Stage::FactResolution, diagnostics)?;
    let mut facts = Vec::with_capacity(reader.height());
    for row in 0..reader.height() {
        let amount_claimed = reader.decimal(row, "amount_claimed", diagnostics);
        let amount_approved = reader.decimal(row, "amount_approved", diagnostics);
        facts.push(ClaimFact {
            claim_id: reader.text(row, "claim_id"),
            unified_patient_id: unified_key_of(&reader, row),
            patient_id: reader.text(row, "patient_id"),
            provider_id: reader.text(row, "provider_id"),
            procedure_code: reader.text(row, "procedure_code"),
            claim_date: reader.date(row, "claim_date"),
            amount_claimed,
            amount_approved,
            insurance_company: reader.text(row, "insurance_company"),
            claim_status: reader.text(row, "claim_status"),
            source_db: reader.text(row, "source_db"),
            source_file: reader.text(row, "source_file"),
            keys: FactKeys::default(),
        });
    }

    let mut resolver = Resolver::new(lookups, TableName::Claims, diagnostics);
    for (row, fact) in facts.iter_mut().enumerate() {
        fact.keys = resolver.keys(
            row,
            &fact.unified_patient_id,
            &fact.provider_id,
            &fact.procedure_code,
            fact.claim_date,
        );
    }
    resolver.finish(facts.len());
    Ok(facts)
}
