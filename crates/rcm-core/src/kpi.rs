//! Revenue-cycle KPIs computed from a built model.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::DimensionalModel;

const APPROVED_STATUS: &str = "approved";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueKpis {
    /// Sum of transaction amounts.
    pub total_revenue: f64,
    /// Transaction amounts per source database.
    pub revenue_by_source: BTreeMap<String, f64>,
    /// Share of claims with status `Approved`, in percent. `None` without claims.
    pub claim_approval_rate: Option<f64>,
    /// Distinct unified patient identities in the patient dimension.
    pub unique_patients: usize,
}

pub fn compute_kpis(model: &DimensionalModel) -> RevenueKpis {
    let mut total_revenue = 0.0;
    let mut revenue_by_source: BTreeMap<String, f64> = BTreeMap::new();
    for fact in &model.transactions {
        total_revenue += fact.amount;
        *revenue_by_source.entry(fact.source_db.clone()).or_insert(0.0) += fact.amount;
    }

    let claim_approval_rate = if model.claims.is_empty() {
        None
    } else {
        let approved = model
            .claims
            .iter()
            .filter(|claim| claim.claim_status.eq_ignore_ascii_case(APPROVED_STATUS))
            .count();
        Some(approved as f64 * 100.0 / model.claims.len() as f64)
    };

    let unique_patients = model
        .patients
        .iter()
        .map(|version| version.unified_patient_id.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    RevenueKpis {
        total_revenue,
        revenue_by_source,
        claim_approval_rate,
        unique_patients,
    }
}
