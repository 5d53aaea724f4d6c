//! Dimensional modeling engine for the revenue-cycle warehouse.
//!
//! Turns normalized patient, provider, procedure, transaction and claim
//! tables into a star schema: a type-2 patient dimension, static provider
//! and procedure dimensions, a conformed date dimension and two fact tables
//! keyed against them.
//!
//! The entry point is [`build_dimensional_model`]. It never mutates its
//! inputs; the prior patient snapshot and key registry go in, and a new
//! snapshot, registry and the run's [`Diagnostics`](rcm_model::Diagnostics)
//! come out.

pub mod calendar;
pub mod date_dimension;
pub mod dimensions;
pub mod error;
pub mod facts;
pub mod frames;
pub mod identity;
pub mod keys;
pub mod kpi;
pub mod model;
pub mod reader;
pub mod records;
pub mod scd;

pub use error::{ModelError, Result};
pub use identity::{UNKNOWN_IDENTITY, UnifiedKey, provenance_tag, resolve_unified_key};
pub use keys::{KeyNamespace, KeyRegistry};
pub use kpi::{RevenueKpis, compute_kpis};
pub use model::{DimensionalModel, ModelInputs, ModelRun, build_dimensional_model};
pub use records::{
    ClaimFact, DateRow, FactKeys, PatientAttributes, PatientRecord, PatientVersion, ProcedureRow,
    ProviderRow, TransactionFact,
};
pub use scd::{HistoryStats, TrackedAttribute, build_patient_history};
