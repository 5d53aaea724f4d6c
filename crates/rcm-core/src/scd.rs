//! Type-2 slowly changing patient dimension.
//!
//! Incoming patients are compared with the current version of the same
//! unified key. A change in a tracked attribute closes the current version at
//! the build timestamp and opens a new one; anything else leaves history
//! untouched.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use tracing::{debug, info};

use rcm_model::{DataQualityIssue, Diagnostics, IssueKind, Stage, TableName};

use crate::error::{ModelError, Result};
use crate::identity::{provenance_tag, resolve_unified_key};
use crate::keys::{KeyNamespace, KeyRegistry};
use crate::reader::TableReader;
use crate::records::{PatientAttributes, PatientRecord, PatientVersion};

/// Attributes whose change opens a new version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedAttribute {
    FirstName,
    LastName,
    Phone,
}

pub const TRACKED_ATTRIBUTES: [TrackedAttribute; 3] = [
    TrackedAttribute::FirstName,
    TrackedAttribute::LastName,
    TrackedAttribute::Phone,
];

impl TrackedAttribute {
    pub fn column(self) -> &'static str {
        match self {
            TrackedAttribute::FirstName => "first_name",
            TrackedAttribute::LastName => "last_name",
            TrackedAttribute::Phone => "phone",
        }
    }

    fn value(self, attributes: &PatientAttributes) -> &str {
        match self {
            TrackedAttribute::FirstName => &attributes.first_name,
            TrackedAttribute::LastName => &attributes.last_name,
            TrackedAttribute::Phone => &attributes.phone,
        }
    }
}

/// Tracked attributes that differ between two attribute sets.
pub fn changed_attributes(
    current: &PatientAttributes,
    incoming: &PatientAttributes,
) -> Vec<TrackedAttribute> {
    TRACKED_ATTRIBUTES
        .into_iter()
        .filter(|attribute| attribute.value(current) != attribute.value(incoming))
        .collect()
}

/// Read normalized patients and resolve their unified keys.
pub fn read_patient_records(
    df: &DataFrame,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<PatientRecord>> {
    let reader = TableReader::new(df, TableName::Patients, Stage::PatientHistory, diagnostics)?;
    let mut records = Vec::with_capacity(reader.height());
    for row in 0..reader.height() {
        let source_db = reader.text(row, "source_db");
        let source_file = reader.text(row, "source_file");
        let unified_patient_id = resolve_unified_key(
            &reader.text(row, "patient_id"),
            provenance_tag(&source_db, &source_file),
        );
        records.push(PatientRecord {
            unified_patient_id,
            attributes: PatientAttributes {
                first_name: reader.text(row, "first_name"),
                last_name: reader.text(row, "last_name"),
                dob: reader.date(row, "dob"),
                gender: reader.text(row, "gender"),
                phone: reader.text(row, "phone"),
                address: reader.text(row, "address"),
                age: reader.integer(row, "age"),
                source_db,
            },
        });
    }
    Ok(records)
}

/// Counts of what one history build did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub new_members: usize,
    pub new_versions: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

/// Apply one run of incoming patients to the prior snapshot.
///
/// Returns every prior version (with closures applied) followed by the
/// versions opened in this run. `prior` is left untouched.
///
/// A snapshot holding several current versions of one key is repaired first:
/// the versions are chained in effective-date order, each closed where the
/// next one starts, and the latest stays current. A version sharing its
/// effective date with an earlier one in the chain cannot be closed and is
/// dropped.
pub fn build_patient_history(
    incoming: &[PatientRecord],
    prior: &[PatientVersion],
    build_time: NaiveDateTime,
    registry: &mut KeyRegistry,
    diagnostics: &mut Diagnostics,
) -> Result<(Vec<PatientVersion>, HistoryStats)> {
    let mut stats = HistoryStats::default();
    let accepted = accept_incoming(incoming, diagnostics, &mut stats);

    registry.seed(
        KeyNamespace::Patients,
        prior
            .iter()
            .map(|version| (version.unified_patient_id.as_str(), version.patient_key)),
    );

    let mut history: Vec<PatientVersion> = prior.to_vec();
    let (current, repair) = current_versions(&history, diagnostics);
    for &(idx, next_effective) in &repair.closures {
        close_version(&mut history[idx], next_effective)?;
    }

    let new_members: Vec<&str> = accepted
        .iter()
        .filter(|record| !current.contains_key(record.unified_patient_id.as_str()))
        .map(|record| record.unified_patient_id.as_str())
        .collect();
    let new_keys = registry.assign(KeyNamespace::Patients, new_members);

    let mut opened = Vec::new();
    for record in accepted {
        let key = record.unified_patient_id.as_str();
        match current.get(key) {
            None => {
                // assign() covered every non-blank unmatched key above.
                let Some(patient_key) = new_keys.get(key).copied() else {
                    continue;
                };
                opened.push(PatientVersion::current(patient_key, record, build_time));
                stats.new_members += 1;
            }
            Some(&idx) => {
                let changes = changed_attributes(&history[idx].attributes, &record.attributes);
                if changes.is_empty() {
                    stats.unchanged += 1;
                    continue;
                }
                debug!(
                    unified_patient_id = key,
                    changed = ?changes.iter().map(|c| c.column()).collect::<Vec<_>>(),
                    "patient attributes drifted, opening new version"
                );
                close_version(&mut history[idx], build_time)?;
                opened.push(PatientVersion::current(
                    history[idx].patient_key,
                    record,
                    build_time,
                ));
                stats.new_versions += 1;
            }
        }
    }

    if !repair.dropped.is_empty() {
        let mut idx = 0;
        history.retain(|_| {
            let keep = !repair.dropped.contains(&idx);
            idx += 1;
            keep
        });
    }
    history.extend(opened);
    info!(
        prior_rows = prior.len(),
        new_members = stats.new_members,
        new_versions = stats.new_versions,
        unchanged = stats.unchanged,
        rejected = stats.rejected,
        "patient history built"
    );
    Ok((history, stats))
}

/// Drop rows without a usable identity and later duplicates of a key.
fn accept_incoming<'r>(
    incoming: &'r [PatientRecord],
    diagnostics: &mut Diagnostics,
    stats: &mut HistoryStats,
) -> Vec<&'r PatientRecord> {
    let mut seen = BTreeSet::new();
    let mut accepted = Vec::with_capacity(incoming.len());
    for (row, record) in incoming.iter().enumerate() {
        if record.unified_patient_id.is_unknown() {
            diagnostics.record(
                DataQualityIssue::new(
                    Stage::PatientHistory,
                    TableName::Patients,
                    IssueKind::MissingIdentifier,
                    "patient has no local id or provenance, excluded from history",
                )
                .at_row(row),
            );
            stats.rejected += 1;
            continue;
        }
        if !seen.insert(record.unified_patient_id.as_str()) {
            diagnostics.record(
                DataQualityIssue::new(
                    Stage::PatientHistory,
                    TableName::Patients,
                    IssueKind::DuplicateIdentity,
                    format!(
                        "`{}` appears more than once, first occurrence kept",
                        record.unified_patient_id
                    ),
                )
                .at_row(row),
            );
            stats.rejected += 1;
            continue;
        }
        accepted.push(record);
    }
    accepted
}

/// Fixes for a snapshot with several current versions of one key.
#[derive(Debug, Default)]
struct SnapshotRepair {
    /// Version index and the effective date of the version that follows it.
    closures: Vec<(usize, NaiveDateTime)>,
    dropped: BTreeSet<usize>,
}

/// Index current versions by unified key.
///
/// A key with several current versions keeps the one with the latest
/// effective date; the rest are chained or dropped through [`SnapshotRepair`].
/// Ties keep the first version in snapshot order.
fn current_versions(
    history: &[PatientVersion],
    diagnostics: &mut Diagnostics,
) -> (BTreeMap<String, usize>, SnapshotRepair) {
    let mut grouped: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, version) in history.iter().enumerate() {
        if version.is_current {
            grouped
                .entry(version.unified_patient_id.as_str())
                .or_default()
                .push(idx);
        }
    }

    let mut current = BTreeMap::new();
    let mut repair = SnapshotRepair::default();
    for (key, mut indices) in grouped {
        if indices.len() > 1 {
            indices.sort_by_key(|&idx| (history[idx].effective_date, idx));
            let mut chain: Vec<usize> = Vec::with_capacity(indices.len());
            for idx in indices {
                let tied = chain
                    .last()
                    .is_some_and(|&prev| history[prev].effective_date == history[idx].effective_date);
                if tied {
                    record_repair(
                        diagnostics,
                        format!(
                            "`{key}` has two current versions effective {}, the later one was dropped",
                            history[idx].effective_date
                        ),
                    );
                    repair.dropped.insert(idx);
                } else {
                    chain.push(idx);
                }
            }
            for pair in chain.windows(2) {
                record_repair(
                    diagnostics,
                    format!(
                        "`{key}` has several current versions, the one effective {} was closed",
                        history[pair[0]].effective_date
                    ),
                );
                repair
                    .closures
                    .push((pair[0], history[pair[1]].effective_date));
            }
            indices = chain;
        }
        if let Some(&winner) = indices.last() {
            current.insert(key.to_string(), winner);
        }
    }
    (current, repair)
}

fn record_repair(diagnostics: &mut Diagnostics, message: String) {
    diagnostics.record(DataQualityIssue::new(
        Stage::PatientHistory,
        TableName::DimPatientsScd,
        IssueKind::AmbiguousMatch,
        message,
    ));
}

fn close_version(version: &mut PatientVersion, build_time: NaiveDateTime) -> Result<()> {
    if build_time <= version.effective_date {
        return Err(ModelError::NonMonotonicBuildTime {
            unified_key: version.unified_patient_id.to_string(),
            effective_date: version.effective_date,
            build_time,
        });
    }
    version.end_date = Some(build_time);
    version.is_current = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UnifiedKey;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn patient(id: &str, first: &str, phone: &str) -> PatientRecord {
        PatientRecord {
            unified_patient_id: resolve_unified_key(id, "hospital_a"),
            attributes: PatientAttributes {
                first_name: first.to_string(),
                last_name: "Doe".to_string(),
                phone: phone.to_string(),
                source_db: "hospital_a".to_string(),
                ..PatientAttributes::default()
            },
        }
    }

    fn build(
        incoming: &[PatientRecord],
        prior: &[PatientVersion],
        time: NaiveDateTime,
        registry: &mut KeyRegistry,
    ) -> Vec<PatientVersion> {
        let mut diagnostics = Diagnostics::new();
        build_patient_history(incoming, prior, time, registry, &mut diagnostics)
            .unwrap()
            .0
    }

    #[test]
    fn first_load_opens_one_current_version_per_patient() {
        let mut registry = KeyRegistry::new();
        let history = build(
            &[patient("P1", "Jane", "555-1111")],
            &[],
            at(1),
            &mut registry,
        );
        assert_eq!(history.len(), 1);
        let version = &history[0];
        assert_eq!(version.unified_patient_id.as_str(), "P1_hospital_a");
        assert_eq!(version.effective_date, at(1));
        assert_eq!(version.end_date, None);
        assert!(version.is_current);
        assert_eq!(version.patient_key, 1);
    }

    #[test]
    fn tracked_change_closes_prior_and_opens_new_version() {
        let mut registry = KeyRegistry::new();
        let first = build(
            &[patient("P1", "Jane", "555-1111")],
            &[],
            at(1),
            &mut registry,
        );
        let second = build(
            &[patient("P1", "Jane", "555-2222")],
            &first,
            at(2),
            &mut registry,
        );

        assert_eq!(second.len(), 2);
        assert_eq!(second[0].end_date, Some(at(2)));
        assert!(!second[0].is_current);
        assert_eq!(second[0].attributes.phone, "555-1111");
        assert_eq!(second[1].attributes.phone, "555-2222");
        assert!(second[1].is_current);
        assert_eq!(second[1].effective_date, at(2));
        assert_eq!(second[1].patient_key, second[0].patient_key);
    }

    #[test]
    fn untracked_drift_leaves_snapshot_unchanged() {
        let mut registry = KeyRegistry::new();
        let first = build(
            &[patient("P1", "Jane", "555-1111")],
            &[],
            at(1),
            &mut registry,
        );
        let mut moved = patient("P1", "Jane", "555-1111");
        moved.attributes.address = "12 New Street".to_string();
        moved.attributes.age = Some(41);
        let second = build(&[moved], &first, at(2), &mut registry);
        assert_eq!(second, first);
    }

    #[test]
    fn duplicates_and_unknown_identities_are_rejected() {
        let mut registry = KeyRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut anonymous = patient("", "Ghost", "");
        anonymous.unified_patient_id = UnifiedKey::unknown();
        let incoming = [
            patient("P1", "Jane", "555-1111"),
            patient("P1", "Janet", "555-9999"),
            anonymous,
        ];
        let (history, stats) =
            build_patient_history(&incoming, &[], at(1), &mut registry, &mut diagnostics)
                .unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].attributes.first_name, "Jane");
        assert_eq!(stats.rejected, 2);
        assert_eq!(diagnostics.count(IssueKind::DuplicateIdentity), 1);
        assert_eq!(diagnostics.count(IssueKind::MissingIdentifier), 1);
    }

    #[test]
    fn build_time_must_move_forward_to_close_a_version() {
        let mut registry = KeyRegistry::new();
        let first = build(
            &[patient("P1", "Jane", "555-1111")],
            &[],
            at(2),
            &mut registry,
        );
        let mut diagnostics = Diagnostics::new();
        let err = build_patient_history(
            &[patient("P1", "Jane", "555-2222")],
            &first,
            at(2),
            &mut registry,
            &mut diagnostics,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::NonMonotonicBuildTime { .. }));
    }

    #[test]
    fn duplicate_current_rows_in_snapshot_are_chained() {
        let mut registry = KeyRegistry::new();
        let record = patient("P1", "Jane", "555-1111");
        let older = PatientVersion::current(1, &record, at(1));
        let newer = PatientVersion::current(1, &record, at(2));
        let mut diagnostics = Diagnostics::new();
        let (history, _) = build_patient_history(
            &[record],
            &[older, newer],
            at(3),
            &mut registry,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].effective_date, at(1));
        assert_eq!(history[0].end_date, Some(at(2)));
        assert!(!history[0].is_current);
        assert_eq!(history[1].effective_date, at(2));
        assert_eq!(history[1].end_date, None);
        assert!(history[1].is_current);
        assert_eq!(diagnostics.count(IssueKind::AmbiguousMatch), 1);
    }

    #[test]
    fn chained_snapshot_rows_close_before_a_tracked_change() {
        let mut registry = KeyRegistry::new();
        let record = patient("P1", "Jane", "555-1111");
        // Snapshot order differs from effective-date order.
        let prior = [
            PatientVersion::current(1, &record, at(3)),
            PatientVersion::current(1, &record, at(1)),
            PatientVersion::current(1, &record, at(2)),
        ];
        let history = build(
            &[patient("P1", "Jane", "555-2222")],
            &prior,
            at(4),
            &mut registry,
        );

        let mut versions: Vec<_> = history.iter().collect();
        versions.sort_by_key(|v| v.effective_date);
        let intervals: Vec<_> = versions
            .iter()
            .map(|v| (v.effective_date, v.end_date))
            .collect();
        assert_eq!(
            intervals,
            vec![
                (at(1), Some(at(2))),
                (at(2), Some(at(3))),
                (at(3), Some(at(4))),
                (at(4), None),
            ]
        );
        assert_eq!(history.iter().filter(|v| v.is_current).count(), 1);
    }

    #[test]
    fn current_rows_with_the_same_effective_date_are_deduplicated() {
        let mut registry = KeyRegistry::new();
        let record = patient("P1", "Jane", "555-1111");
        let mut twin = PatientVersion::current(1, &record, at(2));
        twin.attributes.phone = "555-0000".to_string();
        let prior = [
            PatientVersion::current(1, &record, at(2)),
            twin,
            PatientVersion::current(1, &record, at(1)),
        ];
        let mut diagnostics = Diagnostics::new();
        let (history, stats) = build_patient_history(
            &[record],
            &prior,
            at(3),
            &mut registry,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].effective_date, at(2));
        assert_eq!(history[0].attributes.phone, "555-1111");
        assert!(history[0].is_current);
        assert_eq!(history[1].effective_date, at(1));
        assert_eq!(history[1].end_date, Some(at(2)));
        assert_eq!(stats.unchanged, 1);
        assert_eq!(diagnostics.count(IssueKind::AmbiguousMatch), 2);
    }

    #[test]
    fn new_members_get_keys_above_the_snapshot() {
        let mut registry = KeyRegistry::new();
        let record = patient("P1", "Jane", "555-1111");
        let prior = vec![PatientVersion::current(10, &record, at(1))];
        let history = build(
            &[record, patient("P2", "Raj", "555-3333")],
            &prior,
            at(2),
            &mut registry,
        );
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].unified_patient_id.as_str(), "P2_hospital_a");
        assert_eq!(history[1].patient_key, 11);
    }
}
