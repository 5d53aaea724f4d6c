//! Persisted surrogate-key assignments.
//!
//! Surrogate keys must not drift between runs: a provider keeps the key it
//! received the first time its business key was seen. The registry holds
//! every assignment per dimension and is saved after each successful run.
//! Keys never seen before are handed out in ascending business-key order,
//! above the highest key ever issued in that namespace.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub const REGISTRY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyNamespace {
    Patients,
    Providers,
    Procedures,
}

impl KeyNamespace {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyNamespace::Patients => "patients",
            KeyNamespace::Providers => "providers",
            KeyNamespace::Procedures => "procedures",
        }
    }
}

impl fmt::Display for KeyNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct NamespaceKeys {
    /// Highest key ever issued or observed; never decreases.
    high_water: i64,
    keys: BTreeMap<String, i64>,
}

impl NamespaceKeys {
    fn issue(&mut self, business_key: &str) -> i64 {
        if let Some(key) = self.keys.get(business_key) {
            return *key;
        }
        self.high_water += 1;
        self.keys.insert(business_key.to_string(), self.high_water);
        self.high_water
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRegistry {
    version: u32,
    namespaces: BTreeMap<String, NamespaceKeys>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self {
            version: REGISTRY_FORMAT_VERSION,
            namespaces: BTreeMap::new(),
        }
    }
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn get(&self, namespace: KeyNamespace, business_key: &str) -> Option<i64> {
        self.namespaces
            .get(namespace.as_str())
            .and_then(|ns| ns.keys.get(business_key).copied())
    }

    pub fn len(&self, namespace: KeyNamespace) -> usize {
        self.namespaces
            .get(namespace.as_str())
            .map_or(0, |ns| ns.keys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.values().all(|ns| ns.keys.is_empty())
    }

    /// Resolve keys for a batch of business keys, issuing new ones as needed.
    ///
    /// Blank business keys are skipped. The returned map covers every
    /// non-blank key in the batch.
    pub fn assign<'k, I>(&mut self, namespace: KeyNamespace, business_keys: I) -> BTreeMap<String, i64>
    where
        I: IntoIterator<Item = &'k str>,
    {
        let distinct: BTreeSet<&str> = business_keys
            .into_iter()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .collect();
        let ns = self.namespace_mut(namespace);
        distinct
            .into_iter()
            .map(|key| (key.to_string(), ns.issue(key)))
            .collect()
    }

    /// Record assignments observed elsewhere, such as a persisted snapshot.
    ///
    /// Existing assignments win; the high-water mark always rises to cover
    /// observed keys so they are never reissued.
    pub fn seed<'k, I>(&mut self, namespace: KeyNamespace, pairs: I)
    where
        I: IntoIterator<Item = (&'k str, i64)>,
    {
        let ns = self.namespace_mut(namespace);
        for (business_key, key) in pairs {
            ns.high_water = ns.high_water.max(key);
            ns.keys.entry(business_key.to_string()).or_insert(key);
        }
    }

    fn namespace_mut(&mut self, namespace: KeyNamespace) -> &mut NamespaceKeys {
        self.namespaces
            .entry(namespace.as_str().to_string())
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keys_follow_sorted_business_key_order() {
        let mut registry = KeyRegistry::new();
        let keys = registry.assign(KeyNamespace::Providers, ["D3", "D1", "D2", "D1", " "]);
        assert_eq!(keys.get("D1"), Some(&1));
        assert_eq!(keys.get("D2"), Some(&2));
        assert_eq!(keys.get("D3"), Some(&3));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn assignments_are_stable_across_runs() {
        let mut registry = KeyRegistry::new();
        registry.assign(KeyNamespace::Procedures, ["99213", "99214"]);
        // Next run sees a code that sorts first; old codes keep their keys.
        let keys = registry.assign(KeyNamespace::Procedures, ["10060", "99214"]);
        assert_eq!(keys.get("99214"), Some(&2));
        assert_eq!(keys.get("10060"), Some(&3));
        assert_eq!(registry.get(KeyNamespace::Procedures, "99213"), Some(1));
    }

    #[test]
    fn namespaces_are_independent() {
        let mut registry = KeyRegistry::new();
        registry.assign(KeyNamespace::Providers, ["A"]);
        let keys = registry.assign(KeyNamespace::Procedures, ["A"]);
        assert_eq!(keys.get("A"), Some(&1));
        assert_eq!(registry.len(KeyNamespace::Providers), 1);
        assert_eq!(registry.len(KeyNamespace::Patients), 0);
    }

    #[test]
    fn seeded_keys_are_never_reissued() {
        let mut registry = KeyRegistry::new();
        registry.seed(KeyNamespace::Patients, [("P1_a", 7), ("P2_a", 3)]);
        let keys = registry.assign(KeyNamespace::Patients, ["P1_a", "P9_a"]);
        assert_eq!(keys.get("P1_a"), Some(&7));
        assert_eq!(keys.get("P9_a"), Some(&8));
    }

    #[test]
    fn registry_round_trips_through_json() {
        let mut registry = KeyRegistry::new();
        registry.assign(KeyNamespace::Providers, ["D1", "D2"]);
        let json = serde_json::to_string(&registry).unwrap();
        let restored: KeyRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, registry);
        assert_eq!(restored.version(), REGISTRY_FORMAT_VERSION);
    }
}
