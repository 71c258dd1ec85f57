//! Shared rule snapshots. Readers clone an `Arc<RuleSet>` and classify against
//! it without holding any lock; a reload swaps the pointer.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::category_rules::{CategoryRule, RuleSet};

#[derive(Debug)]
pub struct RuleStore {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    /// Built-in rules followed by `vendor`
    pub fn with_vendor_rules(vendor: Vec<CategoryRule>) -> Self {
        Self::new(RuleSet::builtin().with_vendor_rules(vendor))
    }

    /// The rule set in force right now. Stays valid across later reloads.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Install `rules` as the next version. Returns the version assigned.
    pub fn replace(&self, rules: Vec<CategoryRule>) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let version = guard.version + 1;
        *guard = Arc::new(RuleSet::new(version, rules));
        info!(version, rules = guard.len(), "rule set replaced");
        version
    }

    /// Rebuild from the built-ins plus a fresh vendor list.
    pub fn reload_vendor_rules(&self, vendor: Vec<CategoryRule>) -> u64 {
        let rules = RuleSet::builtin().with_vendor_rules(vendor).rules;
        self.replace(rules)
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleSet::builtin())
    }
}
