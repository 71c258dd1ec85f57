//! Grouping presets: named, ordered ways of folding categories into report lines.

use releve_core::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::category_rules::categories::*;

pub const DEFAULT_PRESET: &str = "default";

/// One report line of a preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    /// Categories folded into this group. Empty matches every category.
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// `None` accepts both directions
    #[serde(default)]
    pub directions: Option<BTreeSet<Direction>>,
}

impl GroupSpec {
    pub fn new(name: &str, categories: &[&str], directions: Option<&[Direction]>) -> Self {
        Self {
            name: name.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            directions: directions.map(|d| d.iter().copied().collect()),
        }
    }

    pub fn matches(&self, category: &str, direction: Direction) -> bool {
        let category_ok = self.categories.is_empty() || self.categories.contains(category);
        let direction_ok = self.directions.as_ref().is_none_or(|d| d.contains(&direction));
        category_ok && direction_ok
    }
}

/// Where transactions no group claims end up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    #[serde(rename = "in", default)]
    pub inflow: Option<String>,
    #[serde(rename = "out", default)]
    pub outflow: Option<String>,
    #[serde(default = "default_fallback_name")]
    pub default: String,
}

fn default_fallback_name() -> String {
    "Divers".to_string()
}

impl Default for Fallback {
    fn default() -> Self {
        Self {
            inflow: None,
            outflow: None,
            default: default_fallback_name(),
        }
    }
}

impl Fallback {
    pub fn for_direction(&self, direction: Direction) -> &str {
        let specific = match direction {
            Direction::In => self.inflow.as_deref(),
            Direction::Out => self.outflow.as_deref(),
        };
        specific.unwrap_or(self.default.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingPreset {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub fallback: Fallback,
}

impl GroupingPreset {
    /// First group accepting the pair, else the direction fallback, else the default fallback.
    pub fn resolve_group(&self, category: &str, direction: Direction) -> &str {
        self.groups
            .iter()
            .find(|g| g.matches(category, direction))
            .map(|g| g.name.as_str())
            .unwrap_or_else(|| self.fallback.for_direction(direction))
    }

    /// Every group name this preset can produce, in report order
    pub fn group_order(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.iter().map(|g| g.name.as_str()).collect();
        let fallbacks = [
            self.fallback.inflow.as_deref(),
            self.fallback.outflow.as_deref(),
            Some(self.fallback.default.as_str()),
        ];
        for name in fallbacks.into_iter().flatten() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Name and label of a preset, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetInfo {
    pub name: String,
    pub label: String,
}

/// Ordered preset collection. The default preset is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetCatalog {
    presets: Vec<GroupingPreset>,
}

impl PresetCatalog {
    pub fn builtin() -> Self {
        Self {
            presets: builtin_presets(),
        }
    }

    /// Add presets; one sharing a name with an existing preset replaces it in place.
    pub fn with_presets(mut self, extra: impl IntoIterator<Item = GroupingPreset>) -> Self {
        for preset in extra {
            match self.presets.iter_mut().find(|p| p.name == preset.name) {
                Some(existing) => *existing = preset,
                None => self.presets.push(preset),
            }
        }
        self
    }

    /// Look a preset up by name. Unknown or missing names resolve to the default preset.
    pub fn get(&self, name: Option<&str>) -> &GroupingPreset {
        let requested = name.unwrap_or(DEFAULT_PRESET);
        if let Some(preset) = self.presets.iter().find(|p| p.name == requested) {
            return preset;
        }
        warn!(preset = requested, "unknown preset, using default");
        self.presets
            .iter()
            .find(|p| p.name == DEFAULT_PRESET)
            .unwrap_or(&self.presets[0])
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.iter().map(|p| p.name.clone()).collect()
    }

    pub fn infos(&self) -> Vec<PresetInfo> {
        self.presets
            .iter()
            .map(|p| PresetInfo {
                name: p.name.clone(),
                label: p.label.clone(),
            })
            .collect()
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_presets() -> Vec<GroupingPreset> {
    const IN: Option<&[Direction]> = Some(&[Direction::In]);
    const OUT: Option<&[Direction]> = Some(&[Direction::Out]);

    let overview = GroupingPreset {
        name: DEFAULT_PRESET.to_string(),
        label: "Vue d'ensemble".to_string(),
        groups: vec![
            GroupSpec::new(
                "Chiffre d'affaires",
                &[CARD_SALES, DELIVERY_PLATFORMS, MEAL_VOUCHERS, DEFAULT_CREDIT],
                IN,
            ),
            GroupSpec::new("Personnel", &[SALARIES, SOCIAL_CHARGES], OUT),
            GroupSpec::new("Achats", &[SUPPLIERS, CARD_PURCHASES], OUT),
            GroupSpec::new("Frais généraux", &[RENT, ENERGY, TELECOM, INSURANCE], OUT),
            GroupSpec::new(
                "Banque et financement",
                &[BANK_FEES, LOAN, CAPITAL_CONTRIBUTIONS, CASH_WITHDRAWAL],
                None,
            ),
            GroupSpec::new("Impôts", &[TAXES], OUT),
        ],
        fallback: Fallback {
            inflow: Some("Autres entrées".to_string()),
            outflow: Some("Autres sorties".to_string()),
            default: default_fallback_name(),
        },
    };

    let flows = GroupingPreset {
        name: "flux".to_string(),
        label: "Entrées / sorties".to_string(),
        groups: vec![
            GroupSpec::new("Entrées", &[], IN),
            GroupSpec::new("Sorties", &[], OUT),
        ],
        fallback: Fallback::default(),
    };

    let expense_lines = [
        SOCIAL_CHARGES,
        TAXES,
        SALARIES,
        RENT,
        ENERGY,
        TELECOM,
        INSURANCE,
        BANK_FEES,
        LOAN,
        SUPPLIERS,
        CASH_WITHDRAWAL,
        CARD_PURCHASES,
    ];
    let expenses = GroupingPreset {
        name: "charges".to_string(),
        label: "Détail des charges".to_string(),
        groups: expense_lines
            .iter()
            .map(|&category| GroupSpec::new(category, &[category], OUT))
            .collect(),
        fallback: Fallback {
            inflow: Some("Recettes".to_string()),
            outflow: Some("Autres charges".to_string()),
            default: default_fallback_name(),
        },
    };

    vec![overview, flows, expenses]
}
