//! Ordered keyword rules mapping a transaction label + direction to a business category.
//!
//! Rules are evaluated in order (built-ins first, vendor rules appended) and
//! the first match wins. A keyword matches when it is a substring of the
//! upper-cased label or of the label's alphanumeric form. Keywords carrying
//! spaces only match the raw label; the glued spelling ("UBEREATS") is listed
//! alongside when labels collapse it.

use releve_core::Direction;
use releve_core::text::alnum_key;
use serde::{Deserialize, Serialize};

/// Category names used by the built-in rules and presets
pub mod categories {
    pub const SOCIAL_CHARGES: &str = "Charges sociales";
    pub const TAXES: &str = "Impôts et taxes";
    pub const SALARIES: &str = "Salaires";
    pub const RENT: &str = "Loyer";
    pub const ENERGY: &str = "Énergie";
    pub const TELECOM: &str = "Télécom";
    pub const INSURANCE: &str = "Assurances";
    pub const BANK_FEES: &str = "Frais bancaires";
    pub const LOAN: &str = "Emprunt";
    pub const SUPPLIERS: &str = "Fournisseurs";
    pub const CASH_WITHDRAWAL: &str = "Retrait espèces";
    pub const CARD_SALES: &str = "Ventes CB";
    pub const DELIVERY_PLATFORMS: &str = "Plateformes de livraison";
    pub const MEAL_VOUCHERS: &str = "Titres-restaurant";
    pub const REFUNDS: &str = "Remboursements";
    pub const CAPITAL_CONTRIBUTIONS: &str = "Apports";
    pub const CARD_PURCHASES: &str = "Achats carte";

    /// Fallback for unmatched credits
    pub const DEFAULT_CREDIT: &str = "Encaissement";
    /// Fallback for unmatched debits
    pub const DEFAULT_DEBIT: &str = "Autres";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Upper-case keywords, tried in order
    pub keywords: Vec<String>,
    pub category: String,
    /// `None` applies the rule to both directions
    #[serde(default)]
    pub allowed_directions: Option<Vec<Direction>>,
}

impl CategoryRule {
    pub fn new<K: AsRef<str>>(
        keywords: &[K],
        category: impl Into<String>,
        allowed_directions: Option<&[Direction]>,
    ) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_uppercase())
                .filter(|k| !k.is_empty())
                .collect(),
            category: category.into(),
            allowed_directions: allowed_directions.map(<[Direction]>::to_vec),
        }
    }

    pub fn allows(&self, direction: Direction) -> bool {
        self.allowed_directions
            .as_ref()
            .is_none_or(|dirs| dirs.contains(&direction))
    }

    /// `upper` is the upper-cased label, `normalized` its `alnum_key`.
    pub fn matches(&self, upper: &str, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| upper.contains(keyword.as_str()) || normalized.contains(keyword.as_str()))
    }
}

/// Result of categorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized {
    pub category: String,
    /// Position of the winning rule, `None` when a default applied
    pub rule_index: Option<usize>,
}

/// Deterministically categorize a label. First matching rule wins.
pub fn categorize(rules: &[CategoryRule], description: &str, direction: Direction) -> Categorized {
    let upper = description.to_uppercase();
    let normalized = alnum_key(description);

    for (index, rule) in rules.iter().enumerate() {
        if rule.allows(direction) && rule.matches(&upper, &normalized) {
            return Categorized {
                category: rule.category.clone(),
                rule_index: Some(index),
            };
        }
    }

    let fallback = match direction {
        Direction::In => categories::DEFAULT_CREDIT,
        Direction::Out => categories::DEFAULT_DEBIT,
    };
    Categorized {
        category: fallback.to_string(),
        rule_index: None,
    }
}

/// A versioned, immutable rule list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: u64,
    pub rules: Vec<CategoryRule>,
}

impl RuleSet {
    pub fn new(version: u64, rules: Vec<CategoryRule>) -> Self {
        Self { version, rules }
    }

    /// Built-in rules only, version 1
    pub fn builtin() -> Self {
        Self::new(1, builtin_rules())
    }

    /// Append vendor rules after the existing ones.
    pub fn with_vendor_rules(mut self, vendor: impl IntoIterator<Item = CategoryRule>) -> Self {
        self.rules.extend(vendor);
        self
    }

    pub fn classify(&self, description: &str, direction: Direction) -> Categorized {
        categorize(&self.rules, description, direction)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The ordered built-in rule table.
pub fn builtin_rules() -> Vec<CategoryRule> {
    use categories::*;
    const OUT: Option<&[Direction]> = Some(&[Direction::Out]);
    const IN: Option<&[Direction]> = Some(&[Direction::In]);

    vec![
        CategoryRule::new(
            &["URSSAF", "RETRAITE", "AGIRC", "ARRCO", "PREVOYANCE", "MUTUELLE", "CIPAV"],
            SOCIAL_CHARGES,
            OUT,
        ),
        CategoryRule::new(
            &["DGFIP", "IMPOT", "TRESOR PUBLIC", "TVA", "CFE", "TAXE FONCIERE"],
            TAXES,
            OUT,
        ),
        CategoryRule::new(&["SALAIRE", "REMUNERATION", "ACOMPTE SAL"], SALARIES, OUT),
        CategoryRule::new(&["LOYER", "BAIL COMMERCIAL", "FONCIA", "NEXITY"], RENT, OUT),
        CategoryRule::new(
            &["EDF", "ENGIE", "TOTALENERGIES", "GRDF", "VEOLIA", "SUEZ EAU"],
            ENERGY,
            OUT,
        ),
        CategoryRule::new(
            &["ORANGE", "SFR", "BOUYGUES TEL", "FREE MOBILE", "FREE PRO", "FREEBOX"],
            TELECOM,
            OUT,
        ),
        CategoryRule::new(
            &["ASSURANCE", "AXA", "ALLIANZ", "MAIF", "MACIF", "HISCOX", "GENERALI"],
            INSURANCE,
            OUT,
        ),
        CategoryRule::new(
            &["FRAIS", "COMMISSION", "COTISATION CARTE", "AGIOS", "INTERETS DEBITEURS"],
            BANK_FEES,
            OUT,
        ),
        CategoryRule::new(&["ECHEANCE PRET", "ECH PRET", "REMBOURSEMENT PRET"], LOAN, OUT),
        CategoryRule::new(
            &["METRO", "PROMOCASH", "TRANSGOURMET", "POMONA", "FRANCE BOISSONS", "BRAKE"],
            SUPPLIERS,
            OUT,
        ),
        CategoryRule::new(&["RETRAIT", "DAB"], CASH_WITHDRAWAL, OUT),
        CategoryRule::new(
            &["REMISE CB", "REMISE CARTE", "PAIEMENT CB", "SUMUP", "ZETTLE", "STRIPE", "LYRA"],
            CARD_SALES,
            IN,
        ),
        CategoryRule::new(&["UBER EATS", "UBEREATS", "DELIVEROO", "JUST EAT", "JUSTEAT"], DELIVERY_PLATFORMS, IN),
        CategoryRule::new(
            &["EDENRED", "SODEXO", "PLUXEE", "SWILE", "CONECS", "TICKET RESTAURANT"],
            MEAL_VOUCHERS,
            IN,
        ),
        CategoryRule::new(&["REMBOURSEMENT", "AVOIR", "REMB "], REFUNDS, IN),
        CategoryRule::new(&["APPORT", "COMPTE COURANT ASSOCIE"], CAPITAL_CONTRIBUTIONS, IN),
        CategoryRule::new(&["CB ", "CARTE "], CARD_PURCHASES, OUT),
    ]
}
