//! Synonym / typo table for skill labels.
//!
//! The table is data: a map of canonical form → list of variants. A built-in
//! default ships with the crate and operators extend or override it with a
//! JSON or YAML file, no code change required.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use strsim::normalized_damerau_levenshtein;
use tracing::{debug, warn};

use crate::errors::MatchError;
use crate::normalize::text::normalize_skill;

/// Minimum normalized Damerau-Levenshtein similarity for the fuzzy skill fallback.
pub const FUZZY_SKILL_THRESHOLD: f64 = 0.88;

/// Labels shorter than this never go through the fuzzy fallback.
const FUZZY_MIN_LEN: usize = 4;

const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "javascript",
        &["javascrpit", "javascipt", "java script", "javscript", "js"],
    ),
    ("typescript", &["type script", "ts", "typscript"]),
    ("python", &["pyhton", "pyton", "python3"]),
    ("node.js", &["nodejs", "node", "node js"]),
    ("react", &["reactjs", "react js", "react.js"]),
    (
        "microsoft excel",
        &["excel", "ms excel", "excel avance", "excel intermediaire", "excell"],
    ),
    ("microsoft word", &["word", "ms word"]),
    ("microsoft office", &["ms office", "suite office", "office 365"]),
    (
        "bsp",
        &[
            "bureau de la securite privee",
            "permis bsp",
            "carte bsp",
            "permis agent de securite",
        ],
    ),
    (
        "service a la clientele",
        &["service client", "customer service", "service clientele"],
    ),
    ("chariot elevateur", &["cariste", "forklift", "chariot-elevateur"]),
    ("anglais", &["english", "anglais courant"]),
    ("francais", &["french", "francais courant"]),
    ("comptabilite", &["accounting", "comptable"]),
];

/// On-disk representation: `{ "<canonical>": ["<variant>", ...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymFile(pub BTreeMap<String, Vec<String>>);

/// Lookup table keyed by the skill-normalized form of every variant and of
/// every canonical form (each canonical maps to itself).
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    lookup: HashMap<String, String>,
    /// normalized canonical → canonical as written; ordered for deterministic fuzzy ties
    canonicals: BTreeMap<String, String>,
}

impl SynonymTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (canonical, variants) in DEFAULT_SYNONYMS {
            table.insert(canonical, variants.iter().copied());
        }
        table
    }

    pub fn from_file(file: SynonymFile) -> Self {
        let mut table = Self::default();
        for (canonical, variants) in &file.0 {
            table.insert(canonical, variants.iter().map(String::as_str));
        }
        table
    }

    pub fn from_json_str(raw: &str) -> Result<Self, MatchError> {
        Ok(Self::from_file(serde_json::from_str(raw)?))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, MatchError> {
        Ok(Self::from_file(serde_yaml::from_str(raw)?))
    }

    /// Loads a table from `.json`, `.yaml` or `.yml`.
    pub fn from_path(path: &Path) -> Result<Self, MatchError> {
        let raw = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let table = match ext.as_str() {
            "json" => Self::from_json_str(&raw)?,
            "yaml" | "yml" => Self::from_yaml_str(&raw)?,
            _ => {
                return Err(MatchError::UnsupportedFormat(format!(
                    "{} (expected .json, .yaml or .yml)",
                    path.display()
                )))
            }
        };
        debug!(
            "Loaded {} synonym entries from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Merges `other` over `self`. Entries from `other` win on collision.
    pub fn extend(&mut self, other: SynonymTable) {
        self.lookup.extend(other.lookup);
        self.canonicals.extend(other.canonicals);
    }

    /// Canonical form for `text`, if any variant or canonical matches its
    /// skill-normalized form.
    pub fn lookup(&self, text: &str) -> Option<&str> {
        let key = normalize_skill(text);
        if key.is_empty() {
            return None;
        }
        self.lookup.get(&key).map(String::as_str)
    }

    /// Closest canonical form by normalized Damerau-Levenshtein similarity.
    pub fn closest_canonical(&self, text: &str) -> Option<&str> {
        let key = normalize_skill(text);
        if key.chars().count() < FUZZY_MIN_LEN {
            return None;
        }

        let mut best: Option<(&str, f64)> = None;
        for (normalized, canonical) in &self.canonicals {
            let sim = normalized_damerau_levenshtein(&key, normalized);
            if sim >= FUZZY_SKILL_THRESHOLD && best.map_or(true, |(_, s)| sim > s) {
                best = Some((canonical.as_str(), sim));
            }
        }
        best.map(|(canonical, _)| canonical)
    }

    pub fn canonical_forms(&self) -> impl Iterator<Item = &str> {
        self.canonicals.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    fn insert<'a>(&mut self, canonical: &str, variants: impl Iterator<Item = &'a str>) {
        let canonical_key = normalize_skill(canonical);
        if canonical_key.is_empty() {
            warn!("Ignoring synonym entry with empty canonical form: {canonical:?}");
            return;
        }
        self.canonicals
            .insert(canonical_key.clone(), canonical.to_string());
        self.lookup.insert(canonical_key, canonical.to_string());

        for variant in variants {
            let key = normalize_skill(variant);
            if key.is_empty() {
                continue;
            }
            if let Some(previous) = self.lookup.insert(key, canonical.to_string()) {
                if previous != canonical {
                    warn!("Synonym {variant:?} remapped from {previous:?} to {canonical:?}");
                }
            }
        }
    }
}

/// Replaces a known typo/variant with its canonical form; otherwise returns
/// the trimmed input unchanged.
pub fn fix_typos(text: &str, table: &SynonymTable) -> String {
    match table.lookup(text) {
        Some(canonical) => canonical.to_string(),
        None => text.trim().to_string(),
    }
}

/// Full skill canonicalization: table lookup, skill normalization, then an
/// edit-distance fallback against the known canonical forms.
///
/// The result is a comparison key in [`normalize_skill`] form, so a canonical
/// written with punctuation loses it (`node.js` → `node js`). Use
/// [`fix_typos`] when the canonical form as written is wanted for display.
pub fn canonicalize_skill(text: &str, table: &SynonymTable) -> String {
    if let Some(canonical) = table.lookup(text) {
        return normalize_skill(canonical);
    }
    match table.closest_canonical(text) {
        Some(canonical) => normalize_skill(canonical),
        None => normalize_skill(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_typos_known_variants() {
        let table = SynonymTable::builtin();
        assert_eq!(fix_typos("javascrpit", &table), "javascript");
        assert_eq!(fix_typos("Excel Avancé", &table), "microsoft excel");
        assert_eq!(
            fix_typos("Bureau de la sécurité privée", &table),
            "bsp"
        );
    }

    #[test]
    fn test_fix_typos_canonical_maps_to_itself() {
        let table = SynonymTable::builtin();
        assert_eq!(fix_typos("JavaScript", &table), "javascript");
    }

    #[test]
    fn test_fix_typos_unknown_passthrough() {
        let table = SynonymTable::builtin();
        assert_eq!(fix_typos("  Soudure MIG ", &table), "Soudure MIG");
        assert_eq!(fix_typos("", &table), "");
    }

    #[test]
    fn test_canonicalize_skill_fuzzy_fallback() {
        let table = SynonymTable::builtin();
        // "typescirpt" is not in the table but is one transposition away
        assert_eq!(canonicalize_skill("Typescirpt", &table), "typescript");
    }

    #[test]
    fn test_canonicalize_skill_is_key_form_fix_typos_is_display_form() {
        let table = SynonymTable::builtin();
        assert_eq!(fix_typos("nodejs", &table), "node.js");
        assert_eq!(canonicalize_skill("nodejs", &table), "node js");
        assert_eq!(
            canonicalize_skill(&fix_typos("nodejs", &table), &table),
            canonicalize_skill("Node.js", &table)
        );
    }

    #[test]
    fn test_canonicalize_skill_short_labels_skip_fuzzy() {
        let table = SynonymTable::builtin();
        assert_eq!(canonicalize_skill("Go", &table), "go");
    }

    #[test]
    fn test_canonicalize_skill_unrelated_label_is_only_normalized() {
        let table = SynonymTable::builtin();
        assert_eq!(canonicalize_skill("Soudure   MIG", &table), "soudure mig");
    }

    #[test]
    fn test_json_table_extends_builtin() {
        let mut table = SynonymTable::builtin();
        let custom =
            SynonymTable::from_json_str(r#"{"kubernetes": ["k8s", "kubernets"]}"#).unwrap();
        table.extend(custom);

        assert_eq!(fix_typos("K8s", &table), "kubernetes");
        assert_eq!(fix_typos("javascrpit", &table), "javascript");
    }

    #[test]
    fn test_yaml_table_overrides_builtin() {
        let mut table = SynonymTable::builtin();
        let custom = SynonymTable::from_yaml_str("ecmascript:\n  - js\n").unwrap();
        table.extend(custom);
        assert_eq!(fix_typos("JS", &table), "ecmascript");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = SynonymTable::from_json_str(r#"{"a": "not-a-list"}"#).unwrap_err();
        assert_eq!(err.code(), "JSON_ERROR");
    }

    #[test]
    fn test_canonical_forms_listed() {
        let table = SynonymTable::builtin();
        assert!(table.canonical_forms().any(|c| c == "bsp"));
        assert!(!table.is_empty());
    }
}
