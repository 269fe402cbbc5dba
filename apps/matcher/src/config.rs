use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::matching::{DEFAULT_AMBIGUITY_EPSILON, LINK_THRESHOLD, REVIEW_THRESHOLD};

/// Engine tunables injected into `Matcher`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Fuzzy linking threshold, 0 – 100.
    pub match_threshold: f64,
    /// "Possible match, needs a human" threshold, 0 – 100.
    pub review_threshold: f64,
    /// Runner-up window for flagging ambiguous matches.
    pub ambiguity_epsilon: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_threshold: LINK_THRESHOLD,
            review_threshold: REVIEW_THRESHOLD,
            ambiguity_epsilon: DEFAULT_AMBIGUITY_EPSILON,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    #[default]
    Exact,
    Fuzzy,
}

impl FromStr for MergeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MergeMode::Exact),
            "fuzzy" => Ok(MergeMode::Fuzzy),
            other => bail!("MERGE_MODE must be 'exact' or 'fuzzy', got '{other}'"),
        }
    }
}

/// Batch job configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_path: PathBuf,
    /// `None` writes the report to stdout.
    pub output_path: Option<PathBuf>,
    pub synonyms_path: Option<PathBuf>,
    pub merge_mode: MergeMode,
    pub matching: MatchConfig,
    pub rust_log: String,
}

impl JobConfig {
    /// `cli_input` (first positional argument) takes precedence over `INPUT_PATH`.
    pub fn from_env(cli_input: Option<PathBuf>) -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(cli_input, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        cli_input: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let input_path = match cli_input {
            Some(path) => path,
            None => require(&lookup, "INPUT_PATH")?.into(),
        };

        let defaults = MatchConfig::default();
        let matching = MatchConfig {
            match_threshold: parse_threshold(&lookup, "MATCH_THRESHOLD", defaults.match_threshold)?,
            review_threshold: parse_threshold(
                &lookup,
                "REVIEW_THRESHOLD",
                defaults.review_threshold,
            )?,
            ambiguity_epsilon: parse_epsilon(&lookup, defaults.ambiguity_epsilon)?,
        };

        Ok(JobConfig {
            input_path,
            output_path: optional(&lookup, "OUTPUT_PATH").map(PathBuf::from),
            synonyms_path: optional(&lookup, "SYNONYMS_PATH").map(PathBuf::from),
            merge_mode: optional(&lookup, "MERGE_MODE")
                .map(|v| v.parse::<MergeMode>())
                .transpose()?
                .unwrap_or_default(),
            matching,
            rust_log: optional(&lookup, "RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    optional(lookup, key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_threshold(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
) -> Result<f64> {
    let Some(raw) = optional(lookup, key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{key} must be a number"))?;
    if !(0.0..=100.0).contains(&value) {
        bail!("{key} must be within 0..=100, got {value}");
    }
    Ok(value)
}

fn parse_epsilon(lookup: &impl Fn(&str) -> Option<String>, default: f64) -> Result<f64> {
    let Some(raw) = optional(lookup, "AMBIGUITY_EPSILON") else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<f64>()
        .context("AMBIGUITY_EPSILON must be a number")?;
    if !value.is_finite() || value < 0.0 {
        bail!("AMBIGUITY_EPSILON must be a finite, non-negative number, got {value}");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = JobConfig::from_lookup(None, lookup_from(&[("INPUT_PATH", "in.json")])).unwrap();
        assert_eq!(cfg.input_path, PathBuf::from("in.json"));
        assert_eq!(cfg.output_path, None);
        assert_eq!(cfg.merge_mode, MergeMode::Exact);
        assert_eq!(cfg.matching, MatchConfig::default());
        assert_eq!(cfg.rust_log, "info");
    }

    #[test]
    fn test_cli_argument_wins_over_env() {
        let cfg = JobConfig::from_lookup(
            Some(PathBuf::from("cli.json")),
            lookup_from(&[("INPUT_PATH", "env.json")]),
        )
        .unwrap();
        assert_eq!(cfg.input_path, PathBuf::from("cli.json"));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let err = JobConfig::from_lookup(None, lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("INPUT_PATH"));
    }

    #[test]
    fn test_overrides() {
        let cfg = JobConfig::from_lookup(
            None,
            lookup_from(&[
                ("INPUT_PATH", "in.json"),
                ("OUTPUT_PATH", "out.json"),
                ("SYNONYMS_PATH", "syn.yaml"),
                ("MERGE_MODE", "Fuzzy"),
                ("MATCH_THRESHOLD", "80"),
                ("REVIEW_THRESHOLD", "55.5"),
                ("AMBIGUITY_EPSILON", "5"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.merge_mode, MergeMode::Fuzzy);
        assert_eq!(cfg.matching.match_threshold, 80.0);
        assert_eq!(cfg.matching.review_threshold, 55.5);
        assert_eq!(cfg.matching.ambiguity_epsilon, 5.0);
        assert_eq!(cfg.synonyms_path, Some(PathBuf::from("syn.yaml")));
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let err = JobConfig::from_lookup(
            None,
            lookup_from(&[("INPUT_PATH", "in.json"), ("MATCH_THRESHOLD", "140")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("MATCH_THRESHOLD"));

        let err = JobConfig::from_lookup(
            None,
            lookup_from(&[("INPUT_PATH", "in.json"), ("MATCH_THRESHOLD", "high")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn test_bad_ambiguity_epsilon_rejected() {
        for bad in ["-1", "NaN", "inf"] {
            let err = JobConfig::from_lookup(
                None,
                lookup_from(&[("INPUT_PATH", "in.json"), ("AMBIGUITY_EPSILON", bad)]),
            )
            .unwrap_err();
            assert!(err.to_string().contains("AMBIGUITY_EPSILON"), "{err}");
        }

        let cfg = JobConfig::from_lookup(
            None,
            lookup_from(&[("INPUT_PATH", "in.json"), ("AMBIGUITY_EPSILON", "0")]),
        )
        .unwrap();
        assert_eq!(cfg.matching.ambiguity_epsilon, 0.0);
    }

    #[test]
    fn test_unknown_merge_mode_rejected() {
        let err = "cluster".parse::<MergeMode>().unwrap_err();
        assert!(err.to_string().contains("exact"));
    }

    #[test]
    fn test_match_config_partial_yaml() {
        let cfg: MatchConfig = serde_yaml::from_str("match_threshold: 85\n").unwrap();
        assert_eq!(cfg.match_threshold, 85.0);
        assert_eq!(cfg.review_threshold, REVIEW_THRESHOLD);
    }
}
