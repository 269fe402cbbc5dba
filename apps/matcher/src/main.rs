use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use talent_matcher::config::JobConfig;
use talent_matcher::dedup::{compute_contact_coverage, ContactCoverage};
use talent_matcher::{parse_records, Matcher, MergeConflict, MergeMode, Record, SynonymTable};

/// Everything the caller needs to persist a reduction: the survivors, the
/// superseded → kept re-pointing map, and the advisory conflicts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobReport {
    backend: &'static str,
    mode: MergeMode,
    input_count: usize,
    merged: Vec<Record>,
    superseded_ids: BTreeMap<String, Vec<String>>,
    conflicts: Vec<MergeConflict>,
    coverage_before: ContactCoverage,
    coverage_after: ContactCoverage,
}

fn main() -> Result<()> {
    let cli_input = std::env::args_os().nth(1).map(PathBuf::from);
    let config = JobConfig::from_env(cli_input)?;

    // Logs go to stderr; stdout may carry the report
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting talent-matcher v{}", env!("CARGO_PKG_VERSION"));

    let synonyms = load_synonyms(&config)?;
    let matcher = Matcher::new(config.matching.clone(), synonyms);

    let raw = fs::read_to_string(&config.input_path)
        .with_context(|| format!("Failed to read {}", config.input_path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", config.input_path.display()))?;
    let mut records = parse_records(value)
        .with_context(|| format!("Invalid records in {}", config.input_path.display()))?;
    info!(
        "Loaded {} records from {}",
        records.len(),
        config.input_path.display()
    );

    let relabelled: usize = records
        .iter_mut()
        .map(|r| matcher.canonicalize_record_skills(r))
        .sum();
    if relabelled > 0 {
        info!("Canonicalized {relabelled} skill labels");
    }

    let input_count = records.len();
    let coverage_before = compute_contact_coverage(&records);
    let outcome = matcher.reduce_with_mode(records, config.merge_mode)?;
    let coverage_after = compute_contact_coverage(&outcome.merged);

    if !outcome.conflicts.is_empty() {
        warn!(
            "{} merge conflicts kept the survivor's value; see report",
            outcome.conflicts.len()
        );
    }

    let report = JobReport {
        backend: matcher.backend(),
        mode: config.merge_mode,
        input_count,
        merged: outcome.merged,
        superseded_ids: outcome.superseded_ids,
        conflicts: outcome.conflicts,
        coverage_before,
        coverage_after,
    };

    write_report(&report, config.output_path.as_ref())?;
    Ok(())
}

/// Built-in table, with the operator's file merged over it when configured.
fn load_synonyms(config: &JobConfig) -> Result<SynonymTable> {
    let mut table = SynonymTable::builtin();
    if let Some(path) = &config.synonyms_path {
        let custom = SynonymTable::from_path(path)
            .with_context(|| format!("Failed to load synonym table {}", path.display()))?;
        info!("Synonym table: {} custom entries from {}", custom.len(), path.display());
        table.extend(custom);
    }
    Ok(table)
}

fn write_report(report: &JobReport, output_path: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    match output_path {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write report to stdout")?;
        }
    }
    Ok(())
}
