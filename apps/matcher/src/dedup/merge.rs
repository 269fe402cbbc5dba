//! Fill-missing, never-overwrite merge of a duplicate group into its survivor.
//!
//! # Rules
//! - A kept field that is absent, blank, or an unusable placeholder (an email
//!   without `@`, a phone like `000-0000`) takes the first usable value from
//!   the superseded records, scanned in survivor order.
//! - A populated kept field is never replaced. A disagreeing superseded value
//!   is reported as a `MergeConflict` and discarded.
//! - Notes are the exception: every distinct superseded note is appended with
//!   a `[merged from <id>]` provenance marker.

use serde_json::Value;

use crate::models::{ConflictSeverity, MergeConflict, Record};
use crate::normalize::{normalize_email, normalize_phone};

pub const PROVENANCE_PREFIX: &str = "[merged from";

/// Folds `superseded` into `kept`. `superseded` must already be in survivor order.
pub fn merge_group(
    mut kept: Record,
    superseded: &[Record],
    conflicts: &mut Vec<MergeConflict>,
) -> Record {
    for other in superseded {
        if is_blank(Some(&kept.display_name)) && !is_blank(Some(&other.display_name)) {
            kept.display_name = other.display_name.clone();
        }

        merge_text_field(
            &kept.id,
            "email",
            &mut kept.email,
            other,
            other.email.as_deref(),
            normalize_email,
            conflicts,
        );
        merge_text_field(
            &kept.id,
            "phone",
            &mut kept.phone,
            other,
            other.phone.as_deref(),
            normalize_phone,
            conflicts,
        );
        merge_text_field(
            &kept.id,
            "city",
            &mut kept.city,
            other,
            other.city.as_deref(),
            |v| Some(v.trim().to_lowercase()),
            conflicts,
        );

        if kept.created_at.is_none() {
            kept.created_at = other.created_at;
        }

        merge_extra(&mut kept, other, conflicts);
    }

    append_notes(&mut kept, superseded);
    kept
}

/// Fill-missing for a string field. `compare` maps a value to the form used to
/// decide whether two populated values actually disagree.
fn merge_text_field(
    kept_id: &str,
    field: &str,
    kept_value: &mut Option<String>,
    other: &Record,
    other_value: Option<&str>,
    compare: impl Fn(&str) -> Option<String>,
    conflicts: &mut Vec<MergeConflict>,
) {
    let Some(incoming) = other_value.filter(|v| !v.trim().is_empty()) else {
        return;
    };

    match kept_value.as_deref().filter(|v| !v.trim().is_empty()) {
        None => *kept_value = Some(incoming.to_string()),
        // a placeholder such as `000-0000` counts as missing
        Some(current) if compare(current).is_none() && compare(incoming).is_some() => {
            *kept_value = Some(incoming.to_string());
        }
        Some(current) => {
            if compare(current) != compare(incoming) {
                conflicts.push(MergeConflict {
                    kept_id: kept_id.to_string(),
                    superseded_id: other.id.clone(),
                    field: field.to_string(),
                    kept_value: current.to_string(),
                    discarded_value: incoming.to_string(),
                    severity: severity_for(field),
                });
            }
        }
    }
}

fn merge_extra(kept: &mut Record, other: &Record, conflicts: &mut Vec<MergeConflict>) {
    for (key, incoming) in &other.extra {
        if is_blank_value(incoming) {
            continue;
        }
        match kept.extra.get(key) {
            Some(current) if !is_blank_value(current) => {
                if current != incoming {
                    conflicts.push(MergeConflict {
                        kept_id: kept.id.clone(),
                        superseded_id: other.id.clone(),
                        field: key.clone(),
                        kept_value: display_value(current),
                        discarded_value: display_value(incoming),
                        severity: ConflictSeverity::Advisory,
                    });
                }
            }
            _ => {
                kept.extra.insert(key.clone(), incoming.clone());
            }
        }
    }
}

fn append_notes(kept: &mut Record, superseded: &[Record]) {
    for other in superseded {
        let Some(note) = other.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };

        let current = kept.notes.as_deref().unwrap_or("").trim_end();
        if has_note(current, note) {
            continue;
        }

        let marked = format!("{PROVENANCE_PREFIX} {}] {note}", other.id);
        kept.notes = Some(if current.is_empty() {
            marked
        } else {
            format!("{current}\n{marked}")
        });
    }
}

/// True when `note` is the whole of `current` or one of its lines, with or
/// without a provenance marker.
fn has_note(current: &str, note: &str) -> bool {
    if current.trim() == note {
        return true;
    }
    current.lines().map(strip_provenance).any(|line| line == note)
}

fn strip_provenance(line: &str) -> &str {
    let line = line.trim();
    if !line.starts_with(PROVENANCE_PREFIX) {
        return line;
    }
    match line.split_once("] ") {
        Some((_, rest)) => rest.trim(),
        None => line,
    }
}

fn severity_for(field: &str) -> ConflictSeverity {
    match field {
        "email" | "phone" => ConflictSeverity::Warning,
        _ => ConflictSeverity::Advisory,
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fill_missing_never_overwrite() {
        let kept = Record::new("1", "Jean Dupont").with_email("a@x.com");
        let other = Record::new("2", "jean dupont").with_phone("5145551234");
        let mut conflicts = Vec::new();

        let merged = merge_group(kept, &[other], &mut conflicts);
        assert_eq!(merged.email.as_deref(), Some("a@x.com"));
        assert_eq!(merged.phone.as_deref(), Some("5145551234"));
        assert_eq!(merged.display_name, "Jean Dupont");
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_blank_kept_field_counts_as_missing() {
        let kept = Record::new("1", "A B").with_city("   ");
        let other = Record::new("2", "A B").with_city("Montréal");
        let merged = merge_group(kept, &[other], &mut Vec::new());
        assert_eq!(merged.city.as_deref(), Some("Montréal"));
    }

    #[test]
    fn test_first_non_empty_wins() {
        let kept = Record::new("1", "A B");
        let second = Record::new("2", "A B").with_city("Laval");
        let third = Record::new("3", "A B").with_city("Québec");
        let mut conflicts = Vec::new();

        let merged = merge_group(kept, &[second, third], &mut conflicts);
        assert_eq!(merged.city.as_deref(), Some("Laval"));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field, "city");
        assert_eq!(conflicts[0].superseded_id, "3");
        assert_eq!(conflicts[0].severity, ConflictSeverity::Advisory);
    }

    #[test]
    fn test_conflicting_email_is_reported_not_applied() {
        let kept = Record::new("1", "A B").with_email("a@x.com");
        let other = Record::new("2", "A B").with_email("other@x.com");
        let mut conflicts = Vec::new();

        let merged = merge_group(kept, &[other], &mut conflicts);
        assert_eq!(merged.email.as_deref(), Some("a@x.com"));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Warning);
        assert_eq!(conflicts[0].discarded_value, "other@x.com");
    }

    #[test]
    fn test_equivalent_values_are_not_conflicts() {
        let kept = Record::new("1", "A B")
            .with_email("A@X.com ")
            .with_phone("(514) 555-1234");
        let other = Record::new("2", "A B")
            .with_email("a@x.com")
            .with_phone("514-555-1234");
        let mut conflicts = Vec::new();

        merge_group(kept, &[other], &mut conflicts);
        assert!(conflicts.is_empty(), "{conflicts:?}");
    }

    #[test]
    fn test_notes_are_appended_with_provenance() {
        let kept = Record::new("1", "A B").with_notes("Prefers night shifts");
        let other = Record::new("2", "A B").with_notes("Has forklift licence");

        let merged = merge_group(kept, &[other], &mut Vec::new());
        let notes = merged.notes.unwrap();
        assert!(notes.contains("Prefers night shifts"));
        assert!(notes.contains("Has forklift licence"));
        assert!(notes.contains("[merged from 2]"));
    }

    #[test]
    fn test_duplicate_note_text_not_repeated() {
        let kept = Record::new("1", "A B").with_notes("Called twice");
        let other = Record::new("2", "A B").with_notes("  Called twice ");

        let merged = merge_group(kept, &[other], &mut Vec::new());
        assert_eq!(merged.notes.as_deref(), Some("Called twice"));
    }

    #[test]
    fn test_note_inside_longer_note_is_still_appended() {
        let kept = Record::new("1", "A B").with_notes("Not available before March");
        let other = Record::new("2", "A B").with_notes("March");

        let merged = merge_group(kept, &[other], &mut Vec::new());
        assert_eq!(
            merged.notes.as_deref(),
            Some("Not available before March\n[merged from 2] March")
        );
    }

    #[test]
    fn test_note_already_merged_from_elsewhere_is_skipped() {
        let kept = Record::new("1", "A B").with_notes("Prefers days\n[merged from 7] Bilingual");
        let other = Record::new("2", "A B").with_notes("Bilingual");

        let merged = merge_group(kept, &[other], &mut Vec::new());
        assert_eq!(
            merged.notes.as_deref(),
            Some("Prefers days\n[merged from 7] Bilingual")
        );
    }

    #[test]
    fn test_placeholder_phone_is_filled_not_kept() {
        let kept = Record::new("1", "Jean Dupont")
            .with_email("jd@test.com")
            .with_phone("000-0000");
        let other = Record::new("2", "jean dupont").with_phone("(514) 555-1234");
        let mut conflicts = Vec::new();

        let merged = merge_group(kept, &[other], &mut conflicts);
        assert_eq!(merged.phone.as_deref(), Some("(514) 555-1234"));
        assert_eq!(merged.usable_phone().as_deref(), Some("5145551234"));
        assert!(conflicts.is_empty(), "{conflicts:?}");
    }

    #[test]
    fn test_placeholder_does_not_replace_placeholder_or_conflict() {
        let kept = Record::new("1", "A B").with_email("n/a");
        let other = Record::new("2", "A B").with_email("none");
        let mut conflicts = Vec::new();

        let merged = merge_group(kept, &[other], &mut conflicts);
        assert_eq!(merged.email.as_deref(), Some("n/a"));
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_note_on_empty_kept_still_marked() {
        let kept = Record::new("1", "A B");
        let other = Record::new("2", "A B").with_notes("Bilingual");

        let merged = merge_group(kept, &[other], &mut Vec::new());
        assert_eq!(merged.notes.as_deref(), Some("[merged from 2] Bilingual"));
    }

    #[test]
    fn test_extra_fields_fill_missing() {
        let kept = Record::new("1", "A B")
            .with_field("title", json!("Welder"))
            .with_field("linkedin", json!(""));
        let other = Record::new("2", "A B")
            .with_field("title", json!("Machinist"))
            .with_field("linkedin", json!("https://linkedin.com/in/ab"))
            .with_field("skills", json!(["soudure"]));
        let mut conflicts = Vec::new();

        let merged = merge_group(kept, &[other], &mut conflicts);
        assert_eq!(merged.extra["title"], json!("Welder"));
        assert_eq!(merged.extra["linkedin"], json!("https://linkedin.com/in/ab"));
        assert_eq!(merged.extra["skills"], json!(["soudure"]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field, "title");
    }

    #[test]
    fn test_created_at_filled_when_missing() {
        let ts = chrono::Utc::now();
        let kept = Record::new("1", "A B");
        let other = Record::new("2", "A B").with_created_at(ts);
        let merged = merge_group(kept, &[other], &mut Vec::new());
        assert_eq!(merged.created_at, Some(ts));
    }
}
