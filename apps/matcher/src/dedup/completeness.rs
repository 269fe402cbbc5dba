use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Record;

const EMAIL_WEIGHT: u8 = 2;
const PHONE_WEIGHT: u8 = 1;

/// `(has usable email ? 2 : 0) + (has usable phone ? 1 : 0)`. Derived, never stored.
pub fn completeness_score(record: &Record) -> u8 {
    let email = if record.usable_email().is_some() {
        EMAIL_WEIGHT
    } else {
        0
    };
    let phone = if record.usable_phone().is_some() {
        PHONE_WEIGHT
    } else {
        0
    };
    email + phone
}

/// Survivor ordering shared by the reducer and the resolver tie-break:
/// higher completeness first, then oldest `created_at` (missing timestamps last).
///
/// Since email outweighs phone, this is the same as "prefer email, then phone,
/// then earliest".
pub fn survivor_order(a: &Record, b: &Record) -> Ordering {
    completeness_score(b)
        .cmp(&completeness_score(a))
        .then_with(|| created_order(a.created_at, b.created_at))
}

fn created_order(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Contact-field coverage over a batch, reported before and after a reduction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCoverage {
    pub total: usize,
    pub with_email: usize,
    pub with_phone: usize,
    pub with_city: usize,
    /// Records whose name normalizes to nothing and can never be grouped.
    pub unknown_names: usize,
    /// Mean completeness score, 0.0 – 3.0.
    pub mean_completeness: f64,
}

pub fn compute_contact_coverage(records: &[Record]) -> ContactCoverage {
    let total = records.len();
    if total == 0 {
        return ContactCoverage::default();
    }

    let with_email = records.iter().filter(|r| r.usable_email().is_some()).count();
    let with_phone = records.iter().filter(|r| r.usable_phone().is_some()).count();
    let with_city = records
        .iter()
        .filter(|r| r.city.as_deref().is_some_and(|c| !c.trim().is_empty()))
        .count();
    let unknown_names = records.iter().filter(|r| r.name_key().is_empty()).count();
    let score_sum: u32 = records.iter().map(|r| completeness_score(r) as u32).sum();

    ContactCoverage {
        total,
        with_email,
        with_phone,
        with_city,
        unknown_names,
        mean_completeness: score_sum as f64 / total as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_completeness_weights() {
        let bare = Record::new("1", "A");
        let email = Record::new("2", "A").with_email("a@x.com");
        let phone = Record::new("3", "A").with_phone("5145551234");
        let both = Record::new("4", "A")
            .with_email("a@x.com")
            .with_phone("5145551234");

        assert_eq!(completeness_score(&bare), 0);
        assert_eq!(completeness_score(&email), 2);
        assert_eq!(completeness_score(&phone), 1);
        assert_eq!(completeness_score(&both), 3);
    }

    #[test]
    fn test_placeholder_contacts_do_not_count() {
        let rec = Record::new("1", "A").with_email("n/a").with_phone("000-0000");
        assert_eq!(completeness_score(&rec), 0);
    }

    #[test]
    fn test_survivor_order_prefers_email_over_phone() {
        let email = Record::new("e", "A").with_email("a@x.com").with_created_at(at(2022));
        let phone = Record::new("p", "A").with_phone("5145551234").with_created_at(at(2010));
        assert_eq!(survivor_order(&email, &phone), Ordering::Less);
    }

    #[test]
    fn test_survivor_order_oldest_wins_ties() {
        let old = Record::new("old", "A").with_email("a@x.com").with_created_at(at(2015));
        let new = Record::new("new", "A").with_email("b@x.com").with_created_at(at(2020));
        let undated = Record::new("undated", "A").with_email("c@x.com");

        assert_eq!(survivor_order(&old, &new), Ordering::Less);
        assert_eq!(survivor_order(&undated, &new), Ordering::Greater);
    }

    #[test]
    fn test_contact_coverage() {
        let records = vec![
            Record::new("1", "Jean Dupont").with_email("jd@test.com"),
            Record::new("2", "!!!").with_phone("5145551234").with_city("Laval"),
        ];
        let cov = compute_contact_coverage(&records);
        assert_eq!(cov.total, 2);
        assert_eq!(cov.with_email, 1);
        assert_eq!(cov.with_phone, 1);
        assert_eq!(cov.with_city, 1);
        assert_eq!(cov.unknown_names, 1);
        assert!((cov.mean_completeness - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contact_coverage_empty_batch() {
        assert_eq!(compute_contact_coverage(&[]), ContactCoverage::default());
    }
}
