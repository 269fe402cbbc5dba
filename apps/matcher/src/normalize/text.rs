//! Canonical forms for free-text identity fields.
//!
//! Every function here is total: malformed text folds to an empty string or
//! `None`, never to an error. An empty key means "unknown" and must never be
//! treated as equal to another empty key.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Minimum digit count for a phone number to be usable for matching.
pub const MIN_PHONE_DIGITS: usize = 5;

/// Compact normalized key: lowercase, accent-stripped, `[a-z0-9]` only.
///
/// `"Jean-Marie Nbonda"` → `"jeanmarienbonda"`, `"École"` → `"ecole"`.
pub fn normalize(text: &str) -> String {
    fold(text)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Word form used for token comparison: same folding as [`normalize`], but
/// every run of non-`[a-z0-9]` characters becomes a single space.
///
/// `"Dupont,  Jean-Marie"` → `"dupont jean marie"`.
pub fn normalize_words(text: &str) -> String {
    collapse(fold(text).map(|c| {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            ' '
        }
    }))
}

/// Skill-label variant: letters and single spaces only.
///
/// Separator punctuation (`-`, `_`, `/`, `.`) and whitespace split words;
/// digits and any other symbol are dropped.
pub fn normalize_skill(text: &str) -> String {
    collapse(fold(text).filter_map(|c| match c {
        'a'..='z' => Some(c),
        '-' | '_' | '/' | '.' => Some(' '),
        c if c.is_whitespace() => Some(' '),
        _ => None,
    }))
}

/// Digits only. `None` when fewer than [`MIN_PHONE_DIGITS`] digits remain or
/// when all digits are identical (`000-0000` style placeholders).
pub fn normalize_phone(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    let first = digits.as_bytes()[0];
    if digits.bytes().all(|b| b == first) {
        return None;
    }
    Some(digits)
}

/// Trimmed, lowercased email. `None` for blanks and placeholders without `@`.
pub fn normalize_email(text: &str) -> Option<String> {
    let email = text.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(email)
}

/// Lowercase + canonical decomposition with combining marks removed, plus a
/// few Latin letters that have no decomposition.
fn fold(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfd()
        .flat_map(char::to_lowercase)
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| {
            let mapped: &'static str = match c {
                'ß' => "ss",
                'æ' => "ae",
                'œ' => "oe",
                'ø' => "o",
                'đ' => "d",
                'ł' => "l",
                'ı' => "i",
                _ => "",
            };
            if mapped.is_empty() {
                Folded::One(Some(c))
            } else {
                Folded::Many(mapped.chars())
            }
        })
}

enum Folded {
    One(Option<char>),
    Many(std::str::Chars<'static>),
}

impl Iterator for Folded {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            Folded::One(c) => c.take(),
            Folded::Many(chars) => chars.next(),
        }
    }
}

/// Collapses runs of spaces into one and trims both ends.
fn collapse(chars: impl Iterator<Item = char>) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    for c in chars {
        if c == ' ' {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_accents_and_case() {
        assert_eq!(normalize("École"), "ecole");
        assert_eq!(normalize("ecole"), "ecole");
        assert_eq!(normalize("ÉCOLE"), "ecole");
        assert_eq!(normalize("François Çelik"), "francoiscelik");
    }

    #[test]
    fn test_normalize_drops_punctuation_and_spaces() {
        assert_eq!(normalize("Jean-Marie  Nbonda"), "jeanmarienbonda");
        assert_eq!(normalize("O'Brien, Seán"), "obriensean");
    }

    #[test]
    fn test_normalize_transliterates_undecomposable_letters() {
        assert_eq!(normalize("Straße"), "strasse");
        assert_eq!(normalize("Søren Łukasz"), "sorenlukasz");
    }

    #[test]
    fn test_normalize_all_punctuation_is_empty() {
        assert_eq!(normalize("--- ... !!!"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_words_keeps_token_boundaries() {
        assert_eq!(normalize_words("Dupont,  Jean-Marie"), "dupont jean marie");
        assert_eq!(normalize_words("  Émile   Zola  "), "emile zola");
        assert_eq!(normalize_words("!!!"), "");
    }

    #[test]
    fn test_normalize_skill_letters_and_spaces_only() {
        assert_eq!(normalize_skill("Excel   Avancé"), "excel avance");
        assert_eq!(normalize_skill("Node.js"), "node js");
        assert_eq!(normalize_skill("HTML5 / CSS3"), "html css");
        assert_eq!(normalize_skill("C++"), "c");
    }

    #[test]
    fn test_normalize_phone_usability_floor() {
        assert_eq!(normalize_phone("12"), None);
        assert_eq!(normalize_phone("(514) 555-1234").as_deref(), Some("5145551234"));
        assert_eq!(normalize_phone("+1 514.555.1234").as_deref(), Some("15145551234"));
    }

    #[test]
    fn test_normalize_phone_rejects_placeholders() {
        assert_eq!(normalize_phone("000-0000"), None);
        assert_eq!(normalize_phone("n/a"), None);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  JD@Test.COM ").as_deref(), Some("jd@test.com"));
        assert_eq!(normalize_email("   "), None);
        assert_eq!(normalize_email("n/a"), None);
    }

    proptest! {
        #[test]
        fn test_normalize_is_idempotent(s in "\\PC{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn test_normalize_words_is_idempotent(s in "\\PC{0,40}") {
            let once = normalize_words(&s);
            prop_assert_eq!(normalize_words(&once), once);
        }

        #[test]
        fn test_normalize_skill_is_idempotent(s in "\\PC{0,40}") {
            let once = normalize_skill(&s);
            prop_assert_eq!(normalize_skill(&once), once);
        }
    }
}
