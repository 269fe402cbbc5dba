// Record Normalizer
// Canonical, comparable forms for names, emails, phones and skill labels.

pub mod synonyms;
pub mod text;

pub use synonyms::{canonicalize_skill, fix_typos, SynonymFile, SynonymTable};
pub use text::{normalize, normalize_email, normalize_phone, normalize_skill, normalize_words};
