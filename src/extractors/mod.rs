// src/extractors/mod.rs
pub mod engine;
pub mod fields;
pub mod name;
pub mod page;

// Re-export key extraction types for convenience
pub use engine::{EntityRecord, ExtractionEngine};

use regex::Regex;

/// Every field pattern with the highlight class it gets in a debug dump.
pub fn debug_patterns() -> Vec<(&'static Regex, &'static str)> {
    let mut patterns: Vec<(&'static Regex, &'static str)> = vec![(&*page::AFFILIATION_RE, "marker")];
    let groups: [(&'static [Regex], &'static str); 10] = [
        (fields::EMAIL_PRINCIPAL_RE.as_slice(), "email"),
        (fields::EMAIL_OFFICIEL_RE.as_slice(), "email"),
        (fields::EMAIL_AUTRE_RE.as_slice(), "email"),
        (fields::PHONE_TRAVAIL_RE.as_slice(), "phone"),
        (fields::PHONE_DOMICILE_RE.as_slice(), "phone"),
        (fields::PHONE_MOBILE_RE.as_slice(), "phone"),
        (fields::PHONE_AUTRE_RE.as_slice(), "phone"),
        (fields::PHONE_GENERIC_RE.as_slice(), "phone"),
        (fields::ADDRESS_MARKUP_RE.as_slice(), "address"),
        (name::MARKER_NAME_RE.as_slice(), "name"),
    ];
    for (group, class) in groups {
        patterns.extend(group.iter().map(|re| (re, class)));
    }
    patterns
}
