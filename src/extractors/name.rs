// src/extractors/name.rs

// --- Imports ---
use crate::extractors::page::{collapse_whitespace, element_text, ClubPage, AFFILIATION_LABEL_RE};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Selector};

// --- Constants ---
/// Longest rendered-text gap between a heading and the affiliation marker it names.
const NEAREST_HEADING_MAX_DISTANCE: usize = 300;

// Exclusion lists. Each strategy sees a different slice of the page, so each
// carries the navigation labels that showed up as false positives there.
const MAIN_HEADING_EXCLUSIONS: &[&str] = &["accueil", "gironde", "paris", "ensemble", "écrivons"];

const MARKER_TEXT_EXCLUSIONS: &[&str] = &[
    "accueil", "gironde", "paris", "ensemble", "écrivons", "résultats", "calendrier",
];

const SECONDARY_HEADING_EXCLUSIONS: &[&str] = &[
    "accueil", "ligue", "gironde", "paris", "ensemble", "écrivons", "résultats", "calendrier",
    "équipes", "staff", "terrains", "siège social",
];

const HEADING_SCAN_EXCLUSIONS: &[&str] = &[
    "accueil", "ligue", "gironde", "paris", "ensemble", "écrivons", "n°affiliation", "résultats",
    "calendrier", "équipes", "staff", "terrains", "siège social", "installations", "rencontres",
    "prochaines", "dernières",
];

const TITLE_EXCLUSIONS: &[&str] = &["recherche", "district"];

// --- CSS Selectors (Lazy Static) ---
// Main content region first, then any h1 on the page
static MAIN_HEADING_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["app-club h1, .club-title h1, main h1", "h1"]
        .iter()
        .map(|sel| Selector::parse(sel).expect("Failed to compile MAIN_HEADING_SELECTORS"))
        .collect()
});

static SECONDARY_HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h2").expect("Failed to compile SECONDARY_HEADING_SELECTOR")
});

static NAME_CLASS_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[class*='club-name'], [class*='name-club']")
        .expect("Failed to compile NAME_CLASS_SELECTOR")
});

// --- Regex Patterns for Raw Markup (Lazy Static) ---
pub(crate) static MARKER_NAME_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // <h1>CLUB DISTRICT GERS</h1><h2>N°affiliation: 6504</h2>
        r"(?is)<h1[^>]*>([A-Z][A-Z\s.\-']{5,80}?)</h1>\s*<h2[^>]*>N[°\s]*affiliation",
        // <h2>US MONTAGNAC</h2> N°affiliation: 512
        r"(?is)<h2[^>]*>([A-Z][A-Z\s.\-']{5,80}?)</h2>\s*N[°\s]*affiliation[:\s]*\d+",
        // Bare capitalised run right before the marker
        r"(?is)([A-Z][A-Z\s.\-']{5,80}?)\s*N[°\s]*affiliation[:\s]*\d+",
    ]
    .iter()
    .map(|pat| Regex::new(pat).expect("Failed to compile MARKER_NAME_RE"))
    .collect()
});

static TITLE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[|\-]").expect("Failed to compile TITLE_SEPARATOR_RE")
});

/// A name strategy looks at one aspect of the page and proposes at most one
/// accepted candidate.
pub type NameStrategy = fn(&ClubPage<'_>) -> Option<String>;

/// Strategies in priority order; the first accepted candidate wins.
pub const NAME_STRATEGIES: &[(&str, NameStrategy)] = &[
    ("main_heading", from_main_heading),
    ("marker_text", from_marker_text),
    ("nearest_heading", from_nearest_secondary_heading),
    ("heading_scan", from_secondary_headings),
    ("name_class", from_name_classes),
    ("page_title", from_page_title),
];

/// Derives the club name, or `None` when no strategy yields an acceptable one.
pub fn extract_name(page: &ClubPage<'_>) -> Option<String> {
    NAME_STRATEGIES.iter().find_map(|(label, strategy)| {
        let name = strategy(page)?;
        tracing::trace!("Name '{}' accepted by strategy {}", name, label);
        Some(name)
    })
}

// --- Record Validator ---

/// Length, letter and word-count checks that every name must pass.
pub fn is_plausible(candidate: &str) -> bool {
    let len = candidate.chars().count();
    (6..100).contains(&len)
        && candidate.chars().any(char::is_alphabetic)
        && (candidate.split_whitespace().count() > 1 || len > 8)
}

/// Navigation/boilerplate filter.
///
/// "club ligue" always passes even though "ligue" alone is a navigation label.
/// "district de" is rejected unless the heading is a club literally named
/// "CLUB DISTRICT ...".
pub fn is_excluded(candidate: &str, excluded_words: &[&str]) -> bool {
    let lower = candidate.to_lowercase();
    if lower.contains("club ligue") {
        return false;
    }
    if lower.contains("district de") && !lower.contains("club district") {
        return true;
    }
    excluded_words.iter().any(|word| lower.contains(word))
}

/// Normalises a raw candidate and returns it only if it is acceptable.
pub fn accept_candidate(raw: &str, excluded_words: &[&str]) -> Option<String> {
    let candidate = collapse_whitespace(raw);
    if is_plausible(&candidate) && !is_excluded(&candidate, excluded_words) {
        Some(candidate)
    } else {
        None
    }
}

// --- Strategies ---

fn from_main_heading(page: &ClubPage<'_>) -> Option<String> {
    let document = page.document();
    MAIN_HEADING_SELECTORS
        .iter()
        .flat_map(|selector| document.select(selector))
        .find_map(|heading| accept_candidate(&element_text(heading), MAIN_HEADING_EXCLUSIONS))
}

fn from_marker_text(page: &ClubPage<'_>) -> Option<String> {
    MARKER_NAME_RE.iter().find_map(|re| {
        let raw = re.captures(page.markup())?.get(1)?.as_str();
        accept_candidate(raw, MARKER_TEXT_EXCLUSIONS)
    })
}

/// Picks the `h2` that ends closest before the rendered affiliation marker.
///
/// Distance is measured in rendered text characters in document order. Only
/// the closest heading is considered; if it is rejected the strategy fails.
fn from_nearest_secondary_heading(page: &ClubPage<'_>) -> Option<String> {
    let document = page.document();
    let mut offset = 0usize;
    let mut marker_at = None;
    let mut headings: Vec<(usize, usize, ElementRef)> = Vec::new();

    for node in document.root_element().descendants() {
        if let Some(element) = ElementRef::wrap(node) {
            if element.value().name() == "h2" {
                let len: usize = element.text().map(|t| t.chars().count()).sum();
                headings.push((offset, offset + len, element));
            }
        } else if let Node::Text(text) = node.value() {
            if marker_at.is_none() && AFFILIATION_LABEL_RE.is_match(&text.text) {
                marker_at = Some(offset);
            }
            offset += text.text.chars().count();
        }
    }

    let marker_at = marker_at?;
    let (_, _, closest) = headings
        .into_iter()
        .filter(|(start, end, _)| *end <= marker_at && marker_at - start < NEAREST_HEADING_MAX_DISTANCE)
        .min_by_key(|(start, _, _)| marker_at - start)?;

    accept_candidate(&element_text(closest), SECONDARY_HEADING_EXCLUSIONS)
}

fn from_secondary_headings(page: &ClubPage<'_>) -> Option<String> {
    page.document()
        .select(&SECONDARY_HEADING_SELECTOR)
        .find_map(|heading| accept_candidate(&element_text(heading), HEADING_SCAN_EXCLUSIONS))
}

fn from_name_classes(page: &ClubPage<'_>) -> Option<String> {
    page.document()
        .select(&NAME_CLASS_SELECTOR)
        .find_map(|element| accept_candidate(&element_text(element), SECONDARY_HEADING_EXCLUSIONS))
}

fn from_page_title(page: &ClubPage<'_>) -> Option<String> {
    let title = page.title()?;
    let candidate = TITLE_SEPARATOR_RE.split(&title).next()?.trim().to_string();
    let lower = candidate.to_lowercase();
    if !is_plausible(&candidate) || TITLE_EXCLUSIONS.iter().any(|word| lower.contains(word)) {
        return None;
    }
    Some(candidate)
}
