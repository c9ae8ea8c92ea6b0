// src/extractors/fields.rs

// --- Imports ---
use crate::extractors::page::{collapse_whitespace, element_text, ClubPage};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

// --- Constants ---
const MIN_PHONE_DIGITS: usize = 6;
const MIN_ADDRESS_LEN: usize = 10;
/// Labelled spans inspected in the address container before giving up on it.
const MAX_ADDRESS_SPANS: usize = 10;

const EMAIL_ADDRESS: &str = r"[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
const LOOSE_EMAIL_ADDRESS: &str = r"[^\s<>]+@[^\s<>]+";
const PHONE_NUMBER: &str = r"[0-9\s.\-()]{6,}";

// --- Regex Patterns (Lazy Static) ---
/// Plain label, emphasised label, loose label.
fn email_patterns(label: &str) -> Vec<Regex> {
    [
        format!(r"(?is){label}[:\s]*({EMAIL_ADDRESS})"),
        format!(r"(?is)<b>{label}</b>\s*:\s*({EMAIL_ADDRESS})"),
        format!(r"(?is){label}[:\s]*({LOOSE_EMAIL_ADDRESS})"),
    ]
    .iter()
    .map(|pat| Regex::new(pat).expect("Failed to compile email pattern"))
    .collect()
}

fn phone_patterns(label: &str) -> Vec<Regex> {
    [
        format!(r"(?is){label}\s*:\s*({PHONE_NUMBER})"),
        format!(r"(?is)<b>{label}</b>\s*:\s*({PHONE_NUMBER})"),
        format!(r"(?is){label}[:\s]+({PHONE_NUMBER})"),
    ]
    .iter()
    .map(|pat| Regex::new(pat).expect("Failed to compile phone pattern"))
    .collect()
}

pub(crate) static EMAIL_PRINCIPAL_RE: Lazy<Vec<Regex>> = Lazy::new(|| email_patterns("Email principal"));
pub(crate) static EMAIL_OFFICIEL_RE: Lazy<Vec<Regex>> = Lazy::new(|| email_patterns("Email officiel"));
pub(crate) static EMAIL_AUTRE_RE: Lazy<Vec<Regex>> = Lazy::new(|| email_patterns("Email autre"));

pub(crate) static PHONE_TRAVAIL_RE: Lazy<Vec<Regex>> = Lazy::new(|| phone_patterns("Téléphone travail"));
pub(crate) static PHONE_DOMICILE_RE: Lazy<Vec<Regex>> = Lazy::new(|| phone_patterns("Téléphone domicile"));
pub(crate) static PHONE_MOBILE_RE: Lazy<Vec<Regex>> = Lazy::new(|| phone_patterns("Mobile personnel"));
pub(crate) static PHONE_AUTRE_RE: Lazy<Vec<Regex>> = Lazy::new(|| phone_patterns("Téléphone autre"));
pub(crate) static PHONE_GENERIC_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"(?is)Téléphone\s*:\s*({PHONE_NUMBER})"),
        format!(r"(?is)Tel\s*:\s*({PHONE_NUMBER})"),
    ]
    .iter()
    .map(|pat| Regex::new(pat).expect("Failed to compile PHONE_GENERIC_RE"))
    .collect()
});

pub(crate) static ADDRESS_MARKUP_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<b>Adresse\s*:</b>\s*<span[^>]*>([^<]+)</span>",
        r"(?is)Adresse\s*:\s*([^<\n]+(?:-\s*\d{5}\s*-\s*[A-Z\s]+)?)",
        r"(?is)Siège social[:\s]*([^<]+)",
    ]
    .iter()
    .map(|pat| Regex::new(pat).expect("Failed to compile ADDRESS_MARKUP_RE"))
    .collect()
});

static ADDRESS_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)Adresse\s*:\s*(.+)").expect("Failed to compile ADDRESS_TEXT_RE")
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("Failed to compile TAG_RE"));

// --- CSS Selectors (Lazy Static) ---
// <div class="txt-map-siege"><span class="title-ground">Siège social</span><br>
//   <b>Adresse :</b><span> Route de lavacant - 32000 - AUCH </span></div>
static SIEGE_LABEL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".txt-map-siege b").expect("Failed to compile SIEGE_LABEL_SELECTOR")
});

static SIEGE_SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".txt-map-siege span").expect("Failed to compile SIEGE_SPAN_SELECTOR")
});

// --- Field Coalescer ---

/// First present candidate wins; candidates are given in priority order.
pub fn coalesce<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates.into_iter().flatten().next()
}

// --- Email ---

pub fn extract_email(markup: &str) -> Option<String> {
    let principal = first_capture(&EMAIL_PRINCIPAL_RE, markup).map(str::to_string);
    let officiel = first_capture(&EMAIL_OFFICIEL_RE, markup).map(str::to_string);
    // "Email autre" can hold a comma-separated list
    let autre = first_capture(&EMAIL_AUTRE_RE, markup)
        .and_then(|list| list.split(',').next())
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty());

    coalesce([principal, officiel, autre])
}

// --- Phone ---

pub fn extract_phone(markup: &str) -> Option<String> {
    let labelled = coalesce([
        first_phone(&PHONE_TRAVAIL_RE, markup),
        first_phone(&PHONE_DOMICILE_RE, markup),
        first_phone(&PHONE_MOBILE_RE, markup),
        first_phone(&PHONE_AUTRE_RE, markup),
    ]);
    // The bare "Téléphone" label only counts when no qualified label matched
    labelled.or_else(|| first_phone(&PHONE_GENERIC_RE, markup))
}

/// Digits only, or `None` when too short to be a number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() >= MIN_PHONE_DIGITS).then_some(digits)
}

/// First occurrence, across every variant, that normalises to a valid number.
fn first_phone(patterns: &[Regex], markup: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures_iter(markup)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| normalize_phone(m.as_str()))
    })
}

// --- Address ---

pub fn extract_address(page: &ClubPage<'_>) -> Option<String> {
    structured_address(page).or_else(|| markup_address(page.markup()))
}

/// Reads the "Siège social" container: the span right after the "Adresse :"
/// label, then any labelled span inside the container.
fn structured_address(page: &ClubPage<'_>) -> Option<String> {
    let document = page.document();

    for label in document.select(&SIEGE_LABEL_SELECTOR) {
        if !element_text(label).to_lowercase().contains("adresse") {
            continue;
        }
        let sibling = label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .filter(|el| el.value().name() == "span");
        if let Some(address) = sibling.and_then(|span| clean_address(&element_text(span))) {
            return Some(address);
        }
    }

    document
        .select(&SIEGE_SPAN_SELECTOR)
        .take(MAX_ADDRESS_SPANS)
        .find_map(|span| {
            let text = element_text(span);
            if !text.to_lowercase().contains("adresse") || text.chars().count() <= 15 {
                return None;
            }
            let raw = ADDRESS_TEXT_RE.captures(&text)?.get(1)?.as_str().to_string();
            clean_address(&raw)
        })
}

fn markup_address(markup: &str) -> Option<String> {
    ADDRESS_MARKUP_RE.iter().find_map(|re| {
        let raw = re.captures(markup)?.get(1)?.as_str();
        clean_address(raw)
    })
}

/// Strips embedded tags, collapses whitespace, and rejects fragments.
fn clean_address(raw: &str) -> Option<String> {
    let address = collapse_whitespace(&TAG_RE.replace_all(raw, " "));
    (address.chars().count() > MIN_ADDRESS_LEN).then_some(address)
}

fn first_capture<'h>(patterns: &[Regex], haystack: &'h str) -> Option<&'h str> {
    patterns.iter().find_map(|re| {
        re.captures(haystack)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    })
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_pattern_compiles() {
        for set in [&EMAIL_PRINCIPAL_RE, &EMAIL_OFFICIEL_RE, &EMAIL_AUTRE_RE] {
            assert_eq!(set.len(), 3);
        }
        for set in [&PHONE_TRAVAIL_RE, &PHONE_DOMICILE_RE, &PHONE_MOBILE_RE, &PHONE_AUTRE_RE] {
            assert_eq!(set.len(), 3);
        }
        assert_eq!(PHONE_GENERIC_RE.len(), 2);
        assert_eq!(ADDRESS_MARKUP_RE.len(), 3);
    }

    #[test]
    fn test_coalesce_takes_first_present() {
        assert_eq!(coalesce([None, Some("b".to_string()), Some("c".to_string())]).as_deref(), Some("b"));
        assert_eq!(coalesce(Vec::<Option<String>>::new()), None);
    }

    #[test]
    fn test_email_principal_beats_officiel() {
        let markup = r#"
            <p><b>Email officiel</b> : officiel@club.fr</p>
            <p><b>Email principal</b> : contact@club.fr</p>
        "#;
        assert_eq!(extract_email(markup).as_deref(), Some("contact@club.fr"));
    }

    #[test]
    fn test_email_officiel_beats_autre() {
        let markup = r#"
            <p>Email autre : autre@club.fr</p>
            <p>Email officiel: 500123@lfna.fr</p>
        "#;
        assert_eq!(extract_email(markup).as_deref(), Some("500123@lfna.fr"));
    }

    #[test]
    fn test_email_autre_list_keeps_first() {
        let markup = "<p>Email autre : president@club.fr,tresorier@club.fr</p>";
        assert_eq!(extract_email(markup).as_deref(), Some("president@club.fr"));
    }

    #[test]
    fn test_no_email() {
        assert!(extract_email("<p>Pas de contact</p>").is_none());
    }

    #[test]
    fn test_phone_priority_and_normalisation() {
        let markup = r#"
            <p><b>Mobile personnel</b> : 06 12 34 56 78</p>
            <p><b>Téléphone travail</b> : 05.56.00.11.22</p>
        "#;
        assert_eq!(extract_phone(markup).as_deref(), Some("0556001122"));
    }

    #[test]
    fn test_phone_autre_skips_short_numbers() {
        let markup = r#"
            <p>Téléphone autre : 12</p>
            <p>Téléphone autre : (05) 57-44-10-10</p>
        "#;
        assert_eq!(extract_phone(markup).as_deref(), Some("0557441010"));
    }

    #[test]
    fn test_generic_phone_only_as_last_resort() {
        assert_eq!(extract_phone("<p>Téléphone : 05 62 05 00 00</p>").as_deref(), Some("0562050000"));

        let both = "<p>Téléphone : 05 62 05 00 00</p><p>Téléphone domicile : 05 62 99 99 99</p>";
        assert_eq!(extract_phone(both).as_deref(), Some("0562999999"));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone(" 05 56-78.90 12 ").as_deref(), Some("0556789012"));
        assert_eq!(normalize_phone("12 34"), None);
    }

    #[test]
    fn test_structured_address() {
        let markup = r#"<html><body><div class="txt-map-siege">
            <span class="title-ground">Siège social</span><br>
            <b>Adresse :</b><span> Route de lavacant   - 32000 - AUCH </span>
            </div></body></html>"#;
        let page = ClubPage::new(markup);
        assert_eq!(extract_address(&page).as_deref(), Some("Route de lavacant - 32000 - AUCH"));
    }

    #[test]
    fn test_markup_address_fallback() {
        let markup = "<div><p>Adresse :   12 rue des Lilas - 33000 - BORDEAUX</p></div>";
        let page = ClubPage::new(markup);
        assert_eq!(extract_address(&page).as_deref(), Some("12 rue des Lilas - 33000 - BORDEAUX"));
    }

    #[test]
    fn test_short_label_falls_through_to_siege_social() {
        let markup = "<p>Adresse : 12 rue</p><p>Siège social : Stade municipal, 33160 Saint Medard</p>";
        let page = ClubPage::new(markup);
        assert_eq!(extract_address(&page).as_deref(), Some("Stade municipal, 33160 Saint Medard"));
    }

    #[test]
    fn test_short_address_rejected() {
        let page = ClubPage::new("<p>Adresse : Lieu dit</p>");
        assert!(extract_address(&page).is_none());
    }
}
