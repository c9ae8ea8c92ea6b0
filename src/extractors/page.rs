// src/extractors/page.rs

// --- Imports ---
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

// --- Regex Patterns (Lazy Static) ---
// "N°affiliation: 6504", "N° affiliation 6504", "n affiliation:0"
pub(crate) static AFFILIATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)N[°\s]*affiliation[:\s]*(\d+)").expect("Failed to compile AFFILIATION_RE")
});

// Label only, used to locate the rendered marker element
pub(crate) static AFFILIATION_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)N[°\s]*affiliation").expect("Failed to compile AFFILIATION_LABEL_RE")
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to compile TITLE_SELECTOR")
});

/// One rendered club page: the raw markup plus a DOM view parsed on first use.
///
/// Pattern strategies work on `markup()`, structural ones on `document()`.
/// Most keys are rejected on the raw affiliation check, so the DOM is only
/// built for pages that get that far.
pub struct ClubPage<'a> {
    markup: &'a str,
    document: OnceCell<Html>,
}

impl<'a> ClubPage<'a> {
    pub fn new(markup: &'a str) -> Self {
        Self { markup, document: OnceCell::new() }
    }

    pub fn markup(&self) -> &'a str {
        self.markup
    }

    pub fn document(&self) -> &Html {
        self.document.get_or_init(|| Html::parse_document(self.markup))
    }

    /// The labelled affiliation number, as printed (may be the sentinel "0").
    pub fn affiliation_number(&self) -> Option<String> {
        AFFILIATION_RE
            .captures(self.markup)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn title(&self) -> Option<String> {
        self.document()
            .select(&TITLE_SELECTOR)
            .next()
            .map(element_text)
            .filter(|title| !title.is_empty())
    }
}

/// Rendered text of an element, whitespace collapsed.
pub(crate) fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affiliation_marker_variants() {
        let cases = [
            ("<h2>N°affiliation: 6504</h2>", Some("6504")),
            ("<h2>N° affiliation : 550123</h2>", Some("550123")),
            ("<p>n°AFFILIATION 0</p>", Some("0")),
            ("<p>Affiliation en cours</p>", None),
            ("<p>N°affiliation: </p>", None),
        ];
        for (markup, expected) in cases {
            let page = ClubPage::new(markup);
            assert_eq!(page.affiliation_number().as_deref(), expected, "markup: {}", markup);
        }
    }

    #[test]
    fn test_title_and_text_normalisation() {
        let page = ClubPage::new(
            "<html><head><title>  FC   TEST | FFF </title></head><body><h1>\n  A\n B </h1></body></html>",
        );
        assert_eq!(page.title().as_deref(), Some("FC TEST | FFF"));

        let h1 = Selector::parse("h1").unwrap();
        let heading = page.document().select(&h1).next().unwrap();
        assert_eq!(element_text(heading), "A B");
    }

    #[test]
    fn test_missing_title() {
        let page = ClubPage::new("<html><body><p>rien</p></body></html>");
        assert!(page.title().is_none());
    }
}
