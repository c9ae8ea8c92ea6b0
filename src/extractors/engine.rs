// src/extractors/engine.rs

// --- Imports ---
use crate::extractors::fields;
use crate::extractors::name;
use crate::extractors::page::ClubPage;
use crate::fetch::RenderedPage;
use crate::utils::error::ExtractError;

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub key: u64,                        // scl, the sequential page key
    pub name: String,                    // Validated club name
    pub affiliation_number: String,      // Digits as printed, "0" for umbrella entities
    pub email: Option<String>,           // principal > officiel > autre
    pub phone: Option<String>,           // travail > domicile > mobile > autre > generic
    pub address: Option<String>,         // Siège social
    pub source_url: String,              // Exact URL fetched
    pub extraction_seconds: Option<f64>, // Fetch + extract wall time, set by the driver
}

/// Turns one rendered page into a validated record.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractionEngine;

impl ExtractionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the club on `page`, or the reason the whole key is rejected.
    ///
    /// The affiliation marker is the existence signal and the name is the
    /// validation gate; every other field degrades to `None` on its own.
    pub fn extract(&self, page: &RenderedPage) -> Result<EntityRecord, ExtractError> {
        let club = ClubPage::new(&page.markup);

        // 1. Existence signal
        let affiliation_number = club.affiliation_number().ok_or(ExtractError::AffiliationMissing)?;

        // 2-3. Name strategies, then validation. The "0" sentinel is only
        //      reachable once a name has been accepted.
        let name = name::extract_name(&club)
            .ok_or_else(|| ExtractError::NameRejected(affiliation_number.clone()))?;

        // 4-6. Contact fields
        let email = fields::extract_email(club.markup());
        let phone = fields::extract_phone(club.markup());
        let address = fields::extract_address(&club);

        tracing::debug!(
            "scl={} -> '{}' (affiliation {}, email {}, phone {}, address {})",
            page.key,
            name,
            affiliation_number,
            email.is_some(),
            phone.is_some(),
            address.is_some()
        );

        Ok(EntityRecord {
            key: page.key,
            name,
            affiliation_number,
            email,
            phone,
            address,
            source_url: page.url.clone(),
            extraction_seconds: None,
        })
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::detail_url;

    const CLUB_PAGE: &str = r#"
        <!DOCTYPE html>
        <html><head><title>Recherche clubs | District de la Gironde</title></head><body>
        <header><h1>Accueil</h1><nav><h2>District de la Gironde</h2></nav></header>
        <app-club>
          <h1>CLUB DISTRICT GERS</h1><h2>N°affiliation: 6504</h2>
          <div class="contacts">
            <p><b>Email principal</b> : secretariat@cdgers.fr</p>
            <p><b>Email officiel</b> : 6504@lfo.fr</p>
            <p><b>Téléphone travail</b> : 05 62 05 00 00</p>
          </div>
          <div class="txt-map-siege">
            <span class="title-ground">Siège social</span><br>
            <b>Adresse :</b><span> Route de lavacant   - 32000 - AUCH </span>
          </div>
        </app-club>
        </body></html>
    "#;

    fn page(key: u64, markup: &str) -> RenderedPage {
        RenderedPage {
            key,
            url: detail_url("https://gironde.fff.fr", key),
            markup: markup.to_string(),
        }
    }

    #[test]
    fn test_full_club_page() {
        let record = ExtractionEngine::new().extract(&page(6504, CLUB_PAGE)).expect("club expected");
        assert_eq!(record.key, 6504);
        assert_eq!(record.name, "CLUB DISTRICT GERS");
        assert_eq!(record.affiliation_number, "6504");
        assert_eq!(record.email.as_deref(), Some("secretariat@cdgers.fr"));
        assert_eq!(record.phone.as_deref(), Some("0562050000"));
        assert_eq!(record.address.as_deref(), Some("Route de lavacant - 32000 - AUCH"));
        assert_eq!(record.source_url, "https://gironde.fff.fr/recherche-clubs?scl=6504");
        assert!(record.extraction_seconds.is_none());
    }

    #[test]
    fn test_same_markup_same_record() {
        let engine = ExtractionEngine::new();
        let first = engine.extract(&page(6504, CLUB_PAGE)).unwrap();
        let second = engine.extract(&page(6504, CLUB_PAGE)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_marker_is_not_found() {
        let markup = "<html><body><h1>CLUB DISTRICT GERS</h1><p>Aucun club</p></body></html>";
        let result = ExtractionEngine::new().extract(&page(3, markup));
        assert_eq!(result, Err(ExtractError::AffiliationMissing));
    }

    #[test]
    fn test_zero_affiliation_with_name_is_found() {
        let markup = r#"<html><body>
            <h1>CLUB FEDERATION FRANCAISE DE FOOTBALL</h1><h2>N°affiliation: 0</h2>
            </body></html>"#;
        let record = ExtractionEngine::new().extract(&page(1, markup)).expect("sentinel club expected");
        assert_eq!(record.affiliation_number, "0");
        assert_eq!(record.name, "CLUB FEDERATION FRANCAISE DE FOOTBALL");
        assert!(record.email.is_none());
        assert!(record.phone.is_none());
        assert!(record.address.is_none());
    }

    #[test]
    fn test_zero_affiliation_without_name_is_not_found() {
        let markup = r#"<html><body>
            <h1>Accueil</h1><h2>N°affiliation: 0</h2>
            </body></html>"#;
        let result = ExtractionEngine::new().extract(&page(1, markup));
        assert_eq!(result, Err(ExtractError::NameRejected("0".to_string())));
    }
}
