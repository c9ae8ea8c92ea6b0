// src/fetch/models.rs

/// Any district mirror serves every club; the key is global, not per district.
pub const DEFAULT_BASE_URL: &str = "https://gironde.fff.fr";

/// Markup of one detail page as read after client-side rendering settled.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub key: u64,
    pub url: String, // Page URL, never the render-proxy URL
    pub markup: String,
}

/// Constructs the detail page URL for a key
pub fn detail_url(base_url: &str, key: u64) -> String {
    format!("{}/recherche-clubs?scl={}", base_url.trim_end_matches('/'), key)
}
