// src/storage/row.rs
use crate::extractors::EntityRecord;
use csv::StringRecord;
use serde::Deserialize;
use std::collections::BTreeMap;

const COMPACT_HEADERS: [&str; 7] = [
    "scl", "nom", "numero_affiliation", "email", "telephone", "adresse", "url_detail",
];
const TIMED_HEADERS: [&str; 8] = [
    "scl", "nom", "numero_affiliation", "email", "telephone", "adresse", "url_detail", "temps_extraction",
];

/// Column layout of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Full-range scan layout
    Compact,
    /// Range re-scrape layout, with per-key extraction time
    Timed,
}

impl Schema {
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Schema::Compact => &COMPACT_HEADERS,
            Schema::Timed => &TIMED_HEADERS,
        }
    }

    /// Layout of an existing file, judged by its header row.
    pub fn from_headers(headers: &StringRecord) -> Schema {
        if headers.iter().any(|h| h == "temps_extraction") {
            Schema::Timed
        } else {
            Schema::Compact
        }
    }
}

/// One persisted row. Absent values are empty strings; a row with an empty
/// `name` is a confirmed-absent key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRow {
    pub key: u64,
    pub name: String,
    pub affiliation_number: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub source_url: String,
    pub extraction_time: String,
}

impl StoreRow {
    /// Placeholder for a key that was tried and holds no club.
    pub fn absent(key: u64, extraction_seconds: Option<f64>) -> Self {
        Self {
            key,
            name: String::new(),
            affiliation_number: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            source_url: String::new(),
            extraction_time: format_seconds(extraction_seconds),
        }
    }

    pub fn is_found(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn fields(&self, schema: Schema) -> Vec<String> {
        let mut fields = vec![
            self.key.to_string(),
            self.name.clone(),
            self.affiliation_number.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.address.clone(),
            self.source_url.clone(),
        ];
        if schema == Schema::Timed {
            fields.push(self.extraction_time.clone());
        }
        fields
    }
}

impl From<&EntityRecord> for StoreRow {
    fn from(record: &EntityRecord) -> Self {
        Self {
            key: record.key,
            name: record.name.clone(),
            affiliation_number: record.affiliation_number.clone(),
            email: record.email.clone().unwrap_or_default(),
            phone: record.phone.clone().unwrap_or_default(),
            address: record.address.clone().unwrap_or_default(),
            source_url: record.source_url.clone(),
            extraction_time: format_seconds(record.extraction_seconds),
        }
    }
}

fn format_seconds(seconds: Option<f64>) -> String {
    seconds.map(|s| format!("{:.2}", s)).unwrap_or_default()
}

/// Row as read back from disk, by header name. Missing columns read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawRow {
    scl: String,
    nom: String,
    numero_affiliation: String,
    email: String,
    telephone: String,
    adresse: String,
    url_detail: String,
    temps_extraction: String,
}

impl RawRow {
    /// `None` when the key cell is empty or not a number.
    pub(crate) fn into_row(self) -> Option<StoreRow> {
        let key = self.scl.trim().parse::<u64>().ok()?;
        Some(StoreRow {
            key,
            name: self.nom,
            affiliation_number: self.numero_affiliation,
            email: self.email,
            phone: self.telephone,
            address: self.adresse,
            source_url: self.url_detail,
            extraction_time: self.temps_extraction,
        })
    }
}

/// Every key already processed, with its last written row.
///
/// Built once from the output file at the start of a run and kept in memory;
/// the file is never re-read mid-run.
#[derive(Debug, Default, Clone)]
pub struct ResumeState {
    rows: BTreeMap<u64, StoreRow>,
    layout: Option<Schema>,
}

impl ResumeState {
    pub fn with_layout(layout: Schema) -> Self {
        Self { rows: BTreeMap::new(), layout: Some(layout) }
    }

    /// Layout of the file this state was read from, if any.
    pub fn layout(&self) -> Option<Schema> {
        self.layout
    }

    pub fn last_key(&self) -> Option<u64> {
        self.rows.keys().next_back().copied()
    }

    /// First key after the highest one present, gaps notwithstanding.
    /// `None` when empty or when the highest key is `u64::MAX`.
    pub fn resume_key(&self) -> Option<u64> {
        self.last_key()?.checked_add(1)
    }

    pub fn contains(&self, key: u64) -> bool {
        self.rows.contains_key(&key)
    }

    pub fn get(&self, key: u64) -> Option<&StoreRow> {
        self.rows.get(&key)
    }

    /// Inserts or replaces the row for its key.
    pub fn insert(&mut self, row: StoreRow) -> Option<StoreRow> {
        self.rows.insert(row.key, row)
    }

    /// Union by key; rows from `other` replace ours.
    pub fn merge(&mut self, other: ResumeState) {
        self.rows.extend(other.rows);
    }

    /// Rows in ascending key order.
    pub fn rows(&self) -> impl Iterator<Item = &StoreRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn found_count(&self) -> usize {
        self.rows.values().filter(|row| row.is_found()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(key: u64, name: &str) -> StoreRow {
        StoreRow { name: name.to_string(), ..StoreRow::absent(key, None) }
    }

    #[test]
    fn test_resume_key_ignores_gaps() {
        let mut state = ResumeState::default();
        assert_eq!(state.resume_key(), None);
        for key in [1, 2, 5, 9] {
            state.insert(StoreRow::absent(key, None));
        }
        state.insert(found(3, "US CENON RIVE DROITE"));
        assert_eq!(state.resume_key(), Some(10));
        assert_eq!(state.found_count(), 1);
    }

    #[test]
    fn test_resume_key_at_end_of_key_space() {
        let mut state = ResumeState::default();
        state.insert(StoreRow::absent(u64::MAX, None));
        assert_eq!(state.last_key(), Some(u64::MAX));
        assert_eq!(state.resume_key(), None);
    }

    #[test]
    fn test_insert_replaces_by_key() {
        let mut state = ResumeState::default();
        state.insert(found(4, "ANCIEN NOM DU CLUB"));
        let previous = state.insert(found(4, "NOUVEAU NOM DU CLUB"));
        assert_eq!(previous.map(|row| row.name).as_deref(), Some("ANCIEN NOM DU CLUB"));
        assert_eq!(state.len(), 1);
        assert_eq!(state.get(4).map(|row| row.name.as_str()), Some("NOUVEAU NOM DU CLUB"));
    }

    #[test]
    fn test_fields_follow_schema() {
        let mut row = found(12, "FC TEST VILLE");
        row.extraction_time = "1.25".to_string();
        assert_eq!(row.fields(Schema::Compact).len(), Schema::Compact.headers().len());
        assert_eq!(row.fields(Schema::Timed).last().map(String::as_str), Some("1.25"));
        assert_eq!(StoreRow::absent(3, Some(0.5)).fields(Schema::Timed)[1..7], ["", "", "", "", "", ""]);
    }

    #[test]
    fn test_raw_row_requires_numeric_key() {
        let raw = RawRow { scl: " 17 ".to_string(), nom: "AS TEST".to_string(), ..RawRow::default() };
        assert_eq!(raw.into_row().map(|row| row.key), Some(17));
        assert!(RawRow { scl: "abc".to_string(), ..RawRow::default() }.into_row().is_none());
        assert!(RawRow::default().into_row().is_none());
    }
}
