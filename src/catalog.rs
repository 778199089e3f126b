//! Selectable subject names
//!
//! The catalog is a static list parsed once at startup from comma-delimited
//! text bundled into the binary.

use tracing::debug;

/// Bundled Generation 1 list, `id,name` with a header row
const EMBEDDED_CSV: &str = include_str!("../data/catalog.csv");

const DELIMITER: char = ',';

/// A single selectable subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Label shown in the selector, e.g. `#25 - Pikachu`
    pub fn label(&self) -> String {
        format!("#{} - {}", self.id, self.name)
    }
}

/// Parse delimited catalog text.
///
/// The first line is a header and is skipped. Each remaining line is split on
/// the first delimiter only, so names that contain the delimiter survive
/// intact. Lines whose trimmed id or name is empty are dropped silently.
pub fn parse(raw: &str) -> Vec<CatalogEntry> {
    raw.split('\n')
        .skip(1)
        .filter_map(|line| {
            let (id, name) = match line.split_once(DELIMITER) {
                Some((id, name)) => (id.trim(), name.trim()),
                None => (line.trim(), ""),
            };
            if id.is_empty() || name.is_empty() {
                return None;
            }
            Some(CatalogEntry::new(id, name))
        })
        .collect()
}

/// Immutable, ordered list of catalog entries
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from raw delimited text
    pub fn from_text(raw: &str) -> Self {
        let entries = parse(raw);
        debug!("[CATALOG] Parsed {} entries", entries.len());
        Self { entries }
    }

    /// Build a catalog from already parsed entries
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The bundled catalog
    pub fn embedded() -> Self {
        Self::from_text(EMBEDDED_CSV)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Name of the first entry, or an empty string for an empty catalog
    pub fn first_name(&self) -> String {
        self.entries
            .first()
            .map(|entry| entry.name.clone())
            .unwrap_or_default()
    }

    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
