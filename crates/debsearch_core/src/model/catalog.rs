//! Source catalog describing the upstream feeds merged into one table.
//!
//! # Responsibility
//! - Keep an ordered list of `(section label, URL)` pairs.
//! - Build the standard Ubuntu archive layout for a release/architecture.
//!
//! # Invariants
//! - Iteration order is insertion order; the package pipeline relies on it.
//! - The catalog is read-only while a load runs.

pub const DEFAULT_MIRROR: &str = "http://archive.ubuntu.com/ubuntu";
pub const DEFAULT_RELEASE: &str = "bionic";
pub const DEFAULT_ARCH: &str = "amd64";

/// Archive components combined into the `packages` table.
pub const UBUNTU_SECTIONS: &[&str] = &["main", "universe", "multiverse", "restricted"];

/// One named upstream feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCatalogEntry {
    pub label: String,
    pub url: String,
}

impl SourceCatalogEntry {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Ordered, fixed list of catalog sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCatalog {
    entries: Vec<SourceCatalogEntry>,
}

impl SourceCatalog {
    pub fn new(entries: Vec<SourceCatalogEntry>) -> Self {
        Self { entries }
    }

    /// Builds the `Packages.gz` catalog for every Ubuntu archive component.
    pub fn ubuntu(mirror: &str, release: &str, arch: &str) -> Self {
        let mirror = mirror.trim_end_matches('/');
        let entries = UBUNTU_SECTIONS
            .iter()
            .map(|section| {
                SourceCatalogEntry::new(
                    *section,
                    format!("{mirror}/dists/{release}/{section}/binary-{arch}/Packages.gz"),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, entry: SourceCatalogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SourceCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::ubuntu(DEFAULT_MIRROR, DEFAULT_RELEASE, DEFAULT_ARCH)
    }
}

/// URL of the file-to-package `Contents` map for a release/architecture.
pub fn contents_url(mirror: &str, release: &str, arch: &str) -> String {
    let mirror = mirror.trim_end_matches('/');
    format!("{mirror}/dists/{release}/Contents-{arch}.gz")
}

#[cfg(test)]
mod tests {
    use super::{contents_url, SourceCatalog, SourceCatalogEntry};

    #[test]
    fn default_catalog_lists_sections_in_archive_order() {
        let catalog = SourceCatalog::default();
        let labels: Vec<_> = catalog.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["main", "universe", "multiverse", "restricted"]);
        assert_eq!(
            catalog.entries()[1].url,
            "http://archive.ubuntu.com/ubuntu/dists/bionic/universe/binary-amd64/Packages.gz"
        );
    }

    #[test]
    fn ubuntu_catalog_tolerates_trailing_slash_on_mirror() {
        let catalog = SourceCatalog::ubuntu("http://mirror.example/ubuntu/", "jammy", "arm64");
        assert_eq!(
            catalog.entries()[0].url,
            "http://mirror.example/ubuntu/dists/jammy/main/binary-arm64/Packages.gz"
        );
    }

    #[test]
    fn custom_catalog_keeps_insertion_order() {
        let mut catalog = SourceCatalog::new(Vec::new());
        assert!(catalog.is_empty());
        catalog.push(SourceCatalogEntry::new("b", "file:///b"));
        catalog.push(SourceCatalogEntry::new("a", "file:///a"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].label, "b");
    }

    #[test]
    fn contents_url_follows_archive_layout() {
        assert_eq!(
            contents_url("http://archive.ubuntu.com/ubuntu", "bionic", "amd64"),
            "http://archive.ubuntu.com/ubuntu/dists/bionic/Contents-amd64.gz"
        );
    }
}
