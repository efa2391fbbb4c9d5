// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use depmark::{Catalog, CatalogManifest, PackageId, PackageRecord, TransactionResult};
use std::io::Write;
use tempfile::NamedTempFile;

/// Shorthand for a record with release "1"
pub fn pkg(name: &str, version: &str) -> PackageRecord {
    PackageRecord::new(name, version, "1")
}

/// Build a catalog from available and installed records.
pub fn catalog(available: Vec<PackageRecord>, installed: Vec<PackageRecord>) -> Catalog {
    CatalogManifest { available, installed }.into_catalog().unwrap()
}

/// Find a package by its display string, e.g. `A-1.0-1`.
///
/// Panics when the catalog holds no such package.
pub fn id(catalog: &Catalog, nevr: &str) -> PackageId {
    catalog
        .iter()
        .find(|(_, p)| p.to_string() == nevr)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no package {} in catalog", nevr))
}

/// Display strings of `ids`
pub fn names(catalog: &Catalog, ids: &[PackageId]) -> Vec<String> {
    TransactionResult::describe(catalog, ids)
}

/// Package names (without versions) of `ids`
pub fn bare_names(catalog: &Catalog, ids: &[PackageId]) -> Vec<String> {
    ids.iter().map(|&id| catalog[id].name.clone()).collect()
}

/// Write `content` to a temporary file kept alive by the returned handle.
pub fn temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
