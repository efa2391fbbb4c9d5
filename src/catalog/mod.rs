// src/catalog/mod.rs

//! Package catalog
//!
//! The catalog is the sole owner of every [`Package`] known to a resolution
//! run, available and installed alike. Packages are kept in canonical order
//! (name ascending, then newest version first) and addressed by [`PackageId`].

mod index;
mod load;

pub use index::CapabilityIndex;
pub use load::{CatalogManifest, PackageRecord};

use crate::package::{Package, PackageId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Index;
use tracing::warn;

/// Immutable universe of packages for one or more resolutions
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: Vec<Package>,
    by_name: HashMap<String, Vec<PackageId>>,
}

fn canonical_order(a: &Package, b: &Package) -> Ordering {
    a.name
        .cmp(&b.name)
        .then_with(|| b.version.compare(&a.version))
        .then_with(|| a.arch.cmp(&b.arch))
        .then_with(|| a.installed.cmp(&b.installed))
}

impl Catalog {
    /// Build a catalog, sorting into canonical order
    ///
    /// A record repeated with the same identity and the same installed state
    /// is dropped with a warning. The same identity may appear once as
    /// available and once as installed.
    pub fn new(mut packages: Vec<Package>) -> Self {
        packages.sort_by(canonical_order);

        let mut kept: Vec<Package> = Vec::with_capacity(packages.len());
        for pkg in packages {
            let dup = kept
                .iter()
                .rev()
                .take_while(|k| k.name == pkg.name)
                .any(|k| k.installed == pkg.installed && k.same_identity(&pkg));
            if dup {
                warn!("Duplicate package {} ignored", pkg);
                continue;
            }
            kept.push(pkg);
        }

        let mut by_name: HashMap<String, Vec<PackageId>> = HashMap::new();
        for (i, pkg) in kept.iter().enumerate() {
            by_name.entry(pkg.name.clone()).or_default().push(PackageId(i));
        }

        Self {
            packages: kept,
            by_name,
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(id.0)
    }

    /// All packages with their ids, in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(i), p))
    }

    pub fn ids(&self) -> impl Iterator<Item = PackageId> + '_ {
        (0..self.packages.len()).map(PackageId)
    }

    /// Every package named `name`, newest first
    pub fn by_name(&self, name: &str) -> &[PackageId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct package names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.into_iter()
    }

    pub fn installed(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.iter().filter(|(_, p)| p.installed)
    }

    pub fn available(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.iter().filter(|(_, p)| !p.installed)
    }

    /// Installed package with the same identity as `id`, if any
    pub fn installed_twin(&self, id: PackageId) -> Option<PackageId> {
        let pkg = &self[id];
        self.by_name(&pkg.name)
            .iter()
            .copied()
            .find(|&other| other != id && self[other].installed && self[other].same_identity(pkg))
    }
}

impl Index<PackageId> for Catalog {
    type Output = Package;

    fn index(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, version: &str) -> PackageRecord {
        PackageRecord::new(name, version, "1")
    }

    fn catalog(available: Vec<PackageRecord>, installed: Vec<PackageRecord>) -> Catalog {
        CatalogManifest {
            available,
            installed,
        }
        .into_catalog()
        .unwrap()
    }

    #[test]
    fn test_canonical_order() {
        let c = catalog(
            vec![record("b", "1.0"), record("a", "1.0"), record("a", "2.0")],
            vec![record("a", "1.0")],
        );

        let order: Vec<String> = c.iter().map(|(_, p)| p.to_string()).collect();
        assert_eq!(order, vec!["a-2.0-1", "a-1.0-1", "a-1.0-1", "b-1.0-1"]);
        assert!(!c[PackageId(1)].installed);
        assert!(c[PackageId(2)].installed);
    }

    #[test]
    fn test_duplicates_dropped() {
        let c = catalog(vec![record("a", "1.0"), record("a", "1.0")], vec![]);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_by_name_and_twin() {
        let c = catalog(vec![record("a", "1.0"), record("a", "2.0")], vec![record("a", "1.0")]);

        assert_eq!(c.by_name("a").len(), 3);
        assert!(c.by_name("zzz").is_empty());
        assert_eq!(c.installed_twin(PackageId(1)), Some(PackageId(2)));
        assert_eq!(c.installed_twin(PackageId(0)), None);
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["a"]);
    }
}
