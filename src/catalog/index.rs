// src/catalog/index.rs

//! Capability index
//!
//! Maps capability names to the packages providing them, including the
//! implicit self capability of every package, and obsoleted names to the
//! packages obsoleting them.

use super::Catalog;
use crate::package::{CapReq, Package, PackageId};
use crate::version::EpochPolicy;
use std::collections::HashMap;
use tracing::trace;

/// Name-keyed lookup over a catalog, immutable once built
#[derive(Debug, Clone)]
pub struct CapabilityIndex<'c> {
    catalog: &'c Catalog,
    policy: EpochPolicy,
    providers: HashMap<&'c str, Vec<PackageId>>,
    obsoleters: HashMap<&'c str, Vec<PackageId>>,
    conflicters: HashMap<&'c str, Vec<PackageId>>,
}

impl<'c> CapabilityIndex<'c> {
    /// Index every package in the catalog
    pub fn build(catalog: &'c Catalog) -> Self {
        Self::build_with(catalog, EpochPolicy::Zero, |_| true)
    }

    /// Index the packages accepted by `filter`
    pub fn build_with<F>(catalog: &'c Catalog, policy: EpochPolicy, filter: F) -> Self
    where
        F: Fn(&Package) -> bool,
    {
        let mut providers: HashMap<&'c str, Vec<PackageId>> = HashMap::new();
        let mut obsoleters: HashMap<&'c str, Vec<PackageId>> = HashMap::new();
        let mut conflicters: HashMap<&'c str, Vec<PackageId>> = HashMap::new();

        for (id, pkg) in catalog.iter().filter(|(_, p)| filter(p)) {
            providers.entry(pkg.name.as_str()).or_default().push(id);
            for cap in &pkg.provides {
                let entry = providers.entry(cap.name.as_str()).or_default();
                if entry.last() != Some(&id) {
                    entry.push(id);
                }
            }
            for c in &pkg.conflicts {
                let map = if c.flags.obsoletes {
                    &mut obsoleters
                } else {
                    &mut conflicters
                };
                let entry = map.entry(c.name.as_str()).or_default();
                if entry.last() != Some(&id) {
                    entry.push(id);
                }
            }
        }

        trace!(
            "Capability index built: {} names, {} obsoleted names",
            providers.len(),
            obsoleters.len()
        );

        Self {
            catalog,
            policy,
            providers,
            obsoleters,
            conflicters,
        }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    pub fn policy(&self) -> EpochPolicy {
        self.policy
    }

    /// Providers of `req`, best first
    ///
    /// Best means higher priority, then newer version, then canonical order.
    /// An empty result is not an error here; the caller decides.
    pub fn find(&self, req: &CapReq) -> Vec<PackageId> {
        let Some(ids) = self.providers.get(req.name.as_str()) else {
            return Vec::new();
        };

        let mut found: Vec<PackageId> = ids
            .iter()
            .copied()
            .filter(|&id| self.catalog[id].satisfies(req, self.policy))
            .collect();

        found.sort_by(|&a, &b| {
            let (pa, pb) = (&self.catalog[a], &self.catalog[b]);
            pb.priority
                .cmp(&pa.priority)
                .then_with(|| pb.version.compare(&pa.version))
                .then_with(|| a.cmp(&b))
        });
        found
    }

    /// Indexed packages whose obsoletes match `id`
    pub fn obsoleted_by(&self, id: PackageId) -> Vec<PackageId> {
        let pkg = &self.catalog[id];
        self.obsoleters
            .get(pkg.name.as_str())
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|&o| o != id && self.catalog[o].obsoletes(pkg, self.policy))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Indexed packages with a plain conflict that `id` satisfies
    pub fn conflicting_with(&self, id: PackageId) -> Vec<PackageId> {
        let pkg = &self.catalog[id];
        let names = std::iter::once(pkg.name.as_str())
            .chain(pkg.provides.iter().map(|c| c.name.as_str()));

        let mut found: Vec<PackageId> = names
            .filter_map(|name| self.conflicters.get(name))
            .flatten()
            .copied()
            .filter(|&c| c != id && self.catalog[c].conflict_with(pkg, self.policy).is_some())
            .collect();
        found.sort();
        found.dedup();
        found
    }
}
