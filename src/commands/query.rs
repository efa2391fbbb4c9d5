// src/commands/query.rs
//! Catalog queries: whatprovides, vercmp

use anyhow::{Context, Result};
use depmark::{CapReq, CapabilityIndex, Catalog, RpmVersion};
use std::cmp::Ordering;
use std::path::Path;

/// List providers of a capability, best first
pub fn cmd_whatprovides(capability: &str, catalog_path: &Path) -> Result<bool> {
    let req = CapReq::parse(capability)
        .with_context(|| format!("Invalid capability '{}'", capability))?;
    let catalog = Catalog::load(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;

    let index = CapabilityIndex::build(&catalog);
    let providers = index.find(&req);

    if providers.is_empty() {
        println!("No package provides {}", req);
        return Ok(false);
    }
    for id in &providers {
        let pkg = &catalog[*id];
        if pkg.installed {
            println!("{} (installed)", pkg);
        } else {
            println!("{}", pkg);
        }
    }
    Ok(true)
}

/// Compare two versions and print the relation
pub fn cmd_vercmp(first: &str, second: &str) -> Result<bool> {
    let a = RpmVersion::parse(first).with_context(|| format!("Invalid version '{}'", first))?;
    let b = RpmVersion::parse(second).with_context(|| format!("Invalid version '{}'", second))?;

    let op = match a.compare(&b) {
        Ordering::Less => "<",
        Ordering::Equal => "==",
        Ordering::Greater => ">",
    };
    println!("{} {} {}", first, op, second);
    Ok(true)
}
