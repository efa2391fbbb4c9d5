// src/catalog/load.rs

//! JSON catalog manifests
//!
//! A manifest hands the resolver already-parsed package records:
//!
//! ```json
//! {
//!   "available": [{"name": "A", "version": "1.0", "release": "1", "requires": ["B"]}],
//!   "installed": []
//! }
//! ```

use super::Catalog;
use crate::error::{Error, Result};
use crate::package::{BoolDep, CapReq, CapReqFlags, Capability, Package};
use crate::version::RpmVersion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One package as it appears in a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u32>,
    pub version: String,
    pub release: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_pre: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_un: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obsoletes: Vec<String>,
}

impl PackageRecord {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release: release.into(),
            ..Default::default()
        }
    }

    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_provides(mut self, cap: impl Into<String>) -> Self {
        self.provides.push(cap.into());
        self
    }

    pub fn with_requires(mut self, req: impl Into<String>) -> Self {
        self.requires.push(req.into());
        self
    }

    pub fn with_requires_pre(mut self, req: impl Into<String>) -> Self {
        self.requires_pre.push(req.into());
        self
    }

    pub fn with_requires_un(mut self, req: impl Into<String>) -> Self {
        self.requires_un.push(req.into());
        self
    }

    pub fn with_suggests(mut self, req: impl Into<String>) -> Self {
        self.suggests.push(req.into());
        self
    }

    pub fn with_conflicts(mut self, req: impl Into<String>) -> Self {
        self.conflicts.push(req.into());
        self
    }

    pub fn with_obsoletes(mut self, req: impl Into<String>) -> Self {
        self.obsoletes.push(req.into());
        self
    }

    /// Convert into a catalog package
    pub fn into_package(self, installed: bool) -> Result<Package> {
        if self.name.is_empty() || self.name.contains(char::is_whitespace) {
            return Err(Error::InvalidPackage(format!("with name '{}'", self.name)));
        }

        // Parsing the joined form rejects '-' inside version or release
        let evr = RpmVersion::parse(&format!("{}-{}", self.version, self.release))
            .map_err(|_| Error::InvalidPackage(format!("{}: bad version", self.name)))?;
        let version = RpmVersion::new(self.epoch, evr.version, evr.release);

        let mut pkg = Package::new(self.name, version);
        pkg.arch = self.arch;
        pkg.color = self.color.unwrap_or(0);
        pkg.priority = self.priority.unwrap_or(0);
        pkg.installed = installed;

        pkg.provides = self
            .provides
            .iter()
            .map(|s| Capability::parse(s))
            .collect::<Result<_>>()?;

        let plain = CapReqFlags::default();
        let pre = CapReqFlags {
            prereq: true,
            ..Default::default()
        };
        let un = CapReqFlags {
            prereq_un: true,
            ..Default::default()
        };
        let weak = CapReqFlags {
            weak: true,
            ..Default::default()
        };
        let obsoletes = CapReqFlags {
            obsoletes: true,
            ..Default::default()
        };

        let (rich, requires): (Vec<&String>, Vec<&String>) =
            self.requires.iter().partition(|s| BoolDep::is_boolean(s));
        pkg.rich_requires = rich
            .into_iter()
            .map(|s| BoolDep::parse(s))
            .collect::<Result<_>>()?;
        pkg.requires = requires
            .into_iter()
            .map(|s| CapReq::parse(s).map(|r| r.with_flags(plain)))
            .collect::<Result<_>>()?;
        pkg.requires.extend(parse_all(&self.requires_pre, pre)?);
        pkg.requires.extend(parse_all(&self.requires_un, un)?);
        pkg.suggests = parse_all(&self.suggests, weak)?;
        pkg.conflicts = parse_all(&self.conflicts, plain)?;
        pkg.conflicts.extend(parse_all(&self.obsoletes, obsoletes)?);

        Ok(pkg)
    }
}

fn parse_all(exprs: &[String], flags: CapReqFlags) -> Result<Vec<CapReq>> {
    exprs
        .iter()
        .map(|s| CapReq::parse(s).map(|r| r.with_flags(flags)))
        .collect()
}

/// Manifest file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogManifest {
    #[serde(default)]
    pub available: Vec<PackageRecord>,
    #[serde(default)]
    pub installed: Vec<PackageRecord>,
}

impl CatalogManifest {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_catalog(self) -> Result<Catalog> {
        let mut packages = Vec::with_capacity(self.available.len() + self.installed.len());
        for record in self.available {
            packages.push(record.into_package(false)?);
        }
        for record in self.installed {
            packages.push(record.into_package(true)?);
        }
        Ok(Catalog::new(packages))
    }
}

impl Catalog {
    /// Load a catalog from a JSON manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading catalog manifest from {}", path.display());
        let content = fs::read_to_string(path)?;
        CatalogManifest::parse(&content)?.into_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_into_package() {
        let pkg = PackageRecord::new("A", "1.0", "1")
            .with_epoch(2)
            .with_arch("x86_64")
            .with_requires("B >= 1.0")
            .with_requires_pre("sh")
            .with_requires_un("coreutils")
            .with_suggests("docs")
            .with_obsoletes("A-old")
            .into_package(true)
            .unwrap();

        assert_eq!(pkg.to_string(), "A-2:1.0-1.x86_64");
        assert!(pkg.installed);
        assert_eq!(pkg.requires.len(), 3);
        assert!(pkg.requires[1].flags.prereq);
        assert!(pkg.requires[2].flags.prereq_un);
        assert!(pkg.suggests[0].flags.weak);
        assert!(pkg.conflicts[0].flags.obsoletes);
        assert_eq!(pkg.hard_requirements().count(), 2);
    }

    #[test]
    fn test_boolean_requirements_split_off() {
        let pkg = PackageRecord::new("A", "1.0", "1")
            .with_requires("B")
            .with_requires("(mta or sendmail >= 8)")
            .into_package(false)
            .unwrap();
        assert_eq!(pkg.requires.len(), 1);
        assert_eq!(pkg.rich_requires.len(), 1);
        assert_eq!(pkg.rich_requires[0].to_string(), "(mta or sendmail >= 8)");

        assert!(PackageRecord::new("A", "1.0", "1")
            .with_requires("(mta or)")
            .into_package(false)
            .is_err());
    }

    #[test]
    fn test_record_rejects_bad_fields() {
        assert!(PackageRecord::new("", "1.0", "1").into_package(false).is_err());
        assert!(PackageRecord::new("A", "1-0", "1").into_package(false).is_err());
        assert!(PackageRecord::new("A", "1.0", "1")
            .with_requires("B >> 1")
            .into_package(false)
            .is_err());
        assert!(PackageRecord::new("A", "1.0", "1")
            .with_provides("B > 1")
            .into_package(false)
            .is_err());
    }

    #[test]
    fn test_manifest_parse() {
        let json = r#"{
            "available": [
                {"name": "A", "version": "1.0", "release": "1", "requires": ["B"]},
                {"name": "B", "version": "1.0", "release": "1"}
            ],
            "installed": [
                {"name": "B", "version": "0.9", "release": "1"}
            ]
        }"#;

        let catalog = CatalogManifest::parse(json).unwrap().into_catalog().unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.installed().count(), 1);
    }

    #[test]
    fn test_manifest_rejects_unknown_fields() {
        let json = r#"{"available": [{"name": "A", "version": "1", "release": "1", "size": 3}]}"#;
        assert!(CatalogManifest::parse(json).is_err());
    }
}
