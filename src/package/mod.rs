// src/package/mod.rs

//! Package records and capability expressions
//!
//! A [`Package`] is immutable once it is placed in a catalog. Everything that
//! refers to a package outside the catalog does so through a [`PackageId`].

mod booldep;

pub use booldep::{BoolDep, DepCost, Needed, UNSATISFIABLE};

use crate::error::{Error, Result};
use crate::version::{EpochPolicy, RpmVersion};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Index of a package inside its [`Catalog`](crate::catalog::Catalog)
///
/// Ids follow the catalog's canonical order, so sorting ids sorts packages
/// by name and then newest version first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId(pub usize);

impl PackageId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Relational operator of a capability expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Relation {
    #[default]
    Any,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Relation {
    /// Parse an operator token (`=`, `==`, `<`, `<=`, `>`, `>=`)
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "=" | "==" => Some(Relation::Eq),
            "<" => Some(Relation::Lt),
            "<=" | "=<" => Some(Relation::Le),
            ">" => Some(Relation::Gt),
            ">=" | "=>" => Some(Relation::Ge),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Any => "",
            Relation::Eq => "=",
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Gt => ">",
            Relation::Ge => ">=",
        }
    }

    /// Whether `provided.cmp(required) == ord` satisfies this relation
    pub fn accepts(self, ord: Ordering) -> bool {
        match self {
            Relation::Any => true,
            Relation::Eq => ord == Ordering::Equal,
            Relation::Lt => ord == Ordering::Less,
            Relation::Le => ord != Ordering::Greater,
            Relation::Gt => ord == Ordering::Greater,
            Relation::Ge => ord != Ordering::Less,
        }
    }
}

/// Qualifiers attached to a requirement or conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CapReqFlags {
    /// Must be installed before the requiring package (Requires(pre))
    pub prereq: bool,
    /// Needed only while uninstalling (Requires(un))
    pub prereq_un: bool,
    /// Suggestion only, never resolved automatically
    pub weak: bool,
    /// rpmlib(...) feature requirement
    pub rpmlib: bool,
    /// Auto-generated requirement the resolver does not act on
    pub bastard: bool,
    /// Conflict that means "replaces"
    pub obsoletes: bool,
}

/// A capability a package provides
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub version: Option<RpmVersion>,
}

impl Capability {
    /// Parse `name` or `name = evr`
    pub fn parse(s: &str) -> Result<Self> {
        let req = CapReq::parse(s)?;
        match req.relation {
            Relation::Any | Relation::Eq => Ok(Self {
                name: req.name,
                version: req.version,
            }),
            _ => Err(Error::InvalidCapability(s.to_string())),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} = {}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A capability expression: requirement, conflict, obsoletes or suggestion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapReq {
    pub name: String,
    pub relation: Relation,
    pub version: Option<RpmVersion>,
    pub flags: CapReqFlags,
}

impl CapReq {
    /// Unversioned expression on `name`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let flags = CapReqFlags {
            rpmlib: name.starts_with("rpmlib("),
            ..Default::default()
        };
        Self {
            name,
            relation: Relation::Any,
            version: None,
            flags,
        }
    }

    /// Parse `name` or `name op evr`
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [name] => Ok(Self::new(*name)),
            [name, op, evr] => {
                let relation =
                    Relation::parse(op).ok_or_else(|| Error::InvalidCapability(s.to_string()))?;
                let version = RpmVersion::parse(evr)
                    .map_err(|_| Error::InvalidCapability(s.to_string()))?;
                let mut req = Self::new(*name);
                req.relation = relation;
                req.version = Some(version);
                Ok(req)
            }
            _ => Err(Error::InvalidCapability(s.to_string())),
        }
    }

    pub fn with_flags(mut self, flags: CapReqFlags) -> Self {
        let rpmlib = self.flags.rpmlib;
        self.flags = flags;
        self.flags.rpmlib |= rpmlib;
        self
    }

    /// Whether the resolver acts on this requirement during install
    pub fn is_hard(&self) -> bool {
        !(self.flags.weak || self.flags.rpmlib || self.flags.bastard || self.flags.prereq_un)
    }

    /// Match against a provided name and optional version
    ///
    /// An unversioned provide satisfies any versioned expression on its name.
    pub fn matches(&self, name: &str, provided: Option<&RpmVersion>, policy: EpochPolicy) -> bool {
        if self.name != name {
            return false;
        }
        match (&self.version, provided) {
            (None, _) | (_, None) => true,
            (Some(required), Some(provided)) => self
                .relation
                .accepts(provided.compare_with(required, policy)),
        }
    }

    pub fn matches_capability(&self, cap: &Capability, policy: EpochPolicy) -> bool {
        self.matches(&cap.name, cap.version.as_ref(), policy)
    }
}

impl fmt::Display for CapReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ref v) = self.version {
            write!(f, " {} {}", self.relation.as_str(), v)?;
        }
        Ok(())
    }
}

/// A package in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: RpmVersion,
    pub arch: Option<String>,
    /// Multilib discriminator; 0 means colorless
    pub color: u32,
    /// Explicit provides, not counting the self capability
    pub provides: Vec<Capability>,
    pub requires: Vec<CapReq>,
    /// Boolean requirements, always hard
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rich_requires: Vec<BoolDep>,
    /// Conflicts, including obsoletes (flagged)
    pub conflicts: Vec<CapReq>,
    pub suggests: Vec<CapReq>,
    pub installed: bool,
    /// Source priority; higher is preferred as a provider
    pub priority: i32,
}

impl Package {
    /// Bare package with no dependencies
    pub fn new(name: impl Into<String>, version: RpmVersion) -> Self {
        Self {
            name: name.into(),
            version,
            arch: None,
            color: 0,
            provides: Vec::new(),
            requires: Vec::new(),
            rich_requires: Vec::new(),
            conflicts: Vec::new(),
            suggests: Vec::new(),
            installed: false,
            priority: 0,
        }
    }

    /// The implicit `name = evr` capability
    pub fn self_capability(&self) -> Capability {
        Capability {
            name: self.name.clone(),
            version: Some(self.version.clone()),
        }
    }

    /// Whether this package provides something matching `req`
    pub fn satisfies(&self, req: &CapReq, policy: EpochPolicy) -> bool {
        req.matches(&self.name, Some(&self.version), policy)
            || self
                .provides
                .iter()
                .any(|cap| req.matches_capability(cap, policy))
    }

    /// Same name+epoch+version+release+arch
    pub fn same_identity(&self, other: &Package) -> bool {
        self.name == other.name && self.version == other.version && self.arch == other.arch
    }

    /// Same name, and with multilib also the same arch
    pub fn is_kind_of(&self, other: &Package, multilib: bool) -> bool {
        self.name == other.name && (!multilib || self.arch == other.arch)
    }

    /// Colorless packages are compatible with everything
    pub fn is_colored_like(&self, other: &Package) -> bool {
        self.color == 0 || other.color == 0 || self.color & other.color != 0
    }

    /// Obsoletes expressions matching `other` by name and version
    pub fn obsoletes(&self, other: &Package, policy: EpochPolicy) -> bool {
        self.conflicts.iter().any(|c| {
            c.flags.obsoletes && c.matches(&other.name, Some(&other.version), policy)
        })
    }

    /// First plain conflict (not obsoletes) of this package matched by `other`
    pub fn conflict_with(&self, other: &Package, policy: EpochPolicy) -> Option<&CapReq> {
        self.conflicts
            .iter()
            .filter(|c| !c.flags.obsoletes)
            .find(|c| other.satisfies(c, policy))
    }

    /// Requirements the install closure resolves
    pub fn hard_requirements(&self) -> impl Iterator<Item = (usize, &CapReq)> {
        self.requires.iter().enumerate().filter(|(_, r)| r.is_hard())
    }

    /// Compare by version only, newest last
    pub fn compare_version(&self, other: &Package) -> Ordering {
        self.version.compare(&other.version)
    }

    /// `name-[epoch:]version-release`
    pub fn nevr(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)?;
        if let Some(ref arch) = self.arch {
            write!(f, ".{}", arch)?;
        }
        Ok(())
    }
}
