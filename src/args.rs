// src/args.rs

//! Argument resolution
//!
//! Turns user tokens into catalog packages. A token is tried, in order, as:
//!
//! 1. `*`, every package in scope
//! 2. an exact package name
//! 3. `name-version[-release]`
//! 4. a shell-style mask against the name and `name-version-release[.arch]`
//! 5. in exact mode, a name prefix (`foo` finds `foo-bar`)
//! 6. with capability lookup enabled, a capability expression
//!
//! A leading `~` or `!` marks a token optional: finding nothing is not an
//! error.

use crate::catalog::{CapabilityIndex, Catalog};
use crate::package::{CapReq, Package, PackageId};
use crate::version::{EpochPolicy, RpmVersion};
use glob::Pattern;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, trace};

/// Resolution mode switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArgFlags {
    /// A token matching nothing is not an error
    pub missing_ok: bool,
    /// Fall back to capability lookup
    pub caplookup: bool,
    /// Several packages for one token is an error
    pub exact: bool,
    /// Keep only the newest package per name instead of reporting ambiguity
    pub unambiguous: bool,
}

impl ArgFlags {
    pub fn exact() -> Self {
        Self {
            exact: true,
            ..Default::default()
        }
    }

    pub fn with_missing_ok(mut self, on: bool) -> Self {
        self.missing_ok = on;
        self
    }

    pub fn with_caplookup(mut self, on: bool) -> Self {
        self.caplookup = on;
        self
    }

    pub fn with_unambiguous(mut self, on: bool) -> Self {
        self.unambiguous = on;
        self
    }
}

/// Why a token did not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgIssue {
    NoMatch { token: String },
    Ambiguous { token: String, candidates: Vec<String> },
    InvalidMask { token: String, reason: String },
}

impl fmt::Display for ArgIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgIssue::NoMatch { token } => write!(f, "{}: no such package", token),
            ArgIssue::Ambiguous { token, candidates } => {
                write!(f, "{}: ambiguous name ({})", token, candidates.join(", "))
            }
            ArgIssue::InvalidMask { token, reason } => {
                write!(f, "{}: invalid mask: {}", token, reason)
            }
        }
    }
}

/// Output of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedArgs {
    /// Matched packages, deduplicated, in canonical order
    pub packages: Vec<PackageId>,
    pub issues: Vec<ArgIssue>,
}

impl ResolvedArgs {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

type Scope<'a> = Box<dyn Fn(PackageId, &Package) -> bool + Send + Sync + 'a>;

/// Resolves tokens against the packages of a catalog accepted by a scope
pub struct ArgResolver<'a> {
    index: &'a CapabilityIndex<'a>,
    flags: ArgFlags,
    scope: Scope<'a>,
}

impl<'a> ArgResolver<'a> {
    pub fn new(index: &'a CapabilityIndex<'a>) -> Self {
        Self {
            index,
            flags: ArgFlags::default(),
            scope: Box::new(|_, _| true),
        }
    }

    pub fn with_flags(mut self, flags: ArgFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Restrict matches to packages accepted by `scope`
    pub fn with_scope<F>(mut self, scope: F) -> Self
    where
        F: Fn(PackageId, &Package) -> bool + Send + Sync + 'a,
    {
        self.scope = Box::new(scope);
        self
    }

    fn catalog(&self) -> &'a Catalog {
        self.index.catalog()
    }

    fn in_scope(&self, ids: &[PackageId]) -> Vec<PackageId> {
        let catalog = self.catalog();
        ids.iter()
            .copied()
            .filter(|&id| (self.scope)(id, &catalog[id]))
            .collect()
    }

    /// Resolve every token; issues are collected per token
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> ResolvedArgs {
        let mut packages = BTreeSet::new();
        let mut issues = Vec::new();

        for token in tokens {
            match self.resolve_token(token.as_ref()) {
                Ok(ids) => packages.extend(ids),
                Err(issue) => {
                    debug!("{}", issue);
                    issues.push(issue);
                }
            }
        }

        ResolvedArgs {
            packages: packages.into_iter().collect(),
            issues,
        }
    }

    /// Resolve a single token
    pub fn resolve_token(&self, raw: &str) -> Result<Vec<PackageId>, ArgIssue> {
        let raw = raw.trim();
        let (optional, token) = match raw.strip_prefix(['~', '!']) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let token = token.strip_prefix('@').unwrap_or(token);
        let token = match token.strip_suffix('-') {
            Some(rest) if !rest.is_empty() => rest,
            _ => token,
        };

        if token == "*" {
            let all: Vec<PackageId> = self.catalog().ids().collect();
            return Ok(self.in_scope(&all));
        }

        let named = self.in_scope(self.catalog().by_name(token));
        if !named.is_empty() {
            trace!("{}: matched by name", token);
            return self.finish(token, named);
        }

        if !is_mask(token) {
            let found = self.by_name_version(token);
            if !found.is_empty() {
                trace!("{}: matched by name-version", token);
                return self.finish(token, found);
            }
        } else {
            let pattern = Pattern::new(token).map_err(|e| ArgIssue::InvalidMask {
                token: token.to_string(),
                reason: e.msg.to_string(),
            })?;
            let found = self.by_mask(&pattern);
            if !found.is_empty() {
                trace!("{}: matched {} package(s) by mask", token, found.len());
                return Ok(self.newest_per_name(found));
            }
        }

        if self.flags.exact {
            let found = self.by_prefix(token);
            if !found.is_empty() {
                trace!("{}: matched by name prefix", token);
                return self.finish(token, found);
            }
        }

        if self.flags.caplookup
            && let Ok(req) = CapReq::parse(token)
        {
            let found = self.in_scope(&self.index.find(&req));
            if let Some(&best) = found.first() {
                debug!("{}: resolved by capability to {}", token, self.catalog()[best]);
                return Ok(vec![best]);
            }
        }

        if optional || self.flags.missing_ok {
            debug!("{}: no match, skipped", token);
            return Ok(Vec::new());
        }

        Err(ArgIssue::NoMatch {
            token: token.to_string(),
        })
    }

    fn finish(&self, token: &str, ids: Vec<PackageId>) -> Result<Vec<PackageId>, ArgIssue> {
        let ids = self.newest_per_name(ids);
        if self.flags.exact && ids.len() > 1 {
            let catalog = self.catalog();
            return Err(ArgIssue::Ambiguous {
                token: token.to_string(),
                candidates: ids.iter().map(|&id| catalog[id].to_string()).collect(),
            });
        }
        Ok(ids)
    }

    /// With `unambiguous`, keep the newest package of each name
    fn newest_per_name(&self, mut ids: Vec<PackageId>) -> Vec<PackageId> {
        if !self.flags.unambiguous {
            return ids;
        }
        let catalog = self.catalog();
        ids.sort();
        // Canonical order puts the newest of each name first
        ids.dedup_by(|b, a| {
            catalog[*a].name == catalog[*b].name
                && catalog[*a].compare_version(&catalog[*b]) != Ordering::Less
        });
        ids
    }

    fn by_name_version(&self, token: &str) -> Vec<PackageId> {
        let catalog = self.catalog();
        for (pos, _) in token.rmatch_indices('-') {
            let (name, rest) = (&token[..pos], &token[pos + 1..]);
            let named = self.in_scope(catalog.by_name(name));
            if named.is_empty() {
                continue;
            }
            let Ok(wanted) = RpmVersion::parse(rest) else {
                continue;
            };
            let found: Vec<PackageId> = named
                .into_iter()
                .filter(|&id| {
                    wanted.compare_with(&catalog[id].version, EpochPolicy::Promote)
                        == Ordering::Equal
                })
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    fn by_mask(&self, pattern: &Pattern) -> Vec<PackageId> {
        self.catalog()
            .iter()
            .filter(|(id, p)| (self.scope)(*id, p))
            .filter(|(_, p)| {
                pattern.matches(&p.name)
                    || pattern.matches(&p.nevr())
                    || pattern.matches(&p.to_string())
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn by_prefix(&self, token: &str) -> Vec<PackageId> {
        let prefix = format!("{}-", token);
        let catalog = self.catalog();
        let ids: Vec<PackageId> = catalog
            .names()
            .filter(|name| name.starts_with(&prefix))
            .flat_map(|name| catalog.by_name(name).iter().copied())
            .collect();
        self.in_scope(&ids)
    }
}

fn is_mask(token: &str) -> bool {
    token.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogManifest, PackageRecord};

    fn catalog() -> Catalog {
        CatalogManifest {
            available: vec![
                PackageRecord::new("foo-bar", "1.0", "1"),
                PackageRecord::new("foo-baz", "1.0", "1"),
                PackageRecord::new("vim", "9.0", "1"),
                PackageRecord::new("vim", "9.1", "2"),
                PackageRecord::new("postfix", "3.8", "1").with_provides("mta"),
            ],
            installed: vec![PackageRecord::new("vim", "8.2", "1")],
        }
        .into_catalog()
        .unwrap()
    }

    fn names(catalog: &Catalog, ids: &[PackageId]) -> Vec<String> {
        ids.iter().map(|&id| catalog[id].to_string()).collect()
    }

    #[test]
    fn test_exact_name_lists_all_versions() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index);

        let resolved = resolver.resolve(&["vim"]);
        assert!(resolved.is_ok());
        assert_eq!(names(&c, &resolved.packages), vec!["vim-9.1-2", "vim-9.0-1", "vim-8.2-1"]);
    }

    #[test]
    fn test_exact_mode_ambiguous_versions() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index)
            .with_flags(ArgFlags::exact())
            .with_scope(|_, p| !p.installed);

        let resolved = resolver.resolve(&["vim"]);
        assert!(resolved.packages.is_empty());
        assert!(matches!(resolved.issues[0], ArgIssue::Ambiguous { .. }));

        let resolver = resolver.with_flags(ArgFlags::exact().with_unambiguous(true));
        let resolved = resolver.resolve(&["vim"]);
        assert_eq!(names(&c, &resolved.packages), vec!["vim-9.1-2"]);
    }

    #[test]
    fn test_exact_mode_ambiguous_prefix() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index)
            .with_flags(ArgFlags::exact().with_unambiguous(true));

        let resolved = resolver.resolve(&["foo"]);
        assert!(resolved.packages.is_empty());
        match &resolved.issues[0] {
            ArgIssue::Ambiguous { token, candidates } => {
                assert_eq!(token, "foo");
                assert_eq!(candidates, &vec!["foo-bar-1.0-1", "foo-baz-1.0-1"]);
            }
            other => panic!("unexpected issue {:?}", other),
        }
    }

    #[test]
    fn test_name_version_release() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index).with_scope(|_, p| !p.installed);

        let resolved = resolver.resolve(&["vim-9.0"]);
        assert_eq!(names(&c, &resolved.packages), vec!["vim-9.0-1"]);

        let resolved = resolver.resolve(&["foo-bar-1.0-1"]);
        assert_eq!(names(&c, &resolved.packages), vec!["foo-bar-1.0-1"]);

        let resolved = resolver.resolve(&["vim-7.0"]);
        assert!(matches!(resolved.issues[0], ArgIssue::NoMatch { .. }));
    }

    #[test]
    fn test_masks() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index).with_scope(|_, p| !p.installed);

        let resolved = resolver.resolve(&["foo-*"]);
        assert_eq!(names(&c, &resolved.packages), vec!["foo-bar-1.0-1", "foo-baz-1.0-1"]);

        let resolved = resolver.resolve(&["vim-9.1*"]);
        assert_eq!(names(&c, &resolved.packages), vec!["vim-9.1-2"]);

        let resolved = resolver.resolve(&["*"]);
        assert_eq!(resolved.packages.len(), 5);

        let resolved = resolver.resolve(&["[foo"]);
        assert!(matches!(resolved.issues[0], ArgIssue::InvalidMask { .. }));
    }

    #[test]
    fn test_optional_and_missing_ok() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index);

        assert!(resolver.resolve(&["~nothing", "!nothing"]).is_ok());
        assert!(!resolver.resolve(&["nothing"]).is_ok());

        let resolver = resolver.with_flags(ArgFlags::default().with_missing_ok(true));
        assert!(resolver.resolve(&["nothing"]).is_ok());
    }

    #[test]
    fn test_caplookup() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index);
        assert!(!resolver.resolve(&["mta"]).is_ok());

        let resolver = resolver.with_flags(ArgFlags::default().with_caplookup(true));
        let resolved = resolver.resolve(&["mta"]);
        assert_eq!(names(&c, &resolved.packages), vec!["postfix-3.8-1"]);
    }

    #[test]
    fn test_output_deduplicated() {
        let c = catalog();
        let index = CapabilityIndex::build(&c);
        let resolver = ArgResolver::new(&index);
        let resolved = resolver.resolve(&["postfix", "post*", "postfix-3.8"]);
        assert_eq!(resolved.packages.len(), 1);
    }
}
