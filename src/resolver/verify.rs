// src/resolver/verify.rs

//! Final checks over a marked set
//!
//! The closure engine reports what it finds while marking; this pass checks
//! the finished set once more so that forced or partial runs still come with
//! a complete report. Checks look at presence after the transaction:
//! install-marked packages plus installed packages not marked for removal.

use super::ResolverContext;
use super::graph::OrderGraph;
use super::mark::MarkSet;
use super::problem::{Problem, ProblemSet};
use crate::args::{ArgFlags, ArgResolver};
use crate::catalog::{CapabilityIndex, Catalog};
use crate::package::{CapReq, DepCost, PackageId};
use std::collections::HashSet;
use tracing::{debug, trace};

/// File-level checks, supplied by whoever owns the file index
///
/// Implementations return problems of the file classes only; the resolver
/// takes care of classification and deduplication.
pub trait FileVerifier {
    /// Paths owned by more than one package present after the transaction
    fn verify_file_conflicts(&self, catalog: &Catalog, marks: &MarkSet<'_>) -> Vec<Problem>;

    /// Paths left behind without an owning directory
    fn verify_file_orphans(&self, catalog: &Catalog, marks: &MarkSet<'_>) -> Vec<Problem>;
}

/// Check every package of `scope` against the present set for conflicts
///
/// Both directions are checked. A pair where one side obsoletes the other is
/// accepted. Returns the number of conflicting pairs found; pairs already
/// reported by the closure are counted but not reported again.
pub fn verify_conflicts(
    index: &CapabilityIndex<'_>,
    marks: &MarkSet<'_>,
    scope: &[PackageId],
    problems: &mut ProblemSet,
) -> usize {
    let catalog = index.catalog();
    let policy = index.policy();
    let mut pairs: HashSet<(PackageId, PackageId)> = HashSet::new();

    for &p in scope {
        let pkg = &catalog[p];

        let own = pkg
            .conflicts
            .iter()
            .filter(|c| !c.flags.obsoletes)
            .flat_map(|c| index.find(c).into_iter().map(move |q| (q, c)));
        let foreign = index
            .conflicting_with(p)
            .into_iter()
            .filter_map(|q| catalog[q].conflict_with(pkg, policy).map(|c| (q, c)));

        for (q, conflict) in own.chain(foreign) {
            if q == p || !marks.is_present(q) {
                continue;
            }
            let other = &catalog[q];
            if pkg.obsoletes(other, policy) || other.obsoletes(pkg, policy) {
                continue;
            }
            let key = (p.min(q), p.max(q));
            if !pairs.insert(key) {
                continue;
            }

            let (a, b) = (pkg.to_string(), other.to_string());
            trace!("{} conflicts with {} ({})", a, b, conflict);
            if !problems.has_conflict_between(&a, &b) {
                problems.push(Problem::UnresolvableConflict {
                    package: a,
                    conflicting_package: b,
                    conflict: conflict.to_string(),
                });
            }
        }
    }

    if !pairs.is_empty() {
        debug!("{} conflicting pair(s) in the final set", pairs.len());
    }
    pairs.len()
}

/// Provider costs over a settled mark set: present or not
pub(crate) struct PresentCost<'r, 'i, 'm> {
    pub index: &'r CapabilityIndex<'i>,
    pub marks: &'r MarkSet<'m>,
}

impl DepCost for PresentCost<'_, '_, '_> {
    fn providers(&self, req: &CapReq) -> Vec<PackageId> {
        self.index.find(req)
    }

    fn cost(&self, id: PackageId) -> u32 {
        if self.marks.is_present(id) { 0 } else { 1 }
    }
}

/// Check that every hard requirement of `scope` has a present provider
/// and every boolean requirement holds
///
/// Returns the number of unsatisfied requirements.
pub fn verify_requirements(
    index: &CapabilityIndex<'_>,
    marks: &MarkSet<'_>,
    scope: &[PackageId],
    problems: &mut ProblemSet,
) -> usize {
    let catalog = index.catalog();
    let policy = index.policy();
    let mut unsatisfied = 0;

    for &p in scope {
        let pkg = &catalog[p];
        for (_, req) in pkg.hard_requirements() {
            if pkg.satisfies(req, policy) || index.find(req).into_iter().any(|q| marks.is_present(q)) {
                continue;
            }
            unsatisfied += 1;
            report_unsatisfied(problems, pkg.to_string(), req.to_string());
        }
        let present = PresentCost { index, marks };
        for dep in &pkg.rich_requires {
            if dep.is_met(&present) {
                continue;
            }
            unsatisfied += 1;
            report_unsatisfied(problems, pkg.to_string(), dep.to_string());
        }
    }

    unsatisfied
}

fn report_unsatisfied(problems: &mut ProblemSet, package: String, requirement: String) {
    if !problems.has_unsatisfied(&package, &requirement) {
        problems.push(Problem::UnsatisfiedRequirement {
            package,
            requirement,
            removed_provider: None,
        });
    }
}

/// Whether `order` installs every Requires(pre) provider before its
/// dependent, over the install-marked set
pub fn verify_order(index: &CapabilityIndex<'_>, marks: &MarkSet<'_>, order: &[PackageId]) -> bool {
    let nodes: Vec<PackageId> = marks.install_marked().collect();
    OrderGraph::build(index, &nodes).respects_prereqs(order)
}

/// Pick the installed packages a verify transaction checks
///
/// No tokens means every installed package.
pub(crate) fn select_installed<S: AsRef<str>>(
    ctx: &mut ResolverContext<'_, '_>,
    tokens: &[S],
) -> Option<Vec<PackageId>> {
    if tokens.is_empty() {
        return Some(ctx.catalog.installed().map(|(id, _)| id).collect());
    }

    let resolved = ArgResolver::new(&ctx.index)
        .with_flags(ArgFlags::default().with_caplookup(ctx.tx.options.caplookup()))
        .with_scope(|_, p| p.installed)
        .resolve(tokens);

    if !resolved.is_ok() {
        for issue in resolved.issues {
            ctx.problems.push(issue.into());
        }
        return None;
    }

    debug!("Verifying {} installed package(s)", resolved.packages.len());
    Some(resolved.packages)
}
