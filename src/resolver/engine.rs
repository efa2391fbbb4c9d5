// src/resolver/engine.rs

//! Install closure
//!
//! Hand-marked packages seed a work queue of requirements. Each item is
//! resolved against what is already present, or by dependency-marking the
//! best provider. Every newly marked package is evaluated exactly once:
//! it replaces installed packages of its kind and follows its obsoletes.
//! Removals feed orphaned requirements of the remaining installed packages
//! back into the queue.
//!
//! Conflicts are looked at only once the queue has drained, since a later
//! mark may still take the other side out of the present set. At that point
//! a greedy run may upgrade an installed package out of the way; whatever is
//! left is reported by the final verification.
//!
//! Greedy actions (unmarking an obsoleted dependency, upgrading an installed
//! package to get rid of a conflict or an orphan) draw from a fixed budget,
//! so the closure always terminates.

use super::ResolverContext;
use super::problem::Problem;
use crate::args::{ArgFlags, ArgResolver};
use crate::ask::{EquivalentChoice, SuggestsChoice};
use crate::package::{CapReq, DepCost, Package, PackageId, UNSATISFIABLE};
use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, trace, warn};

/// One unit of closure work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WorkItem {
    /// Requirement `req` (index into `requires`) of an install-marked package
    Require { pkg: PackageId, req: usize },
    /// Requirement of a kept installed package whose provider `removed` is
    /// being removed
    Orphan {
        pkg: PackageId,
        req: usize,
        removed: PackageId,
    },
    /// Boolean requirement (index into `rich_requires`); `removed` is set
    /// for a kept installed package losing a provider
    Rich {
        pkg: PackageId,
        req: usize,
        removed: Option<PackageId>,
    },
}

/// Resolve install tokens and run the closure over them
///
/// Returns `None` when the tokens themselves did not resolve; nothing is
/// marked in that case.
pub(crate) fn run_install<S: AsRef<str>>(
    ctx: &mut ResolverContext<'_, '_>,
    tokens: &[S],
) -> Option<Vec<PackageId>> {
    let catalog = ctx.catalog;
    let tx = ctx.tx;
    let opts = &tx.options;

    let resolved = {
        let marks = &ctx.marks;
        ArgResolver::new(&ctx.index)
            .with_flags(
                ArgFlags::exact()
                    .with_unambiguous(true)
                    .with_caplookup(opts.caplookup()),
            )
            .with_scope(move |id, p| !p.installed && !marks.is_ignored(id))
            .resolve(tokens)
    };

    if !resolved.is_ok() {
        for issue in resolved.issues {
            ctx.problems.push(issue.into());
        }
        return None;
    }

    let mut closure = InstallClosure::new(opts.greedy_depth());
    for id in resolved.packages {
        if catalog.installed_twin(id).is_some() {
            warn!("{} is already installed", catalog[id]);
            continue;
        }
        closure.hand_mark(ctx, id);
    }
    closure.run(ctx);

    Some(Vec::new())
}

struct InstallClosure {
    queue: VecDeque<WorkItem>,
    queued: HashSet<WorkItem>,
    evaluated: HashSet<PackageId>,
    offered: HashSet<PackageId>,
    /// Marked packages whose conflicts are still to be looked at
    unchecked: Vec<PackageId>,
    /// Obsoletes that could not be followed: (obsoleter, obsoleted, text)
    unfollowed: Vec<(PackageId, PackageId, String)>,
    greedy_left: u32,
}

impl InstallClosure {
    fn new(greedy_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            evaluated: HashSet::new(),
            offered: HashSet::new(),
            unchecked: Vec::new(),
            unfollowed: Vec::new(),
            greedy_left: greedy_depth,
        }
    }

    fn enqueue(&mut self, item: WorkItem) {
        if self.queued.insert(item) {
            self.queue.push_back(item);
        }
    }

    /// Queue an item again even if it was seen before
    fn requeue(&mut self, item: WorkItem) {
        self.queued.remove(&item);
        self.enqueue(item);
    }

    fn spend_greedy(&mut self) -> bool {
        if self.greedy_left == 0 {
            debug!("Greedy budget exhausted");
            return false;
        }
        self.greedy_left -= 1;
        true
    }

    fn hand_mark(&mut self, ctx: &mut ResolverContext<'_, '_>, id: PackageId) {
        if ctx.marks.mark_install(id, false) {
            debug!("{} marked for install", ctx.catalog[id]);
            self.on_marked(ctx, id);
        } else if let Some(blocker) = ctx.marks.install_blocker(id) {
            conflict(ctx, id, blocker, "same package name");
        }
    }

    fn run(&mut self, ctx: &mut ResolverContext<'_, '_>) {
        loop {
            while let Some(item) = self.queue.pop_front() {
                if ctx.poll_interrupt() {
                    return;
                }
                match item {
                    WorkItem::Require { pkg, req } => self.resolve_requirement(ctx, pkg, req),
                    WorkItem::Orphan { pkg, req, removed } => {
                        self.resolve_orphan(ctx, pkg, req, removed)
                    }
                    WorkItem::Rich { pkg, req, removed } => {
                        self.resolve_rich(ctx, pkg, req, removed)
                    }
                }
            }
            if ctx.interrupted {
                break;
            }
            if !self.unchecked.is_empty() {
                for id in std::mem::take(&mut self.unchecked) {
                    if ctx.marks.is_marked_install(id) {
                        self.check_conflicts(ctx, id);
                    }
                }
                continue;
            }
            if !self.offer_suggests(ctx) {
                break;
            }
        }
        if !ctx.interrupted {
            self.report_unfollowed(ctx);
        }
    }

    /// Report obsoletes left unfollowed whose sides both stay present
    fn report_unfollowed(&mut self, ctx: &mut ResolverContext<'_, '_>) {
        for (id, o, text) in std::mem::take(&mut self.unfollowed) {
            if ctx.marks.is_marked_install(id) && ctx.marks.is_present(o) {
                conflict(ctx, id, o, &text);
            }
        }
    }

    fn resolve_requirement(&mut self, ctx: &mut ResolverContext<'_, '_>, pkg: PackageId, ri: usize) {
        if !ctx.marks.is_marked_install(pkg) {
            return;
        }
        let catalog = ctx.catalog;
        let package = &catalog[pkg];
        let req = &package.requires[ri];

        if package.satisfies(req, ctx.index.policy()) {
            trace!("{}: {} provided by itself", package, req);
            return;
        }
        let providers = ctx.index.find(req);
        if let Some(&q) = providers.iter().find(|&&q| ctx.marks.is_present(q)) {
            trace!("{}: {} satisfied by {}", package, req, catalog[q]);
            return;
        }
        if !ctx.tx.options.follow() {
            unsatisfied(ctx, pkg, req, None);
            return;
        }

        if let Some(chosen) = self.select_provider(ctx, pkg, req, &providers, None)
            && ctx.marks.mark_install(chosen, true)
        {
            debug!("{} marked as dependency of {} ({})", catalog[chosen], package, req);
            self.on_marked(ctx, chosen);
        }
    }

    /// Pick a provider to dependency-mark; reports when there is none
    fn select_provider(
        &mut self,
        ctx: &mut ResolverContext<'_, '_>,
        requester: PackageId,
        req: &CapReq,
        providers: &[PackageId],
        removed: Option<PackageId>,
    ) -> Option<PackageId> {
        let catalog = ctx.catalog;
        let tx = ctx.tx;
        let requiring = &catalog[requester];

        let mut candidates: Vec<PackageId> = providers
            .iter()
            .copied()
            .filter(|&c| {
                ctx.marks.can_mark_install(c, true)
                    && !is_obsoleted(ctx, c)
                    && !replaces_held(ctx, c)
            })
            .collect();

        if tx.options.multilib() && candidates.iter().any(|&c| catalog[c].is_colored_like(requiring)) {
            candidates.retain(|&c| catalog[c].is_colored_like(requiring));
        }

        match candidates.as_slice() {
            [] => {
                unsatisfied(ctx, requester, req, removed);
                None
            }
            [only] => Some(*only),
            _ if tx.options.choose_equivalents() => {
                let pkgs: Vec<&Package> = candidates.iter().map(|&c| &catalog[c]).collect();
                match tx.ask().choose_equivalent(req, &pkgs, 0) {
                    EquivalentChoice::Chosen(i) if i < candidates.len() => Some(candidates[i]),
                    EquivalentChoice::Chosen(i) => {
                        warn!("{}: choice {} out of range, taking the default", req, i);
                        ctx.problems.push(Problem::AmbiguousProvider {
                            requirement: req.to_string(),
                            candidates: pkgs.iter().map(|p| p.to_string()).collect(),
                        });
                        Some(candidates[0])
                    }
                    EquivalentChoice::Abort => {
                        ctx.problems.push(Problem::AbortedByUser {
                            context: format!("choosing a provider of {} for {}", req, requiring),
                        });
                        None
                    }
                }
            }
            _ => {
                debug!(
                    "{}: {} equivalent providers, taking {}",
                    req,
                    candidates.len(),
                    catalog[candidates[0]]
                );
                Some(candidates[0])
            }
        }
    }

    /// Evaluate a newly install-marked package, once
    fn on_marked(&mut self, ctx: &mut ResolverContext<'_, '_>, id: PackageId) {
        if !self.evaluated.insert(id) {
            return;
        }
        if !ctx.tx.options.no_deps() {
            for (req, _) in ctx.catalog[id].hard_requirements() {
                self.enqueue(WorkItem::Require { pkg: id, req });
            }
            for req in 0..ctx.catalog[id].rich_requires.len() {
                self.enqueue(WorkItem::Rich {
                    pkg: id,
                    req,
                    removed: None,
                });
            }
        }
        self.replace_installed(ctx, id);
        self.process_obsoletes(ctx, id);
        self.unchecked.push(id);
    }

    /// Remove-mark installed packages of the same kind as `id`
    fn replace_installed(&mut self, ctx: &mut ResolverContext<'_, '_>, id: PackageId) {
        let tx = ctx.tx;
        let opts = &tx.options;
        if opts.allow_duplicates() {
            return;
        }
        let catalog = ctx.catalog;
        let pkg = &catalog[id];

        let old: Vec<PackageId> = catalog
            .by_name(&pkg.name)
            .iter()
            .copied()
            .filter(|&o| {
                o != id
                    && ctx.marks.is_kept_installed(o)
                    && catalog[o].is_kind_of(pkg, opts.multilib())
            })
            .collect();

        for o in old {
            if ctx.marks.mark_replaced(o) {
                info!("{} replaces {}", pkg, catalog[o]);
                self.on_removed(ctx, o);
            }
        }
    }

    fn process_obsoletes(&mut self, ctx: &mut ResolverContext<'_, '_>, id: PackageId) {
        let tx = ctx.tx;
        let opts = &tx.options;
        if !opts.obsoletes() {
            return;
        }
        let catalog = ctx.catalog;
        let policy = ctx.index.policy();
        let pkg = &catalog[id];
        let can_follow = opts.follow() || opts.greedy();

        let mut obsoleted: Vec<(PackageId, &CapReq)> = Vec::new();
        for obs in pkg.conflicts.iter().filter(|c| c.flags.obsoletes) {
            for &o in catalog.by_name(&obs.name) {
                if o != id
                    && obs.matches(&catalog[o].name, Some(&catalog[o].version), policy)
                    && !obsoleted.iter().any(|(seen, _)| *seen == o)
                {
                    obsoleted.push((o, obs));
                }
            }
        }

        for (o, obs) in obsoleted {
            if ctx.marks.is_kept_installed(o) {
                if can_follow {
                    if ctx.marks.mark_replaced(o) {
                        info!("{} obsoletes {}", pkg, catalog[o]);
                        self.on_removed(ctx, o);
                    }
                } else {
                    self.unfollowed.push((id, o, obs.to_string()));
                }
            } else if ctx.marks.is_marked_install(o) {
                if ctx.marks.is_hand_marked(o) || !can_follow || !self.spend_greedy() {
                    self.unfollowed.push((id, o, obs.to_string()));
                    continue;
                }
                info!("{} obsoletes {}, unmarking it", pkg, catalog[o]);
                ctx.marks.unmark(o);
                self.evaluated.remove(&o);
                self.on_removed(ctx, o);
            }
        }
    }

    /// Look at plain conflicts of `id` against the present set, both ways
    ///
    /// Only tries greedy upgrades of installed packages; reporting is left to
    /// the final verification, which sees the settled present set.
    fn check_conflicts(&mut self, ctx: &mut ResolverContext<'_, '_>, id: PackageId) {
        let catalog = ctx.catalog;
        let tx = ctx.tx;
        let opts = &tx.options;
        let policy = ctx.index.policy();
        let pkg = &catalog[id];

        let mut found: Vec<(PackageId, String)> = Vec::new();
        for c in pkg.conflicts.iter().filter(|c| !c.flags.obsoletes) {
            for q in ctx.index.find(c) {
                if q != id && !found.iter().any(|(f, _)| *f == q) {
                    found.push((q, c.to_string()));
                }
            }
        }
        for q in ctx.index.conflicting_with(id) {
            if let Some(c) = catalog[q].conflict_with(pkg, policy)
                && !found.iter().any(|(f, _)| *f == q)
            {
                found.push((q, c.to_string()));
            }
        }

        for (q, text) in found {
            let other = &catalog[q];
            if !ctx.marks.is_present(q) || pkg.obsoletes(other, policy) || other.obsoletes(pkg, policy) {
                continue;
            }

            if other.installed
                && opts.greedy()
                && !ctx.marks.is_held(q)
                && let Some(up) = replacement_for(ctx, q, id)
                && self.spend_greedy()
                && ctx.marks.mark_install(up, true)
            {
                info!("Upgrading {} to {} to resolve conflict with {}", other, catalog[up], pkg);
                self.on_marked(ctx, up);
                continue;
            }

            debug!("{} conflicts with {} ({})", pkg, other, text);
        }
    }

    /// Follow up on an installed package leaving the present set
    fn on_removed(&mut self, ctx: &mut ResolverContext<'_, '_>, removed: PackageId) {
        if ctx.tx.options.no_deps() {
            return;
        }
        let catalog = ctx.catalog;
        let policy = ctx.index.policy();
        let gone = &catalog[removed];

        for (r, pkg) in catalog.installed() {
            if r == removed || !ctx.marks.is_kept_installed(r) {
                continue;
            }
            for (req, cap) in pkg.hard_requirements() {
                if gone.satisfies(cap, policy) && !pkg.satisfies(cap, policy) {
                    self.enqueue(WorkItem::Orphan { pkg: r, req, removed });
                }
            }
            for (req, dep) in pkg.rich_requires.iter().enumerate() {
                if dep.leaves().into_iter().any(|l| gone.satisfies(l, policy)) {
                    self.enqueue(WorkItem::Rich {
                        pkg: r,
                        req,
                        removed: Some(removed),
                    });
                }
            }
        }

        let marked: Vec<PackageId> = ctx.marks.install_marked().collect();
        for p in marked {
            for (req, cap) in catalog[p].hard_requirements() {
                if gone.satisfies(cap, policy) {
                    self.requeue(WorkItem::Require { pkg: p, req });
                }
            }
            for (req, dep) in catalog[p].rich_requires.iter().enumerate() {
                if dep.leaves().into_iter().any(|l| gone.satisfies(l, policy)) {
                    self.requeue(WorkItem::Rich {
                        pkg: p,
                        req,
                        removed: None,
                    });
                }
            }
        }
    }

    fn resolve_orphan(
        &mut self,
        ctx: &mut ResolverContext<'_, '_>,
        pkg: PackageId,
        ri: usize,
        removed: PackageId,
    ) {
        if !ctx.marks.is_kept_installed(pkg) {
            return;
        }
        let catalog = ctx.catalog;
        let orphan = &catalog[pkg];
        let req = &orphan.requires[ri];

        let providers = ctx.index.find(req);
        if let Some(&q) = providers.iter().find(|&&q| ctx.marks.is_present(q)) {
            trace!("{}: {} still satisfied by {}", orphan, req, catalog[q]);
            return;
        }

        let tx = ctx.tx;
        let opts = &tx.options;
        if opts.greedy()
            && !ctx.marks.is_held(pkg)
            && let Some(&up) = upgrades(ctx, pkg).first()
            && self.spend_greedy()
            && ctx.marks.mark_install(up, true)
        {
            info!(
                "Upgrading {} to {}, {} is being removed",
                orphan, catalog[up], catalog[removed]
            );
            self.on_marked(ctx, up);
            return;
        }

        if !opts.follow() {
            unsatisfied(ctx, pkg, req, Some(removed));
            return;
        }
        if let Some(chosen) = self.select_provider(ctx, pkg, req, &providers, Some(removed))
            && ctx.marks.mark_install(chosen, true)
        {
            debug!("{} marked for orphaned {} of {}", catalog[chosen], req, orphan);
            self.on_marked(ctx, chosen);
        }
    }

    /// Meet a boolean requirement, marking the cheapest providers it asks for
    ///
    /// `removed` is set when a kept installed package lost a provider.
    fn resolve_rich(
        &mut self,
        ctx: &mut ResolverContext<'_, '_>,
        pkg: PackageId,
        ri: usize,
        removed: Option<PackageId>,
    ) {
        let still_needed = match removed {
            None => ctx.marks.is_marked_install(pkg),
            Some(_) => ctx.marks.is_kept_installed(pkg),
        };
        if !still_needed {
            return;
        }
        let catalog = ctx.catalog;
        let package = &catalog[pkg];
        let dep = &package.rich_requires[ri];
        let label = CapReq::new(dep.to_string());

        let Some(needed) = dep.evaluate(&MarkCost(&*ctx)) else {
            unsatisfied(ctx, pkg, &label, removed);
            return;
        };
        for n in needed {
            if n.providers.iter().any(|&q| ctx.marks.is_present(q)) {
                continue;
            }
            if !ctx.tx.options.follow() {
                unsatisfied(ctx, pkg, &label, removed);
                return;
            }
            if let Some(chosen) = self.select_provider(ctx, pkg, &label, &n.providers, removed)
                && ctx.marks.mark_install(chosen, true)
            {
                debug!("{} marked as dependency of {} ({})", catalog[chosen], package, dep);
                self.on_marked(ctx, chosen);
            }
        }
    }

    /// Offer unsatisfied suggestions of hand-marked packages to the host
    ///
    /// Returns whether anything new was marked.
    fn offer_suggests(&mut self, ctx: &mut ResolverContext<'_, '_>) -> bool {
        if !ctx.tx.options.suggests() {
            return false;
        }
        let catalog = ctx.catalog;
        let tx = ctx.tx;
        let mut marked_any = false;

        let pending: Vec<PackageId> = ctx
            .marks
            .install_marked()
            .filter(|&id| ctx.marks.is_hand_marked(id) && !self.offered.contains(&id))
            .collect();

        for id in pending {
            self.offered.insert(id);
            if ctx.poll_interrupt() {
                break;
            }
            let pkg = &catalog[id];

            let mut suggested: Vec<PackageId> = Vec::new();
            for s in &pkg.suggests {
                let providers = ctx.index.find(s);
                if providers.iter().any(|&q| ctx.marks.is_present(q)) {
                    continue;
                }
                if let Some(&best) = providers
                    .iter()
                    .find(|&&c| ctx.marks.can_mark_install(c, false) && !suggested.contains(&c))
                {
                    suggested.push(best);
                }
            }
            if suggested.is_empty() {
                continue;
            }

            let pkgs: Vec<&Package> = suggested.iter().map(|&c| &catalog[c]).collect();
            let chosen: Vec<PackageId> = match tx.ask().choose_suggests(pkg, &pkgs) {
                SuggestsChoice::All => suggested.clone(),
                SuggestsChoice::None => Vec::new(),
                SuggestsChoice::Subset(picked) => picked
                    .into_iter()
                    .filter_map(|i| suggested.get(i).copied())
                    .collect(),
            };

            for c in chosen {
                if ctx.marks.mark_install(c, false) {
                    info!("{} marked as suggested by {}", catalog[c], pkg);
                    self.on_marked(ctx, c);
                    marked_any = true;
                }
            }
        }

        marked_any
    }
}

/// Provider costs while the closure runs: present is free, anything that
/// can still be dependency-marked costs one
struct MarkCost<'r, 'a, 'c>(&'r ResolverContext<'a, 'c>);

impl DepCost for MarkCost<'_, '_, '_> {
    fn providers(&self, req: &CapReq) -> Vec<PackageId> {
        self.0.index.find(req)
    }

    fn cost(&self, id: PackageId) -> u32 {
        if self.0.marks.is_present(id) {
            0
        } else if self.0.marks.can_mark_install(id, true) {
            1
        } else {
            UNSATISFIABLE
        }
    }
}

/// Marked for install but obsoleted by another install-marked package
fn is_obsoleted(ctx: &ResolverContext<'_, '_>, id: PackageId) -> bool {
    ctx.tx.options.obsoletes()
        && ctx
            .index
            .obsoleted_by(id)
            .into_iter()
            .any(|o| ctx.marks.is_marked_install(o))
}

/// Whether marking `id` would take down a held installed package
fn replaces_held(ctx: &ResolverContext<'_, '_>, id: PackageId) -> bool {
    let catalog = ctx.catalog;
    let opts = &ctx.tx.options;
    let policy = ctx.index.policy();
    let pkg = &catalog[id];

    let same_kind = !opts.allow_duplicates()
        && catalog.by_name(&pkg.name).iter().any(|&o| {
            ctx.marks.is_held(o) && ctx.marks.is_kept_installed(o) && catalog[o].is_kind_of(pkg, opts.multilib())
        });
    same_kind
        || (opts.obsoletes()
            && catalog
                .installed()
                .any(|(o, p)| ctx.marks.is_held(o) && ctx.marks.is_kept_installed(o) && pkg.obsoletes(p, policy)))
}

/// Newer available versions of installed `id` that can be dependency-marked,
/// newest first
fn upgrades(ctx: &ResolverContext<'_, '_>, id: PackageId) -> Vec<PackageId> {
    let catalog = ctx.catalog;
    let multilib = ctx.tx.options.multilib();
    let old = &catalog[id];
    catalog
        .by_name(&old.name)
        .iter()
        .copied()
        .filter(|&c| {
            let new = &catalog[c];
            !new.installed
                && new.is_kind_of(old, multilib)
                && new.compare_version(old) == Ordering::Greater
                && ctx.marks.can_mark_install(c, true)
        })
        .collect()
}

/// Replacement for installed `old` that does not conflict with `with`
///
/// A newer version of `old` is preferred over a package obsoleting it.
fn replacement_for(ctx: &ResolverContext<'_, '_>, old: PackageId, with: PackageId) -> Option<PackageId> {
    let catalog = ctx.catalog;
    let policy = ctx.index.policy();
    let pkg = &catalog[with];
    let clashes = |c: PackageId| {
        catalog[c].conflict_with(pkg, policy).is_some() || pkg.conflict_with(&catalog[c], policy).is_some()
    };

    let direct = upgrades(ctx, old).into_iter().find(|&c| !clashes(c));
    direct.or_else(|| {
        ctx.index.obsoleted_by(old).into_iter().find(|&c| {
            c != with
                && !catalog[c].installed
                && ctx.marks.can_mark_install(c, true)
                && !clashes(c)
        })
    })
}

fn unsatisfied(
    ctx: &mut ResolverContext<'_, '_>,
    pkg: PackageId,
    req: &CapReq,
    removed: Option<PackageId>,
) {
    let catalog = ctx.catalog;
    ctx.problems.push(Problem::UnsatisfiedRequirement {
        package: catalog[pkg].to_string(),
        requirement: req.to_string(),
        removed_provider: removed.map(|r| catalog[r].to_string()),
    });
}

fn conflict(ctx: &mut ResolverContext<'_, '_>, a: PackageId, b: PackageId, text: &str) {
    let (package, conflicting_package) = (ctx.name(a), ctx.name(b));
    if ctx.problems.has_conflict_between(&package, &conflicting_package) {
        return;
    }
    ctx.problems.push(Problem::UnresolvableConflict {
        package,
        conflicting_package,
        conflict: text.to_string(),
    });
}
