// src/resolver/mod.rs

//! Transaction resolution
//!
//! Resolution runs in three steps on one thread:
//!
//! 1. user tokens are resolved to catalog packages ([`crate::args`])
//! 2. a closure engine marks packages for install or removal until every
//!    requirement is met or reported ([`engine`], [`uninstall`])
//! 3. the verifier checks the final set for conflicts and unsatisfied
//!    requirements and orders it ([`verify`], [`graph`])
//!
//! Problems found on the way are accumulated, never short-circuited, and
//! classified into errors and warnings by the transaction options at the end.

mod engine;
mod graph;
mod mark;
mod plan;
mod problem;
mod uninstall;
mod verify;

pub use graph::OrderGraph;
pub use mark::{MarkSet, MarkState, MarkedBy};
pub use plan::TransactionResult;
pub use problem::{ErrorKind, Problem, ProblemSet};
pub use verify::{FileVerifier, verify_conflicts, verify_order, verify_requirements};

use crate::catalog::{CapabilityIndex, Catalog};
use crate::package::PackageId;
use crate::transaction::{Transaction, TransactionKind};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Mutable state of one resolution run
///
/// Holds everything the engine needs by reference or by value, so several
/// resolutions over one catalog never share mutable state.
pub(crate) struct ResolverContext<'a, 'c> {
    pub catalog: &'c Catalog,
    pub index: CapabilityIndex<'c>,
    pub tx: &'a Transaction,
    pub marks: MarkSet<'c>,
    pub problems: ProblemSet,
    pub interrupted: bool,
}

impl<'a, 'c> ResolverContext<'a, 'c> {
    pub fn new(catalog: &'c Catalog, tx: &'a Transaction) -> Self {
        let opts = &tx.options;
        let policy = tx.epoch_policy();

        // Ignored packages leave the universe; installed ones always stay
        let index = CapabilityIndex::build_with(catalog, policy, |p| {
            p.installed || !tx.is_ignored(p)
        });

        let mut marks = MarkSet::new(catalog).with_rules(
            opts.multilib(),
            opts.allow_duplicates(),
            policy,
        );
        for (id, pkg) in catalog.iter() {
            if !pkg.installed && tx.is_ignored(pkg) {
                marks.ignore(id);
            } else if tx.is_held(pkg) {
                marks.hold(id);
            }
        }

        Self {
            catalog,
            index,
            tx,
            marks,
            problems: ProblemSet::new(),
            interrupted: false,
        }
    }

    /// Check the interrupt token; once tripped it stays tripped
    pub fn poll_interrupt(&mut self) -> bool {
        if !self.interrupted && self.tx.is_cancelled() {
            warn!("Interrupted, returning a partial result");
            self.interrupted = true;
        }
        self.interrupted
    }

    pub fn name(&self, id: PackageId) -> String {
        self.catalog[id].to_string()
    }

    /// Order the final mark set, run the verifier, and classify problems
    ///
    /// `selected` is the verify scope of a verify transaction; other kinds
    /// verify what they install.
    fn finish(mut self, selected: Vec<PackageId>) -> TransactionResult {
        let catalog = self.catalog;
        let tx = self.tx;
        let mut result = TransactionResult::new(tx.kind);

        let scope: Vec<PackageId> = match tx.kind {
            TransactionKind::Verify => selected,
            _ => self.marks.install_marked().collect(),
        };

        if !self.interrupted {
            verify_conflicts(&self.index, &self.marks, &scope, &mut self.problems);
            verify_requirements(&self.index, &self.marks, &scope, &mut self.problems);
            if let Some(verifier) = tx.file_verifier() {
                for problem in verifier
                    .verify_file_conflicts(catalog, &self.marks)
                    .into_iter()
                    .chain(verifier.verify_file_orphans(catalog, &self.marks))
                {
                    self.problems.push(problem);
                }
            }
        }

        let priority = |id: PackageId| tx.install_priority(&catalog[id]);

        let (install, cycles) = OrderGraph::build(&self.index, &scope).sort(priority);
        for cycle in cycles {
            self.problems.push(Problem::OrderingCycle {
                cycle: cycle.iter().map(|&id| catalog[id].to_string()).collect(),
            });
        }

        let removing: Vec<PackageId> = self.marks.remove_marked().collect();
        let (mut remove, _) = OrderGraph::build(&self.index, &removing).sort(priority);
        remove.reverse();

        result.install = install;
        result.remove = remove;
        result.marks = self.marks.states().to_vec();
        result.interrupted = self.interrupted;

        let (errors, warnings) = self.problems.classify(&tx.options);
        result.errors = errors;
        result.warnings = warnings;

        info!(
            "{} resolved: {} to install, {} to remove, {} error(s), {} warning(s)",
            result.kind,
            result.install.len(),
            result.remove.len(),
            result.errors.len(),
            result.warnings.len()
        );
        result
    }

    /// Result for a run that stopped at argument resolution
    fn abort(self) -> TransactionResult {
        let mut result = TransactionResult::new(self.tx.kind);
        result.marks = self.marks.states().to_vec();
        let (errors, warnings) = self.problems.classify(&self.tx.options);
        result.errors = errors;
        result.warnings = warnings;
        result
    }
}

/// Resolve `tokens` against `catalog` as described by `tx`
///
/// The catalog is only read. Everything the run marks lives in the returned
/// result.
pub fn resolve_transaction<S: AsRef<str>>(
    catalog: &Catalog,
    tokens: &[S],
    tx: &Transaction,
) -> TransactionResult {
    debug!(
        "Resolving {} transaction for {} token(s)",
        tx.kind,
        tokens.len()
    );
    let mut ctx = ResolverContext::new(catalog, tx);

    let scope = match tx.kind {
        TransactionKind::Install => engine::run_install(&mut ctx, tokens),
        TransactionKind::Uninstall => uninstall::run_uninstall(&mut ctx, tokens),
        TransactionKind::Verify => verify::select_installed(&mut ctx, tokens),
    };

    match scope {
        Some(scope) => ctx.finish(scope),
        None => ctx.abort(),
    }
}

/// Resolve several independent requests over one catalog in parallel
///
/// Every request gets its own mark set; results come back in request order.
pub fn dry_run_batch<S>(catalog: &Catalog, requests: &[Vec<S>], tx: &Transaction) -> Vec<TransactionResult>
where
    S: AsRef<str> + Sync,
{
    requests
        .par_iter()
        .map(|tokens| resolve_transaction(catalog, tokens, tx))
        .collect()
}
