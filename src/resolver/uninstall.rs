// src/resolver/uninstall.rs

//! Uninstall closure
//!
//! Tokens resolve against installed packages only. Every removal is checked
//! against the installed packages staying behind: one that loses the last
//! provider of a hard requirement is removed as well, unless dependencies
//! are not followed or it is held.

use super::ResolverContext;
use super::problem::Problem;
use super::verify::PresentCost;
use crate::args::{ArgFlags, ArgResolver};
use crate::package::{Package, PackageId};
use std::collections::VecDeque;
use tracing::{debug, info};

pub(crate) fn run_uninstall<S: AsRef<str>>(
    ctx: &mut ResolverContext<'_, '_>,
    tokens: &[S],
) -> Option<Vec<PackageId>> {
    let catalog = ctx.catalog;
    let tx = ctx.tx;
    let opts = &tx.options;

    let resolved = ArgResolver::new(&ctx.index)
        .with_flags(ArgFlags::default().with_caplookup(opts.caplookup()))
        .with_scope(|_, p| p.installed)
        .resolve(tokens);

    if !resolved.is_ok() {
        for issue in resolved.issues {
            ctx.problems.push(issue.into());
        }
        return None;
    }

    let mut queue: VecDeque<PackageId> = VecDeque::new();
    for id in resolved.packages {
        if ctx.marks.mark_remove(id, false) {
            debug!("{} marked for removal", catalog[id]);
            queue.push_back(id);
        }
    }

    while let Some(removed) = queue.pop_front() {
        if ctx.poll_interrupt() {
            break;
        }
        let gone = &catalog[removed];

        for (r, pkg) in catalog.installed() {
            if !ctx.marks.is_kept_installed(r) {
                continue;
            }
            let broken = broken_requirements(ctx, pkg, gone);

            for req in broken {
                if opts.no_deps() || !opts.follow() || ctx.marks.is_held(r) {
                    ctx.problems.push(Problem::UnsatisfiedRequirement {
                        package: pkg.to_string(),
                        requirement: req,
                        removed_provider: Some(gone.to_string()),
                    });
                    continue;
                }

                if opts.confirm_removal() {
                    let question = format!("{} requires {}, remove it as well?", pkg, req);
                    if !tx.ask().confirm(&question, true) {
                        ctx.problems.push(Problem::AbortedByUser { context: question });
                        break;
                    }
                }

                if ctx.marks.mark_remove(r, true) {
                    info!("{} removed along with {} ({})", pkg, gone, req);
                    queue.push_back(r);
                }
                break;
            }
        }
    }

    Some(Vec::new())
}

/// Requirements of kept `pkg` left without a present provider once `gone`
/// leaves
fn broken_requirements(ctx: &ResolverContext<'_, '_>, pkg: &Package, gone: &Package) -> Vec<String> {
    let policy = ctx.index.policy();
    let present = PresentCost {
        index: &ctx.index,
        marks: &ctx.marks,
    };

    let plain = pkg
        .hard_requirements()
        .map(|(_, req)| req)
        .filter(|req| gone.satisfies(req, policy) && !pkg.satisfies(req, policy))
        .filter(|req| !ctx.index.find(req).into_iter().any(|p| ctx.marks.is_present(p)))
        .map(|req| req.to_string());
    let rich = pkg
        .rich_requires
        .iter()
        .filter(|dep| dep.leaves().into_iter().any(|l| gone.satisfies(l, policy)))
        .filter(|dep| !dep.is_met(&present))
        .map(|dep| dep.to_string());

    plain.chain(rich).collect()
}

#[cfg(test)]
mod tests {
    use crate::ask::{AskPolicy, EquivalentChoice, SuggestsChoice};
    use crate::catalog::{Catalog, CatalogManifest, PackageRecord};
    use crate::package::{CapReq, Package};
    use crate::resolver::{ErrorKind, MarkState, MarkedBy, resolve_transaction};
    use crate::transaction::{PatternSet, Transaction, TransactionOptions};

    struct Decline;

    impl AskPolicy for Decline {
        fn confirm(&self, _question: &str, _default: bool) -> bool {
            false
        }

        fn choose_equivalent(&self, _req: &CapReq, _candidates: &[&Package], default: usize) -> EquivalentChoice {
            EquivalentChoice::Chosen(default)
        }

        fn choose_suggests(&self, _pkg: &Package, _suggested: &[&Package]) -> SuggestsChoice {
            SuggestsChoice::None
        }
    }

    fn catalog() -> Catalog {
        CatalogManifest {
            available: vec![],
            installed: vec![
                PackageRecord::new("glibc", "2.38", "1").with_provides("libc"),
                PackageRecord::new("bash", "5.2", "1").with_requires("libc"),
                PackageRecord::new("vim", "9.1", "1").with_requires("bash"),
                PackageRecord::new("musl", "1.2", "1"),
            ],
        }
        .into_catalog()
        .unwrap()
    }

    fn names(c: &Catalog, ids: &[crate::package::PackageId]) -> Vec<String> {
        ids.iter().map(|&id| c[id].to_string()).collect()
    }

    #[test]
    fn test_cascade_removes_dependents_first() {
        let c = catalog();
        let result = resolve_transaction(&c, &["glibc"], &Transaction::uninstall());
        assert!(result.is_success(), "{:?}", result.errors);
        assert_eq!(
            names(&c, result.ordered_packages()),
            vec!["vim-9.1-1", "bash-5.2-1", "glibc-2.38-1"]
        );
        let glibc = c.by_name("glibc")[0];
        let bash = c.by_name("bash")[0];
        assert_eq!(result.mark(glibc), MarkState::Remove(MarkedBy::Hand));
        assert_eq!(result.mark(bash), MarkState::Remove(MarkedBy::Dependency));
    }

    #[test]
    fn test_no_deps_keeps_dependents() {
        let c = catalog();
        let tx = Transaction::uninstall().with_options(TransactionOptions::new().with_no_deps(true));
        let result = resolve_transaction(&c, &["glibc"], &tx);
        assert!(result.is_success());
        assert_eq!(names(&c, &result.remove), vec!["glibc-2.38-1"]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_held_dependent_is_an_error() {
        let c = catalog();
        let tx = Transaction::uninstall().with_hold(PatternSet::from_masks(["bash"]).unwrap());
        let result = resolve_transaction(&c, &["glibc"], &tx);
        assert_eq!(result.error_kinds(), vec![ErrorKind::UnsatisfiedRequirement]);
        assert_eq!(names(&c, &result.remove), vec!["glibc-2.38-1"]);
    }

    #[test]
    fn test_declined_confirmation() {
        let c = catalog();
        let tx = Transaction::uninstall()
            .with_options(TransactionOptions::new().with_confirm_removal(true))
            .with_ask(Decline);
        let result = resolve_transaction(&c, &["glibc"], &tx);
        assert_eq!(result.error_kinds(), vec![ErrorKind::AbortedByUser]);
    }

    #[test]
    fn test_declined_dependent_asked_once() {
        let c = CatalogManifest {
            available: vec![],
            installed: vec![
                PackageRecord::new("glibc", "2.38", "1")
                    .with_provides("libc")
                    .with_provides("libc.so.6"),
                PackageRecord::new("bash", "5.2", "1")
                    .with_requires("libc")
                    .with_requires("libc.so.6"),
            ],
        }
        .into_catalog()
        .unwrap();
        let tx = Transaction::uninstall()
            .with_options(TransactionOptions::new().with_confirm_removal(true))
            .with_ask(Decline);
        let result = resolve_transaction(&c, &["glibc"], &tx);
        assert_eq!(result.error_kinds(), vec![ErrorKind::AbortedByUser]);
        assert_eq!(names(&c, &result.remove), vec!["glibc-2.38-1"]);
    }

    #[test]
    fn test_boolean_requirement_keeps_dependent_with_alternative() {
        let c = CatalogManifest {
            available: vec![],
            installed: vec![
                PackageRecord::new("postfix", "3.8", "1"),
                PackageRecord::new("exim", "4.97", "1"),
                PackageRecord::new("mutt", "2.2", "1").with_requires("(postfix or exim)"),
            ],
        }
        .into_catalog()
        .unwrap();

        let result = resolve_transaction(&c, &["postfix"], &Transaction::uninstall());
        assert!(result.is_success(), "{:?}", result.errors);
        assert_eq!(names(&c, &result.remove), vec!["postfix-3.8-1"]);

        let result = resolve_transaction(&c, &["postfix", "exim"], &Transaction::uninstall());
        assert!(result.is_success(), "{:?}", result.errors);
        let mut removed = names(&c, &result.remove);
        removed.sort();
        assert_eq!(removed, vec!["exim-4.97-1", "mutt-2.2-1", "postfix-3.8-1"]);
    }

    #[test]
    fn test_unknown_token() {
        let c = catalog();
        let result = resolve_transaction(&c, &["zsh"], &Transaction::uninstall());
        assert_eq!(result.error_kinds(), vec![ErrorKind::NoSuchPackageOrDirectory]);
        assert!(result.remove.is_empty());
    }
}
