// tests/properties.rs

//! Invariants every resolution result keeps, checked over a few catalogs.

mod common;

use common::{catalog, pkg};
use depmark::{
    Catalog, EpochPolicy, MarkState, PackageId, Transaction, TransactionOptions, TransactionResult,
    resolve_transaction,
};
use std::collections::HashSet;

/// A small universe with shared libraries, an upgrade, a conflict and a
/// pre-requirement
fn universe() -> Catalog {
    catalog(
        vec![
            pkg("app", "1.0")
                .with_requires("libfoo >= 1.0")
                .with_requires("sh")
                .with_requires_pre("setup"),
            pkg("libfoo", "1.0").with_requires("libc"),
            pkg("libfoo", "1.5").with_requires("libc"),
            pkg("setup", "2.0").with_requires("sh"),
            pkg("bash", "5.2").with_provides("sh").with_requires("libc"),
            pkg("glibc", "2.39").with_provides("libc"),
            pkg("tool", "1.0").with_requires("libfoo").with_conflicts("busybox"),
        ],
        vec![pkg("glibc", "2.38").with_provides("libc"), pkg("busybox", "1.36")],
    )
}

fn present(c: &Catalog, result: &TransactionResult) -> HashSet<PackageId> {
    c.ids()
        .filter(|&id| match result.mark(id) {
            MarkState::Install(_) => true,
            MarkState::Remove(_) => false,
            _ => c[id].installed,
        })
        .collect()
}

fn requests() -> Vec<Vec<&'static str>> {
    vec![vec!["app"], vec!["tool"], vec!["app", "tool"], vec!["glibc"], vec!["setup", "bash"]]
}

#[test]
fn test_resolution_is_idempotent() {
    let c = universe();
    for tokens in requests() {
        let tx = Transaction::install();
        let first = resolve_transaction(&c, &tokens, &tx);
        let second = resolve_transaction(&c, &tokens, &tx);
        assert_eq!(first, second, "{:?}", tokens);
    }
}

#[test]
fn test_install_and_remove_are_exclusive() {
    let c = universe();
    for tokens in requests() {
        let result = resolve_transaction(&c, &tokens, &Transaction::install());
        let install: HashSet<PackageId> = result.install.iter().copied().collect();
        assert!(result.remove.iter().all(|id| !install.contains(id)), "{:?}", tokens);
        assert!(result.install.iter().all(|&id| !c[id].installed));
        assert!(result.remove.iter().all(|&id| c[id].installed));
    }
}

#[test]
fn test_successful_result_is_closed() {
    let c = universe();
    for tokens in requests() {
        let result = resolve_transaction(&c, &tokens, &Transaction::install());
        if !result.is_success() {
            continue;
        }
        let present = present(&c, &result);
        for &id in &result.install {
            for (_, req) in c[id].hard_requirements() {
                assert!(
                    present.iter().any(|&p| c[p].satisfies(req, EpochPolicy::Zero)),
                    "{} lacks {} for {:?}",
                    c[id],
                    req,
                    tokens
                );
            }
        }
    }
}

#[test]
fn test_successful_result_is_conflict_free() {
    let c = universe();
    for tokens in requests() {
        let result = resolve_transaction(&c, &tokens, &Transaction::install());
        if !result.is_success() {
            continue;
        }
        let present = present(&c, &result);
        for &a in &result.install {
            for &b in &present {
                if a == b {
                    continue;
                }
                assert!(
                    c[a].conflict_with(&c[b], EpochPolicy::Zero).is_none()
                        && c[b].conflict_with(&c[a], EpochPolicy::Zero).is_none(),
                    "{} conflicts with {}",
                    c[a],
                    c[b]
                );
            }
        }
    }
}

#[test]
fn test_conflict_with_installed_is_reported() {
    let c = universe();
    let result = resolve_transaction(&c, &["tool"], &Transaction::install());
    assert!(!result.is_success());
    assert!(
        result
            .errors
            .iter()
            .any(|p| p.is_conflict_between("tool-1.0-1", "busybox-1.36-1"))
    );

    let forced = Transaction::install().with_options(TransactionOptions::new().with_force(true));
    let result = resolve_transaction(&c, &["tool"], &forced);
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_providers_precede_dependents() {
    let c = universe();
    for tokens in requests() {
        let result = resolve_transaction(&c, &tokens, &Transaction::install());
        let position = |id: PackageId| result.install.iter().position(|&x| x == id);

        for (i, &id) in result.install.iter().enumerate() {
            for (_, req) in c[id].hard_requirements() {
                for &p in &result.install {
                    if p != id && c[p].satisfies(req, EpochPolicy::Zero) && !c[id].satisfies(req, EpochPolicy::Zero) {
                        assert!(
                            position(p) < Some(i),
                            "{} installed after {} in {:?}",
                            c[p],
                            c[id],
                            tokens
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_greedy_budget_bounds_work() {
    let c = universe();
    let tx = Transaction::install().with_options(
        TransactionOptions::new()
            .with_greedy(true)
            .with_greedy_depth(0),
    );
    // Terminates and stays well-formed with no greedy budget at all
    let result = resolve_transaction(&c, &["app", "tool"], &tx);
    let install: HashSet<PackageId> = result.install.iter().copied().collect();
    assert!(result.remove.iter().all(|id| !install.contains(id)));
}
