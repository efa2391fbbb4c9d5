// tests/scenarios.rs

//! End-to-end resolution scenarios: simple closure, unsatisfied requirements,
//! obsoletes, ambiguous names, version comparison.

mod common;

use common::{bare_names, catalog, id, names, pkg};
use depmark::{
    ErrorKind, MarkState, MarkedBy, Problem, Transaction, TransactionOptions, compare_version,
    resolve_transaction,
};
use std::cmp::Ordering;

#[test]
fn test_simple_resolve() {
    let c = catalog(
        vec![pkg("A", "1.0").with_requires("B"), pkg("B", "1.0").with_provides("B")],
        vec![],
    );

    let result = resolve_transaction(&c, &["A"], &Transaction::install());

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(bare_names(&c, result.ordered_packages()), vec!["B", "A"]);
    assert_eq!(result.mark(id(&c, "A-1.0-1")), MarkState::Install(MarkedBy::Hand));
    assert_eq!(result.mark(id(&c, "B-1.0-1")), MarkState::Install(MarkedBy::Dependency));
}

#[test]
fn test_unsatisfied_requirement() {
    let c = catalog(vec![pkg("A", "1.0").with_requires("C")], vec![]);

    let result = resolve_transaction(&c, &["A"], &Transaction::install());
    assert_eq!(result.error_kinds(), vec![ErrorKind::UnsatisfiedRequirement]);
    match &result.errors[0] {
        Problem::UnsatisfiedRequirement {
            package,
            requirement,
            removed_provider,
        } => {
            assert_eq!(package, "A-1.0-1");
            assert_eq!(requirement, "C");
            assert!(removed_provider.is_none());
        }
        other => panic!("unexpected problem {:?}", other),
    }
    assert!(!result.is_success());
}

#[test]
fn test_unsatisfied_with_no_deps() {
    let c = catalog(vec![pkg("A", "1.0").with_requires("C")], vec![]);
    let tx = Transaction::install().with_options(TransactionOptions::new().with_no_deps(true));

    let result = resolve_transaction(&c, &["A"], &tx);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(names(&c, result.ordered_packages()), vec!["A-1.0-1"]);
    // Still visible, just not fatal
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind(), ErrorKind::UnsatisfiedRequirement);
}

#[test]
fn test_obsoletes_with_greedy() {
    let c = catalog(
        vec![pkg("A", "2.0").with_obsoletes("A < 2.0")],
        vec![pkg("A", "1.0")],
    );
    let tx = Transaction::install().with_options(TransactionOptions::new().with_greedy(true));

    let result = resolve_transaction(&c, &["A-2.0"], &tx);
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let old = c.installed().map(|(id, _)| id).next().unwrap();
    let new = c.available().map(|(id, _)| id).next().unwrap();
    assert_eq!(result.mark(old), MarkState::Remove(MarkedBy::Dependency));
    assert_eq!(result.mark(new), MarkState::Install(MarkedBy::Hand));
    assert_eq!(result.install, vec![new]);
    assert_eq!(result.remove, vec![old]);
}

#[test]
fn test_ambiguous_name_in_exact_mode() {
    let c = catalog(vec![pkg("foo-bar", "1.0"), pkg("foo-baz", "1.0")], vec![]);

    let result = resolve_transaction(&c, &["foo"], &Transaction::install());
    assert_eq!(result.error_kinds(), vec![ErrorKind::AmbiguousName]);
    assert!(result.install.is_empty());
    assert!(result.marks.iter().all(|m| *m == MarkState::Unmarked));

    match &result.errors[0] {
        Problem::AmbiguousName { token, candidates } => {
            assert_eq!(token, "foo");
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("unexpected problem {:?}", other),
    }
}

#[test]
fn test_unknown_token() {
    let c = catalog(vec![pkg("A", "1.0")], vec![]);
    let result = resolve_transaction(&c, &["zsh"], &Transaction::install());
    assert_eq!(result.error_kinds(), vec![ErrorKind::NoSuchPackageOrDirectory]);
    assert!(result.install.is_empty());
}

#[test]
fn test_vercmp_cases() {
    assert_eq!(compare_version("1.0", "1.0"), Ordering::Equal);
    assert_eq!(compare_version("1.1", "1.0"), Ordering::Greater);
    assert_eq!(compare_version("1.0a", "1.0"), Ordering::Less);
    assert_eq!(compare_version("10", "9"), Ordering::Greater);
    assert_eq!(compare_version("9", "10"), Ordering::Less);
}

#[test]
fn test_newest_version_preferred() {
    let c = catalog(
        vec![
            pkg("A", "1.0").with_requires("lib"),
            pkg("lib", "1.0"),
            pkg("lib", "1.2"),
        ],
        vec![],
    );
    let result = resolve_transaction(&c, &["A"], &Transaction::install());
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(names(&c, &result.install), vec!["lib-1.2-1", "A-1.0-1"]);
}

#[test]
fn test_versioned_requirement() {
    let c = catalog(
        vec![
            pkg("A", "1.0").with_requires("lib >= 2.0"),
            pkg("lib", "1.0"),
        ],
        vec![],
    );
    let result = resolve_transaction(&c, &["A"], &Transaction::install());
    assert_eq!(result.error_kinds(), vec![ErrorKind::UnsatisfiedRequirement]);
}
