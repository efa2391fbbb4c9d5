// tests/obsoletes.rs

//! Obsoletes handling: greedy unmarking of obsoleted dependencies,
//! replacement of conflicting installed packages by an obsoleter, and
//! obsoletes that cannot be followed.

mod common;

use common::{catalog, id, names, pkg};
use depmark::{Catalog, ErrorKind, MarkState, MarkedBy, Transaction, TransactionOptions, resolve_transaction};

/// `app` pulls in sendmail for `mta` first, then newmail, which obsoletes it
fn mail_stack() -> Catalog {
    catalog(
        vec![
            pkg("app", "1.0").with_requires("mta").with_requires("newmail"),
            pkg("sendmail", "8.18").with_provides("mta"),
            pkg("newmail", "1.0").with_provides("mta").with_obsoletes("sendmail"),
        ],
        vec![],
    )
}

#[test]
fn test_obsoleted_dependency_is_unmarked() {
    let c = mail_stack();
    let result = resolve_transaction(&c, &["app"], &Transaction::install());
    assert!(result.is_success(), "{:?}", result.errors);

    assert_eq!(result.mark(id(&c, "sendmail-8.18-1")), MarkState::Unmarked);
    assert_eq!(
        result.mark(id(&c, "newmail-1.0-1")),
        MarkState::Install(MarkedBy::Dependency)
    );
    assert_eq!(names(&c, &result.install), vec!["newmail-1.0-1", "app-1.0-1"]);
}

#[test]
fn test_unmarking_draws_from_greedy_budget() {
    let c = mail_stack();

    let one = Transaction::install().with_options(TransactionOptions::new().with_greedy_depth(1));
    assert!(resolve_transaction(&c, &["app"], &one).is_success());

    let none = Transaction::install().with_options(TransactionOptions::new().with_greedy_depth(0));
    let result = resolve_transaction(&c, &["app"], &none);
    assert_eq!(result.error_kinds(), vec![ErrorKind::UnresolvableConflict]);
    assert!(result.errors[0].is_conflict_between("newmail-1.0-1", "sendmail-8.18-1"));
}

#[test]
fn test_hand_marked_obsoleted_package_conflicts() {
    let c = catalog(
        vec![
            pkg("sendmail", "8.18"),
            pkg("newmail", "1.0").with_obsoletes("sendmail"),
        ],
        vec![],
    );
    let result = resolve_transaction(&c, &["sendmail", "newmail"], &Transaction::install());
    assert_eq!(result.error_kinds(), vec![ErrorKind::UnresolvableConflict]);
}

#[test]
fn test_conflicting_installed_package_replaced_by_obsoleter() {
    let c = catalog(
        vec![
            pkg("mailtool", "2.0").with_conflicts("sendmail"),
            // Same name, still conflicting: no way out through an upgrade
            pkg("sendmail", "8.18"),
            pkg("newmail", "1.0").with_obsoletes("sendmail"),
        ],
        vec![pkg("sendmail", "8.17")],
    );

    let plain = resolve_transaction(&c, &["mailtool"], &Transaction::install());
    assert_eq!(plain.error_kinds(), vec![ErrorKind::UnresolvableConflict]);

    let greedy = Transaction::install().with_options(TransactionOptions::new().with_greedy(true));
    let result = resolve_transaction(&c, &["mailtool"], &greedy);
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(
        result.mark(id(&c, "newmail-1.0-1")),
        MarkState::Install(MarkedBy::Dependency)
    );
    assert_eq!(result.mark(id(&c, "sendmail-8.18-1")), MarkState::Unmarked);
    assert_eq!(names(&c, &result.remove), vec!["sendmail-8.17-1"]);
}

#[test]
fn test_unfollowed_obsoletes_is_a_conflict() {
    let c = catalog(
        vec![pkg("newmail", "1.0").with_obsoletes("sendmail")],
        vec![pkg("sendmail", "8.17")],
    );

    let strict = TransactionOptions::new().with_follow(false).with_greedy(false);
    let result = resolve_transaction(&c, &["newmail"], &Transaction::install().with_options(strict));
    assert_eq!(result.error_kinds(), vec![ErrorKind::UnresolvableConflict]);
    assert!(result.errors[0].is_conflict_between("newmail-1.0-1", "sendmail-8.17-1"));
    assert!(result.remove.is_empty());

    // Greedy alone is enough to follow it
    let greedy = TransactionOptions::new().with_follow(false).with_greedy(true);
    let result = resolve_transaction(&c, &["newmail"], &Transaction::install().with_options(greedy));
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(names(&c, &result.remove), vec!["sendmail-8.17-1"]);
}
