// src/commands/resolve.rs
//! Transaction commands: install, uninstall, verify

use crate::cli::ResolveArgs;
use anyhow::{Context, Result};
use depmark::{
    Catalog, PatternSet, PriorityTable, Problem, ResolverConfig, TerminalAsk,
    Transaction, TransactionKind, TransactionOptions, TransactionResult, resolve_transaction,
};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Resolve an install transaction
pub fn cmd_install(
    tokens: &[String],
    args: &ResolveArgs,
    config: &ResolverConfig,
    interrupt: Arc<AtomicBool>,
) -> Result<bool> {
    run(TransactionKind::Install, tokens, args, config, interrupt)
}

/// Resolve an uninstall transaction
pub fn cmd_uninstall(
    tokens: &[String],
    args: &ResolveArgs,
    config: &ResolverConfig,
    interrupt: Arc<AtomicBool>,
) -> Result<bool> {
    run(TransactionKind::Uninstall, tokens, args, config, interrupt)
}

/// Verify installed packages
pub fn cmd_verify(
    tokens: &[String],
    args: &ResolveArgs,
    config: &ResolverConfig,
    interrupt: Arc<AtomicBool>,
) -> Result<bool> {
    run(TransactionKind::Verify, tokens, args, config, interrupt)
}

fn run(
    kind: TransactionKind,
    tokens: &[String],
    args: &ResolveArgs,
    config: &ResolverConfig,
    interrupt: Arc<AtomicBool>,
) -> Result<bool> {
    let catalog = load_catalog(args)?;
    let tx = build_transaction(kind, args, config)?.with_interrupt(interrupt);

    info!("Resolving {} of {} token(s)", kind, tokens.len());
    let result = resolve_transaction(&catalog, tokens, &tx);

    if args.json {
        let report = Report::new(&catalog, &result);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_result(&catalog, &result);
    }

    Ok(result.is_success())
}

fn load_catalog(args: &ResolveArgs) -> Result<Catalog> {
    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;
    info!(
        "Catalog: {} package(s), {} installed",
        catalog.len(),
        catalog.installed().count()
    );
    Ok(catalog)
}

/// Command-line flags over the configuration file over the defaults
fn build_transaction(
    kind: TransactionKind,
    args: &ResolveArgs,
    config: &ResolverConfig,
) -> Result<Transaction> {
    let flag = |on: bool| on.then_some(true);
    let cli = TransactionOptions {
        force: flag(args.force),
        no_deps: flag(args.nodeps),
        follow: args.no_follow.then_some(false),
        greedy: flag(args.greedy),
        greedy_depth: args.greedy_depth,
        allow_duplicates: flag(args.allow_duplicates),
        multilib: flag(args.multilib),
        promote_epoch: flag(args.promote_epoch),
        suggests: flag(args.suggests),
        choose_equivalents: flag(args.interactive),
        caplookup: flag(args.caplookup),
        confirm_removal: flag(args.interactive),
        ..Default::default()
    };
    let options = cli.inherit(&config.options());

    let mut hold = config.hold_patterns().context("Invalid hold configuration")?;
    hold.extend(PatternSet::from_masks(&args.hold).context("Invalid --hold mask")?);
    let mut ignore = config.ignore_patterns().context("Invalid ignore configuration")?;
    ignore.extend(PatternSet::from_masks(&args.ignore).context("Invalid --ignore mask")?);

    let priorities = match &args.priority_file {
        Some(path) => PriorityTable::load(path)
            .with_context(|| format!("Failed to load priority file {}", path.display()))?,
        None => config.priorities().context("Failed to load priority file")?,
    };

    let tx = Transaction::new(kind)
        .with_options(options)
        .with_hold(hold)
        .with_ignore(ignore)
        .with_priorities(priorities);
    Ok(if args.interactive {
        tx.with_ask(TerminalAsk::new())
    } else {
        tx
    })
}

fn print_result(catalog: &Catalog, result: &TransactionResult) {
    let install = TransactionResult::describe(catalog, &result.install);
    let remove = TransactionResult::describe(catalog, &result.remove);

    match result.kind {
        TransactionKind::Verify => {
            println!("Verified {} package(s)", install.len());
        }
        TransactionKind::Install | TransactionKind::Uninstall => {
            if !install.is_empty() {
                println!("Install {} package(s):", install.len());
                for name in &install {
                    println!("  {}", name);
                }
            }
            if !remove.is_empty() {
                println!("Remove {} package(s):", remove.len());
                for name in &remove {
                    println!("  {}", name);
                }
            }
            if install.is_empty() && remove.is_empty() {
                println!("Nothing to do.");
            }
        }
    }

    for problem in &result.warnings {
        eprintln!("warning: {}", problem);
    }
    for problem in &result.errors {
        eprintln!("error: {}", problem);
    }
    if result.interrupted {
        eprintln!("Interrupted; the result is incomplete.");
    }
    if !result.errors.is_empty() {
        eprintln!("{} error(s)", result.errors.len());
    }
}

/// JSON form of a result, with package strings instead of ids
#[derive(Serialize)]
struct Report<'r> {
    kind: TransactionKind,
    success: bool,
    install: Vec<String>,
    remove: Vec<String>,
    errors: &'r [Problem],
    warnings: &'r [Problem],
    interrupted: bool,
}

impl<'r> Report<'r> {
    fn new(catalog: &Catalog, result: &'r TransactionResult) -> Self {
        Self {
            kind: result.kind,
            success: result.is_success(),
            install: TransactionResult::describe(catalog, &result.install),
            remove: TransactionResult::describe(catalog, &result.remove),
            errors: &result.errors,
            warnings: &result.warnings,
            interrupted: result.interrupted,
        }
    }
}
