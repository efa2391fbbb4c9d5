// src/lib.rs

//! depmark: transaction resolution for RPM-style package sets
//!
//! Given a catalog of available and installed packages and a list of
//! requested tokens, depmark works out which packages to install or remove,
//! in what order, and why a request cannot be satisfied.
//!
//! # Architecture
//!
//! - [`catalog`]: the package universe, owned in one place and indexed by
//!   capability
//! - [`args`]: user tokens (names, masks, capabilities) to packages
//! - [`resolver`]: mark set, install and uninstall closures, verifier
//! - [`transaction`]: option flags, hold/ignore patterns, install priorities
//! - [`ask`]: host decisions (confirmations, provider choice, suggestions)
//!
//! Resolution reads the catalog and never changes it. Problems found along
//! the way are classified values in the [`TransactionResult`], not errors.

pub mod args;
pub mod ask;
pub mod catalog;
pub mod config;
mod error;
pub mod package;
pub mod resolver;
pub mod transaction;
pub mod version;

pub use args::{ArgFlags, ArgIssue, ArgResolver, ResolvedArgs};
pub use ask::{AskPolicy, AutoAsk, EquivalentChoice, SuggestsChoice, TerminalAsk};
pub use catalog::{CapabilityIndex, Catalog, CatalogManifest, PackageRecord};
pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use package::{BoolDep, CapReq, CapReqFlags, Capability, DepCost, Package, PackageId, Relation};
pub use resolver::{
    ErrorKind, FileVerifier, MarkSet, MarkState, MarkedBy, Problem, TransactionResult,
    dry_run_batch, resolve_transaction,
};
pub use transaction::{PatternSet, PriorityTable, Transaction, TransactionKind, TransactionOptions};
pub use version::{EpochPolicy, RpmVersion, compare_version};
