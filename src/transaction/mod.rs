// src/transaction/mod.rs

//! Transaction setup
//!
//! A [`Transaction`] carries everything one resolution needs besides the
//! catalog and the user's tokens: what kind of operation it is, option
//! flags, hold/ignore patterns, install priorities, the ask policy, an
//! optional file-level verifier and an interrupt token. It holds no mutable
//! resolution state, so one transaction may drive many dry runs at once.

mod options;
mod patterns;

pub use options::{DEFAULT_GREEDY_DEPTH, TransactionOptions};
pub use patterns::{DEFAULT_MASK_PRIORITY, PatternSet, PriorityTable, read_mask_file};

use crate::ask::{AskPolicy, AutoAsk};
use crate::package::Package;
use crate::resolver::FileVerifier;
use crate::version::EpochPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a transaction does with the resolved packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Install,
    Uninstall,
    Verify,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Install => write!(f, "install"),
            TransactionKind::Uninstall => write!(f, "uninstall"),
            TransactionKind::Verify => write!(f, "verify"),
        }
    }
}

/// Parameters of one user operation
pub struct Transaction {
    pub kind: TransactionKind,
    pub options: TransactionOptions,
    pub hold: PatternSet,
    pub ignore: PatternSet,
    pub priorities: PriorityTable,
    ask: Box<dyn AskPolicy + Send + Sync>,
    file_verifier: Option<Box<dyn FileVerifier + Send + Sync>>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("hold", &self.hold)
            .field("ignore", &self.ignore)
            .field("priorities", &self.priorities)
            .field("file_verifier", &self.file_verifier.is_some())
            .field("interrupt", &self.interrupt.is_some())
            .finish()
    }
}

impl Transaction {
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            options: TransactionOptions::default(),
            hold: PatternSet::new(),
            ignore: PatternSet::new(),
            priorities: PriorityTable::new(),
            ask: Box::new(AutoAsk),
            file_verifier: None,
            interrupt: None,
        }
    }

    pub fn install() -> Self {
        Self::new(TransactionKind::Install)
    }

    pub fn uninstall() -> Self {
        Self::new(TransactionKind::Uninstall)
    }

    pub fn verify() -> Self {
        Self::new(TransactionKind::Verify)
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hold(mut self, hold: PatternSet) -> Self {
        self.hold = hold;
        self
    }

    pub fn with_ignore(mut self, ignore: PatternSet) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_priorities(mut self, priorities: PriorityTable) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn with_ask<A>(mut self, ask: A) -> Self
    where
        A: AskPolicy + Send + Sync + 'static,
    {
        self.ask = Box::new(ask);
        self
    }

    pub fn with_file_verifier<V>(mut self, verifier: V) -> Self
    where
        V: FileVerifier + Send + Sync + 'static,
    {
        self.file_verifier = Some(Box::new(verifier));
        self
    }

    /// Poll `flag` for cancellation while resolving
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn ask(&self) -> &dyn AskPolicy {
        self.ask.as_ref()
    }

    pub fn file_verifier(&self) -> Option<&dyn FileVerifier> {
        self.file_verifier.as_deref().map(|v| v as &dyn FileVerifier)
    }

    pub fn is_cancelled(&self) -> bool {
        self.interrupt
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn epoch_policy(&self) -> EpochPolicy {
        EpochPolicy::from_promote(self.options.promote_epoch())
    }

    pub fn is_held(&self, pkg: &Package) -> bool {
        self.options.use_hold() && self.hold.matches(pkg)
    }

    pub fn is_ignored(&self, pkg: &Package) -> bool {
        self.options.use_ignore() && self.ignore.matches(pkg)
    }

    /// Effective install priority: the priority table, when it matches
    pub fn install_priority(&self, pkg: &Package) -> i32 {
        self.priorities.priority_of(pkg)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::install()
    }
}
