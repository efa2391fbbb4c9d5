// src/transaction/options.rs

//! Transaction option flags
//!
//! Every flag is optional. `None` means "not set here", so a command-line
//! layer can be laid over a configuration-file layer with [`inherit`] and
//! the built-in defaults apply last.
//!
//! [`inherit`]: TransactionOptions::inherit

use serde::{Deserialize, Serialize};

/// Greedy cascade bound used when nothing else is configured
pub const DEFAULT_GREEDY_DEPTH: u32 = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    /// Downgrade conflicts and ordering cycles to warnings
    pub force: Option<bool>,
    /// Do not resolve dependencies; unsatisfied requirements become warnings
    pub no_deps: Option<bool>,
    /// Follow requirements to available providers
    pub follow: Option<bool>,
    /// Resolve conflicts and orphans by upgrading installed packages
    pub greedy: Option<bool>,
    /// Bound on greedy actions in one transaction
    pub greedy_depth: Option<u32>,
    /// Remove installed packages obsoleted by marked ones
    pub obsoletes: Option<bool>,
    /// Allow several versions of one name to be install-marked
    pub allow_duplicates: Option<bool>,
    /// Same-name packages of different arch may coexist
    pub multilib: Option<bool>,
    /// Missing epochs take the other side's epoch when matching
    pub promote_epoch: Option<bool>,
    /// Offer weak requirements through the ask policy
    pub suggests: Option<bool>,
    /// Ask the ask policy to pick among equivalent providers
    pub choose_equivalents: Option<bool>,
    /// Fall back to capability lookup for unmatched arguments
    pub caplookup: Option<bool>,
    /// Confirm removal of dependent packages
    pub confirm_removal: Option<bool>,
    /// Honor hold patterns
    pub use_hold: Option<bool>,
    /// Honor ignore patterns
    pub use_ignore: Option<bool>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every unset flag from `parent`
    pub fn inherit(&self, parent: &TransactionOptions) -> TransactionOptions {
        TransactionOptions {
            force: self.force.or(parent.force),
            no_deps: self.no_deps.or(parent.no_deps),
            follow: self.follow.or(parent.follow),
            greedy: self.greedy.or(parent.greedy),
            greedy_depth: self.greedy_depth.or(parent.greedy_depth),
            obsoletes: self.obsoletes.or(parent.obsoletes),
            allow_duplicates: self.allow_duplicates.or(parent.allow_duplicates),
            multilib: self.multilib.or(parent.multilib),
            promote_epoch: self.promote_epoch.or(parent.promote_epoch),
            suggests: self.suggests.or(parent.suggests),
            choose_equivalents: self.choose_equivalents.or(parent.choose_equivalents),
            caplookup: self.caplookup.or(parent.caplookup),
            confirm_removal: self.confirm_removal.or(parent.confirm_removal),
            use_hold: self.use_hold.or(parent.use_hold),
            use_ignore: self.use_ignore.or(parent.use_ignore),
        }
    }

    pub fn with_force(mut self, on: bool) -> Self {
        self.force = Some(on);
        self
    }

    pub fn with_no_deps(mut self, on: bool) -> Self {
        self.no_deps = Some(on);
        self
    }

    pub fn with_follow(mut self, on: bool) -> Self {
        self.follow = Some(on);
        self
    }

    pub fn with_greedy(mut self, on: bool) -> Self {
        self.greedy = Some(on);
        self
    }

    pub fn with_greedy_depth(mut self, depth: u32) -> Self {
        self.greedy_depth = Some(depth);
        self
    }

    pub fn with_obsoletes(mut self, on: bool) -> Self {
        self.obsoletes = Some(on);
        self
    }

    pub fn with_allow_duplicates(mut self, on: bool) -> Self {
        self.allow_duplicates = Some(on);
        self
    }

    pub fn with_multilib(mut self, on: bool) -> Self {
        self.multilib = Some(on);
        self
    }

    pub fn with_promote_epoch(mut self, on: bool) -> Self {
        self.promote_epoch = Some(on);
        self
    }

    pub fn with_suggests(mut self, on: bool) -> Self {
        self.suggests = Some(on);
        self
    }

    pub fn with_choose_equivalents(mut self, on: bool) -> Self {
        self.choose_equivalents = Some(on);
        self
    }

    pub fn with_caplookup(mut self, on: bool) -> Self {
        self.caplookup = Some(on);
        self
    }

    pub fn with_confirm_removal(mut self, on: bool) -> Self {
        self.confirm_removal = Some(on);
        self
    }

    pub fn force(&self) -> bool {
        self.force.unwrap_or(false)
    }

    pub fn no_deps(&self) -> bool {
        self.no_deps.unwrap_or(false)
    }

    pub fn follow(&self) -> bool {
        self.follow.unwrap_or(true)
    }

    pub fn greedy(&self) -> bool {
        self.greedy.unwrap_or(false)
    }

    pub fn greedy_depth(&self) -> u32 {
        self.greedy_depth.unwrap_or(DEFAULT_GREEDY_DEPTH)
    }

    pub fn obsoletes(&self) -> bool {
        self.obsoletes.unwrap_or(true)
    }

    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates.unwrap_or(false)
    }

    pub fn multilib(&self) -> bool {
        self.multilib.unwrap_or(false)
    }

    pub fn promote_epoch(&self) -> bool {
        self.promote_epoch.unwrap_or(false)
    }

    pub fn suggests(&self) -> bool {
        self.suggests.unwrap_or(false)
    }

    pub fn choose_equivalents(&self) -> bool {
        self.choose_equivalents.unwrap_or(false)
    }

    pub fn caplookup(&self) -> bool {
        self.caplookup.unwrap_or(false)
    }

    pub fn confirm_removal(&self) -> bool {
        self.confirm_removal.unwrap_or(false)
    }

    pub fn use_hold(&self) -> bool {
        self.use_hold.unwrap_or(true)
    }

    pub fn use_ignore(&self) -> bool {
        self.use_ignore.unwrap_or(true)
    }
}
