// src/config.rs

//! Resolver configuration file
//!
//! ```toml
//! [resolver]
//! hold = ["kernel*"]
//! ignore = ["*-debuginfo"]
//! priority_file = "/etc/depmark/priorities"
//! greedy = true
//! greedy_depth = 16
//! ```
//!
//! Every option is optional; unset options fall through to the built-in
//! defaults of [`TransactionOptions`]. Unknown keys are rejected.

use crate::error::Result;
use crate::transaction::{PatternSet, PriorityTable, TransactionOptions, read_mask_file};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the per-user hold list in the home directory
pub const DEFAULT_HOLD_FILE: &str = ".depmark_hold";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    #[serde(default)]
    pub hold: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    pub hold_file: Option<PathBuf>,
    pub priority_file: Option<PathBuf>,

    pub force: Option<bool>,
    pub no_deps: Option<bool>,
    pub follow: Option<bool>,
    pub greedy: Option<bool>,
    pub greedy_depth: Option<u32>,
    pub obsoletes: Option<bool>,
    pub allow_duplicates: Option<bool>,
    pub multilib: Option<bool>,
    pub promote_epoch: Option<bool>,
    pub suggests: Option<bool>,
    pub choose_equivalents: Option<bool>,
    pub caplookup: Option<bool>,
    pub confirm_removal: Option<bool>,
}

impl ResolverConfig {
    /// Load `[resolver]` from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        debug!("Loaded resolver configuration from {}", path.display());
        Ok(file.resolver)
    }

    /// Load the default configuration file, or defaults when there is none
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `$XDG_CONFIG_HOME/depmark/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("depmark").join("config.toml"))
    }

    /// Options set by this file; unset ones stay `None`
    pub fn options(&self) -> TransactionOptions {
        TransactionOptions {
            force: self.force,
            no_deps: self.no_deps,
            follow: self.follow,
            greedy: self.greedy,
            greedy_depth: self.greedy_depth,
            obsoletes: self.obsoletes,
            allow_duplicates: self.allow_duplicates,
            multilib: self.multilib,
            promote_epoch: self.promote_epoch,
            suggests: self.suggests,
            choose_equivalents: self.choose_equivalents,
            caplookup: self.caplookup,
            confirm_removal: self.confirm_removal,
            ..Default::default()
        }
    }

    /// Hold masks from the file and from the hold list
    ///
    /// Without an explicit `hold_file`, `~/.depmark_hold` is read when it
    /// exists.
    pub fn hold_patterns(&self) -> Result<PatternSet> {
        let mut set = PatternSet::from_masks(&self.hold)?;
        let hold_file = self
            .hold_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(DEFAULT_HOLD_FILE)).filter(|p| p.exists()));
        if let Some(path) = hold_file {
            debug!("Reading hold list {}", path.display());
            set.extend(PatternSet::from_masks(read_mask_file(&path)?)?);
        }
        Ok(set)
    }

    pub fn ignore_patterns(&self) -> Result<PatternSet> {
        PatternSet::from_masks(&self.ignore)
    }

    /// The priority table, empty without a priority file
    pub fn priorities(&self) -> Result<PriorityTable> {
        match &self.priority_file {
            Some(path) => PriorityTable::load(path),
            None => Ok(PriorityTable::new()),
        }
    }
}
