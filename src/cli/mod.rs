// src/cli/mod.rs
//! CLI definitions for depmark
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! - `install` / `uninstall` / `verify` - resolve a transaction and print it
//! - `whatprovides` - list the providers of a capability
//! - `vercmp` - compare two versions

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depmark")]
#[command(author = "Depmark Contributors")]
#[command(version)]
#[command(about = "Resolve package transactions against a catalog", long_about = None)]
pub struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: ~/.config/depmark/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the installation of packages
    Install {
        /// Package names, name-version-release, masks or capabilities
        #[arg(required = true)]
        tokens: Vec<String>,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Resolve the removal of installed packages
    Uninstall {
        /// Installed package names or masks
        #[arg(required = true)]
        tokens: Vec<String>,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Check installed packages for unsatisfied requirements and conflicts
    Verify {
        /// Installed packages to check (all if omitted)
        tokens: Vec<String>,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// List packages providing a capability, best first
    Whatprovides {
        /// Capability expression (`name` or `name op evr`)
        capability: String,

        /// Catalog manifest (JSON)
        #[arg(short, long)]
        catalog: PathBuf,
    },

    /// Compare two versions
    Vercmp {
        /// First version ([epoch:]version[-release])
        first: String,

        /// Second version
        second: String,
    },
}

/// Flags shared by the resolving commands
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Catalog manifest (JSON)
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// Turn conflicts and ordering loops into warnings
    #[arg(long)]
    pub force: bool,

    /// Do not resolve dependencies
    #[arg(long)]
    pub nodeps: bool,

    /// Upgrade installed packages to resolve conflicts and orphans
    #[arg(long)]
    pub greedy: bool,

    /// Do not pull in providers of requirements
    #[arg(long)]
    pub no_follow: bool,

    /// Bound on greedy actions
    #[arg(long, value_name = "N")]
    pub greedy_depth: Option<u32>,

    /// Allow several versions of one package
    #[arg(long)]
    pub allow_duplicates: bool,

    /// Let packages of different arch coexist
    #[arg(long)]
    pub multilib: bool,

    /// Match missing epochs against the other side's epoch
    #[arg(long)]
    pub promote_epoch: bool,

    /// Look up unmatched arguments as capabilities
    #[arg(long)]
    pub caplookup: bool,

    /// Offer suggested packages
    #[arg(long)]
    pub suggests: bool,

    /// Ask on the terminal instead of taking defaults
    #[arg(short, long)]
    pub interactive: bool,

    /// Hold packages matching a mask (repeatable)
    #[arg(long, value_name = "PAT")]
    pub hold: Vec<String>,

    /// Ignore packages matching a mask (repeatable)
    #[arg(long, value_name = "PAT")]
    pub ignore: Vec<String>,

    /// Install priority file (`mask [priority]` lines)
    #[arg(long, value_name = "FILE")]
    pub priority_file: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}
