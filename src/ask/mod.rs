// src/ask/mod.rs

//! Host decisions during resolution
//!
//! The resolver never talks to a terminal itself. Whenever it needs a
//! decision it asks an [`AskPolicy`], which blocks until it has an answer.

mod terminal;

pub use terminal::TerminalAsk;

use crate::package::{CapReq, Package};

/// Answer to a choice among equivalent providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquivalentChoice {
    /// Index into the candidate list
    Chosen(usize),
    /// Treat the requirement as unsatisfiable
    Abort,
}

/// Answer to an offer of suggested packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestsChoice {
    All,
    None,
    /// Indexes into the suggested list
    Subset(Vec<usize>),
}

/// Decision points the resolver calls out to
pub trait AskPolicy {
    /// Yes/no question
    fn confirm(&self, question: &str, default: bool) -> bool;

    /// Pick one of several providers of `req`
    fn choose_equivalent(
        &self,
        req: &CapReq,
        candidates: &[&Package],
        default_index: usize,
    ) -> EquivalentChoice;

    /// Pick which suggestions of `pkg` to install
    fn choose_suggests(&self, pkg: &Package, suggested: &[&Package]) -> SuggestsChoice;
}

/// Non-interactive policy: always the default answer, never suggestions
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAsk;

impl AskPolicy for AutoAsk {
    fn confirm(&self, _question: &str, default: bool) -> bool {
        default
    }

    fn choose_equivalent(
        &self,
        _req: &CapReq,
        _candidates: &[&Package],
        default_index: usize,
    ) -> EquivalentChoice {
        EquivalentChoice::Chosen(default_index)
    }

    fn choose_suggests(&self, _pkg: &Package, _suggested: &[&Package]) -> SuggestsChoice {
        SuggestsChoice::None
    }
}
