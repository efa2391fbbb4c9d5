// src/resolver/plan.rs

//! Resolution result

use super::mark::MarkState;
use super::problem::{ErrorKind, Problem};
use crate::catalog::Catalog;
use crate::package::PackageId;
use crate::transaction::TransactionKind;
use serde::{Deserialize, Serialize};

/// Outcome of resolving one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub kind: TransactionKind,
    /// Packages to install, dependencies first
    pub install: Vec<PackageId>,
    /// Packages to remove, dependents first
    pub remove: Vec<PackageId>,
    pub errors: Vec<Problem>,
    pub warnings: Vec<Problem>,
    /// Final disposition of every catalog package, indexed by id
    pub marks: Vec<MarkState>,
    /// Resolution stopped early on the interrupt token
    pub interrupted: bool,
}

impl TransactionResult {
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            install: Vec::new(),
            remove: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            marks: Vec::new(),
            interrupted: false,
        }
    }

    /// The list an executor acts on: removal order for uninstall, install
    /// order otherwise
    pub fn ordered_packages(&self) -> &[PackageId] {
        match self.kind {
            TransactionKind::Uninstall => &self.remove,
            TransactionKind::Install | TransactionKind::Verify => &self.install,
        }
    }

    /// Zero errors and not interrupted
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.interrupted
    }

    pub fn error_kinds(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(Problem::kind).collect()
    }

    pub fn mark(&self, id: PackageId) -> MarkState {
        self.marks.get(id.0).copied().unwrap_or_default()
    }

    /// Package strings of `ids`, for display
    pub fn describe(catalog: &Catalog, ids: &[PackageId]) -> Vec<String> {
        ids.iter()
            .filter_map(|&id| catalog.get(id))
            .map(|p| p.to_string())
            .collect()
    }
}
