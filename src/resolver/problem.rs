// src/resolver/problem.rs

//! Problems found while resolving a transaction
//!
//! Problems are values, not errors: the resolver classifies and counts them,
//! and the transaction options decide which ones are fatal.

use crate::args::ArgIssue;
use crate::transaction::TransactionOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Problem classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoSuchPackageOrDirectory,
    AmbiguousName,
    UnsatisfiedRequirement,
    UnresolvableConflict,
    AmbiguousProvider,
    OrderingCycle,
    AbortedByUser,
    FileConflict,
    FileOrphan,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NoSuchPackageOrDirectory => "no such package",
            ErrorKind::AmbiguousName => "ambiguous name",
            ErrorKind::UnsatisfiedRequirement => "unsatisfied requirement",
            ErrorKind::UnresolvableConflict => "unresolvable conflict",
            ErrorKind::AmbiguousProvider => "ambiguous provider",
            ErrorKind::OrderingCycle => "ordering cycle",
            ErrorKind::AbortedByUser => "aborted by user",
            ErrorKind::FileConflict => "file conflict",
            ErrorKind::FileOrphan => "file orphan",
        };
        f.write_str(s)
    }
}

/// One classified problem, with enough context to reproduce the decision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    NoSuchPackage {
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    AmbiguousName {
        token: String,
        candidates: Vec<String>,
    },
    UnsatisfiedRequirement {
        package: String,
        requirement: String,
        /// Installed package whose removal left the requirement dangling
        #[serde(default, skip_serializing_if = "Option::is_none")]
        removed_provider: Option<String>,
    },
    UnresolvableConflict {
        package: String,
        conflicting_package: String,
        conflict: String,
    },
    AmbiguousProvider {
        requirement: String,
        candidates: Vec<String>,
    },
    OrderingCycle {
        cycle: Vec<String>,
    },
    AbortedByUser {
        context: String,
    },
    FileConflict {
        path: String,
        packages: Vec<String>,
    },
    FileOrphan {
        path: String,
        package: String,
    },
}

impl Problem {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Problem::NoSuchPackage { .. } => ErrorKind::NoSuchPackageOrDirectory,
            Problem::AmbiguousName { .. } => ErrorKind::AmbiguousName,
            Problem::UnsatisfiedRequirement { .. } => ErrorKind::UnsatisfiedRequirement,
            Problem::UnresolvableConflict { .. } => ErrorKind::UnresolvableConflict,
            Problem::AmbiguousProvider { .. } => ErrorKind::AmbiguousProvider,
            Problem::OrderingCycle { .. } => ErrorKind::OrderingCycle,
            Problem::AbortedByUser { .. } => ErrorKind::AbortedByUser,
            Problem::FileConflict { .. } => ErrorKind::FileConflict,
            Problem::FileOrphan { .. } => ErrorKind::FileOrphan,
        }
    }

    /// Whether the options turn this problem into a warning
    pub fn is_downgraded(&self, options: &TransactionOptions) -> bool {
        match self.kind() {
            ErrorKind::AmbiguousProvider => true,
            ErrorKind::UnsatisfiedRequirement => options.no_deps(),
            ErrorKind::UnresolvableConflict
            | ErrorKind::OrderingCycle
            | ErrorKind::FileConflict
            | ErrorKind::FileOrphan => options.force(),
            ErrorKind::NoSuchPackageOrDirectory
            | ErrorKind::AmbiguousName
            | ErrorKind::AbortedByUser => false,
        }
    }

    /// Conflict between `a` and `b` in either direction
    pub fn is_conflict_between(&self, a: &str, b: &str) -> bool {
        match self {
            Problem::UnresolvableConflict {
                package,
                conflicting_package,
                ..
            } => {
                (package == a && conflicting_package == b)
                    || (package == b && conflicting_package == a)
            }
            _ => false,
        }
    }
}

impl From<ArgIssue> for Problem {
    fn from(issue: ArgIssue) -> Self {
        match issue {
            ArgIssue::NoMatch { token } => Problem::NoSuchPackage {
                token,
                reason: None,
            },
            ArgIssue::Ambiguous { token, candidates } => {
                Problem::AmbiguousName { token, candidates }
            }
            ArgIssue::InvalidMask { token, reason } => Problem::NoSuchPackage {
                token,
                reason: Some(reason),
            },
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::NoSuchPackage { token, reason } => match reason {
                Some(reason) => write!(f, "{}: no such package ({})", token, reason),
                None => write!(f, "{}: no such package", token),
            },
            Problem::AmbiguousName { token, candidates } => {
                write!(f, "{}: ambiguous name ({})", token, candidates.join(", "))
            }
            Problem::UnsatisfiedRequirement {
                package,
                requirement,
                removed_provider,
            } => match removed_provider {
                Some(removed) => write!(
                    f,
                    "{} is required by {} (provided by {} being removed)",
                    requirement, package, removed
                ),
                None => write!(f, "{} is required by {}", requirement, package),
            },
            Problem::UnresolvableConflict {
                package,
                conflicting_package,
                conflict,
            } => write!(
                f,
                "{} conflicts with {} ({})",
                package, conflicting_package, conflict
            ),
            Problem::AmbiguousProvider {
                requirement,
                candidates,
            } => write!(
                f,
                "{} is provided by several packages: {}",
                requirement,
                candidates.join(", ")
            ),
            Problem::OrderingCycle { cycle } => {
                write!(f, "Requires(pre) loop: {}", cycle.join(" -> "))
            }
            Problem::AbortedByUser { context } => write!(f, "aborted by user: {}", context),
            Problem::FileConflict { path, packages } => {
                write!(f, "file {} conflicts between {}", path, packages.join(", "))
            }
            Problem::FileOrphan { path, package } => {
                write!(f, "file {} of {} is left without an owner directory", path, package)
            }
        }
    }
}

/// Deduplicated problem accumulator
#[derive(Debug, Clone, Default)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem; false if it was already recorded
    pub fn push(&mut self, problem: Problem) -> bool {
        if self.problems.contains(&problem) {
            return false;
        }
        debug!("{}: {}", problem.kind(), problem);
        self.problems.push(problem);
        true
    }

    pub fn contains(&self, problem: &Problem) -> bool {
        self.problems.contains(problem)
    }

    pub fn has_conflict_between(&self, a: &str, b: &str) -> bool {
        self.problems.iter().any(|p| p.is_conflict_between(a, b))
    }

    /// Whether `requirement` of `package` was already reported unsatisfied,
    /// whatever the removed provider
    pub fn has_unsatisfied(&self, package: &str, requirement: &str) -> bool {
        self.problems.iter().any(|p| {
            matches!(p, Problem::UnsatisfiedRequirement {
                package: pk,
                requirement: rq,
                ..
            } if pk == package && rq == requirement)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter()
    }

    /// Split into (errors, warnings) under `options`
    ///
    /// Downgraded problems are still logged; nothing is dropped.
    pub fn classify(self, options: &TransactionOptions) -> (Vec<Problem>, Vec<Problem>) {
        let (warnings, errors): (Vec<Problem>, Vec<Problem>) = self
            .problems
            .into_iter()
            .partition(|p| p.is_downgraded(options));
        for w in &warnings {
            warn!("{}", w);
        }
        (errors, warnings)
    }
}
