// src/resolver/mark.rs

//! Per-package disposition for one transaction
//!
//! Invariants kept by every operation:
//! - a package is never marked for install and removal at once
//! - only available packages are install-marked, only installed ones are
//!   remove-marked
//! - unless duplicates are allowed, at most one package of a kind (name, and
//!   arch under multilib) is install-marked, except where one obsoletes the
//!   other
//! - a hand mark is never turned into a dependency mark

use crate::catalog::Catalog;
use crate::package::PackageId;
use crate::version::EpochPolicy;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Who asked for a mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkedBy {
    Hand,
    Dependency,
}

/// Disposition of one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkState {
    #[default]
    Unmarked,
    Install(MarkedBy),
    Remove(MarkedBy),
    /// Not selectable by dependency resolution
    Held,
    /// Outside the resolution universe
    Ignored,
}

impl MarkState {
    fn by(by_dependency: bool) -> MarkedBy {
        if by_dependency {
            MarkedBy::Dependency
        } else {
            MarkedBy::Hand
        }
    }
}

/// Mutable overlay over a catalog
#[derive(Debug, Clone)]
pub struct MarkSet<'c> {
    catalog: &'c Catalog,
    states: Vec<MarkState>,
    /// State each package returns to when unmarked
    base: Vec<MarkState>,
    /// Marked packages in marking order
    order: Vec<PackageId>,
    multilib: bool,
    allow_duplicates: bool,
    policy: EpochPolicy,
}

impl<'c> MarkSet<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            states: vec![MarkState::Unmarked; catalog.len()],
            base: vec![MarkState::Unmarked; catalog.len()],
            order: Vec::new(),
            multilib: false,
            allow_duplicates: false,
            policy: EpochPolicy::Zero,
        }
    }

    pub fn with_rules(mut self, multilib: bool, allow_duplicates: bool, policy: EpochPolicy) -> Self {
        self.multilib = multilib;
        self.allow_duplicates = allow_duplicates;
        self.policy = policy;
        self
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Exclude `id` from dependency selection
    pub fn hold(&mut self, id: PackageId) {
        self.set_base(id, MarkState::Held);
    }

    /// Exclude `id` from resolution entirely
    pub fn ignore(&mut self, id: PackageId) {
        self.set_base(id, MarkState::Ignored);
    }

    fn set_base(&mut self, id: PackageId, state: MarkState) {
        self.base[id.0] = state;
        if !self.is_marked(id) {
            self.states[id.0] = state;
        }
    }

    pub fn state(&self, id: PackageId) -> MarkState {
        self.states[id.0]
    }

    pub fn states(&self) -> &[MarkState] {
        &self.states
    }

    /// Install-marked package of the same kind that `id` may not coexist with
    pub fn install_blocker(&self, id: PackageId) -> Option<PackageId> {
        if self.allow_duplicates {
            return None;
        }
        let pkg = &self.catalog[id];
        self.catalog.by_name(&pkg.name).iter().copied().find(|&other| {
            other != id
                && self.is_marked_install(other)
                && self.catalog[other].is_kind_of(pkg, self.multilib)
                && !pkg.obsoletes(&self.catalog[other], self.policy)
                && !self.catalog[other].obsoletes(pkg, self.policy)
        })
    }

    /// Whether `mark_install(id, by_dependency)` would succeed
    pub fn can_mark_install(&self, id: PackageId, by_dependency: bool) -> bool {
        if self.catalog[id].installed {
            return false;
        }
        match self.state(id) {
            MarkState::Install(_) => true,
            MarkState::Remove(_) | MarkState::Ignored => false,
            MarkState::Held if by_dependency => false,
            MarkState::Held | MarkState::Unmarked => self.install_blocker(id).is_none(),
        }
    }

    /// Mark `id` for installation; false leaves the set unchanged
    pub fn mark_install(&mut self, id: PackageId, by_dependency: bool) -> bool {
        if !self.can_mark_install(id, by_dependency) {
            trace!("mark install refused for {}", self.catalog[id]);
            return false;
        }
        match self.state(id) {
            MarkState::Install(MarkedBy::Dependency) if !by_dependency => {
                self.states[id.0] = MarkState::Install(MarkedBy::Hand);
            }
            MarkState::Install(_) => {}
            _ => {
                self.states[id.0] = MarkState::Install(MarkState::by(by_dependency));
                self.order.push(id);
                trace!("marked {} for install", self.catalog[id]);
            }
        }
        true
    }

    /// Whether `mark_remove(id, by_dependency)` would succeed
    pub fn can_mark_remove(&self, id: PackageId, by_dependency: bool) -> bool {
        if !self.catalog[id].installed {
            return false;
        }
        match self.state(id) {
            MarkState::Remove(_) => true,
            MarkState::Install(_) | MarkState::Ignored => false,
            MarkState::Held => !by_dependency,
            MarkState::Unmarked => true,
        }
    }

    /// Mark `id` for removal; false leaves the set unchanged
    pub fn mark_remove(&mut self, id: PackageId, by_dependency: bool) -> bool {
        if !self.can_mark_remove(id, by_dependency) {
            trace!("mark remove refused for {}", self.catalog[id]);
            return false;
        }
        self.force_remove(id, by_dependency);
        true
    }

    /// Remove-mark an installed package being replaced, even when held
    pub(crate) fn mark_replaced(&mut self, id: PackageId) -> bool {
        if !self.catalog[id].installed || self.is_marked_install(id) {
            return false;
        }
        self.force_remove(id, true);
        true
    }

    fn force_remove(&mut self, id: PackageId, by_dependency: bool) {
        match self.state(id) {
            MarkState::Remove(MarkedBy::Dependency) if !by_dependency => {
                self.states[id.0] = MarkState::Remove(MarkedBy::Hand);
            }
            MarkState::Remove(_) => {}
            _ => {
                self.states[id.0] = MarkState::Remove(MarkState::by(by_dependency));
                self.order.push(id);
                trace!("marked {} for removal", self.catalog[id]);
            }
        }
    }

    /// Drop any install/remove mark on `id`
    pub fn unmark(&mut self, id: PackageId) {
        if self.is_marked(id) {
            self.states[id.0] = self.base[id.0];
            self.order.retain(|&o| o != id);
            trace!("unmarked {}", self.catalog[id]);
        }
    }

    pub fn is_marked(&self, id: PackageId) -> bool {
        matches!(self.state(id), MarkState::Install(_) | MarkState::Remove(_))
    }

    pub fn is_marked_install(&self, id: PackageId) -> bool {
        matches!(self.state(id), MarkState::Install(_))
    }

    pub fn is_marked_remove(&self, id: PackageId) -> bool {
        matches!(self.state(id), MarkState::Remove(_))
    }

    pub fn is_hand_marked(&self, id: PackageId) -> bool {
        matches!(
            self.state(id),
            MarkState::Install(MarkedBy::Hand) | MarkState::Remove(MarkedBy::Hand)
        )
    }

    pub fn is_held(&self, id: PackageId) -> bool {
        self.base[id.0] == MarkState::Held
    }

    pub fn is_ignored(&self, id: PackageId) -> bool {
        self.base[id.0] == MarkState::Ignored
    }

    /// Installed and staying installed
    pub fn is_kept_installed(&self, id: PackageId) -> bool {
        self.catalog[id].installed && !self.is_marked_remove(id)
    }

    /// Present after the transaction: install-marked or kept installed
    pub fn is_present(&self, id: PackageId) -> bool {
        self.is_marked_install(id) || self.is_kept_installed(id)
    }

    /// Install-marked packages in marking order
    pub fn install_marked(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.is_marked_install(id))
    }

    /// Remove-marked packages in marking order
    pub fn remove_marked(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.is_marked_remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogManifest, PackageRecord};

    fn catalog() -> Catalog {
        CatalogManifest {
            available: vec![
                PackageRecord::new("a", "2.0", "1"),
                PackageRecord::new("a", "1.5", "1"),
                PackageRecord::new("b", "1.0", "1").with_obsoletes("a"),
                PackageRecord::new("a-ng", "1.0", "1").with_obsoletes("a < 2.0"),
            ],
            installed: vec![PackageRecord::new("a", "1.0", "1")],
        }
        .into_catalog()
        .unwrap()
    }

    fn id(c: &Catalog, s: &str) -> PackageId {
        c.iter().find(|(_, p)| p.to_string() == s).map(|(id, _)| id).unwrap()
    }

    #[test]
    fn test_mark_install_idempotent() {
        let c = catalog();
        let a2 = id(&c, "a-2.0-1");
        let mut marks = MarkSet::new(&c);

        assert!(marks.mark_install(a2, false));
        let snapshot = marks.states().to_vec();
        assert!(marks.mark_install(a2, false));
        assert_eq!(marks.states(), snapshot.as_slice());
        assert_eq!(marks.install_marked().count(), 1);
    }

    #[test]
    fn test_hand_mark_not_downgraded() {
        let c = catalog();
        let a2 = id(&c, "a-2.0-1");
        let mut marks = MarkSet::new(&c);

        assert!(marks.mark_install(a2, true));
        assert!(!marks.is_hand_marked(a2));
        assert!(marks.mark_install(a2, false));
        assert!(marks.is_hand_marked(a2));
        assert!(marks.mark_install(a2, true));
        assert!(marks.is_hand_marked(a2));
    }

    #[test]
    fn test_same_kind_exclusive() {
        let c = catalog();
        let (a2, a15) = (id(&c, "a-2.0-1"), id(&c, "a-1.5-1"));
        let mut marks = MarkSet::new(&c);

        assert!(marks.mark_install(a2, false));
        assert!(!marks.mark_install(a15, false));
        assert!(!marks.is_marked(a15));

        let mut marks = MarkSet::new(&c).with_rules(false, true, EpochPolicy::Zero);
        assert!(marks.mark_install(a2, false));
        assert!(marks.mark_install(a15, false));
    }

    #[test]
    fn test_install_and_remove_exclusive() {
        let c = catalog();
        let installed = id(&c, "a-1.0-1");
        let a2 = id(&c, "a-2.0-1");
        let mut marks = MarkSet::new(&c);

        assert!(!marks.mark_install(installed, false));
        assert!(!marks.mark_remove(a2, false));
        assert!(marks.mark_remove(installed, true));
        assert!(marks.is_marked_remove(installed));
        assert!(!marks.is_marked_install(installed));
        assert!(!marks.is_kept_installed(installed));
    }

    #[test]
    fn test_held_and_ignored() {
        let c = catalog();
        let installed = id(&c, "a-1.0-1");
        let b = id(&c, "b-1.0-1");
        let ng = id(&c, "a-ng-1.0-1");
        let mut marks = MarkSet::new(&c);
        marks.hold(b);
        marks.hold(installed);
        marks.ignore(ng);

        assert!(!marks.mark_install(b, true));
        assert!(marks.mark_install(b, false));
        assert!(!marks.mark_install(ng, false));
        assert!(!marks.mark_remove(installed, true));
        assert!(marks.mark_replaced(installed));

        marks.unmark(b);
        assert_eq!(marks.state(b), MarkState::Held);
    }

    #[test]
    fn test_unmark_restores_order() {
        let c = catalog();
        let a2 = id(&c, "a-2.0-1");
        let b = id(&c, "b-1.0-1");
        let mut marks = MarkSet::new(&c);
        marks.mark_install(a2, true);
        marks.mark_install(b, false);
        marks.unmark(a2);

        assert_eq!(marks.install_marked().collect::<Vec<_>>(), vec![b]);
        assert_eq!(marks.state(a2), MarkState::Unmarked);
    }
}
