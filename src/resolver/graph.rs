// src/resolver/graph.rs

//! Install ordering
//!
//! Edges run from provider to dependent over a fixed node set and carry a
//! `pre` flag for Requires(pre). Ordering is Kahn's algorithm with ready
//! nodes taken by (install priority, catalog order). A stall means a loop.
//! The loop broken is one no other remaining node leads into, and the rest
//! of it goes out before whatever merely depends on it. It is broken at a
//! node with no pending pre edge when there is one; a loop made only of pre
//! edges is reported.

use crate::catalog::CapabilityIndex;
use crate::package::PackageId;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// A provider-to-dependent edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEdge {
    pub from: PackageId,
    pub to: PackageId,
    pub pre: bool,
}

/// Dependency graph over one set of packages
#[derive(Debug, Clone, Default)]
pub struct OrderGraph {
    nodes: Vec<PackageId>,
    edges: Vec<OrderEdge>,
    outgoing: HashMap<PackageId, Vec<usize>>,
    incoming: HashMap<PackageId, Vec<usize>>,
}

impl OrderGraph {
    /// Build edges between `nodes` from their hard requirements
    ///
    /// Every node providing a requirement of another gets an edge to it;
    /// self-provided requirements add nothing. Every requirement named in a
    /// boolean requirement counts.
    pub fn build(index: &CapabilityIndex<'_>, nodes: &[PackageId]) -> Self {
        let catalog = index.catalog();
        let members: HashSet<PackageId> = nodes.iter().copied().collect();
        let mut graph = Self {
            nodes: nodes.to_vec(),
            ..Default::default()
        };
        let mut seen: HashMap<(PackageId, PackageId), usize> = HashMap::new();

        for &to in nodes {
            let pkg = &catalog[to];
            let rich = pkg.rich_requires.iter().flat_map(|dep| dep.leaves());
            for req in pkg.hard_requirements().map(|(_, req)| req).chain(rich) {
                for from in index.find(req) {
                    if from == to || !members.contains(&from) {
                        continue;
                    }
                    match seen.get(&(from, to)) {
                        Some(&e) => graph.edges[e].pre |= req.flags.prereq,
                        None => {
                            seen.insert((from, to), graph.edges.len());
                            graph.add_edge(OrderEdge {
                                from,
                                to,
                                pre: req.flags.prereq,
                            });
                        }
                    }
                }
            }
        }

        graph
    }

    pub fn add_edge(&mut self, edge: OrderEdge) {
        let e = self.edges.len();
        self.outgoing.entry(edge.from).or_default().push(e);
        self.incoming.entry(edge.to).or_default().push(e);
        self.edges.push(edge);
    }

    /// Providers `id` depends on
    pub fn dependencies(&self, id: PackageId) -> Vec<PackageId> {
        self.incoming
            .get(&id)
            .map(|es| es.iter().map(|&e| self.edges[e].from).collect())
            .unwrap_or_default()
    }

    /// Packages depending on `id`
    pub fn dependents(&self, id: PackageId) -> Vec<PackageId> {
        self.outgoing
            .get(&id)
            .map(|es| es.iter().map(|&e| self.edges[e].to).collect())
            .unwrap_or_default()
    }

    /// Linearize the nodes, providers first
    ///
    /// Returns the order and every loop made only of pre edges. Such a loop
    /// is still broken so the order is complete.
    pub fn sort<F>(&self, priority: F) -> (Vec<PackageId>, Vec<Vec<PackageId>>)
    where
        F: Fn(PackageId) -> i32,
    {
        let mut pending_pre: HashMap<PackageId, usize> = HashMap::new();
        let mut pending_all: HashMap<PackageId, usize> = HashMap::new();
        for edge in &self.edges {
            *pending_all.entry(edge.to).or_insert(0) += 1;
            if edge.pre {
                *pending_pre.entry(edge.to).or_insert(0) += 1;
            }
        }

        let key = |id: PackageId| (priority(id), id);
        let mut remaining: BTreeSet<(i32, PackageId)> =
            self.nodes.iter().map(|&id| key(id)).collect();
        let mut ready: BTreeSet<(i32, PackageId)> = self
            .nodes
            .iter()
            .filter(|id| !pending_all.contains_key(id))
            .map(|&id| key(id))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut cycles = Vec::new();
        // Members of the last broken loop go out before anything else
        let mut in_loop: HashSet<PackageId> = HashSet::new();

        while !remaining.is_empty() {
            let looped = ready.iter().find(|(_, id)| in_loop.contains(id)).copied();
            let next = match looped.or_else(|| ready.first().copied()) {
                Some(k) => k,
                None => {
                    let component = self.source_component(&remaining);
                    let Some(&first) = component.first() else {
                        break;
                    };
                    in_loop = component.iter().map(|(_, id)| *id).collect();
                    let soft = component
                        .iter()
                        .find(|(_, id)| pending_pre.get(id).copied().unwrap_or(0) == 0)
                        .copied();
                    match soft {
                        Some(k) => {
                            debug!("Breaking dependency loop at {}", k.1);
                            k
                        }
                        None => {
                            let cycle = self.pre_cycle(&component);
                            let k = cycle.iter().map(|&id| key(id)).min().unwrap_or(first);
                            debug!("Requires(pre) loop broken at {}", k.1);
                            cycles.push(cycle);
                            k
                        }
                    }
                }
            };

            remaining.remove(&next);
            ready.remove(&next);
            let id = next.1;
            order.push(id);

            for &e in self.outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                let edge = self.edges[e];
                if !remaining.contains(&key(edge.to)) {
                    continue;
                }
                if edge.pre
                    && let Some(n) = pending_pre.get_mut(&edge.to)
                {
                    *n -= 1;
                }
                if let Some(n) = pending_all.get_mut(&edge.to) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(key(edge.to));
                    }
                }
            }
        }

        (order, cycles)
    }

    /// Strongly connected part of the remaining nodes with no remaining
    /// predecessor outside of it, in key order
    ///
    /// Starts at the smallest node and moves upstream while some node reaches
    /// the current one without being reachable from it.
    fn source_component(&self, remaining: &BTreeSet<(i32, PackageId)>) -> Vec<(i32, PackageId)> {
        let live: HashSet<PackageId> = remaining.iter().map(|(_, id)| *id).collect();
        let Some(&(_, first)) = remaining.iter().next() else {
            return Vec::new();
        };

        let mut start = first;
        loop {
            let back = self.reach(start, &live, Self::dependencies);
            let forth = self.reach(start, &live, Self::dependents);
            match remaining
                .iter()
                .find(|(_, id)| back.contains(id) && !forth.contains(id))
            {
                Some(&(_, upstream)) => start = upstream,
                None => {
                    return remaining
                        .iter()
                        .filter(|(_, id)| back.contains(id))
                        .copied()
                        .collect();
                }
            }
        }
    }

    /// Nodes of `live` reachable from `start` through `next`, `start` included
    fn reach<F>(&self, start: PackageId, live: &HashSet<PackageId>, next: F) -> HashSet<PackageId>
    where
        F: Fn(&Self, PackageId) -> Vec<PackageId>,
    {
        let mut seen = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            for n in next(self, id) {
                if live.contains(&n) && seen.insert(n) {
                    stack.push(n);
                }
            }
        }
        seen
    }

    /// Walk pending pre edges backwards until a node repeats
    ///
    /// Only called on a source component where every node has a pending pre
    /// edge, so the walk always finds a loop. The loop is returned in
    /// dependency direction, closed (first node repeated at the end).
    fn pre_cycle(&self, component: &[(i32, PackageId)]) -> Vec<PackageId> {
        let live: HashSet<PackageId> = component.iter().map(|(_, id)| *id).collect();
        let Some(&(_, start)) = component.first() else {
            return Vec::new();
        };

        let mut path: Vec<PackageId> = Vec::new();
        let mut cur = start;
        loop {
            if let Some(pos) = path.iter().position(|&p| p == cur) {
                let mut cycle: Vec<PackageId> = path[pos..].to_vec();
                cycle.reverse();
                if let Some(&first) = cycle.first() {
                    cycle.push(first);
                }
                return cycle;
            }
            path.push(cur);

            let pred = self
                .incoming
                .get(&cur)
                .into_iter()
                .flatten()
                .map(|&e| self.edges[e])
                .filter(|e| e.pre && live.contains(&e.from))
                .map(|e| e.from)
                .min();
            match pred {
                Some(p) => cur = p,
                None => return path,
            }
        }
    }

    /// Whether every pre edge goes forward in `order`
    pub fn respects_prereqs(&self, order: &[PackageId]) -> bool {
        let pos: HashMap<PackageId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        self.edges.iter().filter(|e| e.pre).all(|e| {
            match (pos.get(&e.from), pos.get(&e.to)) {
                (Some(a), Some(b)) => a < b,
                _ => true,
            }
        })
    }
}
