//! In-place simplification of a radial network.
//!
//! `reduce_tree` merges pass-through busses into equivalent conductors and
//! `trim_tree` drops branches that end in empty busses. Both repeat until a
//! pass changes nothing, so running them again is a no-op. Busses that carry
//! a load, shunt or regulator terminal are never removed, nor is the
//! substation bus.

use std::collections::HashSet;

use crate::entities::Edge;
use crate::graph_utils::{
    all_inneighbors, all_outneighbors, busses_from_deepest_to_source, leaf_busses,
};
use crate::{FeederError, FeederResult, Network};

impl Network {
    fn is_removable(&self, bus: &str) -> bool {
        bus != self.substation_bus && self.graph.bus(bus).is_some_and(|b| b.is_empty())
    }

    /// Replace conductors i→j and j→k by one equivalent conductor i→k and
    /// delete bus `j`.
    ///
    /// Returns false and leaves the network unchanged unless `j` has exactly
    /// one inneighbor and one outneighbor, nothing attached, and both of its
    /// edges are conductors with the same phases.
    pub fn remove_bus(&mut self, j: &str) -> bool {
        if !self.is_removable(j) || self.graph.in_degree(j) != 1 || self.graph.out_degree(j) != 1 {
            return false;
        }
        let (Some(i), Some(k)) = (
            self.graph.predecessors(j).pop(),
            self.graph.successors(j).pop(),
        ) else {
            return false;
        };
        if i == k || self.graph.edge_between(&i, &k).is_some() {
            return false;
        }
        let merged = match (self.graph.edge_between(&i, j), self.graph.edge_between(j, &k)) {
            (Some(Edge::Conductor(ij)), Some(Edge::Conductor(jk))) => ij.in_series(jk),
            _ => None,
        };
        let Some(merged) = merged else {
            return false;
        };

        self.graph.remove_bus(j);
        tracing::debug!(bus = j, from = %i, to = %k, length = merged.length, "merged pass-through bus");
        self.graph.add_edge(Edge::Conductor(merged)).is_ok()
    }

    /// Merge every pass-through bus, deepest first, until none is left.
    /// Returns the number of busses removed.
    pub fn reduce_tree(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let order: Vec<String> =
                match busses_from_deepest_to_source(self, &self.substation_bus) {
                    Ok(order) => order.into_iter().map(|(bus, _)| bus).collect(),
                    Err(_) => self.graph.busses().into_iter().rev().collect(),
                };
            let merged = order.iter().filter(|bus| self.remove_bus(bus)).count();
            if merged == 0 {
                break;
            }
            removed += merged;
        }
        if removed > 0 {
            tracing::info!(removed, busses = self.graph.bus_count(), "reduced network");
        }
        removed
    }

    /// Remove every empty leaf bus with its inbound edge. Returns the number
    /// of busses removed.
    pub fn trim_tree_once(&mut self) -> usize {
        let mut trimmed = 0;
        for leaf in leaf_busses(self) {
            if self.is_removable(&leaf) {
                tracing::debug!(bus = %leaf, "trimmed empty leaf bus");
                self.graph.remove_bus(&leaf);
                trimmed += 1;
            }
        }
        trimmed
    }

    /// Trim empty leaves until every leaf carries something. Returns the
    /// number of busses removed.
    pub fn trim_tree(&mut self) -> usize {
        let mut trimmed = 0;
        loop {
            let once = self.trim_tree_once();
            if once == 0 {
                break;
            }
            trimmed += once;
        }
        if trimmed > 0 {
            tracing::info!(trimmed, busses = self.graph.bus_count(), "trimmed network");
        }
        trimmed
    }

    /// Delete `bus` and every bus above it, with their edges, then every bus
    /// no longer reachable from the substation (side branches that hung off
    /// the deleted busses). Returns the number of busses removed.
    ///
    /// When the substation goes too, the single bus below `bus` becomes the
    /// new substation; if `bus` has no or several outneighbors the network is
    /// left untouched and a structural error is returned.
    pub fn trim_above_bus(&mut self, bus: &str) -> FeederResult<usize> {
        let mut doomed: HashSet<String> = all_inneighbors(self, bus)?.into_iter().collect();
        doomed.insert(bus.to_string());

        if doomed.contains(&self.substation_bus) {
            let below = self.graph.successors(bus);
            let [new_root] = below.as_slice() else {
                return Err(FeederError::structural(
                    bus,
                    format!(
                        "trimming above this bus removes the substation and it has {} outneighbors to take its place",
                        below.len()
                    ),
                ));
            };
            tracing::debug!(old = %self.substation_bus, new = %new_root, "moved substation bus");
            self.substation_bus = new_root.clone();
        }

        for name in &doomed {
            self.graph.remove_bus(name);
        }

        let mut kept: HashSet<String> = all_outneighbors(self, &self.substation_bus)?
            .into_iter()
            .collect();
        kept.insert(self.substation_bus.clone());
        let orphans: Vec<String> = self
            .graph
            .busses()
            .into_iter()
            .filter(|name| !kept.contains(name))
            .collect();
        for name in &orphans {
            self.graph.remove_bus(name);
        }

        let removed = doomed.len() + orphans.len();
        tracing::debug!(bus, removed, orphans = orphans.len(), "trimmed busses above bus");
        Ok(removed)
    }
}
