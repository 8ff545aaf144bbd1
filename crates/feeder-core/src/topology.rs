//! Directed bus graph with string bus names.
//!
//! Vertices are [`BusData`] (the bus name plus its attachments) and edges are
//! [`Edge`] entities, stored in a `petgraph` `StableDiGraph` so that indices
//! of surviving busses stay valid while reduction passes delete vertices. A
//! name → index map gives O(1) lookup from the string API.
//!
//! Edge direction is the power flow reference direction (first bus → second
//! bus). At most one edge may join a pair of busses, in either direction.

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;

use crate::entities::{BusData, Edge};
use crate::{FeederError, FeederResult};

#[derive(Debug, Clone, Default)]
pub struct Topology {
    graph: StableDiGraph<BusData, Edge>,
    index: HashMap<String, NodeIndex>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the underlying graph.
    pub fn graph(&self) -> &StableDiGraph<BusData, Edge> {
        &self.graph
    }

    pub fn bus_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, bus: &str) -> bool {
        self.index.contains_key(bus)
    }

    pub fn index_of(&self, bus: &str) -> Option<NodeIndex> {
        self.index.get(bus).copied()
    }

    pub(crate) fn require(&self, bus: &str) -> FeederResult<NodeIndex> {
        self.index_of(bus)
            .ok_or_else(|| FeederError::NotFound(format!("bus '{bus}'")))
    }

    /// Name of the bus at `idx`. Panics on an index from another graph.
    pub fn name_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].name
    }

    /// Get or create the vertex for `bus`.
    pub fn add_bus(&mut self, bus: &str) -> NodeIndex {
        if let Some(idx) = self.index_of(bus) {
            return idx;
        }
        let idx = self.graph.add_node(BusData::new(bus));
        self.index.insert(bus.to_string(), idx);
        idx
    }

    /// Insert an edge, creating its busses on first reference.
    pub fn add_edge(&mut self, edge: Edge) -> FeederResult<EdgeIndex> {
        let (from, to) = edge.busses();
        if from == to {
            return Err(FeederError::validation(
                edge.label(),
                "an edge must join two distinct busses",
            ));
        }
        if let Some(existing) = self.edge_between(from, to) {
            return Err(FeederError::validation(
                edge.label(),
                format!(
                    "busses {from} and {to} are already joined by {}; parallel edges are not supported",
                    existing.label()
                ),
            ));
        }
        let (from, to) = (from.to_string(), to.to_string());
        let a = self.add_bus(&from);
        let b = self.add_bus(&to);
        Ok(self.graph.add_edge(a, b, edge))
    }

    fn edge_index_between(&self, a: &str, b: &str) -> Option<EdgeIndex> {
        let (a, b) = (self.index_of(a)?, self.index_of(b)?);
        self.graph.find_edge(a, b).or_else(|| self.graph.find_edge(b, a))
    }

    /// The edge joining `a` and `b`, in either direction.
    pub fn edge_between(&self, a: &str, b: &str) -> Option<&Edge> {
        self.edge_index_between(a, b)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Remove a bus and every edge touching it.
    pub fn remove_bus(&mut self, bus: &str) -> Option<BusData> {
        let idx = self.index.remove(bus)?;
        self.graph.remove_node(idx)
    }

    pub fn bus(&self, bus: &str) -> Option<&BusData> {
        self.index_of(bus).map(|idx| &self.graph[idx])
    }

    pub fn bus_mut(&mut self, bus: &str) -> Option<&mut BusData> {
        let idx = self.index_of(bus)?;
        self.graph.node_weight_mut(idx)
    }

    /// Bus names in insertion order.
    pub fn busses(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].name.clone())
            .collect()
    }

    pub fn bus_data(&self) -> impl Iterator<Item = &BusData> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// (from, to) bus names of every edge.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].name.clone(), self.graph[b].name.clone()))
            .collect()
    }

    pub fn edge_entities(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_indices().map(move |e| &self.graph[e])
    }

    pub(crate) fn neighbor_indices(
        &self,
        idx: NodeIndex,
        dir: Direction,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, dir)
    }

    fn neighbor_names(&self, bus: &str, dir: Direction) -> Vec<String> {
        match self.index_of(bus) {
            Some(idx) => self
                .neighbor_indices(idx, dir)
                .map(|n| self.graph[n].name.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Busses fed directly by `bus`. Empty for an unknown bus.
    pub fn successors(&self, bus: &str) -> Vec<String> {
        self.neighbor_names(bus, Direction::Outgoing)
    }

    /// Busses feeding `bus` directly. Empty for an unknown bus.
    pub fn predecessors(&self, bus: &str) -> Vec<String> {
        self.neighbor_names(bus, Direction::Incoming)
    }

    pub(crate) fn degree_of(&self, idx: NodeIndex, dir: Direction) -> usize {
        self.graph.edges_directed(idx, dir).count()
    }

    pub fn in_degree(&self, bus: &str) -> usize {
        self.index_of(bus)
            .map_or(0, |idx| self.degree_of(idx, Direction::Incoming))
    }

    pub fn out_degree(&self, bus: &str) -> usize {
        self.index_of(bus)
            .map_or(0, |idx| self.degree_of(idx, Direction::Outgoing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BusAttachment, Conductor, ShuntAdmittance};

    fn line(from: &str, to: &str) -> Edge {
        Edge::Conductor(Conductor::single_phase(from, to, 0.1, 0.1, 1.0))
    }

    #[test]
    fn add_edge_creates_busses_once() {
        let mut topo = Topology::new();
        topo.add_edge(line("b1", "b2")).unwrap();
        topo.add_edge(line("b2", "b3")).unwrap();
        assert_eq!(topo.bus_count(), 3);
        assert_eq!(topo.edge_count(), 2);
        assert_eq!(topo.busses(), vec!["b1", "b2", "b3"]);
        assert_eq!(topo.successors("b2"), vec!["b3"]);
        assert_eq!(topo.predecessors("b2"), vec!["b1"]);
        assert_eq!(topo.in_degree("b1"), 0);
        assert_eq!(topo.out_degree("b1"), 1);
    }

    #[test]
    fn bus_pair_lookup_ignores_direction() {
        let mut topo = Topology::new();
        topo.add_edge(line("b1", "b2")).unwrap();
        assert!(topo.edge_between("b1", "b2").is_some());
        assert!(topo.edge_between("b2", "b1").is_some());
        assert!(topo.edge_between("b1", "b3").is_none());
    }

    #[test]
    fn parallel_edges_are_rejected() {
        let mut topo = Topology::new();
        topo.add_edge(line("b1", "b2")).unwrap();
        let err = topo.add_edge(line("b2", "b1")).unwrap_err();
        assert!(matches!(err, FeederError::Validation { .. }));
        assert_eq!(topo.edge_count(), 1);
    }

    #[test]
    fn removing_a_bus_drops_its_edges_and_name() {
        let mut topo = Topology::new();
        topo.add_edge(line("b1", "b2")).unwrap();
        topo.add_edge(line("b2", "b3")).unwrap();
        let removed = topo.remove_bus("b2").unwrap();
        assert_eq!(removed.name, "b2");
        assert!(!topo.contains("b2"));
        assert_eq!(topo.edge_count(), 0);
        // surviving indices stay valid
        assert_eq!(topo.bus("b3").unwrap().name, "b3");
        assert!(topo.remove_bus("b2").is_none());
    }

    #[test]
    fn bus_mut_attaches_entities() {
        let mut topo = Topology::new();
        topo.add_bus("b1");
        topo.bus_mut("b1")
            .unwrap()
            .attach(BusAttachment::ShuntAdmittance(ShuntAdmittance {
                bus: "b1".into(),
                g: 0.0,
                b: 0.1,
            }))
            .unwrap();
        assert!(!topo.bus("b1").unwrap().is_empty());
        assert!(topo.bus_mut("b9").is_none());
    }
}
