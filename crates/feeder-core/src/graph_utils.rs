use crate::{FeederError, FeederResult, Network};
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

/// Every bus reachable from `bus` following edges in `dir`, excluding `bus`,
/// in breadth-first order. Each bus is visited once even if a cycle slipped in.
fn closure(network: &Network, bus: &str, dir: Direction) -> FeederResult<Vec<String>> {
    let topo = &network.graph;
    let start = topo.require(bus)?;
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut found = Vec::new();
    while let Some(node) = queue.pop_front() {
        for next in topo.neighbor_indices(node, dir) {
            if visited.insert(next) {
                found.push(topo.name_of(next).to_string());
                queue.push_back(next);
            }
        }
    }
    Ok(found)
}

/// All busses above `bus` (its upstream closure).
pub fn all_inneighbors(network: &Network, bus: &str) -> FeederResult<Vec<String>> {
    closure(network, bus, Direction::Incoming)
}

/// All busses below `bus` (its downstream closure).
pub fn all_outneighbors(network: &Network, bus: &str) -> FeederResult<Vec<String>> {
    closure(network, bus, Direction::Outgoing)
}

/// Busses reachable from `source` with their depth (edges from `source`),
/// deepest first. Busses of equal depth keep breadth-first order.
pub fn busses_from_deepest_to_source(
    network: &Network,
    source: &str,
) -> FeederResult<Vec<(String, usize)>> {
    let topo = &network.graph;
    let start = topo.require(source)?;
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut order: Vec<(NodeIndex, usize)> = Vec::new();
    while let Some((node, depth)) = queue.pop_front() {
        order.push((node, depth));
        for next in topo.neighbor_indices(node, Direction::Outgoing) {
            if visited.insert(next) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    order.reverse();
    Ok(order
        .into_iter()
        .map(|(idx, depth)| (topo.name_of(idx).to_string(), depth))
        .collect())
}

/// Busses with no downstream edges.
pub fn leaf_busses(network: &Network) -> Vec<String> {
    filter_busses(network, |topo, idx| {
        topo.degree_of(idx, Direction::Outgoing) == 0
    })
}

/// Busses fed by more than one edge; a radial feeder has none.
pub fn busses_with_multiple_inneighbors(network: &Network) -> Vec<String> {
    filter_busses(network, |topo, idx| {
        topo.degree_of(idx, Direction::Incoming) > 1
    })
}

fn filter_busses(
    network: &Network,
    keep: impl Fn(&crate::Topology, NodeIndex) -> bool,
) -> Vec<String> {
    let topo = &network.graph;
    topo.graph()
        .node_indices()
        .filter(|&idx| keep(topo, idx))
        .map(|idx| topo.name_of(idx).to_string())
        .collect()
}

/// All simple directed paths from `from` to `to`, each listed bus by bus.
pub fn paths_between(network: &Network, from: &str, to: &str) -> FeederResult<Vec<Vec<String>>> {
    let topo = &network.graph;
    let start = topo.require(from)?;
    let goal = topo.require(to)?;
    let mut paths = Vec::new();
    if start == goal {
        paths.push(vec![from.to_string()]);
        return Ok(paths);
    }

    // Depth-first search with an explicit stack of successor iterators.
    let mut path = vec![start];
    let mut on_path = HashSet::from([start]);
    let mut stack: Vec<Vec<NodeIndex>> =
        vec![topo.neighbor_indices(start, Direction::Outgoing).collect()];
    while let Some(children) = stack.last_mut() {
        match children.pop() {
            Some(child) if child == goal => {
                let mut found: Vec<String> =
                    path.iter().map(|&idx| topo.name_of(idx).to_string()).collect();
                found.push(to.to_string());
                paths.push(found);
            }
            Some(child) if on_path.insert(child) => {
                path.push(child);
                stack.push(topo.neighbor_indices(child, Direction::Outgoing).collect());
            }
            Some(_) => {}
            None => {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }
    Ok(paths)
}

/// Walk up from `bus` and return the first bus with more than one outgoing
/// edge, or `None` when the walk ends at the top of the feeder.
///
/// Fails with a structural error if any bus on the way has more than one
/// incoming edge, since the upward walk would be ambiguous.
pub fn next_bus_above_with_outdegree_more_than_one(
    network: &Network,
    bus: &str,
) -> FeederResult<Option<String>> {
    let topo = &network.graph;
    let mut current = topo.require(bus)?;
    let mut visited = HashSet::from([current]);
    loop {
        let mut parents = topo.neighbor_indices(current, Direction::Incoming);
        let parent = match (parents.next(), parents.next()) {
            (None, _) => return Ok(None),
            (Some(parent), None) => parent,
            (Some(_), Some(_)) => {
                return Err(FeederError::structural(
                    topo.name_of(current),
                    "bus has more than one inneighbor",
                ))
            }
        };
        if !visited.insert(parent) {
            return Err(FeederError::structural(
                topo.name_of(parent),
                "cycle found while walking upstream",
            ));
        }
        if topo.degree_of(parent, Direction::Outgoing) > 1 {
            return Ok(Some(topo.name_of(parent).to_string()));
        }
        current = parent;
    }
}

/// Export the topology to a DOT string (Graphviz) so external tools can visualize the feeder.
pub fn export_graph(network: &Network, format: &str) -> FeederResult<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(network)),
        other => Err(FeederError::NotFound(format!(
            "graph export format '{other}'"
        ))),
    }
}

fn render_dot(network: &Network) -> String {
    let graph = network.graph.graph();
    let mut buffer = String::new();
    buffer.push_str("digraph feeder {\n");
    for node in graph.node_indices() {
        let bus = &graph[node];
        let label = sanitize_label(&bus.name);
        if bus.is_empty() {
            buffer.push_str(&format!("  n{} [label=\"{}\"];\n", node.index(), label));
        } else {
            let kinds: Vec<String> = bus.attachments.keys().map(|k| format!("{k:?}")).collect();
            buffer.push_str(&format!(
                "  n{} [label=\"{}\\n{}\", shape=box];\n",
                node.index(),
                label,
                kinds.join(", ")
            ));
        }
    }
    for edge in graph.edge_indices() {
        let Some((source, target)) = graph.edge_endpoints(edge) else {
            continue;
        };
        buffer.push_str(&format!(
            "  n{} -> n{} [label=\"{}\"];\n",
            source.index(),
            target.index(),
            graph[edge].kind().as_str()
        ));
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ConductorInput, InputRecords, LoadInput, NetworkInput};

    fn conductor(from: &str, to: &str) -> ConductorInput {
        ConductorInput {
            busses: Some(vec![from.into(), to.into()]),
            r1: Some(0.1),
            x1: Some(0.1),
            length: Some(1.0),
            ..ConductorInput::default()
        }
    }

    /// 1 -> 2 -> 3 -> {4, 5}, 5 -> 6
    fn tree() -> Network {
        let records = InputRecords {
            network: Some(NetworkInput::with_substation("1")),
            conductors: Some(vec![
                conductor("1", "2"),
                conductor("2", "3"),
                conductor("3", "4"),
                conductor("3", "5"),
                conductor("5", "6"),
            ]),
            loads: vec![LoadInput {
                bus: Some("6".into()),
                kws1: Some(vec![1.0]),
                ..LoadInput::default()
            }],
            ..InputRecords::default()
        };
        Network::from_records(records).unwrap()
    }

    #[test]
    fn closures_follow_direction() {
        let net = tree();
        let mut above = all_inneighbors(&net, "5").unwrap();
        above.sort();
        assert_eq!(above, vec!["1", "2", "3"]);
        let mut below = all_outneighbors(&net, "3").unwrap();
        below.sort();
        assert_eq!(below, vec!["4", "5", "6"]);
        assert!(all_inneighbors(&net, "1").unwrap().is_empty());
        assert!(matches!(
            all_outneighbors(&net, "nope"),
            Err(FeederError::NotFound(_))
        ));
    }

    #[test]
    fn depth_order_is_deepest_first() {
        let net = tree();
        let order = busses_from_deepest_to_source(&net, "1").unwrap();
        assert_eq!(order.len(), 6);
        assert_eq!(order[0], ("6".to_string(), 4));
        assert_eq!(order.last().unwrap(), &("1".to_string(), 0));
        assert!(order.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn leaves_and_branch_points() {
        let net = tree();
        let mut leaves = leaf_busses(&net);
        leaves.sort();
        assert_eq!(leaves, vec!["4", "6"]);
        assert!(busses_with_multiple_inneighbors(&net).is_empty());
    }

    #[test]
    fn paths_are_directed() {
        let net = tree();
        assert_eq!(
            paths_between(&net, "1", "6").unwrap(),
            vec![vec!["1", "2", "3", "5", "6"]]
        );
        assert!(paths_between(&net, "6", "1").unwrap().is_empty());
        assert_eq!(paths_between(&net, "4", "4").unwrap(), vec![vec!["4"]]);
    }

    #[test]
    fn upward_walk_finds_branching_bus() {
        let net = tree();
        assert_eq!(
            next_bus_above_with_outdegree_more_than_one(&net, "6").unwrap(),
            Some("3".to_string())
        );
        assert_eq!(
            next_bus_above_with_outdegree_more_than_one(&net, "2").unwrap(),
            None
        );
    }

    #[test]
    fn dot_export_lists_every_edge() {
        let net = tree();
        let dot = export_graph(&net, "DOT").unwrap();
        assert!(dot.starts_with("digraph feeder {"));
        assert_eq!(dot.matches("->").count(), 5);
        assert!(dot.contains("Load"));
        assert!(export_graph(&net, "svg").is_err());
    }
}
