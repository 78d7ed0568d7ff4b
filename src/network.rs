//! Build instances from a road network.
//!
//! Roads are links between nodes with a deadhead cost; required roads also
//! carry a demand and a service cost. Node-to-node shortest paths are
//! computed with Dijkstra and turned into the arc-to-arc matrix the engine
//! works on.
//!
//! Arc numbering is fixed: the depot is arc 0, facilities follow in the order
//! they were added, then the tasks. A required edge yields two consecutive
//! arcs, one per orientation.

use crate::error::{Result, SearchError};
use crate::problem::{ArcData, ArcId, Problem, ProblemData};
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, Copy)]
struct Road {
    tail: usize,
    head: usize,
    deadhead: f64,
    undirected: bool,
    /// Demand and service cost, for required roads
    service: Option<(f64, f64)>,
}

/// Incremental description of a road network instance.
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    name: String,
    node_count: usize,
    depot: usize,
    capacity: f64,
    max_trip_duration: Option<f64>,
    roads: Vec<Road>,
    facilities: Vec<(usize, f64)>,
}

impl NetworkBuilder {
    pub fn new(name: impl Into<String>, node_count: usize, depot: usize, capacity: f64) -> Self {
        NetworkBuilder {
            name: name.into(),
            node_count,
            depot,
            capacity,
            max_trip_duration: None,
            roads: Vec::new(),
            facilities: Vec::new(),
        }
    }

    /// Limit the cost of each route.
    pub fn with_duration_limit(mut self, limit: f64) -> Self {
        self.max_trip_duration = Some(limit);
        self
    }

    /// A one-way road that does not need service.
    pub fn arc(mut self, tail: usize, head: usize, deadhead: f64) -> Self {
        self.roads.push(Road {
            tail,
            head,
            deadhead,
            undirected: false,
            service: None,
        });
        self
    }

    /// A two-way road that does not need service.
    pub fn edge(mut self, u: usize, v: usize, deadhead: f64) -> Self {
        self.roads.push(Road {
            tail: u,
            head: v,
            deadhead,
            undirected: true,
            service: None,
        });
        self
    }

    /// A one-way road that must be serviced.
    pub fn required_arc(mut self, tail: usize, head: usize, deadhead: f64, demand: f64, service_cost: f64) -> Self {
        self.roads.push(Road {
            tail,
            head,
            deadhead,
            undirected: false,
            service: Some((demand, service_cost)),
        });
        self
    }

    /// A two-way road that must be serviced once, in either direction.
    pub fn required_edge(mut self, u: usize, v: usize, deadhead: f64, demand: f64, service_cost: f64) -> Self {
        self.roads.push(Road {
            tail: u,
            head: v,
            deadhead,
            undirected: true,
            service: Some((demand, service_cost)),
        });
        self
    }

    /// An intermediate facility at `node`, where unloading costs `unload_cost`.
    pub fn facility(mut self, node: usize, unload_cost: f64) -> Self {
        self.facilities.push((node, unload_cost));
        self
    }

    /// Compute shortest paths and assemble the instance.
    pub fn build(&self) -> Result<Problem> {
        self.check_nodes()?;

        let mut graph: DiGraph<(), f64> = DiGraph::with_capacity(self.node_count, self.roads.len() * 2);
        let nodes: Vec<NodeIndex> = (0..self.node_count).map(|_| graph.add_node(())).collect();
        for road in &self.roads {
            graph.add_edge(nodes[road.tail], nodes[road.head], road.deadhead);
            if road.undirected {
                graph.add_edge(nodes[road.head], nodes[road.tail], road.deadhead);
            }
        }

        // (tail node, head node) of every arc, in arc order
        let mut ends = vec![(self.depot, self.depot)];
        let mut arcs = vec![ArcData::depot()];

        for &(node, unload_cost) in &self.facilities {
            ends.push((node, node));
            arcs.push(ArcData::facility(unload_cost));
        }
        for road in &self.roads {
            let (demand, service_cost) = match road.service {
                Some(service) => service,
                None => continue,
            };
            if road.undirected {
                let forward = ArcId(arcs.len());
                let backward = ArcId(arcs.len() + 1);
                ends.push((road.tail, road.head));
                arcs.push(ArcData::edge_task(demand, service_cost, backward));
                ends.push((road.head, road.tail));
                arcs.push(ArcData::edge_task(demand, service_cost, forward));
            } else {
                ends.push((road.tail, road.head));
                arcs.push(ArcData::task(demand, service_cost));
            }
        }

        let shortest: Vec<Vec<f64>> = nodes
            .iter()
            .map(|&from| {
                let reached = dijkstra(&graph, from, None, |e| *e.weight());
                nodes
                    .iter()
                    .map(|to| reached.get(to).copied().unwrap_or(f64::INFINITY))
                    .collect()
            })
            .collect();

        let mut distance = vec![vec![0.0; arcs.len()]; arcs.len()];
        for (a, &(_, head)) in ends.iter().enumerate() {
            for (b, &(tail, _)) in ends.iter().enumerate() {
                let d = shortest[head][tail];
                if !d.is_finite() {
                    return Err(SearchError::invalid_instance(format!(
                        "node {tail} cannot be reached from node {head}"
                    )));
                }
                distance[a][b] = d;
            }
        }

        log::debug!(
            "Built network {}: {} nodes, {} arcs, {} facilities",
            self.name,
            self.node_count,
            arcs.len(),
            self.facilities.len()
        );

        Problem::new(ProblemData {
            name: self.name.clone(),
            arcs,
            depot: ArcId(0),
            capacity: self.capacity,
            max_trip_duration: self.max_trip_duration,
            distance,
        })
    }

    fn check_nodes(&self) -> Result<()> {
        let nodes = self
            .roads
            .iter()
            .flat_map(|r| [r.tail, r.head])
            .chain(self.facilities.iter().map(|&(node, _)| node))
            .chain(std::iter::once(self.depot));

        for node in nodes {
            if node >= self.node_count {
                return Err(SearchError::invalid_instance(format!(
                    "node {node} is out of range (0..{})",
                    self.node_count
                )));
            }
        }
        for road in &self.roads {
            if !(road.deadhead >= 0.0) {
                return Err(SearchError::invalid_instance(format!(
                    "road {} -> {} has a negative cost",
                    road.tail, road.head
                )));
            }
        }

        Ok(())
    }
}
