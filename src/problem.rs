//! Problem definition and data structures for the MCARP / MCARPTIF.
//!
//! Every service task, the depot and every intermediate facility is an arc.
//! The distance matrix is arc-to-arc: `distance(a, b)` is the deadhead cost of
//! travelling from the end of `a` to the start of `b`. Shortest paths are
//! computed upstream (see [`crate::network`] for one way to do it).

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Identifier of an arc (task, depot or intermediate facility).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArcId(pub usize);

impl ArcId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural role of an arc in the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcKind {
    Depot,
    Facility,
    Task,
}

/// Attributes of a single arc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcData {
    pub kind: ArcKind,
    pub demand: f64,
    pub service_cost: f64,
    /// Opposite orientation of the same edge, for undirected tasks.
    pub inverse: Option<ArcId>,
}

impl ArcData {
    /// A required directed task.
    pub fn task(demand: f64, service_cost: f64) -> Self {
        ArcData {
            kind: ArcKind::Task,
            demand,
            service_cost,
            inverse: None,
        }
    }

    /// One orientation of a required edge.
    pub fn edge_task(demand: f64, service_cost: f64, inverse: ArcId) -> Self {
        ArcData {
            inverse: Some(inverse),
            ..ArcData::task(demand, service_cost)
        }
    }

    pub fn depot() -> Self {
        ArcData {
            kind: ArcKind::Depot,
            demand: 0.0,
            service_cost: 0.0,
            inverse: None,
        }
    }

    /// An intermediate facility; the service cost is the cost of unloading.
    pub fn facility(service_cost: f64) -> Self {
        ArcData {
            kind: ArcKind::Facility,
            demand: 0.0,
            service_cost,
            inverse: None,
        }
    }
}

/// Serializable description of an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemData {
    pub name: String,
    pub arcs: Vec<ArcData>,
    pub depot: ArcId,
    pub capacity: f64,
    pub max_trip_duration: Option<f64>,
    pub distance: Vec<Vec<f64>>,
}

/// A validated MCARP / MCARPTIF instance with precomputed lookup tables.
#[derive(Debug, Clone)]
pub struct Problem {
    pub name: String,
    pub depot: ArcId,
    pub capacity: f64,
    pub max_trip_duration: Option<f64>,
    arcs: Vec<ArcData>,
    distance: Vec<Vec<f64>>,
    facilities: Vec<ArcId>,
    tasks: Vec<ArcId>,
    /// Cheapest `from -> IF -> to` detour, including the IF service cost
    if_cost: Vec<Vec<f64>>,
    best_if: Vec<Vec<Option<ArcId>>>,
    /// Tasks ordered by distance from each task
    neighbors: Vec<Vec<ArcId>>,
}

impl Problem {
    /// Validate the instance data and build the lookup tables.
    pub fn new(data: ProblemData) -> Result<Self> {
        let n = data.arcs.len();

        if data.depot.index() >= n || data.arcs[data.depot.index()].kind != ArcKind::Depot {
            return Err(SearchError::invalid_instance(format!(
                "depot {} is not a depot arc",
                data.depot
            )));
        }
        if data.arcs.iter().filter(|a| a.kind == ArcKind::Depot).count() != 1 {
            return Err(SearchError::invalid_instance(
                "exactly one depot arc is required",
            ));
        }
        if !(data.capacity > 0.0) {
            return Err(SearchError::invalid_instance(format!(
                "capacity must be positive, got {}",
                data.capacity
            )));
        }
        if data.distance.len() != n || data.distance.iter().any(|row| row.len() != n) {
            return Err(SearchError::invalid_instance(format!(
                "distance matrix must be {n}x{n}"
            )));
        }
        if data
            .distance
            .iter()
            .flatten()
            .any(|d| !d.is_finite() || *d < 0.0)
        {
            return Err(SearchError::invalid_instance(
                "distances must be finite and non-negative",
            ));
        }

        for (i, arc) in data.arcs.iter().enumerate() {
            if let Some(inv) = arc.inverse {
                let paired = data
                    .arcs
                    .get(inv.index())
                    .map_or(false, |other| other.inverse == Some(ArcId(i)));
                if arc.kind != ArcKind::Task || inv.index() == i || !paired {
                    return Err(SearchError::invalid_instance(format!(
                        "arc {i} has an invalid inverse {inv}"
                    )));
                }
                if data.arcs[inv.index()].kind != ArcKind::Task {
                    return Err(SearchError::invalid_instance(format!(
                        "inverse {inv} of arc {i} is not a task"
                    )));
                }
            }
        }

        let facilities: Vec<ArcId> = (0..n)
            .filter(|&i| data.arcs[i].kind == ArcKind::Facility)
            .map(ArcId)
            .collect();
        let tasks: Vec<ArcId> = (0..n)
            .filter(|&i| data.arcs[i].kind == ArcKind::Task)
            .map(ArcId)
            .collect();

        let (if_cost, best_if) = Self::compute_if_tables(&data, &facilities);
        let neighbors = Self::compute_neighbors(&data, &tasks);

        Ok(Problem {
            name: data.name,
            depot: data.depot,
            capacity: data.capacity,
            max_trip_duration: data.max_trip_duration,
            arcs: data.arcs,
            distance: data.distance,
            facilities,
            tasks,
            if_cost,
            best_if,
            neighbors,
        })
    }

    /// Load an instance from a JSON file holding [`ProblemData`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let data: ProblemData = serde_json::from_str(&raw)?;
        Problem::new(data)
    }

    /// Serialize the instance back to its JSON form.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    pub fn to_data(&self) -> ProblemData {
        ProblemData {
            name: self.name.clone(),
            arcs: self.arcs.clone(),
            depot: self.depot,
            capacity: self.capacity,
            max_trip_duration: self.max_trip_duration,
            distance: self.distance.clone(),
        }
    }

    fn compute_if_tables(
        data: &ProblemData,
        facilities: &[ArcId],
    ) -> (Vec<Vec<f64>>, Vec<Vec<Option<ArcId>>>) {
        let n = data.arcs.len();
        let mut cost = vec![vec![f64::INFINITY; n]; n];
        let mut best = vec![vec![None; n]; n];

        if facilities.is_empty() {
            return (cost, best);
        }

        for a in 0..n {
            for b in 0..n {
                for &f in facilities {
                    let via = data.distance[a][f.index()]
                        + data.arcs[f.index()].service_cost
                        + data.distance[f.index()][b];
                    if via < cost[a][b] {
                        cost[a][b] = via;
                        best[a][b] = Some(f);
                    }
                }
            }
        }

        (cost, best)
    }

    fn compute_neighbors(data: &ProblemData, tasks: &[ArcId]) -> Vec<Vec<ArcId>> {
        let mut neighbors = vec![Vec::new(); data.arcs.len()];

        for &a in tasks {
            let inverse = data.arcs[a.index()].inverse;
            let mut close: Vec<ArcId> = tasks
                .iter()
                .copied()
                .filter(|&b| b != a && Some(b) != inverse)
                .collect();
            close.sort_by(|x, y| {
                data.distance[a.index()][x.index()]
                    .total_cmp(&data.distance[a.index()][y.index()])
                    .then(x.cmp(y))
            });
            neighbors[a.index()] = close;
        }

        neighbors
    }

    /// Deadhead cost from the end of `from` to the start of `to`.
    #[inline]
    pub fn distance(&self, from: ArcId, to: ArcId) -> f64 {
        self.distance[from.index()][to.index()]
    }

    #[inline]
    pub fn demand(&self, arc: ArcId) -> f64 {
        self.arcs[arc.index()].demand
    }

    #[inline]
    pub fn service_cost(&self, arc: ArcId) -> f64 {
        self.arcs[arc.index()].service_cost
    }

    #[inline]
    pub fn inverse(&self, arc: ArcId) -> Option<ArcId> {
        self.arcs[arc.index()].inverse
    }

    #[inline]
    pub fn kind(&self, arc: ArcId) -> ArcKind {
        self.arcs[arc.index()].kind
    }

    #[inline]
    pub fn is_task(&self, arc: ArcId) -> bool {
        self.kind(arc) == ArcKind::Task
    }

    #[inline]
    pub fn is_facility(&self, arc: ArcId) -> bool {
        self.kind(arc) == ArcKind::Facility
    }

    pub fn arc(&self, arc: ArcId) -> &ArcData {
        &self.arcs[arc.index()]
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn facilities(&self) -> &[ArcId] {
        &self.facilities
    }

    /// All task arcs, both orientations of every edge included.
    pub fn tasks(&self) -> &[ArcId] {
        &self.tasks
    }

    /// Canonical representative of an edge: the smaller of the two orientations.
    pub fn edge_key(&self, arc: ArcId) -> ArcId {
        match self.inverse(arc) {
            Some(inv) if inv < arc => inv,
            _ => arc,
        }
    }

    /// One arc per service: directed tasks and the canonical orientation of
    /// every edge.
    pub fn required_tasks(&self) -> impl Iterator<Item = ArcId> + '_ {
        self.tasks.iter().copied().filter(|&a| self.edge_key(a) == a)
    }

    /// Number of services to perform: every edge counts once.
    pub fn required_task_count(&self) -> usize {
        self.required_tasks().count()
    }

    /// Cost of travelling from `from` to `to` through the best IF.
    #[inline]
    pub fn if_cost(&self, from: ArcId, to: ArcId) -> f64 {
        self.if_cost[from.index()][to.index()]
    }

    /// The IF realising [`Problem::if_cost`], if any facility exists.
    #[inline]
    pub fn best_if_between(&self, from: ArcId, to: ArcId) -> Option<ArcId> {
        self.best_if[from.index()][to.index()]
    }

    /// Tasks sorted by increasing distance from `arc` (excluding its inverse).
    pub fn neighbors(&self, arc: ArcId) -> &[ArcId] {
        &self.neighbors[arc.index()]
    }

    /// Number of neighbours kept for a given fraction of the full list.
    pub fn neighbor_limit(&self, arc: ArcId, fraction: f64) -> usize {
        let len = self.neighbors[arc.index()].len();
        if fraction >= 1.0 {
            return len;
        }
        ((len as f64 * fraction.max(0.0)).ceil() as usize).clamp(1.min(len), len)
    }
}
