//! Solution representation for the MCARP / MCARPTIF.
//!
//! A route leaves the depot, performs one or more trips and returns to the
//! depot. Under MCARPTIF every trip ends with a visit to an intermediate
//! facility (IF); the last IF is followed by the depot return.

use crate::boundary::{BoundaryModel, Link};
use crate::problem::{ArcId, Problem};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used for all load and cost comparisons.
pub const EPSILON: f64 = 1e-6;

/// A maximal sequence of services between two boundary visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// The scheduled task orientations, in service order
    pub arcs: Vec<ArcId>,
    /// Total demand collected on the trip
    pub load: f64,
    /// The IF visited after the trip (MCARPTIF only)
    pub facility: Option<ArcId>,
}

impl Trip {
    pub fn new(arcs: Vec<ArcId>) -> Self {
        Trip {
            arcs,
            load: 0.0,
            facility: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }
}

/// Prefix sums along a route.
///
/// `loads[k][i]` is the load of trip `k` up to and including arc `i`;
/// `costs[k][i]` is the route cost from the depot up to and including the
/// service of arc `i` of trip `k`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cumulative {
    pub loads: Vec<Vec<f64>>,
    pub costs: Vec<Vec<f64>>,
}

/// What remains of a route after a cut: the rest of the cut trip, followed by
/// the untouched later trips.
#[derive(Debug, Clone, Default)]
pub struct RouteTail {
    pub partial: Vec<ArcId>,
    pub trips: Vec<Trip>,
}

/// A vehicle route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub trips: Vec<Trip>,
    /// Total travel and service cost, including IF visits
    pub cost: f64,
    /// Lazily computed prefix sums; `None` while stale
    #[serde(skip)]
    cumulative: Option<Cumulative>,
}

impl Route {
    /// Create a route from trip sequences and evaluate it.
    pub fn from_trips<B: BoundaryModel>(
        trips: Vec<Vec<ArcId>>,
        problem: &Problem,
        model: &B,
    ) -> Self {
        let mut route = Route {
            trips: trips.into_iter().map(Trip::new).collect(),
            cost: 0.0,
            cumulative: None,
        };
        route.recompute(problem, model);
        route
    }

    /// Recompute loads, IF choices and cost from scratch. Empty trips are dropped.
    pub fn recompute<B: BoundaryModel>(&mut self, problem: &Problem, model: &B) {
        self.trips.retain(|trip| !trip.is_empty());

        for trip in &mut self.trips {
            trip.load = trip.arcs.iter().map(|&a| problem.demand(a)).sum();
        }

        self.refresh_facilities(problem, model);
        let (cost, cumulative) = self.walk(problem, model);
        self.cost = cost;
        self.cumulative = Some(cumulative);
    }

    /// Re-select the IF at every trip boundary.
    pub fn refresh_facilities<B: BoundaryModel>(&mut self, problem: &Problem, model: &B) {
        let count = self.trips.len();
        for k in 0..count {
            let last = match self.trips[k].arcs.last() {
                Some(&arc) => arc,
                None => continue,
            };
            let next = if k + 1 < count {
                self.trips[k + 1].arcs.first().copied().unwrap_or(problem.depot)
            } else {
                problem.depot
            };
            self.trips[k].facility = model.boundary_facility(problem, last, next);
        }
    }

    /// Walk the route once, returning its cost and prefix sums.
    pub fn walk<B: BoundaryModel>(&self, problem: &Problem, model: &B) -> (f64, Cumulative) {
        let mut cumulative = Cumulative {
            loads: Vec::with_capacity(self.trips.len()),
            costs: Vec::with_capacity(self.trips.len()),
        };
        let mut cost = 0.0;
        let mut pred = Link::direct(problem.depot);

        for trip in &self.trips {
            let mut loads = Vec::with_capacity(trip.len());
            let mut costs = Vec::with_capacity(trip.len());
            let mut load = 0.0;

            for &arc in &trip.arcs {
                cost += model.cost_into(problem, pred, arc) + problem.service_cost(arc);
                load += problem.demand(arc);
                loads.push(load);
                costs.push(cost);
                pred = Link::direct(arc);
            }

            cumulative.loads.push(loads);
            cumulative.costs.push(costs);
            pred = Link::boundary(pred.arc);
        }

        if pred.arc != problem.depot {
            cost += model.boundary_cost(problem, pred.arc, problem.depot);
        }

        (cost, cumulative)
    }

    /// Prefix sums, recomputed first if the route changed since the last read.
    pub fn cumulative<B: BoundaryModel>(&mut self, problem: &Problem, model: &B) -> &Cumulative {
        if self.cumulative.is_none() {
            let (_, cumulative) = self.walk(problem, model);
            self.cumulative = Some(cumulative);
        }
        self.cumulative.get_or_insert_with(Cumulative::default)
    }

    /// Mark the prefix sums stale after a structural change.
    #[inline]
    pub fn invalidate(&mut self) {
        self.cumulative = None;
    }

    pub fn is_dirty(&self) -> bool {
        self.cumulative.is_none()
    }

    /// Cost attributed to each trip: its links, services and outgoing boundary.
    pub fn trip_costs<B: BoundaryModel>(&mut self, problem: &Problem, model: &B) -> Vec<f64> {
        let total = self.cost;
        let count = self.trips.len();
        let cumulative = self.cumulative(problem, model).clone();
        let mut costs = Vec::with_capacity(count);
        let mut previous_end = 0.0;

        for k in 0..count {
            let end = if k + 1 < count {
                cumulative.costs[k + 1].first().map_or(previous_end, |&c| {
                    c - problem.service_cost(self.trips[k + 1].arcs[0])
                })
            } else {
                total
            };
            costs.push(end - previous_end);
            previous_end = end;
        }

        costs
    }

    pub fn arc_count(&self) -> usize {
        self.trips.iter().map(Trip::len).sum()
    }

    pub fn load(&self) -> f64 {
        self.trips.iter().map(|t| t.load).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.iter().all(Trip::is_empty)
    }

    pub fn arcs(&self) -> impl Iterator<Item = ArcId> + '_ {
        self.trips.iter().flat_map(|t| t.arcs.iter().copied())
    }

    pub fn first_arc(&self) -> Option<ArcId> {
        self.trips.first().and_then(|t| t.arcs.first().copied())
    }

    pub fn last_arc(&self) -> Option<ArcId> {
        self.trips.last().and_then(|t| t.arcs.last().copied())
    }

    /// The arc before position `(trip, offset)` and how it connects.
    pub fn predecessor(&self, trip: usize, offset: usize, problem: &Problem) -> Link {
        if offset > 0 {
            Link::direct(self.trips[trip].arcs[offset - 1])
        } else if trip == 0 {
            Link::direct(problem.depot)
        } else {
            let previous = &self.trips[trip - 1].arcs;
            Link::boundary(previous.last().copied().unwrap_or(problem.depot))
        }
    }

    /// The arc after position `(trip, offset)` and how it connects.
    pub fn successor(&self, trip: usize, offset: usize, problem: &Problem) -> Link {
        let arcs = &self.trips[trip].arcs;
        if offset + 1 < arcs.len() {
            Link::direct(arcs[offset + 1])
        } else if trip + 1 < self.trips.len() {
            Link::boundary(
                self.trips[trip + 1]
                    .arcs
                    .first()
                    .copied()
                    .unwrap_or(problem.depot),
            )
        } else {
            Link::boundary(problem.depot)
        }
    }

    /// Cut the route after arc `offset` of trip `trip`, keeping the head.
    pub fn split_off_after(&mut self, trip: usize, offset: usize) -> RouteTail {
        let partial = self.trips[trip].arcs.split_off(offset + 1);
        let trips = self.trips.split_off(trip + 1);
        self.invalidate();
        RouteTail { partial, trips }
    }

    /// Cut the route before its first arc; the whole route becomes the tail.
    pub fn split_off_all(&mut self) -> RouteTail {
        let mut trips = std::mem::take(&mut self.trips);
        let partial = if trips.is_empty() {
            Vec::new()
        } else {
            trips.remove(0).arcs
        };
        self.invalidate();
        RouteTail { partial, trips }
    }

    /// Join a tail after the current last arc: the partial trip continues the
    /// last trip, the remaining trips follow after a boundary.
    pub fn append_tail(&mut self, tail: RouteTail) {
        match self.trips.last_mut() {
            Some(last) => last.arcs.extend(tail.partial),
            None => self.trips.push(Trip::new(tail.partial)),
        }
        self.trips.extend(tail.trips);
        self.invalidate();
    }
}

/// A complete MCARP / MCARPTIF solution.
#[derive(Clone, Serialize, Deserialize)]
pub struct Solution {
    pub routes: Vec<Route>,
    /// Sum of the route costs
    pub cost: f64,
}

impl Default for Solution {
    fn default() -> Self {
        Solution::new()
    }
}

impl Solution {
    /// Create a new, empty solution.
    pub fn new() -> Self {
        Solution {
            routes: Vec::new(),
            cost: 0.0,
        }
    }

    /// Build a solution from nested route / trip / arc lists.
    pub fn from_routes<B: BoundaryModel>(
        routes: Vec<Vec<Vec<ArcId>>>,
        problem: &Problem,
        model: &B,
    ) -> Self {
        let mut solution = Solution {
            routes: routes
                .into_iter()
                .map(|trips| Route::from_trips(trips, problem, model))
                .filter(|route| !route.is_empty())
                .collect(),
            cost: 0.0,
        };
        solution.cost = solution.routes.iter().map(|r| r.cost).sum();
        solution
    }

    /// Recompute every route from scratch and the total cost.
    pub fn evaluate<B: BoundaryModel>(&mut self, problem: &Problem, model: &B) {
        for route in &mut self.routes {
            route.recompute(problem, model);
        }
        self.routes.retain(|route| !route.is_empty());
        self.cost = self.routes.iter().map(|r| r.cost).sum();
    }

    /// Number of vehicles used.
    pub fn vehicles(&self) -> usize {
        self.routes.len()
    }

    /// Number of scheduled services.
    pub fn task_count(&self) -> usize {
        self.routes.iter().map(Route::arc_count).sum()
    }

    /// Lexicographic comparison: fewer vehicles first, then lower cost.
    /// Ties are not an improvement.
    pub fn is_better_than(&self, other: &Solution) -> bool {
        match self.vehicles().cmp(&other.vehicles()) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.cost < other.cost - EPSILON,
        }
    }

    /// Route / trip / arc nesting, as accepted by [`Solution::from_routes`].
    pub fn to_nested(&self) -> Vec<Vec<Vec<ArcId>>> {
        self.routes
            .iter()
            .map(|r| r.trips.iter().map(|t| t.arcs.clone()).collect())
            .collect()
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution:")?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Vehicles: {}", self.routes.len())?;

        for (i, route) in self.routes.iter().enumerate() {
            writeln!(f, "  Route {}: (Cost: {:.2})", i, route.cost)?;
            for (k, trip) in route.trips.iter().enumerate() {
                writeln!(
                    f,
                    "    Trip {}: {:?} (Load: {:.2}, IF: {:?})",
                    k, trip.arcs, trip.load, trip.facility
                )?;
            }
        }

        Ok(())
    }
}
