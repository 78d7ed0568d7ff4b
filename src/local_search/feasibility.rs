//! Load and duration checks for candidate moves.
//!
//! Charge-based moves (relocates, exchanges, flips and their combos) carry
//! their per-trip load and per-route cost changes; the checker resolves the
//! anchors against the current positions and adds them up. Cross moves move
//! whole tails, so their effect is derived from the route prefix sums.

use crate::boundary::{BoundaryModel, Link};
use crate::encoding::{PositionMap, Slot};
use crate::moves::{Charge, Move, MoveKind};
use crate::problem::{ArcId, Problem};
use crate::solution::{Solution, EPSILON};

/// Outcome of a feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Feasible,
    InfeasibleLoad,
    InfeasibleDuration,
    /// Both cuts of a cross lie in one trip; left for the double-cross search
    Deferred,
    /// The move does not describe a valid change of the current solution
    NotApplicable,
}

/// Moves set aside during a pass, consumed by the repair search.
#[derive(Debug, Clone, Default)]
pub struct MoveBook {
    pub infeasible_load: Vec<Move>,
    pub infeasible_duration: Vec<Move>,
    /// Feasible, but not below the limit that was in force when checked
    pub exceeds_threshold: Vec<Move>,
    pub deferred_cross: Vec<Move>,
}

impl MoveBook {
    pub fn clear(&mut self) {
        self.infeasible_load.clear();
        self.infeasible_duration.clear();
        self.exceeds_threshold.clear();
        self.deferred_cross.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.infeasible_load.is_empty()
            && self.infeasible_duration.is_empty()
            && self.exceeds_threshold.is_empty()
            && self.deferred_cross.is_empty()
    }
}

/// New load of the trips at both cuts and new cost of both routes after a cross.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossOutcome {
    pub loads: [f64; 2],
    pub costs: [f64; 2],
}

pub struct FeasibilityChecker<'a, B: BoundaryModel> {
    problem: &'a Problem,
    model: &'a B,
}

impl<'a, B: BoundaryModel> FeasibilityChecker<'a, B> {
    pub fn new(problem: &'a Problem, model: &'a B) -> Self {
        FeasibilityChecker { problem, model }
    }

    /// Check a move and file it in `book` unless it is feasible.
    pub fn check(
        &self,
        mv: &Move,
        solution: &mut Solution,
        positions: &PositionMap,
        book: &mut MoveBook,
    ) -> Verdict {
        let verdict = self.assess(mv, solution, positions);
        match verdict {
            Verdict::InfeasibleLoad => book.infeasible_load.push(mv.clone()),
            Verdict::InfeasibleDuration => book.infeasible_duration.push(mv.clone()),
            Verdict::Deferred => book.deferred_cross.push(mv.clone()),
            Verdict::Feasible | Verdict::NotApplicable => {}
        }
        verdict
    }

    /// Like [`check`](Self::check), and also file feasible moves whose delta
    /// is not below `limit`.
    pub fn check_against(
        &self,
        mv: &Move,
        limit: f64,
        solution: &mut Solution,
        positions: &PositionMap,
        book: &mut MoveBook,
    ) -> Verdict {
        let verdict = self.check(mv, solution, positions, book);
        if verdict == Verdict::Feasible && !(mv.delta < limit) {
            book.exceeds_threshold.push(mv.clone());
        }
        verdict
    }

    /// Check a move without any bookkeeping.
    pub fn assess(&self, mv: &Move, solution: &mut Solution, positions: &PositionMap) -> Verdict {
        match mv.kind {
            MoveKind::Cross { a, b } => self.assess_cross(a, b, solution, positions),
            MoveKind::CrossAtRouteBoundary { route_first, b } => {
                self.assess_cross_at_boundary(route_first, b, solution, positions)
            }
            MoveKind::DoubleCross { cuts } => {
                self.assess_double_cross(&cuts, mv.delta, solution, positions)
            }
            _ => self.assess_charges(mv, solution, positions),
        }
    }

    /// Trips, as `(route, trip)`, that a charge-based move would overload.
    pub fn overloaded_trips(
        &self,
        mv: &Move,
        solution: &Solution,
        positions: &PositionMap,
    ) -> Vec<(usize, usize)> {
        let loads = match Self::group(&mv.trip_loads, positions, |s| (s.route, s.trip)) {
            Some(loads) => loads,
            None => return Vec::new(),
        };
        loads
            .into_iter()
            .filter(|&((r, k), amount)| {
                amount > EPSILON
                    && solution.routes[r].trips[k].load + amount > self.problem.capacity + EPSILON
            })
            .map(|(key, _)| key)
            .collect()
    }

    // Sum charges per resolved key; `None` if an anchor is not scheduled.
    fn group<K: PartialEq + Copy>(
        charges: &[Charge],
        positions: &PositionMap,
        key: impl Fn(Slot) -> K,
    ) -> Option<Vec<(K, f64)>> {
        let mut grouped: Vec<(K, f64)> = Vec::with_capacity(charges.len());
        for charge in charges {
            let k = key(positions.get(charge.anchor)?);
            match grouped.iter_mut().find(|(existing, _)| *existing == k) {
                Some((_, amount)) => *amount += charge.amount,
                None => grouped.push((k, charge.amount)),
            }
        }
        Some(grouped)
    }

    fn assess_charges(&self, mv: &Move, solution: &Solution, positions: &PositionMap) -> Verdict {
        let loads = match Self::group(&mv.trip_loads, positions, |s| (s.route, s.trip)) {
            Some(loads) => loads,
            None => return Verdict::NotApplicable,
        };
        for ((r, k), amount) in loads {
            let trip = match solution.routes.get(r).and_then(|route| route.trips.get(k)) {
                Some(trip) => trip,
                None => return Verdict::NotApplicable,
            };
            if amount > EPSILON && trip.load + amount > self.problem.capacity + EPSILON {
                return Verdict::InfeasibleLoad;
            }
        }

        if let Some(limit) = self.model.duration_limit(self.problem) {
            let costs = match Self::group(&mv.route_costs, positions, |s| s.route) {
                Some(costs) => costs,
                None => return Verdict::NotApplicable,
            };
            for (r, amount) in costs {
                if amount > EPSILON && solution.routes[r].cost + amount > limit + EPSILON {
                    return Verdict::InfeasibleDuration;
                }
            }
        }

        Verdict::Feasible
    }

    fn within_limits(&self, loads: &[f64], costs: &[f64]) -> Verdict {
        if loads.iter().any(|&l| l > self.problem.capacity + EPSILON) {
            return Verdict::InfeasibleLoad;
        }
        if let Some(limit) = self.model.duration_limit(self.problem) {
            if costs.iter().any(|&c| c > limit + EPSILON) {
                return Verdict::InfeasibleDuration;
            }
        }
        Verdict::Feasible
    }

    fn assess_cross(
        &self,
        a: ArcId,
        b: ArcId,
        solution: &mut Solution,
        positions: &PositionMap,
    ) -> Verdict {
        let (sa, sb) = match (positions.locate(solution, a), positions.locate(solution, b)) {
            (Some(sa), Some(sb)) => (sa, sb),
            _ => return Verdict::NotApplicable,
        };
        if sa.route == sb.route {
            return if sa.trip == sb.trip {
                Verdict::Deferred
            } else {
                Verdict::NotApplicable
            };
        }

        let outcome = self.cross_outcome(solution, sa, sb);
        self.within_limits(&outcome.loads, &outcome.costs)
    }

    /// Loads and costs after crossing the tails behind `sa` and `sb`.
    pub fn cross_outcome(&self, solution: &mut Solution, sa: Slot, sb: Slot) -> CrossOutcome {
        let (pre_load_a, pre_cost_a) = self.prefix(solution, sa);
        let (pre_load_b, pre_cost_b) = self.prefix(solution, sb);

        let route_a = &solution.routes[sa.route];
        let route_b = &solution.routes[sb.route];
        let a = route_a.trips[sa.trip].arcs[sa.offset];
        let b = route_b.trips[sb.trip].arcs[sb.offset];
        let succ_a = route_a.successor(sa.trip, sa.offset, self.problem);
        let succ_b = route_b.successor(sb.trip, sb.offset, self.problem);

        // Load still to be collected on the cut trip after the cut
        let rest_a = Self::partial_load(route_a.trips[sa.trip].load, pre_load_a, succ_a);
        let rest_b = Self::partial_load(route_b.trips[sb.trip].load, pre_load_b, succ_b);

        let tail_a = route_a.cost - pre_cost_a - self.model.link_cost(self.problem, a, succ_a);
        let tail_b = route_b.cost - pre_cost_b - self.model.link_cost(self.problem, b, succ_b);

        CrossOutcome {
            loads: [pre_load_a + rest_b, pre_load_b + rest_a],
            costs: [
                pre_cost_a + self.model.link_cost(self.problem, a, succ_b) + tail_b,
                pre_cost_b + self.model.link_cost(self.problem, b, succ_a) + tail_a,
            ],
        }
    }

    fn assess_cross_at_boundary(
        &self,
        route_first: ArcId,
        b: ArcId,
        solution: &mut Solution,
        positions: &PositionMap,
    ) -> Verdict {
        let (sa, sb) = match (
            positions.locate(solution, route_first),
            positions.locate(solution, b),
        ) {
            (Some(sa), Some(sb)) => (sa, sb),
            _ => return Verdict::NotApplicable,
        };
        if sa.trip != 0 || sa.offset != 0 || sa.route == sb.route {
            return Verdict::NotApplicable;
        }

        let (pre_load_b, pre_cost_b) = self.prefix(solution, sb);
        let route_a = &solution.routes[sa.route];
        let route_b = &solution.routes[sb.route];
        let succ_b = route_b.successor(sb.trip, sb.offset, self.problem);
        let depot = Link::direct(self.problem.depot);

        let rest_b = Self::partial_load(route_b.trips[sb.trip].load, pre_load_b, succ_b);
        let tail_b = route_b.cost - pre_cost_b - self.model.link_cost(self.problem, b, succ_b);

        let loads = [rest_b, pre_load_b + route_a.trips[0].load];
        let costs = [
            self.model.bridge_cost(self.problem, depot, succ_b) + tail_b,
            pre_cost_b + self.problem.distance(b, route_first)
                + (route_a.cost - self.problem.distance(self.problem.depot, route_first)),
        ];
        self.within_limits(&loads, &costs)
    }

    fn assess_double_cross(
        &self,
        cuts: &[ArcId; 4],
        delta: f64,
        solution: &Solution,
        positions: &PositionMap,
    ) -> Verdict {
        let mut slots = Vec::with_capacity(4);
        for &cut in cuts {
            match positions.locate(solution, cut) {
                Some(slot) => slots.push(slot),
                None => return Verdict::NotApplicable,
            }
        }
        let first = slots[0];
        let ordered = slots.windows(2).all(|w| w[0].offset < w[1].offset);
        let same_trip = slots
            .iter()
            .all(|s| s.route == first.route && s.trip == first.trip);
        if !ordered || !same_trip {
            return Verdict::NotApplicable;
        }

        let cost = solution.routes[first.route].cost + delta;
        self.within_limits(&[], &[cost])
    }

    fn prefix(&self, solution: &mut Solution, slot: Slot) -> (f64, f64) {
        let cumulative = solution.routes[slot.route].cumulative(self.problem, self.model);
        (
            cumulative.loads[slot.trip][slot.offset],
            cumulative.costs[slot.trip][slot.offset],
        )
    }

    // A boundary after the cut means the tail starts with a fresh trip.
    fn partial_load(trip_load: f64, prefix_load: f64, succ: Link) -> f64 {
        if succ.is_boundary() {
            0.0
        } else {
            trip_load - prefix_load
        }
    }
}
