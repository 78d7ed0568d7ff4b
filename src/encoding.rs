//! Giant-route encoding of a solution.
//!
//! The whole solution is flattened into one sequence of visits with explicit
//! depot and IF markers. Alongside the sequence we keep a dense position map
//! (arc -> route, trip, offset) and the structural role of every scheduled
//! arc. Moves use the roles to pick the right boundary arithmetic, and the
//! executor patches the encoding route by route after each mutation.

use crate::boundary::BoundaryModel;
use crate::problem::{ArcId, Problem};
use crate::solution::{Route, Solution};
use serde::{Deserialize, Serialize};

/// Dense membership set over arc ids.
#[derive(Debug, Clone, Default)]
pub struct ArcSet {
    members: Vec<bool>,
    len: usize,
}

impl ArcSet {
    pub fn new(arc_count: usize) -> Self {
        ArcSet {
            members: vec![false; arc_count],
            len: 0,
        }
    }

    /// A set holding every arc id below `arc_count`.
    pub fn full(arc_count: usize) -> Self {
        ArcSet {
            members: vec![true; arc_count],
            len: arc_count,
        }
    }

    pub fn from_arcs(arc_count: usize, arcs: impl IntoIterator<Item = ArcId>) -> Self {
        let mut set = ArcSet::new(arc_count);
        for arc in arcs {
            set.insert(arc);
        }
        set
    }

    /// Insert an arc; returns `true` if it was not present.
    pub fn insert(&mut self, arc: ArcId) -> bool {
        let i = arc.index();
        if i >= self.members.len() {
            self.members.resize(i + 1, false);
        }
        if self.members[i] {
            return false;
        }
        self.members[i] = true;
        self.len += 1;
        true
    }

    pub fn remove(&mut self, arc: ArcId) -> bool {
        match self.members.get_mut(arc.index()) {
            Some(slot) if *slot => {
                *slot = false;
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn contains(&self, arc: ArcId) -> bool {
        self.members.get(arc.index()).copied().unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.members.iter_mut().for_each(|m| *m = false);
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ArcId> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(i, _)| ArcId(i))
    }
}

/// Location of a scheduled arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub route: usize,
    pub trip: usize,
    pub offset: usize,
}

/// Arc -> slot lookup. An arc and its inverse share the slot of whichever
/// orientation is scheduled.
#[derive(Debug, Clone, Default)]
pub struct PositionMap {
    slots: Vec<Option<Slot>>,
}

impl PositionMap {
    pub fn new(arc_count: usize) -> Self {
        PositionMap {
            slots: vec![None; arc_count],
        }
    }

    /// Build the map for a whole solution.
    pub fn build(solution: &Solution, problem: &Problem) -> Self {
        let mut map = PositionMap::new(problem.arc_count());
        for r in 0..solution.routes.len() {
            map.patch_route(solution, problem, r);
        }
        map
    }

    #[inline]
    pub fn get(&self, arc: ArcId) -> Option<Slot> {
        self.slots.get(arc.index()).copied().flatten()
    }

    /// Slot of `arc` only if that exact orientation is scheduled there.
    pub fn locate(&self, solution: &Solution, arc: ArcId) -> Option<Slot> {
        let slot = self.get(arc)?;
        (scheduled_at(solution, slot) == Some(arc)).then_some(slot)
    }

    fn set(&mut self, problem: &Problem, arc: ArcId, slot: Slot) {
        self.slots[arc.index()] = Some(slot);
        if let Some(inv) = problem.inverse(arc) {
            self.slots[inv.index()] = Some(slot);
        }
    }

    /// Rewrite the slots of one trip.
    pub fn patch_trip(&mut self, solution: &Solution, problem: &Problem, route: usize, trip: usize) {
        for (offset, &arc) in solution.routes[route].trips[trip].arcs.iter().enumerate() {
            self.set(problem, arc, Slot { route, trip, offset });
        }
    }

    /// Rewrite the slots of every trip of one route.
    pub fn patch_route(&mut self, solution: &Solution, problem: &Problem, route: usize) {
        for trip in 0..solution.routes[route].trips.len() {
            self.patch_trip(solution, problem, route, trip);
        }
    }
}

/// The arc currently scheduled at `slot`, if the slot exists.
#[inline]
pub fn scheduled_at(solution: &Solution, slot: Slot) -> Option<ArcId> {
    solution
        .routes
        .get(slot.route)?
        .trips
        .get(slot.trip)?
        .arcs
        .get(slot.offset)
        .copied()
}

/// One entry of the giant route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visit {
    /// Route boundary.
    Depot(ArcId),
    /// A serviced task.
    Task(ArcId),
    /// Trip boundary, carrying the chosen IF.
    Facility(ArcId),
}

/// Structural roles of scheduled arcs.
#[derive(Debug, Clone, Default)]
pub struct BoundarySets {
    /// First arc of a route
    pub begin_route: ArcSet,
    /// First arc of a trip that follows an IF
    pub begin_trip: ArcSet,
    /// Last arc of a route
    pub end_route: ArcSet,
    /// Last arc of a trip that is followed by another trip
    pub end_trip: ArcSet,
    /// Only arc of its route
    pub single_route_arc: ArcSet,
    /// Only arc of its trip
    pub single_trip_arc: ArcSet,
}

impl BoundarySets {
    pub fn classify(solution: &Solution, problem: &Problem) -> Self {
        let n = problem.arc_count();
        let mut sets = BoundarySets {
            begin_route: ArcSet::new(n),
            begin_trip: ArcSet::new(n),
            end_route: ArcSet::new(n),
            end_trip: ArcSet::new(n),
            single_route_arc: ArcSet::new(n),
            single_trip_arc: ArcSet::new(n),
        };

        for route in &solution.routes {
            let last_trip = route.trips.len().saturating_sub(1);
            if let Some(first) = route.first_arc() {
                sets.begin_route.insert(first);
            }
            if let Some(last) = route.last_arc() {
                sets.end_route.insert(last);
            }
            if route.arc_count() == 1 {
                if let Some(only) = route.first_arc() {
                    sets.single_route_arc.insert(only);
                }
            }
            for (k, trip) in route.trips.iter().enumerate() {
                if trip.len() == 1 {
                    sets.single_trip_arc.insert(trip.arcs[0]);
                }
                if k > 0 {
                    if let Some(&first) = trip.arcs.first() {
                        sets.begin_trip.insert(first);
                    }
                }
                if k < last_trip {
                    if let Some(&last) = trip.arcs.last() {
                        sets.end_trip.insert(last);
                    }
                }
            }
        }

        sets
    }
}

/// The flattened solution with its lookup structures.
#[derive(Debug, Clone)]
pub struct GiantRoute {
    pub sequence: Vec<Visit>,
    pub positions: PositionMap,
    pub roles: BoundarySets,
    /// Index in `sequence` of the depot marker that opens each route
    route_starts: Vec<usize>,
}

impl GiantRoute {
    /// Encode a whole solution.
    pub fn encode<B: BoundaryModel>(solution: &Solution, problem: &Problem, model: &B) -> Self {
        let mut sequence = vec![Visit::Depot(problem.depot)];
        let mut route_starts = Vec::with_capacity(solution.routes.len());

        for route in &solution.routes {
            route_starts.push(sequence.len() - 1);
            Self::encode_route(route, problem, model, &mut sequence);
        }

        GiantRoute {
            sequence,
            positions: PositionMap::build(solution, problem),
            roles: BoundarySets::classify(solution, problem),
            route_starts,
        }
    }

    /// Append the visits of a route, closing it with a depot marker.
    fn encode_route<B: BoundaryModel>(
        route: &Route,
        problem: &Problem,
        model: &B,
        out: &mut Vec<Visit>,
    ) {
        let count = route.trips.len();
        for (k, trip) in route.trips.iter().enumerate() {
            out.extend(trip.arcs.iter().map(|&a| Visit::Task(a)));
            if model.multi_trip() {
                let next = if k + 1 < count {
                    route.trips[k + 1].arcs.first().copied()
                } else {
                    Some(problem.depot)
                };
                let facility = trip.facility.or_else(|| {
                    let last = trip.arcs.last().copied()?;
                    model.boundary_facility(problem, last, next?)
                });
                if let Some(f) = facility {
                    out.push(Visit::Facility(f));
                }
            }
        }
        out.push(Visit::Depot(problem.depot));
    }

    /// Re-encode everything after a structural change that removed a route.
    pub fn rebuild<B: BoundaryModel>(&mut self, solution: &Solution, problem: &Problem, model: &B) {
        *self = GiantRoute::encode(solution, problem, model);
    }

    /// Re-encode the slice belonging to route `r` and refresh its positions.
    ///
    /// Roles are left untouched; they are reclassified once per pass.
    pub fn patch_route<B: BoundaryModel>(
        &mut self,
        solution: &Solution,
        problem: &Problem,
        model: &B,
        r: usize,
    ) {
        if r >= self.route_starts.len() || self.route_starts.len() != solution.routes.len() {
            self.rebuild(solution, problem, model);
            return;
        }

        // Slice runs from just after the opening depot marker up to and
        // including the closing one.
        let start = self.route_starts[r] + 1;
        let end = if r + 1 < self.route_starts.len() {
            self.route_starts[r + 1] + 1
        } else {
            self.sequence.len()
        };

        let mut replacement = Vec::new();
        Self::encode_route(&solution.routes[r], problem, model, &mut replacement);
        let shift = replacement.len() as isize - (end - start) as isize;
        self.sequence.splice(start..end, replacement);

        for later in self.route_starts.iter_mut().skip(r + 1) {
            *later = (*later as isize + shift) as usize;
        }

        self.positions.patch_route(solution, problem, r);
    }

    /// Sequence indices of the last task before each depot marker.
    pub fn route_end_positions(&self) -> Vec<usize> {
        self.marker_predecessors(|v| matches!(v, Visit::Depot(_)))
    }

    /// Sequence indices of the last task before each IF marker.
    pub fn trip_end_positions(&self) -> Vec<usize> {
        self.marker_predecessors(|v| matches!(v, Visit::Facility(_)))
    }

    fn marker_predecessors(&self, is_marker: impl Fn(&Visit) -> bool) -> Vec<usize> {
        self.sequence
            .windows(2)
            .enumerate()
            .filter(|(_, w)| matches!(w[0], Visit::Task(_)) && is_marker(&w[1]))
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of routes encoded.
    pub fn route_count(&self) -> usize {
        self.route_starts.len()
    }

    /// Rebuild a solution from the sequence.
    pub fn decode<B: BoundaryModel>(&self, problem: &Problem, model: &B) -> Solution {
        let mut routes: Vec<Vec<Vec<ArcId>>> = Vec::new();
        let mut trips: Vec<Vec<ArcId>> = Vec::new();
        let mut current: Vec<ArcId> = Vec::new();

        for visit in self.sequence.iter().skip(1) {
            match *visit {
                Visit::Task(arc) => current.push(arc),
                Visit::Facility(_) => {
                    trips.push(std::mem::take(&mut current));
                }
                Visit::Depot(_) => {
                    if !current.is_empty() {
                        trips.push(std::mem::take(&mut current));
                    }
                    routes.push(std::mem::take(&mut trips));
                }
            }
        }

        let mut solution = Solution::from_routes(routes, problem, model);
        // Keep the IFs recorded in the sequence rather than re-selecting them.
        let mut facilities = self.sequence.iter().filter_map(|v| match v {
            Visit::Facility(f) => Some(*f),
            _ => None,
        });
        if model.multi_trip() {
            for trip in solution.routes.iter_mut().flat_map(|r| r.trips.iter_mut()) {
                let recorded: Option<ArcId> = facilities.next();
                if recorded.is_some() {
                    trip.facility = recorded;
                }
            }
        }
        solution
    }
}
