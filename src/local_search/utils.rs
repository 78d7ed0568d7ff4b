//! Utility functions for local search operations.

use crate::boundary::{BoundaryModel, Link};
use crate::encoding::Slot;
use crate::problem::{ArcId, Problem};
use crate::solution::Solution;

/// A place between two scheduled positions where arcs can be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Arc before the gap; `via` tells whether a boundary sits before the gap
    pub pred: Link,
    /// Arc after the gap; `via` tells whether a boundary sits after the gap
    pub succ: Link,
}

impl Gap {
    /// The gap directly in front of the arc at `slot`.
    pub fn before(solution: &Solution, problem: &Problem, slot: Slot) -> Self {
        let route = &solution.routes[slot.route];
        Gap {
            pred: route.predecessor(slot.trip, slot.offset, problem),
            succ: Link::direct(route.trips[slot.trip].arcs[slot.offset]),
        }
    }

    /// The gap directly after the arc at `slot`, on the same trip.
    pub fn after(solution: &Solution, problem: &Problem, slot: Slot) -> Self {
        let route = &solution.routes[slot.route];
        Gap {
            pred: Link::direct(route.trips[slot.trip].arcs[slot.offset]),
            succ: route.successor(slot.trip, slot.offset, problem),
        }
    }

    /// Whether `arc` sits on either side of the gap.
    #[inline]
    pub fn touches(&self, arc: ArcId) -> bool {
        self.pred.arc == arc || self.succ.arc == arc
    }

    /// Cost of the link the gap currently represents.
    ///
    /// At most one side of a gap carries a boundary.
    pub fn link_cost<B: BoundaryModel>(&self, problem: &Problem, model: &B) -> f64 {
        if self.pred.is_boundary() {
            model.cost_into(problem, self.pred, self.succ.arc)
        } else {
            model.link_cost(problem, self.pred.arc, self.succ)
        }
    }
}

/// Cost of a chain of arcs served back to back, excluding the links at both ends.
pub fn chain_cost(chain: &[ArcId], problem: &Problem) -> f64 {
    let service: f64 = chain.iter().map(|&a| problem.service_cost(a)).sum();
    let links: f64 = chain
        .windows(2)
        .map(|w| problem.distance(w[0], w[1]))
        .sum();
    service + links
}

/// Change in cost when `chain` is placed into `gap`.
pub fn calculate_insertion_cost<B: BoundaryModel>(
    gap: &Gap,
    chain: &[ArcId],
    problem: &Problem,
    model: &B,
) -> f64 {
    let (first, last) = match (chain.first(), chain.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return 0.0,
    };
    model.cost_into(problem, gap.pred, first) + chain_cost(chain, problem)
        + model.link_cost(problem, last, gap.succ)
        - gap.link_cost(problem, model)
}

/// Change in cost when `chain`, currently between `pred` and `succ`, is taken out.
pub fn calculate_removal_cost<B: BoundaryModel>(
    pred: Link,
    chain: &[ArcId],
    succ: Link,
    problem: &Problem,
    model: &B,
) -> f64 {
    let (first, last) = match (chain.first(), chain.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return 0.0,
    };
    model.bridge_cost(problem, pred, succ)
        - model.cost_into(problem, pred, first)
        - chain_cost(chain, problem)
        - model.link_cost(problem, last, succ)
}

/// Change in cost when `old` is replaced by `new` in place.
pub fn calculate_replacement_cost<B: BoundaryModel>(
    pred: Link,
    old: ArcId,
    new: ArcId,
    succ: Link,
    problem: &Problem,
    model: &B,
) -> f64 {
    model.cost_into(problem, pred, new) + problem.service_cost(new)
        + model.link_cost(problem, new, succ)
        - model.cost_into(problem, pred, old)
        - problem.service_cost(old)
        - model.link_cost(problem, old, succ)
}

/// The arc itself and, for an edge, its other orientation.
pub fn orientations(arc: ArcId, problem: &Problem) -> impl Iterator<Item = ArcId> {
    std::iter::once(arc).chain(problem.inverse(arc))
}

/// Push the task arcs among `arcs` onto a footprint, skipping depot and IF arcs.
pub fn extend_footprint(
    footprint: &mut Vec<ArcId>,
    arcs: impl IntoIterator<Item = ArcId>,
    problem: &Problem,
) {
    for arc in arcs {
        if problem.is_task(arc) && !footprint.contains(&arc) {
            footprint.push(arc);
        }
    }
}
