//! Boundary-aware link costs.
//!
//! The cost of placing or removing an arc depends on what sits next to it: a
//! plain task, the depot, or an intermediate facility (IF). A [`Link`] records
//! the arc on one side of a position and whether the connection crosses a
//! trip boundary. The [`BoundaryModel`] turns links into costs. MCARP is the
//! degenerate model where the only boundary is the return to the depot.

use crate::error::{Result, SearchError};
use crate::problem::{ArcId, Problem};

/// How two consecutive arcs are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    /// Plain deadhead between the two arcs.
    Direct,
    /// Through a trip boundary: an IF visit (MCARPTIF) or the final depot return.
    Boundary,
}

/// The arc on one side of a scheduled position.
///
/// For a predecessor, `via` describes how the predecessor reaches the
/// position; for a successor, how the position reaches the successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub arc: ArcId,
    pub via: Via,
}

impl Link {
    pub fn direct(arc: ArcId) -> Self {
        Link {
            arc,
            via: Via::Direct,
        }
    }

    pub fn boundary(arc: ArcId) -> Self {
        Link {
            arc,
            via: Via::Boundary,
        }
    }

    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.via == Via::Boundary
    }
}

/// Supplies the trip-boundary arithmetic for a problem variant.
pub trait BoundaryModel {
    fn name(&self) -> &'static str;

    /// Cost of going from `from` to `to` across a trip boundary.
    fn boundary_cost(&self, problem: &Problem, from: ArcId, to: ArcId) -> f64;

    /// The facility visited on a boundary between `from` and `to`, if any.
    fn boundary_facility(&self, problem: &Problem, from: ArcId, to: ArcId) -> Option<ArcId>;

    /// Maximum route cost, when the variant restricts it.
    fn duration_limit(&self, problem: &Problem) -> Option<f64>;

    /// Whether a route may hold more than one trip.
    fn multi_trip(&self) -> bool;

    /// Reject instances the variant cannot search. Trips that end at an IF
    /// need at least one IF to end at.
    fn check_instance(&self, problem: &Problem) -> Result<()> {
        if self.multi_trip() && problem.facilities().is_empty() {
            return Err(SearchError::invalid_instance(format!(
                "{} needs at least one intermediate facility",
                self.name()
            )));
        }
        Ok(())
    }

    /// Cost of leaving `from` along `to`.
    #[inline]
    fn link_cost(&self, problem: &Problem, from: ArcId, to: Link) -> f64 {
        match to.via {
            Via::Direct => problem.distance(from, to.arc),
            Via::Boundary => self.boundary_cost(problem, from, to.arc),
        }
    }

    /// Cost of reaching `arc` from the predecessor `pred`.
    #[inline]
    fn cost_into(&self, problem: &Problem, pred: Link, arc: ArcId) -> f64 {
        self.link_cost(
            problem,
            pred.arc,
            Link {
                arc,
                via: pred.via,
            },
        )
    }

    /// Cost of the link that joins `pred` and `succ` once everything between
    /// them has been taken out.
    ///
    /// A depot predecessor followed by a boundary means the first trip of the
    /// route disappeared: the route then starts at the next trip, or vanishes
    /// entirely when the boundary was the final return.
    fn bridge_cost(&self, problem: &Problem, pred: Link, succ: Link) -> f64 {
        if pred.arc == problem.depot {
            if succ.arc == problem.depot {
                0.0
            } else {
                problem.distance(problem.depot, succ.arc)
            }
        } else if pred.is_boundary() || succ.is_boundary() {
            self.boundary_cost(problem, pred.arc, succ.arc)
        } else {
            problem.distance(pred.arc, succ.arc)
        }
    }
}

/// Single-trip routes bounded by the depot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mcarp;

impl BoundaryModel for Mcarp {
    fn name(&self) -> &'static str {
        "MCARP"
    }

    #[inline]
    fn boundary_cost(&self, problem: &Problem, from: ArcId, to: ArcId) -> f64 {
        problem.distance(from, to)
    }

    fn boundary_facility(&self, _problem: &Problem, _from: ArcId, _to: ArcId) -> Option<ArcId> {
        None
    }

    fn duration_limit(&self, _problem: &Problem) -> Option<f64> {
        None
    }

    fn multi_trip(&self) -> bool {
        false
    }
}

/// Multi-trip routes where every trip ends with the cheapest IF visit and the
/// route ends at the depot after its last IF.
#[derive(Debug, Clone, Copy, Default)]
pub struct McarpTif;

impl BoundaryModel for McarpTif {
    fn name(&self) -> &'static str {
        "MCARPTIF"
    }

    #[inline]
    fn boundary_cost(&self, problem: &Problem, from: ArcId, to: ArcId) -> f64 {
        problem.if_cost(from, to)
    }

    fn boundary_facility(&self, problem: &Problem, from: ArcId, to: ArcId) -> Option<ArcId> {
        problem.best_if_between(from, to)
    }

    fn duration_limit(&self, problem: &Problem) -> Option<f64> {
        problem.max_trip_duration
    }

    fn multi_trip(&self) -> bool {
        true
    }
}
