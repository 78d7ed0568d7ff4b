//! Independent consistency checks for solutions.
//!
//! Everything stored on a solution (loads, costs, IF choices) is recomputed
//! from the arc sequences and compared with the stored values. This is slow
//! and meant for tests and for the optional post-move self-check.

use crate::boundary::BoundaryModel;
use crate::problem::{ArcId, Problem};
use crate::solution::{Solution, EPSILON};
use serde::Serialize;
use thiserror::Error;

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum Violation {
    #[error("required task {0} is not serviced")]
    Unserviced(ArcId),
    #[error("task {0} is serviced {1} times")]
    DuplicateService(ArcId, usize),
    #[error("arc {arc} in route {route} is not a task")]
    InvalidArc { route: usize, arc: ArcId },
    #[error("route {route} has an empty trip {trip}")]
    EmptyTrip { route: usize, trip: usize },
    #[error("trip {route}.{trip} stores load {stored} but carries {actual}")]
    LoadMismatch {
        route: usize,
        trip: usize,
        stored: f64,
        actual: f64,
    },
    #[error("trip {route}.{trip} load {load} exceeds capacity {capacity}")]
    CapacityExceeded {
        route: usize,
        trip: usize,
        load: f64,
        capacity: f64,
    },
    #[error("route {route} stores cost {stored} but costs {actual}")]
    CostMismatch {
        route: usize,
        stored: f64,
        actual: f64,
    },
    #[error("route {route} cost {cost} exceeds the duration limit {limit}")]
    DurationExceeded { route: usize, cost: f64, limit: f64 },
    #[error("solution stores cost {stored} but its routes sum to {actual}")]
    TotalCostMismatch { stored: f64, actual: f64 },
    #[error("trip {route}.{trip} records IF {stored:?}, expected {expected:?}")]
    FacilityMismatch {
        route: usize,
        trip: usize,
        stored: Option<ArcId>,
        expected: Option<ArcId>,
    },
}

#[inline]
fn differs(stored: f64, actual: f64) -> bool {
    (stored - actual).abs() > EPSILON * (1.0 + actual.abs())
}

/// Check every structural invariant of `solution`.
pub fn validate<B: BoundaryModel>(
    solution: &Solution,
    problem: &Problem,
    model: &B,
) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    let mut serviced = vec![0usize; problem.arc_count()];
    let limit = model.duration_limit(problem);

    for (r, route) in solution.routes.iter().enumerate() {
        let trip_count = route.trips.len();

        for (k, trip) in route.trips.iter().enumerate() {
            if trip.is_empty() {
                violations.push(Violation::EmptyTrip { route: r, trip: k });
                continue;
            }

            let mut load = 0.0;
            for &arc in &trip.arcs {
                if arc.index() >= problem.arc_count() || !problem.is_task(arc) {
                    violations.push(Violation::InvalidArc { route: r, arc });
                    continue;
                }
                serviced[problem.edge_key(arc).index()] += 1;
                load += problem.demand(arc);
            }

            if differs(trip.load, load) {
                violations.push(Violation::LoadMismatch {
                    route: r,
                    trip: k,
                    stored: trip.load,
                    actual: load,
                });
            }
            if load > problem.capacity + EPSILON {
                violations.push(Violation::CapacityExceeded {
                    route: r,
                    trip: k,
                    load,
                    capacity: problem.capacity,
                });
            }

            let expected = if model.multi_trip() {
                let next = if k + 1 < trip_count {
                    route.trips[k + 1].arcs.first().copied().unwrap_or(problem.depot)
                } else {
                    problem.depot
                };
                trip.arcs
                    .last()
                    .and_then(|&last| model.boundary_facility(problem, last, next))
            } else {
                None
            };
            if trip.facility != expected {
                violations.push(Violation::FacilityMismatch {
                    route: r,
                    trip: k,
                    stored: trip.facility,
                    expected,
                });
            }
        }

        if violations
            .iter()
            .any(|v| matches!(v, Violation::InvalidArc { route, .. } if *route == r))
        {
            continue;
        }

        let (actual, _) = route.walk(problem, model);
        if differs(route.cost, actual) {
            violations.push(Violation::CostMismatch {
                route: r,
                stored: route.cost,
                actual,
            });
        }
        if let Some(limit) = limit {
            if actual > limit + EPSILON {
                violations.push(Violation::DurationExceeded {
                    route: r,
                    cost: actual,
                    limit,
                });
            }
        }
    }

    for &task in problem.tasks() {
        if problem.edge_key(task) != task {
            continue;
        }
        match serviced[task.index()] {
            0 => violations.push(Violation::Unserviced(task)),
            1 => {}
            n => violations.push(Violation::DuplicateService(task, n)),
        }
    }

    let total: f64 = solution.routes.iter().map(|r| r.cost).sum();
    if differs(solution.cost, total) {
        violations.push(Violation::TotalCostMismatch {
            stored: solution.cost,
            actual: total,
        });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
