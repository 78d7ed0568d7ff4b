//! Split an ordered task list into routes.
//!
//! Used to build starting solutions for the local search. MCARP orders are
//! split optimally into single-trip routes; MCARPTIF orders are cut greedily
//! into trips at capacity and into routes at the duration limit.

use crate::boundary::{BoundaryModel, Link};
use crate::problem::{ArcId, Problem};
use crate::solution::{Solution, EPSILON};

/// Turns a giant tour of oriented tasks into a solution.
pub struct Split;

impl Split {
    /// Split `order` into routes. Tasks keep their orientation and order.
    pub fn split<B: BoundaryModel>(order: &[ArcId], problem: &Problem, model: &B) -> Solution {
        if order.is_empty() {
            return Solution::new();
        }

        let routes = if model.multi_trip() {
            Self::split_greedy(order, problem, model)
        } else {
            Self::split_optimal(order, problem, model)
        };

        Solution::from_routes(routes, problem, model)
    }

    /// Bellman split over single-trip routes. A task heavier than the
    /// capacity still gets a route of its own.
    fn split_optimal<B: BoundaryModel>(
        order: &[ArcId],
        problem: &Problem,
        model: &B,
    ) -> Vec<Vec<Vec<ArcId>>> {
        let n = order.len();
        let depot = problem.depot;

        let mut potential = vec![f64::INFINITY; n + 1];
        let mut pred = vec![0; n + 1];
        potential[0] = 0.0;

        for i in 0..n {
            if potential[i].is_infinite() {
                continue;
            }

            let mut load = 0.0;
            let mut cost = problem.distance(depot, order[i]);

            for j in i..n {
                load += problem.demand(order[j]);
                if j > i {
                    if load > problem.capacity + EPSILON {
                        break;
                    }
                    cost += problem.distance(order[j - 1], order[j]);
                }
                cost += problem.service_cost(order[j]);

                let total = potential[i] + cost + model.boundary_cost(problem, order[j], depot);
                if total < potential[j + 1] {
                    potential[j + 1] = total;
                    pred[j + 1] = i;
                }
            }
        }

        // Reconstruct the routes, last one first
        let mut routes = Vec::new();
        let mut j = n;
        while j > 0 {
            let i = pred[j];
            routes.push(vec![order[i..j].to_vec()]);
            j = i;
        }
        routes.reverse();

        routes
    }

    /// Fill trips up to capacity and open a new route before the duration
    /// limit is exceeded.
    fn split_greedy<B: BoundaryModel>(
        order: &[ArcId],
        problem: &Problem,
        model: &B,
    ) -> Vec<Vec<Vec<ArcId>>> {
        let depot = problem.depot;
        let limit = model.duration_limit(problem).unwrap_or(f64::INFINITY);

        let mut routes: Vec<Vec<Vec<ArcId>>> = Vec::new();
        let mut trips: Vec<Vec<ArcId>> = Vec::new();
        let mut trip: Vec<ArcId> = Vec::new();
        let mut load = 0.0;
        let mut cost = 0.0;
        let mut pred = Link::direct(depot);

        for &arc in order {
            let demand = problem.demand(arc);

            // A full trip ends at an IF; the next arc is reached through it.
            let (next_pred, next_trip) = if !trip.is_empty() && load + demand > problem.capacity + EPSILON {
                (Link::boundary(pred.arc), true)
            } else {
                (pred, false)
            };

            let extra = model.cost_into(problem, next_pred, arc) + problem.service_cost(arc);
            let closing = model.boundary_cost(problem, arc, depot);
            let started = !trip.is_empty() || !trips.is_empty();

            if started && cost + extra + closing > limit + EPSILON {
                if !trip.is_empty() {
                    trips.push(std::mem::take(&mut trip));
                }
                routes.push(std::mem::take(&mut trips));
                trip.push(arc);
                load = demand;
                cost = problem.distance(depot, arc) + problem.service_cost(arc);
                pred = Link::direct(arc);
                continue;
            }

            if next_trip {
                trips.push(std::mem::take(&mut trip));
                load = 0.0;
            }
            trip.push(arc);
            load += demand;
            cost += extra;
            pred = Link::direct(arc);
        }

        if !trip.is_empty() {
            trips.push(trip);
        }
        if !trips.is_empty() {
            routes.push(trips);
        }

        routes
    }

    /// Concatenate the routes of a solution back into a giant tour.
    pub fn giant_tour(solution: &Solution) -> Vec<ArcId> {
        solution.routes.iter().flat_map(|route| route.arcs()).collect()
    }
}
