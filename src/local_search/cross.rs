//! Cross neighbourhoods: exchanging route tails.
//!
//! A cut "after `a`" splits a route into the head ending with `a` and the
//! tail starting with the successor of `a`. When the successor lies behind a
//! boundary the tail starts with a fresh trip, so crossing at a trip end
//! reshuffles whole trips between routes.

use crate::boundary::{BoundaryModel, Link};
use crate::encoding::{ArcSet, Slot};
use crate::moves::{Move, MoveKind};
use crate::problem::ArcId;
use std::collections::HashSet;

use super::MoveCostCalculator;

/// Which cross pairs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossScope {
    /// Cuts in two different routes
    pub between_routes: bool,
    /// Cuts in the same trip, kept for the double-cross search
    pub within_trip: bool,
}

impl<'a, B: BoundaryModel> MoveCostCalculator<'a, B> {
    /// Cost change of joining the head ending with `a` to the tail `succ_b` and
    /// the head ending with `b` to the tail `succ_a`.
    pub fn cross_delta(&self, a: ArcId, succ_a: Link, b: ArcId, succ_b: Link) -> f64 {
        let link = |from: ArcId, to: Link| self.model.link_cost(self.problem, from, to);
        link(a, succ_b) + link(b, succ_a) - link(a, succ_a) - link(b, succ_b)
    }

    // The arc whose cut puts `v` at the start of a tail.
    fn cut_before(&self, v_slot: Slot) -> Option<(ArcId, Slot)> {
        let route = &self.solution.routes[v_slot.route];
        if v_slot.offset > 0 {
            let slot = Slot {
                offset: v_slot.offset - 1,
                ..v_slot
            };
            Some((route.trips[slot.trip].arcs[slot.offset], slot))
        } else if v_slot.trip > 0 {
            let trip = v_slot.trip - 1;
            let offset = route.trips[trip].arcs.len().checked_sub(1)?;
            Some((
                route.trips[trip].arcs[offset],
                Slot {
                    route: v_slot.route,
                    trip,
                    offset,
                },
            ))
        } else {
            None
        }
    }

    /// Swap the tails behind two cuts.
    ///
    /// Partners of `a` are the cuts that would give `a` a nearby successor,
    /// plus every route end. Cuts in one trip are emitted regardless of the
    /// threshold so the double-cross search can pair them; cuts in different
    /// trips of one route are skipped.
    pub fn cross(&self, candidates: &[ArcId], targets: &ArcSet, scope: CrossScope) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut seen: HashSet<(ArcId, ArcId)> = HashSet::new();
        let route_ends: Vec<(ArcId, Slot)> = self
            .scheduled()
            .filter(|(x, _)| self.giant.roles.end_route.contains(*x))
            .collect();

        for &a in candidates {
            let sa = match self.slot_of(a) {
                Some(slot) => slot,
                None => continue,
            };
            let succ_a = self.successor(sa);

            let partners = self
                .nearby(&[a])
                .into_iter()
                .filter_map(|(_, v_slot)| self.cut_before(v_slot))
                .chain(route_ends.iter().copied());

            for (b, sb) in partners {
                if b == a || !targets.contains(b) || !seen.insert((a.min(b), a.max(b))) {
                    continue;
                }

                if sa.route == sb.route {
                    if scope.within_trip && sa.trip == sb.trip {
                        moves.extend(self.same_trip_cross(a, sa, b, sb));
                    }
                    continue;
                }
                if !scope.between_routes {
                    continue;
                }

                let succ_b = self.successor(sb);
                let depot = self.problem.depot;
                if succ_a.arc == depot && succ_b.arc == depot {
                    continue;
                }

                let delta = self.cross_delta(a, succ_a, b, succ_b);
                if !(delta < self.threshold) {
                    continue;
                }
                let footprint = self.footprint([a, b, succ_a.arc, succ_b.arc]);
                moves.push(Move::new(MoveKind::Cross { a, b }, delta, footprint));
            }
        }

        moves
    }

    // Ordered so that the first cut comes first in the trip. Neighbouring cuts
    // leave an empty middle section and are useless for a double cross.
    fn same_trip_cross(&self, a: ArcId, sa: Slot, b: ArcId, sb: Slot) -> Option<Move> {
        let ((first, s1), (second, s2)) = if sa.offset < sb.offset {
            ((a, sa), (b, sb))
        } else {
            ((b, sb), (a, sa))
        };
        if s2.offset < s1.offset + 2 {
            return None;
        }
        let (succ_1, succ_2) = (self.successor(s1), self.successor(s2));
        let delta = self.cross_delta(first, succ_1, second, succ_2);
        let footprint = self.footprint([first, second, succ_1.arc, succ_2.arc]);
        Some(Move::new(
            MoveKind::Cross {
                a: first,
                b: second,
            },
            delta,
            footprint,
        ))
    }

    /// Cut a route before its first arc and hand it over to another route:
    /// the other route's tail takes its place.
    pub fn cross_at_dummy(&self, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        let mut moves = Vec::new();
        let depot = Link::direct(self.problem.depot);

        for &b in candidates {
            let sb = match self.slot_of(b) {
                Some(slot) => slot,
                None => continue,
            };
            let succ_b = self.successor(sb);

            for (first, s_first) in self.nearby(&[b]) {
                if s_first.trip != 0
                    || s_first.offset != 0
                    || s_first.route == sb.route
                    || !targets.contains(first)
                {
                    continue;
                }

                let delta = self.problem.distance(b, first)
                    + self.model.bridge_cost(self.problem, depot, succ_b)
                    - self.problem.distance(self.problem.depot, first)
                    - self.model.link_cost(self.problem, b, succ_b);
                if !(delta < self.threshold) {
                    continue;
                }

                let footprint = self.footprint([first, b, succ_b.arc]);
                moves.push(Move::new(
                    MoveKind::CrossAtRouteBoundary {
                        route_first: first,
                        b,
                    },
                    delta,
                    footprint,
                ));
            }
        }

        moves
    }
}
