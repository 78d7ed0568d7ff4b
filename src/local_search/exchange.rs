//! Exchange and flip neighbourhoods.

use crate::boundary::BoundaryModel;
use crate::encoding::ArcSet;
use crate::moves::{Move, MoveKind};
use crate::problem::ArcId;
use std::collections::HashSet;

use super::utils::{calculate_replacement_cost, orientations};
use super::MoveCostCalculator;

impl<'a, B: BoundaryModel> MoveCostCalculator<'a, B> {
    /// Swap each candidate with a nearby non-adjacent arc, placing both in
    /// their cheapest orientation.
    pub fn exchange(&self, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut seen: HashSet<(ArcId, ArcId)> = HashSet::new();

        for &a in candidates {
            let sa = match self.slot_of(a) {
                Some(slot) => slot,
                None => continue,
            };
            let (pa, na) = (self.predecessor(sa), self.successor(sa));

            for (b, sb) in self.nearby(&[a]) {
                if b == a || !targets.contains(b) || !seen.insert((a.min(b), a.max(b))) {
                    continue;
                }
                let (pb, nb) = (self.predecessor(sb), self.successor(sb));
                // Adjacent swaps share a link and are not additive.
                if pa.arc == b || na.arc == b || pb.arc == a || nb.arc == a {
                    continue;
                }

                let cheapest = |old: ArcId, new: ArcId, pred, succ| {
                    orientations(new, self.problem)
                        .map(|w| {
                            let cost = calculate_replacement_cost(
                                pred,
                                old,
                                w,
                                succ,
                                self.problem,
                                self.model,
                            );
                            (w, cost)
                        })
                        .min_by(|x, y| x.1.total_cmp(&y.1))
                };
                let ((b_placed, at_a), (a_placed, at_b)) =
                    match (cheapest(a, b, pa, na), cheapest(b, a, pb, nb)) {
                        (Some(x), Some(y)) => (x, y),
                        _ => continue,
                    };

                let delta = at_a + at_b;
                if !(delta < self.threshold) {
                    continue;
                }

                let footprint = self.footprint([a, b, pa.arc, na.arc, pb.arc, nb.arc]);
                moves.push(
                    Move::new(
                        MoveKind::Exchange {
                            a,
                            a_placed,
                            b,
                            b_placed,
                        },
                        delta,
                        footprint,
                    )
                    .with_route_cost(a, at_a)
                    .with_route_cost(b, at_b)
                    .with_trip_load(a, self.problem.demand(b_placed) - self.problem.demand(a))
                    .with_trip_load(b, self.problem.demand(a_placed) - self.problem.demand(b)),
                );
            }
        }

        moves
    }

    /// Service each candidate edge in its other orientation.
    pub fn flip(&self, candidates: &[ArcId]) -> Vec<Move> {
        candidates
            .iter()
            .filter_map(|&arc| self.flip_move(arc))
            .filter(|mv| mv.delta < self.threshold)
            .collect()
    }

    /// The flip of a scheduled arc, whatever its delta. `None` for arcs
    /// without an inverse.
    pub fn flip_move(&self, arc: ArcId) -> Option<Move> {
        let placed = self.problem.inverse(arc)?;
        let slot = self.slot_of(arc)?;
        let (pred, succ) = (self.predecessor(slot), self.successor(slot));
        let delta =
            calculate_replacement_cost(pred, arc, placed, succ, self.problem, self.model);

        let footprint = self.footprint([arc, pred.arc, succ.arc]);
        Some(
            Move::new(MoveKind::Flip { arc, placed }, delta, footprint)
                .with_route_cost(arc, delta)
                .with_trip_load(arc, self.problem.demand(placed) - self.problem.demand(arc)),
        )
    }
}
