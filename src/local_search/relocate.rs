//! Relocate neighbourhoods: single arcs, consecutive pairs, and the
//! variants that insert next to an IF or at the end of a route.

use crate::boundary::{BoundaryModel, Link};
use crate::encoding::{ArcSet, Slot};
use crate::moves::{Insertion, Move, MoveKind, Relocation};
use crate::problem::ArcId;

use super::utils::{calculate_insertion_cost, calculate_removal_cost, orientations, Gap};
use super::MoveCostCalculator;

/// An arc (or chain) taken out of its slot, with the resulting cost change.
#[derive(Debug, Clone, Copy)]
struct Removal {
    pred: Link,
    succ: Link,
    delta: f64,
}

impl<'a, B: BoundaryModel> MoveCostCalculator<'a, B> {
    fn removal(&self, slot: Slot, chain: &[ArcId]) -> Removal {
        let last = Slot {
            offset: slot.offset + chain.len() - 1,
            ..slot
        };
        let pred = self.predecessor(slot);
        let succ = self.successor(last);
        Removal {
            pred,
            succ,
            delta: calculate_removal_cost(pred, chain, succ, self.problem, self.model),
        }
    }

    /// Move `arc` into `gap` in its cheapest orientation.
    fn relocation(
        &self,
        arc: ArcId,
        removal: Removal,
        gap: Gap,
        target: Insertion,
        wrap: fn(Relocation) -> MoveKind,
    ) -> Option<Move> {
        let (placed, insertion) = orientations(arc, self.problem)
            .map(|w| {
                (
                    w,
                    calculate_insertion_cost(&gap, &[w], self.problem, self.model),
                )
            })
            .min_by(|x, y| x.1.total_cmp(&y.1))?;

        let delta = removal.delta + insertion;
        if !(delta < self.threshold) {
            return None;
        }

        let footprint = self.footprint([
            arc,
            removal.pred.arc,
            removal.succ.arc,
            gap.pred.arc,
            gap.succ.arc,
        ]);
        let relocation = Relocation {
            arc,
            placed,
            target,
        };
        Some(
            Move::new(wrap(relocation), delta, footprint)
                .with_route_cost(arc, removal.delta)
                .with_route_cost(target.anchor(), insertion)
                .with_trip_load(arc, -self.problem.demand(arc))
                .with_trip_load(target.anchor(), self.problem.demand(placed)),
        )
    }

    /// Insert each candidate in front of a nearby arc that does not start a
    /// later trip.
    pub fn relocate(&self, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        let mut moves = Vec::new();

        for &arc in candidates {
            let slot = match self.slot_of(arc) {
                Some(slot) => slot,
                None => continue,
            };
            let removal = self.removal(slot, &[arc]);
            let near: Vec<ArcId> = orientations(arc, self.problem).collect();

            for (x, x_slot) in self.nearby(&near) {
                if x == arc || !targets.contains(x) || self.giant.roles.begin_trip.contains(x) {
                    continue;
                }
                let gap = Gap::before(self.solution, self.problem, x_slot);
                // Re-inserting next to the removal point is a no-op.
                if gap.touches(arc) {
                    continue;
                }
                moves.extend(self.relocation(arc, removal, gap, Insertion::Before(x), MoveKind::Relocate));
            }
        }

        moves
    }

    /// Insert each candidate right after an IF, in front of a later trip.
    pub fn relocate_post_if(&self, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        self.relocate_at_role(candidates, targets, |calc, x, x_slot| {
            calc.giant
                .roles
                .begin_trip
                .contains(x)
                .then(|| (Gap::before(calc.solution, calc.problem, x_slot), Insertion::Before(x)))
        }, MoveKind::RelocatePostIf)
    }

    /// Insert each candidate at the end of a trip that is followed by an IF
    /// and another trip.
    pub fn relocate_pre_if(&self, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        self.relocate_at_role(candidates, targets, |calc, x, x_slot| {
            calc.giant
                .roles
                .end_trip
                .contains(x)
                .then(|| (Gap::after(calc.solution, calc.problem, x_slot), Insertion::TripEnd(x)))
        }, MoveKind::RelocatePreIf)
    }

    /// Insert each candidate at the end of a route, before the depot return.
    pub fn relocate_before_dummy(&self, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        self.relocate_at_role(candidates, targets, |calc, x, x_slot| {
            calc.giant
                .roles
                .end_route
                .contains(x)
                .then(|| (Gap::after(calc.solution, calc.problem, x_slot), Insertion::TripEnd(x)))
        }, MoveKind::RelocateAtRouteBoundary)
    }

    // Boundary positions are few, so every one of them is tried.
    fn relocate_at_role(
        &self,
        candidates: &[ArcId],
        targets: &ArcSet,
        gap_at: impl Fn(&Self, ArcId, Slot) -> Option<(Gap, Insertion)>,
        wrap: fn(Relocation) -> MoveKind,
    ) -> Vec<Move> {
        let anchors: Vec<(ArcId, Gap, Insertion)> = self
            .scheduled()
            .filter(|(x, _)| targets.contains(*x))
            .filter_map(|(x, x_slot)| gap_at(self, x, x_slot).map(|(gap, ins)| (x, gap, ins)))
            .collect();
        let mut moves = Vec::new();

        for &arc in candidates {
            let slot = match self.slot_of(arc) {
                Some(slot) => slot,
                None => continue,
            };
            let removal = self.removal(slot, &[arc]);

            for &(x, gap, target) in &anchors {
                if x == arc || gap.touches(arc) {
                    continue;
                }
                moves.extend(self.relocation(arc, removal, gap, target, wrap));
            }
        }

        moves
    }

    /// Move two consecutive arcs of a trip together, keeping their order and
    /// orientation.
    pub fn double_relocate(&self, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        let mut moves = Vec::new();
        let ends: Vec<(ArcId, Slot)> = self
            .scheduled()
            .filter(|(x, _)| {
                targets.contains(*x)
                    && (self.giant.roles.end_trip.contains(*x)
                        || self.giant.roles.end_route.contains(*x))
            })
            .collect();

        for &first in candidates {
            let slot = match self.slot_of(first) {
                Some(slot) => slot,
                None => continue,
            };
            let second = match self.solution.routes[slot.route].trips[slot.trip]
                .arcs
                .get(slot.offset + 1)
            {
                Some(&second) => second,
                None => continue,
            };
            let chain = [first, second];
            let removal = self.removal(slot, &chain);

            let before = self
                .nearby(&[second])
                .into_iter()
                .map(|(x, x_slot)| (Gap::before(self.solution, self.problem, x_slot), Insertion::Before(x)));
            let after = ends
                .iter()
                .map(|&(x, x_slot)| (Gap::after(self.solution, self.problem, x_slot), Insertion::TripEnd(x)));

            for (gap, target) in before.chain(after) {
                let anchor = target.anchor();
                if chain.contains(&anchor)
                    || !targets.contains(anchor)
                    || chain.iter().any(|&c| gap.touches(c))
                {
                    continue;
                }

                let insertion = calculate_insertion_cost(&gap, &chain, self.problem, self.model);
                let delta = removal.delta + insertion;
                if !(delta < self.threshold) {
                    continue;
                }

                let footprint = self.footprint([
                    first,
                    second,
                    removal.pred.arc,
                    removal.succ.arc,
                    gap.pred.arc,
                    gap.succ.arc,
                ]);
                let load = self.problem.demand(first) + self.problem.demand(second);
                moves.push(
                    Move::new(
                        MoveKind::DoubleRelocate {
                            first,
                            second,
                            target,
                        },
                        delta,
                        footprint,
                    )
                    .with_route_cost(first, removal.delta)
                    .with_route_cost(anchor, insertion)
                    .with_trip_load(first, -load)
                    .with_trip_load(anchor, load),
                );
            }
        }

        moves
    }
}
