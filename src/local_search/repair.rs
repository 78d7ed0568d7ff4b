//! Repair search, run when a compound pass applies nothing.
//!
//! Two kinds of moves are rescued from the bookkeeping of the pass:
//! same-trip cross candidates, which only make sense in interleaved pairs
//! (double cross), and relocates or exchanges rejected for load, which become
//! feasible when another arc leaves the overloaded trip (combo).

use crate::boundary::BoundaryModel;
use crate::encoding::{ArcSet, BoundarySets, GiantRoute, Slot};
use crate::error::Result;
use crate::moves::{Move, MoveKind, MoveType};
use crate::problem::{ArcId, Problem};
use crate::solution::Solution;
use itertools::Itertools;
use std::collections::BTreeMap;

use super::compound::CompoundMoveTracker;
use super::feasibility::{FeasibilityChecker, MoveBook, Verdict};
use super::{LocalSearch, MoveCostCalculator, PassRules, SearchContext};

impl<B: BoundaryModel> LocalSearch<B> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn repair(
        &self,
        solution: &mut Solution,
        giant: &mut GiantRoute,
        problem: &Problem,
        ctx: &mut SearchContext<'_>,
        tracker: &mut CompoundMoveTracker,
        book: &MoveBook,
        rules: &PassRules<'_>,
    ) -> Result<Vec<Move>> {
        let mut applied = Vec::new();

        if self.config.moves.contains(MoveType::DoubleCross) && !book.deferred_cross.is_empty() {
            applied.extend(self.double_cross_search(solution, giant, problem, ctx, tracker, book, rules)?);
        }
        if self.config.compound_moves || applied.is_empty() {
            if self.config.moves.contains(MoveType::Combo) && !book.infeasible_load.is_empty() {
                giant.roles = BoundarySets::classify(solution, problem);
                applied.extend(self.combo_search(solution, giant, problem, ctx, tracker, book, rules)?);
            }
        }

        Ok(applied)
    }

    /// Pair interleaved same-trip cross candidates into double crosses.
    #[allow(clippy::too_many_arguments)]
    fn double_cross_search(
        &self,
        solution: &mut Solution,
        giant: &mut GiantRoute,
        problem: &Problem,
        ctx: &mut SearchContext<'_>,
        tracker: &mut CompoundMoveTracker,
        book: &MoveBook,
        rules: &PassRules<'_>,
    ) -> Result<Vec<Move>> {
        let checker = FeasibilityChecker::new(problem, &self.model);
        // Only cuts within one trip can interleave, so pair them trip by trip.
        let mut by_trip: BTreeMap<(usize, usize), Vec<(ArcId, ArcId)>> = BTreeMap::new();
        for mv in &book.deferred_cross {
            if let MoveKind::Cross { a, b } = mv.kind {
                if let Some(slot) = giant.positions.locate(solution, a) {
                    by_trip.entry((slot.route, slot.trip)).or_default().push((a, b));
                }
            }
        }
        let mut candidates: Vec<Move> = by_trip
            .values()
            .flat_map(|cuts| cuts.iter().copied().tuple_combinations())
            .filter_map(|(one, two)| self.double_cross_move(solution, giant, problem, one, two))
            .filter(|mv| mv.delta < self.config.cost_threshold)
            .collect();
        candidates.sort_by(|a, b| a.delta.total_cmp(&b.delta));
        let mut applied = Vec::new();

        for mv in candidates {
            if !tracker.is_still_applicable(&mv) || !(rules.admissible)(&mv) {
                continue;
            }
            if checker.assess(&mv, solution, &giant.positions) != Verdict::Feasible {
                continue;
            }

            self.execute(&mv, solution, giant, problem, ctx)?;
            tracker.record_influence(&mv, problem);
            applied.push(mv);

            if !self.config.compound_moves {
                break;
            }
        }

        Ok(applied)
    }

    /// The double cross built from two same-trip cut pairs, evaluated on the
    /// current solution. `None` unless the cuts interleave within one trip.
    pub fn double_cross_move(
        &self,
        solution: &Solution,
        giant: &GiantRoute,
        problem: &Problem,
        one: (ArcId, ArcId),
        two: (ArcId, ArcId),
    ) -> Option<Move> {
        let calc = MoveCostCalculator::new(problem, &self.model, solution, giant);
        let locate = |(a, b): (ArcId, ArcId)| -> Option<[(ArcId, Slot); 2]> {
            let (sa, sb) = (calc.slot_of(a)?, calc.slot_of(b)?);
            Some(if sa.offset <= sb.offset {
                [(a, sa), (b, sb)]
            } else {
                [(b, sb), (a, sa)]
            })
        };
        let (mut outer, mut inner) = (locate(one)?, locate(two)?);
        if inner[0].1.offset < outer[0].1.offset {
            std::mem::swap(&mut outer, &mut inner);
        }

        let [(p1, s1), (p3, s3)] = outer;
        let [(p2, s2), (p4, s4)] = inner;
        let slots = [s1, s2, s3, s4];
        let same_trip = slots
            .iter()
            .all(|s| s.route == s1.route && s.trip == s1.trip);
        if !same_trip || !(s1.offset < s2.offset && s2.offset < s3.offset && s3.offset < s4.offset) {
            return None;
        }

        let succ: Vec<_> = slots.iter().map(|&s| calc.successor(s)).collect();
        let delta = calc.cross_delta(p1, succ[0], p3, succ[2])
            + calc.cross_delta(p2, succ[1], p4, succ[3]);
        let footprint = calc.footprint(
            [p1, p2, p3, p4]
                .into_iter()
                .chain(succ.iter().map(|link| link.arc)),
        );

        Some(Move::new(
            MoveKind::DoubleCross {
                cuts: [p1, p2, p3, p4],
            },
            delta,
            footprint,
        ))
    }

    /// Pair load-infeasible relocates and exchanges with an outbound relocate
    /// from the trip they overload.
    #[allow(clippy::too_many_arguments)]
    fn combo_search(
        &self,
        solution: &mut Solution,
        giant: &mut GiantRoute,
        problem: &Problem,
        ctx: &mut SearchContext<'_>,
        tracker: &mut CompoundMoveTracker,
        book: &MoveBook,
        rules: &PassRules<'_>,
    ) -> Result<Vec<Move>> {
        let checker = FeasibilityChecker::new(problem, &self.model);
        let threshold = self.config.cost_threshold;
        let mut applied = Vec::new();

        for first in &book.infeasible_load {
            let combinable = first.relocation().is_some()
                || matches!(first.kind, MoveKind::Exchange { .. });
            if !combinable || !tracker.is_still_applicable(first) || !(rules.admissible)(first) {
                continue;
            }

            let (route, trip) = match checker
                .overloaded_trips(first, solution, &giant.positions)
                .as_slice()
            {
                [single] => *single,
                _ => continue,
            };

            let outbound = self.outbound_relocates(
                solution,
                giant,
                problem,
                tracker,
                first,
                (route, trip),
                threshold - first.delta,
            );

            for second in outbound {
                if !first.is_independent_of(&second)
                    || !tracker.is_still_applicable(&second)
                    || !(rules.admissible)(&second)
                {
                    continue;
                }
                let combo = Move::combo(first.clone(), second);
                if !(combo.delta < threshold) {
                    continue;
                }
                if checker.assess(&combo, solution, &giant.positions) != Verdict::Feasible {
                    continue;
                }

                self.execute(&combo, solution, giant, problem, ctx)?;
                tracker.record_influence(&combo, problem);
                applied.push(combo);
                giant.roles = BoundarySets::classify(solution, problem);
                break;
            }

            if !applied.is_empty() && !self.config.compound_moves {
                break;
            }
        }

        Ok(applied)
    }

    /// Relocates that take an arc out of trip `(route, trip)` into another trip,
    /// avoiding everything `first` and the current pass touched.
    #[allow(clippy::too_many_arguments)]
    fn outbound_relocates(
        &self,
        solution: &Solution,
        giant: &GiantRoute,
        problem: &Problem,
        tracker: &CompoundMoveTracker,
        first: &Move,
        (route, trip): (usize, usize),
        budget: f64,
    ) -> Vec<Move> {
        let trip_arcs = &solution.routes[route].trips[trip].arcs;
        let candidates: Vec<ArcId> = trip_arcs
            .iter()
            .copied()
            .filter(|a| !first.footprint.contains(a) && !tracker.is_touched(*a))
            .collect();

        let mut targets = tracker.insertion_targets(&ArcSet::full(problem.arc_count()));
        for &arc in first.footprint.iter().chain(trip_arcs.iter()) {
            targets.remove(arc);
        }

        let calc = MoveCostCalculator::new(problem, &self.model, solution, giant)
            .with_threshold(budget)
            .with_neighbor_fraction(self.config.neighbor_fraction);
        let enabled = &self.config.moves;
        let mut moves = Vec::new();

        if enabled.contains(MoveType::Relocate) {
            moves.extend(calc.relocate(&candidates, &targets));
        }
        if enabled.contains(MoveType::RelocatePostIf) {
            moves.extend(calc.relocate_post_if(&candidates, &targets));
        }
        if enabled.contains(MoveType::RelocatePreIf) {
            moves.extend(calc.relocate_pre_if(&candidates, &targets));
        }
        if enabled.contains(MoveType::RelocateAtRouteBoundary) {
            moves.extend(calc.relocate_before_dummy(&candidates, &targets));
        }

        moves.sort_by(|a, b| a.delta.total_cmp(&b.delta));
        moves
    }
}
