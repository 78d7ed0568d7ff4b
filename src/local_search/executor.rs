//! In-place application of moves.
//!
//! Positions are always resolved from arc identity at apply time. A move
//! whose arcs are no longer where it expects them is a contract failure and
//! is reported as [`SearchError::InconsistentMove`].

use crate::boundary::BoundaryModel;
use crate::encoding::{GiantRoute, PositionMap, Slot};
use crate::error::{Result, SearchError};
use crate::moves::{Insertion, Move, MoveKind, Relocation};
use crate::problem::{ArcId, Problem};
use crate::solution::Solution;

pub struct MoveExecutor<'a, B: BoundaryModel> {
    problem: &'a Problem,
    model: &'a B,
}

impl<'a, B: BoundaryModel> MoveExecutor<'a, B> {
    pub fn new(problem: &'a Problem, model: &'a B) -> Self {
        MoveExecutor { problem, model }
    }

    /// Apply `mv` to `solution` and bring `giant` up to date.
    pub fn apply(&self, mv: &Move, solution: &mut Solution, giant: &mut GiantRoute) -> Result<()> {
        match &mv.kind {
            MoveKind::Combo { first, second } => {
                // The insertion that breaks capacity goes first.
                self.apply(first, solution, giant)?;
                self.apply(second, solution, giant)
            }
            MoveKind::Cross { a, b } => self.apply_cross(*a, *b, solution, giant),
            MoveKind::CrossAtRouteBoundary { route_first, b } => {
                self.apply_cross_at_boundary(*route_first, *b, solution, giant)
            }
            MoveKind::DoubleCross { cuts } => self.apply_double_cross(cuts, solution, giant),
            _ => self.apply_charged(mv, solution, giant),
        }
    }

    fn locate(&self, solution: &Solution, positions: &PositionMap, arc: ArcId) -> Result<Slot> {
        positions
            .locate(solution, arc)
            .ok_or_else(|| SearchError::inconsistent(format!("arc {arc} is not scheduled")))
    }

    /// Relocates, exchanges and flips: scalars are updated from the charges.
    fn apply_charged(&self, mv: &Move, solution: &mut Solution, giant: &mut GiantRoute) -> Result<()> {
        // Resolve every anchor before anything moves.
        let mut route_charges = Vec::with_capacity(mv.route_costs.len());
        for charge in &mv.route_costs {
            route_charges.push((self.locate(solution, &giant.positions, charge.anchor)?, charge.amount));
        }
        let mut load_charges = Vec::with_capacity(mv.trip_loads.len());
        for charge in &mv.trip_loads {
            load_charges.push((self.locate(solution, &giant.positions, charge.anchor)?, charge.amount));
        }

        let mut touched: Vec<usize> = Vec::with_capacity(2);
        match &mv.kind {
            MoveKind::Relocate(r)
            | MoveKind::RelocatePostIf(r)
            | MoveKind::RelocatePreIf(r)
            | MoveKind::RelocateAtRouteBoundary(r) => {
                self.relocate(r, solution, &giant.positions, &mut touched)?
            }
            MoveKind::DoubleRelocate {
                first,
                second,
                target,
            } => self.double_relocate(*first, *second, *target, solution, &giant.positions, &mut touched)?,
            MoveKind::Exchange {
                a,
                a_placed,
                b,
                b_placed,
            } => {
                let sa = self.locate(solution, &giant.positions, *a)?;
                let sb = self.locate(solution, &giant.positions, *b)?;
                solution.routes[sa.route].trips[sa.trip].arcs[sa.offset] = *b_placed;
                solution.routes[sb.route].trips[sb.trip].arcs[sb.offset] = *a_placed;
                touched.extend([sa.route, sb.route]);
            }
            MoveKind::Flip { arc, placed } => {
                let slot = self.locate(solution, &giant.positions, *arc)?;
                solution.routes[slot.route].trips[slot.trip].arcs[slot.offset] = *placed;
                touched.push(slot.route);
            }
            other => {
                return Err(SearchError::inconsistent(format!(
                    "{:?} is not a charge-based move",
                    other
                )))
            }
        }

        for (slot, amount) in load_charges {
            solution.routes[slot.route].trips[slot.trip].load += amount;
        }
        for (slot, amount) in route_charges {
            solution.routes[slot.route].cost += amount;
            solution.cost += amount;
        }

        self.finish(solution, giant, touched, false);
        Ok(())
    }

    fn relocate(
        &self,
        relocation: &Relocation,
        solution: &mut Solution,
        positions: &PositionMap,
        touched: &mut Vec<usize>,
    ) -> Result<()> {
        let from = self.locate(solution, positions, relocation.arc)?;
        let anchor = self.locate(solution, positions, relocation.target.anchor())?;

        solution.routes[from.route].trips[from.trip].arcs.remove(from.offset);
        self.insert(solution, anchor, relocation.target, &[relocation.placed])?;

        touched.extend([from.route, anchor.route]);
        Ok(())
    }

    fn double_relocate(
        &self,
        first: ArcId,
        second: ArcId,
        target: Insertion,
        solution: &mut Solution,
        positions: &PositionMap,
        touched: &mut Vec<usize>,
    ) -> Result<()> {
        let from = self.locate(solution, positions, first)?;
        let next = self.locate(solution, positions, second)?;
        if next.route != from.route || next.trip != from.trip || next.offset != from.offset + 1 {
            return Err(SearchError::inconsistent(format!(
                "arcs {first} and {second} are not consecutive"
            )));
        }
        let anchor = self.locate(solution, positions, target.anchor())?;

        solution.routes[from.route].trips[from.trip]
            .arcs
            .drain(from.offset..from.offset + 2);
        self.insert(solution, anchor, target, &[first, second])?;

        touched.extend([from.route, anchor.route]);
        Ok(())
    }

    // The anchor's trip may have shrunk by a removal in front of it, so the
    // offset is looked up again.
    fn insert(
        &self,
        solution: &mut Solution,
        anchor: Slot,
        target: Insertion,
        chain: &[ArcId],
    ) -> Result<()> {
        let arcs = &mut solution.routes[anchor.route].trips[anchor.trip].arcs;
        let offset = arcs
            .iter()
            .position(|&a| a == target.anchor())
            .ok_or_else(|| {
                SearchError::inconsistent(format!("anchor {} vanished", target.anchor()))
            })?;
        let at = match target {
            Insertion::Before(_) => offset,
            Insertion::TripEnd(_) => {
                if offset + 1 != arcs.len() {
                    return Err(SearchError::inconsistent(format!(
                        "anchor {} no longer ends its trip",
                        target.anchor()
                    )));
                }
                offset + 1
            }
        };
        arcs.splice(at..at, chain.iter().copied());
        Ok(())
    }

    fn apply_cross(&self, a: ArcId, b: ArcId, solution: &mut Solution, giant: &mut GiantRoute) -> Result<()> {
        let sa = self.locate(solution, &giant.positions, a)?;
        let sb = self.locate(solution, &giant.positions, b)?;
        if sa.route == sb.route {
            return Err(SearchError::inconsistent(format!(
                "cross cuts {a} and {b} share route {}",
                sa.route
            )));
        }

        let tail_a = solution.routes[sa.route].split_off_after(sa.trip, sa.offset);
        let tail_b = solution.routes[sb.route].split_off_after(sb.trip, sb.offset);
        solution.routes[sa.route].append_tail(tail_b);
        solution.routes[sb.route].append_tail(tail_a);

        self.finish(solution, giant, vec![sa.route, sb.route], true);
        Ok(())
    }

    fn apply_cross_at_boundary(
        &self,
        route_first: ArcId,
        b: ArcId,
        solution: &mut Solution,
        giant: &mut GiantRoute,
    ) -> Result<()> {
        let sa = self.locate(solution, &giant.positions, route_first)?;
        let sb = self.locate(solution, &giant.positions, b)?;
        if sa.trip != 0 || sa.offset != 0 || sa.route == sb.route {
            return Err(SearchError::inconsistent(format!(
                "{route_first} no longer starts a route apart from {b}"
            )));
        }

        let tail_a = solution.routes[sa.route].split_off_all();
        let tail_b = solution.routes[sb.route].split_off_after(sb.trip, sb.offset);
        solution.routes[sa.route].append_tail(tail_b);
        solution.routes[sb.route].append_tail(tail_a);

        self.finish(solution, giant, vec![sa.route, sb.route], true);
        Ok(())
    }

    /// Reorder `S0 S1 S2 S3 S4` into `S0 S3 S2 S1 S4`, cutting after each arc of `cuts`.
    fn apply_double_cross(
        &self,
        cuts: &[ArcId; 4],
        solution: &mut Solution,
        giant: &mut GiantRoute,
    ) -> Result<()> {
        let mut slots = [Slot {
            route: 0,
            trip: 0,
            offset: 0,
        }; 4];
        for (slot, &cut) in slots.iter_mut().zip(cuts) {
            *slot = self.locate(solution, &giant.positions, cut)?;
        }
        let [p1, p2, p3, p4] = slots;
        let same_trip = slots
            .iter()
            .all(|s| s.route == p1.route && s.trip == p1.trip);
        if !same_trip || !(p1.offset < p2.offset && p2.offset < p3.offset && p3.offset < p4.offset) {
            return Err(SearchError::inconsistent(format!(
                "double cross cuts {cuts:?} are not ordered within one trip"
            )));
        }

        let arcs = &mut solution.routes[p1.route].trips[p1.trip].arcs;
        let (o1, o2, o3, o4) = (p1.offset + 1, p2.offset + 1, p3.offset + 1, p4.offset + 1);
        let mut reordered = Vec::with_capacity(arcs.len());
        reordered.extend_from_slice(&arcs[..o1]);
        reordered.extend_from_slice(&arcs[o3..o4]);
        reordered.extend_from_slice(&arcs[o2..o3]);
        reordered.extend_from_slice(&arcs[o1..o2]);
        reordered.extend_from_slice(&arcs[o4..]);
        *arcs = reordered;

        self.finish(solution, giant, vec![p1.route], true);
        Ok(())
    }

    /// Tidy the touched routes and refresh the encoding.
    ///
    /// With `recompute`, routes are re-evaluated from scratch and the total
    /// cost follows the difference; otherwise only their structure and IFs
    /// are refreshed, the scalars having been charged already.
    fn finish(&self, solution: &mut Solution, giant: &mut GiantRoute, mut touched: Vec<usize>, recompute: bool) {
        touched.sort_unstable();
        touched.dedup();

        for &r in &touched {
            let route = &mut solution.routes[r];
            if recompute {
                let before = route.cost;
                route.recompute(self.problem, self.model);
                solution.cost += route.cost - before;
            } else {
                route.trips.retain(|trip| !trip.is_empty());
                route.refresh_facilities(self.problem, self.model);
                route.invalidate();
            }
        }

        let emptied: Vec<usize> = touched
            .iter()
            .copied()
            .filter(|&r| solution.routes[r].is_empty())
            .collect();

        if emptied.is_empty() {
            for &r in &touched {
                giant.patch_route(solution, self.problem, self.model, r);
            }
            return;
        }

        for &r in emptied.iter().rev() {
            let residual = solution.routes.remove(r).cost;
            solution.cost -= residual;
        }
        giant.rebuild(solution, self.problem, self.model);
    }
}
