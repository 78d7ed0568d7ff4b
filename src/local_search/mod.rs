//! Local search engine for the MCARP / MCARPTIF.
//!
//! One compound pass enumerates every enabled neighbourhood against the
//! current solution, sorts the candidates by delta and applies, in order,
//! each candidate that is still applicable and feasible. When a pass applies
//! nothing, the repair search tries double crosses and load-repairing combos.
//! `improve` repeats passes until none of them applies a move.

pub mod compound;
pub mod cross;
pub mod exchange;
pub mod executor;
pub mod feasibility;
pub mod relocate;
pub mod repair;
pub mod utils;

use crate::boundary::{BoundaryModel, Link};
use crate::config::SearchConfig;
use crate::encoding::{scheduled_at, ArcSet, BoundarySets, GiantRoute, Slot};
use crate::error::{Result, SearchError};
use crate::moves::{Move, MoveSet, MoveType};
use crate::problem::{ArcId, Problem};
use crate::solution::Solution;
use crate::validation::validate;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use self::compound::CompoundMoveTracker;
use self::cross::CrossScope;
use self::executor::MoveExecutor;
use self::feasibility::{FeasibilityChecker, MoveBook, Verdict};
use self::utils::extend_footprint;

/// What the engine is currently doing, for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Plain descent to a local optimum
    Descent,
    /// Unrestricted pass triggered by aspiration
    Aspiration,
    /// Pass restricted to non-tabu moves
    TabuFiltered,
}

/// Hook for progress reporting.
pub trait SearchObserver {
    fn move_applied(&mut self, _phase: SearchPhase, _mv: &Move, _solution: &Solution) {}

    fn pass_finished(
        &mut self,
        _phase: SearchPhase,
        _pass: usize,
        _applied: usize,
        _solution: &Solution,
    ) {
    }

    fn new_incumbent(&mut self, _iteration: usize, _solution: &Solution) {}
}

/// Forwards progress to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SearchObserver for LogObserver {
    fn move_applied(&mut self, phase: SearchPhase, mv: &Move, solution: &Solution) {
        log::trace!("{:?}: applied {} -> cost {:.3}", phase, mv, solution.cost);
    }

    fn pass_finished(&mut self, phase: SearchPhase, pass: usize, applied: usize, solution: &Solution) {
        log::debug!(
            "{:?} pass {}: {} move(s), cost {:.3}, {} vehicle(s)",
            phase,
            pass,
            applied,
            solution.cost,
            solution.vehicles()
        );
    }

    fn new_incumbent(&mut self, iteration: usize, solution: &Solution) {
        log::info!(
            "Iteration {}: new best with {} vehicle(s), cost {:.3}",
            iteration,
            solution.vehicles(),
            solution.cost
        );
    }
}

/// Cooperative cancellation, checked once per compound pass.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-run state passed explicitly through the engine.
pub struct SearchContext<'o> {
    pub phase: SearchPhase,
    pub observer: &'o mut dyn SearchObserver,
    pub cancel: CancelToken,
}

impl<'o> SearchContext<'o> {
    pub fn new(observer: &'o mut dyn SearchObserver) -> Self {
        SearchContext {
            phase: SearchPhase::Descent,
            observer,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Enumerates candidate moves against a fixed solution.
pub struct MoveCostCalculator<'a, B: BoundaryModel> {
    pub(crate) problem: &'a Problem,
    pub(crate) model: &'a B,
    pub(crate) solution: &'a Solution,
    pub(crate) giant: &'a GiantRoute,
    /// Only moves with a delta strictly below this are returned
    pub(crate) threshold: f64,
    pub(crate) neighbor_fraction: f64,
}

impl<'a, B: BoundaryModel> MoveCostCalculator<'a, B> {
    pub fn new(
        problem: &'a Problem,
        model: &'a B,
        solution: &'a Solution,
        giant: &'a GiantRoute,
    ) -> Self {
        MoveCostCalculator {
            problem,
            model,
            solution,
            giant,
            threshold: -1e-6,
            neighbor_fraction: 1.0,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_neighbor_fraction(mut self, fraction: f64) -> Self {
        self.neighbor_fraction = fraction;
        self
    }

    /// Every enabled neighbourhood, sorted by increasing delta.
    pub fn all_moves(&self, enabled: &MoveSet, candidates: &[ArcId], targets: &ArcSet) -> Vec<Move> {
        let mut moves = Vec::new();

        if enabled.contains(MoveType::Relocate) {
            moves.extend(self.relocate(candidates, targets));
        }
        if enabled.contains(MoveType::RelocatePostIf) {
            moves.extend(self.relocate_post_if(candidates, targets));
        }
        if enabled.contains(MoveType::RelocatePreIf) {
            moves.extend(self.relocate_pre_if(candidates, targets));
        }
        if enabled.contains(MoveType::RelocateAtRouteBoundary) {
            moves.extend(self.relocate_before_dummy(candidates, targets));
        }
        if enabled.contains(MoveType::DoubleRelocate) {
            moves.extend(self.double_relocate(candidates, targets));
        }
        if enabled.contains(MoveType::Exchange) {
            moves.extend(self.exchange(candidates, targets));
        }
        if enabled.contains(MoveType::Flip) {
            moves.extend(self.flip(candidates));
        }

        let scope = CrossScope {
            between_routes: enabled.contains(MoveType::Cross),
            within_trip: enabled.contains(MoveType::DoubleCross),
        };
        if scope.between_routes || scope.within_trip {
            moves.extend(self.cross(candidates, targets, scope));
        }
        if enabled.contains(MoveType::CrossAtRouteBoundary) {
            moves.extend(self.cross_at_dummy(candidates, targets));
        }

        moves.sort_by(|a, b| a.delta.total_cmp(&b.delta));
        moves
    }

    /// Slot of `arc`, if that orientation is scheduled.
    #[inline]
    pub(crate) fn slot_of(&self, arc: ArcId) -> Option<Slot> {
        self.giant.positions.locate(self.solution, arc)
    }

    #[inline]
    pub(crate) fn predecessor(&self, slot: Slot) -> Link {
        self.solution.routes[slot.route].predecessor(slot.trip, slot.offset, self.problem)
    }

    #[inline]
    pub(crate) fn successor(&self, slot: Slot) -> Link {
        self.solution.routes[slot.route].successor(slot.trip, slot.offset, self.problem)
    }

    /// Scheduled arcs close to any of `arcs`, each reported once.
    ///
    /// Neighbour lists hold both orientations of an edge; whichever one is
    /// scheduled is returned.
    pub(crate) fn nearby(&self, arcs: &[ArcId]) -> Vec<(ArcId, Slot)> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for &arc in arcs {
            let limit = self.problem.neighbor_limit(arc, self.neighbor_fraction);
            for &v in &self.problem.neighbors(arc)[..limit] {
                let slot = match self.giant.positions.get(v) {
                    Some(slot) => slot,
                    None => continue,
                };
                if let Some(x) = scheduled_at(self.solution, slot) {
                    if seen.insert(x) {
                        found.push((x, slot));
                    }
                }
            }
        }

        found
    }

    /// Every scheduled arc with its slot, in route order.
    pub(crate) fn scheduled(&self) -> impl Iterator<Item = (ArcId, Slot)> + 'a {
        let solution: &'a Solution = self.solution;
        solution
            .routes
            .iter()
            .enumerate()
            .flat_map(|(route, r)| {
                r.trips.iter().enumerate().flat_map(move |(trip, t)| {
                    t.arcs
                        .iter()
                        .enumerate()
                        .map(move |(offset, &arc)| (arc, Slot { route, trip, offset }))
                })
            })
    }

    pub(crate) fn footprint(&self, arcs: impl IntoIterator<Item = ArcId>) -> Vec<ArcId> {
        let mut footprint = Vec::new();
        extend_footprint(&mut footprint, arcs, self.problem);
        footprint
    }
}

/// Rules for one compound pass.
pub struct PassRules<'r> {
    /// Delta bound for the first applied move; later ones must improve
    pub first_threshold: f64,
    /// Moves rejected here are skipped (tabu status)
    pub admissible: &'r dyn Fn(&Move) -> bool,
}

/// Summary of an `improve` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImproveReport {
    pub passes: usize,
    pub moves_applied: usize,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub initial_vehicles: usize,
    pub final_vehicles: usize,
    pub cancelled: bool,
}

/// Drives compound passes to a local optimum.
pub struct LocalSearch<B: BoundaryModel> {
    model: B,
    config: SearchConfig,
}

impl<B: BoundaryModel> LocalSearch<B> {
    /// Create a new local search instance.
    pub fn new(model: B, config: SearchConfig) -> Self {
        LocalSearch { model, config }
    }

    pub fn model(&self) -> &B {
        &self.model
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Set the improvement threshold and the share of each neighbour list to scan.
    pub fn set_thresholds(&mut self, cost_threshold: f64, neighbor_fraction: f64) {
        self.config.cost_threshold = cost_threshold;
        self.config.neighbor_fraction = neighbor_fraction.clamp(0.0, 1.0);
    }

    pub fn set_moves_enabled(&mut self, moves: MoveSet) {
        self.config.moves = moves;
    }

    /// Run compound passes until a local optimum is reached, logging progress.
    pub fn improve(&self, solution: &mut Solution, problem: &Problem) -> Result<ImproveReport> {
        let mut observer = LogObserver;
        let mut ctx = SearchContext::new(&mut observer);
        self.improve_with(solution, problem, &mut ctx)
    }

    /// Same as [`LocalSearch::improve`] with an explicit context.
    pub fn improve_with(
        &self,
        solution: &mut Solution,
        problem: &Problem,
        ctx: &mut SearchContext<'_>,
    ) -> Result<ImproveReport> {
        self.model.check_instance(problem)?;
        let mut report = ImproveReport {
            passes: 0,
            moves_applied: 0,
            initial_cost: solution.cost,
            final_cost: solution.cost,
            initial_vehicles: solution.vehicles(),
            final_vehicles: solution.vehicles(),
            cancelled: false,
        };
        let mut giant = GiantRoute::encode(solution, problem, &self.model);
        let any = |_: &Move| true;
        let rules = PassRules {
            first_threshold: self.config.cost_threshold,
            admissible: &any,
        };

        loop {
            if ctx.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if self.config.max_passes.map_or(false, |max| report.passes >= max) {
                break;
            }

            let applied = self.compound_pass(solution, &mut giant, problem, ctx, &rules)?;
            report.passes += 1;
            report.moves_applied += applied.len();
            ctx.observer
                .pass_finished(ctx.phase, report.passes, applied.len(), solution);

            if applied.is_empty() {
                break;
            }
        }

        report.final_cost = solution.cost;
        report.final_vehicles = solution.vehicles();
        Ok(report)
    }

    /// Candidate moves for the whole solution under `threshold`.
    pub(crate) fn enumerate(
        &self,
        solution: &Solution,
        giant: &GiantRoute,
        problem: &Problem,
        threshold: f64,
    ) -> Vec<Move> {
        let candidates: Vec<ArcId> = solution.routes.iter().flat_map(|r| r.arcs()).collect();
        let targets = ArcSet::full(problem.arc_count());
        MoveCostCalculator::new(problem, &self.model, solution, giant)
            .with_threshold(threshold)
            .with_neighbor_fraction(self.config.neighbor_fraction)
            .all_moves(&self.config.moves, &candidates, &targets)
    }

    /// One compound pass. Returns the moves applied, in order.
    pub fn compound_pass(
        &self,
        solution: &mut Solution,
        giant: &mut GiantRoute,
        problem: &Problem,
        ctx: &mut SearchContext<'_>,
        rules: &PassRules<'_>,
    ) -> Result<Vec<Move>> {
        giant.roles = BoundarySets::classify(solution, problem);
        let threshold = rules.first_threshold.max(self.config.cost_threshold);
        let moves = self.enumerate(solution, giant, problem, threshold);

        let checker = FeasibilityChecker::new(problem, &self.model);
        let mut tracker = CompoundMoveTracker::new(problem.arc_count());
        let mut book = MoveBook::default();
        let mut applied: Vec<Move> = Vec::new();

        for mv in &moves {
            let limit = if applied.is_empty() {
                rules.first_threshold
            } else {
                self.config.cost_threshold
            };
            if !tracker.is_still_applicable(mv) || !(rules.admissible)(mv) {
                continue;
            }
            let verdict = checker.check_against(mv, limit, solution, &giant.positions, &mut book);
            if verdict != Verdict::Feasible || !(mv.delta < limit) {
                continue;
            }

            self.execute(mv, solution, giant, problem, ctx)?;
            tracker.record_influence(mv, problem);
            applied.push(mv.clone());

            if !self.config.compound_moves {
                break;
            }
        }

        log::trace!(
            "{:?}: set aside {} over load, {} over duration, {} above threshold, {} same-trip crosses",
            ctx.phase,
            book.infeasible_load.len(),
            book.infeasible_duration.len(),
            book.exceeds_threshold.len(),
            book.deferred_cross.len()
        );

        if applied.is_empty() && self.config.repair_search {
            applied = self.repair(solution, giant, problem, ctx, &mut tracker, &book, rules)?;
        }

        Ok(applied)
    }

    /// Apply one move, notify the observer and optionally self-check.
    pub(crate) fn execute(
        &self,
        mv: &Move,
        solution: &mut Solution,
        giant: &mut GiantRoute,
        problem: &Problem,
        ctx: &mut SearchContext<'_>,
    ) -> Result<()> {
        MoveExecutor::new(problem, &self.model).apply(mv, solution, giant)?;
        ctx.observer.move_applied(ctx.phase, mv, solution);

        if self.config.validate_moves {
            if let Err(violations) = validate(solution, problem, &self.model) {
                return Err(SearchError::InvariantBroken {
                    context: mv.to_string(),
                    violations,
                    dump: serde_json::to_string_pretty(&(mv, &*solution))?,
                });
            }
        }

        Ok(())
    }

    /// Sum of the deltas of the best chain of compatible, feasible improving
    /// moves, without applying any of them.
    pub fn estimate_chain(&self, solution: &mut Solution, giant: &mut GiantRoute, problem: &Problem) -> f64 {
        giant.roles = BoundarySets::classify(solution, problem);
        let moves = self.enumerate(solution, giant, problem, self.config.cost_threshold);
        let checker = FeasibilityChecker::new(problem, &self.model);
        let mut scratch = CompoundMoveTracker::new(problem.arc_count());
        let mut chain = 0.0;

        for mv in &moves {
            if !scratch.is_still_applicable(mv) {
                continue;
            }
            if checker.assess(mv, solution, &giant.positions) == Verdict::Feasible {
                chain += mv.delta;
                scratch.record_influence(mv, problem);
                if !self.config.compound_moves {
                    break;
                }
            }
        }

        chain
    }
}
