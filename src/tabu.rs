//! Tabu search on top of the local search engine.
//!
//! Each iteration is one compound pass. If the best chain of improving moves
//! could produce a new incumbent, the pass ignores tabu status (aspiration);
//! otherwise the best admissible move is applied even if it worsens the
//! solution, followed by any compatible improving admissible moves. Moved
//! arcs stay tabu for a randomly sampled tenure.

use crate::boundary::BoundaryModel;
use crate::config::{SearchConfig, TabuClock};
use crate::encoding::GiantRoute;
use crate::error::Result;
use crate::local_search::{LocalSearch, LogObserver, PassRules, SearchContext, SearchPhase};
use crate::moves::Move;
use crate::problem::{ArcId, Problem};
use crate::solution::{Solution, EPSILON};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

/// Where the search currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabuPhase {
    Searching,
    AspirationCheck,
    TabuFiltered,
    /// A budget ran out or no admissible move was left
    Stalled,
    /// Cancelled from outside
    Done,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabuTermination {
    NoImprovement,
    TimeLimit,
    MoveLimit,
    NoAdmissibleMove,
    Cancelled,
}

/// Tabu expiry per arc, on both clocks.
#[derive(Debug, Clone)]
pub struct TabuState {
    forbidden_until_move: Vec<usize>,
    forbidden_until_pass: Vec<usize>,
    clock: TabuClock,
    /// Moves applied so far
    pub moves: usize,
    /// Compound passes run so far
    pub passes: usize,
}

impl TabuState {
    pub fn new(arc_count: usize, clock: TabuClock) -> Self {
        TabuState {
            forbidden_until_move: vec![0; arc_count],
            forbidden_until_pass: vec![0; arc_count],
            clock,
            moves: 0,
            passes: 0,
        }
    }

    pub fn is_tabu(&self, arc: ArcId) -> bool {
        match self.clock {
            TabuClock::Moves => self.forbidden_until_move[arc.index()] > self.moves,
            TabuClock::Passes => self.forbidden_until_pass[arc.index()] > self.passes,
        }
    }

    /// A move is admissible when none of the arcs it moves is tabu.
    pub fn is_admissible(&self, mv: &Move) -> bool {
        mv.moved_arcs().into_iter().all(|arc| !self.is_tabu(arc))
    }

    /// Forbid moving `arc`, in either orientation, for `tenure` ticks.
    pub fn make_tabu(&mut self, arc: ArcId, tenure: usize, problem: &Problem) {
        for a in std::iter::once(arc).chain(problem.inverse(arc)) {
            self.forbidden_until_move[a.index()] = self.moves + tenure;
            self.forbidden_until_pass[a.index()] = self.passes + tenure;
        }
    }
}

/// Outcome of a tabu run.
#[derive(Debug, Clone)]
pub struct TabuReport {
    /// Best solution found
    pub best: Solution,
    pub passes: usize,
    pub moves_applied: usize,
    /// Number of times the incumbent was replaced
    pub improvements: usize,
    pub termination: TabuTermination,
    pub run_time: Duration,
}

/// Tabu search driving a [`LocalSearch`].
pub struct TabuSearch<B: BoundaryModel> {
    local_search: LocalSearch<B>,
    rng: ChaCha8Rng,
    phase: TabuPhase,
}

impl<B: BoundaryModel> TabuSearch<B> {
    /// Create a new tabu search; the tenure generator is seeded from the config.
    pub fn new(model: B, config: SearchConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.tabu.seed);
        TabuSearch {
            local_search: LocalSearch::new(model, config),
            rng,
            phase: TabuPhase::Searching,
        }
    }

    pub fn local_search(&self) -> &LocalSearch<B> {
        &self.local_search
    }

    pub fn phase(&self) -> TabuPhase {
        self.phase
    }

    /// Run from `initial`, logging progress. `initial` ends as the last
    /// visited solution; the report holds the best one.
    pub fn run(&mut self, initial: &mut Solution, problem: &Problem) -> Result<TabuReport> {
        let mut observer = LogObserver;
        let mut ctx = SearchContext::new(&mut observer);
        self.run_with(initial, problem, &mut ctx)
    }

    /// Same as [`TabuSearch::run`] with an explicit context.
    pub fn run_with(
        &mut self,
        current: &mut Solution,
        problem: &Problem,
        ctx: &mut SearchContext<'_>,
    ) -> Result<TabuReport> {
        self.local_search.model().check_instance(problem)?;
        let start = Instant::now();
        let tabu = self.local_search.config().tabu.clone();
        let cost_threshold = self.local_search.config().cost_threshold;

        let mut giant = GiantRoute::encode(current, problem, self.local_search.model());
        let mut state = TabuState::new(problem.arc_count(), tabu.clock);
        let mut best = current.clone();
        let mut improvements = 0;
        let mut without_improvement = 0;
        self.phase = TabuPhase::Searching;

        let termination = loop {
            if let Some(reason) = self.should_terminate(ctx, start, &state, without_improvement) {
                break reason;
            }

            let mut applied = Vec::new();
            if tabu.aspiration {
                self.phase = TabuPhase::AspirationCheck;
                let chain = self
                    .local_search
                    .estimate_chain(current, &mut giant, problem);
                if chain < 0.0
                    && current.vehicles() <= best.vehicles()
                    && current.cost + chain < best.cost - EPSILON
                {
                    ctx.phase = SearchPhase::Aspiration;
                    let any = |_: &Move| true;
                    let rules = PassRules {
                        first_threshold: cost_threshold,
                        admissible: &any,
                    };
                    applied = self
                        .local_search
                        .compound_pass(current, &mut giant, problem, ctx, &rules)?;
                }
            }

            if applied.is_empty() {
                self.phase = TabuPhase::TabuFiltered;
                ctx.phase = SearchPhase::TabuFiltered;
                let admissible = |mv: &Move| state.is_admissible(mv);
                let rules = PassRules {
                    first_threshold: tabu.admission_threshold.unwrap_or(f64::INFINITY),
                    admissible: &admissible,
                };
                applied = self
                    .local_search
                    .compound_pass(current, &mut giant, problem, ctx, &rules)?;
            }

            if applied.is_empty() {
                break TabuTermination::NoAdmissibleMove;
            }

            for mv in &applied {
                let tenure = self.sample_tenure(tabu.min_tenure, tabu.max_tenure);
                for arc in mv.moved_arcs() {
                    state.make_tabu(arc, tenure, problem);
                }
                state.moves += 1;
            }
            state.passes += 1;
            ctx.observer
                .pass_finished(ctx.phase, state.passes, applied.len(), current);

            if current.is_better_than(&best) {
                best = current.clone();
                improvements += 1;
                without_improvement = 0;
                ctx.observer.new_incumbent(state.passes, &best);
            } else {
                without_improvement += 1;
            }
            self.phase = TabuPhase::Searching;
        };

        self.phase = match termination {
            TabuTermination::Cancelled => TabuPhase::Done,
            _ => TabuPhase::Stalled,
        };
        log::debug!(
            "Tabu search stopped after {} passes: {:?}",
            state.passes,
            termination
        );

        Ok(TabuReport {
            best,
            passes: state.passes,
            moves_applied: state.moves,
            improvements,
            termination,
            run_time: start.elapsed(),
        })
    }

    fn sample_tenure(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            min
        } else {
            self.rng.gen_range(min..=max)
        }
    }

    /// Check whether any stopping condition holds.
    fn should_terminate(
        &self,
        ctx: &SearchContext<'_>,
        start: Instant,
        state: &TabuState,
        without_improvement: usize,
    ) -> Option<TabuTermination> {
        let tabu = &self.local_search.config().tabu;

        if ctx.cancel.is_cancelled() {
            return Some(TabuTermination::Cancelled);
        }
        if without_improvement >= tabu.max_passes_without_improvement {
            return Some(TabuTermination::NoImprovement);
        }
        if let Some(limit) = tabu.time_limit {
            if start.elapsed() >= limit {
                return Some(TabuTermination::TimeLimit);
            }
        }
        if let Some(max) = tabu.max_moves {
            if state.moves >= max {
                return Some(TabuTermination::MoveLimit);
            }
        }

        None
    }
}
