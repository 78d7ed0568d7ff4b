//! Configuration parameters for the local search and the tabu wrapper.

use crate::error::Result;
use crate::moves::{MoveSet, MoveType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which counter drives tabu tenures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabuClock {
    /// Count every applied move
    Moves,
    /// Count compound passes
    Passes,
}

/// Settings for the tabu search wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabuConfig {
    /// Smallest tabu tenure
    pub min_tenure: usize,
    /// Largest tabu tenure
    pub max_tenure: usize,
    pub clock: TabuClock,
    /// Stop after this many passes without a new incumbent
    pub max_passes_without_improvement: usize,
    /// Optional wall-clock budget
    pub time_limit: Option<Duration>,
    /// Optional budget on applied moves
    pub max_moves: Option<usize>,
    /// Whether an improving chain may override tabu status
    pub aspiration: bool,
    /// Upper bound on the delta of a non-improving move; `None` accepts any
    pub admission_threshold: Option<f64>,
    /// Seed for tenure sampling
    pub seed: u64,
}

impl Default for TabuConfig {
    fn default() -> Self {
        TabuConfig {
            min_tenure: 5,
            max_tenure: 10,
            clock: TabuClock::Passes,
            max_passes_without_improvement: 50,
            time_limit: None,
            max_moves: None,
            aspiration: true,
            admission_threshold: None,
            seed: 0,
        }
    }
}

impl TabuConfig {
    pub fn new() -> Self {
        TabuConfig::default()
    }

    /// Set the tenure range; the bounds are swapped if given in reverse.
    pub fn with_tenure(mut self, min: usize, max: usize) -> Self {
        self.min_tenure = min.min(max);
        self.max_tenure = min.max(max);
        self
    }

    pub fn with_clock(mut self, clock: TabuClock) -> Self {
        self.clock = clock;
        self
    }

    /// Set the number of passes without a new incumbent before stopping.
    pub fn with_max_passes_without_improvement(mut self, passes: usize) -> Self {
        self.max_passes_without_improvement = passes;
        self
    }

    /// Set the time limit.
    pub fn with_time_limit(mut self, duration: Duration) -> Self {
        self.time_limit = Some(duration);
        self
    }

    /// Set the maximum number of applied moves.
    pub fn with_max_moves(mut self, moves: usize) -> Self {
        self.max_moves = Some(moves);
        self
    }

    pub fn with_aspiration(mut self, aspiration: bool) -> Self {
        self.aspiration = aspiration;
        self
    }

    pub fn with_admission_threshold(mut self, threshold: f64) -> Self {
        self.admission_threshold = Some(threshold);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Settings for the local search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Only moves with a delta strictly below this value are considered
    pub cost_threshold: f64,
    /// Share of each neighbour list that is scanned, in (0, 1]
    pub neighbor_fraction: f64,
    /// Enabled move families
    pub moves: MoveSet,
    /// Apply every compatible move of a pass instead of only the best one
    pub compound_moves: bool,
    /// Run the double-cross and combo searches when a pass stalls
    pub repair_search: bool,
    /// Validate the solution after every applied move
    pub validate_moves: bool,
    /// Optional cap on the number of compound passes per `improve` call
    pub max_passes: Option<usize>,
    pub tabu: TabuConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            cost_threshold: -1e-6,
            neighbor_fraction: 1.0,
            moves: MoveSet::all(),
            compound_moves: true,
            repair_search: true,
            validate_moves: false,
            max_passes: None,
            tabu: TabuConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        SearchConfig::default()
    }

    /// Read a configuration from its JSON form.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the improvement threshold.
    pub fn with_cost_threshold(mut self, threshold: f64) -> Self {
        self.cost_threshold = threshold;
        self
    }

    /// Set the share of each neighbour list to scan.
    pub fn with_neighbor_fraction(mut self, fraction: f64) -> Self {
        self.neighbor_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_moves(mut self, moves: MoveSet) -> Self {
        self.moves = moves;
        self
    }

    /// Disable a single move family.
    pub fn without_move(mut self, move_type: MoveType) -> Self {
        self.moves = self.moves.without(move_type);
        self
    }

    pub fn with_compound_moves(mut self, enabled: bool) -> Self {
        self.compound_moves = enabled;
        self
    }

    pub fn with_repair_search(mut self, enabled: bool) -> Self {
        self.repair_search = enabled;
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_moves = enabled;
        self
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = Some(passes);
        self
    }

    pub fn with_tabu(mut self, tabu: TabuConfig) -> Self {
        self.tabu = tabu;
        self
    }
}
