//! Reporting helpers for solutions and search runs.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::problem::Problem;
use crate::solution::Solution;
use crate::tabu::{TabuReport, TabuTermination};

/// Format a duration as hours, minutes, and seconds.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}h {:02}m {:02}s", hours, minutes, seconds)
}

/// Human-readable listing of every route, trip and IF visit.
pub struct SolutionReport<'a> {
    pub solution: &'a Solution,
    pub problem: &'a Problem,
}

impl fmt::Display for SolutionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (solution, problem) = (self.solution, self.problem);

        writeln!(f, "Solution for instance: {}", problem.name)?;
        writeln!(f, "Total Cost: {:.2}", solution.cost)?;
        writeln!(f, "Number of Routes: {}", solution.vehicles())?;
        writeln!(f)?;

        for (i, route) in solution.routes.iter().enumerate() {
            writeln!(f, "Route #{}: cost {:.2}", i + 1, route.cost)?;

            // Later trips start at the IF that closed the previous one
            let mut origin = problem.depot.to_string();
            for (k, trip) in route.trips.iter().enumerate() {
                write!(f, "  Trip {}: {}", k + 1, origin)?;
                for arc in &trip.arcs {
                    write!(f, " -> {}", arc)?;
                }
                if let Some(facility) = trip.facility {
                    write!(f, " -> IF {}", facility)?;
                    origin = format!("IF {}", facility);
                }
                writeln!(f, "  (load {:.2} / {:.2})", trip.load, problem.capacity)?;
            }
            writeln!(f, "  -> {}", problem.depot)?;
        }

        Ok(())
    }
}

/// Save a solution report to a file.
pub fn save_solution<P: AsRef<Path>>(solution: &Solution, problem: &Problem, path: P) -> Result<()> {
    fs::write(path, SolutionReport { solution, problem }.to_string())?;
    Ok(())
}

/// Total load above capacity, summed over trips.
pub fn calculate_excess_load(solution: &Solution, problem: &Problem) -> f64 {
    solution
        .routes
        .iter()
        .flat_map(|route| &route.trips)
        .map(|trip| (trip.load - problem.capacity).max(0.0))
        .sum()
}

/// Counters of a tabu run.
#[derive(Debug, Clone)]
pub struct SearchStatistics {
    pub passes: usize,
    pub moves_applied: usize,
    pub improvements: usize,
    pub runtime: Duration,
    pub best_solution_cost: f64,
    pub best_solution_routes: usize,
    pub termination: TabuTermination,
}

impl From<&TabuReport> for SearchStatistics {
    fn from(report: &TabuReport) -> Self {
        SearchStatistics {
            passes: report.passes,
            moves_applied: report.moves_applied,
            improvements: report.improvements,
            runtime: report.run_time,
            best_solution_cost: report.best.cost,
            best_solution_routes: report.best.vehicles(),
            termination: report.termination,
        }
    }
}

impl SearchStatistics {
    /// Format the statistics as a string.
    pub fn format(&self) -> String {
        format!(
            "Search Statistics:
- Passes: {}
- Moves Applied: {}
- Improvements: {}
- Runtime: {}
- Best Solution Cost: {:.2}
- Best Solution Routes: {}
- Stopped By: {:?}",
            self.passes,
            self.moves_applied,
            self.improvements,
            format_duration(self.runtime),
            self.best_solution_cost,
            self.best_solution_routes,
            self.termination
        )
    }
}
