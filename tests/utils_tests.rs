//! Tests for reports, statistics and configuration files.

mod common;

use common::{create_if_problem, create_swap_problem, matrix_problem, uniform_matrix};
use mcarptif_ls::boundary::{Mcarp, McarpTif};
use mcarptif_ls::config::{SearchConfig, TabuClock, TabuConfig};
use mcarptif_ls::moves::MoveType;
use mcarptif_ls::problem::{ArcData, ArcId};
use mcarptif_ls::solution::Solution;
use mcarptif_ls::tabu::{TabuReport, TabuTermination};
use mcarptif_ls::utils::{
    calculate_excess_load, format_duration, save_solution, SearchStatistics, SolutionReport,
};
use std::time::Duration;

fn ids(raw: &[usize]) -> Vec<ArcId> {
    raw.iter().map(|&i| ArcId(i)).collect()
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_secs(0)), "0h 00m 00s");
    assert_eq!(format_duration(Duration::from_secs(3725)), "1h 02m 05s");
    assert_eq!(format_duration(Duration::from_millis(59_999)), "0h 00m 59s");
}

#[test]
fn test_solution_report_lists_trips() {
    let problem = create_if_problem(None);
    let solution = Solution::from_routes(vec![vec![ids(&[2]), ids(&[3])]], &problem, &McarpTif);
    let report = SolutionReport {
        solution: &solution,
        problem: &problem,
    }
    .to_string();

    let expected = "Solution for instance: TestProblem
Total Cost: 11.00
Number of Routes: 1

Route #1: cost 11.00
  Trip 1: 0 -> 2 -> IF 1  (load 3.00 / 4.00)
  Trip 2: IF 1 -> 3 -> IF 1  (load 3.00 / 4.00)
  -> 0
";
    assert_eq!(report, expected);
}

#[test]
fn test_save_solution() {
    let problem = create_swap_problem();
    let solution = Solution::from_routes(vec![vec![ids(&[2, 1])]], &problem, &Mcarp);
    let path = std::env::temp_dir().join("mcarptif_ls_saved_solution.txt");

    save_solution(&solution, &problem, &path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(contents.contains("Total Cost: 6.00"));
    assert!(contents.contains("  Trip 1: 0 -> 2 -> 1  (load 2.00 / 10.00)"));
}

#[test]
fn test_excess_load() {
    let arcs = vec![
        ArcData::depot(),
        ArcData::task(9.0, 0.0),
        ArcData::task(2.0, 0.0),
    ];
    let problem = matrix_problem(arcs, uniform_matrix(3, 1.0), 10.0, None);

    let split = Solution::from_routes(vec![vec![ids(&[1])], vec![ids(&[2])]], &problem, &Mcarp);
    assert_eq!(calculate_excess_load(&split, &problem), 0.0);

    let merged = Solution::from_routes(vec![vec![ids(&[1, 2])]], &problem, &Mcarp);
    assert!((calculate_excess_load(&merged, &problem) - 1.0).abs() < 1e-9);
}

#[test]
fn test_search_statistics() {
    let problem = create_swap_problem();
    let best = Solution::from_routes(vec![vec![ids(&[2, 1])]], &problem, &Mcarp);
    let report = TabuReport {
        best,
        passes: 12,
        moves_applied: 30,
        improvements: 2,
        termination: TabuTermination::NoImprovement,
        run_time: Duration::from_secs(65),
    };

    let stats = SearchStatistics::from(&report);
    assert_eq!(stats.best_solution_routes, 1);
    assert_eq!(
        stats.format(),
        "Search Statistics:
- Passes: 12
- Moves Applied: 30
- Improvements: 2
- Runtime: 0h 01m 05s
- Best Solution Cost: 6.00
- Best Solution Routes: 1
- Stopped By: NoImprovement"
    );
}

#[test]
fn test_config_json_round_trip() {
    let config = SearchConfig::new()
        .with_cost_threshold(-0.5)
        .with_neighbor_fraction(0.25)
        .without_move(MoveType::Combo)
        .with_compound_moves(false)
        .with_max_passes(40)
        .with_tabu(
            TabuConfig::new()
                .with_tenure(8, 3)
                .with_clock(TabuClock::Moves)
                .with_time_limit(Duration::from_secs(2))
                .with_admission_threshold(4.0)
                .with_aspiration(false)
                .with_seed(99),
        );

    let raw = config.to_json_string().unwrap();
    let loaded = SearchConfig::from_json_str(&raw).unwrap();

    assert_eq!(loaded.cost_threshold, -0.5);
    assert_eq!(loaded.neighbor_fraction, 0.25);
    assert!(!loaded.moves.contains(MoveType::Combo));
    assert!(loaded.moves.contains(MoveType::DoubleCross));
    assert!(!loaded.compound_moves);
    assert_eq!(loaded.max_passes, Some(40));
    assert_eq!((loaded.tabu.min_tenure, loaded.tabu.max_tenure), (3, 8));
    assert_eq!(loaded.tabu.clock, TabuClock::Moves);
    assert_eq!(loaded.tabu.time_limit, Some(Duration::from_secs(2)));
    assert_eq!(loaded.tabu.admission_threshold, Some(4.0));
    assert!(!loaded.tabu.aspiration);
    assert_eq!(loaded.tabu.seed, 99);
}

#[test]
fn test_config_rejects_bad_json() {
    assert!(SearchConfig::from_json_str("{ not json").is_err());
}
