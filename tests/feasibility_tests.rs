//! Tests for the load and duration checks.

mod common;

use common::{create_if_problem, create_two_route_problem, matrix_problem, uniform_matrix};
use mcarptif_ls::boundary::{Mcarp, McarpTif};
use mcarptif_ls::encoding::{ArcSet, GiantRoute};
use mcarptif_ls::local_search::feasibility::{FeasibilityChecker, MoveBook, Verdict};
use mcarptif_ls::local_search::MoveCostCalculator;
use mcarptif_ls::moves::{Insertion, Move, MoveKind};
use mcarptif_ls::problem::{ArcData, ArcId, Problem};
use mcarptif_ls::solution::Solution;

fn ids(raw: &[usize]) -> Vec<ArcId> {
    raw.iter().map(|&i| ArcId(i)).collect()
}

/// A heavy task 1 (demand 9) and a light task 2 (demand 2) in separate
/// routes, capacity 10.
fn create_heavy_problem() -> Problem {
    let arcs = vec![
        ArcData::depot(),
        ArcData::task(9.0, 0.0),
        ArcData::task(2.0, 0.0),
    ];
    matrix_problem(arcs, uniform_matrix(3, 1.0), 10.0, None)
}

fn create_line_problem() -> Problem {
    let mut arcs = vec![ArcData::depot()];
    arcs.extend((0..4).map(|_| ArcData::task(1.0, 0.0)));
    matrix_problem(arcs, uniform_matrix(5, 1.0), 10.0, None)
}

#[test]
fn test_improving_relocate_can_overload() {
    let problem = create_heavy_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1])], vec![ids(&[2])]], &problem, &Mcarp);
    let giant = GiantRoute::encode(&solution, &problem, &Mcarp);

    let moves = MoveCostCalculator::new(&problem, &Mcarp, &solution, &giant)
        .with_threshold(f64::INFINITY)
        .relocate(&[ArcId(2)], &ArcSet::full(problem.arc_count()));
    assert_eq!(moves.len(), 1);
    let mv = moves[0].clone();
    assert!((mv.delta + 1.0).abs() < 1e-9);
    assert_eq!(mv.relocation().map(|r| r.target), Some(Insertion::Before(ArcId(1))));

    let checker = FeasibilityChecker::new(&problem, &Mcarp);
    let mut book = MoveBook::default();
    assert_eq!(
        checker.check(&mv, &mut solution, &giant.positions, &mut book),
        Verdict::InfeasibleLoad
    );
    assert_eq!(book.infeasible_load.len(), 1);
    assert!(book.infeasible_duration.is_empty());
    assert_eq!(checker.overloaded_trips(&mv, &solution, &giant.positions), vec![(0, 0)]);

    book.clear();
    assert!(book.is_empty());
}

#[test]
fn test_feasible_moves_are_not_filed() {
    let problem = create_two_route_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1, 2])], vec![ids(&[3, 4])]], &problem, &Mcarp);
    let giant = GiantRoute::encode(&solution, &problem, &Mcarp);

    let moves = MoveCostCalculator::new(&problem, &Mcarp, &solution, &giant)
        .with_threshold(f64::INFINITY)
        .relocate(&ids(&[1, 2, 3, 4]), &ArcSet::full(problem.arc_count()));
    assert!(!moves.is_empty());

    let checker = FeasibilityChecker::new(&problem, &Mcarp);
    let mut book = MoveBook::default();
    for mv in &moves {
        assert_eq!(checker.check(mv, &mut solution, &giant.positions, &mut book), Verdict::Feasible);
        assert!(checker.overloaded_trips(mv, &solution, &giant.positions).is_empty());
    }
    assert!(book.is_empty());
}

#[test]
fn test_route_cost_charge_against_duration_limit() {
    let problem = create_if_problem(Some(11.0));
    let mut solution = Solution::from_routes(vec![vec![ids(&[2]), ids(&[3])]], &problem, &McarpTif);
    let giant = GiantRoute::encode(&solution, &problem, &McarpTif);
    let checker = FeasibilityChecker::new(&problem, &McarpTif);

    let flip = MoveKind::Flip {
        arc: ArcId(2),
        placed: ArcId(2),
    };
    let longer = Move::new(flip.clone(), 5.0, ids(&[2])).with_route_cost(ArcId(2), 5.0);
    let mut book = MoveBook::default();
    assert_eq!(
        checker.check(&longer, &mut solution, &giant.positions, &mut book),
        Verdict::InfeasibleDuration
    );
    assert_eq!(book.infeasible_duration.len(), 1);

    // The route already sits exactly at the limit; a saving is fine
    let shorter = Move::new(flip, -1.0, ids(&[2])).with_route_cost(ArcId(2), -1.0);
    assert_eq!(checker.assess(&shorter, &mut solution, &giant.positions), Verdict::Feasible);
}

#[test]
fn test_unscheduled_anchor_is_not_applicable() {
    let problem = create_heavy_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1])]], &problem, &Mcarp);
    let giant = GiantRoute::encode(&solution, &problem, &Mcarp);
    let checker = FeasibilityChecker::new(&problem, &Mcarp);

    let stale = Move::new(
        MoveKind::Flip {
            arc: ArcId(2),
            placed: ArcId(2),
        },
        0.0,
        ids(&[2]),
    )
    .with_trip_load(ArcId(2), 1.0);
    assert_eq!(checker.assess(&stale, &mut solution, &giant.positions), Verdict::NotApplicable);
}

#[test]
fn test_cross_verdicts() {
    // Cuts in one trip wait for the double-cross search
    let line = create_line_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1, 2, 3, 4])]], &line, &Mcarp);
    let giant = GiantRoute::encode(&solution, &line, &Mcarp);
    let checker = FeasibilityChecker::new(&line, &Mcarp);
    let mut book = MoveBook::default();

    let same_trip = Move::new(MoveKind::Cross { a: ArcId(1), b: ArcId(3) }, 0.0, ids(&[1, 2, 3, 4]));
    assert_eq!(
        checker.check(&same_trip, &mut solution, &giant.positions, &mut book),
        Verdict::Deferred
    );
    assert_eq!(book.deferred_cross.len(), 1);

    // Cuts in different trips of one route are never crossed
    let problem = create_if_problem(None);
    let mut solution = Solution::from_routes(vec![vec![ids(&[2]), ids(&[3])]], &problem, &McarpTif);
    let giant = GiantRoute::encode(&solution, &problem, &McarpTif);
    let checker = FeasibilityChecker::new(&problem, &McarpTif);
    let two_trips = Move::new(MoveKind::Cross { a: ArcId(2), b: ArcId(3) }, 0.0, ids(&[2, 3]));
    assert_eq!(
        checker.assess(&two_trips, &mut solution, &giant.positions),
        Verdict::NotApplicable
    );
}

#[test]
fn test_cross_outcome_between_routes() {
    let problem = create_two_route_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1, 2])], vec![ids(&[3, 4])]], &problem, &Mcarp);
    let giant = GiantRoute::encode(&solution, &problem, &Mcarp);
    let checker = FeasibilityChecker::new(&problem, &Mcarp);

    let sa = giant.positions.get(ArcId(1)).unwrap();
    let sb = giant.positions.get(ArcId(3)).unwrap();
    let outcome = checker.cross_outcome(&mut solution, sa, sb);

    // depot -> 1 -> 4 -> depot and depot -> 3 -> 2 -> depot
    assert_eq!(outcome.loads, [2.0, 2.0]);
    assert!((outcome.costs[0] - 109.0).abs() < 1e-9);
    assert!((outcome.costs[1] - 109.0).abs() < 1e-9);

    let cross = Move::new(MoveKind::Cross { a: ArcId(1), b: ArcId(3) }, 196.0, ids(&[1, 2, 3, 4]));
    assert_eq!(checker.assess(&cross, &mut solution, &giant.positions), Verdict::Feasible);
}

#[test]
fn test_double_cross_needs_ordered_cuts() {
    let problem = create_line_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1, 2, 3, 4])]], &problem, &Mcarp);
    let giant = GiantRoute::encode(&solution, &problem, &Mcarp);
    let checker = FeasibilityChecker::new(&problem, &Mcarp);

    let ordered = Move::new(MoveKind::DoubleCross { cuts: [ArcId(1), ArcId(2), ArcId(3), ArcId(4)] }, 0.0, ids(&[1, 2, 3, 4]));
    assert_eq!(checker.assess(&ordered, &mut solution, &giant.positions), Verdict::Feasible);

    let shuffled = Move::new(MoveKind::DoubleCross { cuts: [ArcId(2), ArcId(1), ArcId(3), ArcId(4)] }, 0.0, ids(&[1, 2, 3, 4]));
    assert_eq!(checker.assess(&shuffled, &mut solution, &giant.positions), Verdict::NotApplicable);
}

#[test]
fn test_feasible_moves_above_limit_are_filed() {
    let problem = create_two_route_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1, 2])], vec![ids(&[3, 4])]], &problem, &Mcarp);
    let giant = GiantRoute::encode(&solution, &problem, &Mcarp);

    let moves = MoveCostCalculator::new(&problem, &Mcarp, &solution, &giant)
        .with_threshold(f64::INFINITY)
        .relocate(&ids(&[1, 2, 3, 4]), &ArcSet::full(problem.arc_count()));
    let checker = FeasibilityChecker::new(&problem, &Mcarp);

    let mut book = MoveBook::default();
    for mv in &moves {
        let verdict = checker.check_against(mv, f64::INFINITY, &mut solution, &giant.positions, &mut book);
        assert_eq!(verdict, Verdict::Feasible);
    }
    assert!(book.is_empty());

    // Every plain relocate here lands in the far route
    assert!(moves.iter().all(|mv| mv.delta > 0.0));
    for mv in &moves {
        checker.check_against(mv, 0.0, &mut solution, &giant.positions, &mut book);
    }
    assert_eq!(book.exceeds_threshold.len(), moves.len());
    assert!(book.infeasible_load.is_empty());
    assert!(book.infeasible_duration.is_empty());
    assert!(book.deferred_cross.is_empty());

    book.clear();
    assert!(book.is_empty());
}
