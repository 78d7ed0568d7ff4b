//! Tests for routes, solutions and the giant-route encoding.

mod common;

use common::{
    create_grid_problem, create_if_problem, create_swap_problem, matrix_problem, random_order,
    uniform_matrix,
};
use mcarptif_ls::boundary::{Link, Mcarp, McarpTif};
use mcarptif_ls::encoding::{BoundarySets, GiantRoute, Visit};
use mcarptif_ls::problem::{ArcData, ArcId};
use mcarptif_ls::solution::{Route, Solution};
use mcarptif_ls::split::Split;
use mcarptif_ls::validation::validate;

fn ids(raw: &[usize]) -> Vec<ArcId> {
    raw.iter().map(|&i| ArcId(i)).collect()
}

#[test]
fn test_route_cost_with_facilities() {
    let problem = create_if_problem(None);
    let solution = Solution::from_routes(vec![vec![ids(&[2]), ids(&[3])]], &problem, &McarpTif);

    // 1 + 2 (first task), 3 + 2 (IF detour, second task), 3 (IF, depot)
    assert!((solution.cost - 11.0).abs() < 1e-9);
    let route = &solution.routes[0];
    assert_eq!(route.trips.len(), 2);
    assert_eq!(route.trips[0].facility, Some(ArcId(1)));
    assert_eq!(route.trips[1].facility, Some(ArcId(1)));
    assert_eq!(route.trips[0].load, 3.0);
    assert_eq!(route.load(), 6.0);
    assert!(validate(&solution, &problem, &McarpTif).is_ok());
}

#[test]
fn test_route_links() {
    let problem = create_if_problem(None);
    let route = Route::from_trips(vec![ids(&[2]), ids(&[3])], &problem, &McarpTif);

    assert_eq!(route.predecessor(0, 0, &problem), Link::direct(problem.depot));
    assert_eq!(route.predecessor(1, 0, &problem), Link::boundary(ArcId(2)));
    assert_eq!(route.successor(0, 0, &problem), Link::boundary(ArcId(3)));
    assert_eq!(route.successor(1, 0, &problem), Link::boundary(problem.depot));
}

#[test]
fn test_cumulative_and_trip_costs() {
    let problem = create_if_problem(None);
    let mut route = Route::from_trips(vec![ids(&[2]), ids(&[3])], &problem, &McarpTif);
    assert!(!route.is_dirty());

    route.invalidate();
    assert!(route.is_dirty());

    let cumulative = route.cumulative(&problem, &McarpTif).clone();
    assert!(!route.is_dirty());
    assert_eq!(cumulative.loads, vec![vec![3.0], vec![3.0]]);
    assert_eq!(cumulative.costs, vec![vec![3.0], vec![8.0]]);

    let trip_costs = route.trip_costs(&problem, &McarpTif);
    assert!((trip_costs[0] - 6.0).abs() < 1e-9);
    assert!((trip_costs[1] - 5.0).abs() < 1e-9);
    assert!((trip_costs.iter().sum::<f64>() - route.cost).abs() < 1e-9);
}

#[test]
fn test_split_and_append_tails() {
    let arcs = vec![
        ArcData::depot(),
        ArcData::task(1.0, 0.0),
        ArcData::task(1.0, 0.0),
        ArcData::task(1.0, 0.0),
        ArcData::task(1.0, 0.0),
    ];
    let problem = matrix_problem(arcs, uniform_matrix(5, 1.0), 10.0, None);
    let mut solution =
        Solution::from_routes(vec![vec![ids(&[1, 2])], vec![ids(&[3, 4])]], &problem, &Mcarp);

    let tail_a = solution.routes[0].split_off_after(0, 0);
    let tail_b = solution.routes[1].split_off_after(0, 1);
    assert_eq!(tail_a.partial, ids(&[2]));
    assert!(tail_b.partial.is_empty());

    solution.routes[0].append_tail(tail_b);
    solution.routes[1].append_tail(tail_a);
    assert!(solution.routes[0].is_dirty());
    solution.evaluate(&problem, &Mcarp);

    assert_eq!(solution.to_nested(), vec![vec![ids(&[1])], vec![ids(&[3, 4, 2])]]);
    assert!(validate(&solution, &problem, &Mcarp).is_ok());
}

#[test]
fn test_whole_trips_move_with_a_tail() {
    let problem = create_if_problem(None);
    let mut solution = Solution::from_routes(vec![vec![ids(&[2]), ids(&[3])]], &problem, &McarpTif);

    let tail = solution.routes[0].split_off_after(0, 0);
    assert!(tail.partial.is_empty());
    assert_eq!(tail.trips.len(), 1);

    let mut other = Route::from_trips(Vec::new(), &problem, &McarpTif);
    other.append_tail(tail);
    other.recompute(&problem, &McarpTif);
    assert_eq!(other.trips.len(), 1);
    assert_eq!(other.trips[0].arcs, ids(&[3]));
}

#[test]
fn test_lexicographic_comparison() {
    let problem = create_swap_problem();
    let one_route = Solution::from_routes(vec![vec![ids(&[1, 2])]], &problem, &Mcarp);
    let two_routes = Solution::from_routes(vec![vec![ids(&[2])], vec![ids(&[1])]], &problem, &Mcarp);
    let reversed = Solution::from_routes(vec![vec![ids(&[2, 1])]], &problem, &Mcarp);

    assert!((one_route.cost - 11.0).abs() < 1e-9);
    assert!((reversed.cost - 6.0).abs() < 1e-9);

    // Fewer vehicles wins before cost
    assert!(one_route.is_better_than(&two_routes));
    assert!(!two_routes.is_better_than(&one_route));
    assert!(reversed.is_better_than(&one_route));
    // Ties are not an improvement
    assert!(!one_route.is_better_than(&one_route.clone()));
}

#[test]
fn test_giant_route_encoding() {
    let problem = create_if_problem(None);
    let solution = Solution::from_routes(vec![vec![ids(&[2]), ids(&[3])]], &problem, &McarpTif);
    let giant = GiantRoute::encode(&solution, &problem, &McarpTif);

    assert_eq!(
        giant.sequence,
        vec![
            Visit::Depot(ArcId(0)),
            Visit::Task(ArcId(2)),
            Visit::Facility(ArcId(1)),
            Visit::Task(ArcId(3)),
            Visit::Facility(ArcId(1)),
            Visit::Depot(ArcId(0)),
        ]
    );
    assert_eq!(giant.route_count(), 1);
    assert_eq!(giant.trip_end_positions(), vec![1, 3]);

    let decoded = giant.decode(&problem, &McarpTif);
    assert_eq!(decoded.to_nested(), solution.to_nested());
    assert!((decoded.cost - solution.cost).abs() < 1e-9);
    assert_eq!(decoded.routes[0].trips[0].facility, Some(ArcId(1)));
}

#[test]
fn test_boundary_roles() {
    let problem = create_if_problem(None);
    let solution = Solution::from_routes(vec![vec![ids(&[2]), ids(&[3])]], &problem, &McarpTif);
    let roles = BoundarySets::classify(&solution, &problem);

    assert!(roles.begin_route.contains(ArcId(2)));
    assert!(roles.begin_trip.contains(ArcId(3)));
    assert!(!roles.begin_trip.contains(ArcId(2)));
    assert!(roles.end_route.contains(ArcId(3)));
    assert!(roles.end_trip.contains(ArcId(2)));
    assert!(!roles.end_trip.contains(ArcId(3)));
    assert!(roles.single_trip_arc.contains(ArcId(2)));
    assert!(roles.single_route_arc.is_empty());
}

#[test]
fn test_patch_route_updates_positions() {
    let problem = create_swap_problem();
    let mut solution = Solution::from_routes(vec![vec![ids(&[1, 2])]], &problem, &Mcarp);
    let mut giant = GiantRoute::encode(&solution, &problem, &Mcarp);
    assert_eq!(giant.route_end_positions(), vec![2]);

    solution.routes[0].trips[0].arcs = ids(&[2, 1]);
    solution.evaluate(&problem, &Mcarp);
    giant.patch_route(&solution, &problem, &Mcarp, 0);

    assert_eq!(giant.positions.get(ArcId(2)).map(|s| s.offset), Some(0));
    assert_eq!(giant.positions.get(ArcId(1)).map(|s| s.offset), Some(1));
    assert_eq!(
        giant.sequence,
        vec![
            Visit::Depot(ArcId(0)),
            Visit::Task(ArcId(2)),
            Visit::Task(ArcId(1)),
            Visit::Depot(ArcId(0)),
        ]
    );
}

#[test]
fn test_positions_follow_edge_orientation() {
    let problem = create_grid_problem(2, 10.0, false);
    let order = random_order(&problem, 3);
    let solution = Split::split(&order, &problem, &Mcarp);
    let giant = GiantRoute::encode(&solution, &problem, &Mcarp);

    for &arc in &order {
        let inv = problem.inverse(arc).expect("grid streets are edges");
        let slot = giant.positions.locate(&solution, arc).expect("scheduled");
        assert_eq!(giant.positions.get(inv), Some(slot));
        assert_eq!(giant.positions.locate(&solution, inv), None);
    }
}
