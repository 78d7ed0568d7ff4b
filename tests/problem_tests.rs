//! Tests for instance construction, lookup tables and the network builder.

mod common;

use common::{create_grid_problem, create_if_problem, create_swap_problem, uniform_matrix};
use mcarptif_ls::error::SearchError;
use mcarptif_ls::network::NetworkBuilder;
use mcarptif_ls::problem::{ArcData, ArcId, ArcKind, Problem, ProblemData};

fn data_with(arcs: Vec<ArcData>, distance: Vec<Vec<f64>>, capacity: f64) -> ProblemData {
    ProblemData {
        name: "Invalid".to_string(),
        arcs,
        depot: ArcId(0),
        capacity,
        max_trip_duration: None,
        distance,
    }
}

#[test]
fn test_problem_accessors() {
    let problem = create_swap_problem();

    assert_eq!(problem.arc_count(), 3);
    assert_eq!(problem.depot, ArcId(0));
    assert_eq!(problem.kind(ArcId(0)), ArcKind::Depot);
    assert!(problem.is_task(ArcId(1)));
    assert!(!problem.is_facility(ArcId(1)));
    assert_eq!(problem.tasks(), &[ArcId(1), ArcId(2)]);
    assert_eq!(problem.required_task_count(), 2);
    assert_eq!(problem.distance(ArcId(0), ArcId(1)), 5.0);
    assert_eq!(problem.distance(ArcId(2), ArcId(1)), 1.0);
    assert_eq!(problem.demand(ArcId(1)), 1.0);
    assert_eq!(problem.inverse(ArcId(1)), None);
}

#[test]
fn test_rejects_invalid_instances() {
    // Depot arc is not a depot
    let err = Problem::new(data_with(
        vec![ArcData::task(1.0, 0.0), ArcData::task(1.0, 0.0)],
        uniform_matrix(2, 1.0),
        10.0,
    ))
    .unwrap_err();
    assert!(matches!(err, SearchError::InvalidInstance(_)));

    // Two depots
    let err = Problem::new(data_with(
        vec![ArcData::depot(), ArcData::depot()],
        uniform_matrix(2, 1.0),
        10.0,
    ))
    .unwrap_err();
    assert!(matches!(err, SearchError::InvalidInstance(_)));

    // Zero capacity
    let err = Problem::new(data_with(
        vec![ArcData::depot(), ArcData::task(1.0, 0.0)],
        uniform_matrix(2, 1.0),
        0.0,
    ))
    .unwrap_err();
    assert!(matches!(err, SearchError::InvalidInstance(_)));

    // Matrix of the wrong size
    let err = Problem::new(data_with(
        vec![ArcData::depot(), ArcData::task(1.0, 0.0)],
        uniform_matrix(3, 1.0),
        10.0,
    ))
    .unwrap_err();
    assert!(matches!(err, SearchError::InvalidInstance(_)));

    // Inverse that does not point back
    let err = Problem::new(data_with(
        vec![
            ArcData::depot(),
            ArcData::edge_task(1.0, 0.0, ArcId(2)),
            ArcData::task(1.0, 0.0),
        ],
        uniform_matrix(3, 1.0),
        10.0,
    ))
    .unwrap_err();
    assert!(matches!(err, SearchError::InvalidInstance(_)));
}

#[test]
fn test_facility_tables() {
    let problem = create_if_problem(None);

    // d(task, IF) + unload + d(IF, task) = 1 + 1 + 1
    assert!((problem.if_cost(ArcId(2), ArcId(3)) - 3.0).abs() < 1e-9);
    assert_eq!(problem.best_if_between(ArcId(2), ArcId(3)), Some(ArcId(1)));
    assert_eq!(problem.facilities(), &[ArcId(1)]);

    // Without a facility there is no detour
    let plain = create_swap_problem();
    assert!(plain.if_cost(ArcId(1), ArcId(2)).is_infinite());
    assert_eq!(plain.best_if_between(ArcId(1), ArcId(2)), None);
}

#[test]
fn test_neighbor_lists() {
    let problem = create_grid_problem(3, 6.0, false);

    for &arc in problem.tasks() {
        let neighbors = problem.neighbors(arc);
        assert!(!neighbors.contains(&arc));
        if let Some(inv) = problem.inverse(arc) {
            assert!(!neighbors.contains(&inv));
        }
        for pair in neighbors.windows(2) {
            assert!(problem.distance(arc, pair[0]) <= problem.distance(arc, pair[1]));
        }
    }

    let arc = problem.tasks()[0];
    let len = problem.neighbors(arc).len();
    assert_eq!(problem.neighbor_limit(arc, 1.0), len);
    assert_eq!(problem.neighbor_limit(arc, 0.0), 1);
    assert!(problem.neighbor_limit(arc, 0.5) <= len);
}

#[test]
fn test_json_round_trip_through_file() {
    let problem = create_if_problem(Some(50.0));
    let path = std::env::temp_dir().join("mcarptif_ls_problem_round_trip.json");

    std::fs::write(&path, problem.to_json_string().unwrap()).unwrap();
    let loaded = Problem::from_json_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.arc_count(), problem.arc_count());
    assert_eq!(loaded.capacity, problem.capacity);
    assert_eq!(loaded.max_trip_duration, Some(50.0));
    assert_eq!(loaded.facilities(), problem.facilities());
    assert_eq!(
        loaded.if_cost(ArcId(2), ArcId(3)),
        problem.if_cost(ArcId(2), ArcId(3))
    );
}

#[test]
fn test_network_builder_distances() {
    // 0 <-> 1 is a required edge, 1 -> 2 a required arc, 2 -> 0 a plain road.
    let problem = NetworkBuilder::new("Line", 3, 0, 10.0)
        .required_edge(0, 1, 2.0, 1.0, 2.0)
        .required_arc(1, 2, 3.0, 1.0, 3.0)
        .arc(2, 0, 5.0)
        .build()
        .unwrap();

    // depot, both orientations of the edge, the arc
    assert_eq!(problem.arc_count(), 4);
    assert_eq!(problem.inverse(ArcId(1)), Some(ArcId(2)));
    assert_eq!(problem.inverse(ArcId(2)), Some(ArcId(1)));
    assert_eq!(problem.inverse(ArcId(3)), None);
    assert_eq!(problem.required_task_count(), 2);
    assert_eq!(problem.service_cost(ArcId(3)), 3.0);

    // Distances run from the head of one arc to the tail of the next
    assert_eq!(problem.distance(ArcId(0), ArcId(1)), 0.0);
    assert_eq!(problem.distance(ArcId(0), ArcId(3)), 2.0);
    assert_eq!(problem.distance(ArcId(1), ArcId(3)), 0.0);
    assert_eq!(problem.distance(ArcId(3), ArcId(0)), 5.0);
    assert_eq!(problem.distance(ArcId(3), ArcId(2)), 7.0);
}

#[test]
fn test_network_builder_rejects_bad_input() {
    let err = NetworkBuilder::new("Bad", 2, 0, 10.0)
        .required_edge(0, 5, 1.0, 1.0, 1.0)
        .build()
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidInstance(_)));

    // Node 1 can be reached but cannot get back to the depot
    let err = NetworkBuilder::new("OneWay", 2, 0, 10.0)
        .required_arc(0, 1, 1.0, 1.0, 1.0)
        .build()
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidInstance(_)));
}
