//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use mcarptif_ls::network::NetworkBuilder;
use mcarptif_ls::problem::{ArcData, ArcId, Problem, ProblemData};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a problem from an explicit arc-to-arc matrix. Arc 0 is the depot.
pub fn matrix_problem(
    arcs: Vec<ArcData>,
    distance: Vec<Vec<f64>>,
    capacity: f64,
    max_trip_duration: Option<f64>,
) -> Problem {
    Problem::new(ProblemData {
        name: "TestProblem".to_string(),
        arcs,
        depot: ArcId(0),
        capacity,
        max_trip_duration,
        distance,
    })
    .expect("valid test instance")
}

/// A matrix with `value` everywhere off the diagonal.
pub fn uniform_matrix(n: usize, value: f64) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 0.0 } else { value }).collect())
        .collect()
}

/// Depot plus two zero-cost tasks `a` (arc 1) and `b` (arc 2), served as
/// `depot -> a -> b -> depot` in the natural solution.
///
/// d(depot, a) = 5, d(a, b) = 2, d(b, depot) = 4, while the reverse order
/// costs d(depot, b) + d(b, a) + d(a, depot) = 3 + 1 + 2.
pub fn create_swap_problem() -> Problem {
    let distance = vec![
        vec![0.0, 5.0, 3.0],
        vec![2.0, 0.0, 2.0],
        vec![4.0, 1.0, 0.0],
    ];
    let arcs = vec![
        ArcData::depot(),
        ArcData::task(1.0, 0.0),
        ArcData::task(1.0, 0.0),
    ];
    matrix_problem(arcs, distance, 10.0, None)
}

/// Two copies of the swap problem far apart from each other: tasks 1, 2 and
/// tasks 3, 4, each pair cheaper in reverse order.
pub fn create_two_route_problem() -> Problem {
    let far = 100.0;
    let distance = vec![
        vec![0.0, 5.0, 3.0, 5.0, 3.0],
        vec![2.0, 0.0, 2.0, far, far],
        vec![4.0, 1.0, 0.0, far, far],
        vec![2.0, far, far, 0.0, 2.0],
        vec![4.0, far, far, 1.0, 0.0],
    ];
    let arcs = vec![
        ArcData::depot(),
        ArcData::task(1.0, 0.0),
        ArcData::task(1.0, 0.0),
        ArcData::task(1.0, 0.0),
        ArcData::task(1.0, 0.0),
    ];
    matrix_problem(arcs, distance, 10.0, None)
}

/// Depot (0), one IF (1, unloading cost 1) and two directed tasks 2 and 3 of
/// demand 3 and service cost 2. Every deadhead costs 1, so any IF detour
/// between two tasks costs 3. With capacity 4 each task needs its own trip.
pub fn create_if_problem(max_trip_duration: Option<f64>) -> Problem {
    let arcs = vec![
        ArcData::depot(),
        ArcData::facility(1.0),
        ArcData::task(3.0, 2.0),
        ArcData::task(3.0, 2.0),
    ];
    matrix_problem(arcs, uniform_matrix(4, 1.0), 4.0, max_trip_duration)
}

/// A `side x side` street grid where every street is a required edge.
/// Horizontal streets have demand 1, vertical ones demand 2. The depot is
/// in one corner; with `with_facility` an IF sits in the opposite corner.
pub fn create_grid_problem(side: usize, capacity: f64, with_facility: bool) -> Problem {
    let node = |row: usize, col: usize| row * side + col;
    let mut builder = NetworkBuilder::new(format!("Grid_{}", side), side * side, 0, capacity);

    if with_facility {
        builder = builder
            .facility(node(side - 1, side - 1), 2.0)
            .with_duration_limit(60.0 * side as f64);
    }
    for row in 0..side {
        for col in 0..side {
            if col + 1 < side {
                builder = builder.required_edge(node(row, col), node(row, col + 1), 3.0, 1.0, 3.0);
            }
            if row + 1 < side {
                builder = builder.required_edge(node(row, col), node(row + 1, col), 4.0, 2.0, 4.0);
            }
        }
    }

    builder.build().expect("grid network is valid")
}

/// A shuffled order holding one orientation of every required edge.
pub fn random_order(problem: &Problem, seed: u64) -> Vec<ArcId> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut order: Vec<ArcId> = problem.required_tasks().collect();
    order.shuffle(&mut rng);
    order
}
