//! Tests for splitting a task order into routes.

mod common;

use common::{create_grid_problem, create_if_problem, create_swap_problem, matrix_problem, random_order};
use mcarptif_ls::boundary::{Mcarp, McarpTif};
use mcarptif_ls::problem::{ArcData, ArcId};
use mcarptif_ls::split::Split;
use mcarptif_ls::validation::validate;

fn ids(raw: &[usize]) -> Vec<ArcId> {
    raw.iter().map(|&i| ArcId(i)).collect()
}

#[test]
fn test_optimal_split() {
    let problem = create_swap_problem();
    let order = ids(&[1, 2]);

    // One route (cost 11) beats two single-task routes (7 + 7)
    let solution = Split::split(&order, &problem, &Mcarp);
    assert_eq!(solution.to_nested(), vec![vec![ids(&[1, 2])]]);
    assert_eq!(Split::giant_tour(&solution), order);

    // With room for a single task each, two routes are forced
    let tight = matrix_problem(
        vec![
            ArcData::depot(),
            ArcData::task(1.0, 0.0),
            ArcData::task(1.0, 0.0),
        ],
        vec![
            vec![0.0, 5.0, 3.0],
            vec![2.0, 0.0, 2.0],
            vec![4.0, 1.0, 0.0],
        ],
        1.0,
        None,
    );
    let solution = Split::split(&order, &tight, &Mcarp);
    assert_eq!(solution.vehicles(), 2);
    assert!((solution.cost - 14.0).abs() < 1e-9);

    assert_eq!(Split::split(&[], &problem, &Mcarp).vehicles(), 0);
}

#[test]
fn test_greedy_split_with_facilities() {
    let order = ids(&[2, 3]);

    let unlimited = create_if_problem(None);
    let solution = Split::split(&order, &unlimited, &McarpTif);
    assert_eq!(solution.to_nested(), vec![vec![ids(&[2]), ids(&[3])]]);
    assert!((solution.cost - 11.0).abs() < 1e-9);

    // A second trip would take the route to 11, above the limit
    let limited = create_if_problem(Some(10.0));
    let solution = Split::split(&order, &limited, &McarpTif);
    assert_eq!(solution.to_nested(), vec![vec![ids(&[2])], vec![ids(&[3])]]);
    assert!((solution.cost - 12.0).abs() < 1e-9);
    assert!(validate(&solution, &limited, &McarpTif).is_ok());
}

#[test]
fn test_split_grid_is_valid() {
    let plain = create_grid_problem(3, 6.0, false);
    let solution = Split::split(&random_order(&plain, 11), &plain, &Mcarp);
    assert!(validate(&solution, &plain, &Mcarp).is_ok());

    let with_if = create_grid_problem(3, 6.0, true);
    let solution = Split::split(&random_order(&with_if, 11), &with_if, &McarpTif);
    assert!(validate(&solution, &with_if, &McarpTif).is_ok());
    assert_eq!(solution.task_count(), with_if.required_task_count());
}
