//! # MCARPTIF local search
//!
//! Local search and tabu search for the Mixed Capacitated Arc Routing Problem
//! (MCARP) and its variant with Intermediate Facilities (MCARPTIF).
//!
//! A solution is a set of routes, each a sequence of trips separated by IF
//! visits. The engine enumerates relocate, exchange, flip and cross
//! neighbourhoods with boundary-aware move costs, applies every compatible
//! feasible improving move of a pass at once (compound moves), and falls back
//! to double crosses and load-repairing combos when a pass stalls.
//!
//! ```no_run
//! use mcarptif_ls::boundary::McarpTif;
//! use mcarptif_ls::config::SearchConfig;
//! use mcarptif_ls::local_search::LocalSearch;
//! use mcarptif_ls::problem::Problem;
//! use mcarptif_ls::split::Split;
//!
//! # fn main() -> mcarptif_ls::error::Result<()> {
//! let problem = Problem::from_json_file("instance.json")?;
//! let order: Vec<_> = problem.required_tasks().collect();
//! let mut solution = Split::split(&order, &problem, &McarpTif);
//! let search = LocalSearch::new(McarpTif, SearchConfig::new());
//! let report = search.improve(&mut solution, &problem)?;
//! println!("{:.2} -> {:.2}", report.initial_cost, report.final_cost);
//! # Ok(())
//! # }
//! ```

pub mod boundary;
pub mod config;
pub mod encoding;
pub mod error;
pub mod local_search;
pub mod moves;
pub mod network;
pub mod problem;
pub mod solution;
pub mod split;
pub mod tabu;
pub mod utils;
pub mod validation;

pub use crate::boundary::{BoundaryModel, Mcarp, McarpTif};
pub use crate::config::{SearchConfig, TabuConfig};
pub use crate::error::{Result, SearchError};
pub use crate::local_search::{ImproveReport, LocalSearch};
pub use crate::moves::{Move, MoveKind, MoveSet, MoveType};
pub use crate::problem::{ArcId, Problem};
pub use crate::solution::Solution;
pub use crate::tabu::{TabuReport, TabuSearch};
pub use crate::validation::{validate, Violation};
