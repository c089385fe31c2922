//! CDMP Simulation Harness
//!
//! Runs the collective decision-making core on a concrete, one-dimensional
//! bargaining domain under named scenarios. Every source of randomness is
//! derived from a single 64-bit seed held by the model, so any run can be
//! replayed from the seed it reports.
//!
//! # Usage
//!
//! ```
//! use cdmp_sim::{ScenarioRunner, SimConfig};
//! use cdmp_sim::scenarios::ScenarioId;
//!
//! let config = SimConfig {
//!     seed: 42,
//!     num_actors: 6,
//!     ..Default::default()
//! };
//!
//! let result = ScenarioRunner::new(config).run(ScenarioId::ClearMajority).unwrap();
//! assert!(result.winning_position < 0.5);
//! ```

mod config;
mod domain;
mod error;
mod exporter;
mod runner;
pub mod scenarios;

pub use config::SimConfig;
pub use domain::{scalar_positions, scalar_utility, ScalarActor, ScalarParams, ScalarState, ScalarStep};
pub use error::{Result, SimError};
pub use exporter::RunExport;
pub use runner::{winner_of, ScenarioMetrics, ScenarioResult, ScenarioRunner};
