//! Structural Operation Planner.
//!
//! Turns structural intents (create/alter/rename/drop, row edits, bulk upload)
//! into ordered statement plans and runs them with defined partial-failure
//! reporting.

pub mod plan;
pub mod runner;

pub use plan::{Operation, Plan, PlanStep};
pub use runner::{PlanRunner, RunReport, RunState};
