//! Population lifecycle: context construction, proliferation, removal and
//! the step loop.

pub mod context;
pub mod driver;
pub mod orchestrator;

pub use context::{founder_centers, RandomStreams, SimulationContext};
pub use driver::{run, RunSummary};
pub use orchestrator::{proliferate, remove_cell, sweep, DivisionReport};
