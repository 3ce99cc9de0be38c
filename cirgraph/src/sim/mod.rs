//! Simulator seam: analysis directives, the runner trait and the LTspice driver.

pub mod analysis;
pub mod ltspice;
pub mod runner;

pub use analysis::{Analysis, AnalysisDirectives};
pub use ltspice::LtspiceRunner;
pub use runner::{SimulationError, SimulationRunner};
