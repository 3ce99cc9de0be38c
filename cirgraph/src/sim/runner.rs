//! Simulation Runner Trait
//!
//! The narrow seam to an external analog simulator: run a netlist with some
//! directives appended, hand back the decoded log text.

use async_trait::async_trait;
use thiserror::Error;

use super::AnalysisDirectives;
use crate::circuit::CircuitId;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Simulator not available: {0}")]
    NotAvailable(String),

    #[error("External tool failure: {0}")]
    ExternalToolFailure(String),

    #[error("Invalid analysis: {0}")]
    InvalidAnalysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Common trait for simulator drivers
#[async_trait]
pub trait SimulationRunner: Send + Sync {
    /// Get the runner name
    fn name(&self) -> &str;

    /// Check whether the simulator can be launched
    async fn is_available(&self) -> bool;

    /// Simulate `netlist` with `directives` appended and return the log text.
    ///
    /// Runs are file-addressed by `circuit_id`; concurrent runs need distinct
    /// ids. Failures are returned as-is and never retried.
    async fn run(
        &self,
        circuit_id: &CircuitId,
        netlist: &str,
        directives: &AnalysisDirectives,
    ) -> Result<String, SimulationError>;
}
