//! CirGraph - circuit graphs for search-based analog synthesis
//!
//! This library models circuits as graphs of typed components, mutates
//! their parameters, writes them out as SPICE netlists and decodes the
//! simulator's measurement logs into typed records a fitness function can
//! score.
//!
//! # Quick Start
//!
//! ```
//! use cirgraph::prelude::*;
//!
//! let mut circuit = Circuit::with_components(
//!     "1",
//!     [
//!         Component::new(ComponentKind::Resistor, "R1", ["N1", "N2"], [1000.0]).unwrap(),
//!         Component::new(ComponentKind::Resistor, "R2", ["N2", "N3"], [2200.0]).unwrap(),
//!     ],
//! );
//! circuit.remove_component(0).unwrap();
//! assert!(!circuit.nodes().contains("N1"));
//!
//! let netlist = circuit.to_netlist();
//! assert!(netlist.starts_with("*Circuit # 1"));
//! ```
//!
//! # Features
//!
//! - **Circuit graph**: add/remove components with node contraction
//! - **Mutation**: clamped gaussian parameter perturbation
//! - **Netlist codec**: LTspice-compatible writer and a format-level reader
//! - **Log decoding**: transient, AC and operating-point measurements
//! - **Simulation seam**: async runner trait with an LTspice driver

pub mod circuit;
pub mod config;
pub mod core;
pub mod measure;
pub mod netlist;
pub mod sim;

// Re-export main types
pub use circuit::{
    Circuit, CircuitError, CircuitId, Component, ComponentKind, MutationParams, Mutator, Removal,
    RemovalStrategy, GROUND,
};
pub use config::{CirGraphConfig, ConfigError, SimulatorConfig};
pub use crate::core::{CirGraphCore, CirGraphError, Evaluation};
pub use measure::{
    decode_log_bytes, AcMeasurements, LogDecodeError, LogDecoder, MeasurementError,
    MeasurementRecord, OperatingPointMeasurements, TransientMeasurements, TransientTrace,
};
pub use netlist::{NetlistParseError, NetlistReader, NetlistWriter};
pub use sim::{Analysis, AnalysisDirectives, LtspiceRunner, SimulationError, SimulationRunner};

/// Parse a netlist file (convenience wrapper).
pub fn parse_netlist(path: &std::path::Path) -> Result<Circuit, CirGraphError> {
    let text = std::fs::read_to_string(path)?;
    Ok(NetlistReader::parse(&text)?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Analysis, CirGraphCore, CirGraphError, Circuit, CircuitId, Component, ComponentKind,
        LogDecoder, MeasurementRecord, MutationParams, Mutator, SimulationRunner,
    };
}
