//! Analysis Directives
//!
//! Each analysis becomes a handful of netlist lines appended to the circuit
//! before simulation: a drive source coupled into the input node, the
//! analysis card, and the `.meas` statements the log decoder reads back.

use serde::{Deserialize, Serialize};

use super::SimulationError;
use crate::circuit::Circuit;
use crate::measure::ac::{CUTOFF_HIGH, CUTOFF_LOW, OP_POINT, UNITY_GAIN, UNITY_PHASE};
use crate::netlist::format_value;

/// Coupling capacitor between the drive source and the input node
pub const DRIVE_CAPACITOR: &str = "Cdrive";
/// Drive voltage source
pub const DRIVE_SOURCE: &str = "Vdrive";
/// Node between the drive source and its coupling capacitor
pub const DRIVE_NODE: &str = "Ndrive";

/// Transient drive amplitude (10 mV sine)
const DRIVE_AMPLITUDE: &str = "10m";
const COUPLING: &str = "10u";
/// Points per period of the transient sweep
const SAMPLES_PER_PERIOD: f64 = 100.0;

/// Requested analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Analysis {
    /// One period of a sine drive at `frequency`, sampled 100 times at `output_node`
    Transient {
        frequency: f64,
        input_node: String,
        output_node: String,
    },
    /// Small-signal sweep; gain and phase are read at `frequency`
    Ac {
        frequency: f64,
        input_node: String,
        output_node: String,
    },
    /// DC operating point
    OperatingPoint,
}

impl Analysis {
    pub fn name(&self) -> &'static str {
        match self {
            Analysis::Transient { .. } => "transient",
            Analysis::Ac { .. } => "ac",
            Analysis::OperatingPoint => "operating_point",
        }
    }

    pub fn frequency(&self) -> Option<f64> {
        match self {
            Analysis::Transient { frequency, .. } | Analysis::Ac { frequency, .. } => Some(*frequency),
            Analysis::OperatingPoint => None,
        }
    }
}

/// Extra netlist lines for one simulation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisDirectives {
    lines: Vec<String>,
}

impl AnalysisDirectives {
    /// Build the directives for `analysis` against `circuit`.
    ///
    /// Driven analyses need a positive finite frequency and both nodes
    /// present in the circuit.
    pub fn for_analysis(analysis: &Analysis, circuit: &Circuit) -> Result<Self, SimulationError> {
        let lines = match analysis {
            Analysis::Transient {
                frequency,
                input_node,
                output_node,
            } => {
                check_drive(*frequency, input_node, output_node, circuit)?;
                let period = format_value(1.0 / frequency);
                let step = format_value(1.0 / (SAMPLES_PER_PERIOD * frequency));
                vec![
                    format!("{} {} {} {}", DRIVE_CAPACITOR, input_node, DRIVE_NODE, COUPLING),
                    format!(
                        "{} {} 0 sin(0, {}, {})",
                        DRIVE_SOURCE,
                        DRIVE_NODE,
                        DRIVE_AMPLITUDE,
                        format_value(*frequency)
                    ),
                    format!(".tran 0 {} {}", period, step),
                    ".param T = 0".to_string(),
                    format!(".meas tran result find V({}) at = T", output_node),
                    format!(".step param T 0 {} {}", period, step),
                ]
            }
            Analysis::Ac {
                frequency,
                input_node,
                output_node,
            } => {
                check_drive(*frequency, input_node, output_node, circuit)?;
                let out = format!("V({})", output_node);
                vec![
                    format!("{} {} {} {}", DRIVE_CAPACITOR, input_node, DRIVE_NODE, COUPLING),
                    format!("{} {} 0 AC 1", DRIVE_SOURCE, DRIVE_NODE),
                    ".ac dec 100 1 100meg".to_string(),
                    format!(".meas ac gain_peak max mag({})", out),
                    format!(".meas ac {} find {} at {}", OP_POINT, out, format_value(*frequency)),
                    format!(".meas ac {} when mag({})=gain_peak/sqrt(2) rise=1", CUTOFF_LOW, out),
                    format!(".meas ac {} when mag({})=gain_peak/sqrt(2) fall=last", CUTOFF_HIGH, out),
                    format!(".meas ac {} when mag({})=1 fall=last", UNITY_GAIN, out),
                    format!(".meas ac {} find {} when mag({})=1 fall=last", UNITY_PHASE, out, out),
                ]
            }
            Analysis::OperatingPoint => std::iter::once(".op".to_string())
                .chain(
                    circuit
                        .voltage_sources()
                        .map(|v| format!(".meas op I_{} find I({})", v.name(), v.name())),
                )
                .collect(),
        };

        Ok(Self { lines })
    }

    pub fn from_lines(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Netlist text with the directives appended
    pub fn apply(&self, netlist: &str) -> String {
        let mut out = String::with_capacity(netlist.len() + 64 * self.lines.len());
        out.push_str(netlist);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

fn check_drive(frequency: f64, input: &str, output: &str, circuit: &Circuit) -> Result<(), SimulationError> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(SimulationError::InvalidAnalysis(format!(
            "frequency must be positive, got {}",
            frequency
        )));
    }
    for node in [input, output] {
        if !circuit.nodes().contains(node) {
            return Err(SimulationError::InvalidAnalysis(format!(
                "node '{}' is not in circuit {}",
                node,
                circuit.id()
            )));
        }
    }
    Ok(())
}
