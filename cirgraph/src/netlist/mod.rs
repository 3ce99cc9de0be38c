//! Netlist Codec
//!
//! Writes circuits in the simulator's plain-text netlist format and reads
//! component lines back for round-trips and hand-written inputs.

pub mod reader;
pub mod writer;

pub use reader::{parse_spice_value, NetlistParseError, NetlistReader};
pub use writer::{circuit_dir, file_stem, NetlistWriter, MODEL_DEFINITIONS};

/// Render a number the way netlist lines expect it.
///
/// Integral values keep a trailing `.0` (`1000.0`), very small or large
/// values use exponent notation (`1e-6`), so the text always parses back to
/// the same `f64`.
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}
