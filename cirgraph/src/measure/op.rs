//! Operating Point Metrics
//!
//! DC power is the sum of `|I·V|` over every voltage source, where `V` is the
//! source value from the netlist and `I` its branch current from the log.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::log::FAILED_TOKEN;
use crate::netlist::parse_spice_value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingPointMeasurements {
    /// Total DC power in watts, `None` when no source current was found
    pub dc_power: Option<f64>,
    /// Branch current per voltage source, keyed by source name
    #[serde(default)]
    pub source_currents: BTreeMap<String, f64>,
}

impl OperatingPointMeasurements {
    pub fn parse(log: &str, netlist: &str) -> Self {
        let sources = voltage_sources_from_netlist(netlist);
        let mut source_currents = BTreeMap::new();
        let mut power = 0.0;

        for (name, voltage) in &sources {
            match branch_current(log, name) {
                Some(current) => {
                    power += (current * voltage).abs();
                    source_currents.insert(name.clone(), current);
                }
                None => tracing::debug!("No branch current for source {} in log", name),
            }
        }

        Self {
            dc_power: (!source_currents.is_empty()).then_some(power),
            source_currents,
        }
    }
}

/// `(name, value)` of each voltage-source line (`V...`) in a netlist.
///
/// The value is the fourth token, or the one after an explicit `DC` keyword.
pub fn voltage_sources_from_netlist(netlist: &str) -> Vec<(String, f64)> {
    netlist
        .lines()
        .filter(|line| line.starts_with(['V', 'v']))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let raw = match tokens.get(3)? {
                t if t.eq_ignore_ascii_case("dc") => tokens.get(4)?,
                t => t,
            };
            Some((tokens[0].to_string(), parse_spice_value(raw)?))
        })
        .collect()
}

/// Current of `I(name)` from a line like `i_v1: i(v1)=-0.0012` or `I(V1): -0.0012`
fn branch_current(log: &str, name: &str) -> Option<f64> {
    let probe = format!("i({})", name.to_ascii_lowercase());

    log.lines()
        .filter(|line| !line.contains(FAILED_TOKEN))
        .find(|line| line.to_ascii_lowercase().contains(&probe))
        .and_then(|line| {
            let value = match line.rsplit_once('=') {
                Some((_, value)) => value,
                None => line.split_once(':')?.1,
            };
            value.split_whitespace().next()?.parse().ok()
        })
}
