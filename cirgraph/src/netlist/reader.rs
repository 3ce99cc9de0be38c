//! Netlist Reader
//!
//! Format-level parser for the component lines [`NetlistWriter`] emits.
//! It recovers `(kind, name, ports, params)` per line; it is not a general
//! SPICE front end. The element kind comes from the first letter of the
//! name plus, for transistors, the model token.
//!
//! [`NetlistWriter`]: super::NetlistWriter

use thiserror::Error;

use crate::circuit::{Circuit, CircuitError, CircuitId, Component, ComponentKind};

#[derive(Debug, Error)]
pub enum NetlistParseError {
    #[error("Line {line}: unknown element '{name}'")]
    UnknownElement { line: usize, name: String },

    #[error("Line {line}: {kind} '{name}' needs {expected} fields, found {found}")]
    MissingFields {
        line: usize,
        kind: ComponentKind,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: invalid numeric value '{value}'")]
    InvalidValue { line: usize, value: String },

    #[error("Line 1: {0}")]
    InvalidId(#[source] CircuitError),

    #[error("Line {line}: {source}")]
    Component {
        line: usize,
        #[source]
        source: CircuitError,
    },
}

/// Netlist parser
pub struct NetlistReader;

impl NetlistReader {
    /// Parse a whole netlist into a circuit.
    ///
    /// The id comes from the `*Circuit # {id}` header; without one a fresh id
    /// is generated. Comments, directives and continuation lines are skipped.
    pub fn parse(text: &str) -> Result<Circuit, NetlistParseError> {
        let id = match text
            .lines()
            .next()
            .and_then(|first| first.trim().strip_prefix("*Circuit #"))
        {
            Some(id) => CircuitId::parse(id.trim()).map_err(NetlistParseError::InvalidId)?,
            None => CircuitId::generate(),
        };

        let mut circuit = Circuit::new(id);
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(['*', '.', '+', ';']) {
                continue;
            }
            circuit.add_component(Self::parse_numbered(trimmed, idx + 1)?);
        }

        Ok(circuit)
    }

    /// Parse a single component line
    pub fn parse_line(line: &str) -> Result<Component, NetlistParseError> {
        Self::parse_numbered(line.trim(), 1)
    }

    fn parse_numbered(line: &str, number: usize) -> Result<Component, NetlistParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let name = tokens.first().copied().unwrap_or_default();
        let unknown = || NetlistParseError::UnknownElement {
            line: number,
            name: name.to_string(),
        };

        let designator = name.chars().next().ok_or_else(unknown)?;
        let model = match designator.to_ascii_uppercase() {
            'Q' => tokens.get(4).copied(),
            'M' => tokens.get(5).copied(),
            _ => None,
        };
        let kind = ComponentKind::from_designator(designator, model).ok_or_else(unknown)?;

        // name + ports (+ bulk for MOSFETs) + model/value/W/L tokens
        let expected = match kind {
            ComponentKind::Nmos | ComponentKind::Pmos => 8,
            ComponentKind::Npn | ComponentKind::Pnp => 5,
            ComponentKind::Diode => 3,
            _ => 4,
        };
        if tokens.len() < expected {
            return Err(NetlistParseError::MissingFields {
                line: number,
                kind,
                name: name.to_string(),
                expected,
                found: tokens.len(),
            });
        }

        let ports = &tokens[1..=kind.port_count()];
        let params = match kind {
            ComponentKind::Nmos | ComponentKind::Pmos => {
                let width = keyed_value(&tokens[6..], "W", number)?;
                let length = keyed_value(&tokens[6..], "L", number)?;
                vec![width, length]
            }
            ComponentKind::Diode | ComponentKind::Npn | ComponentKind::Pnp => Vec::new(),
            _ => {
                // Tolerate an explicit "DC" keyword on sources
                let raw = match tokens[3] {
                    t if t.eq_ignore_ascii_case("dc") && tokens.len() > 4 => tokens[4],
                    t => t,
                };
                vec![parse_spice_value(raw).ok_or_else(|| NetlistParseError::InvalidValue {
                    line: number,
                    value: raw.to_string(),
                })?]
            }
        };

        Component::new(kind, name, ports.iter().copied(), params)
            .map_err(|source| NetlistParseError::Component { line: number, source })
    }
}

fn keyed_value(tokens: &[&str], key: &str, line: usize) -> Result<f64, NetlistParseError> {
    let raw = tokens
        .iter()
        .find_map(|t| {
            let (k, v) = t.split_once('=')?;
            k.eq_ignore_ascii_case(key).then_some(v)
        })
        .ok_or_else(|| NetlistParseError::InvalidValue {
            line,
            value: format!("missing {}=", key),
        })?;

    parse_spice_value(raw).ok_or_else(|| NetlistParseError::InvalidValue {
        line,
        value: raw.to_string(),
    })
}

/// Parse a SPICE number with an optional magnitude suffix (`10u`, `4.7k`, `1meg`).
///
/// Trailing unit letters after the suffix are ignored (`10uF`).
pub fn parse_spice_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (number, rest) = raw
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .rev()
        .find_map(|end| raw[..end].parse::<f64>().ok().map(|n| (n, &raw[end..])))?;

    let rest = rest.to_ascii_lowercase();
    let scale = if rest.starts_with("meg") {
        1e6
    } else if rest.starts_with("mil") {
        25.4e-6
    } else {
        match rest.chars().next() {
            None => 1.0,
            Some('t') => 1e12,
            Some('g') => 1e9,
            Some('k') => 1e3,
            Some('m') => 1e-3,
            Some('u') | Some('µ') => 1e-6,
            Some('n') => 1e-9,
            Some('p') => 1e-12,
            Some('f') => 1e-15,
            Some(c) if c.is_ascii_alphabetic() || c == 'Ω' => 1.0,
            Some(_) => return None,
        }
    };

    Some(number * scale)
}
