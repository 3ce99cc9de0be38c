//! Circuit Components
//!
//! A component is a typed circuit element: a fixed number of ports (node
//! names) and a fixed number of real-valued parameters, both determined by
//! its [`ComponentKind`]. Components know how to render themselves for
//! humans and as a single netlist line.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::mutation::{self, MutationParams};
use super::CircuitError;
use crate::netlist::format_value;

/// Model token used for diodes (defined in the netlist preamble)
pub const DIODE_MODEL: &str = "1N4148";
/// Model token used for NPN transistors
pub const NPN_MODEL: &str = "2N2222";
/// Model token used for PNP transistors
pub const PNP_MODEL: &str = "2N3906";
/// Simulator built-in N-channel MOSFET model
pub const NMOS_MODEL: &str = "NMOS";
/// Simulator built-in P-channel MOSFET model
pub const PMOS_MODEL: &str = "PMOS";

/// The closed set of element kinds a circuit can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    VoltageSource,
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    Npn,
    Pnp,
    Nmos,
    Pmos,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 9] = [
        ComponentKind::VoltageSource,
        ComponentKind::Resistor,
        ComponentKind::Capacitor,
        ComponentKind::Inductor,
        ComponentKind::Diode,
        ComponentKind::Npn,
        ComponentKind::Pnp,
        ComponentKind::Nmos,
        ComponentKind::Pmos,
    ];

    /// Number of ports a component of this kind must have
    pub fn port_count(self) -> usize {
        if self.is_two_port() {
            2
        } else {
            3
        }
    }

    /// Number of numeric parameters a component of this kind must have
    pub fn param_count(self) -> usize {
        match self {
            ComponentKind::Diode | ComponentKind::Npn | ComponentKind::Pnp => 0,
            ComponentKind::Nmos | ComponentKind::Pmos => 2,
            ComponentKind::VoltageSource
            | ComponentKind::Resistor
            | ComponentKind::Capacitor
            | ComponentKind::Inductor => 1,
        }
    }

    pub fn is_two_port(self) -> bool {
        matches!(
            self,
            ComponentKind::VoltageSource
                | ComponentKind::Resistor
                | ComponentKind::Capacitor
                | ComponentKind::Inductor
                | ComponentKind::Diode
        )
    }

    pub fn is_bjt(self) -> bool {
        matches!(self, ComponentKind::Npn | ComponentKind::Pnp)
    }

    pub fn is_mosfet(self) -> bool {
        matches!(self, ComponentKind::Nmos | ComponentKind::Pmos)
    }

    /// SPICE element letter for this kind
    pub fn designator(self) -> char {
        match self {
            ComponentKind::VoltageSource => 'V',
            ComponentKind::Resistor => 'R',
            ComponentKind::Capacitor => 'C',
            ComponentKind::Inductor => 'L',
            ComponentKind::Diode => 'D',
            ComponentKind::Npn | ComponentKind::Pnp => 'Q',
            ComponentKind::Nmos | ComponentKind::Pmos => 'M',
        }
    }

    /// Fixed model token appended to the netlist line, if any
    pub fn model_name(self) -> Option<&'static str> {
        match self {
            ComponentKind::Diode => Some(DIODE_MODEL),
            ComponentKind::Npn => Some(NPN_MODEL),
            ComponentKind::Pnp => Some(PNP_MODEL),
            ComponentKind::Nmos => Some(NMOS_MODEL),
            ComponentKind::Pmos => Some(PMOS_MODEL),
            _ => None,
        }
    }

    /// Unit of the value parameter for two-port parameterized kinds
    pub fn unit(self) -> Option<&'static str> {
        match self {
            ComponentKind::VoltageSource => Some("V"),
            ComponentKind::Resistor => Some("Ω"),
            ComponentKind::Capacitor => Some("F"),
            ComponentKind::Inductor => Some("H"),
            _ => None,
        }
    }

    /// Resolve a kind from a netlist designator letter and optional model token.
    ///
    /// Transistor letters are ambiguous on their own, so `Q` and `M` need the
    /// model token to pick the polarity.
    pub fn from_designator(designator: char, model: Option<&str>) -> Option<Self> {
        match designator.to_ascii_uppercase() {
            'V' => Some(ComponentKind::VoltageSource),
            'R' => Some(ComponentKind::Resistor),
            'C' => Some(ComponentKind::Capacitor),
            'L' => Some(ComponentKind::Inductor),
            'D' => Some(ComponentKind::Diode),
            'Q' | 'M' => {
                let model = model?;
                Self::ALL.into_iter().find(|kind| {
                    kind.designator() == designator.to_ascii_uppercase()
                        && kind
                            .model_name()
                            .map(|m| m.eq_ignore_ascii_case(model))
                            .unwrap_or(false)
                })
            }
            _ => None,
        }
    }

    /// Labels for each port, in port order
    fn port_labels(self) -> &'static [&'static str] {
        match self {
            ComponentKind::Npn | ComponentKind::Pnp => &["Collector", "Base", "Emitter"],
            ComponentKind::Nmos | ComponentKind::Pmos => &["Drain", "Gate", "Source"],
            _ => &["Cathode", "Anode"],
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::VoltageSource => "Voltage Source",
            ComponentKind::Resistor => "Resistor",
            ComponentKind::Capacitor => "Capacitor",
            ComponentKind::Inductor => "Inductor",
            ComponentKind::Diode => "Diode",
            ComponentKind::Npn => "NPN",
            ComponentKind::Pnp => "PNP",
            ComponentKind::Nmos => "NMOS",
            ComponentKind::Pmos => "PMOS",
        };
        f.write_str(name)
    }
}

/// A typed circuit element owned by a [`Circuit`](super::Circuit).
///
/// Fields are private so the port/parameter arity can only be established
/// through [`Component::new`] (or deserialization, which goes through the
/// same check).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawComponent")]
pub struct Component {
    kind: ComponentKind,
    name: String,
    ports: Vec<String>,
    params: Vec<f64>,
}

#[derive(Deserialize)]
struct RawComponent {
    kind: ComponentKind,
    name: String,
    ports: Vec<String>,
    #[serde(default)]
    params: Vec<f64>,
}

impl TryFrom<RawComponent> for Component {
    type Error = CircuitError;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        Component::new(raw.kind, raw.name, raw.ports, raw.params)
    }
}

impl Component {
    /// Create a component, checking the port and parameter counts against the kind
    pub fn new<S: Into<String>>(
        kind: ComponentKind,
        name: impl Into<String>,
        ports: impl IntoIterator<Item = S>,
        params: impl IntoIterator<Item = f64>,
    ) -> Result<Self, CircuitError> {
        let name = name.into();
        let ports: Vec<String> = ports.into_iter().map(Into::into).collect();
        let params: Vec<f64> = params.into_iter().collect();

        if ports.len() != kind.port_count() || params.len() != kind.param_count() {
            return Err(CircuitError::InvalidArity {
                kind,
                name,
                expected_ports: kind.port_count(),
                ports: ports.len(),
                expected_params: kind.param_count(),
                params: params.len(),
            });
        }

        Ok(Self {
            kind,
            name,
            ports,
            params,
        })
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// The single value parameter of V/R/C/L components
    pub fn value(&self) -> Option<f64> {
        match self.kind {
            ComponentKind::VoltageSource
            | ComponentKind::Resistor
            | ComponentKind::Capacitor
            | ComponentKind::Inductor => self.params.first().copied(),
            _ => None,
        }
    }

    /// Whether any port of this component sits on `node`
    pub fn connects(&self, node: &str) -> bool {
        self.ports.iter().any(|p| p == node)
    }

    /// Port slice for node rewriting; the length cannot change.
    pub(crate) fn ports_mut(&mut self) -> &mut [String] {
        &mut self.ports
    }

    /// Multi-line, human-readable rendering
    pub fn describe(&self) -> String {
        let mut out = format!("{} {}\n", self.kind, self.name);
        for (label, port) in self.kind.port_labels().iter().zip(&self.ports) {
            out.push_str(&format!("  {}: {}\n", label, port));
        }

        if self.kind.is_mosfet() {
            out.push_str(&format!("  Width: {}\n", format_value(self.params[0])));
            out.push_str(&format!("  Length: {}\n", format_value(self.params[1])));
        } else if let (Some(value), Some(unit)) = (self.value(), self.kind.unit()) {
            out.push_str(&format!("  Value: {} {}\n", format_value(value), unit));
        }

        out
    }

    /// Encode as a single netlist line.
    ///
    /// MOSFETs get a fourth bulk port: tied to the source for NMOS and to
    /// the drain for PMOS.
    pub fn to_netlist_line(&self) -> String {
        let mut tokens: Vec<String> = Vec::with_capacity(8);
        tokens.push(self.name.clone());
        tokens.extend(self.ports.iter().cloned());

        match self.kind {
            ComponentKind::Nmos => tokens.push(self.ports[2].clone()),
            ComponentKind::Pmos => tokens.push(self.ports[0].clone()),
            _ => {}
        }

        if let Some(model) = self.kind.model_name() {
            tokens.push(model.to_string());
        }

        if self.kind.is_mosfet() {
            tokens.push(format!("W={}", format_value(self.params[0])));
            tokens.push(format!("L={}", format_value(self.params[1])));
        } else if let Some(value) = self.value() {
            tokens.push(format_value(value));
        }

        tokens.join(" ")
    }

    /// Gaussian-perturb every parameter with probability `p_mutate`, using the thread RNG
    pub fn mutate(&mut self, sigma: f64, p_mutate: f64) -> Result<(), CircuitError> {
        let params = MutationParams::new(sigma, p_mutate)?;
        self.mutate_with(&params, &mut rand::thread_rng());
        Ok(())
    }

    /// Gaussian-perturb every parameter using a caller-supplied RNG
    pub fn mutate_with<R: Rng + ?Sized>(&mut self, params: &MutationParams, rng: &mut R) {
        mutation::perturb(&mut self.params, params, rng);
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
