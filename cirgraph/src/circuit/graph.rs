//! Circuit Graph
//!
//! A [`Circuit`] owns an ordered list of components and a derived node set.
//! The node set is rebuilt from the component ports after every structural
//! edit, so it always equals the union of all ports.
//!
//! Removing a two-port component either opens it (the component simply
//! disappears) or shorts it (its two nodes are contracted into one), chosen
//! so that no neighbouring component is left hanging off a dead-end node.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::unionfind::UnionFind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mutation::MutationParams;
use super::{CircuitError, Component, ComponentKind};
use crate::netlist::NetlistWriter;

/// Name of the reference (ground) node
pub const GROUND: &str = "0";

/// Opaque circuit identifier; also names the circuit's scratch directory.
///
/// Ids read from files go through [`CircuitId::parse`], which rejects
/// anything that could not be used as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CircuitId(String);

impl CircuitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from external input, rejecting empty ids, path
    /// separators and `..`
    pub fn parse(id: impl Into<String>) -> Result<Self, CircuitError> {
        let id = Self(id.into());
        id.ensure_path_safe()?;
        Ok(id)
    }

    /// Check the id stays inside the directory it is joined onto
    pub fn ensure_path_safe(&self) -> Result<(), CircuitError> {
        let id = self.0.as_str();
        if id.is_empty() || id.contains(['/', '\\', '\0']) || id.contains("..") {
            return Err(CircuitError::InvalidId(id.to_string()));
        }
        Ok(())
    }

    /// Fresh random id, safe to use for concurrent evaluations
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CircuitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl TryFrom<String> for CircuitId {
    type Error = CircuitError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::parse(id)
    }
}

impl From<CircuitId> for String {
    fn from(id: CircuitId) -> Self {
        id.0
    }
}

impl From<u64> for CircuitId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// How a component was taken out of the circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RemovalStrategy {
    /// The component was deleted, leaving an open circuit
    Open,
    /// The component was replaced by a wire: `merged` was renamed to `kept`
    Short { kept: String, merged: String },
}

/// Result of [`Circuit::remove_component`]
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// The removed component, with its ports as they were before removal
    pub component: Component,
    pub strategy: RemovalStrategy,
}

/// An owning collection of components plus the derived node set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CircuitData")]
pub struct Circuit {
    id: CircuitId,
    components: Vec<Component>,
    nodes: BTreeSet<String>,
}

#[derive(Deserialize)]
struct CircuitData {
    id: CircuitId,
    #[serde(default)]
    components: Vec<Component>,
}

impl From<CircuitData> for Circuit {
    fn from(data: CircuitData) -> Self {
        Circuit::with_components(data.id, data.components)
    }
}

impl Circuit {
    /// Create an empty circuit
    pub fn new(id: impl Into<CircuitId>) -> Self {
        Self {
            id: id.into(),
            components: Vec::new(),
            nodes: BTreeSet::new(),
        }
    }

    /// Create a circuit from an ordered list of components
    pub fn with_components(
        id: impl Into<CircuitId>,
        components: impl IntoIterator<Item = Component>,
    ) -> Self {
        let mut circuit = Self::new(id);
        circuit.components = components.into_iter().collect();
        circuit.refresh_nodes();
        circuit
    }

    pub fn id(&self) -> &CircuitId {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<CircuitId>) {
        self.id = id.into();
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// Find a component and its index by name
    pub fn find(&self, name: &str) -> Option<(usize, &Component)> {
        self.components
            .iter()
            .enumerate()
            .find(|(_, c)| c.name() == name)
    }

    pub fn nodes(&self) -> &BTreeSet<String> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn voltage_sources(&self) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(|c| c.kind() == ComponentKind::VoltageSource)
    }

    /// Append a component and register its nodes
    pub fn add_component(&mut self, component: Component) {
        self.nodes.extend(component.ports().iter().cloned());
        self.components.push(component);
    }

    /// Remove the component at `index`, preserving the topology of the rest.
    ///
    /// Two-port components are shorted when one of their nodes would
    /// otherwise be left with a single remaining connection, unless another
    /// component spans the same two nodes (shorting would silence it).
    /// Three-port components are always opened.
    pub fn remove_component(&mut self, index: usize) -> Result<Removal, CircuitError> {
        if index >= self.components.len() {
            return Err(CircuitError::IndexOutOfRange {
                index,
                len: self.components.len(),
            });
        }

        let strategy = self.removal_strategy(index);
        let component = self.components.remove(index);

        if let RemovalStrategy::Short { kept, merged } = &strategy {
            self.contract(&[(kept.clone(), merged.clone())]);
        }
        self.refresh_nodes();

        tracing::debug!(
            "Removed {} from circuit {}: {:?}",
            component.name(),
            self.id,
            strategy
        );

        Ok(Removal {
            component,
            strategy,
        })
    }

    /// Contract `merged` into `keep`: every port on `merged` is moved to `keep`
    pub fn merge_nodes(&mut self, keep: &str, merged: &str) -> Result<(), CircuitError> {
        for node in [keep, merged] {
            if !self.nodes.contains(node) {
                return Err(CircuitError::UnknownNode(node.to_string()));
            }
        }

        self.contract(&[(keep.to_string(), merged.to_string())]);
        self.refresh_nodes();
        Ok(())
    }

    /// Gaussian-perturb every component's parameters, using the thread RNG
    pub fn mutate(&mut self, sigma: f64, p_mutate: f64) -> Result<(), CircuitError> {
        let params = MutationParams::new(sigma, p_mutate)?;
        self.mutate_with(&params, &mut rand::thread_rng());
        Ok(())
    }

    pub fn mutate_with<R: Rng + ?Sized>(&mut self, params: &MutationParams, rng: &mut R) {
        for component in &mut self.components {
            component.mutate_with(params, rng);
        }
    }

    /// Encode as simulator netlist text
    pub fn to_netlist(&self) -> String {
        NetlistWriter::encode(self)
    }

    /// Human-readable rendering of every component
    pub fn describe(&self) -> String {
        self.components
            .iter()
            .map(|c| format!("{}\n", c.describe()))
            .collect()
    }

    fn removal_strategy(&self, index: usize) -> RemovalStrategy {
        let target = &self.components[index];
        if !target.kind().is_two_port() {
            return RemovalStrategy::Open;
        }

        let cathode = &target.ports()[0];
        let anode = &target.ports()[1];
        if cathode == anode {
            return RemovalStrategy::Open;
        }

        let others = || {
            self.components
                .iter()
                .enumerate()
                .filter(move |(i, _)| *i != index)
                .map(|(_, c)| c)
        };
        let references = |node: &str| others().filter(|c| c.connects(node)).count();

        let cathode_refs = references(cathode.as_str());
        let anode_refs = references(anode.as_str());
        let stranded = cathode_refs == 1 || anode_refs == 1;
        let bridged = others().any(|c| c.connects(cathode) && c.connects(anode));

        if !stranded || bridged {
            return RemovalStrategy::Open;
        }

        let keep_anode = anode == GROUND || (cathode != GROUND && cathode_refs == 0);
        let (kept, merged) = if keep_anode {
            (anode, cathode)
        } else {
            (cathode, anode)
        };

        RemovalStrategy::Short {
            kept: kept.clone(),
            merged: merged.clone(),
        }
    }

    /// Rewrite ports so every merged node class carries a single name.
    ///
    /// Each `(keep, merged)` pair is unioned; the class takes the name of the
    /// `keep` side of the latest pair that touched it.
    fn contract(&mut self, merges: &[(String, String)]) {
        let mut names: Vec<String> = self.nodes.iter().cloned().collect();
        for (keep, merged) in merges {
            for node in [keep, merged] {
                if !names.contains(node) {
                    names.push(node.clone());
                }
            }
        }

        let position: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut classes = UnionFind::<usize>::new(names.len());
        let mut label: HashMap<usize, usize> = HashMap::new();
        for (keep, merged) in merges {
            let k = position[keep];
            classes.union(k, position[merged]);
            label.insert(classes.find_mut(k), k);
        }

        for component in &mut self.components {
            for port in component.ports_mut() {
                let Some(&i) = position.get(port.as_str()) else {
                    continue;
                };
                if let Some(&l) = label.get(&classes.find_mut(i)) {
                    if names[l] != *port {
                        *port = names[l].clone();
                    }
                }
            }
        }
    }

    fn refresh_nodes(&mut self) {
        self.nodes = self
            .components
            .iter()
            .flat_map(|c| c.ports().iter().cloned())
            .collect();
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor(name: &str, a: &str, b: &str) -> Component {
        Component::new(ComponentKind::Resistor, name, [a, b], [1000.0]).unwrap()
    }

    fn port_union(circuit: &Circuit) -> BTreeSet<String> {
        circuit
            .components()
            .iter()
            .flat_map(|c| c.ports().iter().cloned())
            .collect()
    }

    #[test]
    fn test_add_component_registers_nodes() {
        let mut circuit = Circuit::new("1");
        circuit.add_component(resistor("R1", "N1", "N2"));
        circuit.add_component(resistor("R2", "N2", "0"));

        let nodes: Vec<&str> = circuit.nodes().iter().map(String::as_str).collect();
        assert_eq!(nodes, vec!["0", "N1", "N2"]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut circuit = Circuit::new("1");
        circuit.add_component(resistor("R1", "N1", "N2"));

        let err = circuit.remove_component(3).unwrap_err();
        assert_eq!(err, CircuitError::IndexOutOfRange { index: 3, len: 1 });
        assert_eq!(circuit.len(), 1);
    }

    #[test]
    fn test_remove_leaf_of_chain_prunes_unused_node() {
        let mut circuit = Circuit::with_components(
            "1",
            [resistor("R1", "N1", "N2"), resistor("R2", "N2", "N3")],
        );

        let removal = circuit.remove_component(0).unwrap();

        assert_eq!(
            removal.strategy,
            RemovalStrategy::Short {
                kept: "N2".to_string(),
                merged: "N1".to_string(),
            }
        );
        assert_eq!(circuit.components()[0].ports(), ["N2", "N3"]);
        assert!(!circuit.nodes().contains("N1"));
        assert_eq!(circuit.nodes(), &port_union(&circuit));
    }

    #[test]
    fn test_remove_series_element_shorts_anode_into_cathode() {
        let v = Component::new(ComponentKind::VoltageSource, "V1", ["N1", "0"], [5.0]).unwrap();
        let mut circuit = Circuit::with_components(
            "1",
            [
                v,
                resistor("R1", "N1", "N2"),
                resistor("R2", "N2", "N3"),
                resistor("R3", "N3", "0"),
            ],
        );

        let removal = circuit.remove_component(2).unwrap();

        assert_eq!(
            removal.strategy,
            RemovalStrategy::Short {
                kept: "N2".to_string(),
                merged: "N3".to_string(),
            }
        );
        assert_eq!(removal.component.ports(), ["N2", "N3"]);
        let (_, r3) = circuit.find("R3").unwrap();
        assert_eq!(r3.ports(), ["N2", "0"]);
        assert!(!circuit.nodes().contains("N3"));
    }

    #[test]
    fn test_remove_parallel_element_opens() {
        let v = Component::new(ComponentKind::VoltageSource, "V1", ["N1", "0"], [5.0]).unwrap();
        let mut circuit = Circuit::with_components(
            "1",
            [v, resistor("R1", "N1", "0"), resistor("R2", "N1", "0")],
        );

        let removal = circuit.remove_component(1).unwrap();

        assert_eq!(removal.strategy, RemovalStrategy::Open);
        let (_, r2) = circuit.find("R2").unwrap();
        assert_eq!(r2.ports(), ["N1", "0"]);
        assert_eq!(circuit.nodes(), &port_union(&circuit));
    }

    #[test]
    fn test_ground_survives_short() {
        let mut circuit = Circuit::with_components(
            "2",
            [resistor("R1", "N1", "0"), resistor("R2", "N1", "N4")],
        );
        circuit.add_component(resistor("R3", "N4", "0"));
        let removal = circuit.remove_component(0).unwrap();
        match removal.strategy {
            RemovalStrategy::Short { kept, .. } => assert_eq!(kept, GROUND),
            other => panic!("expected short, got {:?}", other),
        }
        assert!(circuit.nodes().contains(GROUND));
    }

    #[test]
    fn test_three_port_removal_is_open() {
        let q = Component::new(ComponentKind::Npn, "Q1", ["C", "B", "E"], []).unwrap();
        let mut circuit = Circuit::with_components(
            "1",
            [q, resistor("RC", "VCC", "C"), resistor("RE", "E", "0")],
        );

        let removal = circuit.remove_component(0).unwrap();

        assert_eq!(removal.strategy, RemovalStrategy::Open);
        assert!(!circuit.nodes().contains("B"));
        assert!(circuit.nodes().contains("C"));
        assert_eq!(circuit.nodes(), &port_union(&circuit));
    }

    #[test]
    fn test_merge_nodes() {
        let mut circuit = Circuit::with_components(
            "1",
            [resistor("R1", "A", "B"), resistor("R2", "B", "C")],
        );

        circuit.merge_nodes("A", "C").unwrap();
        assert_eq!(circuit.components()[1].ports(), ["B", "A"]);
        assert!(!circuit.nodes().contains("C"));

        assert_eq!(
            circuit.merge_nodes("A", "Z"),
            Err(CircuitError::UnknownNode("Z".to_string()))
        );
    }

    #[test]
    fn test_json_roundtrip_rebuilds_nodes() {
        let circuit = Circuit::with_components(
            "7",
            [resistor("R1", "N1", "N2"), resistor("R2", "N2", "0")],
        );
        let json = serde_json::to_string(&circuit).unwrap();
        let back: Circuit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, circuit);

        let sparse: Circuit =
            serde_json::from_str(r#"{"id":"8","components":[{"kind":"diode","name":"D1","ports":["A","K"]}]}"#)
                .unwrap();
        assert_eq!(sparse.nodes().len(), 2);
    }

    #[test]
    fn test_describe_concatenates() {
        let circuit = Circuit::with_components(
            "1",
            [resistor("R1", "N1", "N2"), resistor("R2", "N2", "0")],
        );
        let text = circuit.describe();
        assert!(text.contains("Resistor R1"));
        assert!(text.contains("Resistor R2"));
        assert_eq!(circuit.to_string(), text);
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(CircuitId::generate(), CircuitId::generate());
    }

    #[test]
    fn test_id_parse_rejects_path_escapes() {
        assert_eq!(CircuitId::parse("Amp_3-b").unwrap().as_str(), "Amp_3-b");
        for bad in ["", "..", "../x", "a/b", r"a\b", "x..y"] {
            assert_eq!(CircuitId::parse(bad), Err(CircuitError::InvalidId(bad.to_string())), "{bad}");
        }
        assert!(CircuitId::generate().ensure_path_safe().is_ok());
        assert!(CircuitId::new("../x").ensure_path_safe().is_err());

        assert!(serde_json::from_str::<Circuit>(r#"{"id":"../x","components":[]}"#).is_err());
        assert_eq!(serde_json::to_string(&CircuitId::new("7")).unwrap(), r#""7""#);
    }
}
