//! Integration tests for the cirgraph library

use cirgraph::prelude::*;
use cirgraph::{NetlistReader, RemovalStrategy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

const NODE_POOL: [&str; 6] = ["0", "N1", "N2", "N3", "N4", "N5"];

fn random_component(rng: &mut StdRng, serial: usize) -> Component {
    let kind = *ComponentKind::ALL.choose(rng).unwrap();
    let ports: Vec<&str> = NODE_POOL
        .choose_multiple(rng, kind.port_count())
        .copied()
        .collect();
    let params: Vec<f64> = (0..kind.param_count())
        .map(|_| rng.gen_range(1e-6..1e4))
        .collect();
    let name = format!("{}{}", kind.designator(), serial);
    Component::new(kind, name, ports, params).unwrap()
}

fn port_union(circuit: &Circuit) -> BTreeSet<String> {
    circuit
        .components()
        .iter()
        .flat_map(|c| c.ports().iter().cloned())
        .collect()
}

#[test]
fn test_nodes_track_port_union_under_random_edits() {
    let mut rng = StdRng::seed_from_u64(2024);

    for round in 0..50 {
        let mut circuit = Circuit::new(CircuitId::from(round as u64));
        for step in 0..40 {
            if circuit.is_empty() || rng.gen_bool(0.6) {
                circuit.add_component(random_component(&mut rng, step));
            } else {
                let index = rng.gen_range(0..circuit.len());
                let removal = circuit.remove_component(index).unwrap();

                if let RemovalStrategy::Short { kept, merged } = &removal.strategy {
                    assert_ne!(kept, merged);
                    assert!(
                        circuit.components().iter().all(|c| !c.connects(merged)),
                        "round {round} step {step}: {merged} still referenced"
                    );
                }
            }

            assert_eq!(circuit.nodes(), &port_union(&circuit), "round {round} step {step}");
        }
    }
}

#[test]
fn test_short_removal_scenario() {
    let mut circuit = Circuit::with_components(
        "s",
        [
            Component::new(ComponentKind::Resistor, "R1", ["N1", "N2"], [1000.0]).unwrap(),
            Component::new(ComponentKind::Resistor, "R2", ["N2", "N3"], [1000.0]).unwrap(),
        ],
    );

    let removal = circuit.remove_component(0).unwrap();

    assert_eq!(
        removal.strategy,
        RemovalStrategy::Short {
            kept: "N2".into(),
            merged: "N1".into()
        }
    );
    assert!(!circuit.nodes().contains("N1"));
    assert_eq!(circuit.components()[0].ports(), ["N2", "N3"]);
}

#[test]
fn test_netlist_round_trip_all_kinds() {
    let mut rng = StdRng::seed_from_u64(5);
    let components: Vec<Component> = (0..60).map(|i| random_component(&mut rng, i)).collect();
    let circuit = Circuit::with_components("rt", components);

    let parsed = NetlistReader::parse(&circuit.to_netlist()).unwrap();

    assert_eq!(parsed.id(), circuit.id());
    assert_eq!(parsed.len(), circuit.len());
    for (a, b) in circuit.components().iter().zip(parsed.components()) {
        assert_eq!(a.kind(), b.kind());
        assert_eq!(a.name(), b.name());
        assert_eq!(a.ports(), b.ports());
        assert_eq!(a.params(), b.params());
    }
}

#[test]
fn test_mutation_probability_bounds() {
    let mut rng = StdRng::seed_from_u64(77);
    let base: Vec<Component> = (0..30).map(|i| random_component(&mut rng, i)).collect();

    // p = 0 is a no-op
    for component in &base {
        let mut copy = component.clone();
        copy.mutate(3.0, 0.0).unwrap();
        assert_eq!(&copy, component);
    }

    // p = 1 stays inside the pre-mutation band
    let sigma = 0.5;
    for component in &base {
        let mut copy = component.clone();
        copy.mutate(sigma, 1.0).unwrap();
        for (old, new) in component.params().iter().zip(copy.params()) {
            assert!(*new >= 0.0);
            assert!(*new >= (old - 5.0 * sigma).max(0.0));
            assert!(*new <= old + 5.0 * sigma);
        }
    }
}

#[test]
fn test_seeded_circuit_mutation_is_reproducible() {
    let circuit = CirGraphCore::load_circuit(&fixture_path("divider.json")).unwrap();
    let params = MutationParams::new(50.0, 1.0).unwrap();

    let mut a = circuit.clone();
    let mut b = circuit.clone();
    Mutator::new(params, Some(1)).mutate_circuit(&mut a);
    Mutator::new(params, Some(1)).mutate_circuit(&mut b);

    assert_eq!(a, b);
    assert_ne!(a, circuit);
    assert_eq!(a.nodes(), circuit.nodes());
}

#[test]
fn test_load_fixture_formats() {
    let divider = CirGraphCore::load_circuit(&fixture_path("divider.json")).unwrap();
    assert_eq!(divider.id().as_str(), "10");
    assert_eq!(divider.len(), 4);
    assert_eq!(divider.voltage_sources().count(), 1);

    let amplifier = CirGraphCore::load_circuit(&fixture_path("amplifier.cir")).unwrap();
    assert_eq!(amplifier.id().as_str(), "2");
    assert_eq!(amplifier.len(), 6);
    let (_, q1) = amplifier.find("Q1").unwrap();
    assert_eq!(q1.kind(), ComponentKind::Npn);
}

#[test]
fn test_invalid_json_component_rejected() {
    let json = r#"{"id": "bad", "components": [{"kind": "resistor", "name": "R1", "ports": ["N1"], "params": [1.0]}]}"#;
    let err = serde_json::from_str::<Circuit>(json).unwrap_err();
    assert!(err.to_string().contains("R1"));
}

#[test]
fn test_escaping_ids_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();

    let json = dir.path().join("escape.json");
    std::fs::write(&json, r#"{"id": "../outside", "components": []}"#).unwrap();
    assert!(matches!(CirGraphCore::load_circuit(&json), Err(CirGraphError::Json(_))));

    let cir = dir.path().join("escape.cir");
    std::fs::write(&cir, "*Circuit # ../outside
R1 N1 0 1.0
").unwrap();
    assert!(matches!(CirGraphCore::load_circuit(&cir), Err(CirGraphError::Netlist(_))));
}
