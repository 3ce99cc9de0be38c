use cirgraph::measure::encode_utf16le;
use cirgraph::prelude::*;
use cirgraph::NetlistReader;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn ladder(stages: usize) -> Circuit {
    let mut circuit = Circuit::new("bench");
    for i in 0..stages {
        let a = format!("N{}", i);
        let b = format!("N{}", i + 1);
        circuit.add_component(
            Component::new(ComponentKind::Resistor, format!("R{}", i), [a.clone(), b.clone()], [1000.0])
                .unwrap(),
        );
        circuit.add_component(
            Component::new(ComponentKind::Capacitor, format!("C{}", i), [b, "0".to_string()], [1e-9])
                .unwrap(),
        );
    }
    circuit
}

fn bench_netlist_codec(c: &mut Criterion) {
    let circuit = ladder(200);
    let text = circuit.to_netlist();

    c.bench_function("encode_netlist", |b| {
        b.iter(|| black_box(&circuit).to_netlist());
    });
    c.bench_function("parse_netlist", |b| {
        b.iter(|| NetlistReader::parse(black_box(&text)));
    });
}

fn bench_decode_logs(c: &mut Criterion) {
    let transient = std::fs::read(fixture_path("transient.log")).unwrap();
    let analysis = Analysis::Transient {
        frequency: 1000.0,
        input_node: "N1".into(),
        output_node: "N2".into(),
    };
    c.bench_function("decode_transient_log", |b| {
        b.iter(|| LogDecoder::decode_bytes(black_box(&transient), &analysis, ""));
    });

    let op_log = encode_utf16le("i_v1: i(v1)=-0.001\n");
    c.bench_function("decode_operating_point_log", |b| {
        b.iter(|| LogDecoder::decode_bytes(black_box(&op_log), &Analysis::OperatingPoint, "V1 N1 0 5"));
    });
}

fn bench_remove_component(c: &mut Criterion) {
    let circuit = ladder(200);
    c.bench_function("remove_component", |b| {
        b.iter(|| {
            let mut copy = circuit.clone();
            copy.remove_component(black_box(100))
        });
    });
}

criterion_group!(benches, bench_netlist_codec, bench_decode_logs, bench_remove_component);
criterion_main!(benches);
