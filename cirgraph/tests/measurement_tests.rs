//! Decoding simulator logs captured as UTF-16LE fixtures

use approx::assert_relative_eq;
use cirgraph::measure::{decode_log_bytes, voltage_sources_from_netlist};
use cirgraph::prelude::*;
use std::path::PathBuf;

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn transient() -> Analysis {
    Analysis::Transient {
        frequency: 1000.0,
        input_node: "N2".into(),
        output_node: "N3".into(),
    }
}

fn ac() -> Analysis {
    Analysis::Ac {
        frequency: 1000.0,
        input_node: "N2".into(),
        output_node: "N3".into(),
    }
}

#[test]
fn test_transient_log() {
    let record = LogDecoder::decode_bytes(&fixture("transient.log"), &transient(), "").unwrap();

    let MeasurementRecord::Transient(tran) = &record else {
        panic!("expected transient record, got {:?}", record);
    };
    assert_eq!(tran.samples.len(), 101);
    assert_eq!(tran.samples[0].step, Some(1));
    assert_relative_eq!(tran.peak_to_peak.unwrap(), 1.0, epsilon = 1e-3);
    assert!(tran.distortion.unwrap() < 0.01);
    assert!(record.is_complete());
}

#[test]
fn test_transient_csv_matches_rows() {
    let log = decode_log_bytes(&fixture("transient.log")).unwrap();
    let trace = cirgraph::TransientTrace::parse(&log).unwrap();
    let csv = trace.to_csv();

    assert_eq!(csv.lines().count(), 101);
    assert!(csv.starts_with("1,1.2,0\n"));
    assert!(csv.ends_with("101,0,0.001\n"));
}

#[test]
fn test_ac_log() {
    let record = LogDecoder::decode_bytes(&fixture("ac_sweep.log"), &ac(), "").unwrap();

    assert_relative_eq!(record.get("op_freq_gain").unwrap(), 19.8);
    assert_relative_eq!(record.get("op_freq_phase").unwrap(), -172.4);
    assert_relative_eq!(record.get("cutoff_low").unwrap(), 15.9155);
    assert_relative_eq!(record.get("cutoff_high").unwrap(), 1.59155e6);
    assert_relative_eq!(record.get("unity_gain_freq").unwrap(), 3.2e7);
    assert_relative_eq!(record.get("phase_margin").unwrap(), 120.0, epsilon = 1e-9);
}

#[test]
fn test_ac_failed_markers_degrade_to_none() {
    let record = LogDecoder::decode_bytes(&fixture("ac_failed.log"), &ac(), "").unwrap();

    assert_eq!(record.get("op_freq_gain"), None);
    assert_eq!(record.get("cutoff_low"), None);
    assert_eq!(record.get("cutoff_high"), None);
    assert_eq!(record.get("unity_gain_freq"), Some(120.0));
    assert_eq!(record.get("phase_margin"), Some(0.0));
    assert!(!record.is_complete());
}

#[test]
fn test_operating_point_log() {
    let netlist = std::fs::read_to_string(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/amplifier.cir"),
    )
    .unwrap();
    assert_eq!(voltage_sources_from_netlist(&netlist), vec![("V1".to_string(), 9.0)]);

    let record =
        LogDecoder::decode_bytes(&fixture("operating_point.log"), &Analysis::OperatingPoint, &netlist).unwrap();
    assert_relative_eq!(record.get("dc_power").unwrap(), 9.0 * 0.00225);
}

#[test]
fn test_wrong_analysis_yields_empty_record() {
    let record = LogDecoder::decode_bytes(&fixture("ac_sweep.log"), &transient(), "").unwrap();
    assert_eq!(record.get("peak_to_peak"), None);
    assert_eq!(record.get("distortion"), None);
}

#[test]
fn test_truncated_utf16_is_an_error() {
    let mut bytes = fixture("operating_point.log");
    bytes.pop();
    assert!(LogDecoder::decode_bytes(&bytes, &Analysis::OperatingPoint, "").is_err());
}
