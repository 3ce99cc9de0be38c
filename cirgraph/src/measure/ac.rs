//! AC Sweep Metrics

use serde::{Deserialize, Serialize};

use super::log::{measurement_line, parse_leading_number};
use super::{available, MeasurementError};
use crate::netlist::parse_spice_value;

/// `.meas` names the AC directives emit and this decoder reads back
pub const OP_POINT: &str = "op_point";
pub const CUTOFF_LOW: &str = "cutoff_low";
pub const CUTOFF_HIGH: &str = "cutoff_high";
pub const UNITY_GAIN: &str = "unity_gain";
pub const UNITY_PHASE: &str = "unity_phase";

/// Results of an AC sweep. Unmeasured fields are `None`; the phase margin
/// stays 0 unless both phases it depends on were measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcMeasurements {
    /// Gain in dB at the operating frequency
    pub op_freq_gain: Option<f64>,
    /// Phase in degrees at the operating frequency
    pub op_freq_phase: Option<f64>,
    /// Lower -3dB frequency
    pub cutoff_low: Option<f64>,
    /// Upper -3dB frequency
    pub cutoff_high: Option<f64>,
    pub unity_gain_freq: Option<f64>,
    pub unity_gain_phase: Option<f64>,
    pub phase_margin: f64,
}

impl AcMeasurements {
    pub fn parse(log: &str) -> Self {
        let op_point = measurement_line(log, OP_POINT).and_then(|line| gain_phase(OP_POINT, line));
        let (op_freq_gain, op_freq_phase) = match op_point {
            Ok((gain, phase)) => (Some(gain), Some(phase)),
            Err(err) => {
                tracing::debug!("{}", err);
                (None, None)
            }
        };

        let cutoff_low = available(measurement_line(log, CUTOFF_LOW).and_then(|l| frequency(CUTOFF_LOW, l)));
        let cutoff_high =
            available(measurement_line(log, CUTOFF_HIGH).and_then(|l| frequency(CUTOFF_HIGH, l)));
        let unity_gain_freq =
            available(measurement_line(log, UNITY_GAIN).and_then(|l| frequency(UNITY_GAIN, l)));
        let unity_gain_phase = available(
            measurement_line(log, UNITY_PHASE).and_then(|l| gain_phase(UNITY_PHASE, l).map(|(_, p)| p)),
        );

        let phase_margin = match (unity_gain_phase, op_freq_phase) {
            (Some(unity), Some(op)) => 180.0 - (unity - op).abs(),
            _ => 0.0,
        };

        Self {
            op_freq_gain,
            op_freq_phase,
            cutoff_low,
            cutoff_high,
            unity_gain_freq,
            unity_gain_phase,
            phase_margin,
        }
    }
}

/// Parse the `(gain dB, phase °)` pair of a complex AC result
fn gain_phase(metric: &str, line: &str) -> Result<(f64, f64), MeasurementError> {
    let malformed = || MeasurementError::unavailable(metric, format!("no (dB,°) pair in '{}'", line.trim()));

    let db = line.find("dB,").ok_or_else(malformed)?;
    let open = line[..db].rfind('(').ok_or_else(malformed)?;
    let gain = line[open + 1..db].trim().parse::<f64>().map_err(|_| malformed())?;

    let tail = &line[db + 3..];
    let close = tail.find(')').unwrap_or(tail.len());
    let phase = parse_leading_number(&tail[..close]).ok_or_else(malformed)?;

    Ok((gain, phase))
}

/// Frequency printed after the last `at`/`AT` of a result line
fn frequency(metric: &str, line: &str) -> Result<f64, MeasurementError> {
    let lower = line.to_ascii_lowercase();
    let at = lower
        .rfind(" at ")
        .ok_or_else(|| MeasurementError::unavailable(metric, "no frequency after 'at'"))?;

    line[at + 4..]
        .split_whitespace()
        .next()
        .and_then(parse_spice_value)
        .ok_or_else(|| MeasurementError::unavailable(metric, format!("bad frequency in '{}'", line.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FULL_LOG: &str = "Circuit: *Circuit # 3\n\
        \n\
        gain_peak: MAX(mag(v(n2)))=(26.1dB,0°) FROM 1 TO 1e+08\n\
        op_point: v(n2)=(20.5dB,-170.25°) at 1000\n\
        cutoff_low: mag(v(n2))=gain_peak/sqrt(2) AT 12.5\n\
        cutoff_high: mag(v(n2))=gain_peak/sqrt(2) AT 2.5e+06\n\
        unity_gain: mag(v(n2))=1 AT 4.2e+07\n\
        unity_phase: v(n2)=(-0.001dB,-95.25°) at 4.2e+07\n";

    #[test]
    fn test_full_sweep() {
        let ac = AcMeasurements::parse(FULL_LOG);

        assert_relative_eq!(ac.op_freq_gain.unwrap(), 20.5);
        assert_relative_eq!(ac.op_freq_phase.unwrap(), -170.25);
        assert_relative_eq!(ac.cutoff_low.unwrap(), 12.5);
        assert_relative_eq!(ac.cutoff_high.unwrap(), 2.5e6);
        assert_relative_eq!(ac.unity_gain_freq.unwrap(), 4.2e7);
        assert_relative_eq!(ac.unity_gain_phase.unwrap(), -95.25);
        assert_relative_eq!(ac.phase_margin, 180.0 - 75.0);
    }

    #[test]
    fn test_failed_op_point() {
        let log = "op_point: FAIL'ed\nunity_phase: v(n2)=(0.1dB,-90°) at 1e+06\n";
        let ac = AcMeasurements::parse(log);

        assert_eq!(ac.op_freq_gain, None);
        assert_eq!(ac.op_freq_phase, None);
        assert_eq!(ac.unity_gain_phase, Some(-90.0));
        assert_eq!(ac.phase_margin, 0.0);
    }

    #[test]
    fn test_empty_log() {
        let ac = AcMeasurements::parse("");
        assert_eq!(ac, AcMeasurements::default());
    }

    #[test]
    fn test_malformed_pair() {
        assert!(gain_phase("op_point", "op_point: v(n2)=12.0").is_err());
        assert!(frequency("cutoff_low", "cutoff_low: mag(v(n2))=0.7").is_err());
    }
}
