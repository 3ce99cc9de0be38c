//! Measurement Record

use serde::{Deserialize, Serialize};

use super::{AcMeasurements, OperatingPointMeasurements, TransientMeasurements};

/// Decoded metrics of one simulation, shaped by the analysis that ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum MeasurementRecord {
    Transient(TransientMeasurements),
    Ac(AcMeasurements),
    OperatingPoint(OperatingPointMeasurements),
}

impl MeasurementRecord {
    /// Scalar metrics by name, in a stable order
    pub fn metrics(&self) -> Vec<(&'static str, Option<f64>)> {
        match self {
            MeasurementRecord::Transient(t) => vec![
                ("peak_to_peak", t.peak_to_peak),
                ("distortion", t.distortion),
            ],
            MeasurementRecord::Ac(ac) => vec![
                ("op_freq_gain", ac.op_freq_gain),
                ("op_freq_phase", ac.op_freq_phase),
                ("cutoff_low", ac.cutoff_low),
                ("cutoff_high", ac.cutoff_high),
                ("unity_gain_freq", ac.unity_gain_freq),
                ("unity_gain_phase", ac.unity_gain_phase),
                ("phase_margin", Some(ac.phase_margin)),
            ],
            MeasurementRecord::OperatingPoint(op) => vec![("dc_power", op.dc_power)],
        }
    }

    /// Look up one metric; `None` when unknown or unmeasured
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics()
            .into_iter()
            .find(|(name, _)| *name == metric)
            .and_then(|(_, value)| value)
    }

    /// True when every metric was measured
    pub fn is_complete(&self) -> bool {
        self.metrics().iter().all(|(_, value)| value.is_some())
    }

    pub fn analysis_name(&self) -> &'static str {
        match self {
            MeasurementRecord::Transient(_) => "transient",
            MeasurementRecord::Ac(_) => "ac",
            MeasurementRecord::OperatingPoint(_) => "operating_point",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_completeness() {
        let record = MeasurementRecord::Ac(AcMeasurements {
            op_freq_gain: Some(20.0),
            ..Default::default()
        });

        assert_eq!(record.get("op_freq_gain"), Some(20.0));
        assert_eq!(record.get("phase_margin"), Some(0.0));
        assert_eq!(record.get("cutoff_low"), None);
        assert_eq!(record.get("no_such_metric"), None);
        assert!(!record.is_complete());
    }

    #[test]
    fn test_json_shape() {
        let record = MeasurementRecord::OperatingPoint(OperatingPointMeasurements {
            dc_power: Some(0.5),
            ..Default::default()
        });
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["analysis"], "operating_point");
        assert_eq!(json["dc_power"], 0.5);
        assert!(record.is_complete());

        let back: MeasurementRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
