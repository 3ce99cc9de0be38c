//! Measurement Log Decoder
//!
//! Turns simulator log text into typed measurement records. Markers are
//! located by name; anything that cannot be found or parsed becomes `None`
//! in the record and is logged at debug level. Only an unreadable log
//! encoding is an error.

pub mod ac;
pub mod log;
pub mod op;
pub mod record;
pub mod transient;

pub use ac::AcMeasurements;
pub use self::log::{decode_log_bytes, encode_utf16le, FAILED_TOKEN};
pub use op::{voltage_sources_from_netlist, OperatingPointMeasurements};
pub use record::MeasurementRecord;
pub use transient::{TransientMeasurements, TransientSample, TransientTrace, RESULT_MARKER};

use thiserror::Error;

use crate::sim::Analysis;

/// A metric that could not be read from the log
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasurementError {
    #[error("Measurement '{metric}' unavailable: {reason}")]
    Unavailable { metric: String, reason: String },
}

impl MeasurementError {
    pub fn unavailable(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        MeasurementError::Unavailable {
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogDecodeError {
    #[error("Malformed log encoding: {0}")]
    MalformedEncoding(String),
}

/// Degrade an unavailable metric to `None`
pub(crate) fn available(result: Result<f64, MeasurementError>) -> Option<f64> {
    result
        .map_err(|err| tracing::debug!("{}", err))
        .ok()
}

/// Log decoder
pub struct LogDecoder;

impl LogDecoder {
    /// Decode log text for the analysis that produced it.
    ///
    /// `netlist` is the circuit netlist the simulator ran; the operating
    /// point decoder reads source voltages from it.
    pub fn decode(log: &str, analysis: &Analysis, netlist: &str) -> MeasurementRecord {
        match analysis {
            Analysis::Transient { frequency, .. } => {
                let trace = TransientTrace::parse(log).unwrap_or_else(|err| {
                    tracing::debug!("{}", err);
                    TransientTrace::default()
                });
                MeasurementRecord::Transient(TransientMeasurements::from_trace(trace, *frequency))
            }
            Analysis::Ac { .. } => MeasurementRecord::Ac(AcMeasurements::parse(log)),
            Analysis::OperatingPoint => {
                MeasurementRecord::OperatingPoint(OperatingPointMeasurements::parse(log, netlist))
            }
        }
    }

    /// Decode raw log bytes, then their text
    pub fn decode_bytes(
        bytes: &[u8],
        analysis: &Analysis,
        netlist: &str,
    ) -> Result<MeasurementRecord, LogDecodeError> {
        let log = decode_log_bytes(bytes)?;
        Ok(Self::decode(&log, analysis, netlist))
    }
}
