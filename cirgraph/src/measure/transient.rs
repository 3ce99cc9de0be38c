//! Transient Waveform Metrics
//!
//! The stepped `.meas tran result find V(node) at = T` statement makes the
//! simulator print one row per time step under a `Measurement: result`
//! heading. Rows are `step value time`, or `time value` without stepping.
//!
//! The distortion figure is a model-fit residual against an ideal sine of
//! the same swing, frequency and phase. It is not total harmonic distortion.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::MeasurementError;

/// Heading that opens the sampled waveform block
pub const RESULT_MARKER: &str = "Measurement: result";

/// One sampled point of the output waveform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransientSample {
    /// Step index, present when the measurement was swept with `.step`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    pub time: f64,
    pub value: f64,
}

impl TransientSample {
    fn from_row(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line
            .split(|c: char| c == '\t' || c == ' ' || c == ',')
            .filter(|f| !f.is_empty())
            .collect();

        match fields.as_slice() {
            [step, value, time, ..] => Some(Self {
                step: Some(step.parse().ok()?),
                time: time.parse().ok()?,
                value: value.parse().ok()?,
            }),
            [time, value] => Some(Self {
                step: None,
                time: time.parse().ok()?,
                value: value.parse().ok()?,
            }),
            _ => None,
        }
    }
}

/// Sampled output waveform in simulator order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransientTrace {
    pub samples: Vec<TransientSample>,
}

impl TransientTrace {
    pub fn new(samples: Vec<TransientSample>) -> Self {
        Self { samples }
    }

    /// Read the rows following [`RESULT_MARKER`].
    ///
    /// The column heading is skipped and reading stops at the first blank,
    /// short or non-numeric row. Some simulator builds interleave an empty
    /// line between rows; that layout is detected and read with a stride of 2.
    pub fn parse(log: &str) -> Result<Self, MeasurementError> {
        if !log.lines().any(|line| line.trim() == RESULT_MARKER) {
            return Err(MeasurementError::unavailable(
                "transient",
                format!("'{}' not found in log", RESULT_MARKER),
            ));
        }

        let mut body: Vec<&str> = log
            .lines()
            .skip_while(|line| line.trim() != RESULT_MARKER)
            .skip(1)
            .collect();
        if body
            .first()
            .map_or(false, |line| TransientSample::from_row(line).is_none() && !line.trim().is_empty())
        {
            body.remove(0);
        }

        let interleaved = body.len() > 2
            && TransientSample::from_row(body[0]).is_some()
            && body[1].trim().is_empty()
            && TransientSample::from_row(body[2]).is_some();
        let stride = if interleaved { 2 } else { 1 };

        let samples = body
            .iter()
            .step_by(stride)
            .map_while(|line| TransientSample::from_row(line))
            .collect();

        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Staging CSV, one row per sample in the log's column order
    pub fn to_csv(&self) -> String {
        self.samples
            .iter()
            .map(|s| match s.step {
                Some(step) => format!("{},{},{}\n", step, s.value, s.time),
                None => format!("{},{}\n", s.time, s.value),
            })
            .collect()
    }

    /// Samples used for metrics: the final terminal-zero artifact is dropped
    /// and the series is de-meaned.
    fn centered(&self) -> Option<Vec<(f64, f64)>> {
        let usable = self.samples.len().checked_sub(1)?;
        if usable < 2 {
            return None;
        }

        let points = &self.samples[..usable];
        let mean = points.iter().map(|s| s.value).sum::<f64>() / usable as f64;
        Some(points.iter().map(|s| (s.time, s.value - mean)).collect())
    }

    /// Max minus min of the de-meaned waveform
    pub fn peak_to_peak(&self) -> Option<f64> {
        let centered = self.centered()?;
        Some(swing(&centered))
    }

    /// Mean absolute residual against `A·sin(ωt + φ)` normalized by the swing,
    /// with `A = p2p / 2`, `ω = 2πf` and `φ` placed at the first zero crossing.
    pub fn distortion(&self, frequency: f64) -> Option<f64> {
        let centered = self.centered()?;
        let p2p = swing(&centered);
        if p2p <= 0.0 {
            return None;
        }

        let omega = 2.0 * PI * frequency;
        let phase = match first_zero_crossing(&centered) {
            Some((t0, true)) => -omega * t0,
            Some((t0, false)) => PI - omega * t0,
            None => 0.0,
        };
        let amplitude = p2p / 2.0;

        let residual = centered
            .iter()
            .map(|&(t, v)| (v - amplitude * (omega * t + phase).sin()).abs())
            .sum::<f64>()
            / centered.len() as f64;

        Some(residual / p2p)
    }
}

fn swing(points: &[(f64, f64)]) -> f64 {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| (lo.min(v), hi.max(v)));
    max - min
}

/// Time of the first sign change and whether it rises, linearly interpolated
fn first_zero_crossing(points: &[(f64, f64)]) -> Option<(f64, bool)> {
    points.windows(2).find_map(|pair| {
        let (t1, v1) = pair[0];
        let (t2, v2) = pair[1];
        let rising = v1 < 0.0 && v2 >= 0.0;
        let falling = v1 > 0.0 && v2 <= 0.0;
        if !(rising || falling) {
            return None;
        }
        let t0 = t1 + (t2 - t1) * (-v1) / (v2 - v1);
        Some((t0, rising))
    })
}

/// Transient metrics for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransientMeasurements {
    pub peak_to_peak: Option<f64>,
    pub distortion: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<TransientSample>,
}

impl TransientMeasurements {
    pub fn from_trace(trace: TransientTrace, frequency: f64) -> Self {
        Self {
            peak_to_peak: trace.peak_to_peak(),
            distortion: trace.distortion(frequency),
            samples: trace.samples,
        }
    }

    pub fn trace(&self) -> TransientTrace {
        TransientTrace::new(self.samples.clone())
    }
}
