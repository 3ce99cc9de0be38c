//! Evaluation facade shared by the CLI and library callers.
//! Encodes a circuit, hands it to a simulation runner and decodes the log.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::circuit::{Circuit, CircuitError, CircuitId};
use crate::config::ConfigError;
use crate::measure::{LogDecodeError, LogDecoder, MeasurementRecord, TransientTrace};
use crate::netlist::{circuit_dir, file_stem, NetlistParseError, NetlistReader};
use crate::sim::{Analysis, AnalysisDirectives, SimulationError, SimulationRunner};

#[derive(Debug, thiserror::Error)]
pub enum CirGraphError {
    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),
    #[error("Netlist error: {0}")]
    Netlist(#[from] NetlistParseError),
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("Log error: {0}")]
    LogDecode(#[from] LogDecodeError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Circuit id {0} appears more than once in the batch")]
    DuplicateCircuitId(CircuitId),
    #[error("Unsupported circuit file {0} (expected .json or .cir)")]
    UnsupportedFormat(PathBuf),
}

/// Outcome of simulating one circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub circuit_id: CircuitId,
    pub analysis: Analysis,
    pub record: MeasurementRecord,
    pub evaluated_at: DateTime<Utc>,
}

impl Evaluation {
    /// Reduce the record to a scalar with a caller-supplied fitness function
    pub fn score<F>(&self, fitness: F) -> f64
    where
        F: FnOnce(&MeasurementRecord) -> f64,
    {
        fitness(&self.record)
    }
}

/// Core API used by the CLI.
pub struct CirGraphCore;

impl CirGraphCore {
    /// Encode, simulate and decode one circuit
    pub async fn evaluate(
        circuit: &Circuit,
        runner: &dyn SimulationRunner,
        analysis: &Analysis,
    ) -> Result<Evaluation, CirGraphError> {
        let directives = AnalysisDirectives::for_analysis(analysis, circuit)?;
        let netlist = circuit.to_netlist();

        let log = runner.run(circuit.id(), &netlist, &directives).await?;
        let record = LogDecoder::decode(&log, analysis, &netlist);
        if !record.is_complete() {
            tracing::debug!(
                "Circuit {}: partial {} record from {}",
                circuit.id(),
                analysis.name(),
                runner.name()
            );
        }

        Ok(Evaluation {
            circuit_id: circuit.id().clone(),
            analysis: analysis.clone(),
            record,
            evaluated_at: Utc::now(),
        })
    }

    /// Evaluate distinct circuits concurrently.
    ///
    /// Ids must be unique since runs are addressed by id on disk. One failed
    /// simulation does not affect the others.
    pub async fn evaluate_all(
        circuits: &[Circuit],
        runner: &dyn SimulationRunner,
        analysis: &Analysis,
    ) -> Result<Vec<Result<Evaluation, CirGraphError>>, CirGraphError> {
        let mut seen = HashSet::new();
        for circuit in circuits {
            if !seen.insert(circuit.id()) {
                return Err(CirGraphError::DuplicateCircuitId(circuit.id().clone()));
            }
        }

        tracing::info!("Evaluating {} circuits with {}", circuits.len(), runner.name());
        let results = join_all(
            circuits
                .iter()
                .map(|circuit| Self::evaluate(circuit, runner, analysis)),
        )
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!("{} of {} evaluations failed", failed, circuits.len());
        }
        Ok(results)
    }

    /// Load a circuit from `.json` or `.cir`
    pub fn load_circuit(path: &Path) -> Result<Circuit, CirGraphError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Ok(serde_json::from_str(&text)?),
            Some("cir") | Some("net") | Some("sp") => Ok(NetlistReader::parse(&text)?),
            _ => Err(CirGraphError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Save a circuit as `.json` or `.cir`, chosen by extension
    pub fn save_circuit(circuit: &Circuit, path: &Path) -> Result<(), CirGraphError> {
        let text = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(circuit)?,
            Some("cir") | Some("net") | Some("sp") => circuit.to_netlist(),
            _ => return Err(CirGraphError::UnsupportedFormat(path.to_path_buf())),
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Write `{root}/Circuit{id}/Circuit{id}trans.csv`
    pub fn write_transient_csv(
        root: &Path,
        id: &CircuitId,
        trace: &TransientTrace,
    ) -> Result<PathBuf, CirGraphError> {
        let dir = circuit_dir(root, id)?;
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}trans.csv", file_stem(id)));
        std::fs::write(&path, trace.to_csv())?;
        Ok(path)
    }
}
