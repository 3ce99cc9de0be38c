//! LTspice batch-mode runner.
//!
//! Artifacts live in `{work_dir}/Circuit{id}/`. The netlist is written with
//! the directives appended, the simulator runs with `-b`, and afterwards the
//! `.cir` is restored without them and the `.raw` files are removed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;

use super::{AnalysisDirectives, SimulationError, SimulationRunner};
use crate::circuit::CircuitId;
use crate::config::SimulatorConfig;
use crate::measure::decode_log_bytes;
use crate::netlist::{circuit_dir, file_stem};

/// LTspice driver
#[derive(Debug, Clone)]
pub struct LtspiceRunner {
    config: SimulatorConfig,
}

impl LtspiceRunner {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Per-circuit artifact directory
    pub fn circuit_dir(&self, id: &CircuitId) -> std::io::Result<PathBuf> {
        circuit_dir(&self.config.work_dir, id)
    }

    async fn remove_artifact(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

impl Default for LtspiceRunner {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

#[async_trait]
impl SimulationRunner for LtspiceRunner {
    fn name(&self) -> &str {
        "ltspice"
    }

    async fn is_available(&self) -> bool {
        let exe = &self.config.executable;
        if exe.components().count() > 1 {
            return fs::metadata(exe).await.map(|m| m.is_file()).unwrap_or(false);
        }

        match std::env::var_os("PATH") {
            Some(paths) => std::env::split_paths(&paths).any(|dir| dir.join(exe).is_file()),
            None => false,
        }
    }

    async fn run(
        &self,
        circuit_id: &CircuitId,
        netlist: &str,
        directives: &AnalysisDirectives,
    ) -> Result<String, SimulationError> {
        let dir = self.circuit_dir(circuit_id)?;
        let stem = file_stem(circuit_id);
        let cir = dir.join(format!("{}.cir", stem));
        let log = dir.join(format!("{}.log", stem));

        fs::create_dir_all(&dir).await?;
        fs::write(&cir, directives.apply(netlist)).await?;

        tracing::info!(
            "Running {} on {} ({} directives)",
            self.config.executable.display(),
            cir.display(),
            directives.lines().len()
        );

        let output = Command::new(&self.config.executable)
            .arg("-b")
            .arg(format!("{}.cir", stem))
            .current_dir(&dir)
            .output()
            .await;

        // Restore the netlist before reporting anything
        fs::write(&cir, netlist).await?;
        self.remove_artifact(&dir.join(format!("{}.raw", stem))).await;
        self.remove_artifact(&dir.join(format!("{}.op.raw", stem))).await;

        let output = output.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SimulationError::NotAvailable(format!(
                "{}: {}",
                self.config.executable.display(),
                e
            )),
            _ => SimulationError::ExternalToolFailure(format!(
                "failed to launch {}: {}",
                self.config.executable.display(),
                e
            )),
        })?;

        if !output.status.success() {
            return Err(SimulationError::ExternalToolFailure(format!(
                "{} exited with {}: {}",
                self.config.executable.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let bytes = fs::read(&log).await.map_err(|e| {
            SimulationError::ExternalToolFailure(format!("cannot read {}: {}", log.display(), e))
        })?;
        let text = decode_log_bytes(&bytes)
            .map_err(|e| SimulationError::ExternalToolFailure(format!("{}: {}", log.display(), e)))?;

        if !self.config.keep_artifacts {
            self.remove_artifact(&log).await;
        }

        tracing::debug!("Decoded {} chars of log for circuit {}", text.len(), circuit_id);
        Ok(text)
    }
}
