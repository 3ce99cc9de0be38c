//! Netlist Writer
//!
//! Layout of an encoded circuit:
//!
//! ```text
//! *Circuit # {id}
//!
//! *MODEL DEFINITIONS
//! .model 2N2222 NPN(...)
//! .model 1N4148 D(...)
//! .model 2N3906 PNP(...)
//! *NETLIST DESCRIPTION
//! {one line per component}
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::circuit::{Circuit, CircuitId};

/// Fixed model library shipped with every netlist
pub const MODEL_DEFINITIONS: [&str; 3] = [
    ".model 2N2222 NPN(IS=1E-14 VAF=100 BF=200 IKF=0.3 XTB=1.5 BR=3 CJC=8E-12 CJE=25E-12 TR=100E-9 TF=400E-12 ITF=1 VTF=2 XTF=3 RB=10 RC=.3 RE=.2 Vceo=30 Icrating=800m mfg=N)",
    ".model 1N4148 D(Is=2.52n Rs=.568 N=1.752 Cjo=4p M=.4 tt=20n Iave=200m Vpk=75 mfg=OnSemi type=silicon)",
    ".model 2N3906 PNP(Is=1E-14 VAF=100 BF=200 IKF=0.4 XTB=1.5 BR=4 CJC=4.5E-12 CJE=10E-12 RB=20 RC=0.1 RE=0.1 TR=250E-9 TF=350E-12 ITF=1 VTF=2 XTF=3 Vceo=40 Icrating=200m mfg=NXP)",
];

/// Comment line that opens the model block
pub const MODEL_HEADER: &str = "*MODEL DEFINITIONS";
/// Comment line that opens the component block
pub const NETLIST_HEADER: &str = "*NETLIST DESCRIPTION";

/// File stem shared by every artifact of a circuit (`Circuit{id}`)
pub fn file_stem(id: &CircuitId) -> String {
    format!("Circuit{}", id)
}

/// Per-circuit scratch directory under `root`.
///
/// Fails with `InvalidInput` for an id that would leave `root`.
pub fn circuit_dir(root: &Path, id: &CircuitId) -> io::Result<PathBuf> {
    id.ensure_path_safe()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    Ok(root.join(file_stem(id)))
}

/// Netlist serializer
pub struct NetlistWriter;

impl NetlistWriter {
    /// Encode a circuit. Pure: identical component order gives identical text.
    pub fn encode(circuit: &Circuit) -> String {
        let mut out = String::new();
        out.push_str(&format!("*Circuit # {}\n\n", circuit.id()));

        out.push_str(MODEL_HEADER);
        out.push('\n');
        for model in MODEL_DEFINITIONS {
            out.push_str(model);
            out.push('\n');
        }

        out.push_str(NETLIST_HEADER);
        out.push('\n');
        for component in circuit.components() {
            out.push_str(&component.to_netlist_line());
            out.push('\n');
        }

        out
    }

    /// Write `{root}/Circuit{id}/Circuit{id}.cir`, creating the directory
    pub fn export(circuit: &Circuit, root: &Path) -> io::Result<PathBuf> {
        let dir = circuit_dir(root, circuit.id())?;
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.cir", file_stem(circuit.id())));
        fs::write(&path, Self::encode(circuit))?;

        tracing::debug!("Exported netlist for circuit {} to {}", circuit.id(), path.display());
        Ok(path)
    }
}
