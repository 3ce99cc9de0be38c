//! Circuit Model
//!
//! Typed components, the circuit graph that owns them, and the gaussian
//! parameter mutation used by the search.

pub mod component;
pub mod graph;
pub mod mutation;

use thiserror::Error;

pub use component::{Component, ComponentKind};
pub use graph::{Circuit, CircuitId, Removal, RemovalStrategy, GROUND};
pub use mutation::{gaussian_step, MutationParams, Mutator};

/// Errors raised by structural edits and component construction.
///
/// These are caller contract violations and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CircuitError {
    #[error(
        "{kind} '{name}' needs {expected_ports} ports and {expected_params} params, got {ports} and {params}"
    )]
    InvalidArity {
        kind: ComponentKind,
        name: String,
        expected_ports: usize,
        ports: usize,
        expected_params: usize,
        params: usize,
    },

    #[error("Component index {index} out of range for circuit with {len} components")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Node '{0}' is not part of the circuit")]
    UnknownNode(String),

    #[error("Invalid mutation parameters: {0}")]
    InvalidMutation(String),

    #[error("Invalid circuit id '{0}': must be non-empty without path separators or '..'")]
    InvalidId(String),
}
