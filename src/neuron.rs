//! Per-neuron index record stored in the network-global neuron array.

use serde::{Deserialize, Serialize};

/// Structural indexes for one neuron.
///
/// Simulation state lives in separate arrays owned by the execution
/// backend; this record only says where the neuron belongs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct Neuron {
    /// Owning layer
    pub lay_index: u32,
    /// Index within the owning layer
    pub neur_index: u32,
    /// Sub-pool within the layer (0 = whole layer only)
    pub sub_pool: u32,
}
