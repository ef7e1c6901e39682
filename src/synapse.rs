//! Synapse records and initial weight parameters.
//!
//! All synapses of a network live in one flat array. Each pathway owns a
//! contiguous run of it, stored in receive order: the synapses onto
//! receiving unit 0 first, then unit 1, and so on.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One weighted connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Synapse {
    /// Network-global index of the sending neuron
    pub send_index: u32,
    /// Network-global index of the receiving neuron
    pub recv_index: u32,
    /// Owning pathway
    pub path_index: u32,
    /// Effective weight
    pub wt: f32,
    /// Slowly adapting structural weight
    pub swt: f32,
    /// Linear learned weight
    pub lwt: f32,
}

impl Synapse {
    /// Copy all weight values from `other`, leaving indexes alone.
    #[inline]
    pub fn copy_weights_from(&mut self, other: &Synapse) {
        self.wt = other.wt;
        self.swt = other.swt;
        self.lwt = other.lwt;
    }
}

/// Parameters for initial weight values of a pathway.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwtInitParams {
    /// Share of the initial random weight captured in `swt` (the rest goes to `lwt`)
    pub spct: f32,
    /// Mean initial weight
    pub mean: f32,
    /// Spread of initial weights around the mean
    pub var: f32,
    /// Symmetrize initial weights with the reciprocal pathway
    pub sym: bool,
}

impl Default for SwtInitParams {
    fn default() -> Self {
        Self {
            spct: 0.5,
            mean: 0.5,
            var: 0.25,
            sym: true,
        }
    }
}

impl SwtInitParams {
    /// Zero-mean random deviation within `[-var, var)`.
    pub fn rnd_var<R: Rng>(&self, rng: &mut R) -> f32 {
        self.var * 2.0 * (rng.gen::<f32>() - 0.5)
    }

    /// Draw initial weights into `syn`.
    ///
    /// The drawn value is clipped to `[0, 1]`; `swt` takes `spct` of its
    /// deviation from the mean and `lwt` holds the remainder.
    pub fn init_synapse<R: Rng>(&self, syn: &mut Synapse, rng: &mut R) {
        let wt = (self.mean + self.rnd_var(rng)).clamp(0.0, 1.0);
        syn.wt = wt;
        syn.swt = self.mean + self.spct * (wt - self.mean);
        syn.lwt = wt - syn.swt + self.mean;
    }
}
