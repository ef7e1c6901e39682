//! Thread counts and static work partitioning.
//!
//! Simulation backends process disjoint index ranges of the flat neuron and
//! synapse arrays in parallel. Ranges are fixed once the network is built,
//! so they can be computed up front with [`partition_ranges`].

use crate::error::{CorticoreError, Result};
use rayon::prelude::*;
use std::ops::Range;

/// Number of worker threads to use for each class of task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetThreads {
    /// Neuron-level updates; linear in memory, scales well
    pub neurons: usize,
    /// Spike sending; sparse and bandwidth bound, keep low
    pub send_spike: usize,
    /// Synapse-level updates; large but linear, medium
    pub syn_ca: usize,
}

impl Default for NetThreads {
    fn default() -> Self {
        Self {
            neurons: 1,
            send_spike: 1,
            syn_ca: 1,
        }
    }
}

impl NetThreads {
    /// Heuristic thread counts for a network of the given size.
    ///
    /// Every count is capped by the number of threads in the global rayon
    /// pool and is at least one.
    pub fn set_defaults(&mut self, n_neurons: usize, n_paths: usize) {
        let max_procs = rayon::current_num_threads().max(1);
        *self = Self::heuristic(max_procs, n_neurons, n_paths);
    }

    pub(crate) fn heuristic(max_procs: usize, n_neurons: usize, n_paths: usize) -> Self {
        let neuron_heur = n_neurons.div_ceil(500).max(1);
        let syn_heur = n_neurons.div_ceil(1000).max(1);
        let path_min_thr = n_paths.max(1).min(4);
        Self {
            neurons: max_procs.min(neuron_heur),
            send_spike: max_procs.min(syn_heur),
            syn_ca: max_procs.min(path_min_thr),
        }
    }

    /// Set thread counts explicitly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if any count is zero; nothing is changed.
    pub fn set(&mut self, neurons: usize, send_spike: usize, syn_ca: usize) -> Result<()> {
        if neurons < 1 || send_spike < 1 || syn_ca < 1 {
            return Err(CorticoreError::InvalidParameter(format!(
                "NetThreads: all values must be >= 1, got: {}, {}, {}",
                neurons, send_spike, syn_ca
            )));
        }
        self.neurons = neurons;
        self.send_spike = send_spike;
        self.syn_ca = syn_ca;
        Ok(())
    }
}

/// Split `[0, total)` into at most `n_threads` contiguous, disjoint ranges.
///
/// Every range but the last holds `ceil(total / n_threads)` items.
/// `n_threads` of zero is treated as one; `total` of zero gives no ranges.
pub fn partition_ranges(total: usize, n_threads: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let per = total.div_ceil(n_threads.max(1));
    (0..total)
        .step_by(per)
        .map(|st| st..(st + per).min(total))
        .collect()
}

/// Run `fun` over `[0, total)` split by [`partition_ranges`].
///
/// With a single range the call stays on the current thread.
pub fn parallel_run<F>(total: usize, n_threads: usize, fun: F)
where
    F: Fn(Range<usize>) + Send + Sync,
{
    let ranges = partition_ranges(total, n_threads);
    if ranges.len() <= 1 {
        ranges.into_iter().for_each(fun);
    } else {
        ranges.into_par_iter().for_each(fun);
    }
}
