//! Pools - inhibition and aggregation groups within a layer.
//!
//! Pool 0 of every layer spans the whole layer. A 4-D layer additionally
//! gets one sub-pool per outer grid cell, numbered 1.. in row-major order;
//! those ranges partition the layer's neurons exactly.

use crate::error::{CorticoreError, Result};
use crate::neuron::Neuron;
use crate::shape::Shape;
use serde::{Deserialize, Serialize};

/// A `[start, end)` range of layer-relative neuron indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// First neuron, layer-relative
    pub start: u32,
    /// One past the last neuron, layer-relative
    pub end: u32,
    /// True for pool 0, which covers the whole layer
    pub is_layer_pool: bool,
    /// Owning layer
    pub lay_index: u32,
    /// Index in the network-global pool array
    pub pool_index: u32,
}

impl Pool {
    /// Number of neurons in the pool.
    #[inline]
    pub fn n(&self) -> u32 {
        self.end - self.start
    }

    /// Whether layer-relative neuron `ni` falls in this pool.
    #[inline]
    pub fn contains(&self, ni: u32) -> bool {
        ni >= self.start && ni < self.end
    }
}

/// Compute the pools for a layer of the given shape.
///
/// Index 0 is the layer pool `[0, len)`. For 4-D shapes the sub-pool for
/// outer cell `(py, px)` runs from the offset of `(py, px, 0, 0)` through the
/// offset of `(py, px, uy-1, ux-1)` inclusive.
///
/// # Errors
///
/// Returns `ZeroUnits` if the shape holds no units.
pub fn build_pools(layer: &str, lay_index: u32, shape: &Shape) -> Result<Vec<Pool>> {
    let nn = shape.len();
    if nn == 0 {
        return Err(CorticoreError::ZeroUnits {
            layer: layer.to_string(),
            dims: shape.dims().to_vec(),
        });
    }
    let mut pools = Vec::with_capacity(1 + shape.n_sub_pools());
    pools.push(Pool {
        start: 0,
        end: nn as u32,
        is_layer_pool: true,
        lay_index,
        pool_index: 0,
    });
    if shape.is_4d() {
        let (py_n, px_n, uy, ux) = (shape.dim(0), shape.dim(1), shape.dim(2), shape.dim(3));
        for py in 0..py_n {
            for px in 0..px_n {
                let start = shape.offset(&[py, px, 0, 0]) as u32;
                let end = shape.offset(&[py, px, uy - 1, ux - 1]) as u32 + 1;
                pools.push(Pool {
                    start,
                    end,
                    is_layer_pool: false,
                    lay_index,
                    pool_index: 0,
                });
            }
        }
    }
    Ok(pools)
}

/// Record each neuron's sub-pool number.
///
/// `neurons` is the layer's slice of the global neuron array. Neurons of a
/// 2-D layer stay in pool 0.
pub fn stamp_sub_pools(pools: &[Pool], neurons: &mut [Neuron]) {
    for nrn in neurons.iter_mut() {
        nrn.sub_pool = 0;
    }
    for (pi, pl) in pools.iter().enumerate().skip(1) {
        for nrn in &mut neurons[pl.start as usize..pl.end as usize] {
            nrn.sub_pool = pi as u32;
        }
    }
}
