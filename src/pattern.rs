//! Connectivity patterns.
//!
//! A [`Pattern`] turns a pair of layer shapes into a [`Connections`] record:
//! per-unit connection counts for both directions plus a boolean adjacency
//! mask. The network core never interprets a pattern beyond that record, so
//! any topology (topographic, tiled, learned) can be plugged in.
//!
//! The mask is receive-major: bit `recv_idx * send_len + send_idx` is set
//! when sending unit `send_idx` projects to receiving unit `recv_idx`.
//!
//! # Examples
//!
//! ```
//! use corticore::{Full, Pattern, Shape};
//!
//! let sh = Shape::new_2d(2, 4);
//! let cons = Full::new().connect(&sh, &sh, true);
//! // self connections are excluded on a same-layer pathway by default
//! assert_eq!(cons.n_cons(), 8 * 7);
//! ```

use crate::shape::Shape;
use bitvec::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Output of a pattern: counts for both directions and the adjacency mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Connections {
    /// Number of receiving units each sending unit projects to
    pub send_n: Vec<u32>,
    /// Number of sending units each receiving unit gets input from
    pub recv_n: Vec<u32>,
    /// Receive-major adjacency mask of size `recv_len * send_len`
    pub cons: BitVec,
}

impl Connections {
    /// Empty record for the given unit counts.
    pub fn new(send_len: usize, recv_len: usize) -> Self {
        Self {
            send_n: vec![0; send_len],
            recv_n: vec![0; recv_len],
            cons: BitVec::repeat(false, send_len * recv_len),
        }
    }

    #[inline]
    pub fn send_len(&self) -> usize {
        self.send_n.len()
    }

    #[inline]
    pub fn recv_len(&self) -> usize {
        self.recv_n.len()
    }

    /// Mark `send_idx -> recv_idx` as connected, keeping counts in step.
    ///
    /// Connecting an already connected pair is a no-op.
    pub fn connect(&mut self, send_idx: usize, recv_idx: usize) {
        let bit = recv_idx * self.send_len() + send_idx;
        if self.cons[bit] {
            return;
        }
        self.cons.set(bit, true);
        self.send_n[send_idx] += 1;
        self.recv_n[recv_idx] += 1;
    }

    /// Whether `send_idx -> recv_idx` is connected.
    pub fn is_connected(&self, send_idx: usize, recv_idx: usize) -> bool {
        self.cons[recv_idx * self.send_len() + send_idx]
    }

    /// Number of set bits in the mask.
    pub fn n_cons(&self) -> usize {
        self.cons.count_ones()
    }
}

/// Source of connectivity for one pathway.
pub trait Pattern: Send + Sync {
    /// Short name used in logs and pathway descriptions.
    fn name(&self) -> &str;

    /// Compute connectivity from `send` to `recv`.
    ///
    /// `same_layer` is true only for pathways whose sender and receiver are
    /// the same layer.
    fn connect(&self, send: &Shape, recv: &Shape, same_layer: bool) -> Connections;

    /// Declarative form of this pattern, if it has one.
    fn to_config(&self) -> Option<PatternConfig> {
        None
    }
}

/// Every sending unit connects to every receiving unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Full {
    /// Keep `i -> i` connections on a same-layer pathway
    pub self_con: bool,
}

impl Full {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_self_con(self_con: bool) -> Self {
        Self { self_con }
    }
}

impl Pattern for Full {
    fn name(&self) -> &str {
        "Full"
    }

    fn connect(&self, send: &Shape, recv: &Shape, same_layer: bool) -> Connections {
        let (slen, rlen) = (send.len(), recv.len());
        let mut cons = Connections::new(slen, rlen);
        let skip_self = same_layer && !self.self_con;
        for ri in 0..rlen {
            for si in 0..slen {
                if skip_self && si == ri {
                    continue;
                }
                cons.connect(si, ri);
            }
        }
        cons
    }

    fn to_config(&self) -> Option<PatternConfig> {
        Some(PatternConfig::Full {
            self_con: self.self_con,
        })
    }
}

/// Unit `i` of the sender connects to unit `i` of the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneToOne;

impl Pattern for OneToOne {
    fn name(&self) -> &str {
        "OneToOne"
    }

    fn connect(&self, send: &Shape, recv: &Shape, _same_layer: bool) -> Connections {
        let (slen, rlen) = (send.len(), recv.len());
        let mut cons = Connections::new(slen, rlen);
        for i in 0..slen.min(rlen) {
            cons.connect(i, i);
        }
        cons
    }

    fn to_config(&self) -> Option<PatternConfig> {
        Some(PatternConfig::OneToOne)
    }
}

/// Pool `p` of the sender connects fully to pool `p` of the receiver.
///
/// A 2-D layer counts as a single pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolOneToOne;

impl Pattern for PoolOneToOne {
    fn name(&self) -> &str {
        "PoolOneToOne"
    }

    fn connect(&self, send: &Shape, recv: &Shape, _same_layer: bool) -> Connections {
        let mut cons = Connections::new(send.len(), recv.len());
        let s_pools = send.n_sub_pools().max(1);
        let r_pools = recv.n_sub_pools().max(1);
        let (s_plen, r_plen) = (send.pool_len(), recv.pool_len());
        for p in 0..s_pools.min(r_pools) {
            for ri in p * r_plen..(p + 1) * r_plen {
                for si in p * s_plen..(p + 1) * s_plen {
                    cons.connect(si, ri);
                }
            }
        }
        cons
    }

    fn to_config(&self) -> Option<PatternConfig> {
        Some(PatternConfig::PoolOneToOne)
    }
}

/// Each receiving unit draws a fixed share of distinct random senders.
///
/// Draws are seeded so the same configuration always yields the same
/// connectivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformRand {
    /// Proportion of sending units each receiver connects to, 0..=1
    pub pct_cons: f32,
    /// Allow `i -> i` on a same-layer pathway
    pub self_con: bool,
    /// RNG seed
    pub seed: u64,
}

impl UniformRand {
    pub fn new(pct_cons: f32, seed: u64) -> Self {
        Self {
            pct_cons: pct_cons.clamp(0.0, 1.0),
            self_con: false,
            seed,
        }
    }
}

impl Pattern for UniformRand {
    fn name(&self) -> &str {
        "UniformRand"
    }

    fn connect(&self, send: &Shape, recv: &Shape, same_layer: bool) -> Connections {
        let (slen, rlen) = (send.len(), recv.len());
        let mut cons = Connections::new(slen, rlen);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let skip_self = same_layer && !self.self_con;
        for ri in 0..rlen {
            let excl = skip_self && ri < slen;
            let n_cand = if excl { slen - 1 } else { slen };
            let n = ((self.pct_cons * n_cand as f32).round() as usize).min(n_cand);
            for j in rand::seq::index::sample(&mut rng, n_cand, n).iter() {
                let si = if excl && j >= ri { j + 1 } else { j };
                cons.connect(si, ri);
            }
        }
        cons
    }

    fn to_config(&self) -> Option<PatternConfig> {
        Some(PatternConfig::UniformRand {
            pct_cons: self.pct_cons,
            self_con: self.self_con,
            seed: self.seed,
        })
    }
}

/// Serializable description of a stock pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternConfig {
    Full {
        #[serde(default)]
        self_con: bool,
    },
    OneToOne,
    PoolOneToOne,
    UniformRand {
        pct_cons: f32,
        #[serde(default)]
        self_con: bool,
        #[serde(default)]
        seed: u64,
    },
}

impl PatternConfig {
    /// Instantiate the described pattern.
    pub fn build(&self) -> Box<dyn Pattern> {
        match *self {
            PatternConfig::Full { self_con } => Box::new(Full { self_con }),
            PatternConfig::OneToOne => Box::new(OneToOne),
            PatternConfig::PoolOneToOne => Box::new(PoolOneToOne),
            PatternConfig::UniformRand {
                pct_cons,
                self_con,
                seed,
            } => Box::new(UniformRand {
                pct_cons: pct_cons.clamp(0.0, 1.0),
                self_con,
                seed,
            }),
        }
    }
}
