//! Network - arena owner and build driver.
//!
//! This module provides the `Network` struct, which owns every layer and
//! pathway plus the flat neuron, pool and synapse arrays they index into.
//!
//! # Lifecycle
//!
//! 1. Create a network: `Network::new(name)`
//! 2. Declare layers: `net.add_layer_2d(..)` / `net.add_layer_4d(..)`
//! 3. Declare pathways: `net.connect_layers(..)`, `net.bidir_connect_layers(..)`
//! 4. Build: `net.build()?` assigns every index and allocates every array
//! 5. Initialize: `net.init_weights(seed)?`
//!
//! Build is one-shot. Afterwards only synapse weight values, enablement
//! flags and scale parameters change.
//!
//! # Example
//!
//! ```
//! use corticore::{Full, LayerKind, Network, Result};
//!
//! # fn main() -> Result<()> {
//! let mut net = Network::new("demo");
//! let input = net.add_layer_2d("Input", 5, 5, LayerKind::Input)?;
//! let hidden = net.add_layer_4d("Hidden", 2, 2, 3, 3, LayerKind::Super)?;
//! net.bidir_connect_layers(input, hidden, Full::new())?;
//! net.build()?;
//! net.init_weights(42)?;
//!
//! let stats = net.stats();
//! assert_eq!(stats.n_neurons, 25 + 36);
//! assert_eq!(stats.n_synapses, 2 * 25 * 36);
//! # Ok(())
//! # }
//! ```

use crate::con_index::StartN;
use crate::error::{BuildErrors, CorticoreError, Result};
use crate::layer::{Layer, LayerId, LayerKind};
use crate::network_config::{LayerConfig, NetworkConfig, PathConfig};
use crate::neuron::Neuron;
use crate::path::{Path, PathId, PathType};
use crate::pattern::Pattern;
use crate::pool::{build_pools, stamp_sub_pools, Pool};
use crate::scale::{normalize_groups, GroupMember, ScaleFn, SendActScale};
use crate::shape::Shape;
use crate::synapse::Synapse;
use crate::threads::NetThreads;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Summary counts of a network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub n_layers: usize,
    pub n_neurons: usize,
    pub n_pools: usize,
    /// Pathways with built connectivity
    pub n_paths: usize,
    pub n_synapses: usize,
}

/// A layered network of neurons connected by sparse pathways.
pub struct Network {
    name: String,
    layers: Vec<Layer>,
    paths: Vec<Path>,
    layer_names: HashMap<String, LayerId>,

    neurons: Vec<Neuron>,
    pools: Vec<Pool>,
    synapses: Vec<Synapse>,

    /// Per path, per receiving unit: run of global synapse indexes
    path_recv_con: Vec<StartN>,
    /// Per path, per sending unit: run of entries in `send_syn_indexes`
    path_send_con: Vec<StartN>,
    /// Global synapse index of every send-side entry
    send_syn_indexes: Vec<u32>,

    scale_fn: Box<dyn ScaleFn>,
    threads: NetThreads,
    /// Declaration problems reported with the next build
    pending_errs: BuildErrors,
    is_built: bool,
}

impl Default for Network {
    fn default() -> Self {
        Self::new("")
    }
}

impl Network {
    /// Create an empty network.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layers: Vec::new(),
            paths: Vec::new(),
            layer_names: HashMap::new(),
            neurons: Vec::new(),
            pools: Vec::new(),
            synapses: Vec::new(),
            path_recv_con: Vec::new(),
            path_send_con: Vec::new(),
            send_syn_indexes: Vec::new(),
            scale_fn: Box::new(SendActScale::default()),
            threads: NetThreads::default(),
            pending_errs: BuildErrors::new(),
            is_built: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if network has been built.
    pub fn is_built(&self) -> bool {
        self.is_built
    }

    /// Declaration problems that the next [`Network::build`] will report.
    pub fn pending_errors(&self) -> &BuildErrors {
        &self.pending_errs
    }

    fn check_not_built(&self) -> Result<()> {
        if self.is_built {
            return Err(CorticoreError::AlreadyBuilt);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    /// Declare a layer.
    ///
    /// The shape is validated at build time so that every bad layer is
    /// reported together.
    ///
    /// # Errors
    ///
    /// `AlreadyBuilt` after build; `InvalidParameter` for a duplicate name.
    pub fn add_layer(&mut self, name: &str, shape: Shape, kind: LayerKind) -> Result<LayerId> {
        self.check_not_built()?;
        if self.layer_names.contains_key(name) {
            return Err(CorticoreError::InvalidParameter(format!(
                "duplicate layer name: {}",
                name
            )));
        }
        let id = LayerId(self.layers.len() as u32);
        self.layers.push(Layer::new(name, id.0, shape, kind));
        self.layer_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare a 2-D layer of `y * x` units.
    pub fn add_layer_2d(&mut self, name: &str, y: usize, x: usize, kind: LayerKind) -> Result<LayerId> {
        self.add_layer(name, Shape::new_2d(y, x), kind)
    }

    /// Declare a 4-D layer of `pools_y * pools_x` pools of `units_y * units_x` units.
    pub fn add_layer_4d(
        &mut self,
        name: &str,
        pools_y: usize,
        pools_x: usize,
        units_y: usize,
        units_x: usize,
        kind: LayerKind,
    ) -> Result<LayerId> {
        self.add_layer(name, Shape::new_4d(pools_y, pools_x, units_y, units_x), kind)
    }

    /// Declare a pathway from `send` to `recv` named `<Send>To<Recv>`.
    ///
    /// # Errors
    ///
    /// `AlreadyBuilt` after build; `IndexOutOfBounds` for an unknown layer id.
    pub fn connect_layers(
        &mut self,
        send: LayerId,
        recv: LayerId,
        pattern: Box<dyn Pattern>,
        path_type: PathType,
    ) -> Result<PathId> {
        self.check_not_built()?;
        let name = format!("{}To{}", self.layer(send)?.name, self.layer(recv)?.name);
        let id = PathId(self.paths.len() as u32);
        self.paths
            .push(Path::new(name, id.0, send, recv, pattern, path_type));
        self.layers[recv.as_usize()].recv_paths.push(id);
        self.layers[send.as_usize()].send_paths.push(id);
        Ok(id)
    }

    /// Same as [`Network::connect_layers`] with layers given by name.
    pub fn connect_layer_names(
        &mut self,
        send: &str,
        recv: &str,
        pattern: Box<dyn Pattern>,
        path_type: PathType,
    ) -> Result<PathId> {
        let send = self.layer_id(send)?;
        let recv = self.layer_id(recv)?;
        self.connect_layers(send, recv, pattern, path_type)
    }

    /// Forward pathway `low -> high` and back pathway `high -> low`.
    pub fn bidir_connect_layers<P>(
        &mut self,
        low: LayerId,
        high: LayerId,
        pattern: P,
    ) -> Result<(PathId, PathId)>
    where
        P: Pattern + Clone + 'static,
    {
        let fwd = self.connect_layers(low, high, Box::new(pattern.clone()), PathType::Forward)?;
        let back = self.connect_layers(high, low, Box::new(pattern), PathType::Back)?;
        Ok((fwd, back))
    }

    /// Lateral pathway from a layer onto itself.
    pub fn lateral_connect_layer<P>(&mut self, layer: LayerId, pattern: P) -> Result<PathId>
    where
        P: Pattern + 'static,
    {
        self.connect_layers(layer, layer, Box::new(pattern), PathType::Lateral)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn num_paths(&self) -> usize {
        self.paths.len()
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer> {
        self.layers
            .get(id.as_usize())
            .ok_or(CorticoreError::IndexOutOfBounds {
                index: id.as_usize(),
                length: self.layers.len(),
            })
    }

    /// Mutable layer access, for parameters such as `inhib`.
    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        let length = self.layers.len();
        self.layers
            .get_mut(id.as_usize())
            .ok_or(CorticoreError::IndexOutOfBounds {
                index: id.as_usize(),
                length,
            })
    }

    pub fn layer_id(&self, name: &str) -> Result<LayerId> {
        self.layer_names
            .get(name)
            .copied()
            .ok_or_else(|| CorticoreError::UnknownLayer(name.to_string()))
    }

    pub fn layer_by_name(&self, name: &str) -> Result<&Layer> {
        self.layer(self.layer_id(name)?)
    }

    /// Layers of the given kind, in declaration order.
    pub fn layers_by_kind(&self, kind: LayerKind) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|ly| ly.kind == kind)
            .map(|ly| ly.id())
            .collect()
    }

    pub fn path(&self, id: PathId) -> Result<&Path> {
        self.paths
            .get(id.as_usize())
            .ok_or(CorticoreError::IndexOutOfBounds {
                index: id.as_usize(),
                length: self.paths.len(),
            })
    }

    /// Mutable pathway access, for parameters such as `path_scale`.
    ///
    /// Call [`Network::init_gscale`] after changing scale parameters or
    /// conductance types.
    pub fn path_mut(&mut self, id: PathId) -> Result<&mut Path> {
        let length = self.paths.len();
        self.paths
            .get_mut(id.as_usize())
            .ok_or(CorticoreError::IndexOutOfBounds {
                index: id.as_usize(),
                length,
            })
    }

    /// First pathway named `name` (`<Send>To<Recv>`).
    pub fn path_id(&self, name: &str) -> Result<PathId> {
        self.paths
            .iter()
            .find(|pt| pt.name == name)
            .map(|pt| pt.id())
            .ok_or_else(|| CorticoreError::UnknownPath(name.to_string()))
    }

    pub fn path_by_name(&self, name: &str) -> Result<&Path> {
        self.path(self.path_id(name)?)
    }

    /// The pathway from `recv` back to `send` of the given pathway, if any.
    ///
    /// Searched among the sending layer's receiving pathways; disabled
    /// pathways are included.
    pub fn reciprocal_path(&self, id: PathId) -> Option<PathId> {
        let pt = self.paths.get(id.as_usize())?;
        self.layers[pt.send.as_usize()]
            .recv_paths
            .iter()
            .copied()
            .find(|&rid| self.paths[rid.as_usize()].send == pt.recv)
    }

    // ------------------------------------------------------------------
    // Enablement
    // ------------------------------------------------------------------

    /// Turn a pathway off or back on.
    ///
    /// Disabled pathways are skipped by build, weight initialization and
    /// scale normalization. After build, normalization is re-run at once.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when enabling, after build, a pathway that was
    /// disabled at build time and so has no connectivity.
    pub fn set_path_off(&mut self, id: PathId, off: bool) -> Result<()> {
        let is_built = self.is_built;
        let pt = self.path_mut(id)?;
        if is_built && !off && !pt.is_built {
            return Err(CorticoreError::InvalidParameter(format!(
                "pathway {} has no connectivity; enable it before build",
                pt.name
            )));
        }
        pt.off = off;
        if is_built {
            self.init_gscale();
        }
        Ok(())
    }

    /// Turn a layer and every pathway into or out of it off or back on.
    ///
    /// After build, pathways without connectivity stay off when the layer
    /// is turned back on.
    pub fn set_layer_off(&mut self, id: LayerId, off: bool) -> Result<()> {
        let is_built = self.is_built;
        let ly = self.layer_mut(id)?;
        ly.off = off;
        let touched: Vec<PathId> = ly
            .recv_paths
            .iter()
            .chain(ly.send_paths.iter())
            .copied()
            .collect();
        for pid in touched {
            let pt = &mut self.paths[pid.as_usize()];
            if is_built && !off && !pt.is_built {
                debug!(target: "corticore", path = %pt.name, "left off: no connectivity");
                continue;
            }
            pt.off = off;
        }
        if is_built {
            self.init_gscale();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    /// Assign every index and allocate every array.
    ///
    /// Layers with an invalid shape are left without neurons and their
    /// pathways without connectivity; the rest of the network is built
    /// regardless. All such problems are returned together as
    /// `CorticoreError::Build` once the pass completes.
    ///
    /// # Errors
    ///
    /// `AlreadyBuilt` if called twice, `Build` for structural problems
    /// and for declaration problems recorded by [`Network::from_config`].
    pub fn build(&mut self) -> Result<()> {
        self.check_not_built()?;
        let mut errs = std::mem::take(&mut self.pending_errs);

        // layers and pools
        let mut pools: Vec<Pool> = Vec::new();
        let mut n_neurons = 0usize;
        for ly in &mut self.layers {
            ly.is_built = false;
            if !ly.shape.is_valid_rank() {
                let err = CorticoreError::UnsupportedShape {
                    layer: ly.name.clone(),
                    rank: ly.shape.rank(),
                };
                error!(target: "corticore", "{}", err);
                errs.push(err);
                continue;
            }
            let mut lpools = match build_pools(&ly.name, ly.index, &ly.shape) {
                Ok(lp) => lp,
                Err(err) => {
                    error!(target: "corticore", "{}", err);
                    errs.push(err);
                    continue;
                }
            };
            let pool_start = pools.len();
            for (pi, pl) in lpools.iter_mut().enumerate() {
                pl.pool_index = (pool_start + pi) as u32;
            }
            ly.neur_start = n_neurons as u32;
            ly.n_neurons = ly.shape.len() as u32;
            ly.pool_start = pool_start as u32;
            ly.n_pools = lpools.len() as u32;
            ly.is_built = true;
            n_neurons += ly.shape.len();
            pools.extend(lpools);
        }

        let mut neurons = vec![Neuron::default(); n_neurons];
        for ly in self.layers.iter().filter(|ly| ly.is_built) {
            let lnrns = &mut neurons[ly.neuron_range()];
            for (ni, nrn) in lnrns.iter_mut().enumerate() {
                nrn.lay_index = ly.index;
                nrn.neur_index = ni as u32;
            }
            let lpools = &pools[ly.pool_start()..ly.pool_start() + ly.n_pools()];
            stamp_sub_pools(lpools, lnrns);
        }
        self.neurons = neurons;
        self.pools = pools;

        // pathway connectivity
        let mut n_syns = 0usize;
        for pt in &mut self.paths {
            pt.clear_connectivity();
            if pt.off {
                debug!(target: "corticore", path = %pt.name, "skipping disabled pathway");
                continue;
            }
            let sl = &self.layers[pt.send.as_usize()];
            let rl = &self.layers[pt.recv.as_usize()];
            if !sl.is_built || !rl.is_built {
                warn!(
                    target: "corticore",
                    path = %pt.name,
                    "skipping pathway attached to a layer that failed to build"
                );
                continue;
            }
            pt.build_connectivity(&sl.shape, &rl.shape);
            match syn_range_start(n_syns, pt.n_syns()) {
                Ok(start) => {
                    pt.syn_start = start;
                    n_syns += pt.n_syns();
                }
                Err(err) => {
                    error!(target: "corticore", path = %pt.name, "{}", err);
                    errs.push(err);
                    pt.clear_connectivity();
                }
            }
        }

        // synapse arena and global index tables
        let mut synapses = Vec::with_capacity(n_syns);
        let mut path_recv_con = Vec::new();
        let mut path_send_con = Vec::new();
        let mut send_syn_indexes = Vec::with_capacity(n_syns);
        for pt in self.paths.iter_mut().filter(|pt| pt.is_built) {
            let sl = &self.layers[pt.send.as_usize()];
            let rl = &self.layers[pt.recv.as_usize()];
            pt.recv_con_start = path_recv_con.len() as u32;
            for (ri, rc) in pt.recv_con.iter().enumerate() {
                path_recv_con.push(StartN::new(pt.syn_start + rc.start, rc.n));
                for syi in rc.range() {
                    synapses.push(Synapse {
                        send_index: sl.neur_start + pt.recv_con_index[syi],
                        recv_index: rl.neur_start + ri as u32,
                        path_index: pt.index,
                        ..Default::default()
                    });
                }
            }
            pt.send_con_start = path_send_con.len() as u32;
            let send_base = send_syn_indexes.len() as u32;
            for sc in &pt.send_con {
                path_send_con.push(StartN::new(send_base + sc.start, sc.n));
            }
            let syn_start = pt.syn_start;
            send_syn_indexes.extend(pt.send_syn_index.iter().map(|&syi| syn_start + syi));
        }
        self.synapses = synapses;
        self.path_recv_con = path_recv_con;
        self.path_send_con = path_send_con;
        self.send_syn_indexes = send_syn_indexes;

        self.is_built = true;
        let n_paths = self.paths.iter().filter(|pt| pt.is_built).count();
        self.threads.set_defaults(self.neurons.len(), n_paths);
        self.init_gscale();

        info!(
            target: "corticore",
            network = %self.name,
            n_layers = self.layers.len(),
            n_neurons = self.neurons.len(),
            n_pools = self.pools.len(),
            n_paths,
            n_synapses = self.synapses.len(),
            n_errors = errs.len(),
            "network built"
        );
        errs.into_result()
    }

    // ------------------------------------------------------------------
    // Scale normalization and weights
    // ------------------------------------------------------------------

    /// Replace the raw scale function used by [`Network::init_gscale`].
    pub fn set_scale_fn(&mut self, scale_fn: Box<dyn ScaleFn>) {
        self.scale_fn = scale_fn;
    }

    /// Compute normalized conductance scales for every receiving layer.
    ///
    /// Must be re-run whenever enablement, relative weights or conductance
    /// types change; the enablement setters do so themselves.
    pub fn init_gscale(&mut self) {
        for ly in &self.layers {
            let members: Vec<GroupMember> = ly
                .recv_paths
                .iter()
                .map(|&pid| {
                    let pt = &self.paths[pid.as_usize()];
                    let sl = &self.layers[pt.send.as_usize()];
                    let enabled = !pt.off && pt.is_built;
                    let scale = if enabled {
                        pt.path_scale.abs
                            * pt.path_scale.rel
                            * self.scale_fn.raw_scale(
                                sl.inhib.act_avg_nominal,
                                sl.n_neurons as f32,
                                pt.recv_con_n_avg_max.avg,
                            )
                    } else {
                        0.0
                    };
                    GroupMember {
                        gtype: pt.com.gtype,
                        enabled,
                        rel: pt.path_scale.rel,
                        scale,
                    }
                })
                .collect();
            let scales = normalize_groups(&members);
            for (&pid, gs) in ly.recv_paths.iter().zip(scales) {
                self.paths[pid.as_usize()].gscale = gs;
            }
        }
    }

    /// Draw initial weights for every enabled pathway, then symmetrize and
    /// normalize scales.
    ///
    /// Each pathway draws from its own `StdRng` derived from `seed` and its
    /// index, so results do not depend on thread scheduling.
    pub fn init_weights(&mut self, seed: u64) -> Result<()> {
        if !self.is_built {
            return Err(CorticoreError::NotBuilt);
        }
        let mut rest: &mut [Synapse] = &mut self.synapses;
        let mut jobs = Vec::new();
        for pt in self.paths.iter().filter(|pt| pt.is_built) {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(pt.n_syns());
            rest = tail;
            if !pt.off {
                jobs.push((pt.index, pt.swt_init, head));
            }
        }
        jobs.into_par_iter().for_each(|(pi, params, syns)| {
            let mut rng = StdRng::seed_from_u64(path_seed(seed, pi));
            for syn in syns.iter_mut() {
                params.init_synapse(syn, &mut rng);
            }
        });

        self.init_wt_sym();
        self.init_gscale();
        debug!(target: "corticore", network = %self.name, seed, "initialized weights");
        Ok(())
    }

    /// Copy weights onto reciprocal pathways that ask for symmetry.
    ///
    /// A pathway copies its weights onto its reciprocal only when both
    /// request symmetry and its receiving layer was declared no earlier than
    /// its sending layer, so each pair is copied once.
    pub fn init_wt_sym(&mut self) {
        let mut copies: Vec<(usize, usize)> = Vec::new();
        for pt in &self.paths {
            if pt.off || !pt.is_built || !pt.swt_init.sym {
                continue;
            }
            if pt.recv.0 < pt.send.0 {
                continue;
            }
            let Some(rid) = self.reciprocal_path(pt.id()) else {
                continue;
            };
            let rpt = &self.paths[rid.as_usize()];
            if rpt.off || !rpt.is_built || !rpt.swt_init.sym {
                continue;
            }
            let before = copies.len();
            for (si, sc) in pt.send_con.iter().enumerate() {
                for k in sc.range() {
                    let ri = pt.send_con_index[k] as usize;
                    if let Some(rsyi) = rpt.syn_index(ri, si) {
                        let src = pt.syn_start() + pt.send_syn_index[k] as usize;
                        copies.push((src, rpt.syn_start() + rsyi));
                    }
                }
            }
            debug!(
                target: "corticore",
                path = %pt.name,
                recip = %rpt.name,
                n_copied = copies.len() - before,
                "symmetrized weights"
            );
        }
        for (src, dst) in copies {
            let from = self.synapses[src];
            self.synapses[dst].copy_weights_from(&from);
        }
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    /// Mutable synapses, for learning rules updating weight values.
    pub fn synapses_mut(&mut self) -> &mut [Synapse] {
        &mut self.synapses
    }

    /// Per path, per receiving unit: run of global synapse indexes.
    pub fn path_recv_con(&self) -> &[StartN] {
        &self.path_recv_con
    }

    /// Per path, per sending unit: run of entries in [`Network::send_syn_indexes`].
    pub fn path_send_con(&self) -> &[StartN] {
        &self.path_send_con
    }

    pub fn send_syn_indexes(&self) -> &[u32] {
        &self.send_syn_indexes
    }

    pub fn layer_neurons(&self, id: LayerId) -> Result<&[Neuron]> {
        let ly = self.layer(id)?;
        if !ly.is_built {
            return Err(CorticoreError::NotBuilt);
        }
        Ok(&self.neurons[ly.neuron_range()])
    }

    /// Pools of a layer; index 0 is the whole layer.
    pub fn layer_pools(&self, id: LayerId) -> Result<&[Pool]> {
        let ly = self.layer(id)?;
        if !ly.is_built {
            return Err(CorticoreError::NotBuilt);
        }
        Ok(&self.pools[ly.pool_start()..ly.pool_start() + ly.n_pools()])
    }

    pub fn path_synapses(&self, id: PathId) -> Result<&[Synapse]> {
        let pt = self.path(id)?;
        if !pt.is_built {
            return Err(CorticoreError::NotBuilt);
        }
        Ok(&self.synapses[pt.syn_start()..pt.syn_start() + pt.n_syns()])
    }

    pub fn path_synapses_mut(&mut self, id: PathId) -> Result<&mut [Synapse]> {
        let pt = self.path(id)?;
        if !pt.is_built {
            return Err(CorticoreError::NotBuilt);
        }
        let range = pt.syn_start()..pt.syn_start() + pt.n_syns();
        Ok(&mut self.synapses[range])
    }

    /// Global index of the synapse between layer-relative units.
    pub fn syn_index(&self, path: PathId, send: usize, recv: usize) -> Option<usize> {
        let pt = self.paths.get(path.as_usize())?;
        pt.syn_index(send, recv).map(|syi| pt.syn_start() + syi)
    }

    /// Weight of the synapse between layer-relative units, if connected.
    pub fn syn_value(&self, path: PathId, send: usize, recv: usize) -> Option<f32> {
        self.syn_index(path, send, recv)
            .map(|si| self.synapses[si].wt)
    }

    /// Set the weight of one synapse, keeping `lwt` consistent with `swt`.
    ///
    /// A synapse whose `swt` was never initialized takes the new weight as
    /// its slow weight, so `lwt` lands on the pathway mean.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the units are not connected.
    pub fn set_syn_value(&mut self, path: PathId, send: usize, recv: usize, wt: f32) -> Result<()> {
        let mean = self.path(path)?.swt_init.mean;
        let si = self.syn_index(path, send, recv).ok_or_else(|| {
            CorticoreError::InvalidParameter(format!(
                "no synapse from {} to {} in pathway {}",
                send,
                recv,
                path.as_usize()
            ))
        })?;
        let syn = &mut self.synapses[si];
        syn.wt = wt;
        if syn.swt == 0.0 {
            syn.swt = wt;
        }
        syn.lwt = wt - syn.swt + mean;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    pub fn threads(&self) -> &NetThreads {
        &self.threads
    }

    pub fn threads_mut(&mut self) -> &mut NetThreads {
        &mut self.threads
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            n_layers: self.layers.len(),
            n_neurons: self.neurons.len(),
            n_pools: self.pools.len(),
            n_paths: self.paths.iter().filter(|pt| pt.is_built).count(),
            n_synapses: self.synapses.len(),
        }
    }

    /// Approximate heap bytes held by the arena and index tables.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;
        let path_tables: usize = self
            .paths
            .iter()
            .map(|pt| {
                (pt.recv_con.len() + pt.send_con.len()) * size_of::<StartN>()
                    + (pt.recv_con_index.len() + pt.send_con_index.len() + pt.send_syn_index.len())
                        * size_of::<u32>()
            })
            .sum();
        self.neurons.len() * size_of::<Neuron>()
            + self.pools.len() * size_of::<Pool>()
            + self.synapses.len() * size_of::<Synapse>()
            + (self.path_recv_con.len() + self.path_send_con.len()) * size_of::<StartN>()
            + self.send_syn_indexes.len() * size_of::<u32>()
            + path_tables
    }

    /// Configured and normalized scales of every enabled receiving pathway,
    /// grouped by receiving layer.
    pub fn all_path_scales(&self) -> String {
        let mut out = String::new();
        for ly in self.layers.iter().filter(|ly| !ly.off) {
            out.push_str(&format!("\nLayer: {}\n", ly.name));
            for &pid in &ly.recv_paths {
                let pt = &self.paths[pid.as_usize()];
                if pt.off {
                    continue;
                }
                let sn = &self.layers[pt.send.as_usize()].name;
                out.push_str(&format!(
                    "\t{:>23}\t\tAbs:\t{}\tRel:\t{}\tGScale:\t{}\tRel:{}\n",
                    sn, pt.path_scale.abs, pt.path_scale.rel, pt.gscale.scale, pt.gscale.rel
                ));
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Export the declared topology and parameters.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if a pathway uses a pattern with no declarative form.
    pub fn to_config(&self) -> Result<NetworkConfig> {
        let layers = self
            .layers
            .iter()
            .map(|ly| LayerConfig {
                name: ly.name.clone(),
                shape: ly.shape.dims().to_vec(),
                kind: ly.kind,
                off: ly.off,
                act_avg_nominal: Some(ly.inhib.act_avg_nominal),
            })
            .collect();
        let mut paths = Vec::with_capacity(self.paths.len());
        for pt in &self.paths {
            let pattern = pt.pattern.to_config().ok_or_else(|| {
                CorticoreError::InvalidParameter(format!(
                    "pathway {} uses pattern {} which has no config form",
                    pt.name,
                    pt.pattern.name()
                ))
            })?;
            paths.push(PathConfig {
                send: self.layers[pt.send.as_usize()].name.clone(),
                recv: self.layers[pt.recv.as_usize()].name.clone(),
                pattern,
                path_type: pt.path_type,
                off: pt.off,
                gtype: Some(pt.com.gtype),
                rel: Some(pt.path_scale.rel),
                abs: Some(pt.path_scale.abs),
                sym: Some(pt.swt_init.sym),
            });
        }
        Ok(NetworkConfig::new(&self.name, layers, paths))
    }

    /// Declare the layers and pathways of `config` on a new network.
    ///
    /// The returned network is not built. Duplicate layer names and
    /// pathways naming unknown layers are logged and skipped; they stay in
    /// [`Network::pending_errors`] and are reported by the next build
    /// together with any structural problems.
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        let mut net = Network::new(&config.name);
        let mut errs = BuildErrors::new();

        for lc in &config.layers {
            match net.add_layer(&lc.name, Shape::new(&lc.shape), lc.kind) {
                Ok(id) => {
                    if let Some(act) = lc.act_avg_nominal {
                        net.layers[id.as_usize()].inhib.act_avg_nominal = act;
                    }
                }
                Err(err) => {
                    warn!(target: "corticore", layer = %lc.name, "{}", err);
                    errs.push(err);
                }
            }
        }

        for pc in &config.paths {
            let ids = (net.layer_id(&pc.send), net.layer_id(&pc.recv));
            let (send, recv) = match ids {
                (Ok(s), Ok(r)) => (s, r),
                (s, r) => {
                    warn!(
                        target: "corticore",
                        send = %pc.send,
                        recv = %pc.recv,
                        "skipping pathway with unresolved layer"
                    );
                    errs.extend(s.err());
                    errs.extend(r.err());
                    continue;
                }
            };
            let pid = net.connect_layers(send, recv, pc.pattern.build(), pc.path_type)?;
            let pt = &mut net.paths[pid.as_usize()];
            pt.off = pc.off;
            if let Some(gtype) = pc.gtype {
                pt.com.gtype = gtype;
            }
            if let Some(rel) = pc.rel {
                pt.path_scale.rel = rel;
            }
            if let Some(abs) = pc.abs {
                pt.path_scale.abs = abs;
            }
            if let Some(sym) = pc.sym {
                pt.swt_init.sym = sym;
            }
        }

        for lc in config.layers.iter().filter(|lc| lc.off) {
            if let Ok(id) = net.layer_id(&lc.name) {
                net.set_layer_off(id, true)?;
            }
        }

        net.pending_errs = errs;
        Ok(net)
    }
}

/// Start of a pathway's synapse run when `n` synapses follow `total`.
///
/// Fails if the run would not be addressable with 32-bit indexes.
fn syn_range_start(total: usize, n: usize) -> Result<u32> {
    let end = total.checked_add(n);
    match (u32::try_from(total), end.map(u32::try_from)) {
        (Ok(start), Some(Ok(_))) => Ok(start),
        _ => Err(CorticoreError::InvalidParameter(format!(
            "{} synapses after {} exceed the 32-bit index space",
            n, total
        ))),
    }
}

/// Per-pathway RNG seed.
fn path_seed(seed: u64, path_index: u32) -> u64 {
    seed ^ (path_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::GType;
    use crate::pattern::{Full, OneToOne};
    use approx::assert_relative_eq;

    fn three_layer() -> (Network, LayerId, LayerId, LayerId) {
        let mut net = Network::new("test");
        let a = net.add_layer_2d("A", 2, 2, LayerKind::Input).unwrap();
        let b = net.add_layer_4d("B", 2, 1, 2, 2, LayerKind::Super).unwrap();
        let c = net.add_layer_2d("C", 1, 3, LayerKind::Target).unwrap();
        (net, a, b, c)
    }

    #[test]
    fn test_layer_ranges_are_contiguous() {
        let (mut net, a, b, c) = three_layer();
        net.build().unwrap();
        assert_eq!(net.layer(a).unwrap().neuron_range(), 0..4);
        assert_eq!(net.layer(b).unwrap().neuron_range(), 4..12);
        assert_eq!(net.layer(c).unwrap().neuron_range(), 12..15);
        assert_eq!(net.neurons().len(), 15);
        // A: 1 pool, B: 1 + 2, C: 1
        assert_eq!(net.pools().len(), 5);
        assert_eq!(net.layer(b).unwrap().pool_start(), 1);

        let bn = net.layer_neurons(b).unwrap();
        assert!(bn.iter().all(|n| n.lay_index == 1));
        assert_eq!(bn.iter().map(|n| n.sub_pool).collect::<Vec<_>>(), vec![1, 1, 1, 1, 2, 2, 2, 2]);
        let bp = net.layer_pools(b).unwrap();
        assert_eq!(bp[2].pool_index, 3);
    }

    #[test]
    fn test_structural_change_after_build() {
        let (mut net, a, b, _) = three_layer();
        net.build().unwrap();
        assert!(matches!(
            net.add_layer_2d("D", 1, 1, LayerKind::Super),
            Err(CorticoreError::AlreadyBuilt)
        ));
        assert!(matches!(
            net.connect_layers(a, b, Box::new(Full::new()), PathType::Forward),
            Err(CorticoreError::AlreadyBuilt)
        ));
        assert!(matches!(net.build(), Err(CorticoreError::AlreadyBuilt)));
    }

    #[test]
    fn test_duplicate_layer_name() {
        let (mut net, ..) = three_layer();
        assert!(matches!(
            net.add_layer_2d("A", 1, 1, LayerKind::Super),
            Err(CorticoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_synapse_arena_matches_tables() {
        let (mut net, a, b, c) = three_layer();
        let ab = net
            .connect_layers(a, b, Box::new(Full::new()), PathType::Forward)
            .unwrap();
        let bc = net
            .connect_layers(b, c, Box::new(OneToOne), PathType::Forward)
            .unwrap();
        net.build().unwrap();

        assert_eq!(net.synapses().len(), 32 + 3);
        assert_eq!(net.path(bc).unwrap().syn_start(), 32);
        for (gi, syn) in net.synapses().iter().enumerate() {
            let pt = &net.paths()[syn.path_index as usize];
            let sl = net.layer(pt.send()).unwrap();
            let rl = net.layer(pt.recv()).unwrap();
            let (si, ri) = (
                syn.send_index as usize - sl.neur_start(),
                syn.recv_index as usize - rl.neur_start(),
            );
            assert_eq!(net.syn_index(pt.id(), si, ri), Some(gi));
        }
        // global recv table of AToB, recv unit 1
        let ab_pt = net.path(ab).unwrap();
        let rc = net.path_recv_con()[ab_pt.recv_con_start as usize + 1];
        assert_eq!(rc, StartN::new(4, 4));
        assert_eq!(net.send_syn_indexes().len(), 35);
    }

    #[test]
    fn test_reciprocal_path() {
        let (mut net, a, b, c) = three_layer();
        let (fwd, back) = net.bidir_connect_layers(a, b, Full::new()).unwrap();
        let bc = net
            .connect_layers(b, c, Box::new(Full::new()), PathType::Forward)
            .unwrap();
        assert_eq!(net.reciprocal_path(fwd), Some(back));
        assert_eq!(net.reciprocal_path(back), Some(fwd));
        assert_eq!(net.reciprocal_path(bc), None);
        assert_eq!(net.path_id("BToA").unwrap(), back);
        assert_eq!(net.path(back).unwrap().path_scale.rel, 0.1);
    }

    #[test]
    fn test_layers_by_kind() {
        let (net, a, _, c) = three_layer();
        assert_eq!(net.layers_by_kind(LayerKind::Input), vec![a]);
        assert_eq!(net.layers_by_kind(LayerKind::Target), vec![c]);
        assert!(net.layers_by_kind(LayerKind::Trn).is_empty());
    }

    #[test]
    fn test_set_layer_off_turns_off_paths() {
        let (mut net, a, b, c) = three_layer();
        let (fwd, back) = net.bidir_connect_layers(a, b, Full::new()).unwrap();
        let bc = net
            .connect_layers(b, c, Box::new(Full::new()), PathType::Forward)
            .unwrap();
        net.set_layer_off(a, true).unwrap();
        assert!(net.path(fwd).unwrap().is_off());
        assert!(net.path(back).unwrap().is_off());
        assert!(!net.path(bc).unwrap().is_off());

        net.build().unwrap();
        assert_eq!(net.stats().n_paths, 1);
        assert_eq!(net.synapses().len(), 24);
        // cannot enable a pathway that was never built
        assert!(net.set_path_off(fwd, false).is_err());
        net.set_layer_off(a, false).unwrap();
        assert!(net.path(fwd).unwrap().is_off());
    }

    #[test]
    fn test_gscale_after_toggle() {
        let (mut net, a, b, c) = three_layer();
        let ab = net
            .connect_layers(a, b, Box::new(Full::new()), PathType::Forward)
            .unwrap();
        let cb = net
            .connect_layers(c, b, Box::new(Full::new()), PathType::Forward)
            .unwrap();
        net.path_mut(cb).unwrap().path_scale.rel = 3.0;
        net.build().unwrap();
        assert_relative_eq!(net.path(ab).unwrap().gscale().rel, 0.25);
        assert_relative_eq!(net.path(cb).unwrap().gscale().rel, 0.75);

        net.set_path_off(cb, true).unwrap();
        assert_relative_eq!(net.path(ab).unwrap().gscale().rel, 1.0);
        assert_eq!(net.path(cb).unwrap().gscale().rel, 0.0);

        net.set_path_off(cb, false).unwrap();
        assert_relative_eq!(net.path(ab).unwrap().gscale().rel, 0.25);
    }

    #[test]
    fn test_inhib_path_own_group() {
        let (mut net, a, b, _) = three_layer();
        let ab = net
            .connect_layers(a, b, Box::new(Full::new()), PathType::Forward)
            .unwrap();
        let bb = net
            .connect_layers(b, b, Box::new(Full::new()), PathType::Inhib)
            .unwrap();
        net.build().unwrap();
        assert_eq!(net.path(bb).unwrap().com.gtype, GType::Inhibitory);
        assert_relative_eq!(net.path(ab).unwrap().gscale().rel, 1.0);
        assert_relative_eq!(net.path(bb).unwrap().gscale().rel, 1.0);
    }

    #[test]
    fn test_init_weights_deterministic() {
        let make = || {
            let (mut net, a, b, _) = three_layer();
            net.bidir_connect_layers(a, b, Full::new()).unwrap();
            net.build().unwrap();
            net.init_weights(9).unwrap();
            net.synapses().iter().map(|s| s.wt).collect::<Vec<_>>()
        };
        let w1 = make();
        assert_eq!(w1, make());
        assert!(w1.iter().all(|&w| (0.25..=0.75).contains(&w)));
    }

    #[test]
    fn test_init_weights_requires_build() {
        let (mut net, ..) = three_layer();
        assert!(matches!(net.init_weights(1), Err(CorticoreError::NotBuilt)));
    }

    #[test]
    fn test_set_syn_value() {
        let (mut net, a, b, _) = three_layer();
        let ab = net
            .connect_layers(a, b, Box::new(OneToOne), PathType::Forward)
            .unwrap();
        net.build().unwrap();
        let mean = net.path(ab).unwrap().swt_init.mean;
        let si = net.syn_index(ab, 1, 1).unwrap();

        // uninitialized slow weight takes the new weight
        net.set_syn_value(ab, 1, 1, 0.7).unwrap();
        assert_eq!(net.syn_value(ab, 1, 1), Some(0.7));
        assert_eq!(net.synapses()[si].swt, 0.7);
        assert_relative_eq!(net.synapses()[si].lwt, mean);
        assert_eq!(net.syn_value(ab, 1, 2), None);
        assert!(net.set_syn_value(ab, 1, 2, 0.7).is_err());

        // an existing slow weight is kept and lwt follows the difference
        net.init_weights(9).unwrap();
        let swt = net.synapses()[si].swt;
        net.set_syn_value(ab, 1, 1, swt + 0.2).unwrap();
        assert_eq!(net.synapses()[si].swt, swt);
        assert_relative_eq!(net.synapses()[si].lwt, mean + 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_syn_range_start_bounds() {
        assert_eq!(syn_range_start(0, 10).unwrap(), 0);
        let max = u32::MAX as usize;
        assert_eq!(syn_range_start(max - 5, 5).unwrap(), u32::MAX - 5);
        assert!(matches!(
            syn_range_start(max - 5, 6),
            Err(CorticoreError::InvalidParameter(_))
        ));
        assert!(syn_range_start(usize::MAX, 1).is_err());
    }

    #[test]
    fn test_from_config_defers_errors_to_build() {
        use crate::pattern::PatternConfig;

        let config = NetworkConfig::new(
            "typo",
            vec![
                LayerConfig::new("A", &[2, 2], LayerKind::Input),
                LayerConfig::new("B", &[2, 2], LayerKind::Super),
            ],
            vec![
                PathConfig::new("A", "B", PatternConfig::OneToOne, PathType::Forward),
                PathConfig::new("A", "Typo", PatternConfig::OneToOne, PathType::Forward),
            ],
        );
        let mut net = Network::from_config(&config).unwrap();
        assert_eq!(net.num_paths(), 1);
        assert_eq!(net.pending_errors().len(), 1);

        match net.build() {
            Err(CorticoreError::Build(errs)) => {
                assert_eq!(errs.len(), 1);
                assert!(matches!(errs.errors()[0], CorticoreError::UnknownLayer(ref n) if n == "Typo"));
            }
            other => panic!("expected deferred errors, got {:?}", other),
        }
        assert!(net.is_built());
        assert!(net.pending_errors().is_empty());
        assert_eq!(net.path_by_name("AToB").unwrap().n_syns(), 4);
    }

    #[test]
    fn test_all_path_scales_report() {
        let (mut net, a, b, _) = three_layer();
        net.bidir_connect_layers(a, b, Full::new()).unwrap();
        net.build().unwrap();
        let report = net.all_path_scales();
        assert!(report.contains("Layer: A"));
        assert!(report.contains("Layer: B"));
        assert!(report.contains("GScale:"));
    }

    #[test]
    fn test_memory_usage_grows_with_build() {
        let (mut net, a, b, _) = three_layer();
        net.bidir_connect_layers(a, b, Full::new()).unwrap();
        assert_eq!(net.memory_usage(), 0);
        net.build().unwrap();
        assert!(net.memory_usage() > 64 * std::mem::size_of::<Synapse>());
    }
}
