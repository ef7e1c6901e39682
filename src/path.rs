//! Pathways - directed sparse connection sets between two layers.
//!
//! A [`Path`] owns two views over the same set of connections:
//!
//! - **Receive side**: `recv_con[ri]` gives the run of synapse slots onto
//!   receiving unit `ri`; `recv_con_index[syi]` is the sending unit of slot
//!   `syi`. Synapse slots are numbered in this order, so the pathway's
//!   synapses are stored contiguously per receiver.
//! - **Send side**: `send_con[si]` gives the run of entries for sending unit
//!   `si`; `send_con_index[k]` is the receiving unit and `send_syn_index[k]`
//!   the synapse slot of entry `k`.
//!
//! Unit indexes in these tables are layer-relative. Slots are
//! pathway-relative; add [`Path::syn_start`] for the network-global synapse.
//! Within every table entry the partner indexes are strictly increasing.

use crate::con_index::{set_con_start_n, AvgMax, StartN};
use crate::layer::LayerId;
use crate::pattern::{Connections, Pattern};
use crate::shape::Shape;
use crate::synapse::SwtInitParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Identifier of a pathway within its network (its declaration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId(pub(crate) u32);

impl PathId {
    /// Create a PathId from a raw index (for testing).
    #[doc(hidden)]
    pub fn from_raw(id: u32) -> Self {
        PathId(id)
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Functional role of a pathway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathType {
    /// Feedforward, from a lower to a higher layer
    #[default]
    Forward,
    /// Feedback, from a higher to a lower layer
    Back,
    /// Within or between layers at the same level
    Lateral,
    /// Inhibitory
    Inhib,
    /// Context input into CT layers
    CtCtxt,
}

impl PathType {
    /// Conductance type a new pathway of this role starts with.
    pub fn default_gtype(self) -> GType {
        match self {
            PathType::Inhib => GType::Inhibitory,
            PathType::CtCtxt => GType::Context,
            _ => GType::Excitatory,
        }
    }

    /// Nominal relative weight a new pathway of this role starts with.
    pub fn default_rel(self) -> f32 {
        match self {
            PathType::Back => 0.1,
            _ => 1.0,
        }
    }

    /// Whether initial weights are symmetrized by default.
    pub fn default_sym(self) -> bool {
        !matches!(self, PathType::Inhib)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PathType::Forward => "Forward",
            PathType::Back => "Back",
            PathType::Lateral => "Lateral",
            PathType::Inhib => "Inhib",
            PathType::CtCtxt => "CTCtxt",
        }
    }
}

/// Conductance channel a pathway drives; each is normalized as its own group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GType {
    #[default]
    Excitatory,
    Inhibitory,
    Modulatory,
    Maintenance,
    Context,
}

impl GType {
    /// Number of conductance types.
    pub const N: usize = 5;

    pub const ALL: [GType; GType::N] = [
        GType::Excitatory,
        GType::Inhibitory,
        GType::Modulatory,
        GType::Maintenance,
        GType::Context,
    ];

    #[inline]
    pub fn as_usize(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GType::Excitatory => "Excitatory",
            GType::Inhibitory => "Inhibitory",
            GType::Modulatory => "Modulatory",
            GType::Maintenance => "Maintenance",
            GType::Context => "Context",
        }
    }
}

/// Communication parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComParams {
    /// Conductance type driven in the receiving layer
    pub gtype: GType,
}

/// Configured strength of a pathway before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathScaleParams {
    /// Weight relative to other pathways of the same conductance type
    pub rel: f32,
    /// Absolute multiplier, not subject to normalization
    pub abs: f32,
}

impl Default for PathScaleParams {
    fn default() -> Self {
        Self { rel: 1.0, abs: 1.0 }
    }
}

/// Normalized conductance scale computed by `Network::init_gscale`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GScale {
    /// Scale applied to synaptic input
    pub scale: f32,
    /// Group-normalized relative weight
    pub rel: f32,
}

/// A pathway from a sending layer to a receiving layer.
pub struct Path {
    pub(crate) name: String,
    pub(crate) index: u32,
    pub(crate) send: LayerId,
    pub(crate) recv: LayerId,
    pub(crate) path_type: PathType,
    pub(crate) pattern: Box<dyn Pattern>,
    pub(crate) off: bool,

    /// Communication parameters
    pub com: ComParams,
    /// Relative and absolute scaling
    pub path_scale: PathScaleParams,
    /// Initial weight distribution
    pub swt_init: SwtInitParams,
    /// Result of scale normalization
    pub(crate) gscale: GScale,

    pub(crate) recv_con: Vec<StartN>,
    pub(crate) recv_con_index: Vec<u32>,
    pub(crate) send_con: Vec<StartN>,
    pub(crate) send_con_index: Vec<u32>,
    pub(crate) send_syn_index: Vec<u32>,
    pub(crate) recv_con_n_avg_max: AvgMax,
    pub(crate) send_con_n_avg_max: AvgMax,

    // Offsets into network-global arrays, assigned by Network::build
    pub(crate) syn_start: u32,
    pub(crate) recv_con_start: u32,
    pub(crate) send_con_start: u32,
    pub(crate) is_built: bool,
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("name", &self.name)
            .field("path_type", &self.path_type)
            .field("pattern", &self.pattern.name())
            .field("off", &self.off)
            .field("gtype", &self.com.gtype)
            .field("n_syns", &self.n_syns())
            .field("gscale", &self.gscale)
            .finish()
    }
}

impl Path {
    pub(crate) fn new(
        name: String,
        index: u32,
        send: LayerId,
        recv: LayerId,
        pattern: Box<dyn Pattern>,
        path_type: PathType,
    ) -> Self {
        Self {
            name,
            index,
            send,
            recv,
            path_type,
            pattern,
            off: false,
            com: ComParams {
                gtype: path_type.default_gtype(),
            },
            path_scale: PathScaleParams {
                rel: path_type.default_rel(),
                ..Default::default()
            },
            swt_init: SwtInitParams {
                sym: path_type.default_sym(),
                ..Default::default()
            },
            gscale: GScale::default(),
            recv_con: Vec::new(),
            recv_con_index: Vec::new(),
            send_con: Vec::new(),
            send_con_index: Vec::new(),
            send_syn_index: Vec::new(),
            recv_con_n_avg_max: AvgMax::default(),
            send_con_n_avg_max: AvgMax::default(),
            syn_start: 0,
            recv_con_start: 0,
            send_con_start: 0,
            is_built: false,
        }
    }

    /// `<Send>To<Recv>`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> PathId {
        PathId(self.index)
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn send(&self) -> LayerId {
        self.send
    }

    pub fn recv(&self) -> LayerId {
        self.recv
    }

    pub fn path_type(&self) -> PathType {
        self.path_type
    }

    pub fn pattern(&self) -> &dyn Pattern {
        &*self.pattern
    }

    pub fn is_off(&self) -> bool {
        self.off
    }

    /// Whether connectivity was built for this pathway.
    pub fn is_built(&self) -> bool {
        self.is_built
    }

    pub fn gscale(&self) -> GScale {
        self.gscale
    }

    /// Number of synapses owned by this pathway.
    pub fn n_syns(&self) -> usize {
        self.recv_con_index.len()
    }

    /// First synapse of this pathway in the network-global synapse array.
    pub fn syn_start(&self) -> usize {
        self.syn_start as usize
    }

    pub fn recv_con(&self) -> &[StartN] {
        &self.recv_con
    }

    /// Sending unit of each synapse slot, in receive order.
    pub fn recv_con_index(&self) -> &[u32] {
        &self.recv_con_index
    }

    pub fn send_con(&self) -> &[StartN] {
        &self.send_con
    }

    /// Receiving unit of each send-side entry.
    pub fn send_con_index(&self) -> &[u32] {
        &self.send_con_index
    }

    /// Synapse slot of each send-side entry.
    pub fn send_syn_index(&self) -> &[u32] {
        &self.send_syn_index
    }

    /// Per-receiver connection count statistics.
    pub fn recv_con_n_avg_max(&self) -> &AvgMax {
        &self.recv_con_n_avg_max
    }

    /// Per-sender connection count statistics.
    pub fn send_con_n_avg_max(&self) -> &AvgMax {
        &self.send_con_n_avg_max
    }

    /// Pathway-relative synapse slots onto receiving unit `ri`.
    pub fn recv_syn_range(&self, ri: usize) -> std::ops::Range<usize> {
        self.recv_con.get(ri).map_or(0..0, |c| c.range())
    }

    /// Pathway-relative synapse slots from sending unit `si`, in receiver order.
    pub fn send_syn_range(&self, si: usize) -> impl Iterator<Item = usize> + '_ {
        let ks = self.send_con.get(si).map_or(0..0, |c| c.range());
        self.send_syn_index[ks].iter().map(|&syi| syi as usize)
    }

    /// Drop all connectivity, leaving the pathway unbuilt.
    pub(crate) fn clear_connectivity(&mut self) {
        self.recv_con.clear();
        self.recv_con_index.clear();
        self.send_con.clear();
        self.send_con_index.clear();
        self.send_syn_index.clear();
        self.recv_con_n_avg_max = AvgMax::default();
        self.send_con_n_avg_max = AvgMax::default();
        self.gscale = GScale::default();
        self.syn_start = 0;
        self.recv_con_start = 0;
        self.send_con_start = 0;
        self.is_built = false;
    }

    /// Instantiate connectivity from the pathway's pattern.
    ///
    /// Pattern contract breaches are logged and absorbed: count vectors of
    /// the wrong length are resized, mask bits beyond `send_len * recv_len`
    /// are ignored, connections that overflow a promised count are dropped,
    /// and tables are compacted so both sides always describe the same
    /// synapse slots. Returns the number of synapses created.
    pub(crate) fn build_connectivity(&mut self, send_shape: &Shape, recv_shape: &Shape) -> usize {
        let same_layer = self.send == self.recv;
        let cons = self.pattern.connect(send_shape, recv_shape, same_layer);
        self.build_from_connections(cons, send_shape.len(), recv_shape.len())
    }

    pub(crate) fn build_from_connections(
        &mut self,
        cons: Connections,
        slen: usize,
        rlen: usize,
    ) -> usize {
        let Connections {
            mut send_n,
            mut recv_n,
            cons: mask,
        } = cons;

        if recv_n.len() != rlen {
            warn!(
                target: "corticore",
                path = %self.name,
                got = recv_n.len(),
                expected = rlen,
                "pattern returned wrong number of recv counts"
            );
            recv_n.resize(rlen, 0);
        }
        if send_n.len() != slen {
            warn!(
                target: "corticore",
                path = %self.name,
                got = send_n.len(),
                expected = slen,
                "pattern returned wrong number of send counts"
            );
            send_n.resize(slen, 0);
        }
        self.clamp_counts(&mut recv_n, slen, "recv");
        self.clamp_counts(&mut send_n, rlen, "send");

        let n_recv_tot =
            set_con_start_n(&mut self.recv_con, &mut self.recv_con_n_avg_max, &recv_n) as usize;
        let n_send_tot =
            set_con_start_n(&mut self.send_con, &mut self.send_con_n_avg_max, &send_n) as usize;
        if n_recv_tot != n_send_tot {
            warn!(
                target: "corticore",
                path = %self.name,
                recv_total = n_recv_tot,
                send_total = n_send_tot,
                "recv and send connection totals disagree"
            );
        }

        self.recv_con_index = vec![0; n_recv_tot];
        self.send_con_index = vec![0; n_send_tot];
        self.send_syn_index = vec![0; n_send_tot];

        let n_bits = slen * rlen;
        let mut recv_fill = vec![0u32; rlen];
        let mut send_fill = vec![0u32; slen];
        let mut n_placed = 0usize;
        let mut n_stray = 0usize;

        for bit in mask.iter_ones() {
            if bit >= n_bits {
                n_stray += 1;
                continue;
            }
            let ri = bit / slen;
            let si = bit % slen;
            let rc = self.recv_con[ri];
            let sc = self.send_con[si];
            if recv_fill[ri] >= rc.n {
                warn!(
                    target: "corticore",
                    path = %self.name,
                    recv = ri,
                    send = si,
                    promised = rc.n,
                    "recv connection count exceeded; dropping connection"
                );
                continue;
            }
            if send_fill[si] >= sc.n {
                warn!(
                    target: "corticore",
                    path = %self.name,
                    recv = ri,
                    send = si,
                    promised = sc.n,
                    "send connection count exceeded; dropping connection"
                );
                continue;
            }
            let syi = rc.start + recv_fill[ri];
            self.recv_con_index[syi as usize] = si as u32;
            let sk = (sc.start + send_fill[si]) as usize;
            self.send_con_index[sk] = ri as u32;
            self.send_syn_index[sk] = syi;
            recv_fill[ri] += 1;
            send_fill[si] += 1;
            n_placed += 1;
        }

        if n_stray > 0 {
            warn!(
                target: "corticore",
                path = %self.name,
                n_stray,
                "connection mask has bits beyond send_len * recv_len"
            );
        }

        if n_placed != n_recv_tot || n_placed != n_send_tot {
            warn!(
                target: "corticore",
                path = %self.name,
                placed = n_placed,
                recv_total = n_recv_tot,
                send_total = n_send_tot,
                "connection counts not met by mask; compacting"
            );
            self.compact(&recv_fill, &send_fill);
        }

        self.is_built = true;
        debug!(
            target: "corticore",
            path = %self.name,
            pattern = self.pattern.name(),
            n_syns = self.n_syns(),
            recv_avg = self.recv_con_n_avg_max.avg,
            recv_max = self.recv_con_n_avg_max.max,
            send_avg = self.send_con_n_avg_max.avg,
            send_max = self.send_con_n_avg_max.max,
            "built pathway connectivity"
        );
        self.n_syns()
    }

    /// Cap each unit's promised count at the number of possible partners.
    fn clamp_counts(&self, counts: &mut [u32], n_partners: usize, side: &str) {
        let limit = u32::try_from(n_partners).unwrap_or(u32::MAX);
        for (ui, n) in counts.iter_mut().enumerate() {
            if *n > limit {
                warn!(
                    target: "corticore",
                    path = %self.name,
                    side,
                    unit = ui,
                    promised = *n,
                    limit,
                    "connection count exceeds possible partners; clamping"
                );
                *n = limit;
            }
        }
    }

    /// Rebuild both tables from the actual fill counts.
    fn compact(&mut self, recv_fill: &[u32], send_fill: &[u32]) {
        let old_recv_con = std::mem::take(&mut self.recv_con);
        let old_recv_index = std::mem::take(&mut self.recv_con_index);
        let old_send_con = std::mem::take(&mut self.send_con);
        let old_send_index = std::mem::take(&mut self.send_con_index);
        let old_send_syn = std::mem::take(&mut self.send_syn_index);

        let n_recv =
            set_con_start_n(&mut self.recv_con, &mut self.recv_con_n_avg_max, recv_fill) as usize;
        let n_send =
            set_con_start_n(&mut self.send_con, &mut self.send_con_n_avg_max, send_fill) as usize;
        debug_assert_eq!(n_recv, n_send);

        let mut remap = vec![u32::MAX; old_recv_index.len()];
        self.recv_con_index = Vec::with_capacity(n_recv);
        for (old, new) in old_recv_con.iter().zip(self.recv_con.iter()) {
            for k in 0..new.n {
                remap[(old.start + k) as usize] = new.start + k;
                self.recv_con_index.push(old_recv_index[(old.start + k) as usize]);
            }
        }

        self.send_con_index = Vec::with_capacity(n_send);
        self.send_syn_index = Vec::with_capacity(n_send);
        for (old, new) in old_send_con.iter().zip(self.send_con.iter()) {
            for k in 0..new.n {
                let ok = (old.start + k) as usize;
                self.send_con_index.push(old_send_index[ok]);
                self.send_syn_index.push(remap[old_send_syn[ok] as usize]);
            }
        }
    }

    /// Synapse slot connecting layer-relative units `send` and `recv`.
    ///
    /// Searches the sender's entry with [`interp_search`] and maps the hit
    /// through the cross-index. Returns `None` when the pair is unconnected
    /// or either index is out of range.
    pub fn syn_index(&self, send: usize, recv: usize) -> Option<usize> {
        let sc = self.send_con.get(send)?;
        let k = interp_search(&self.send_con_index[sc.range()], recv as u32)?;
        Some(self.send_syn_index[sc.start as usize + k] as usize)
    }

    /// Same as [`Path::syn_index`] but searching the receiver's entry.
    pub fn recv_syn_index(&self, send: usize, recv: usize) -> Option<usize> {
        let rc = self.recv_con.get(recv)?;
        let k = interp_search(&self.recv_con_index[rc.range()], send as u32)?;
        Some(rc.start as usize + k)
    }
}

/// Position of `target` in a strictly increasing slice.
///
/// Rejects targets outside `[first, last]` immediately, otherwise starts at
/// the position linear interpolation predicts and scans outward in both
/// directions. Average work is small for evenly spread partners; clustered
/// partners degrade toward a linear scan.
pub fn interp_search(sorted: &[u32], target: u32) -> Option<usize> {
    let n = sorted.len();
    let (&first, &last) = (sorted.first()?, sorted.last()?);
    if target < first || target > last {
        return None;
    }
    let mut up = 0usize;
    if last > first {
        let frac = (target - first) as f64 / (last - first) as f64;
        up = ((n as f64 * frac) as usize).min(n - 1);
    }
    let mut dn = up.checked_sub(1);
    loop {
        let mut doing = false;
        if up < n {
            doing = true;
            if sorted[up] == target {
                return Some(up);
            }
            up += 1;
        }
        if let Some(d) = dn {
            doing = true;
            if sorted[d] == target {
                return Some(d);
            }
            dn = d.checked_sub(1);
        }
        if !doing {
            return None;
        }
    }
}
