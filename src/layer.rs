//! Layers - named groups of neurons with a shared grid shape.
//!
//! A layer is declared with a name, a [`Shape`] and a [`LayerKind`]. At build
//! time the network hands it a contiguous range of the global neuron array
//! and of the global pool array; the layer itself only stores those offsets.

use crate::shape::Shape;
use serde::{Deserialize, Serialize};

/// Identifier of a layer within its network (its declaration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    /// Create a LayerId from a raw index (for testing).
    #[doc(hidden)]
    pub fn from_raw(id: u32) -> Self {
        LayerId(id)
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Functional kind of a layer.
///
/// Kind-specific defaults are looked up here rather than spread across
/// layer types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Superficial cortical layer; the generic hidden layer
    #[default]
    Super,
    /// Receives external input
    Input,
    /// Receives external targets for plus-phase learning
    Target,
    /// Receives external comparison values that drive statistics only
    Compare,
    /// Layer 6 corticothalamic neurons
    Ct,
    /// Thalamic relay neurons driven by CT predictions and outcomes
    Pulvinar,
    /// Thalamic reticular nucleus
    Trn,
    /// Pyramidal tract neurons with robust active maintenance
    PtMaint,
}

impl LayerKind {
    /// All kinds, in declaration order.
    pub const ALL: [LayerKind; 8] = [
        LayerKind::Super,
        LayerKind::Input,
        LayerKind::Target,
        LayerKind::Compare,
        LayerKind::Ct,
        LayerKind::Pulvinar,
        LayerKind::Trn,
        LayerKind::PtMaint,
    ];

    /// Whether neurons of this kind take values from outside the network.
    pub fn is_ext(self) -> bool {
        matches!(self, LayerKind::Input | LayerKind::Target | LayerKind::Compare)
    }

    /// Nominal expected proportion of active neurons.
    pub fn default_act_avg(self) -> f32 {
        match self {
            LayerKind::Super | LayerKind::Input | LayerKind::Target | LayerKind::Compare => 0.1,
            LayerKind::Ct => 0.12,
            LayerKind::Pulvinar => 0.1,
            LayerKind::Trn => 0.3,
            LayerKind::PtMaint => 0.05,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Super => "Super",
            LayerKind::Input => "Input",
            LayerKind::Target => "Target",
            LayerKind::Compare => "Compare",
            LayerKind::Ct => "CT",
            LayerKind::Pulvinar => "Pulvinar",
            LayerKind::Trn => "TRN",
            LayerKind::PtMaint => "PTMaint",
        }
    }
}

/// Inhibition-related layer parameters consumed by scale normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InhibParams {
    /// Nominal expected activity level, used to scale outgoing pathways
    pub act_avg_nominal: f32,
}

impl InhibParams {
    pub fn for_kind(kind: LayerKind) -> Self {
        Self {
            act_avg_nominal: kind.default_act_avg(),
        }
    }
}

/// A layer of neurons.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) name: String,
    pub(crate) index: u32,
    pub(crate) kind: LayerKind,
    pub(crate) shape: Shape,
    pub(crate) off: bool,

    /// Inhibition parameters
    pub inhib: InhibParams,

    // Assigned by Network::build
    pub(crate) neur_start: u32,
    pub(crate) n_neurons: u32,
    pub(crate) pool_start: u32,
    pub(crate) n_pools: u32,
    pub(crate) is_built: bool,

    pub(crate) recv_paths: Vec<crate::path::PathId>,
    pub(crate) send_paths: Vec<crate::path::PathId>,
}

impl Layer {
    pub(crate) fn new(name: &str, index: u32, shape: Shape, kind: LayerKind) -> Self {
        Self {
            name: name.to_string(),
            index,
            kind,
            shape,
            off: false,
            inhib: InhibParams::for_kind(kind),
            neur_start: 0,
            n_neurons: 0,
            pool_start: 0,
            n_pools: 0,
            is_built: false,
            recv_paths: Vec::new(),
            send_paths: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> LayerId {
        LayerId(self.index)
    }

    /// Declaration-order index.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn is_off(&self) -> bool {
        self.off
    }

    /// Whether the layer received neurons and pools in the last build.
    pub fn is_built(&self) -> bool {
        self.is_built
    }

    /// First neuron in the network-global neuron array.
    pub fn neur_start(&self) -> usize {
        self.neur_start as usize
    }

    pub fn n_neurons(&self) -> usize {
        self.n_neurons as usize
    }

    /// Global neuron indexes owned by this layer.
    pub fn neuron_range(&self) -> std::ops::Range<usize> {
        self.neur_start()..self.neur_start() + self.n_neurons()
    }

    /// First pool in the network-global pool array.
    pub fn pool_start(&self) -> usize {
        self.pool_start as usize
    }

    /// Number of pools including the layer pool.
    pub fn n_pools(&self) -> usize {
        self.n_pools as usize
    }

    pub fn n_sub_pools(&self) -> usize {
        self.shape.n_sub_pools()
    }

    /// Every pathway declared into this layer, enabled or not.
    pub fn recv_paths(&self) -> &[crate::path::PathId] {
        &self.recv_paths
    }

    /// Every pathway declared out of this layer, enabled or not.
    pub fn send_paths(&self) -> &[crate::path::PathId] {
        &self.send_paths
    }
}
