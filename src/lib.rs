//! Corticore - Structural Core for Spiking Neural Networks
//!
//! Corticore assembles the structural and numeric substrate of large,
//! biologically inspired spiking networks: layers of neurons grouped into
//! inhibitory pools, joined by sparse pathways whose connectivity comes from
//! declarative patterns. Every relationship is an index into a flat arena,
//! so the result can be handed to multi-threaded CPU or GPU-style execution
//! backends without pointer chasing.
//!
//! # Architecture
//!
//! - **Shape / Pool**: 2-D and 4-D layer geometry and pool partitioning
//! - **Pattern**: pluggable connectivity (full, one-to-one, pooled, random)
//! - **Path**: dual receive/send indexed sparse tables over one synapse run,
//!   with interpolation search for synapse lookup
//! - **Scale**: per-conductance-type normalization of pathway strength
//! - **Network**: owns the neuron, pool and synapse arrays and drives build,
//!   weight initialization and symmetry
//!
//! # Examples
//!
//! ```
//! use corticore::{Full, LayerKind, Network, PathType, Result};
//!
//! # fn main() -> Result<()> {
//! let mut net = Network::new("v1");
//! let lgn = net.add_layer_2d("LGN", 4, 4, LayerKind::Input)?;
//! let v1 = net.add_layer_4d("V1", 2, 2, 2, 2, LayerKind::Super)?;
//! let fwd = net.connect_layers(lgn, v1, Box::new(Full::new()), PathType::Forward)?;
//! net.lateral_connect_layer(v1, Full::new())?;
//! net.build()?;
//!
//! let pt = net.path(fwd)?;
//! assert_eq!(pt.n_syns(), 16 * 16);
//! assert!(net.syn_index(fwd, 3, 5).is_some());
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Build progress and pattern contract breaches are reported through
//! `tracing` under the `corticore` target. Install any subscriber to see
//! them; the library never installs one itself.

pub mod con_index;
pub mod error;
pub mod layer;
pub mod network;
pub mod network_config;
pub mod neuron;
pub mod path;
pub mod pattern;
pub mod pool;
pub mod scale;
pub mod shape;
pub mod synapse;
pub mod threads;

// Re-exports for convenient access
pub use con_index::{AvgMax, StartN};
pub use error::{BuildErrors, CorticoreError, Result};
pub use layer::{InhibParams, Layer, LayerId, LayerKind};
pub use network::{Network, NetworkStats};
pub use network_config::NetworkConfig;
pub use neuron::Neuron;
pub use path::{interp_search, ComParams, GScale, GType, Path, PathId, PathScaleParams, PathType};
pub use pattern::{Connections, Full, OneToOne, Pattern, PatternConfig, PoolOneToOne, UniformRand};
pub use pool::Pool;
pub use scale::{ScaleFn, SendActScale};
pub use shape::Shape;
pub use synapse::{SwtInitParams, Synapse};
pub use threads::{parallel_run, partition_ranges, NetThreads};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "Corticore";

/// Get version string
pub fn version() -> String {
    format!("{} v{}", NAME, VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(ver.contains("Corticore"));
        assert!(ver.contains(VERSION));
    }

    #[test]
    fn test_re_exports() {
        let _sh = Shape::new_2d(2, 2);
        let _result: Result<()> = Ok(());
        assert_eq!(GType::ALL.len(), GType::N);
    }
}
