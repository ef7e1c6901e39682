//! Network configuration serialization.
//!
//! This module provides types for describing a network declaratively and
//! saving that description as JSON or compact binary. A [`NetworkConfig`]
//! lists layers by name and pathways by the names of the layers they join;
//! `Network::from_config` declares them on a fresh network and
//! `Network::to_config` exports them again.
//!
//! Optional fields left as `None` keep the defaults that follow from the
//! layer kind or pathway type.
//!
//! # Example
//!
//! ```
//! use corticore::{LayerKind, Network, NetworkConfig, PathType};
//! use corticore::network_config::{LayerConfig, PathConfig};
//! use corticore::pattern::PatternConfig;
//!
//! # fn main() -> corticore::Result<()> {
//! let config = NetworkConfig::new(
//!     "toy",
//!     vec![
//!         LayerConfig::new("In", &[4, 4], LayerKind::Input),
//!         LayerConfig::new("Out", &[2, 2], LayerKind::Target),
//!     ],
//!     vec![PathConfig::new("In", "Out", PatternConfig::Full { self_con: false }, PathType::Forward)],
//! );
//! let json = config.to_json()?;
//! let mut net = Network::from_config(&NetworkConfig::from_json(&json)?)?;
//! net.build()?;
//! assert_eq!(net.stats().n_synapses, 64);
//! # Ok(())
//! # }
//! ```

use crate::layer::LayerKind;
use crate::path::{GType, PathType};
use crate::pattern::PatternConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declarative description of one layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerConfig {
    /// Unique layer name
    pub name: String,
    /// Dimension sizes, 2-D or 4-D
    pub shape: Vec<usize>,
    #[serde(default)]
    pub kind: LayerKind,
    #[serde(default)]
    pub off: bool,
    /// Overrides the kind's nominal activity
    #[serde(default)]
    pub act_avg_nominal: Option<f32>,
}

impl LayerConfig {
    pub fn new(name: &str, shape: &[usize], kind: LayerKind) -> Self {
        Self {
            name: name.to_string(),
            shape: shape.to_vec(),
            kind,
            off: false,
            act_avg_nominal: None,
        }
    }
}

/// Declarative description of one pathway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathConfig {
    /// Sending layer name
    pub send: String,
    /// Receiving layer name
    pub recv: String,
    pub pattern: PatternConfig,
    #[serde(default)]
    pub path_type: PathType,
    #[serde(default)]
    pub off: bool,
    /// Overrides the type's conductance type
    #[serde(default)]
    pub gtype: Option<GType>,
    /// Overrides the type's relative weight
    #[serde(default)]
    pub rel: Option<f32>,
    #[serde(default)]
    pub abs: Option<f32>,
    /// Overrides the type's symmetry default
    #[serde(default)]
    pub sym: Option<bool>,
}

impl PathConfig {
    pub fn new(send: &str, recv: &str, pattern: PatternConfig, path_type: PathType) -> Self {
        Self {
            send: send.to_string(),
            recv: recv.to_string(),
            pattern,
            path_type,
            off: false,
            gtype: None,
            rel: None,
            abs: None,
            sym: None,
        }
    }
}

/// Complete network configuration.
///
/// Contains everything needed to declare a network again:
/// - Layer names, shapes and kinds
/// - Pathways between named layers, with patterns and parameters
/// - Optional metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Version of the serialization format
    pub version: String,

    /// Network name
    #[serde(default)]
    pub name: String,

    pub layers: Vec<LayerConfig>,

    #[serde(default)]
    pub paths: Vec<PathConfig>,

    /// Optional metadata (description, author, etc.)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl NetworkConfig {
    /// Create a new network configuration.
    pub fn new(name: &str, layers: Vec<LayerConfig>, paths: Vec<PathConfig>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: name.to_string(),
            layers,
            paths,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the configuration.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to binary (bincode).
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary (bincode).
    pub fn from_binary(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}
