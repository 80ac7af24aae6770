// Data-driven settlement configuration.
//
// Every tunable of a generation run lives in `SettlementConfig`, loaded from
// JSON. All fields have defaults, so a config file only names what it
// changes (`{}` is a valid config). The generator reads no magic numbers of
// its own: partitioning, adjacency, site scalars and house shape all come
// from here.
//
// The partitioner's `min_plot_dim`/`max_plot_dim` are authoritative; the
// copies in `site` are overwritten with them when a run builds its site so
// builders and the partitioner always agree.
//
// See also: `partition.rs` for `PartitionParams`, `site.rs` for `SiteInfo`,
// `builders.rs` for `HouseParams`, `generate.rs` which consumes the config.
//
// **Critical constraint: determinism.** Together with the seed, the config
// fully determines a layout. Two runs with equal configs over equal levels
// produce equal settlements.

use crate::builders::HouseParams;
use crate::partition::PartitionParams;
use crate::plot::NeighbourMode;
use crate::site::SiteInfo;
use crate::types::VoxelCoord;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Environment variable naming a config file for `SettlementConfig::from_env`.
pub const CONFIG_PATH_VAR: &str = "HAMLET_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse settlement config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read settlement config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Seed for the run's `SiteRng`.
    pub seed: u64,
    pub partition: PartitionParams,
    pub neighbours: NeighbourMode,
    pub site: SiteInfo,
    /// Margin around the region that is cleared above the surface and
    /// marked dirty after building.
    pub site_border: VoxelCoord,
    /// Regions smaller than this (per axis) are grown symmetrically to it.
    pub minimum_region: Option<VoxelCoord>,
    pub house: HouseParams,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            partition: PartitionParams::default(),
            neighbours: NeighbourMode::default(),
            site: SiteInfo::default(),
            site_border: VoxelCoord::new(2, 10, 2),
            minimum_region: None,
            house: HouseParams::default(),
        }
    }
}

impl SettlementConfig {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Load the file named by `HAMLET_CONFIG_PATH`, falling back to the
    /// defaults when the variable is unset or the file is unusable.
    pub fn from_env() -> Self {
        let Some(path) = env::var_os(CONFIG_PATH_VAR).map(PathBuf::from) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "settlement config load failed, using defaults"
                );
                Self::default()
            }
        }
    }
}
