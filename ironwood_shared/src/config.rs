//! Configuration system.
//!
//! Loads client configuration from JSON strings/files (file IO left to app).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the viewport does with chunk coordinates outside the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Coordinates wrap modulo the grid; the world repeats.
    Wrap,
    /// Coordinates outside the grid are skipped, leaving gaps at the edges.
    #[default]
    Clamp,
}

impl FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wrap" => Ok(BoundaryPolicy::Wrap),
            "clamp" => Ok(BoundaryPolicy::Clamp),
            other => Err(format!("unknown boundary policy: {other}")),
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPolicy::Wrap => f.write_str("wrap"),
            BoundaryPolicy::Clamp => f.write_str("clamp"),
        }
    }
}

/// Chunk grid dimensions of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldGrid {
    /// Edge length of one square chunk, in world units.
    pub chunk_size: f64,
    pub chunk_columns: u32,
    pub chunk_rows: u32,
}

impl Default for WorldGrid {
    fn default() -> Self {
        Self {
            chunk_size: 1000.0,
            chunk_columns: 10,
            chunk_rows: 10,
        }
    }
}

impl WorldGrid {
    pub fn width(&self) -> f64 {
        self.chunk_size * self.chunk_columns as f64
    }

    pub fn height(&self) -> f64 {
        self.chunk_size * self.chunk_rows as f64
    }
}

/// Root client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address, e.g. `127.0.0.1:19160`.
    pub server_addr: String,
    /// Render loop rate.
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    #[serde(default = "default_surface_width")]
    pub surface_width: u32,
    #[serde(default = "default_surface_height")]
    pub surface_height: u32,
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    /// Zoom increment per wheel notch.
    #[serde(default = "default_scale_step")]
    pub scale_step: f64,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
    /// Minimum quiet period before the view target is sent upstream.
    #[serde(default = "default_view_target_interval_ms")]
    pub view_target_interval_ms: u64,
    /// Grid used until the server sends its world metadata.
    #[serde(default)]
    pub world: WorldGrid,
}

fn default_frame_hz() -> u32 {
    60
}

fn default_surface_width() -> u32 {
    1280
}

fn default_surface_height() -> u32 {
    720
}

fn default_min_scale() -> f64 {
    1.0
}

fn default_max_scale() -> f64 {
    8.0
}

fn default_scale_step() -> f64 {
    0.5
}

fn default_view_target_interval_ms() -> u64 {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:19160".to_string(),
            frame_hz: default_frame_hz(),
            surface_width: default_surface_width(),
            surface_height: default_surface_height(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            scale_step: default_scale_step(),
            boundary: BoundaryPolicy::default(),
            view_target_interval_ms: default_view_target_interval_ms(),
            world: WorldGrid::default(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
