// Overlay configuration
//
// Plain serde struct with defaults and a couple of named profiles. A partial JSON
// document only overrides the fields it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::VertexPacking;
use crate::error::DataFormatError;
use crate::scheduler::DEFAULT_DEBOUNCE;
use crate::source::UrlRewrite;

/// How particle buffers are produced for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleStrategy {
    /// One buffer per visible tile, built lazily and cached on the tile
    #[default]
    TileStreaming,
    /// One buffer for the whole field of view, rebuilt on every camera move
    Viewport,
}

/// Marker drawn on the hovered particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorMarkerConfig {
    /// Distance from the camera the marker is drawn at
    /// Default: 10.0
    pub distance: f32,

    /// Marker scale at zoom 1, divided by the zoom level
    /// Default: 0.1
    pub base_scale: f32,
}

impl Default for CursorMarkerConfig {
    fn default() -> Self {
        Self {
            distance: 10.0,
            base_scale: 0.1,
        }
    }
}

/// Configuration for the point cloud overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Dispatch particlemouse* and particleclick events
    /// Default: true
    pub enable_particle_events: bool,

    /// Draw the marker on the hovered particle
    /// Default: true
    pub show_particle_cursor: bool,

    /// Log the hovered particle's details
    /// Default: false
    pub show_debug_info: bool,

    /// Delay between the first visibility change and the tile rebuild
    /// Default: 500
    pub debounce_ms: u64,

    pub strategy: ParticleStrategy,

    pub url_rewrite: UrlRewrite,

    pub cursor: CursorMarkerConfig,

    /// Default: full f32 positions
    pub vertex_packing: VertexPacking,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enable_particle_events: true,
            show_particle_cursor: true,
            show_debug_info: false,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            strategy: ParticleStrategy::TileStreaming,
            url_rewrite: UrlRewrite::default(),
            cursor: CursorMarkerConfig::default(),
            vertex_packing: VertexPacking::Full,
        }
    }
}

impl OverlayConfig {
    /// Full-viewport rescans instead of tile streaming
    pub fn viewport() -> Self {
        Self {
            strategy: ParticleStrategy::Viewport,
            ..Self::default()
        }
    }

    /// No pointer interaction: particles are drawn but never picked
    pub fn headless() -> Self {
        Self {
            enable_particle_events: false,
            show_particle_cursor: false,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DataFormatError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OverlayConfig::default();
        assert!(config.enable_particle_events);
        assert!(config.show_particle_cursor);
        assert!(!config.show_debug_info);
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.strategy, ParticleStrategy::TileStreaming);
        assert_eq!(config.url_rewrite.suffixes, vec![".json"]);
        assert_eq!(config.cursor.distance, 10.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = OverlayConfig::from_json(
            r#"{"strategy": "viewport", "debounce_ms": 250, "cursor": {"base_scale": 0.5}, "vertex_packing": "half"}"#,
        )
        .unwrap();
        assert_eq!(config.strategy, ParticleStrategy::Viewport);
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.cursor.base_scale, 0.5);
        assert_eq!(config.cursor.distance, 10.0);
        assert_eq!(config.vertex_packing, VertexPacking::Half);
        assert!(config.enable_particle_events);
    }

    #[test]
    fn profiles() {
        assert_eq!(OverlayConfig::viewport().strategy, ParticleStrategy::Viewport);
        let headless = OverlayConfig::headless();
        assert!(!headless.enable_particle_events);
        assert!(!headless.show_particle_cursor);
        assert!(OverlayConfig::from_json("[1]").is_err());
    }
}
