// Point cloud overlay for spherical panoramas
// Degree-bucketed spatial index, per-tile particle streaming and cursor picking

pub mod angles;
pub mod buffer;
pub mod config;
pub mod dataset;
pub mod error;
pub mod events;
pub mod grid;
pub mod locator;
pub mod overlay;
pub mod scheduler;
pub mod source;
pub mod tile;
pub mod viewport;

// Re-exports
pub use buffer::{PackedVec3, ParticleSet, VertexPacking};
pub use config::{CursorMarkerConfig, OverlayConfig, ParticleStrategy};
pub use dataset::{Dataset, FieldLayout, Particle, ParticleIndex, ParticleInfo, PointCloudPayload, SphericalCoords};
pub use error::{DataFormatError, FetchError, OverlayError, OverlayResult};
pub use events::{EventBus, EventKind, OverlayEvent, PointerEvent, Propagation, SubscriptionId};
pub use grid::SphericalGridIndex;
pub use locator::{angular_distance_sq, locate, nearest_particle, CursorCoords, HoverChange, HoverState};
pub use overlay::{CursorMarker, OverlayState, PointCloudOverlay};
pub use scheduler::{ScheduledRebuild, SchedulerStats, UpdateScheduler, DEFAULT_DEBOUNCE};
pub use source::{fetch_dataset, resolve_dataset_url, DatasetFetcher, DatasetLocation, UrlRewrite};
pub use tile::{
    build_tile_particles, collect_tile_particles, rebuild_visible_tiles, AngularSpan, CellKind, DegreeSpan, Tile,
    TileBoundary, TileBounds, TileCell, TileSetStats,
};
pub use viewport::{build_viewport_particles, CameraView, FovWindow, ViewportBuild};
