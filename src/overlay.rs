// Point cloud overlay: ties the dataset, the grid index, the particle builders,
// hit-testing and the rebuild scheduler to the host's hooks
//
// Lifecycle: Unloaded -> Loading -> Ready, or Loading -> Error on a failed load.
// Ready holds until `dispose`; a failed load behaves like Unloaded for the next
// load attempt. Load failures are reported through `loaderror` and returned, never
// panicked on.

use std::time::Duration;

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::buffer::ParticleSet;
use crate::config::{OverlayConfig, ParticleStrategy};
use crate::dataset::{Dataset, ParticleIndex, ParticleInfo};
use crate::error::{OverlayError, OverlayResult};
use crate::events::{EventBus, OverlayEvent, PointerEvent, Propagation};
use crate::grid::SphericalGridIndex;
use crate::locator::{nearest_particle, CursorCoords, HoverChange, HoverState};
use crate::scheduler::UpdateScheduler;
use crate::source::{fetch_dataset, resolve_dataset_url, DatasetFetcher, DatasetLocation};
use crate::tile::{rebuild_visible_tiles, Tile, TileSetStats};
use crate::viewport::{build_viewport_particles, CameraView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Error,
}

/// Marker drawn on the hovered particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorMarker {
    pub position: Vec3,
    pub scale: f32,
    pub visible: bool,
}

#[derive(Debug)]
pub struct PointCloudOverlay {
    config: OverlayConfig,
    bus: EventBus,
    state: OverlayState,
    dataset: Option<Dataset>,
    grid: Option<SphericalGridIndex>,
    hover: HoverState,
    scheduler: UpdateScheduler,
    camera: Option<CameraView>,
    viewport_particles: Option<ParticleSet>,
}

impl PointCloudOverlay {
    pub fn new(config: OverlayConfig, bus: EventBus) -> Self {
        let scheduler = UpdateScheduler::new(config.debounce());
        let mut overlay = Self {
            config,
            bus,
            state: OverlayState::Unloaded,
            dataset: None,
            grid: None,
            hover: HoverState::default(),
            scheduler,
            camera: None,
            viewport_particles: None,
        };
        overlay.bus.dispatch(&OverlayEvent::Init);
        overlay
    }

    /// Locate the panorama's point cloud, download it and build the index.
    pub async fn load<F: DatasetFetcher>(
        &mut self,
        fetcher: &F,
        location: &DatasetLocation,
        tiles: &mut [Tile],
    ) -> OverlayResult<()> {
        if !self.begin_load() {
            return Ok(());
        }
        let result = match resolve_dataset_url(fetcher, &self.config.url_rewrite, location).await {
            Ok(url) => fetch_dataset(fetcher, &url).await,
            Err(e) => Err(e.into()),
        };
        self.finish_load(result, tiles)
    }

    /// `load` for hosts without an executor.
    pub fn load_blocking<F: DatasetFetcher>(
        &mut self,
        fetcher: &F,
        location: &DatasetLocation,
        tiles: &mut [Tile],
    ) -> OverlayResult<()> {
        pollster::block_on(self.load(fetcher, location, tiles))
    }

    /// Download the point cloud at a known URL and build the index.
    pub async fn load_url<F: DatasetFetcher>(
        &mut self,
        fetcher: &F,
        url: &str,
        tiles: &mut [Tile],
    ) -> OverlayResult<()> {
        if !self.begin_load() {
            return Ok(());
        }
        let result = fetch_dataset(fetcher, url).await;
        self.finish_load(result, tiles)
    }

    /// Build the index from an already downloaded payload.
    pub fn load_json(&mut self, json: &str, tiles: &mut [Tile]) -> OverlayResult<()> {
        if !self.begin_load() {
            return Ok(());
        }
        let result = Dataset::from_json(json).map_err(OverlayError::from);
        self.finish_load(result, tiles)
    }

    fn begin_load(&mut self) -> bool {
        match self.state {
            OverlayState::Unloaded | OverlayState::Error => {
                self.state = OverlayState::Loading;
                true
            }
            state => {
                warn!("point cloud load ignored, overlay is {:?}", state);
                false
            }
        }
    }

    fn finish_load(&mut self, result: OverlayResult<Dataset>, tiles: &mut [Tile]) -> OverlayResult<()> {
        let dataset = match result {
            Ok(dataset) => dataset,
            Err(error) => {
                warn!("point cloud load failed: {}", error);
                self.state = OverlayState::Error;
                self.bus.dispatch(&OverlayEvent::LoadError { error: &error });
                return Err(error);
            }
        };

        let particles = dataset.len();
        self.bus.dispatch(&OverlayEvent::Load { particles });

        self.grid = Some(SphericalGridIndex::build(&dataset));
        self.dataset = Some(dataset);
        self.state = OverlayState::Ready;
        self.bus.dispatch(&OverlayEvent::Ready { particles });

        match self.config.strategy {
            ParticleStrategy::TileStreaming => {
                self.rebuild_tiles(tiles);
            }
            ParticleStrategy::Viewport => {
                if let Some(camera) = self.camera {
                    self.camera_moved(camera);
                }
            }
        }
        Ok(())
    }

    fn rebuild_tiles(&mut self, tiles: &mut [Tile]) -> Option<TileSetStats> {
        let (Some(dataset), Some(grid)) = (&self.dataset, &self.grid) else {
            return None;
        };
        Some(rebuild_visible_tiles(tiles, grid, dataset))
    }

    /// Tile mesh visibility changed. Returns true if a rebuild was scheduled.
    pub fn notify_visibility_changed(&mut self, now: Duration) -> bool {
        if self.state != OverlayState::Ready || self.config.strategy != ParticleStrategy::TileStreaming {
            return false;
        }
        self.scheduler.notify_visibility_changed(now)
    }

    /// Advance time: runs the pending tile rebuild once its deadline has passed.
    pub fn tick(&mut self, now: Duration, tiles: &mut [Tile]) -> Option<TileSetStats> {
        let (Some(dataset), Some(grid)) = (&self.dataset, &self.grid) else {
            return None;
        };
        self.scheduler
            .fire_if_due(now, || rebuild_visible_tiles(tiles, grid, dataset))
    }

    /// Camera moved. Rebuilds the field of view buffer under the viewport
    /// strategy and returns its particle count.
    pub fn camera_moved(&mut self, camera: CameraView) -> Option<usize> {
        self.camera = Some(camera);
        if self.config.strategy != ParticleStrategy::Viewport {
            return None;
        }
        let dataset = self.dataset.as_ref()?;

        let build = build_viewport_particles(dataset, &camera);
        let count = build.particles.count();
        self.grid = Some(build.grid);
        self.viewport_particles = Some(build.particles);
        Some(count)
    }

    /// Cursor moved over the panorama.
    pub fn pointer_moved(&mut self, cursor: CursorCoords, pointer: PointerEvent) {
        if self.state != OverlayState::Ready || !self.config.enable_particle_events {
            return;
        }
        let (Some(dataset), Some(grid)) = (&self.dataset, &self.grid) else {
            return;
        };

        let (x, y) = cursor.cell();
        let targets = grid.cell(x, y);

        if targets.is_empty() {
            if let Some(old) = self.hover.hovered() {
                let out = OverlayEvent::ParticleMouseOut {
                    target: old,
                    pointer: Some(pointer),
                };
                if self.bus.dispatch(&out) == Propagation::Continue {
                    self.hover.clear();
                }
            }
            return;
        }

        let over = OverlayEvent::ParticleMouseOver { targets, pointer };
        if self.bus.dispatch(&over) == Propagation::Stop {
            return;
        }

        let nearest = nearest_particle(dataset, &cursor, targets);
        let entered = match self.hover.change_to(nearest) {
            HoverChange::Unchanged => return,
            HoverChange::Entered(to) => to,
            HoverChange::Switched { from, to } => {
                let out = OverlayEvent::ParticleMouseOut {
                    target: from,
                    pointer: Some(pointer),
                };
                if self.bus.dispatch(&out) == Propagation::Stop {
                    return;
                }
                to
            }
            HoverChange::Left(from) => {
                let out = OverlayEvent::ParticleMouseOut {
                    target: from,
                    pointer: Some(pointer),
                };
                if self.bus.dispatch(&out) == Propagation::Continue {
                    self.hover.clear();
                }
                return;
            }
        };

        self.hover.set(Some(entered));
        self.bus.dispatch(&OverlayEvent::ParticleMouseIn { target: entered });
        if self.config.show_debug_info {
            log_particle(dataset, entered);
        }
    }

    /// Click on the panorama. Returns the handlers' verdict when a particle was
    /// hovered and the event dispatched.
    pub fn click(&mut self, pointer: PointerEvent) -> Option<Propagation> {
        if self.state != OverlayState::Ready || !self.config.enable_particle_events {
            return None;
        }
        let target = self.hover.hovered()?;
        Some(self.bus.dispatch(&OverlayEvent::ParticleClick { target, pointer }))
    }

    /// Render pass hook. Returns the cursor marker when a particle is hovered.
    pub fn render(&mut self, zoom: f32) -> Option<CursorMarker> {
        if self.state != OverlayState::Ready {
            return None;
        }
        self.bus.dispatch(&OverlayEvent::Render);

        let index = self.hover.hovered()?;
        let position = self.dataset.as_ref()?.particle_position(index)?;
        let cursor = &self.config.cursor;
        let scale = if zoom > 0.0 {
            cursor.base_scale / zoom
        } else {
            cursor.base_scale
        };

        Some(CursorMarker {
            position: position.normalize_or_zero() * cursor.distance,
            scale,
            visible: self.config.show_particle_cursor,
        })
    }

    /// Drop the dataset and everything derived from it. Any pending rebuild is
    /// cancelled; safe to call in any state. A hovered particle gets a
    /// `particlemouseout` without a pointer; the hover is dropped either way.
    pub fn dispose(&mut self, tiles: &mut [Tile]) {
        self.scheduler.cancel();
        if let Some(target) = self.hover.hovered() {
            if self.config.enable_particle_events {
                self.bus
                    .dispatch(&OverlayEvent::ParticleMouseOut { target, pointer: None });
            }
        }
        for tile in tiles.iter_mut() {
            tile.clear_particles();
        }
        self.dataset = None;
        self.grid = None;
        self.viewport_particles = None;
        self.hover.clear();
        self.state = OverlayState::Unloaded;
        debug!("point cloud disposed");
    }

    /// Upload bytes for a particle set, in the configured vertex packing.
    pub fn encode_particles(&self, set: &ParticleSet) -> Vec<u8> {
        set.encode(self.config.vertex_packing)
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn grid(&self) -> Option<&SphericalGridIndex> {
        self.grid.as_ref()
    }

    pub fn hover(&self) -> Option<ParticleIndex> {
        self.hover.hovered()
    }

    pub fn hovered_info(&self) -> Option<ParticleInfo> {
        self.dataset.as_ref()?.particle_info(self.hover.hovered()?)
    }

    pub fn viewport_particles(&self) -> Option<&ParticleSet> {
        self.viewport_particles.as_ref()
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }
}

fn log_particle(dataset: &Dataset, index: ParticleIndex) {
    let (Some(info), Some(coords)) = (dataset.particle_info(index), dataset.spherical_coords(index)) else {
        return;
    };
    info!(
        "particle {} : depth {:.3}, lon {:.2}, lat {:.2}, sample {:?}",
        info.index, info.depth, coords.lon, coords.lat, info.sample_id
    );
}
