// Tile Streaming Demo
// Loads a synthetic point cloud, pans a simulated camera across a 16 x 8 tile
// pyramid level and reports how many particles each debounced rebuild streams.
//
// Run with: RUST_LOG=debug cargo run --example tile_streaming_demo

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::time::Duration;

use panocloud::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

const COLS: u32 = 16;
const ROWS: u32 = 8;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 500K samples, roughly what one indoor scan produces
    let json = synthetic_payload(500_000);
    let mut tiles = tile_level();

    let config = OverlayConfig {
        vertex_packing: VertexPacking::Half,
        ..OverlayConfig::default()
    };
    let mut overlay = PointCloudOverlay::new(config, EventBus::new());
    if let Err(e) = overlay.load_json(&json, &mut tiles) {
        eprintln!("load failed: {}", e);
        return;
    }

    // Pan a 90° wide view once around the horizon, one step every 100 ms
    let mut now = Duration::ZERO;
    for step in 0..36 {
        let center = step as f64 * 10.0 * PI / 180.0;
        let mut changed = false;
        for tile in tiles.iter_mut() {
            let visible = in_view(tile, center);
            changed |= visible != tile.visible;
            tile.visible = visible;
        }
        if changed {
            overlay.notify_visibility_changed(now);
        }
        if let Some(stats) = overlay.tick(now, &mut tiles) {
            println!(
                "t={:>5}ms  rebuilt {:>2} tiles, {:>7} particles",
                now.as_millis(),
                stats.tiles_rebuilt,
                stats.particles
            );
        }
        now += Duration::from_millis(100);
    }

    let streamed: Vec<&ParticleSet> = tiles.iter().filter_map(|t| t.particles()).collect();
    let particles: usize = streamed.iter().map(|p| p.count()).sum();
    let bytes: usize = streamed.iter().map(|p| overlay.encode_particles(p).len()).sum();

    println!("\n=== Tile Streaming Summary ===");
    println!("Tiles with particles: {} / {}", streamed.len(), tiles.len());
    println!("Particles streamed: {}", particles);
    println!("Upload size (f16): {:.2} MB", bytes as f64 / (1024.0 * 1024.0));
    println!("Scheduler: {:?}", overlay.scheduler().stats());
}

fn synthetic_payload(n: usize) -> String {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut points = Vec::with_capacity(n * 4);
    for i in 0..n {
        points.push(rng.gen_range(0.0..TAU));
        points.push(rng.gen_range(-FRAC_PI_2..FRAC_PI_2));
        points.push(rng.gen_range(1.0..30.0));
        points.push(i as f64);
    }
    let payload = PointCloudPayload {
        points: Some(points),
        points_format: ["theta", "phi", "depth", "index"].map(String::from).to_vec(),
    };
    serde_json::to_string(&payload).unwrap_or_default()
}

fn tile_level() -> Vec<Tile> {
    let width = TAU / COLS as f64;
    let height = PI / ROWS as f64;
    let mut tiles = Vec::new();
    for col in 0..COLS {
        for row in 0..ROWS {
            let theta = col as f64 * width;
            let phi = row as f64 * height;
            tiles.push(Tile::new(
                col,
                row,
                TileBounds::new(
                    AngularSpan::new(theta, theta + width),
                    AngularSpan::new(phi, phi + height),
                ),
            ));
        }
    }
    tiles
}

fn in_view(tile: &Tile, center: f64) -> bool {
    let mid = (tile.bounds.theta.min + tile.bounds.theta.max) / 2.0;
    let mut d = (mid - center).abs();
    if d > PI {
        d = TAU - d;
    }
    let elevation = (tile.bounds.phi.min + tile.bounds.phi.max) / 2.0;
    d < PI / 4.0 && (elevation - FRAC_PI_2).abs() < PI / 3.0
}
