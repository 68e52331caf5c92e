// Hover Demo
// Sweeps a cursor along the horizon of a small point cloud and prints the
// particle events an info panel would receive. Clicking is simulated on every
// particle the cursor enters.
//
// Run with: cargo run --example hover_demo

use panocloud::angles::DEG_STEP;
use panocloud::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut bus = EventBus::new();
    bus.subscribe(EventKind::Ready, |event| {
        if let OverlayEvent::Ready { particles } = event {
            println!("ready: {} particles", particles);
        }
        Propagation::Continue
    });
    bus.subscribe(EventKind::ParticleMouseIn, |event| {
        if let OverlayEvent::ParticleMouseIn { target } = event {
            println!("  mousein  #{}", target);
        }
        Propagation::Continue
    });
    bus.subscribe(EventKind::ParticleMouseOut, |event| {
        if let OverlayEvent::ParticleMouseOut { target, .. } = event {
            println!("  mouseout #{}", target);
        }
        Propagation::Continue
    });
    bus.subscribe(EventKind::ParticleClick, |event| {
        if let OverlayEvent::ParticleClick { target, pointer } = event {
            println!("  click    #{} at ({}, {})", target, pointer.x, pointer.y);
        }
        Propagation::Continue
    });

    let config = OverlayConfig {
        show_debug_info: true,
        ..OverlayConfig::default()
    };
    let mut overlay = PointCloudOverlay::new(config, bus);

    // A ring of samples every 5° around the horizon, alternating depth
    let mut points = Vec::new();
    for i in 0..72 {
        points.extend_from_slice(&[i as f64 * 5.0 * DEG_STEP, 0.0, 2.0 + (i % 2) as f64, 1000.0 + i as f64]);
    }
    let dataset = PointCloudPayload {
        points: Some(points),
        points_format: ["theta", "phi", "depth", "index"].map(String::from).to_vec(),
    };
    let json = match serde_json::to_string(&dataset) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    if let Err(e) = overlay.load_json(&json, &mut []) {
        eprintln!("load failed: {}", e);
        return;
    }

    // Viewer longitude 0 looks at azimuth 180°
    for step in 0..40 {
        let lon = (step as f64 * 0.5 - 10.0) * DEG_STEP;
        let pointer = PointerEvent {
            x: 320.0 + step as f32 * 4.0,
            y: 240.0,
        };
        let before = overlay.hover();
        overlay.pointer_moved(CursorCoords::from_view(lon, 0.0), pointer);
        if overlay.hover() != before && overlay.hover().is_some() {
            overlay.click(pointer);
        }
    }

    if let Some(marker) = overlay.render(1.5) {
        println!("cursor marker at {:?}, scale {:.3}", marker.position, marker.scale);
    }
    if let Some(info) = overlay.hovered_info() {
        println!("hovered: {:?}", info);
    }
}
