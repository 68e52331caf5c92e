// Grid partition and tile builder validation
// Tests the grid-accelerated tile query against a brute-force CPU reference

use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use panocloud::angles::DEG_STEP;
use panocloud::{
    build_tile_particles, collect_tile_particles, AngularSpan, Dataset, ParticleIndex, SphericalGridIndex, Tile,
    TileBoundary, TileBounds,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_dataset(rng: &mut StdRng, n: usize) -> Dataset {
    let mut points = Vec::with_capacity(n * 4);
    for i in 0..n {
        points.push(rng.gen_range(0.0..TAU));
        points.push(rng.gen_range(-FRAC_PI_2..=FRAC_PI_2));
        points.push(rng.gen_range(0.5..50.0));
        points.push(i as f64);
    }
    Dataset::new(points, &["theta", "phi", "depth", "index"]).unwrap()
}

// Reference: test every particle against the exact boundary
fn brute_force(boundary: &TileBoundary, dataset: &Dataset) -> HashSet<ParticleIndex> {
    dataset
        .particles()
        .filter(|(_, p)| boundary.contains(p.theta, p.elevation()))
        .map(|(i, _)| i)
        .collect()
}

fn random_bounds(rng: &mut StdRng) -> TileBounds {
    let theta_min = rng.gen_range(0.0..TAU);
    // up to almost a full turn, so spans that cover every column are compared too
    let theta_width = rng.gen_range(0.01..TAU - 0.001);
    let phi_min = rng.gen_range(0.0..PI - 0.02);
    let phi_max = rng.gen_range(phi_min + 0.01..PI);
    TileBounds::new(
        AngularSpan::new(theta_min, (theta_min + theta_width) % TAU),
        AngularSpan::new(phi_min, phi_max),
    )
}

#[test]
fn test_every_particle_in_exactly_one_cell() {
    let mut rng = StdRng::seed_from_u64(7);
    let dataset = random_dataset(&mut rng, 20_000);
    let grid = SphericalGridIndex::build(&dataset);

    let mut seen = vec![0u32; dataset.len()];
    for (_, members) in grid.iter_cells() {
        for &i in members {
            seen[i as usize] += 1;
        }
    }

    assert!(seen.iter().all(|&c| c == 1), "each particle must land in one cell");
    assert_eq!(grid.particle_count(), dataset.len());

    println!("✓ partition test passed ({} occupied cells)", grid.occupied_cells());
}

#[test]
fn test_tile_query_matches_reference() {
    let mut rng = StdRng::seed_from_u64(42);
    let dataset = random_dataset(&mut rng, 10_000);
    let grid = SphericalGridIndex::build(&dataset);

    for _ in 0..200 {
        let boundary = TileBoundary::from_bounds(&random_bounds(&mut rng));
        let fast = collect_tile_particles(&boundary, &grid, &dataset);
        let unique: HashSet<ParticleIndex> = fast.iter().copied().collect();

        assert_eq!(unique.len(), fast.len(), "no particle may be collected twice");
        assert_eq!(unique, brute_force(&boundary, &dataset), "boundary {:?}", boundary);
    }

    println!("✓ tile query matches reference (200 random tiles)");
}

#[test]
fn test_nearly_full_turn_matches_reference() {
    let mut rng = StdRng::seed_from_u64(11);
    let dataset = random_dataset(&mut rng, 20_000);
    let grid = SphericalGridIndex::build(&dataset);

    for _ in 0..100 {
        // leave a gap narrower than one cell somewhere on the circle
        let gap_start = rng.gen_range(0.0..TAU);
        let gap = rng.gen_range(0.0001..DEG_STEP);
        let bounds = TileBounds::new(
            AngularSpan::new((gap_start + gap) % TAU, gap_start),
            AngularSpan::new(0.0, PI),
        );
        let boundary = TileBoundary::from_bounds(&bounds);
        let fast: HashSet<ParticleIndex> = collect_tile_particles(&boundary, &grid, &dataset).into_iter().collect();

        assert_eq!(fast, brute_force(&boundary, &dataset), "bounds {:?}", bounds);
    }

    println!("✓ nearly full turns match reference (100 random gaps)");
}

#[test]
fn test_tile_grid_covers_sphere_once() {
    let mut rng = StdRng::seed_from_u64(3);
    let dataset = random_dataset(&mut rng, 5_000);
    let grid = SphericalGridIndex::build(&dataset);

    // 8 x 4 tiles, like a low pyramid level
    let mut total = 0;
    for col in 0..8 {
        for row in 0..4 {
            let theta_min = col as f64 * TAU / 8.0;
            let phi_min = row as f64 * PI / 4.0;
            let bounds = TileBounds::new(
                AngularSpan::new(theta_min, theta_min + TAU / 8.0),
                AngularSpan::new(phi_min, phi_min + PI / 4.0),
            );
            let mut tile = Tile::new(col, row, bounds).with_visible(true);
            total += build_tile_particles(&mut tile, &grid, &dataset).count();
        }
    }

    // shared edges may count a particle twice, never drop one
    assert!(total >= dataset.len());
    assert!(total - dataset.len() < 10, "unexpected overlap: {}", total - dataset.len());
}

#[test]
fn test_reference_points_end_to_end() {
    let dataset = Dataset::new(
        vec![0.0, 0.0, 1.0, PI, 0.0, 2.0, 0.0, FRAC_PI_2, 1.0, TAU - 0.001, 0.0, 1.0],
        &["theta", "phi", "depth"],
    )
    .unwrap();
    let grid = SphericalGridIndex::build(&dataset);

    assert_eq!(grid.cell(0, 90), &[0, 3]);
    assert_eq!(grid.cell(180, 90), &[1]);
    assert_eq!(grid.cell(0, 0), &[2]);

    let mut tile = Tile::new(
        0,
        0,
        TileBounds::new(
            AngularSpan::new(350.0 * DEG_STEP, 10.0 * DEG_STEP),
            AngularSpan::new(80.0 * DEG_STEP, 100.0 * DEG_STEP),
        ),
    );
    let boundary = *tile.boundary();
    let mut found = collect_tile_particles(&boundary, &grid, &dataset);
    found.sort_unstable();
    assert_eq!(found, vec![0, 3]);
    assert_eq!(build_tile_particles(&mut tile, &grid, &dataset).count(), 2);
}
