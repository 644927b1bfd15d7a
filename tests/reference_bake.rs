//! Bake scheduling and CPU reference bake tests.

use rstest::rstest;

use cloud_skybox::clouds::{
    BakeCursor, BakeScheduler, CloudSky, CpuSkybox, CubeFace, SkyboxLayout, TileJob,
};

/// 8px tiles, 2x2 per face: 16x16 faces
fn tiny_layout() -> SkyboxLayout {
    SkyboxLayout::new(8, 2, 2, 1)
}

fn drain(scheduler: &mut BakeScheduler) -> Vec<TileJob> {
    std::iter::from_fn(|| scheduler.advance()).collect()
}

// ============================================================================
// Tile Coverage
// ============================================================================

#[rstest]
#[case::default_grid(SkyboxLayout::default())]
#[case::tiny(tiny_layout())]
#[case::uneven(SkyboxLayout::new(3, 4, 2, 1))]
fn test_every_pixel_written_exactly_once(#[case] layout: SkyboxLayout) {
    let mut scheduler = BakeScheduler::new(layout);
    let jobs = drain(&mut scheduler);
    assert_eq!(jobs.len() as u32, layout.tiles_per_bake());

    let (width, height) = (layout.face_width() as usize, layout.face_height() as usize);
    let mut writes = vec![vec![0u8; width * height]; CubeFace::ALL.len()];
    for job in &jobs {
        let face = &mut writes[job.face.panel_index() as usize];
        for y in job.rect.y..job.rect.y + job.rect.height {
            for x in job.rect.x..job.rect.x + job.rect.width {
                face[y as usize * width + x as usize] += 1;
            }
        }
    }

    assert!(writes.iter().flatten().all(|&count| count == 1));
}

#[test]
fn test_tiles_follow_x_then_y_then_panel() {
    let layout = tiny_layout();
    let mut scheduler = BakeScheduler::new(layout);
    let order: Vec<_> = drain(&mut scheduler)
        .iter()
        .map(|job| (job.face.panel_index(), job.tile_y, job.tile_x))
        .collect();

    let mut expected = Vec::new();
    for panel in 0..6 {
        for y in 0..layout.y_tiles {
            for x in 0..layout.x_tiles {
                expected.push((panel, y, x));
            }
        }
    }
    assert_eq!(order, expected);
}

#[test]
fn test_restart_is_idempotent() {
    let layout = tiny_layout();
    let mut scheduler = BakeScheduler::new(layout);
    for _ in 0..5 {
        scheduler.advance();
    }

    scheduler.request_restart();
    scheduler.request_restart();
    let after_double = drain(&mut scheduler);

    let mut fresh = BakeScheduler::new(layout);
    assert_eq!(after_double, drain(&mut fresh));
}

// ============================================================================
// Cursor Carry
// ============================================================================

#[test]
fn test_overflow_carry_moves_to_next_row() {
    let layout = tiny_layout();
    let mut scheduler = BakeScheduler::resume_from(
        layout,
        BakeCursor {
            tile_x: layout.x_tiles - 1,
            ..BakeCursor::default()
        },
    );

    let last_in_row = scheduler.advance().expect("tile");
    assert_eq!((last_in_row.tile_x, last_in_row.tile_y), (1, 0));
    let next = scheduler.advance().expect("tile");
    assert_eq!((next.tile_x, next.tile_y), (0, 1));
    assert_eq!(next.face, CubeFace::NegZ);
}

#[test]
fn test_overflow_carry_moves_to_next_face() {
    let layout = tiny_layout();
    let mut scheduler = BakeScheduler::resume_from(
        layout,
        BakeCursor {
            tile_x: layout.x_tiles - 1,
            tile_y: layout.y_tiles - 1,
            ..BakeCursor::default()
        },
    );

    assert_eq!(scheduler.advance().map(|job| job.face), Some(CubeFace::NegZ));
    let next = scheduler.advance().expect("tile");
    assert_eq!(next.face, CubeFace::PosX);
    assert_eq!((next.tile_x, next.tile_y), (0, 0));
}

#[test]
fn test_last_tile_completes_bake() {
    let layout = tiny_layout();
    let mut scheduler = BakeScheduler::resume_from(
        layout,
        BakeCursor {
            lightning_stage: 0,
            panel_index: 5,
            tile_y: layout.y_tiles - 1,
            tile_x: layout.x_tiles - 1,
        },
    );

    assert_eq!(scheduler.advance().map(|job| job.face), Some(CubeFace::NegY));
    assert!(scheduler.is_complete());
    assert!(scheduler.advance().is_none());
    assert!(scheduler.advance().is_none());
}

// ============================================================================
// Reference Bake
// ============================================================================

#[test]
fn test_cold_start_faces_are_untouched() {
    let skybox = CpuSkybox::new(tiny_layout());
    for face in CubeFace::ALL {
        assert!(skybox.face(face).pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }
}

#[test]
fn test_single_step_writes_only_first_tile_of_neg_z() {
    let layout = tiny_layout();
    let mut sky = CloudSky::new(layout, 3);
    let mut skybox = CpuSkybox::new(layout);

    let job = sky.advance().expect("fresh bake has work");
    skybox.render_tile(&sky, &job);

    for face in CubeFace::ALL {
        for (x, y, pixel) in skybox.face(face).enumerate_pixels() {
            let in_first_tile = face == CubeFace::NegZ && x < 8 && y < 8;
            // Baked texels are opaque, untouched ones stay transparent
            assert_eq!(pixel.0[3] == 255, in_first_tile, "{:?} ({}, {})", face, x, y);
        }
    }
}

#[test]
fn test_reference_bake_is_deterministic() {
    let layout = tiny_layout();
    let bake = |seed: u64| {
        let mut sky = CloudSky::new(layout, seed);
        let mut skybox = CpuSkybox::new(layout);
        assert_eq!(skybox.bake_all(&mut sky), layout.tiles_per_bake());
        CubeFace::ALL.map(|face| skybox.face(face).clone().into_raw())
    };

    assert_eq!(bake(11), bake(11));
}

#[test]
fn test_partial_rebake_matches_full_bake() {
    let layout = tiny_layout();
    let mut sky = CloudSky::new(layout, 5);
    let mut skybox = CpuSkybox::new(layout);
    for _ in 0..7 {
        if let Some(job) = sky.advance() {
            skybox.render_tile(&sky, &job);
        }
    }

    // Restarting mid-bake and finishing leaves the same image as one clean pass
    sky.request_rebake();
    skybox.bake_all(&mut sky);

    let mut clean_sky = CloudSky::new(layout, 5);
    let mut clean = CpuSkybox::new(layout);
    clean.bake_all(&mut clean_sky);

    for face in CubeFace::ALL {
        assert_eq!(skybox.face(face), clean.face(face));
    }
}

#[test]
fn test_save_png_writes_six_faces() {
    let layout = SkyboxLayout::new(4, 1, 1, 1);
    let mut sky = CloudSky::new(layout, 1);
    let mut skybox = CpuSkybox::new(layout);
    skybox.bake_all(&mut sky);

    let dir = std::env::temp_dir().join(format!("cloud_skybox_png_{}", std::process::id()));
    skybox.save_png(&dir).expect("png export");

    for face in CubeFace::ALL {
        let path = dir.join(format!("cloud_{}.png", face.name()));
        let image = image::open(&path).expect("readable png").to_rgba8();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(&image, skybox.face(face));
    }
    let _ = std::fs::remove_dir_all(&dir);
}
