//! Tile-at-a-time bake scheduler
//!
//! A bake renders every tile of every face once, one tile per [`BakeScheduler::advance`]. The
//! cursor survives between frames, so a bake spreads over many frames and can be restarted at
//! any point. Order is x within y within panel within lightning stage.

use glam::Mat3;
use log::{debug, error, info};

use super::faces::CubeFace;

pub const SKYBOX_TILE_SIZE: u32 = 128;
pub const MAX_X_TILES: u32 = 8;
pub const MAX_Y_TILES: u32 = 8;
pub const MAX_LIGHTNING_STAGES: u32 = 1;
pub const FACE_COUNT: u32 = 6;

/// Tile grid of one bake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkyboxLayout {
    pub tile_size: u32,
    pub x_tiles: u32,
    pub y_tiles: u32,
    pub lightning_stages: u32,
}

impl Default for SkyboxLayout {
    fn default() -> Self {
        Self {
            tile_size: SKYBOX_TILE_SIZE,
            x_tiles: MAX_X_TILES,
            y_tiles: MAX_Y_TILES,
            lightning_stages: MAX_LIGHTNING_STAGES,
        }
    }
}

impl SkyboxLayout {
    pub fn new(tile_size: u32, x_tiles: u32, y_tiles: u32, lightning_stages: u32) -> Self {
        Self {
            tile_size,
            x_tiles,
            y_tiles,
            lightning_stages,
        }
    }

    pub fn face_width(&self) -> u32 {
        self.tile_size * self.x_tiles
    }

    pub fn face_height(&self) -> u32 {
        self.tile_size * self.y_tiles
    }

    pub fn tiles_per_face(&self) -> u32 {
        self.x_tiles * self.y_tiles
    }

    /// Tile renders in one complete bake
    pub fn tiles_per_bake(&self) -> u32 {
        self.lightning_stages * FACE_COUNT * self.tiles_per_face()
    }
}

/// Position of the next tile to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BakeCursor {
    pub lightning_stage: u32,
    pub panel_index: u32,
    pub tile_y: u32,
    pub tile_x: u32,
}

impl BakeCursor {
    /// Propagate overflow x -> y -> panel -> stage, one carry per component
    fn carried(mut self, layout: &SkyboxLayout) -> Self {
        if self.tile_x >= layout.x_tiles {
            self.tile_x = 0;
            self.tile_y += 1;
        }
        if self.tile_y >= layout.y_tiles {
            self.tile_y = 0;
            self.panel_index += 1;
        }
        if self.panel_index >= FACE_COUNT {
            self.panel_index = 0;
            self.lightning_stage += 1;
        }
        self
    }

    fn linear_index(&self, layout: &SkyboxLayout) -> u32 {
        ((self.lightning_stage * FACE_COUNT + self.panel_index) * layout.y_tiles + self.tile_y)
            * layout.x_tiles
            + self.tile_x
    }
}

/// Pixel rectangle inside a face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One tile render handed to the GPU pass or the CPU reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileJob {
    pub stage: u32,
    pub face: CubeFace,
    pub tile_x: u32,
    pub tile_y: u32,
    pub rect: TileRect,
    pub rotation: Mat3,
}

pub struct BakeScheduler {
    layout: SkyboxLayout,
    cursor: BakeCursor,
    new_bake_requested: bool,
    completion_logged: bool,
}

impl BakeScheduler {
    /// A fresh scheduler starts a bake on the first advance
    pub fn new(layout: SkyboxLayout) -> Self {
        Self {
            layout,
            cursor: BakeCursor::default(),
            new_bake_requested: true,
            completion_logged: false,
        }
    }

    /// Continue an in-flight bake from `cursor`
    pub fn resume_from(layout: SkyboxLayout, cursor: BakeCursor) -> Self {
        Self {
            layout,
            cursor,
            new_bake_requested: false,
            completion_logged: false,
        }
    }

    pub fn layout(&self) -> SkyboxLayout {
        self.layout
    }

    pub fn cursor(&self) -> BakeCursor {
        self.cursor
    }

    pub fn restart_pending(&self) -> bool {
        self.new_bake_requested
    }

    /// Discard the cursor at the next advance. Already baked tiles stay until overwritten.
    pub fn request_restart(&mut self) {
        self.new_bake_requested = true;
    }

    pub fn is_complete(&self) -> bool {
        !self.new_bake_requested
            && self.cursor.carried(&self.layout).lightning_stage >= self.layout.lightning_stages
    }

    /// `(tiles_done, tiles_total)` for the current bake
    pub fn progress(&self) -> (u32, u32) {
        let total = self.layout.tiles_per_bake();
        if self.new_bake_requested {
            return (0, total);
        }
        let done = self.cursor.carried(&self.layout).linear_index(&self.layout);
        (done.min(total), total)
    }

    /// Step the bake by one tile. Returns the tile to render, or `None` once the bake is done.
    pub fn advance(&mut self) -> Option<TileJob> {
        if self.new_bake_requested {
            self.cursor = BakeCursor::default();
            self.new_bake_requested = false;
            self.completion_logged = false;
            info!(
                "Starting cloud bake: {} tiles of {}px",
                self.layout.tiles_per_bake(),
                self.layout.tile_size
            );
        }

        if self.cursor.lightning_stage >= self.layout.lightning_stages {
            return None;
        }

        self.check_cursor_range();
        self.cursor = self.cursor.carried(&self.layout);

        if self.cursor.lightning_stage >= self.layout.lightning_stages {
            if !self.completion_logged {
                info!("Cloud bake complete");
                self.completion_logged = true;
            }
            return None;
        }

        let face = CubeFace::from_panel(self.cursor.panel_index)?;
        let tile_size = self.layout.tile_size;
        let job = TileJob {
            stage: self.cursor.lightning_stage,
            face,
            tile_x: self.cursor.tile_x,
            tile_y: self.cursor.tile_y,
            rect: TileRect {
                x: self.cursor.tile_x * tile_size,
                y: self.cursor.tile_y * tile_size,
                width: tile_size,
                height: tile_size,
            },
            rotation: face.rotation(),
        };

        debug!(
            "Baking tile ({}, {}) of {} (stage {})",
            job.tile_x,
            job.tile_y,
            face.name(),
            job.stage
        );

        self.cursor.tile_x += 1;
        Some(job)
    }

    /// x may sit one past the end between advances; anything further is corrupt state
    fn check_cursor_range(&self) {
        let c = self.cursor;
        let in_range = c.tile_x <= self.layout.x_tiles
            && c.tile_y < self.layout.y_tiles
            && c.panel_index < FACE_COUNT;
        if !in_range {
            error!("Bake cursor out of range: {:?} for {:?}", c, self.layout);
        }
        debug_assert!(in_range, "bake cursor out of range: {:?}", c);
    }
}
