//! Cloud skybox demo
//!
//! Run with:
//!   cargo run --example sky_demo
//!   cargo run --example sky_demo -- --seed 42 --no-vsync
//!   cargo run --example sky_demo -- --export out/   (CPU bake to PNG, no window)
//!
//! Controls:
//!   Left Mouse drag - Look around
//!   F1              - Toggle parameter panel
//!   Escape          - Exit

use clap::Parser;
use cloud_skybox::{
    clouds::{CloudSky, CpuSkybox, SkyboxLayout},
    Engine, EngineConfig, HostControl, SkyHost,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[derive(Parser, Debug)]
#[command(about = "Procedural volumetric cloud skybox")]
struct Args {
    /// Seed for the noise volume (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Present without waiting for vertical sync
    #[arg(long)]
    no_vsync: bool,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Bake on the CPU at reduced resolution, write cloud_<face>.png into this directory and exit
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,
}

/// 32px tiles in a 4x4 grid: 128x128 faces
const EXPORT_LAYOUT: (u32, u32, u32) = (32, 4, 4);

fn export(dir: &Path, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    let (tile_size, x_tiles, y_tiles) = EXPORT_LAYOUT;
    let layout = SkyboxLayout::new(tile_size, x_tiles, y_tiles, 1);
    let mut sky = CloudSky::new(layout, seed);
    let mut skybox = CpuSkybox::new(layout);

    let started = Instant::now();
    let tiles = skybox.bake_all(&mut sky);
    println!(
        "Baked {} tiles ({}x{} faces) in {:.2}s",
        tiles,
        layout.face_width(),
        layout.face_height(),
        started.elapsed().as_secs_f32()
    );

    std::fs::create_dir_all(dir)?;
    skybox.save_png(dir)?;
    println!("Faces written to {}", dir.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Some(dir) = &args.export {
        let seed = args.seed.unwrap_or_else(rand::random);
        println!("Exporting cloud skybox (seed {})", seed);
        if let Err(e) = export(dir, seed) {
            eprintln!("Export failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    println!("Starting Cloud Skybox Demo");
    println!();
    println!("Controls:");
    println!("  Left Mouse - Drag to look around");
    println!("  F1         - Toggle parameter panel");
    println!("  Escape     - Exit");
    println!();

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let config = EngineConfig {
        width: args.width,
        height: args.height,
        vsync: !args.no_vsync,
        noise_seed: args.seed,
        ..EngineConfig::default()
    };

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .expect("Failed to create window"),
    );

    let engine = match Engine::new(Arc::clone(&window), config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Failed to create engine: {}", e);
            std::process::exit(1);
        }
    };

    let mut host = SkyHost::new(engine, &window);
    let mut show_panel = true;
    let start = Instant::now();

    event_loop
        .run(move |event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent {
                    event: WindowEvent::RedrawRequested,
                    ..
                } => {
                    let timestamp_ms = start.elapsed().as_secs_f64() * 1000.0;
                    if let Err(e) = host.redraw(&window, timestamp_ms) {
                        eprintln!("Frame failed: {}", e);
                        elwt.exit();
                    }
                }
                Event::WindowEvent {
                    event:
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    physical_key: PhysicalKey::Code(key),
                                    state: ElementState::Pressed,
                                    repeat: false,
                                    ..
                                },
                            ..
                        },
                    ..
                } if matches!(key, KeyCode::Escape | KeyCode::F1) => {
                    if key == KeyCode::Escape {
                        elwt.exit();
                    } else {
                        show_panel = !show_panel;
                        host.set_panel_visible(show_panel);
                    }
                }
                Event::WindowEvent { event, .. } => {
                    if host.handle_window_event(&window, &event) == HostControl::Exit {
                        elwt.exit();
                    }
                }
                Event::AboutToWait => window.request_redraw(),
                _ => {}
            }
        })
        .expect("Event loop error");
}
