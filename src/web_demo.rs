//! Web entry point
//!
//! wasm-bindgen start function: mounts the canvas, creates the engine asynchronously and drives
//! it from winit's web event loop.

use crate::{
    host::{HostControl, SkyHost},
    init_web_logging,
    web::{now_ms, setup_canvas, show_error, spawn_local},
    Engine, EngineConfig,
};
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::web::EventLoopExtWebSys,
    window::WindowBuilder,
};

/// Main entry point for web - called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn main() {
    init_web_logging();
    log::info!("=== Cloud Skybox ===");
    spawn_local(async {
        if let Err(message) = async_main().await {
            show_error(&message);
        }
    });
}

async fn async_main() -> Result<(), String> {
    let event_loop =
        EventLoop::new().map_err(|e| format!("Failed to create event loop: {}", e))?;

    let (width, height) = crate::web::get_window_size();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Cloud Skybox")
            .with_inner_size(PhysicalSize::new(width, height))
            .build(&event_loop)
            .map_err(|e| format!("Failed to create window: {}", e))?,
    );

    let (canvas_width, canvas_height) = setup_canvas(&window, "canvas-container")
        .map_err(|e| format!("Failed to set up canvas: {:?}", e))?;

    let config = EngineConfig {
        width: canvas_width,
        height: canvas_height,
        ..EngineConfig::default()
    };

    log::info!("Creating engine (this may take a moment)...");
    let mut engine = Engine::new_async(Arc::clone(&window), config)
        .await
        .map_err(|e| format!("Failed to create engine: {}", e))?;
    engine.resize(canvas_width, canvas_height);

    let mut host = SkyHost::new(engine, &window);
    let mut frame_errors = 0u32;

    log::info!("Starting render loop...");
    event_loop.spawn(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent {
                event: WindowEvent::RedrawRequested,
                ..
            } => {
                if let Err(e) = host.redraw(&window, now_ms()) {
                    // Only the first few failures are worth reporting
                    frame_errors += 1;
                    if frame_errors <= 5 {
                        log::error!("Frame failed: {}", e);
                    }
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
    });

    Ok(())
}
