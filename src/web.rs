//! Browser helpers for the wasm32 build
//!
//! Canvas mounting, timestamps, and reporting startup failures where a user can see them.

use wasm_bindgen::prelude::*;
use winit::platform::web::WindowExtWebSys;

/// Browser viewport size in CSS pixels, never below 100x100
pub fn get_window_size() -> (u32, u32) {
    let Some(window) = web_sys::window() else {
        return (100, 100);
    };
    let dimension = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as u32
    };
    let width = dimension(window.inner_width());
    let height = dimension(window.inner_height());
    (width.max(100), height.max(100))
}

/// Attach the winit canvas to `container_id` (or the body) and size it for the device pixel ratio.
/// Returns the canvas resolution in physical pixels.
pub fn setup_canvas(
    window: &winit::window::Window,
    container_id: &str,
) -> Result<(u32, u32), JsValue> {
    let canvas = window
        .canvas()
        .ok_or_else(|| JsValue::from_str("winit window has no canvas"))?;
    let web_window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
    let document = web_window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let container: web_sys::Element = match document.get_element_by_id(container_id) {
        Some(element) => element,
        None => document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?
            .into(),
    };
    container.append_child(&canvas)?;

    let dpr = web_window.device_pixel_ratio();
    let (css_width, css_height) = get_window_size();
    let width = (css_width as f64 * dpr) as u32;
    let height = (css_height as f64 * dpr) as u32;
    canvas.set_width(width);
    canvas.set_height(height);

    let style = canvas.style();
    style.set_property("width", &format!("{}px", css_width))?;
    style.set_property("height", &format!("{}px", css_height))?;
    style.set_property("display", "block")?;

    log::info!(
        "Canvas setup: {}x{} (CSS: {}x{}, DPR: {})",
        width,
        height,
        css_width,
        css_height,
        dpr
    );
    Ok((width, height))
}

/// Milliseconds from `performance.now()`, or 0 when the API is missing
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Put a visible error message on the page and in the console
pub fn show_error(message: &str) {
    console_error(message);

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let Ok(element) = document.create_element("pre") else {
        return;
    };
    element.set_text_content(Some(message));
    let _ = element.set_attribute("style", "color: #f66; padding: 1em; font-family: monospace;");
    if let Some(body) = document.body() {
        let _ = body.append_child(&element);
    }
}

/// Spawn a future on the browser's event loop
pub fn spawn_local<F>(future: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// Log a message to the browser console
#[wasm_bindgen]
pub fn console_log(msg: &str) {
    web_sys::console::log_1(&msg.into());
}

/// Log an error to the browser console
#[wasm_bindgen]
pub fn console_error(msg: &str) {
    web_sys::console::error_1(&msg.into());
}
