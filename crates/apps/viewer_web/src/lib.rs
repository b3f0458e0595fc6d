use std::cell::RefCell;
use std::rc::Rc;

use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use layers::config::ViewerConfig;
use layers::{DataFetcher, FetchError, LayerKind, Viewer, drive_toggle};
use runtime::event_bus::NoticeId;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

thread_local! {
    static VIEWER: Rc<RefCell<Viewer>> = Rc::new(RefCell::new(Viewer::new(ViewerConfig::default())));
}

fn viewer() -> Rc<RefCell<Viewer>> {
    VIEWER.with(Rc::clone)
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Fetches layer sources with the browser's fetch API.
struct BrowserFetcher;

impl DataFetcher for BrowserFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let network = |e: gloo_net::Error| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };
        let resp = Request::get(url).send().await.map_err(network)?;
        if !resp.ok() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        resp.text().await.map_err(network)
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    Ok(())
}

/// Replaces the viewer with one built from a JSON [`ViewerConfig`].
///
/// Only allowed before any layer has been toggled.
#[wasm_bindgen]
pub fn configure(config_json: &str) -> Result<(), JsValue> {
    let config = ViewerConfig::from_json(config_json).map_err(js_err)?;
    let cell = viewer();
    let mut current = cell.borrow_mut();
    if current.session().busy_layer().is_some() {
        return Err(JsValue::from_str("configure must be called before any layer is toggled"));
    }
    current.teardown();
    *current = Viewer::new(config);
    Ok(())
}

#[wasm_bindgen]
pub fn set_canvas_sizes(width: f64, height: f64) {
    viewer().borrow_mut().camera_mut().set_viewport(width, height);
}

/// Orbit around the globe.
///
/// Intended usage: call with pointer delta in pixels.
#[wasm_bindgen]
pub fn camera_orbit(delta_x_px: f64, delta_y_px: f64) {
    viewer().borrow_mut().camera_mut().rotate(delta_x_px, delta_y_px);
}

/// Pan the camera target.
///
/// Intended usage: call with pointer delta in pixels.
#[wasm_bindgen]
pub fn camera_pan(delta_x_px: f64, delta_y_px: f64) {
    viewer().borrow_mut().camera_mut().pan(delta_x_px, delta_y_px);
}

/// Zoom (dolly) in/out.
///
/// Intended usage: call with wheel deltaY.
#[wasm_bindgen]
pub fn camera_zoom(wheel_delta_y: f64) {
    viewer().borrow_mut().camera_mut().zoom(wheel_delta_y);
}

/// Annotates the globe under the pointer. Returns `{latitude, longitude}` as
/// JSON, or `undefined` when the click missed the globe.
#[wasm_bindgen]
pub fn on_double_click(x_px: f64, y_px: f64) -> Result<Option<String>, JsValue> {
    let Some(location) = viewer().borrow_mut().on_double_click(x_px, y_px) else {
        return Ok(None);
    };
    serde_json::to_string(&location).map(Some).map_err(js_err)
}

#[wasm_bindgen]
pub fn set_globe_texture_loaded(loaded: bool) {
    viewer().borrow_mut().set_globe_texture_loaded(loaded);
}

/// Fails once any layer has been toggled on.
#[wasm_bindgen]
pub fn set_longitude_offset(offset_deg: f64) -> Result<(), JsValue> {
    viewer()
        .borrow_mut()
        .set_longitude_offset(offset_deg)
        .map_err(js_err)
}

/// Advances one render-loop tick. Returns true while the camera is moving.
#[wasm_bindgen]
pub fn advance_frame() -> bool {
    viewer().borrow_mut().advance_frame()
}

/// JSON snapshot of everything visible, for the host renderer.
#[wasm_bindgen]
pub fn scene_snapshot() -> Result<String, JsValue> {
    viewer().borrow().snapshot().to_json().map_err(js_err)
}

/// Releases all scene resources. Returns the released counts as JSON.
#[wasm_bindgen]
pub fn teardown() -> Result<String, JsValue> {
    let report = viewer().borrow_mut().teardown();
    serde_json::to_string(&report).map_err(js_err)
}

/// Toggles a layer by name (`earthquakes`, `volcanoes`, `borders`).
///
/// The first toggle starts a background fetch; the button state should be
/// re-read with [`control_state`] afterwards.
#[wasm_bindgen]
pub fn toggle_layer(name: &str) -> Result<(), JsValue> {
    let kind: LayerKind = name.parse().map_err(js_err)?;
    let cell = viewer();
    spawn_local(async move {
        match drive_toggle(&cell, kind, &BrowserFetcher).await {
            Ok(toggle) => tracing::debug!(layer = %kind, ?toggle, "toggle finished"),
            Err(err) => tracing::warn!(layer = %kind, "toggle failed: {err}"),
        }
    });
    Ok(())
}

/// `{label, enabled, state}` for a layer's toggle button, as JSON.
#[wasm_bindgen]
pub fn control_state(name: &str) -> Result<String, JsValue> {
    let kind: LayerKind = name.parse().map_err(js_err)?;
    let state = viewer().borrow().control_state(kind);
    serde_json::to_string(&state).map_err(js_err)
}

/// Pending notices as JSON, oldest first. They stay pending until dismissed.
#[wasm_bindgen]
pub fn take_notices() -> Result<String, JsValue> {
    let cell = viewer();
    let viewer = cell.borrow();
    serde_json::to_string(viewer.session().notices().notices()).map_err(js_err)
}

#[wasm_bindgen]
pub fn dismiss_notice(id: u64) -> bool {
    viewer()
        .borrow_mut()
        .session_mut()
        .notices_mut()
        .dismiss(NoticeId(id))
}
