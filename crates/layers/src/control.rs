use serde::Serialize;

use crate::layer::LayerKind;
use crate::lifecycle::LayerState;

pub const LOADING_LABEL: &str = "Loading data...";

/// What a layer's toggle button shows.
///
/// `state` is one of `idle` (not loaded), `loading`, `active` (shown) or
/// `inactive` (loaded but hidden).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub label: String,
    pub enabled: bool,
    pub state: &'static str,
}

pub fn title(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Earthquakes => "Earthquakes",
        LayerKind::Volcanoes => "Volcanoes",
        LayerKind::Borders => "Country Borders",
    }
}

pub fn ui_state(state: &LayerState) -> &'static str {
    match state {
        LayerState::Unloaded => "idle",
        LayerState::Loading(_) => "loading",
        state if state.is_visible() => "active",
        LayerState::Loaded(_) => "inactive",
    }
}

pub fn control_state(kind: LayerKind, state: &LayerState) -> ControlState {
    let (label, enabled) = match state {
        LayerState::Loading(_) => (LOADING_LABEL.to_string(), false),
        state if state.is_visible() => (format!("Hide {}", title(kind)), true),
        _ => (format!("Show {}", title(kind)), true),
    };
    ControlState {
        label,
        enabled,
        state: ui_state(state),
    }
}
