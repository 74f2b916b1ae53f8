use console_error_panic_hook::set_once;
use futures_util::StreamExt;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use foundation::{CountryCode, GeoPoint, Handle};
use layers::{PointerEventKind, SurfaceEvent};
use serde_json::{Map, Value, json};
use sync::{Legend, MapEvent, MapSession, SyncConfig, fetch_tickets};

mod dataset;
mod surface;

use dataset::GlooSource;
use surface::{JsSurface, push_event};

thread_local! {
    static SESSION: RefCell<Option<MapSession<JsSurface>>> = const { RefCell::new(None) };
}

/// Runs `f` against the live session. `None` before `init_map`, after
/// `teardown_map`, or when called re-entrantly from a surface callback.
fn with_session<R>(f: impl FnOnce(&mut MapSession<JsSurface>) -> R) -> Option<R> {
    SESSION.with(|cell| {
        let mut guard = cell.try_borrow_mut().ok()?;
        guard.as_mut().map(f)
    })
}

fn log_error(msg: &str) {
    web_sys::console::error_1(&JsValue::from_str(msg));
}

/// Tells the page that engine state changed (`adapter.onChange()`, if any).
fn notify() {
    let adapter = with_session(|s| s.surface().adapter().clone());
    let Some(adapter) = adapter else {
        return;
    };
    let Ok(f) = js_sys::Reflect::get(&adapter, &JsValue::from_str("onChange")) else {
        return;
    };
    if let Some(f) = f.dyn_ref::<js_sys::Function>()
        && let Err(err) = f.call0(&adapter)
    {
        web_sys::console::error_2(&JsValue::from_str("onChange failed"), &err);
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Binds the engine to a map adapter. `config_json` may override any
/// [`SyncConfig`] key.
#[wasm_bindgen]
pub fn init_map(adapter: JsValue, config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json.as_deref() {
        Some(text) => {
            SyncConfig::from_json_str(text).map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        None => SyncConfig::default(),
    };
    let session = MapSession::new(JsSurface::new(adapter), config);
    let previous = SESSION.with(|cell| {
        let mut guard = cell
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("map session is busy"))?;
        Ok::<_, JsValue>(guard.replace(session))
    })?;
    if let Some(previous) = previous {
        previous.teardown();
    }
    pump();
    Ok(())
}

#[wasm_bindgen]
pub fn set_pending_country(code: &str) -> Result<(), JsValue> {
    let code = CountryCode::parse(code).map_err(|e| JsValue::from_str(&e.to_string()))?;
    with_session(|s| s.set_pending(code));
    Ok(())
}

/// Confirms the pending country and fetches its datasets in the background.
#[wasm_bindgen]
pub fn submit_country() {
    let started = with_session(|s| {
        let tickets = s.submit();
        (tickets, s.engine().config().base_url.clone())
    });
    notify();
    let Some((tickets, base_url)) = started else {
        return;
    };
    if tickets.is_empty() {
        return;
    }
    spawn_local(async move {
        let source = GlooSource::new(base_url);
        let mut inflight = fetch_tickets(&source, tickets);
        while let Some((ticket, result)) = inflight.next().await {
            if with_session(|s| s.complete(&ticket, result)).is_none() {
                log_error("map session unavailable; dataset response dropped");
            }
            notify();
        }
    });
}

#[wasm_bindgen]
pub fn toggle_adm2_layer() -> bool {
    let visible = with_session(|s| s.toggle_adm2()).unwrap_or(false);
    notify();
    visible
}

#[wasm_bindgen]
pub fn toggle_ir_layer() -> bool {
    let visible = with_session(|s| s.toggle_ir()).unwrap_or(false);
    notify();
    visible
}

/// Toggles the alias group of `label`. `undefined` for unknown labels.
#[wasm_bindgen]
pub fn toggle_case(label: &str) -> Option<bool> {
    let active = with_session(|s| s.toggle_case_label(label)).flatten();
    notify();
    active
}

#[wasm_bindgen]
pub fn reset_view() -> bool {
    with_session(|s| s.reset_view()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn clear_selection() -> bool {
    let cleared = with_session(|s| s.clear_selection()).unwrap_or(false);
    notify();
    cleared
}

fn pump() {
    with_session(|s| s.pump());
    notify();
}

#[wasm_bindgen]
pub fn on_style_loaded() {
    push_event(SurfaceEvent::StyleLoaded);
    pump();
}

/// `revision` is the value passed to the `addSource`/`setSourceData` call
/// whose data is now idle.
#[wasm_bindgen]
pub fn on_source_loaded(source: &str, revision: f64) {
    if !(revision.is_finite() && revision >= 0.0) {
        log_error(&format!("invalid revision {revision} for source `{source}`"));
        return;
    }
    push_event(SurfaceEvent::SourceLoaded {
        source: source.to_string(),
        revision: revision as u64,
    });
    pump();
}

#[wasm_bindgen]
pub fn on_camera_settled() {
    push_event(SurfaceEvent::CameraSettled);
    pump();
}

/// Pointer input for the handler registered through `adapter.on`.
#[wasm_bindgen]
pub fn on_pointer(
    index: u32,
    generation: u32,
    kind: &str,
    properties_json: Option<String>,
    lon: f64,
    lat: f64,
) {
    let kind = match kind {
        "click" => PointerEventKind::Click,
        "mousemove" => PointerEventKind::Move,
        "mouseleave" => PointerEventKind::Leave,
        other => {
            log_error(&format!("unknown pointer event `{other}`"));
            return;
        }
    };
    let feature = properties_json.and_then(|text| match serde_json::from_str::<Map<String, Value>>(&text) {
        Ok(props) => Some(props),
        Err(e) => {
            log_error(&format!("feature properties are not an object: {e}"));
            None
        }
    });
    push_event(SurfaceEvent::Pointer {
        handler: Handle::new(index, generation),
        kind,
        feature,
        at: GeoPoint::new(lon, lat),
    });
    pump();
}

/// `{country, pending, loading, error}`.
#[wasm_bindgen]
pub fn status_json() -> String {
    with_session(|s| {
        let store = s.store();
        json!({
            "country": store.confirmed().map(|c| c.code.to_string()),
            "pending": store.pending().map(|c| c.to_string()),
            "loading": store.is_loading(),
            "error": store.error(),
        })
    })
    .unwrap_or(Value::Null)
    .to_string()
}

fn legend_value(legend: &Legend) -> Value {
    let entries: Vec<Value> = legend
        .entries
        .iter()
        .map(|e| {
            json!({
                "label": e.label,
                "description": e.description,
                "color": e.color.as_str(),
                "count": e.count,
                "active": e.active,
            })
        })
        .collect();
    json!({
        "adm2_visible": legend.adm2_visible,
        "ir_visible": legend.ir_visible,
        "entries": entries,
        "unclassified": legend.unclassified,
    })
}

#[wasm_bindgen]
pub fn legend_json() -> String {
    with_session(|s| legend_value(&s.legend()))
        .unwrap_or(Value::Null)
        .to_string()
}

/// Inspector content for the selected ADM2 feature, or `null`.
#[wasm_bindgen]
pub fn selected_feature_json() -> String {
    with_session(|s| {
        s.selected_details().map(|d| {
            json!({
                "adm2_id": d.adm2_id,
                "adm1_name": d.adm1_name,
                "adm2_name": d.adm2_name,
                "case_type": d.case_label,
                "color": d.color.as_str(),
            })
        })
    })
    .flatten()
    .unwrap_or(Value::Null)
    .to_string()
}

fn event_value(event: &MapEvent) -> Value {
    match event {
        MapEvent::DataLoaded { country } => {
            json!({"type": "data_loaded", "country": country.as_str()})
        }
        MapEvent::DatasetError {
            country,
            kind,
            message,
        } => json!({
            "type": "dataset_error",
            "country": country.as_str(),
            "kind": kind.suffix(),
            "message": message,
        }),
        MapEvent::SelectionChanged { adm2_id } => {
            json!({"type": "selection_changed", "adm2_id": adm2_id})
        }
        MapEvent::CaseCountsUpdated { country, counts } => json!({
            "type": "case_counts",
            "country": country.as_str(),
            "counts": counts.by_label(),
            "unclassified": counts.unclassified(),
        }),
    }
}

/// Engine events since the last call, oldest first.
#[wasm_bindgen]
pub fn drain_events_json() -> String {
    let events = with_session(|s| s.drain_events()).unwrap_or_default();
    Value::Array(events.iter().map(event_value).collect()).to_string()
}

/// Removes every engine-owned source, layer and handler from the map.
#[wasm_bindgen]
pub fn teardown_map() {
    let session = SESSION.with(|cell| cell.try_borrow_mut().ok().and_then(|mut s| s.take()));
    if let Some(session) = session {
        session.teardown();
    }
}
