//! [`RenderSurface`] over a JavaScript map adapter.
//!
//! The adapter is a plain JS object wrapping the page's map instance. It
//! must provide `hasSource`, `addSource`, `setSourceData`, `removeSource`,
//! `hasLayer`, `addLayer`, `removeLayer`, `moveLayer`, `setLayoutProperty`,
//! `setFilter`, `flyTo`, `on`, `off`, `showPopup` and `hidePopup`. Map
//! notifications come back through the exported `on_*` functions and are
//! queued in [`INBOX`] until the engine drains them. `addSource` and
//! `setSourceData` receive a data revision that the page hands back to
//! `on_source_loaded` once that data is idle.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use formats::FeatureCollection;
use foundation::HandleAllocator;
use js_sys::{Array, Function, JSON, Reflect};
use layers::{
    CameraTransition, FilterExpr, HandlerId, LayerSpec, PointerEventKind, RenderSurface,
    SurfaceEvent, Tooltip, visibility_value,
};
use serde_json::{Value, json};
use wasm_bindgen::{JsCast, JsValue};

thread_local! {
    static INBOX: RefCell<VecDeque<SurfaceEvent>> = const { RefCell::new(VecDeque::new()) };
}

pub(crate) fn push_event(event: SurfaceEvent) {
    INBOX.with(|inbox| inbox.borrow_mut().push_back(event));
}

pub struct JsSurface {
    map: JsValue,
    handlers: HandleAllocator,
}

impl JsSurface {
    pub fn new(map: JsValue) -> Self {
        Self {
            map,
            handlers: HandleAllocator::new(),
        }
    }

    pub fn adapter(&self) -> &JsValue {
        &self.map
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Option<JsValue> {
        let f = match Reflect::get(&self.map, &JsValue::from_str(method)) {
            Ok(f) => f,
            Err(err) => {
                web_sys::console::error_2(&JsValue::from_str(&format!("map.{method}")), &err);
                return None;
            }
        };
        let Some(f) = f.dyn_ref::<Function>() else {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "map adapter has no `{method}` function"
            )));
            return None;
        };
        let args: Array = args.iter().collect();
        match f.apply(&self.map, &args) {
            Ok(v) => Some(v),
            Err(err) => {
                web_sys::console::error_2(
                    &JsValue::from_str(&format!("map.{method} failed")),
                    &err,
                );
                None
            }
        }
    }

    fn call_bool(&self, method: &str, args: &[JsValue]) -> bool {
        self.call(method, args)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

fn to_js(value: &Value) -> JsValue {
    JSON::parse(&value.to_string()).unwrap_or(JsValue::NULL)
}

fn geojson_to_js(data: &FeatureCollection) -> JsValue {
    to_js(&data.to_geojson_value())
}

fn str_js(s: &str) -> JsValue {
    JsValue::from_str(s)
}

/// Revisions travel as plain JS numbers; they stay far below 2^53.
fn revision_js(revision: u64) -> JsValue {
    JsValue::from_f64(revision as f64)
}

impl RenderSurface for JsSurface {
    fn has_source(&self, id: &str) -> bool {
        self.call_bool("hasSource", &[str_js(id)])
    }

    fn add_source(&mut self, id: &str, data: &Arc<FeatureCollection>, revision: u64) {
        self.call(
            "addSource",
            &[str_js(id), geojson_to_js(data), revision_js(revision)],
        );
    }

    fn set_source_data(&mut self, id: &str, data: &Arc<FeatureCollection>, revision: u64) {
        self.call(
            "setSourceData",
            &[str_js(id), geojson_to_js(data), revision_js(revision)],
        );
    }

    fn remove_source(&mut self, id: &str) {
        self.call("removeSource", &[str_js(id)]);
    }

    fn has_layer(&self, id: &str) -> bool {
        self.call_bool("hasLayer", &[str_js(id)])
    }

    fn add_layer(&mut self, spec: &LayerSpec) {
        self.call("addLayer", &[to_js(&spec.to_style_json())]);
    }

    fn remove_layer(&mut self, id: &str) {
        self.call("removeLayer", &[str_js(id)]);
    }

    fn move_layer_before(&mut self, id: &str, before: &str) {
        self.call("moveLayer", &[str_js(id), str_js(before)]);
    }

    fn set_visibility(&mut self, layer: &str, visible: bool) {
        self.call(
            "setLayoutProperty",
            &[
                str_js(layer),
                str_js("visibility"),
                str_js(visibility_value(visible)),
            ],
        );
    }

    fn set_filter(&mut self, layer: &str, filter: &FilterExpr) {
        self.call("setFilter", &[str_js(layer), to_js(&filter.to_expression())]);
    }

    fn fly_to(&mut self, transition: &CameraTransition) {
        let options = json!({
            "center": transition.center.to_array(),
            "zoom": transition.zoom,
            "speed": transition.speed,
            "curve": transition.curve,
            "essential": true,
        });
        self.call("flyTo", &[to_js(&options)]);
    }

    fn attach(&mut self, kind: PointerEventKind, layer: &str) -> HandlerId {
        let handler = self.handlers.allocate();
        self.call(
            "on",
            &[
                str_js(kind.as_str()),
                str_js(layer),
                JsValue::from(handler.index()),
                JsValue::from(handler.generation()),
            ],
        );
        handler
    }

    fn detach(&mut self, handler: HandlerId) -> bool {
        if !self.handlers.release(handler) {
            return false;
        }
        self.call(
            "off",
            &[
                JsValue::from(handler.index()),
                JsValue::from(handler.generation()),
            ],
        );
        true
    }

    fn show_tooltip(&mut self, tooltip: &Tooltip) {
        self.call(
            "showPopup",
            &[to_js(&json!(tooltip.at.to_array())), str_js(&tooltip.to_html())],
        );
    }

    fn hide_tooltip(&mut self) {
        self.call("hidePopup", &[]);
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> {
        INBOX.with(|inbox| inbox.borrow_mut().drain(..).collect())
    }
}
