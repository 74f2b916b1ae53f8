//! Capability interface over the stateful map renderer.
//!
//! The synchronization engine is the only caller. Implementations are
//! expected to behave like a web map: sources and layers are keyed by string
//! id, pointer handlers are registered per layer and event kind, and
//! asynchronous notifications (style loaded, source idle, camera settled,
//! pointer input) are queued until [`RenderSurface::take_events`] is called.

use std::sync::Arc;

use formats::FeatureCollection;
use foundation::{GeoPoint, Handle};
use serde_json::{Map, Value};

use crate::filter::FilterExpr;
use crate::layer::LayerSpec;

/// Detach token returned by [`RenderSurface::attach`].
pub type HandlerId = Handle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerEventKind {
    Click,
    Move,
    Leave,
}

impl PointerEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PointerEventKind::Click => "click",
            PointerEventKind::Move => "mousemove",
            PointerEventKind::Leave => "mouseleave",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraTransition {
    pub center: GeoPoint,
    pub zoom: f64,
    pub speed: f64,
    pub curve: f64,
}

/// Small hover card anchored at a geographic coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub at: GeoPoint,
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl Tooltip {
    pub fn to_html(&self) -> String {
        let mut out = String::from("<div class=\"map-tooltip\"><strong>");
        out.push_str(&escape_html(&self.title));
        out.push_str("</strong>");
        for (k, v) in &self.rows {
            out.push_str("<br/>");
            out.push_str(&escape_html(k));
            out.push_str(": ");
            out.push_str(&escape_html(v));
        }
        out.push_str("</div>");
        out
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Asynchronous notifications from the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    StyleLoaded,
    /// The source finished processing the data written with `revision`.
    SourceLoaded { source: String, revision: u64 },
    CameraSettled,
    /// Delivered once per attached handler that matched.
    Pointer {
        handler: HandlerId,
        kind: PointerEventKind,
        /// Properties of the top-most rendered feature under the pointer.
        feature: Option<Map<String, Value>>,
        at: GeoPoint,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ensured {
    Created,
    Updated,
    Existing,
}

pub trait RenderSurface {
    fn has_source(&self, id: &str) -> bool;
    /// `revision` is echoed back in the matching [`SurfaceEvent::SourceLoaded`].
    fn add_source(&mut self, id: &str, data: &Arc<FeatureCollection>, revision: u64);
    fn set_source_data(&mut self, id: &str, data: &Arc<FeatureCollection>, revision: u64);
    fn remove_source(&mut self, id: &str);

    fn has_layer(&self, id: &str) -> bool;
    fn add_layer(&mut self, spec: &LayerSpec);
    fn remove_layer(&mut self, id: &str);
    /// Moves `id` directly beneath `before`.
    fn move_layer_before(&mut self, id: &str, before: &str);

    fn set_visibility(&mut self, layer: &str, visible: bool);
    fn set_filter(&mut self, layer: &str, filter: &FilterExpr);

    fn fly_to(&mut self, transition: &CameraTransition);

    fn attach(&mut self, kind: PointerEventKind, layer: &str) -> HandlerId;
    /// Returns `false` if the handler was not attached.
    fn detach(&mut self, handler: HandlerId) -> bool;

    fn show_tooltip(&mut self, tooltip: &Tooltip);
    fn hide_tooltip(&mut self);

    fn take_events(&mut self) -> Vec<SurfaceEvent>;

    /// Creates the source, or replaces its data in place when it exists.
    fn ensure_source(
        &mut self,
        id: &str,
        data: &Arc<FeatureCollection>,
        revision: u64,
    ) -> Ensured {
        if self.has_source(id) {
            self.set_source_data(id, data, revision);
            Ensured::Updated
        } else {
            self.add_source(id, data, revision);
            Ensured::Created
        }
    }

    /// Creates the layer unless it already exists.
    fn ensure_layer(&mut self, spec: &LayerSpec) -> Ensured {
        let id = spec.id.as_str();
        if self.has_layer(id) {
            Ensured::Existing
        } else {
            self.add_layer(spec);
            Ensured::Created
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Tooltip;
    use foundation::GeoPoint;

    #[test]
    fn tooltip_html_is_escaped() {
        let t = Tooltip {
            at: GeoPoint::new(0.0, 0.0),
            title: "Impact Region".to_string(),
            rows: vec![("HierID".to_string(), "<b>x&y</b>".to_string())],
        };
        assert_eq!(
            t.to_html(),
            "<div class=\"map-tooltip\"><strong>Impact Region</strong><br/>HierID: &lt;b&gt;x&amp;y&lt;/b&gt;</div>"
        );
    }
}
