//! Headless [`RenderSurface`] that records every mutation.
//!
//! Used by the native viewer and by the engine tests. Pointer input is
//! injected with [`RecordingSurface::click`] and friends and is routed only
//! to handlers that are currently attached, so leaked handlers show up as
//! duplicate events exactly as they would on a real map.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use formats::FeatureCollection;
use foundation::{GeoPoint, HandleAllocator};
use serde_json::{Map, Value};
use tracing::warn;

use crate::filter::FilterExpr;
use crate::layer::LayerSpec;
use crate::surface::{
    CameraTransition, HandlerId, PointerEventKind, RenderSurface, SurfaceEvent, Tooltip,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    AddSource(String),
    SetSourceData(String),
    RemoveSource(String),
    AddLayer(String),
    RemoveLayer(String),
    MoveLayer { id: String, before: String },
    SetVisibility { layer: String, visible: bool },
    SetFilter { layer: String, filter: FilterExpr },
    FlyTo(CameraTransition),
    Attach {
        handler: HandlerId,
        kind: PointerEventKind,
        layer: String,
    },
    Detach(HandlerId),
    ShowTooltip(Tooltip),
    HideTooltip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLayer {
    pub id: String,
    /// `None` for base-map layers that came with the style.
    pub spec: Option<LayerSpec>,
    pub visible: bool,
    pub filter: Option<FilterExpr>,
}

#[derive(Debug)]
pub struct RecordingSurface {
    sources: BTreeMap<String, Arc<FeatureCollection>>,
    /// Revision of the last data written to each source.
    revisions: BTreeMap<String, u64>,
    /// Draw order, bottom to top.
    layers: Vec<RecordedLayer>,
    handlers: BTreeMap<HandlerId, (PointerEventKind, String)>,
    allocator: HandleAllocator,
    tooltip: Option<Tooltip>,
    calls: Vec<SurfaceCall>,
    events: VecDeque<SurfaceEvent>,
    idle_after_data: bool,
    duplicate_adds: usize,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            revisions: BTreeMap::new(),
            layers: Vec::new(),
            handlers: BTreeMap::new(),
            allocator: HandleAllocator::new(),
            tooltip: None,
            calls: Vec::new(),
            events: VecDeque::new(),
            idle_after_data: true,
            duplicate_adds: 0,
        }
    }

    /// A surface whose style already contains the given base-map layers.
    /// A `StyleLoaded` notification is queued.
    pub fn with_style_layers<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut surface = Self::new();
        for id in ids {
            surface.layers.push(RecordedLayer {
                id: id.into(),
                spec: None,
                visible: true,
                filter: None,
            });
        }
        surface.events.push_back(SurfaceEvent::StyleLoaded);
        surface
    }

    /// When `true` (the default) every source add/update is followed by a
    /// queued `SourceLoaded`.
    pub fn set_idle_after_data(&mut self, idle: bool) {
        self.idle_after_data = idle;
    }

    /// Queues the idle signal for the source's latest data.
    pub fn finish_source_load(&mut self, source: &str) {
        let revision = self.source_revision(source).unwrap_or_default();
        self.finish_source_load_at(source, revision);
    }

    /// Queues an idle signal for an arbitrary revision, such as one that
    /// arrives after newer data was already written.
    pub fn finish_source_load_at(&mut self, source: &str, revision: u64) {
        self.events.push_back(SurfaceEvent::SourceLoaded {
            source: source.to_string(),
            revision,
        });
    }

    pub fn settle_camera(&mut self) {
        self.events.push_back(SurfaceEvent::CameraSettled);
    }

    /// Clicks a feature rendered by `layer`. Returns the number of handler
    /// invocations queued.
    pub fn click(&mut self, layer: &str, properties: Map<String, Value>, at: GeoPoint) -> usize {
        self.pointer(PointerEventKind::Click, layer, Some(properties), at)
    }

    pub fn pointer_move(
        &mut self,
        layer: &str,
        properties: Map<String, Value>,
        at: GeoPoint,
    ) -> usize {
        self.pointer(PointerEventKind::Move, layer, Some(properties), at)
    }

    pub fn pointer_leave(&mut self, layer: &str) -> usize {
        self.pointer(PointerEventKind::Leave, layer, None, GeoPoint::new(0.0, 0.0))
    }

    fn pointer(
        &mut self,
        kind: PointerEventKind,
        layer: &str,
        feature: Option<Map<String, Value>>,
        at: GeoPoint,
    ) -> usize {
        let Some(rendered) = self.layers.iter().find(|l| l.id == layer) else {
            return 0;
        };
        if !rendered.visible {
            return 0;
        }
        if let (Some(filter), Some(props)) = (&rendered.filter, &feature)
            && !filter.matches(props)
        {
            return 0;
        }

        let targets: Vec<HandlerId> = self
            .handlers
            .iter()
            .filter(|(_, (k, l))| *k == kind && l == layer)
            .map(|(h, _)| *h)
            .collect();
        for handler in &targets {
            self.events.push_back(SurfaceEvent::Pointer {
                handler: *handler,
                kind,
                feature: feature.clone(),
                at,
            });
        }
        targets.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn source_data(&self, id: &str) -> Option<&Arc<FeatureCollection>> {
        self.sources.get(id)
    }

    pub fn source_revision(&self, id: &str) -> Option<u64> {
        self.revisions.get(id).copied()
    }

    /// Number of layers created through [`RenderSurface::add_layer`].
    pub fn owned_layer_count(&self) -> usize {
        self.layers.iter().filter(|l| l.spec.is_some()).count()
    }

    pub fn layer(&self, id: &str) -> Option<&RecordedLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.layer(id).is_some_and(|l| l.visible)
    }

    pub fn filter(&self, id: &str) -> Option<&FilterExpr> {
        self.layer(id).and_then(|l| l.filter.as_ref())
    }

    pub fn layer_order(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn handler_count(&self, kind: PointerEventKind, layer: &str) -> usize {
        self.handlers
            .values()
            .filter(|(k, l)| *k == kind && l == layer)
            .count()
    }

    pub fn total_handlers(&self) -> usize {
        self.handlers.len()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn flights(&self) -> Vec<CameraTransition> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::FlyTo(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Attempts to add a source or layer id that already existed.
    pub fn duplicate_adds(&self) -> usize {
        self.duplicate_adds
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn layer_mut(&mut self, id: &str) -> Option<&mut RecordedLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    fn queue_idle(&mut self, id: &str) {
        if self.idle_after_data {
            self.finish_source_load(id);
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, data: &Arc<FeatureCollection>, revision: u64) {
        if self.sources.contains_key(id) {
            warn!(source = id, "source added twice");
            self.duplicate_adds += 1;
        }
        self.sources.insert(id.to_string(), Arc::clone(data));
        self.revisions.insert(id.to_string(), revision);
        self.calls.push(SurfaceCall::AddSource(id.to_string()));
        self.queue_idle(id);
    }

    fn set_source_data(&mut self, id: &str, data: &Arc<FeatureCollection>, revision: u64) {
        let Some(slot) = self.sources.get_mut(id) else {
            warn!(source = id, "set_source_data on missing source");
            return;
        };
        *slot = Arc::clone(data);
        self.revisions.insert(id.to_string(), revision);
        self.calls.push(SurfaceCall::SetSourceData(id.to_string()));
        self.queue_idle(id);
    }

    fn remove_source(&mut self, id: &str) {
        self.revisions.remove(id);
        if self.sources.remove(id).is_some() {
            self.calls.push(SurfaceCall::RemoveSource(id.to_string()));
        }
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layer(id).is_some()
    }

    fn add_layer(&mut self, spec: &LayerSpec) {
        let id = spec.id.as_str();
        if self.has_layer(id) {
            warn!(layer = id, "layer added twice");
            self.duplicate_adds += 1;
        }
        self.layers.push(RecordedLayer {
            id: id.to_string(),
            spec: Some(spec.clone()),
            visible: spec.visible,
            filter: spec.filter.clone(),
        });
        self.calls.push(SurfaceCall::AddLayer(id.to_string()));
    }

    fn remove_layer(&mut self, id: &str) {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() != before {
            self.handlers.retain(|_, (_, layer)| layer.as_str() != id);
            self.calls.push(SurfaceCall::RemoveLayer(id.to_string()));
        }
    }

    fn move_layer_before(&mut self, id: &str, before: &str) {
        let Some(from) = self.layers.iter().position(|l| l.id == id) else {
            return;
        };
        let moved = self.layers.remove(from);
        match self.layers.iter().position(|l| l.id == before) {
            Some(to) => self.layers.insert(to, moved),
            None => self.layers.push(moved),
        }
        self.calls.push(SurfaceCall::MoveLayer {
            id: id.to_string(),
            before: before.to_string(),
        });
    }

    fn set_visibility(&mut self, layer: &str, visible: bool) {
        if let Some(l) = self.layer_mut(layer) {
            l.visible = visible;
            self.calls.push(SurfaceCall::SetVisibility {
                layer: layer.to_string(),
                visible,
            });
        }
    }

    fn set_filter(&mut self, layer: &str, filter: &FilterExpr) {
        if let Some(l) = self.layer_mut(layer) {
            l.filter = Some(filter.clone());
            self.calls.push(SurfaceCall::SetFilter {
                layer: layer.to_string(),
                filter: filter.clone(),
            });
        }
    }

    fn fly_to(&mut self, transition: &CameraTransition) {
        self.calls.push(SurfaceCall::FlyTo(*transition));
    }

    fn attach(&mut self, kind: PointerEventKind, layer: &str) -> HandlerId {
        let handler = self.allocator.allocate();
        self.handlers.insert(handler, (kind, layer.to_string()));
        self.calls.push(SurfaceCall::Attach {
            handler,
            kind,
            layer: layer.to_string(),
        });
        handler
    }

    fn detach(&mut self, handler: HandlerId) -> bool {
        if self.handlers.remove(&handler).is_none() {
            return false;
        }
        self.allocator.release(handler);
        self.calls.push(SurfaceCall::Detach(handler));
        true
    }

    fn show_tooltip(&mut self, tooltip: &Tooltip) {
        self.tooltip = Some(tooltip.clone());
        self.calls.push(SurfaceCall::ShowTooltip(tooltip.clone()));
    }

    fn hide_tooltip(&mut self) {
        if self.tooltip.take().is_some() {
            self.calls.push(SurfaceCall::HideTooltip);
        }
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use formats::FeatureCollection;
    use foundation::GeoPoint;
    use serde_json::json;

    use super::RecordingSurface;
    use crate::filter::FilterExpr;
    use crate::layer::{LayerId, LayerSpec};
    use crate::surface::{Ensured, PointerEventKind, RenderSurface, SurfaceEvent};
    use crate::symbology::LayerStyle;

    fn props(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn ensure_source_updates_in_place() {
        let mut s = RecordingSurface::new();
        let data = Arc::new(FeatureCollection::default());
        assert_eq!(s.ensure_source("adm2-regions", &data, 1), Ensured::Created);
        assert_eq!(s.ensure_source("adm2-regions", &data, 2), Ensured::Updated);
        assert_eq!(s.source_count(), 1);
        assert_eq!(s.duplicate_adds(), 0);
        assert_eq!(s.source_revision("adm2-regions"), Some(2));

        let events = s.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            SurfaceEvent::SourceLoaded { source, revision: 1 } if source == "adm2-regions"
        ));
        assert!(matches!(&events[1], SurfaceEvent::SourceLoaded { revision: 2, .. }));
    }

    #[test]
    fn ensure_layer_is_idempotent() {
        let mut s = RecordingSurface::new();
        let spec = LayerSpec::new(LayerId::Adm2Fill, &LayerStyle::default(), true);
        assert_eq!(s.ensure_layer(&spec), Ensured::Created);
        assert_eq!(s.ensure_layer(&spec), Ensured::Existing);
        assert_eq!(s.owned_layer_count(), 1);
    }

    #[test]
    fn pointer_events_reach_attached_handlers_only() {
        let mut s = RecordingSurface::new();
        let spec = LayerSpec::new(LayerId::Adm2Fill, &LayerStyle::default(), true);
        s.add_layer(&spec);
        let a = s.attach(PointerEventKind::Click, "adm2-fill");
        let b = s.attach(PointerEventKind::Click, "adm2-fill");
        assert_eq!(s.click("adm2-fill", props(json!({"adm2_id": "1"})), GeoPoint::new(0.0, 0.0)), 2);

        assert!(s.detach(a));
        assert!(!s.detach(a));
        s.take_events();
        assert_eq!(s.click("adm2-fill", props(json!({"adm2_id": "1"})), GeoPoint::new(0.0, 0.0)), 1);
        let events = s.take_events();
        assert!(matches!(&events[0], SurfaceEvent::Pointer { handler, .. } if *handler == b));
    }

    #[test]
    fn hidden_or_filtered_features_are_not_clickable() {
        let mut s = RecordingSurface::new();
        s.add_layer(&LayerSpec::new(LayerId::Adm2Fill, &LayerStyle::default(), true));
        s.attach(PointerEventKind::Click, "adm2-fill");

        s.set_filter("adm2-fill", &FilterExpr::any_of("case_type", ["Case 1"]));
        let at = GeoPoint::new(0.0, 0.0);
        assert_eq!(s.click("adm2-fill", props(json!({"case_type": "Case 2a"})), at), 0);
        assert_eq!(s.click("adm2-fill", props(json!({"case_type": "Case 1"})), at), 1);

        s.set_visibility("adm2-fill", false);
        assert_eq!(s.click("adm2-fill", props(json!({"case_type": "Case 1"})), at), 0);
    }

    #[test]
    fn move_layer_before_reorders() {
        let mut s = RecordingSurface::new();
        let style = LayerStyle::default();
        s.add_layer(&LayerSpec::new(LayerId::Adm2Fill, &style, true));
        s.add_layer(&LayerSpec::new(LayerId::IrFill, &style, true));
        s.move_layer_before("impact-fill", "adm2-fill");
        assert_eq!(s.layer_order(), vec!["impact-fill", "adm2-fill"]);
    }
}
