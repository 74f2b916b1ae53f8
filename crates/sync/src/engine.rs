//! Map layer synchronization engine.
//!
//! [`MapSync`] owns the rendering surface and is the only code that mutates
//! it. It reconciles three inputs against the surface:
//! - completed dataset fetches, tagged with the [`DatasetTicket`] issued when
//!   the country was confirmed (stale tickets are dropped);
//! - the declarative [`LayerStore`] (visibility, case filters);
//! - surface notifications (style loaded, source idle, camera settled,
//!   pointer input on handlers the engine attached).
//!
//! Sources and layers are created once and updated in place afterwards.
//! Pointer handlers live in slots that detach before re-attaching, so
//! country switches never accumulate handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use formats::{DatasetKind, FeatureCollection, property_text};
use foundation::GeoPoint;
use layers::{
    ADM2_ID_PROPERTY, Ensured, FilterExpr, HIERID_PROPERTY, LayerId, LayerSpec, LayerStyle,
    PointerEventKind, RenderSurface, SourceId, SurfaceEvent, Tooltip,
};
use runtime::EventBus;
use scene::{ConfirmedCountry, HoverTarget, LayerStore, SelectedFeature, Selection};
use serde_json::{Map, Value};
use streaming::{DatasetTicket, FetchFailure, RequestIssuer};
use tracing::{debug, info, warn};

use crate::camera::ViewportAnchor;
use crate::config::SyncConfig;
use crate::counts::CaseCounts;
use crate::events::MapEvent;
use crate::handlers::HandlerSlot;

pub const GADM_ID_PROPERTY: &str = "gadmid";
pub const ISO_PROPERTY: &str = "ISO";

/// Datasets requested for every confirmed country, in request order.
pub const RENDERED_DATASETS: [DatasetKind; 2] = [DatasetKind::Adm2, DatasetKind::Ir];

/// Surface state of one logical source and its layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerPresence {
    Absent,
    Hidden,
    Visible,
}

/// What the engine did with a completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The ticket belongs to a superseded confirmation.
    Stale,
    Loaded {
        kind: DatasetKind,
        features: usize,
        /// `false` when an existing source was updated in place.
        created: bool,
    },
    Failed {
        kind: DatasetKind,
        message: String,
    },
    /// The engine does not render this dataset kind.
    Ignored,
}

pub struct MapSync<S: RenderSurface> {
    surface: S,
    config: SyncConfig,
    style: LayerStyle,
    requests: RequestIssuer,
    active: Option<ConfirmedCountry>,
    /// Last visibility pushed to each engine-owned layer.
    rendered: BTreeMap<LayerId, bool>,
    /// Last filter pushed to the ADM2 fill layer.
    adm2_filter: Option<FilterExpr>,
    ir_ready: bool,
    click: HandlerSlot,
    hover_move: HandlerSlot,
    hover_leave: HandlerSlot,
    selection: Selection,
    hover: HoverTarget,
    tooltip_open: bool,
    counts: CaseCounts,
    anchor: Option<ViewportAnchor>,
    /// Last revision written to any engine-owned source.
    data_revision: u64,
    /// ADM2 data revision whose idle signal releases the camera transition.
    pending_flight: Option<u64>,
    camera_in_flight: bool,
    events: EventBus<MapEvent>,
}

impl<S: RenderSurface> MapSync<S> {
    pub fn new(surface: S, config: SyncConfig) -> Self {
        let style = config.layer_style();
        Self {
            surface,
            config,
            style,
            requests: RequestIssuer::new(),
            active: None,
            rendered: BTreeMap::new(),
            adm2_filter: None,
            ir_ready: false,
            click: HandlerSlot::default(),
            hover_move: HandlerSlot::default(),
            hover_leave: HandlerSlot::default(),
            selection: Selection::new(),
            hover: HoverTarget::new(),
            tooltip_open: false,
            counts: CaseCounts::default(),
            anchor: None,
            data_revision: 0,
            pending_flight: None,
            camera_in_flight: false,
            events: EventBus::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access for input injection (pointer, idle and camera
    /// notifications). Sources and layers are mutated only by the engine.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn active(&self) -> Option<&ConfirmedCountry> {
        self.active.as_ref()
    }

    pub fn selected(&self) -> Option<&SelectedFeature> {
        self.selection.current()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hover.hierid()
    }

    pub fn counts(&self) -> &CaseCounts {
        &self.counts
    }

    pub fn anchor(&self) -> Option<ViewportAnchor> {
        self.anchor
    }

    pub fn is_camera_in_flight(&self) -> bool {
        self.camera_in_flight
    }

    pub fn events(&self) -> &EventBus<MapEvent> {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        self.events.drain()
    }

    pub fn presence(&self, source: SourceId) -> LayerPresence {
        let Some(first) = source.layers().first() else {
            return LayerPresence::Absent;
        };
        if !self.surface.has_source(source.as_str()) || !self.surface.has_layer(first.as_str()) {
            return LayerPresence::Absent;
        }
        match self.rendered.get(first) {
            Some(true) => LayerPresence::Visible,
            _ => LayerPresence::Hidden,
        }
    }

    /// Starts a load for a freshly confirmed country and returns one ticket
    /// per rendered dataset.
    ///
    /// Detaches every pointer handler and drops selection and hover; they
    /// are re-established as the new datasets arrive.
    pub fn begin_country(&mut self, confirmed: &ConfirmedCountry) -> Vec<DatasetTicket> {
        self.click.release(&mut self.surface);
        self.release_hover();
        if self.selection.clear() {
            self.events.emit(MapEvent::SelectionChanged { adm2_id: None });
        }
        self.pending_flight = None;
        self.ir_ready = false;
        self.active = Some(confirmed.clone());
        info!(
            country = %confirmed.code,
            generation = confirmed.generation,
            "country confirmed"
        );

        RENDERED_DATASETS
            .into_iter()
            .map(|kind| DatasetTicket {
                request: self.requests.issue(),
                country: confirmed.code.clone(),
                generation: confirmed.generation,
                kind,
            })
            .collect()
    }

    /// Applies a completed fetch. Failures become a [`MapEvent::DatasetError`]
    /// rather than an `Err`.
    pub fn complete(
        &mut self,
        store: &LayerStore,
        ticket: &DatasetTicket,
        result: Result<FeatureCollection, FetchFailure>,
    ) -> Applied {
        if !self.is_current(store, ticket) {
            debug!(
                country = %ticket.country,
                generation = ticket.generation,
                kind = ?ticket.kind,
                "discarding stale dataset response"
            );
            return Applied::Stale;
        }
        match (ticket.kind, result) {
            (DatasetKind::IrProblematic, _) => {
                debug!(country = %ticket.country, "problematic IR dataset is not rendered");
                Applied::Ignored
            }
            (DatasetKind::Adm2, Ok(collection)) => self.apply_adm2(store, ticket, collection),
            (DatasetKind::Ir, Ok(collection)) => self.apply_ir(store, ticket, collection),
            (kind, Err(failure)) => self.fail(kind, ticket, &failure),
        }
    }

    fn is_current(&self, store: &LayerStore, ticket: &DatasetTicket) -> bool {
        store.is_current(&ticket.country, ticket.generation)
            && self
                .active
                .as_ref()
                .is_some_and(|a| a.generation == ticket.generation && a.code == ticket.country)
    }

    fn apply_adm2(
        &mut self,
        store: &LayerStore,
        ticket: &DatasetTicket,
        collection: FeatureCollection,
    ) -> Applied {
        let data = Arc::new(collection);
        let revision = self.next_revision();
        let ensured = self
            .surface
            .ensure_source(SourceId::Adm2.as_str(), &data, revision);
        self.ensure_layers(SourceId::Adm2, store);
        self.reconcile(store);

        self.counts = CaseCounts::from_collection(&data);
        self.events.emit(MapEvent::CaseCountsUpdated {
            country: ticket.country.clone(),
            counts: self.counts.clone(),
        });

        self.click
            .attach(&mut self.surface, PointerEventKind::Click, LayerId::Adm2Fill.as_str());

        self.anchor = ViewportAnchor::for_collection(&ticket.country, &data, &self.config);
        if self.anchor.is_some() {
            self.pending_flight = Some(revision);
        } else {
            // Nothing to frame; the load is complete as applied.
            self.events.emit(MapEvent::DataLoaded {
                country: ticket.country.clone(),
            });
        }

        info!(
            country = %ticket.country,
            features = data.len(),
            ensured = ?ensured,
            "ADM2 dataset applied"
        );
        Applied::Loaded {
            kind: DatasetKind::Adm2,
            features: data.len(),
            created: ensured == Ensured::Created,
        }
    }

    fn apply_ir(
        &mut self,
        store: &LayerStore,
        ticket: &DatasetTicket,
        collection: FeatureCollection,
    ) -> Applied {
        let data = Arc::new(collection);
        let revision = self.next_revision();
        let ensured = self
            .surface
            .ensure_source(SourceId::Ir.as_str(), &data, revision);
        if self.ensure_layers(SourceId::Ir, store) && self.surface.has_layer(LayerId::Adm2Fill.as_str())
        {
            for id in SourceId::Ir.layers() {
                self.surface
                    .move_layer_before(id.as_str(), LayerId::Adm2Fill.as_str());
            }
        }
        self.ir_ready = true;
        self.reconcile(store);

        info!(
            country = %ticket.country,
            features = data.len(),
            ensured = ?ensured,
            "IR dataset applied"
        );
        Applied::Loaded {
            kind: DatasetKind::Ir,
            features: data.len(),
            created: ensured == Ensured::Created,
        }
    }

    /// Previously rendered data for the failed kind is cleared; the other
    /// dataset is left alone.
    fn fail(&mut self, kind: DatasetKind, ticket: &DatasetTicket, failure: &FetchFailure) -> Applied {
        warn!(
            country = %ticket.country,
            kind = ?kind,
            error = %failure,
            "dataset load failed"
        );
        let empty = Arc::new(FeatureCollection::default());
        match kind {
            DatasetKind::Adm2 => {
                if self.surface.has_source(SourceId::Adm2.as_str()) {
                    let revision = self.next_revision();
                    self.surface
                        .set_source_data(SourceId::Adm2.as_str(), &empty, revision);
                }
                self.click.release(&mut self.surface);
                self.anchor = None;
                self.pending_flight = None;
                if !self.counts.is_empty() {
                    self.counts = CaseCounts::default();
                    self.events.emit(MapEvent::CaseCountsUpdated {
                        country: ticket.country.clone(),
                        counts: self.counts.clone(),
                    });
                }
            }
            DatasetKind::Ir | DatasetKind::IrProblematic => {
                if self.surface.has_source(SourceId::Ir.as_str()) {
                    let revision = self.next_revision();
                    self.surface
                        .set_source_data(SourceId::Ir.as_str(), &empty, revision);
                }
                self.ir_ready = false;
                self.release_hover();
            }
        }
        let message = failure.user_message();
        self.events.emit(MapEvent::DatasetError {
            country: ticket.country.clone(),
            kind,
            message: message.clone(),
        });
        Applied::Failed { kind, message }
    }

    /// Returns `true` if any layer was created.
    fn ensure_layers(&mut self, source: SourceId, store: &LayerStore) -> bool {
        let visible = intended_visibility(store, source);
        let mut created = false;
        for id in source.layers() {
            let spec = LayerSpec::new(*id, &self.style, visible);
            if self.surface.ensure_layer(&spec) == Ensured::Created {
                self.rendered.insert(*id, visible);
                if *id == LayerId::Adm2Fill {
                    self.adm2_filter = None;
                }
                created = true;
            }
        }
        created
    }

    /// Pushes the store's visibility and filter intent to the surface.
    ///
    /// Only differences from what was last pushed reach the surface, so
    /// calling this after every store change is cheap and idempotent.
    pub fn reconcile(&mut self, store: &LayerStore) {
        for source in SourceId::ALL {
            let visible = intended_visibility(store, source);
            for id in source.layers() {
                if !self.surface.has_layer(id.as_str()) {
                    continue;
                }
                if self.rendered.get(id) != Some(&visible) {
                    self.surface.set_visibility(id.as_str(), visible);
                    self.rendered.insert(*id, visible);
                }
            }
        }

        if self.surface.has_layer(LayerId::Adm2Fill.as_str()) {
            let filter = store.adm2_filter();
            if self.adm2_filter.as_ref() != Some(&filter) {
                debug!(filter = %filter.to_expression(), "ADM2 filter updated");
                self.surface.set_filter(LayerId::Adm2Fill.as_str(), &filter);
                self.adm2_filter = Some(filter);
            }
        }

        let want_hover = store.visibility().ir
            && self.ir_ready
            && self.surface.has_layer(LayerId::IrFill.as_str());
        if want_hover && !self.hover_move.is_attached() {
            let layer = LayerId::IrFill.as_str();
            self.hover_move
                .attach(&mut self.surface, PointerEventKind::Move, layer);
            self.hover_leave
                .attach(&mut self.surface, PointerEventKind::Leave, layer);
        } else if !want_hover && self.hover_move.is_attached() {
            self.release_hover();
        }
    }

    /// Drains and handles the surface's queued notifications. Returns the
    /// number handled.
    pub fn process_surface_events(&mut self) -> usize {
        let events = self.surface.take_events();
        let n = events.len();
        for event in events {
            self.on_surface_event(event);
        }
        n
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::StyleLoaded => self.declutter_basemap(),
            SurfaceEvent::SourceLoaded { source, revision } => {
                self.on_source_loaded(&source, revision)
            }
            SurfaceEvent::CameraSettled => self.camera_in_flight = false,
            SurfaceEvent::Pointer {
                handler,
                kind,
                feature,
                at,
            } => {
                if self.click.holds(handler) {
                    self.on_click(feature);
                } else if self.hover_move.holds(handler) {
                    self.on_hover(feature, at);
                } else if self.hover_leave.holds(handler) {
                    self.clear_hover();
                } else {
                    debug!(kind = kind.as_str(), "pointer event for detached handler dropped");
                }
            }
        }
    }

    fn declutter_basemap(&mut self) {
        for id in &self.config.hide_basemap_layers {
            if self.surface.has_layer(id) {
                self.surface.set_visibility(id, false);
            }
        }
    }

    fn next_revision(&mut self) -> u64 {
        self.data_revision += 1;
        self.data_revision
    }

    /// Fires the pending camera transition once the ADM2 data it belongs to
    /// is idle. Idle signals for older revisions are ignored.
    fn on_source_loaded(&mut self, source: &str, revision: u64) {
        if source != SourceId::Adm2.as_str() {
            return;
        }
        if self.pending_flight != Some(revision) {
            debug!(revision, "idle signal for superseded ADM2 data");
            return;
        }
        let Some(active) = &self.active else {
            return;
        };
        self.pending_flight = None;
        let country = active.code.clone();
        self.fly_to_anchor();
        self.events.emit(MapEvent::DataLoaded { country });
    }

    fn fly_to_anchor(&mut self) -> bool {
        let Some(anchor) = self.anchor else {
            return false;
        };
        let transition = anchor.transition(&self.config);
        debug!(
            lon = anchor.center.lon_deg,
            lat = anchor.center.lat_deg,
            zoom = anchor.zoom,
            "camera transition"
        );
        self.surface.fly_to(&transition);
        self.camera_in_flight = true;
        true
    }

    /// Replays the last computed transition. `false` when nothing has been
    /// loaded yet.
    pub fn reset_view(&mut self) -> bool {
        self.fly_to_anchor()
    }

    fn on_click(&mut self, feature: Option<Map<String, Value>>) {
        let Some(properties) = feature else {
            return;
        };
        let Some(adm2_id) = property_text(&properties, ADM2_ID_PROPERTY) else {
            debug!("clicked ADM2 feature has no adm2_id");
            return;
        };
        let change = self.selection.click(&adm2_id, properties);
        debug!(adm2_id = %adm2_id, change = ?change, "selection");
        self.events.emit(MapEvent::SelectionChanged {
            adm2_id: self.selection.current().map(|s| s.adm2_id.clone()),
        });
    }

    pub fn clear_selection(&mut self) -> bool {
        let cleared = self.selection.clear();
        if cleared {
            self.events.emit(MapEvent::SelectionChanged { adm2_id: None });
        }
        cleared
    }

    fn on_hover(&mut self, feature: Option<Map<String, Value>>, at: GeoPoint) {
        let properties = feature.unwrap_or_default();
        let hierid = property_text(&properties, HIERID_PROPERTY);
        if self.hover.enter(hierid.clone()) {
            let filter = match hierid {
                Some(id) => FilterExpr::eq(HIERID_PROPERTY, id),
                None => FilterExpr::match_none(HIERID_PROPERTY),
            };
            self.surface.set_filter(LayerId::IrHover.as_str(), &filter);
        }
        self.surface.show_tooltip(&impact_tooltip(&properties, at));
        self.tooltip_open = true;
    }

    /// Drops the highlight and closes the tooltip, whether or not the
    /// hovered region carried a `hierid`.
    fn clear_hover(&mut self) {
        if self.hover.leave() && self.surface.has_layer(LayerId::IrHover.as_str()) {
            self.surface.set_filter(
                LayerId::IrHover.as_str(),
                &FilterExpr::match_none(HIERID_PROPERTY),
            );
        }
        if std::mem::take(&mut self.tooltip_open) {
            self.surface.hide_tooltip();
        }
    }

    fn release_hover(&mut self) {
        self.hover_move.release(&mut self.surface);
        self.hover_leave.release(&mut self.surface);
        self.clear_hover();
    }

    /// Detaches every handler, closes the tooltip and removes all
    /// engine-owned layers and sources, handing the surface back.
    pub fn teardown(mut self) -> S {
        self.click.release(&mut self.surface);
        self.release_hover();
        self.surface.hide_tooltip();
        for source in SourceId::ALL.into_iter().rev() {
            for id in source.layers().iter().rev() {
                if self.surface.has_layer(id.as_str()) {
                    self.surface.remove_layer(id.as_str());
                }
            }
            if self.surface.has_source(source.as_str()) {
                self.surface.remove_source(source.as_str());
            }
        }
        info!("map layers torn down");
        self.surface
    }
}

fn intended_visibility(store: &LayerStore, source: SourceId) -> bool {
    let visibility = store.visibility();
    match source {
        SourceId::Adm2 => visibility.adm2,
        SourceId::Ir => visibility.ir,
    }
}

fn impact_tooltip(properties: &Map<String, Value>, at: GeoPoint) -> Tooltip {
    let row = |label: &str, key: &str| {
        (
            label.to_string(),
            property_text(properties, key).unwrap_or_else(|| "N/A".to_string()),
        )
    };
    Tooltip {
        at,
        title: "Impact Region".to_string(),
        rows: vec![
            row("HierID", HIERID_PROPERTY),
            row("GADM ID", GADM_ID_PROPERTY),
            row("ISO", ISO_PROPERTY),
        ],
    }
}
