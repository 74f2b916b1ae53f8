use formats::{DatasetKind, FeatureCollection};
use foundation::CountryCode;
use layers::{CaseType, RenderSurface};
use scene::LayerStore;
use streaming::{DatasetTicket, FetchFailure};

use crate::config::SyncConfig;
use crate::engine::{Applied, MapSync};
use crate::events::MapEvent;
use crate::inspector::FeatureDetails;
use crate::legend::Legend;

/// UI-facing entry point: the layer store plus the engine that renders it.
///
/// Every inward UI action updates the store and then reconciles the engine,
/// so the surface never lags behind the store. Engine events that affect
/// the store (loading flag, error message) are folded back in as they are
/// emitted.
pub struct MapSession<S: RenderSurface> {
    store: LayerStore,
    engine: MapSync<S>,
    /// Sequence number of the next engine event to fold into the store.
    absorbed: u64,
}

impl<S: RenderSurface> MapSession<S> {
    pub fn new(surface: S, config: SyncConfig) -> Self {
        let store = LayerStore::new(config.ir_visible_by_default);
        Self {
            store,
            engine: MapSync::new(surface, config),
            absorbed: 0,
        }
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    pub fn engine(&self) -> &MapSync<S> {
        &self.engine
    }

    pub fn surface(&self) -> &S {
        self.engine.surface()
    }

    /// See [`MapSync::surface_mut`].
    pub fn surface_mut(&mut self) -> &mut S {
        self.engine.surface_mut()
    }

    pub fn set_pending(&mut self, country: CountryCode) {
        self.store.set_pending(country);
    }

    /// Confirms the pending country and returns the fetches to run. Empty
    /// when nothing is pending.
    pub fn submit(&mut self) -> Vec<DatasetTicket> {
        let Some(confirmed) = self.store.confirm() else {
            return Vec::new();
        };
        let tickets = self.engine.begin_country(&confirmed);
        self.engine.reconcile(&self.store);
        self.absorb();
        tickets
    }

    pub fn complete(
        &mut self,
        ticket: &DatasetTicket,
        result: Result<FeatureCollection, FetchFailure>,
    ) -> Applied {
        let applied = self.engine.complete(&self.store, ticket, result);
        self.pump();
        applied
    }

    /// Handles queued surface notifications.
    pub fn pump(&mut self) -> usize {
        let n = self.engine.process_surface_events();
        self.absorb();
        n
    }

    fn absorb(&mut self) {
        let mut next = self.absorbed;
        for stamped in self.engine.events().events() {
            if stamped.seq < self.absorbed {
                continue;
            }
            next = stamped.seq + 1;
            match &stamped.event {
                MapEvent::DataLoaded { country } => {
                    if self.store.confirmed().is_some_and(|c| &c.code == country) {
                        self.store.set_loading(false);
                    }
                }
                MapEvent::DatasetError { kind, message, .. } => {
                    self.store.set_error(message.clone());
                    if *kind == DatasetKind::Adm2 {
                        self.store.set_loading(false);
                    }
                }
                MapEvent::SelectionChanged { .. } | MapEvent::CaseCountsUpdated { .. } => {}
            }
        }
        self.absorbed = next;
    }

    pub fn toggle_adm2(&mut self) -> bool {
        let visible = self.store.toggle_adm2();
        self.engine.reconcile(&self.store);
        visible
    }

    pub fn toggle_ir(&mut self) -> bool {
        let visible = self.store.toggle_ir();
        self.engine.reconcile(&self.store);
        visible
    }

    pub fn toggle_case(&mut self, case: CaseType) -> bool {
        let active = self.store.toggle_case(case);
        self.engine.reconcile(&self.store);
        active
    }

    /// Toggles the alias group `label` belongs to. `None` for unknown labels.
    pub fn toggle_case_label(&mut self, label: &str) -> Option<bool> {
        let active = self.store.toggle_case_label(label)?;
        self.engine.reconcile(&self.store);
        Some(active)
    }

    pub fn reset_view(&mut self) -> bool {
        self.engine.reset_view()
    }

    pub fn clear_selection(&mut self) -> bool {
        self.engine.clear_selection()
    }

    pub fn selected_details(&self) -> Option<FeatureDetails> {
        self.engine.selected().map(FeatureDetails::from_selected)
    }

    pub fn legend(&self) -> Legend {
        Legend::build(&self.store, self.engine.counts())
    }

    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        self.engine.drain_events()
    }

    pub fn teardown(self) -> S {
        self.engine.teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::MapSession;
    use crate::config::SyncConfig;
    use crate::engine::{Applied, LayerPresence};
    use crate::events::MapEvent;
    use formats::{DatasetKind, FeatureCollection};
    use foundation::{CountryCode, GeoPoint};
    use layers::{CaseType, FilterExpr, PointerEventKind, RecordingSurface, SourceId};
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};
    use std::collections::BTreeMap;
    use streaming::{DatasetTicket, FetchFailure};

    fn code(s: &str) -> CountryCode {
        CountryCode::parse(s).expect("code")
    }

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    /// One unit square per entry, laid out along the equator.
    fn adm2(cases: &[(&str, &str)]) -> FeatureCollection {
        let features: Vec<Value> = cases
            .iter()
            .enumerate()
            .map(|(i, (id, case))| {
                let x = i as f64;
                json!({
                    "type": "Feature",
                    "properties": {"adm2_id": id, "case_type": case},
                    "geometry": {"type": "Polygon", "coordinates": [[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]]}
                })
            })
            .collect();
        FeatureCollection::from_geojson_value(&json!({"type": "FeatureCollection", "features": features}))
            .expect("collection")
    }

    fn ir() -> FeatureCollection {
        FeatureCollection::from_geojson_value(&json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"hierid": "H1"},
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}]
        }))
        .expect("collection")
    }

    fn submit(session: &mut MapSession<RecordingSurface>, country: &str) -> Vec<DatasetTicket> {
        session.set_pending(code(country));
        session.submit()
    }

    fn take(tickets: &[DatasetTicket], kind: DatasetKind) -> DatasetTicket {
        tickets.iter().find(|t| t.kind == kind).cloned().expect("ticket")
    }

    fn load(session: &mut MapSession<RecordingSurface>, country: &str, data: FeatureCollection) {
        let tickets = submit(session, country);
        session.complete(&take(&tickets, DatasetKind::Adm2), Ok(data));
        session.complete(&take(&tickets, DatasetKind::Ir), Ok(ir()));
    }

    fn session() -> MapSession<RecordingSurface> {
        MapSession::new(RecordingSurface::new(), SyncConfig::default())
    }

    #[test]
    fn resubmitting_a_country_never_duplicates_sources_or_layers() {
        let mut s = session();
        load(&mut s, "FRA", adm2(&[("A", "Case 1")]));
        load(&mut s, "FRA", adm2(&[("A", "Case 1"), ("B", "Case 4")]));

        let surface = s.surface();
        assert_eq!(surface.source_count(), 2);
        assert_eq!(surface.owned_layer_count(), 5);
        assert_eq!(surface.duplicate_adds(), 0);
        assert_eq!(surface.source_data("adm2-regions").map(|d| d.len()), Some(2));
        assert_eq!(surface.handler_count(PointerEventKind::Click, "adm2-fill"), 1);
    }

    #[test]
    fn back_to_back_submission_applies_only_the_latest() {
        let mut s = session();
        let first = submit(&mut s, "FRA");
        let second = submit(&mut s, "FRA");
        let late = s.complete(&take(&first, DatasetKind::Adm2), Ok(adm2(&[("OLD", "Case 1")])));
        assert_eq!(late, Applied::Stale);
        let applied = s.complete(&take(&second, DatasetKind::Adm2), Ok(adm2(&[("NEW", "Case 1")])));
        assert!(matches!(applied, Applied::Loaded { created: true, .. }));
        assert_eq!(s.surface().source_count(), 1);
        assert_eq!(s.surface().duplicate_adds(), 0);
    }

    #[test]
    fn alias_groups_toggle_in_lockstep() {
        let mut s = session();
        load(&mut s, "FRA", adm2(&[("A", "Case 1")]));
        for label in ["Case 2: IR covers multiple ADM2s", "Case 2a", "Case 3a", "Case 3: ADM2 = multiple IRs"] {
            s.toggle_case_label(label);
            for case in CaseType::ALL {
                let states: Vec<bool> = case
                    .aliases()
                    .iter()
                    .map(|a| s.store().filters().is_label_active(a))
                    .collect();
                assert!(states.iter().all(|v| *v == states[0]), "{case:?} split: {states:?}");
            }
        }
        assert_eq!(s.toggle_case_label("Case 99"), None);
    }

    #[test]
    fn hidden_adm2_filters_to_nothing() {
        let mut s = session();
        load(&mut s, "FRA", adm2(&[("A", "Case 1")]));
        s.toggle_adm2();
        let filter = s.surface().filter("adm2-fill").cloned().expect("filter");
        assert!(filter.is_match_none());
        assert!(!s.surface().is_visible("adm2-fill"));
        assert!(!s.surface().is_visible("adm2-outline"));
        assert_eq!(s.engine().presence(SourceId::Adm2), LayerPresence::Hidden);

        s.toggle_case(CaseType::Case1);
        s.toggle_case(CaseType::Case1);
        assert!(s.surface().filter("adm2-fill").is_some_and(FilterExpr::is_match_none));

        s.toggle_adm2();
        let filter = s.surface().filter("adm2-fill").cloned().expect("filter");
        assert!(filter.matches(&props(json!({"case_type": "Case 1: IR = ADM2"}))));
    }

    #[test]
    fn stale_response_for_previous_country_is_discarded() {
        let mut s = session();
        let a = submit(&mut s, "FRA");
        let b = submit(&mut s, "ESP");

        let stale = s.complete(&take(&a, DatasetKind::Adm2), Ok(adm2(&[("FRA_1", "Case 1")])));
        assert_eq!(stale, Applied::Stale);
        let stale_ir = s.complete(&take(&a, DatasetKind::Ir), Ok(ir()));
        assert_eq!(stale_ir, Applied::Stale);
        assert_eq!(s.surface().source_count(), 0);
        assert!(s.surface().flights().is_empty());
        assert!(s.store().is_loading());

        s.complete(&take(&b, DatasetKind::Adm2), Ok(adm2(&[("ESP_1", "Case 2a")])));
        let data = s.surface().source_data("adm2-regions").cloned().expect("data");
        assert_eq!(data.features[0].property_str("adm2_id").as_deref(), Some("ESP_1"));
        assert_eq!(s.engine().counts().by_label(), BTreeMap::from([("Case 2a", 1)]));
        assert!(!s.store().is_loading());
    }

    #[test]
    fn click_toggles_and_replaces_selection() {
        let mut s = session();
        load(&mut s, "FRA", adm2(&[("F", "Case 1"), ("G", "Case 1")]));
        let at = GeoPoint::new(0.5, 0.5);
        let f = props(json!({"adm2_id": "F", "case_type": "Case 1", "NAME_1": "Bretagne"}));
        let g = props(json!({"adm2_id": "G", "case_type": "Case 1"}));

        s.surface_mut().click("adm2-fill", f.clone(), at);
        s.pump();
        assert_eq!(s.selected_details().map(|d| d.adm1_name), Some(Some("Bretagne".to_string())));

        s.surface_mut().click("adm2-fill", f.clone(), at);
        s.pump();
        assert!(s.selected_details().is_none());

        s.surface_mut().click("adm2-fill", f, at);
        s.surface_mut().click("adm2-fill", g, at);
        s.pump();
        assert_eq!(s.selected_details().map(|d| d.adm2_id), Some("G".to_string()));

        assert!(s.clear_selection());
        assert!(!s.clear_selection());
    }

    #[test]
    fn hover_highlights_exactly_one_region() {
        let mut s = session();
        load(&mut s, "FRA", adm2(&[("A", "Case 1")]));
        s.surface_mut()
            .pointer_move("impact-fill", props(json!({"hierid": "H1"})), GeoPoint::new(0.2, 0.2));
        s.pump();
        let filter = s.surface().filter("impact-hover").cloned().expect("filter");
        assert_eq!(filter, FilterExpr::eq("hierid", "H1"));
        assert!(filter.matches(&props(json!({"hierid": "H1"}))));
        assert!(!filter.matches(&props(json!({"hierid": "H2"}))));

        s.surface_mut().pointer_leave("impact-fill");
        s.pump();
        let filter = s.surface().filter("impact-hover").cloned().expect("filter");
        assert!(filter.is_match_none());
        assert!(!filter.matches(&props(json!({"hierid": "H1"}))));
    }

    #[test]
    fn usa_counts_and_large_country_zoom() {
        let mut s = session();
        let mut cases = vec![("u", "Case 1"); 8];
        cases.extend(vec![("u", "Case 2a"); 4]);
        load(&mut s, "USA", adm2(&cases));

        assert_eq!(
            s.engine().counts().by_label(),
            BTreeMap::from([("Case 1", 8), ("Case 2a", 4)])
        );
        let flights = s.surface().flights();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].zoom, 4.0);
        assert_eq!(flights[0].zoom, s.engine().config().large_country_zoom);

        let events = s.drain_events();
        assert!(events.contains(&MapEvent::DataLoaded { country: code("USA") }));
        let legend = s.legend();
        assert_eq!(legend.entry(CaseType::Case1).map(|e| e.count), Some(8));
    }

    #[test]
    fn missing_country_reports_error_without_side_effects() {
        let mut s = session();
        let tickets = submit(&mut s, "ZZZ");
        assert!(s.store().is_loading());
        for t in &tickets {
            s.complete(t, Err(FetchFailure::not_found(&t.country, t.kind, Some(404))));
        }

        assert!(!s.store().is_loading());
        assert!(s.store().error().is_some_and(|m| !m.is_empty()));
        assert!(s.surface().flights().is_empty());
        assert_eq!(s.surface().source_count(), 0);
        assert!(!s.reset_view());
    }

    #[test]
    fn filter_accepts_only_active_aliases() {
        let mut s = session();
        load(&mut s, "FRA", adm2(&[("A", "Case 1")]));
        for case in CaseType::ALL {
            if case != CaseType::Case1 {
                s.toggle_case(case);
            }
        }
        s.toggle_case(CaseType::Case2a);
        s.toggle_case(CaseType::Case2a);

        let filter = s.surface().filter("adm2-fill").cloned().expect("filter");
        assert!(filter.matches(&props(json!({"case_type": "Case 1"}))));
        assert!(filter.matches(&props(json!({"case_type": "Case 1: IR = ADM2"}))));
        assert!(!filter.matches(&props(json!({"case_type": "Case 2a"}))));
        assert!(!filter.matches(&props(json!({"case_type": "Case 7: unseen"}))));
        assert!(!filter.matches(&props(json!({}))));

        s.toggle_case(CaseType::Case1);
        let filter = s.surface().filter("adm2-fill").cloned().expect("filter");
        assert!(filter.is_match_none());
    }

    #[test]
    fn country_switches_do_not_accumulate_handlers() {
        let mut s = session();
        let countries = ["FRA", "ESP", "ITA", "DEU", "FRA", "PRT"];
        for c in countries {
            load(&mut s, c, adm2(&[("A", "Case 1")]));
        }
        let surface = s.surface();
        assert_eq!(surface.handler_count(PointerEventKind::Click, "adm2-fill"), 1);
        assert_eq!(surface.handler_count(PointerEventKind::Move, "impact-fill"), 1);
        assert_eq!(surface.handler_count(PointerEventKind::Leave, "impact-fill"), 1);
        assert_eq!(surface.total_handlers(), 3);
        assert_eq!(surface.flights().len(), countries.len());

        s.drain_events();
        let delivered = s
            .surface_mut()
            .click("adm2-fill", props(json!({"adm2_id": "A", "case_type": "Case 1"})), GeoPoint::new(0.5, 0.5));
        assert_eq!(delivered, 1);
        s.pump();
        let selections = s
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, MapEvent::SelectionChanged { .. }))
            .count();
        assert_eq!(selections, 1);
    }

    #[test]
    fn confirm_resets_filters_and_clears_selection() {
        let mut s = session();
        load(&mut s, "FRA", adm2(&[("A", "Case 1")]));
        s.surface_mut()
            .click("adm2-fill", props(json!({"adm2_id": "A", "case_type": "Case 1"})), GeoPoint::new(0.5, 0.5));
        s.pump();
        assert!(s.engine().selected().is_some());
        s.toggle_case(CaseType::Case1);
        s.toggle_ir();
        assert!(!s.surface().is_visible("impact-fill"));

        load(&mut s, "ESP", adm2(&[("B", "Case 1")]));
        assert!(s.store().filters().is_active(CaseType::Case1));
        assert!(s.store().visibility().ir);
        assert!(s.engine().selected().is_none());
        assert!(s.surface().is_visible("impact-fill"));
        let filter = s.surface().filter("adm2-fill").cloned().expect("filter");
        assert!(filter.matches(&props(json!({"case_type": "Case 1"}))));
    }

    #[test]
    fn teardown_leaves_base_style_intact() {
        let surface = RecordingSurface::with_style_layers(["water", "admin-0-boundary"]);
        let mut s = MapSession::new(surface, SyncConfig::default());
        s.pump();
        load(&mut s, "FRA", adm2(&[("A", "Case 1")]));
        let surface = s.teardown();
        assert_eq!(surface.layer_order(), vec!["water", "admin-0-boundary"]);
        assert_eq!(surface.source_count(), 0);
        assert_eq!(surface.total_handlers(), 0);
    }
}
