use foundation::CountryCode;
use layers::{CaseType, FilterExpr};

use crate::filters::FilterSet;
use crate::visibility::LayerVisibility;

/// A country the engine has been told to act on.
///
/// `generation` increases on every confirmation, including re-confirming
/// the same country, so a response can be matched to the exact submission
/// that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedCountry {
    pub code: CountryCode,
    pub generation: u64,
}

/// Declarative view state. Pure data, no I/O and no rendering handles.
///
/// Country selection is two-phase: `pending` follows the picker freely and
/// only [`LayerStore::confirm`] publishes it as the country to load.
#[derive(Debug, Clone)]
pub struct LayerStore {
    pending: Option<CountryCode>,
    confirmed: Option<ConfirmedCountry>,
    next_generation: u64,
    visibility: LayerVisibility,
    filters: FilterSet,
    error: Option<String>,
    loading: bool,
    ir_default_visible: bool,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LayerStore {
    pub fn new(ir_default_visible: bool) -> Self {
        Self {
            pending: None,
            confirmed: None,
            next_generation: 1,
            visibility: LayerVisibility::new(true, ir_default_visible),
            filters: FilterSet::default(),
            error: None,
            loading: false,
            ir_default_visible,
        }
    }

    pub fn pending(&self) -> Option<&CountryCode> {
        self.pending.as_ref()
    }

    pub fn set_pending(&mut self, code: CountryCode) {
        self.pending = Some(code);
    }

    /// Publishes the pending country.
    ///
    /// Resets the filter set to all-active, IR visibility to its default and
    /// the error message, and raises the loading flag. Returns `None` when
    /// nothing is pending.
    pub fn confirm(&mut self) -> Option<ConfirmedCountry> {
        let code = self.pending.clone()?;
        let confirmed = ConfirmedCountry {
            code,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        self.confirmed = Some(confirmed.clone());
        self.filters.reset();
        self.visibility.ir = self.ir_default_visible;
        self.error = None;
        self.loading = true;
        Some(confirmed)
    }

    pub fn confirmed(&self) -> Option<&ConfirmedCountry> {
        self.confirmed.as_ref()
    }

    /// Whether a response for `code` at `generation` still belongs to the
    /// confirmed country.
    pub fn is_current(&self, code: &CountryCode, generation: u64) -> bool {
        self.confirmed
            .as_ref()
            .is_some_and(|c| c.generation == generation && &c.code == code)
    }

    pub fn visibility(&self) -> LayerVisibility {
        self.visibility
    }

    pub fn toggle_adm2(&mut self) -> bool {
        self.visibility.adm2 = !self.visibility.adm2;
        self.visibility.adm2
    }

    pub fn toggle_ir(&mut self) -> bool {
        self.visibility.ir = !self.visibility.ir;
        self.visibility.ir
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn toggle_case(&mut self, case: CaseType) -> bool {
        self.filters.toggle(case)
    }

    pub fn toggle_case_label(&mut self, label: &str) -> Option<bool> {
        self.filters.toggle_label(label)
    }

    /// The ADM2 render predicate for the current intent.
    pub fn adm2_filter(&self) -> FilterExpr {
        self.filters.adm2_filter(self.visibility.adm2)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}
