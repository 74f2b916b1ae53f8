use std::collections::BTreeMap;

use layers::{CASE_TYPE_PROPERTY, CaseType, FilterExpr};

/// Which classification cases are included in rendering.
///
/// Keyed by canonical case, so every alias of a case is toggled together by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    active: BTreeMap<CaseType, bool>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            active: CaseType::ALL.into_iter().map(|c| (c, true)).collect(),
        }
    }
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self, case: CaseType) -> bool {
        self.active.get(&case).copied().unwrap_or(false)
    }

    /// Unknown labels are never active.
    pub fn is_label_active(&self, label: &str) -> bool {
        CaseType::resolve(label).is_some_and(|c| self.is_active(c))
    }

    pub fn set(&mut self, case: CaseType, active: bool) {
        self.active.insert(case, active);
    }

    /// Flips `case` and returns its new state.
    pub fn toggle(&mut self, case: CaseType) -> bool {
        let next = !self.is_active(case);
        self.set(case, next);
        next
    }

    /// Flips the alias group `label` belongs to. Returns `None` (and changes
    /// nothing) for labels outside the registry.
    pub fn toggle_label(&mut self, label: &str) -> Option<bool> {
        CaseType::resolve(label).map(|case| self.toggle(case))
    }

    pub fn active_cases(&self) -> impl Iterator<Item = CaseType> + '_ {
        self.active
            .iter()
            .filter(|(_, on)| **on)
            .map(|(case, _)| *case)
    }

    /// Every alias of every active case.
    pub fn active_labels(&self) -> Vec<&'static str> {
        self.active_cases()
            .flat_map(|case| case.aliases().iter().copied())
            .collect()
    }

    /// Render predicate for the ADM2 fill layer.
    ///
    /// A hidden parent layer or an empty selection both yield an explicit
    /// match-nothing filter.
    pub fn adm2_filter(&self, adm2_visible: bool) -> FilterExpr {
        if !adm2_visible {
            return FilterExpr::match_none(CASE_TYPE_PROPERTY);
        }
        FilterExpr::any_of(CASE_TYPE_PROPERTY, self.active_labels())
    }
}
