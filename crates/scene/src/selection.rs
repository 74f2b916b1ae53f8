use serde_json::{Map, Value};

/// The ADM2 feature shown in the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFeature {
    pub adm2_id: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Selected,
    Replaced,
    Cleared,
}

/// At most one selected ADM2 feature, with click-to-toggle semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    current: Option<SelectedFeature>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SelectedFeature> {
        self.current.as_ref()
    }

    /// Clicking the selected feature clears it; clicking anything else
    /// replaces it.
    pub fn click(&mut self, adm2_id: &str, properties: Map<String, Value>) -> SelectionChange {
        match &self.current {
            Some(cur) if cur.adm2_id == adm2_id => {
                self.current = None;
                SelectionChange::Cleared
            }
            prev => {
                let change = if prev.is_some() {
                    SelectionChange::Replaced
                } else {
                    SelectionChange::Selected
                };
                self.current = Some(SelectedFeature {
                    adm2_id: adm2_id.to_string(),
                    properties,
                });
                change
            }
        }
    }

    /// Returns `true` if something was selected.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }
}
