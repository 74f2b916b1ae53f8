use formats::property_text;
use layers::{CASE_TYPE_PROPERTY, CaseType, Color, DEFAULT_CASE_COLOR, color_for_label};
use scene::SelectedFeature;

pub const ADM1_NAME_PROPERTY: &str = "NAME_1";
pub const ADM2_NAME_PROPERTY: &str = "NAME_2";

/// Inspector panel content for the selected ADM2 feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDetails {
    pub adm2_id: String,
    pub adm1_name: Option<String>,
    pub adm2_name: Option<String>,
    /// Raw label as stored in the dataset.
    pub case_label: Option<String>,
    pub case: Option<CaseType>,
    pub color: Color,
}

impl FeatureDetails {
    pub fn from_selected(selected: &SelectedFeature) -> Self {
        let props = &selected.properties;
        let case_label = property_text(props, CASE_TYPE_PROPERTY);
        let case = case_label.as_deref().and_then(CaseType::resolve);
        let color = case_label
            .as_deref()
            .map(color_for_label)
            .unwrap_or(DEFAULT_CASE_COLOR);
        Self {
            adm2_id: selected.adm2_id.clone(),
            adm1_name: property_text(props, ADM1_NAME_PROPERTY),
            adm2_name: property_text(props, ADM2_NAME_PROPERTY),
            case_label,
            case,
            color,
        }
    }

    /// Label/value rows in panel order. Missing values render as `N/A`.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let na = || "N/A".to_string();
        vec![
            ("ADM1", self.adm1_name.clone().unwrap_or_else(na)),
            ("ADM2", self.adm2_name.clone().unwrap_or_else(na)),
            ("Case", self.case_label.clone().unwrap_or_else(na)),
            ("ID", self.adm2_id.clone()),
        ]
    }
}
