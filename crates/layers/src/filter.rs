use formats::property_text;
use serde_json::{Map, Value, json};

/// Declarative feature predicate applied to a render layer.
///
/// There is deliberately no "match everything" form: a layer that should show
/// nothing gets an `In` with an empty value list.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `property` is exactly `value`.
    Eq { property: String, value: String },
    /// `property` is one of `values`. An empty list matches nothing.
    In {
        property: String,
        values: Vec<String>,
    },
}

impl FilterExpr {
    pub fn eq(property: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Eq {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn any_of<I, S>(property: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterExpr::In {
            property: property.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn match_none(property: impl Into<String>) -> Self {
        FilterExpr::In {
            property: property.into(),
            values: Vec::new(),
        }
    }

    pub fn is_match_none(&self) -> bool {
        matches!(self, FilterExpr::In { values, .. } if values.is_empty())
    }

    pub fn property(&self) -> &str {
        match self {
            FilterExpr::Eq { property, .. } | FilterExpr::In { property, .. } => property,
        }
    }

    pub fn matches(&self, properties: &Map<String, Value>) -> bool {
        match self {
            FilterExpr::Eq { property, value } => {
                property_text(properties, property).as_deref() == Some(value.as_str())
            }
            FilterExpr::In { property, values } => property_text(properties, property)
                .is_some_and(|v| values.iter().any(|candidate| candidate == &v)),
        }
    }

    /// Style-spec expression form, as consumed by web map renderers.
    pub fn to_expression(&self) -> Value {
        match self {
            FilterExpr::Eq { property, value } => json!(["==", ["get", property], value]),
            FilterExpr::In { property, values } => {
                json!(["in", ["get", property], ["literal", values]])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FilterExpr;
    use serde_json::{Map, Value, json};

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn match_none_rejects_everything() {
        let f = FilterExpr::match_none("case_type");
        assert!(f.is_match_none());
        assert!(!f.matches(&props(json!({"case_type": "Case 1"}))));
        assert!(!f.matches(&props(json!({}))));
    }

    #[test]
    fn in_matches_listed_values_only() {
        let f = FilterExpr::any_of("case_type", ["Case 1", "Case 1: IR = ADM2"]);
        assert!(f.matches(&props(json!({"case_type": "Case 1: IR = ADM2"}))));
        assert!(!f.matches(&props(json!({"case_type": "Case 2a"}))));
        assert!(!f.matches(&props(json!({"other": "Case 1"}))));
    }

    #[test]
    fn eq_compares_numbers_as_text() {
        let f = FilterExpr::eq("hierid", "42");
        assert!(f.matches(&props(json!({"hierid": 42}))));
        assert!(!f.matches(&props(json!({"hierid": 43}))));
    }

    #[test]
    fn expressions_use_style_spec_shape() {
        assert_eq!(
            FilterExpr::match_none("case_type").to_expression(),
            json!(["in", ["get", "case_type"], ["literal", []]])
        );
        assert_eq!(
            FilterExpr::eq("hierid", "USA.1").to_expression(),
            json!(["==", ["get", "hierid"], "USA.1"])
        );
    }
}
