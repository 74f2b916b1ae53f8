use std::collections::BTreeMap;

use formats::FeatureCollection;
use layers::{CASE_TYPE_PROPERTY, CaseType};

/// Number of ADM2 features per canonical case. Built once per successful
/// ADM2 load; aliases are folded into their canonical case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseCounts {
    by_case: BTreeMap<CaseType, usize>,
    unclassified: usize,
    total: usize,
}

impl CaseCounts {
    pub fn from_collection(collection: &FeatureCollection) -> Self {
        let mut counts = Self::default();
        for feature in &collection.features {
            counts.total += 1;
            match feature
                .property_str(CASE_TYPE_PROPERTY)
                .as_deref()
                .and_then(CaseType::resolve)
            {
                Some(case) => *counts.by_case.entry(case).or_insert(0) += 1,
                None => counts.unclassified += 1,
            }
        }
        counts
    }

    pub fn get(&self, case: CaseType) -> usize {
        self.by_case.get(&case).copied().unwrap_or(0)
    }

    /// Features whose `case_type` is missing or not a known alias.
    pub fn unclassified(&self) -> usize {
        self.unclassified
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Non-zero counts keyed by canonical label.
    pub fn by_label(&self) -> BTreeMap<&'static str, usize> {
        self.by_case
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(case, n)| (case.label(), *n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::CaseCounts;
    use formats::{Feature, FeatureCollection};
    use layers::CaseType;
    use pretty_assertions::assert_eq;
    use scene::FilterSet;
    use serde_json::{Map, Value};
    use std::collections::BTreeMap;

    fn feature(case: Option<&str>) -> Feature {
        let mut properties = Map::new();
        if let Some(c) = case {
            properties.insert("case_type".to_string(), Value::String(c.to_string()));
        }
        Feature {
            id: None,
            properties,
            geometry: None,
        }
    }

    #[test]
    fn aliases_fold_into_canonical_case() {
        let fc = FeatureCollection::new(vec![
            feature(Some("Case 1")),
            feature(Some("Case 1: IR = ADM2")),
            feature(Some("Case 2a")),
            feature(Some("Case 9")),
            feature(None),
        ]);
        let counts = CaseCounts::from_collection(&fc);
        assert_eq!(counts.get(CaseType::Case1), 2);
        assert_eq!(counts.get(CaseType::Case2a), 1);
        assert_eq!(counts.get(CaseType::Case4), 0);
        assert_eq!(counts.unclassified(), 2);
        assert_eq!(counts.total(), 5);
        assert_eq!(
            counts.by_label(),
            BTreeMap::from([("Case 1", 2), ("Case 2a", 1)])
        );
    }

    #[test]
    fn counted_features_are_exactly_the_drawn_ones() {
        let labels = ["Case 1", " Case 1 ", "case 1", "Case 3: ADM2 = multiple IRs", "Case 3a "];
        let filter = FilterSet::new().adm2_filter(true);
        for label in labels {
            let f = feature(Some(label));
            let counts = CaseCounts::from_collection(&FeatureCollection::new(vec![f.clone()]));
            let counted = counts.unclassified() == 0;
            assert_eq!(counted, filter.matches(&f.properties), "{label:?}");
        }

        let padded = FeatureCollection::new(vec![feature(Some(" Case 1 ")), feature(Some("Case 1"))]);
        let counts = CaseCounts::from_collection(&padded);
        assert_eq!(counts.get(CaseType::Case1), 1);
        assert_eq!(counts.unclassified(), 1);
    }
}
