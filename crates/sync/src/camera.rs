use formats::FeatureCollection;
use foundation::{CountryCode, GeoPoint};
use layers::CameraTransition;

use crate::config::SyncConfig;

/// Where the camera goes for the loaded country. Recomputed on every
/// successful ADM2 load and replayed by reset-view.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportAnchor {
    pub center: GeoPoint,
    pub zoom: f64,
}

impl ViewportAnchor {
    /// `None` when the collection has no finite vertex to center on.
    pub fn for_collection(
        country: &CountryCode,
        collection: &FeatureCollection,
        config: &SyncConfig,
    ) -> Option<Self> {
        let center = collection.centroid()?;
        Some(Self {
            center,
            zoom: config.zoom_for(country),
        })
    }

    pub fn transition(&self, config: &SyncConfig) -> CameraTransition {
        CameraTransition {
            center: self.center,
            zoom: self.zoom,
            speed: config.fly_speed,
            curve: config.fly_curve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ViewportAnchor;
    use crate::config::SyncConfig;
    use formats::FeatureCollection;
    use foundation::CountryCode;

    const SQUARE: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{},"geometry":{"type":"Polygon",
         "coordinates":[[[-100,30],[-90,30],[-90,40],[-100,40],[-100,30]]]}}]}"#;

    #[test]
    fn anchor_centers_on_vertices_and_uses_country_zoom() {
        let fc = FeatureCollection::from_geojson_str(SQUARE).expect("parse");
        let cfg = SyncConfig::default();
        let usa = CountryCode::parse("USA").expect("code");
        let anchor = ViewportAnchor::for_collection(&usa, &fc, &cfg).expect("anchor");
        assert_eq!(anchor.center.lon_deg, -95.0);
        assert_eq!(anchor.center.lat_deg, 35.0);
        assert_eq!(anchor.zoom, 4.0);

        let t = anchor.transition(&cfg);
        assert_eq!(t.speed, 1.2);
        assert_eq!(t.curve, 1.42);
    }

    #[test]
    fn empty_collection_has_no_anchor() {
        let fc = FeatureCollection::new(Vec::new());
        let fra = CountryCode::parse("FRA").expect("code");
        assert!(ViewportAnchor::for_collection(&fra, &fc, &SyncConfig::default()).is_none());
    }
}
