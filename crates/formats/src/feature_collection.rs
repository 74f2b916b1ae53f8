use foundation::{GeoPoint, LonLatBounds, MeanAccumulator};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

impl Geometry {
    /// Visits every vertex, skipping the closing vertex of polygon rings.
    pub fn for_each_vertex(&self, mut f: impl FnMut(GeoPoint)) {
        match self {
            Geometry::Point(p) => f(*p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().copied().for_each(f),
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    line.iter().copied().for_each(&mut f);
                }
            }
            Geometry::Polygon(rings) => {
                for ring in rings {
                    open_ring(ring).iter().copied().for_each(&mut f);
                }
            }
            Geometry::MultiPolygon(polys) => {
                for rings in polys {
                    for ring in rings {
                        open_ring(ring).iter().copied().for_each(&mut f);
                    }
                }
            }
        }
    }

    pub fn is_areal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }
}

fn open_ring(ring: &[GeoPoint]) -> &[GeoPoint] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() >= 2 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// `None` for features published with a `null` geometry.
    pub geometry: Option<Geometry>,
}

impl Feature {
    /// Reads a property as text. Numbers are rendered, other types are ignored.
    pub fn property_str(&self, key: &str) -> Option<String> {
        property_text(&self.properties, key)
    }
}

pub fn property_text(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// An ordered GeoJSON feature collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug)]
pub enum FeatureCollectionError {
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for FeatureCollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureCollectionError::Json(e) => write!(f, "JSON parse error: {e}"),
            FeatureCollectionError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            FeatureCollectionError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for FeatureCollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeatureCollectionError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, FeatureCollectionError> {
        let value: Value = serde_json::from_str(payload).map_err(FeatureCollectionError::Json)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_slice(payload: &[u8]) -> Result<Self, FeatureCollectionError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(FeatureCollectionError::Json)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, FeatureCollectionError> {
        let obj = value
            .as_object()
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;
        if obj.get("type").and_then(|v| v.as_str()) != Some("FeatureCollection") {
            return Err(FeatureCollectionError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: String| FeatureCollectionError::InvalidFeature { index, reason };

            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object".to_string()))?;
            match feat_obj.get("type").and_then(|v| v.as_str()) {
                Some("Feature") => {}
                Some(other) => return Err(invalid(format!("unexpected feature type: {other}"))),
                None => return Err(invalid("feature missing type".to_string())),
            }

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };

            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let geometry = match feat_obj.get("geometry") {
                None => return Err(invalid("feature missing geometry".to_string())),
                Some(Value::Null) => None,
                Some(g) => Some(parse_geometry(g).map_err(invalid)?),
            };

            features.push(Feature {
                id,
                properties,
                geometry,
            });
        }

        Ok(Self { features })
    }

    /// Mean of every vertex in the collection.
    ///
    /// Closing ring vertices are excluded so they are not double counted.
    /// Returns `None` when the collection has no usable coordinates.
    pub fn centroid(&self) -> Option<GeoPoint> {
        let mut acc = MeanAccumulator::new();
        for geom in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            geom.for_each_vertex(|p| acc.push(p));
        }
        acc.mean()
    }

    pub fn bounds(&self) -> Option<LonLatBounds> {
        let mut out: Option<LonLatBounds> = None;
        for geom in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            geom.for_each_vertex(|p| {
                if !p.is_finite() {
                    return;
                }
                match &mut out {
                    Some(b) => b.extend(p),
                    None => out = Some(LonLatBounds::from_point(p)),
                }
            });
        }
        out
    }

    /// Emits a GeoJSON FeatureCollection. Property ordering may differ from
    /// the parsed input.
    pub fn to_geojson_value(&self) -> Value {
        let features = self
            .features
            .iter()
            .map(|feat| {
                let mut fobj = Map::new();
                fobj.insert("type".to_string(), Value::String("Feature".to_string()));
                if let Some(id) = &feat.id {
                    fobj.insert("id".to_string(), Value::String(id.clone()));
                }
                fobj.insert(
                    "properties".to_string(),
                    Value::Object(feat.properties.clone()),
                );
                fobj.insert(
                    "geometry".to_string(),
                    feat.geometry
                        .as_ref()
                        .map(geometry_to_geojson_value)
                        .unwrap_or(Value::Null),
                );
                Value::Object(fobj)
            })
            .collect();

        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );
        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }

    pub fn to_geojson_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_geojson_value())
    }
}

fn geometry_to_geojson_value(geom: &Geometry) -> Value {
    let (ty, coords) = match geom {
        Geometry::Point(p) => ("Point", point_coords(p)),
        Geometry::MultiPoint(ps) => ("MultiPoint", points_coords(ps)),
        Geometry::LineString(ps) => ("LineString", points_coords(ps)),
        Geometry::MultiLineString(lines) => (
            "MultiLineString",
            Value::Array(lines.iter().map(|l| points_coords(l)).collect()),
        ),
        Geometry::Polygon(rings) => ("Polygon", rings_coords(rings)),
        Geometry::MultiPolygon(polys) => (
            "MultiPolygon",
            Value::Array(polys.iter().map(|p| rings_coords(p)).collect()),
        ),
    };
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(ty.to_string()));
    obj.insert("coordinates".to_string(), coords);
    Value::Object(obj)
}

fn point_coords(p: &GeoPoint) -> Value {
    Value::Array(vec![Value::from(p.lon_deg), Value::from(p.lat_deg)])
}

fn points_coords(ps: &[GeoPoint]) -> Value {
    Value::Array(ps.iter().map(point_coords).collect())
}

fn rings_coords(rings: &[Vec<GeoPoint>]) -> Value {
    Value::Array(rings.iter().map(|r| points_coords(r)).collect())
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            polys
                .iter()
                .map(parse_rings)
                .collect::<Result<Vec<_>, _>>()
                .map(Geometry::MultiPolygon)
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    arr.iter().map(parse_points).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, FeatureCollectionError, Geometry};
    use foundation::GeoPoint;

    const TWO_SQUARES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"adm2_id": 17, "case_type": "Case 1", "NAME_2": "Alpha"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}
            },
            {
                "type": "Feature",
                "id": "b",
                "properties": {"adm2_id": "USA.2", "case_type": "Case 2a"},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[[10,10],[12,10],[12,12],[10,12],[10,10]]]]}
            },
            {
                "type": "Feature",
                "properties": {"adm2_id": "USA.3", "case_type": "Case 4"},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_null_geometry() {
        let fc = FeatureCollection::from_geojson_str(TWO_SQUARES).expect("parse");
        assert_eq!(fc.len(), 3);
        assert!(matches!(fc.features[0].geometry, Some(Geometry::Polygon(_))));
        assert!(matches!(
            fc.features[1].geometry,
            Some(Geometry::MultiPolygon(_))
        ));
        assert!(fc.features[2].geometry.is_none());
        assert_eq!(fc.features[1].id.as_deref(), Some("b"));
    }

    #[test]
    fn numeric_properties_read_as_text() {
        let fc = FeatureCollection::from_geojson_str(TWO_SQUARES).expect("parse");
        assert_eq!(fc.features[0].property_str("adm2_id").as_deref(), Some("17"));
        assert_eq!(fc.features[0].property_str("missing"), None);
    }

    #[test]
    fn centroid_ignores_closing_vertices() {
        let fc = FeatureCollection::from_geojson_str(TWO_SQUARES).expect("parse");
        // 8 distinct corners: mean of (1,1) and (11,11) squares.
        assert_eq!(fc.centroid(), Some(GeoPoint::new(6.0, 6.0)));
        let b = fc.bounds().expect("bounds");
        assert_eq!(b.min, GeoPoint::new(0.0, 0.0));
        assert_eq!(b.max, GeoPoint::new(12.0, 12.0));
    }

    #[test]
    fn empty_collection_has_no_centroid() {
        let fc = FeatureCollection::from_geojson_str(r#"{"type":"FeatureCollection","features":[]}"#)
            .expect("parse");
        assert!(fc.is_empty());
        assert_eq!(fc.centroid(), None);
    }

    #[test]
    fn rejects_non_collections() {
        let err = FeatureCollection::from_geojson_str(r#"{"type":"Feature"}"#).unwrap_err();
        assert!(matches!(err, FeatureCollectionError::NotAFeatureCollection));

        let err = FeatureCollection::from_geojson_str("<html>404</html>").unwrap_err();
        assert!(matches!(err, FeatureCollectionError::Json(_)));

        let err = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FeatureCollectionError::InvalidFeature { index: 0, .. }
        ));
    }

    #[test]
    fn export_then_parse_keeps_features() {
        let fc = FeatureCollection::from_geojson_str(TWO_SQUARES).expect("parse");
        let text = fc.to_geojson_string().expect("serialize");
        let back = FeatureCollection::from_geojson_str(&text).expect("reparse");
        assert_eq!(back, fc);
    }
}
