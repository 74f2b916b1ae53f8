use crate::geo::GeoPoint;

/// Axis-aligned lon/lat bounding box in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LonLatBounds {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl LonLatBounds {
    pub fn new(min: GeoPoint, max: GeoPoint) -> Self {
        LonLatBounds { min, max }
    }

    pub fn from_point(p: GeoPoint) -> Self {
        LonLatBounds { min: p, max: p }
    }

    pub fn extend(&mut self, p: GeoPoint) {
        self.min.lon_deg = self.min.lon_deg.min(p.lon_deg);
        self.min.lat_deg = self.min.lat_deg.min(p.lat_deg);
        self.max.lon_deg = self.max.lon_deg.max(p.lon_deg);
        self.max.lat_deg = self.max.lat_deg.max(p.lat_deg);
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min.lon_deg + self.max.lon_deg) * 0.5,
            (self.min.lat_deg + self.max.lat_deg) * 0.5,
        )
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon_deg >= self.min.lon_deg
            && p.lon_deg <= self.max.lon_deg
            && p.lat_deg >= self.min.lat_deg
            && p.lat_deg <= self.max.lat_deg
    }
}
