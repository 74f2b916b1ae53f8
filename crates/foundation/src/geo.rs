/// A geographic position in degrees, ordered the way GeoJSON orders it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub const fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn is_finite(&self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite()
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lon_deg, self.lat_deg]
    }
}

/// Running arithmetic mean of positions.
///
/// Non-finite inputs are skipped so a single bad vertex cannot poison the
/// result.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct MeanAccumulator {
    sum_lon: f64,
    sum_lat: f64,
    count: usize,
}

impl MeanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, p: GeoPoint) {
        if !p.is_finite() {
            return;
        }
        self.sum_lon += p.lon_deg;
        self.sum_lat += p.lat_deg;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<GeoPoint> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(GeoPoint::new(self.sum_lon / n, self.sum_lat / n))
    }
}
