use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Assumed average urban travel speed. Every travel-time derivation in the
/// planning pipeline uses this constant.
pub const URBAN_SPEED_KMH: f64 = 25.0;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from the decimal pair stored on an entity; `None` when either
    /// component is missing.
    pub fn from_decimals(lat: Option<Decimal>, lng: Option<Decimal>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Self {
                lat: lat.to_f64()?,
                lng: lng.to_f64()?,
            }),
            _ => None,
        }
    }
}

/// Great-circle distance in km.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Flat Euclidean distance in degree space. Good enough for comparing
/// candidate buyers at intra-city scale; never used for route distances.
pub fn flat_distance(a: Coordinates, b: Coordinates) -> f64 {
    ((a.lat - b.lat).powi(2) + (a.lng - b.lng).powi(2)).sqrt()
}

/// Travel minutes at the urban speed assumption.
pub fn travel_minutes(distance_km: f64) -> i64 {
    (distance_km / URBAN_SPEED_KMH * 60.0).round() as i64
}

/// Incremental mean position. O(1) per update via (sum, count) accumulators.
#[derive(Debug, Clone, Copy, Default)]
pub struct Centroid {
    sum_lat: f64,
    sum_lng: f64,
    count: u32,
}

impl Centroid {
    pub fn push(&mut self, point: Coordinates) {
        self.sum_lat += point.lat;
        self.sum_lng += point.lng;
        self.count += 1;
    }

    pub fn get(&self) -> Option<Coordinates> {
        if self.count == 0 {
            return None;
        }
        Some(Coordinates {
            lat: self.sum_lat / f64::from(self.count),
            lng: self.sum_lng / f64::from(self.count),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Mean of a point set, `None` when empty.
pub fn mean_position(points: &[Coordinates]) -> Option<Coordinates> {
    let mut centroid = Centroid::default();
    for p in points {
        centroid.push(*p);
    }
    centroid.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Osaka station to Namba is roughly 3.5 km as the crow flies.
    #[test]
    fn haversine_matches_known_city_distance() {
        let osaka_station = Coordinates::new(34.7025, 135.4959);
        let namba = Coordinates::new(34.6659, 135.5013);
        let d = haversine_km(osaka_station, namba);
        assert!((3.0..5.0).contains(&d), "got {d}");
    }

    #[test]
    fn haversine_is_zero_for_same_point() {
        let p = Coordinates::new(34.70, 135.50);
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn travel_minutes_uses_25_kmh() {
        assert_eq!(travel_minutes(25.0), 60);
        assert_eq!(travel_minutes(5.0), 12);
        assert_eq!(travel_minutes(0.0), 0);
    }

    #[test]
    fn centroid_tracks_running_mean() {
        let mut c = Centroid::default();
        assert!(c.get().is_none());
        c.push(Coordinates::new(34.0, 135.0));
        c.push(Coordinates::new(36.0, 137.0));
        let mean = c.get().unwrap();
        assert!((mean.lat - 35.0).abs() < 1e-9);
        assert!((mean.lng - 136.0).abs() < 1e-9);
    }
}
