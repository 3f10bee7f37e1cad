use stride_shared::constants::EARTH_RADIUS_KM;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Latitude/longitude range that contains every point within a radius.
///
/// Used as an indexed SQL prefilter; callers refine with [`haversine_km`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(lat: f64, lng: f64, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let d_lat = angular.to_degrees();
        let min_lat = (lat - d_lat).max(-90.0);
        let max_lat = (lat + d_lat).min(90.0);

        // The widest longitude offset on the circle is asin(sin r / cos lat).
        // When the circle reaches a pole or crosses the antimeridian the
        // span wraps; fall back to the full range there.
        let cos_lat = lat.to_radians().cos();
        let sin_angular = angular.sin();
        let (min_lng, max_lng) = if min_lat <= -90.0 || max_lat >= 90.0 || sin_angular >= cos_lat {
            (-180.0, 180.0)
        } else {
            let d_lng = (sin_angular / cos_lat).asin().to_degrees();
            if lng - d_lng < -180.0 || lng + d_lng > 180.0 {
                (-180.0, 180.0)
            } else {
                (lng - d_lng, lng + d_lng)
            }
        };

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}
