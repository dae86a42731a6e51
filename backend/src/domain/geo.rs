//! Coordinates, bounding boxes, and great-circle distance.
//!
//! The nearby query works in two passes: a rectangular bounding-box
//! pre-filter that the store can serve from an index, then an exact
//! Haversine post-filter. The box is always a superset of the true circle.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Mean Earth radius in kilometres, as used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres spanned by one degree of latitude.
pub const KM_PER_DEGREE: f64 = 111.32;

/// Floor applied to `cos(latitude)` when sizing the longitude delta.
///
/// Near the poles the cosine approaches zero and the per-kilometre
/// longitude span diverges; below this floor the box simply degrades to
/// the full longitude range instead of propagating infinities.
const POLAR_COS_FLOOR: f64 = 1.0e-6;

/// Validation errors for geographic inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoValidationError {
    /// Latitude outside [-90, 90].
    #[error("latitude {value} is outside [-90, 90]")]
    LatitudeOutOfRange {
        /// Offending value.
        value: f64,
    },
    /// Longitude outside [-180, 180].
    #[error("longitude {value} is outside [-180, 180]")]
    LongitudeOutOfRange {
        /// Offending value.
        value: f64,
    },
    /// Search radius was zero, negative, or not finite.
    #[error("radius {value} must be a positive number of kilometres")]
    InvalidRadius {
        /// Offending value.
        value: f64,
    },
}

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Degrees north, in [-90, 90].
    pub latitude: f64,
    /// Degrees east, in [-180, 180].
    pub longitude: f64,
}

impl Coordinates {
    /// Validate and construct a coordinate pair.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::Coordinates;
    ///
    /// let nyc = Coordinates::new(40.7128, -74.0060).expect("valid coordinates");
    /// assert!(Coordinates::new(91.0, 0.0).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoValidationError::LatitudeOutOfRange { value: latitude });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoValidationError::LongitudeOutOfRange { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Stable location identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct LocationId(Uuid);

impl LocationId {
    /// Generate a new random [`LocationId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Geographic position owned by exactly one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Stable identifier.
    pub id: LocationId,
    /// Validated coordinates.
    #[serde(flatten)]
    pub coordinates: Coordinates,
    /// Optional human-readable address.
    pub address: Option<String>,
}

/// Rectangular latitude/longitude pre-filter for radius searches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge in degrees.
    pub min_latitude: f64,
    /// Northern edge in degrees.
    pub max_latitude: f64,
    /// Western edge in degrees.
    pub min_longitude: f64,
    /// Eastern edge in degrees.
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Build the box enclosing the circle of `radius_km` around `center`.
    ///
    /// Edges are clamped to the valid coordinate ranges, so a query near a
    /// pole degrades to the full longitude span rather than an invalid box.
    pub fn around(center: Coordinates, radius_km: f64) -> Result<Self, GeoValidationError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeoValidationError::InvalidRadius { value: radius_km });
        }

        let lat_delta = radius_km / KM_PER_DEGREE;
        let cos_lat = center.latitude.to_radians().cos().max(POLAR_COS_FLOOR);
        let lon_delta = radius_km / (KM_PER_DEGREE * cos_lat);

        Ok(Self {
            min_latitude: (center.latitude - lat_delta).max(-90.0),
            max_latitude: (center.latitude + lat_delta).min(90.0),
            min_longitude: (center.longitude - lon_delta).max(-180.0),
            max_longitude: (center.longitude + lon_delta).min(180.0),
        })
    }

    /// Whether the box contains the given coordinates.
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

/// Great-circle distance between two points in kilometres.
///
/// Haversine formula over a sphere of radius [`EARTH_RADIUS_KM`].
///
/// # Examples
/// ```
/// use backend::domain::{haversine_km, Coordinates};
///
/// let a = Coordinates::new(40.7128, -74.0060).expect("nyc");
/// let same = haversine_km(a, a);
/// assert!(same < 1.0e-9);
/// ```
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn nyc() -> Coordinates {
        Coordinates::new(40.7128, -74.0060).expect("nyc")
    }

    fn la() -> Coordinates {
        Coordinates::new(34.0522, -118.2437).expect("la")
    }

    #[rstest]
    #[case(90.5, 0.0)]
    #[case(-91.0, 0.0)]
    #[case(f64::NAN, 0.0)]
    fn out_of_range_latitudes_are_rejected(#[case] lat: f64, #[case] lon: f64) {
        let err = Coordinates::new(lat, lon).expect_err("latitude rejected");
        assert!(matches!(err, GeoValidationError::LatitudeOutOfRange { .. }));
    }

    #[rstest]
    #[case(0.0, 180.5)]
    #[case(0.0, -181.0)]
    #[case(0.0, f64::INFINITY)]
    fn out_of_range_longitudes_are_rejected(#[case] lat: f64, #[case] lon: f64) {
        let err = Coordinates::new(lat, lon).expect_err("longitude rejected");
        assert!(matches!(err, GeoValidationError::LongitudeOutOfRange { .. }));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(f64::NAN)]
    fn non_positive_radii_are_rejected(#[case] radius: f64) {
        let err = BoundingBox::around(nyc(), radius).expect_err("radius rejected");
        assert!(matches!(err, GeoValidationError::InvalidRadius { .. }));
    }

    #[rstest]
    fn box_encloses_the_search_circle() {
        let center = nyc();
        let bbox = BoundingBox::around(center, 5.0).expect("box");

        assert!(bbox.contains(center));
        // A point just inside 5 km due north stays inside the box.
        let north = Coordinates::new(center.latitude + 4.9 / KM_PER_DEGREE, center.longitude)
            .expect("north");
        assert!(bbox.contains(north));
        // Los Angeles is far outside.
        assert!(!bbox.contains(la()));
    }

    #[rstest]
    fn polar_box_degrades_to_full_longitude_range() {
        let pole = Coordinates::new(89.999, 10.0).expect("near pole");
        let bbox = BoundingBox::around(pole, 50.0).expect("box");

        assert!(bbox.min_longitude >= -180.0);
        assert!(bbox.max_longitude <= 180.0);
        assert!(bbox.max_latitude <= 90.0);
        assert!(bbox.min_longitude.is_finite());
        assert!(bbox.max_longitude.is_finite());
    }

    #[rstest]
    fn haversine_matches_known_city_distance() {
        let distance = haversine_km(nyc(), la());
        // Published great-circle distance is roughly 3936 km.
        assert!((distance - 3936.0).abs() < 25.0, "got {distance}");
    }

    #[rstest]
    fn haversine_is_symmetric() {
        let there = haversine_km(nyc(), la());
        let back = haversine_km(la(), nyc());
        assert!((there - back).abs() < 1.0e-9);
    }
}
