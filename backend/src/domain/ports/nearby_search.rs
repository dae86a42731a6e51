//! Driving port for the geospatial "issues near a point" query.

use async_trait::async_trait;

use crate::domain::error::Error;
use crate::domain::issue::Issue;

/// A point-and-radius query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    /// Degrees north, validated by the service.
    pub latitude: f64,
    /// Degrees east, validated by the service.
    pub longitude: f64,
    /// Search radius in kilometres; must be positive.
    pub radius_km: f64,
}

/// Driving port for nearby issue searches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NearbySearch: Send + Sync {
    /// Issues whose location lies within the radius, newest first.
    /// Bounding-box pre-filter, exact great-circle post-filter.
    async fn find_near(&self, query: NearbyQuery) -> Result<Vec<Issue>, Error>;
}
