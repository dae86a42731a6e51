//! Geospatial "issues near a point" query service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::error::Error;
use crate::domain::geo::{BoundingBox, Coordinates, haversine_km};
use crate::domain::issue::Issue;
use crate::domain::lifecycle::map_geo_error;
use crate::domain::ports::{
    IssueRepository, IssueRepositoryError, NearbyQuery, NearbySearch,
};

/// Nearby search service backed by an [`IssueRepository`].
#[derive(Clone)]
pub struct NearbySearchService<R> {
    issues: Arc<R>,
}

impl<R> NearbySearchService<R> {
    /// Create a new service over the given repository.
    pub fn new(issues: Arc<R>) -> Self {
        Self { issues }
    }
}

fn map_repo_error(error: IssueRepositoryError) -> Error {
    match error {
        IssueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("issue repository unavailable: {message}"))
        }
        other => Error::internal(format!("issue repository error: {other}")),
    }
}

#[async_trait]
impl<R> NearbySearch for NearbySearchService<R>
where
    R: IssueRepository,
{
    async fn find_near(&self, query: NearbyQuery) -> Result<Vec<Issue>, Error> {
        let center = Coordinates::new(query.latitude, query.longitude)
            .map_err(|err| map_geo_error(&err))?;
        let bounds =
            BoundingBox::around(center, query.radius_km).map_err(|err| map_geo_error(&err))?;

        // The box is index-friendly but coarser than the circle; keep
        // only candidates within the exact great-circle distance.
        let candidates = self
            .issues
            .find_in_box(&bounds)
            .await
            .map_err(map_repo_error)?;
        let candidate_count = candidates.len();

        let matches: Vec<Issue> = candidates
            .into_iter()
            .filter(|issue| {
                haversine_km(center, issue.location.coordinates) <= query.radius_km
            })
            .collect();
        debug!(
            candidates = candidate_count,
            matches = matches.len(),
            radius_km = query.radius_km,
            "nearby search completed"
        );
        Ok(matches)
    }
}
