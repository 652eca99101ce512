//! The places/geocoding provider collaborator: opaque place lookup and
//! detail fetch. Geocoding accuracy is explicitly not this core's concern
//! — these shapes are only a contract for the Enrichment agent to call.

use async_trait::async_trait;

use itin_model::Coordinates;

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("places provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct PlaceSearchResult {
    pub place_id: String,
    pub formatted_address: String,
    pub coordinates: Coordinates,
    pub rating: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct PlaceDetails {
    pub photos: Vec<String>,
    pub reviews: Vec<(String, Option<f32>, Option<String>)>,
    pub rating: Option<f32>,
    pub user_ratings_total: Option<u32>,
    pub price_level: Option<u8>,
    pub opening_hours: Vec<String>,
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Option<PlaceSearchResult>, PlacesError>;
    async fn details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError>;
}

/// A fixed-answer fake for tests and the demo CLI.
pub struct FixedPlacesProvider {
    pub search_result: Option<PlaceSearchResult>,
    pub details: PlaceDetails,
}

#[async_trait]
impl PlacesProvider for FixedPlacesProvider {
    async fn search(&self, _query: &str) -> Result<Option<PlaceSearchResult>, PlacesError> {
        Ok(self.search_result.clone())
    }

    async fn details(&self, _place_id: &str) -> Result<PlaceDetails, PlacesError> {
        Ok(self.details.clone())
    }
}
