//! Movie endpoints
//!
//! Search, curated listings, details, favourites and the genre catalogue.

use serde_json::{json, Value};

use super::client::{ApiClient, ApiRequest};
use crate::models::{ApiResult, Genre, Movie, MovieDetail, Paginated};

pub const SEARCH: &str = "/movies/search";
pub const POPULAR: &str = "/movies/popular";
pub const COMING_SOON: &str = "/movies/coming-soon";
pub const RECOMMENDATIONS: &str = "/movies/recommendations";
pub const DETAILS: &str = "/movies/details";
pub const FAVOURITES: &str = "/movies/favourites";
pub const GENRES: &str = "/movies/genres";

/// Search parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub page: Option<u32>,
    pub genre: Option<u64>,
    pub year: Option<u16>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    fn to_request(&self) -> ApiRequest {
        ApiRequest::get(SEARCH)
            .param("query", &self.query)
            .param_opt("page", self.page)
            .param_opt("genre", self.genre)
            .param_opt("year", self.year)
    }
}

impl ApiClient {
    /// Search movies and shows
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &SearchQuery) -> ApiResult<Paginated<Movie>> {
        self.request(query.to_request(), "Search failed").await
    }

    /// Popular titles
    pub async fn popular(&self, page: Option<u32>) -> ApiResult<Paginated<Movie>> {
        let req = ApiRequest::get(POPULAR).param_opt("page", page);
        self.request(req, "Could not load popular movies").await
    }

    /// Upcoming releases
    pub async fn coming_soon(&self, page: Option<u32>) -> ApiResult<Paginated<Movie>> {
        let req = ApiRequest::get(COMING_SOON).param_opt("page", page);
        self.request(req, "Could not load upcoming movies").await
    }

    /// Personalised picks for the signed-in user
    pub async fn recommendations(&self, page: Option<u32>) -> ApiResult<Paginated<Movie>> {
        let req = ApiRequest::get(RECOMMENDATIONS).param_opt("page", page);
        self.request(req, "Could not load recommendations").await
    }

    /// Full details for one title
    pub async fn details(&self, id: u64) -> ApiResult<MovieDetail> {
        let endpoint = format!("{}/{}", DETAILS, id);
        self.request(ApiRequest::get(endpoint), "Could not load movie details")
            .await
    }

    /// The user's favourites
    pub async fn favourites(&self) -> ApiResult<Vec<Movie>> {
        self.request(ApiRequest::get(FAVOURITES), "Could not load favourites")
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_favourite(&self, movie_id: u64) -> ApiResult<Value> {
        let req = ApiRequest::post(FAVOURITES).body(json!({ "movie_id": movie_id }));
        self.request(req, "Could not add to favourites").await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_favourite(&self, movie_id: u64) -> ApiResult<Value> {
        let req = ApiRequest::delete(FAVOURITES).body(json!({ "movie_id": movie_id }));
        self.request(req, "Could not remove from favourites").await
    }

    /// Genre catalogue
    pub async fn genres(&self) -> ApiResult<Vec<Genre>> {
        self.request(ApiRequest::get(GENRES), "Could not load genres")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_params() {
        let query = SearchQuery {
            query: "blade runner".into(),
            page: Some(2),
            genre: None,
            year: Some(1982),
        };
        let req = query.to_request();
        assert_eq!(req.endpoint, SEARCH);
        assert_eq!(
            req.params,
            vec![
                ("query".to_string(), "blade runner".to_string()),
                ("page".to_string(), "2".to_string()),
                ("year".to_string(), "1982".to_string()),
            ]
        );
    }
}
