/// TMDB (The Movie Database) provider
///
/// Authenticates with an `api_key` query parameter. Every request has a
/// 5 second timeout and is never retried.
///
/// Endpoints used:
/// - /search/multi
/// - /{movie|tv}/{id}, /{movie|tv}/{id}/similar
/// - /trending/{all|movie|tv}/{day|week}
/// - /{movie|tv}/popular, /{movie|tv}/top_rated
use crate::{
    error::{AppError, AppResult},
    models::{MediaType, TimeWindow, TmdbDetails, TmdbTitle},
    services::providers::MetadataProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, image_url: String) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            image_url,
        })
    }

    /// Performs a GET against the API and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to deserialize TMDB response");
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }

    /// Fetches a paged list endpoint, swallowing failures
    async fn fetch_list(
        &self,
        path: &str,
        params: &[(&str, &str)],
        fallback_media_type: Option<MediaType>,
    ) -> Vec<TmdbTitle> {
        match self.get_json::<serde_json::Value>(path, params).await {
            Ok(body) => {
                let titles = parse_results(&body, fallback_media_type);
                tracing::debug!(
                    path = %path,
                    results = titles.len(),
                    provider = "tmdb",
                    "List fetched"
                );
                titles
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path,
                    provider = "tmdb",
                    "TMDB list request failed"
                );
                Vec::new()
            }
        }
    }
}

/// Extracts the `results` array of a list response
///
/// Entries that are not movies or series (e.g. people in multi-search) are
/// dropped. Endpoints scoped to one media type omit `media_type`, so it is
/// filled in from `fallback_media_type`.
pub(crate) fn parse_results(
    body: &serde_json::Value,
    fallback_media_type: Option<MediaType>,
) -> Vec<TmdbTitle> {
    let Some(results) = body["results"].as_array() else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|result| serde_json::from_value::<TmdbTitle>(result.clone()).ok())
        .map(|mut title| {
            if title.media_type.is_none() {
                title.media_type = fallback_media_type;
            }
            title
        })
        .collect()
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn search(&self, query: &str) -> Vec<TmdbTitle> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let titles = self
            .fetch_list(
                "/search/multi",
                &[("query", query), ("include_adult", "false")],
                None,
            )
            .await;

        tracing::info!(
            query = %query,
            results = titles.len(),
            provider = "tmdb",
            "Title search completed"
        );

        titles
    }

    async fn details(&self, tmdb_id: i64, media_type: MediaType) -> AppResult<TmdbDetails> {
        let path = format!("/{}/{}", media_type, tmdb_id);
        let details: TmdbDetails = self.get_json(&path, &[]).await?;

        tracing::info!(
            tmdb_id = tmdb_id,
            media_type = %media_type,
            provider = "tmdb",
            "Details fetched"
        );

        Ok(details)
    }

    async fn trending(&self, media_type: Option<MediaType>, window: TimeWindow) -> Vec<TmdbTitle> {
        let scope = media_type.map_or("all", |m| m.as_str());
        let path = format!("/trending/{}/{}", scope, window.as_str());
        self.fetch_list(&path, &[], media_type).await
    }

    async fn popular(&self, media_type: MediaType) -> Vec<TmdbTitle> {
        let path = format!("/{}/popular", media_type);
        self.fetch_list(&path, &[], Some(media_type)).await
    }

    async fn top_rated(&self, media_type: MediaType) -> Vec<TmdbTitle> {
        let path = format!("/{}/top_rated", media_type);
        self.fetch_list(&path, &[], Some(media_type)).await
    }

    async fn similar(&self, tmdb_id: i64, media_type: MediaType) -> Vec<TmdbTitle> {
        let path = format!("/{}/{}/similar", media_type, tmdb_id);
        self.fetch_list(&path, &[], Some(media_type)).await
    }

    fn poster_url(&self, poster_path: &str) -> String {
        format!("{}{}", self.image_url, poster_path)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
