//! Gateway to the remote movie-listing REST API
//!
//! Movies are never stored locally; every read goes to the remote service
//! and the nested `data.movies` / `data.movie` payload is reshaped into
//! [`Movie`].

use async_trait::async_trait;
use failure::Fail;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_derive::Deserialize;

use crate::config::Config;
use crate::types::Movie;

#[derive(Debug, Fail)]
pub enum UpstreamError {
    #[fail(display = "request to {} failed: {}", url, source)]
    Request {
        url: String,
        #[cause]
        source: reqwest::Error,
    },
    #[fail(display = "{} responded with status {}", url, status)]
    Status { url: String, status: u16 },
    #[fail(display = "invalid payload from {}: {}", url, reason)]
    Decode { url: String, reason: String },
}

#[async_trait]
pub trait MovieGateway: Send + Sync {
    async fn list(&self) -> Result<Vec<Movie>, UpstreamError>;

    /// `None` when the remote side has no movie with this id
    async fn detail(&self, id: &str) -> Result<Option<Movie>, UpstreamError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ListData {
    #[serde(default)]
    movies: Vec<Movie>,
}

#[derive(Deserialize)]
struct DetailData {
    #[serde(default)]
    movie: Option<Movie>,
}

///
/// [`MovieGateway`] talking to a YTS-compatible API
///
pub struct YtsGateway {
    client: reqwest::Client,
    base_url: String,
}

impl YtsGateway {
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| UpstreamError::Request {
            url: config.movie_api_base_url.clone(),
            source,
        })?;
        Ok(Self {
            client,
            base_url: config.movie_api_base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn list_url(&self) -> String {
        format!("{}/list_movies.json", self.base_url)
    }

    fn detail_url(&self, id: &str) -> String {
        format!(
            "{}/movie_details.json?movie_id={}",
            self.base_url,
            utf8_percent_encode(id, NON_ALPHANUMERIC)
        )
    }

    async fn get<T>(&self, url: String) -> Result<T, UpstreamError>
    where
        T: serde::de::DeserializeOwned,
    {
        tracing::debug!(%url, "fetching movies");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| UpstreamError::Request {
                url: url.clone(),
                source,
            })?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|err| UpstreamError::Decode {
                url,
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl MovieGateway for YtsGateway {
    async fn list(&self) -> Result<Vec<Movie>, UpstreamError> {
        let data: ListData = self.get(self.list_url()).await?;
        Ok(data.movies)
    }

    async fn detail(&self, id: &str) -> Result<Option<Movie>, UpstreamError> {
        let data: DetailData = self.get(self.detail_url(id)).await?;
        Ok(data.movie.filter(|movie| !movie.is_placeholder()))
    }
}
