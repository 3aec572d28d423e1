//! Runtime configuration read from environment variables

use std::time::Duration;

use failure::Fail;

pub const DEFAULT_MOVIE_API_BASE_URL: &str = "https://yts.torrentbay.to/api/v2";
pub const DEFAULT_CLIENT_URI: &str = "http://localhost:4000/";

#[derive(Debug, Fail, PartialEq)]
pub enum ConfigError {
    #[fail(display = "invalid value {:?} for {}", value, key)]
    InvalidValue { key: &'static str, value: String },
}

/// Output format of the log subscriber
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base url of the remote movie API (`MOVIE_API_BASE_URL`)
    pub movie_api_base_url: String,
    /// Per-request timeout for the movie API (`MOVIE_API_TIMEOUT_SECS`), none by default
    pub upstream_timeout: Option<Duration>,
    /// Url the playground page posts to (`GRAPHQL_ENDPOINT`)
    pub graphql_endpoint: String,
    /// Serve the GraphQL Playground on parameterless GET requests (`GRAPHQL_PLAYGROUND`)
    pub playground: bool,
    /// `json` or `text` (`LOG_FORMAT`)
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            movie_api_base_url: DEFAULT_MOVIE_API_BASE_URL.into(),
            upstream_timeout: None,
            graphql_endpoint: "/".into(),
            playground: true,
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(url) = lookup("MOVIE_API_BASE_URL") {
            config.movie_api_base_url = url;
        }
        if let Some(secs) = lookup("MOVIE_API_TIMEOUT_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "MOVIE_API_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
            config.upstream_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(endpoint) = lookup("GRAPHQL_ENDPOINT") {
            config.graphql_endpoint = endpoint;
        }
        if let Some(flag) = lookup("GRAPHQL_PLAYGROUND") {
            config.playground = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "GRAPHQL_PLAYGROUND",
                        value: flag,
                    })
                }
            };
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = match format.trim().to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "pretty" => LogFormat::Text,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "LOG_FORMAT",
                        value: format,
                    })
                }
            };
        }
        Ok(config)
    }
}

/// Settings of the client query layer
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub uri: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_CLIENT_URI.into(),
        }
    }
}
