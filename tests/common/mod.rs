#![allow(dead_code)]

use async_trait::async_trait;
use juniper::Variables;
use serde_json::Value;
use tweetql::types::{Movie, Tweet, User};
use tweetql::{schema, Context, EntityStore, MovieGateway, UpstreamError};

///
/// Gateway answering from a fixed list, or failing every call
///
pub struct StubGateway {
    movies: Vec<Movie>,
    failing: bool,
}

impl StubGateway {
    pub fn with_movies(movies: Vec<Movie>) -> Self {
        Self {
            movies,
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            movies: Vec::new(),
            failing: true,
        }
    }

    fn check(&self) -> Result<(), UpstreamError> {
        if self.failing {
            Err(UpstreamError::Status {
                url: "http://movies.stub/api/v2".into(),
                status: 503,
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MovieGateway for StubGateway {
    async fn list(&self) -> Result<Vec<Movie>, UpstreamError> {
        self.check()?;
        Ok(self.movies.clone())
    }

    async fn detail(&self, id: &str) -> Result<Option<Movie>, UpstreamError> {
        self.check()?;
        Ok(self
            .movies
            .iter()
            .find(|movie| movie.id.to_string() == id)
            .cloned())
    }
}

pub fn movie(id: i32, title: &str) -> Movie {
    Movie {
        id,
        title: title.into(),
        title_english: title.into(),
        title_long: format!("{} (1995)", title),
        year: 1995,
        rating: 8.3,
        runtime: 170.0,
        genres: vec!["Crime".into(), "Drama".into()],
        medium_cover_image: format!("https://img.stub/{}/medium.jpg", id),
        ..Movie::default()
    }
}

pub fn stub_movies() -> StubGateway {
    StubGateway::with_movies(vec![movie(10, "Heat"), movie(11, "Ronin")])
}

pub fn context_with(tweets: Vec<Tweet>, users: Vec<User>, movies: StubGateway) -> Context {
    Context::new(EntityStore::new(tweets, users), movies)
}

pub fn seeded_context() -> Context {
    Context::new(EntityStore::seeded(), stub_movies())
}

/// Field error as `(message, extensions.code)`
pub type ErrorSummary = (String, Option<String>);

/// Executes `query` against the schema, returning the data as JSON plus field errors
pub async fn run(context: &Context, query: &str) -> (Value, Vec<ErrorSummary>) {
    let root_node = schema();
    let (value, errors) = juniper::execute(query, None, &root_node, &Variables::new(), context)
        .await
        .expect("query should be valid");
    let errors = errors
        .iter()
        .map(|err| {
            let extensions = serde_json::to_value(err.error().extensions()).unwrap();
            (
                err.error().message().to_owned(),
                extensions["code"].as_str().map(str::to_owned),
            )
        })
        .collect();
    (serde_json::to_value(&value).unwrap(), errors)
}
