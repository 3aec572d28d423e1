//! Operations issued by the movie and tweet screens

use maplit::hashmap;
use serde_derive::Deserialize;
use serde_json::Value;

use crate::client::{Client, ClientError, QueryRequest, Transport};

/// Client-only field marking a movie the user liked
pub const IS_LIKED: &str = "isLiked";

pub const GET_MOVIES: &str = r#"
query getMovies {
  allMovies {
    __typename
    id
    title
    medium_cover_image
  }
}
"#;

pub const GET_MOVIE: &str = r#"
query getMovie($movieId: String!) {
  movie(id: $movieId) {
    __typename
    id
    title
    medium_cover_image
    rating
  }
}
"#;

pub const ALL_TWEETS: &str = r#"
query allTweets {
  allTweets {
    __typename
    id
    text
    author {
      __typename
      id
      fullName
    }
  }
}
"#;

pub const POST_TWEET: &str = r#"
mutation postTweet($text: String!, $userId: ID!) {
  postTweet(text: $text, userID: $userId) {
    __typename
    id
    text
    userId
  }
}
"#;

pub const DELETE_TWEET: &str = r#"
mutation deleteTweet($id: ID!) {
  deleteTweet(id: $id)
}
"#;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub medium_cover_image: String,
    #[serde(rename = "isLiked", default)]
    pub is_liked: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MovieDetail {
    pub id: i32,
    pub title: String,
    pub medium_cover_image: String,
    pub rating: f64,
    #[serde(rename = "isLiked", default)]
    pub is_liked: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Author {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TweetView {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// Client with the movie screens' local schema extension installed
pub fn movie_client<T: Transport>(transport: T) -> Client<T> {
    let client = Client::new(transport);
    client.extend_type("Movie", IS_LIKED, Value::Bool(false));
    client
}

pub fn movie_key(id: &str) -> String {
    format!("Movie:{}", id)
}

fn field<T: serde::de::DeserializeOwned>(mut data: Value, name: &str) -> Result<T, ClientError> {
    let value = data
        .get_mut(name)
        .map(Value::take)
        .unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|err| ClientError::Decode(err.to_string()))
}

pub async fn movies<T: Transport>(client: &Client<T>) -> Result<Vec<MovieSummary>, ClientError> {
    let data = client.query(&QueryRequest::new(GET_MOVIES)).await?;
    field(data, "allMovies")
}

/// Movie detail screen data, `None` for an unknown id
pub async fn movie<T: Transport>(
    client: &Client<T>,
    id: &str,
) -> Result<Option<MovieDetail>, ClientError> {
    let request = QueryRequest::new(GET_MOVIE).variable("movieId", id);
    let data = client.query(&request).await?;
    field(data, "movie")
}

///
/// Flips `isLiked` of a cached movie through a cache patch
///
/// Returns the new value, or `None` when the movie was never fetched.
///
pub fn toggle_like<T: Transport>(client: &Client<T>, id: &str) -> Option<bool> {
    let key = movie_key(id);
    let liked = client
        .read_fragment(&key)?
        .get(IS_LIKED)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    client.write_fragment(&key, hashmap! { IS_LIKED.to_owned() => Value::Bool(!liked) });
    Some(!liked)
}

pub async fn tweets<T: Transport>(client: &Client<T>) -> Result<Vec<TweetView>, ClientError> {
    let data = client.query(&QueryRequest::new(ALL_TWEETS)).await?;
    field(data, "allTweets")
}

pub async fn post_tweet<T: Transport>(
    client: &Client<T>,
    text: &str,
    user_id: &str,
) -> Result<TweetView, ClientError> {
    let request = QueryRequest::new(POST_TWEET)
        .variable("text", text)
        .variable("userId", user_id);
    let data = client.mutate(&request).await?;
    field(data, "postTweet")
}

pub async fn delete_tweet<T: Transport>(client: &Client<T>, id: &str) -> Result<bool, ClientError> {
    let request = QueryRequest::new(DELETE_TWEET).variable("id", id);
    let data = client.mutate(&request).await?;
    field(data, "deleteTweet")
}
