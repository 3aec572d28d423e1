use serde::{Deserialize as _, Deserializer};
use serde_derive::{Deserialize, Serialize};

///
/// GraphQL type for a movie, a flat projection of the remote listing record
///
/// Field names follow the remote API verbatim. Attributes the remote side
/// leaves out fall back to their defaults.
///
#[derive(juniper::GraphQLObject, Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Movie {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[graphql(name = "imdb_code")]
    #[serde(deserialize_with = "null_as_default")]
    pub imdb_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[graphql(name = "title_english")]
    #[serde(deserialize_with = "null_as_default")]
    pub title_english: String,
    #[graphql(name = "title_long")]
    #[serde(deserialize_with = "null_as_default")]
    pub title_long: String,
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub runtime: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    pub summary: Option<String>,
    #[graphql(name = "description_full")]
    #[serde(deserialize_with = "null_as_default")]
    pub description_full: String,
    pub synopsis: Option<String>,
    #[graphql(name = "yt_trailer_code")]
    #[serde(deserialize_with = "null_as_default")]
    pub yt_trailer_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    #[graphql(name = "background_image")]
    #[serde(deserialize_with = "null_as_default")]
    pub background_image: String,
    #[graphql(name = "background_image_original")]
    #[serde(deserialize_with = "null_as_default")]
    pub background_image_original: String,
    #[graphql(name = "small_cover_image")]
    #[serde(deserialize_with = "null_as_default")]
    pub small_cover_image: String,
    #[graphql(name = "medium_cover_image")]
    #[serde(deserialize_with = "null_as_default")]
    pub medium_cover_image: String,
    #[graphql(name = "large_cover_image")]
    #[serde(deserialize_with = "null_as_default")]
    pub large_cover_image: String,
}

/// The remote API sends `null` for attributes of unknown movies.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Movie {
    /// The remote API answers unknown ids with a zeroed record instead of an error.
    pub fn is_placeholder(&self) -> bool {
        self.id == 0
    }
}
