use juniper::{graphql_object, EmptySubscription, FieldResult, IntoFieldError, ID};

use crate::context::Context;
use crate::error::Error;
use crate::types::{Movie, Tweet, User};

pub struct Query;

#[graphql_object(context = Context)]
impl Query {
    /// Liveness probe
    fn ping() -> &'static str {
        "pong"
    }

    ///
    /// Get all tweets in insertion order
    ///
    fn all_tweets(context: &Context) -> Vec<Tweet> {
        context.store.tweets()
    }

    ///
    /// Get tweet by id, `null` when there is none
    ///
    fn tweet(context: &Context, id: ID) -> Option<Tweet> {
        let id: &str = &id;
        tracing::debug!(id, "tweet lookup");
        context.store.tweet(id)
    }

    ///
    /// Get all users
    ///
    fn all_users(context: &Context) -> Vec<User> {
        context.store.users()
    }

    ///
    /// List movies from the remote movie service
    ///
    async fn all_movies(context: &Context) -> FieldResult<Vec<Movie>> {
        context.movies.list().await.map_err(|err| {
            tracing::warn!(error = %err, "movie listing failed");
            Error::from(err).into_field_error()
        })
    }

    ///
    /// Get movie details from the remote movie service, `null` for unknown ids
    ///
    async fn movie(context: &Context, id: String) -> FieldResult<Option<Movie>> {
        context.movies.detail(&id).await.map_err(|err| {
            tracing::warn!(error = %err, movie_id = %id, "movie lookup failed");
            Error::from(err).into_field_error()
        })
    }
}

pub struct Mutation;

#[graphql_object(context = Context)]
impl Mutation {
    ///
    /// Create new tweet written by an existing user
    ///
    #[allow(non_snake_case)]
    fn post_tweet(context: &Context, text: String, userID: ID) -> FieldResult<Tweet> {
        context
            .store
            .post_tweet(text, userID.to_string())
            .map_err(IntoFieldError::into_field_error)
    }

    ///
    /// Delete tweet by id; `false` when there was nothing to delete
    ///
    fn delete_tweet(context: &Context, id: ID) -> bool {
        context.store.delete_tweet(&id)
    }
}

pub type Schema = juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

pub fn schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}
