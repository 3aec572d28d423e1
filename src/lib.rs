/*!

# tweetql

A small [GraphQL][GraphQL] API built on [Juniper][Juniper] and served from an
[AWS Lambda Runtime][AWS Lambda Runtime] function behind [AWS Api Gateway][AWS Api Gateway].

The schema exposes an in-memory store of tweets and users, and proxies a public
movie-listing REST API:

```graphql
type Query {
  allTweets: [Tweet!]!
  tweet(id: ID!): Tweet
  allUsers: [User!]!
  allMovies: [Movie!]!
  movie(id: String!): Movie
  ping: String!
}

type Mutation {
  postTweet(text: String!, userID: ID!): Tweet!
  deleteTweet(id: ID!): Boolean!
}
```

The [`client`] module is the consuming side: it sends operations over a
[`client::Transport`], normalizes answers into a cache keyed by
`<__typename>:<id>` and keeps client-only fields such as `Movie.isLiked`
out of every request.

## Configuration

The function reads `MOVIE_API_BASE_URL`, `MOVIE_API_TIMEOUT_SECS`,
`GRAPHQL_ENDPOINT`, `GRAPHQL_PLAYGROUND` and `LOG_FORMAT`; see [`config::Config`].
Log verbosity follows `RUST_LOG`.

## License

This project is under the MIT license.

[AWS Api Gateway]: https://aws.amazon.com/api-gateway/
[AWS Lambda Runtime]: https://github.com/awslabs/aws-lambda-rust-runtime
[Juniper]: https://github.com/graphql-rust/juniper
[GraphQL]: http://graphql.org

*/

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod lambda;
pub mod movies;
pub mod store;
pub mod telemetry;
pub mod types;

pub use config::{ClientConfig, Config};
pub use context::Context;
pub use error::Error;
pub use lambda::{GraphQLHandler, GraphQLRequest};
pub use movies::{MovieGateway, UpstreamError, YtsGateway};
pub use store::EntityStore;
pub use types::{schema, Schema};
