//! GraphQL types and the schema root node

pub mod movie;
pub mod schema;
pub mod tweet;
pub mod user;

pub use movie::Movie;
pub use schema::{schema, Mutation, Query, Schema};
pub use tweet::Tweet;
pub use user::User;
