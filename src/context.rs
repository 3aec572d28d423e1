use std::sync::Arc;

use crate::movies::MovieGateway;
use crate::store::EntityStore;

///
/// Context for Juniper
///
/// Shared by every request the handler serves.
///
pub struct Context {
    pub store: Arc<EntityStore>,
    pub movies: Arc<dyn MovieGateway>,
}

impl juniper::Context for Context {}

impl Context {
    pub fn new<G: MovieGateway + 'static>(store: EntityStore, movies: G) -> Self {
        Self {
            store: Arc::new(store),
            movies: Arc::new(movies),
        }
    }
}
