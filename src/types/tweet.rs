use juniper::{graphql_object, ID};

use crate::context::Context;
use crate::types::User;

///
/// GraphQL type for a tweet
///
#[derive(Clone, Debug, PartialEq)]
pub struct Tweet {
    /// unique identification of tweet
    pub id: String,
    pub text: String,
    /// id of the authoring user
    pub user_id: String,
}

impl Tweet {
    pub fn new<S: Into<String>>(id: S, text: S, user_id: S) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            user_id: user_id.into(),
        }
    }
}

#[graphql_object(context = Context)]
impl Tweet {
    fn id(&self) -> ID {
        ID::from(self.id.clone())
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Author of the tweet, `null` when the referenced user does not exist
    fn author(&self, context: &Context) -> Option<User> {
        context.store.user(&self.user_id)
    }
}
