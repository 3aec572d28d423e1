use juniper::{graphql_object, ID};

use crate::context::Context;

///
/// GraphQL type for a user
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct User {
    /// unique identification of user
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn new<S: Into<String>>(id: S, first_name: S, last_name: S) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

#[graphql_object(context = Context)]
impl User {
    fn id(&self) -> ID {
        ID::from(self.id.clone())
    }

    fn first_name(&self) -> &str {
        &self.first_name
    }

    fn last_name(&self) -> &str {
        &self.last_name
    }

    /// First and last name joined by a single space, computed on read
    fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
