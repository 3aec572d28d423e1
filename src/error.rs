use failure::Fail;
use juniper::{graphql_value, FieldError, IntoFieldError};

use crate::movies::UpstreamError;

///
/// Errors raised by resolvers
///
/// Lookups that miss are not errors; they resolve to `null` or `false`.
///
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "user {} not found", _0)]
    UserNotFound(String),
    #[fail(display = "movie service unavailable: {}", _0)]
    UpstreamUnavailable(#[cause] UpstreamError),
    #[fail(display = "no tweet ids left")]
    IdsExhausted,
}

impl Error {
    /// Stable code exposed in `extensions.code` of the GraphQL error
    pub fn code(&self) -> &'static str {
        match self {
            Error::UserNotFound(_) => "USER_NOT_FOUND",
            Error::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Error::IdsExhausted => "IDS_EXHAUSTED",
        }
    }
}

impl From<UpstreamError> for Error {
    fn from(err: UpstreamError) -> Self {
        Error::UpstreamUnavailable(err)
    }
}

impl IntoFieldError for Error {
    fn into_field_error(self) -> FieldError {
        let code = self.code();
        FieldError::new(self, graphql_value!({ "code": code }))
    }
}
