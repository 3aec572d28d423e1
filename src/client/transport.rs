use std::convert::TryFrom;

use async_trait::async_trait;
use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
use http::Method;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::ClientError;
use crate::config::ClientConfig;
use crate::lambda::GraphQLHandler;

/// Operation as sent over the wire
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphQLBody {
    pub query: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ReplyError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
}

/// Server answer to a single operation
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GraphQLReply {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<ReplyError>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, body: &GraphQLBody) -> Result<GraphQLReply, ClientError>;
}

fn decode(status: u16, text: &str) -> Result<GraphQLReply, ClientError> {
    serde_json::from_str::<GraphQLReply>(text).map_err(|err| {
        if (200..300).contains(&status) {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Status(status)
        }
    })
}

///
/// Posts operations as JSON to a fixed url
///
pub struct HttpTransport {
    client: reqwest::Client,
    uri: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            uri: config.uri.clone(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: &GraphQLBody) -> Result<GraphQLReply, ClientError> {
        let response = self
            .client
            .post(&self.uri)
            .json(body)
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        decode(status, &text)
    }
}

///
/// Runs operations through an in-process [`GraphQLHandler`], the same path a
/// deployed function takes
///
pub struct LocalTransport {
    handler: GraphQLHandler,
}

impl LocalTransport {
    pub fn new(handler: GraphQLHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, body: &GraphQLBody) -> Result<GraphQLReply, ClientError> {
        let payload =
            serde_json::to_string(body).map_err(|err| ClientError::Transport(err.to_string()))?;
        let request = ApiGatewayProxyRequest {
            http_method: Method::POST,
            body: Some(payload),
            ..Default::default()
        };
        let response = self.handler.handle(request).await;
        let status = u16::try_from(response.status_code).unwrap_or(500);
        match response.body {
            Some(Body::Text(text)) => decode(status, &text),
            Some(Body::Binary(bytes)) => decode(status, &String::from_utf8_lossy(&bytes)),
            _ => Err(ClientError::Status(status)),
        }
    }
}
