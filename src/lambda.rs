//! AWS Api Gateway lambda integration for the GraphQL schema
//!
//! Requests arrive as Api Gateway proxy events. `GET` carries the operation
//! in query string parameters, `POST` carries a JSON body holding either a
//! single operation or a batch of them.

use std::convert::TryFrom;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::query_map::QueryMap;
use failure::Fail;
use http::{header, method::Method, status::StatusCode, HeaderMap, HeaderValue};
use juniper::{http as juniper_http, FieldError, InputValue, Value};
use juniper_http::GraphQLRequest as GqlR;
use lambda_runtime::{LambdaEvent, Service};
use serde_derive::Deserialize;

use crate::context::Context;
use crate::types::Schema;

#[derive(Debug, Fail)]
pub enum RequestError {
    #[fail(display = "Invalid method {}", _0)]
    InvalidMethod(Method),
    #[fail(display = "Missing query argument")]
    MissingQuery,
    #[fail(display = "Missing post body")]
    MissingPostBody,
    #[fail(display = "Invalid body")]
    InvalidBody,
    #[fail(display = "Prohibit extra field {}", _0)]
    ProhibitExtraField(String),
    #[fail(display = "Query parameter must not occur more than once")]
    MultipleQueryParameter,
    #[fail(display = "Operation name parameter must not occur more than once")]
    MultipleOperationNameParameter,
    #[fail(display = "Variables parameter must not occur more than once")]
    MultipleVariablesParameter,
    #[fail(display = "Invalid variables parameter")]
    InvalidVariablesParameter,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GraphQLBatchRequest {
    Single(GqlR),
    Batch(Vec<GqlR>),
}

/// Serialized outcome of executing a request: whether every operation succeeded, and the body
struct Executed {
    ok: bool,
    body: String,
}

impl GraphQLBatchRequest {
    async fn execute(
        &self,
        root_node: &Schema,
        context: &Context,
    ) -> Result<Executed, serde_json::Error> {
        match self {
            GraphQLBatchRequest::Single(request) => {
                let response = request.execute(root_node, context).await;
                Ok(Executed {
                    ok: response.is_ok(),
                    body: serde_json::to_string(&response)?,
                })
            }
            GraphQLBatchRequest::Batch(requests) => {
                let mut ok = true;
                let mut responses = Vec::with_capacity(requests.len());
                for request in requests {
                    let response = request.execute(root_node, context).await;
                    ok = ok && response.is_ok();
                    responses.push(serde_json::to_value(&response)?);
                }
                Ok(Executed {
                    ok,
                    body: serde_json::to_string(&responses)?,
                })
            }
        }
    }

    fn operation_names(&self) -> Vec<Option<&str>> {
        match self {
            GraphQLBatchRequest::Single(req) => vec![req.operation_name()],
            GraphQLBatchRequest::Batch(reqs) => {
                reqs.iter().map(|req| req.operation_name()).collect()
            }
        }
    }
}

fn response(
    status_code: StatusCode,
    content_type: &'static str,
    body: String,
) -> ApiGatewayProxyResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    ApiGatewayProxyResponse {
        status_code: i64::from(status_code.as_u16()),
        headers,
        body: Some(Body::Text(body)),
        ..Default::default()
    }
}

fn html(body: String) -> ApiGatewayProxyResponse {
    response(StatusCode::OK, "text/html", body)
}

fn json(status_code: StatusCode, body: String) -> ApiGatewayProxyResponse {
    response(status_code, "application/json", body)
}

fn internal_error() -> ApiGatewayProxyResponse {
    json(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"data":null,"errors":[{"message":"Internal server error"}]}"#.into(),
    )
}

/// Api Gateway fills both parameter maps; requests built by hand may only carry one of them.
fn query_parameters(req: &ApiGatewayProxyRequest) -> &QueryMap {
    if req.multi_value_query_string_parameters.iter().next().is_some() {
        &req.multi_value_query_string_parameters
    } else {
        &req.query_string_parameters
    }
}

fn single_parameter(
    params: &QueryMap,
    key: &str,
    duplicated: RequestError,
) -> Result<Option<String>, RequestError> {
    match params.all(key) {
        Some(values) if values.len() > 1 => Err(duplicated),
        Some(values) => Ok(values.first().map(|value| (*value).to_owned())),
        None => Ok(None),
    }
}

/// Wrapper around an incoming GraphQL request, single or batched
#[derive(Debug)]
pub struct GraphQLRequest(GraphQLBatchRequest);

impl GraphQLRequest {
    fn from_get(req: &ApiGatewayProxyRequest) -> Result<Self, RequestError> {
        let params = query_parameters(req);
        for (key, _) in params.iter() {
            match key {
                "query" | "operationName" | "operation_name" | "variables" => {}
                _ => return Err(RequestError::ProhibitExtraField(key.to_owned())),
            }
        }
        let query = single_parameter(params, "query", RequestError::MultipleQueryParameter)?
            .filter(|query| !query.is_empty())
            .ok_or(RequestError::MissingQuery)?;
        let operation_name = match single_parameter(
            params,
            "operationName",
            RequestError::MultipleOperationNameParameter,
        )? {
            Some(name) => Some(name),
            None => single_parameter(
                params,
                "operation_name",
                RequestError::MultipleOperationNameParameter,
            )?,
        };
        let variables =
            match single_parameter(params, "variables", RequestError::MultipleVariablesParameter)? {
                Some(variables) => Some(
                    serde_json::from_str::<InputValue>(&variables)
                        .map_err(|_| RequestError::InvalidVariablesParameter)?,
                ),
                None => None,
            };
        Ok(Self(GraphQLBatchRequest::Single(GqlR::new(
            query,
            operation_name,
            variables,
        ))))
    }

    fn from_post(req: &ApiGatewayProxyRequest) -> Result<Self, RequestError> {
        match &req.body {
            Some(body) => serde_json::from_str::<GraphQLBatchRequest>(body)
                .map(Self)
                .map_err(|_| RequestError::InvalidBody),
            None => Err(RequestError::MissingPostBody),
        }
    }

    /// Execute an incoming GraphQL query
    pub async fn execute(&self, root_node: &Schema, context: &Context) -> ApiGatewayProxyResponse {
        match self.0.execute(root_node, context).await {
            Ok(executed) => {
                let status_code = if executed.ok {
                    StatusCode::OK
                } else {
                    StatusCode::BAD_REQUEST
                };
                json(status_code, executed.body)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize graphql response");
                internal_error()
            }
        }
    }

    /// Returns the operation names associated with this request.
    ///
    /// For batch requests there will be multiple names.
    pub fn operation_names(&self) -> Vec<Option<&str>> {
        self.0.operation_names()
    }
}

impl TryFrom<&ApiGatewayProxyRequest> for GraphQLRequest {
    type Error = RequestError;

    fn try_from(req: &ApiGatewayProxyRequest) -> Result<Self, Self::Error> {
        match req.http_method {
            Method::GET => Self::from_get(req),
            Method::POST => Self::from_post(req),
            ref raw_method => Err(RequestError::InvalidMethod(raw_method.clone())),
        }
    }
}

/// Constructs an error response outside of the normal execution flow
pub fn error(error: FieldError) -> ApiGatewayProxyResponse {
    let response = juniper_http::GraphQLResponse::error(error);
    match serde_json::to_string(&response) {
        Ok(body) => json(StatusCode::BAD_REQUEST, body),
        Err(_) => internal_error(),
    }
}

/// Generate an HTML page containing GraphQL Playground
pub fn playground_source(graphql_endpoint_url: &str) -> ApiGatewayProxyResponse {
    html(juniper_http::playground::playground_source(
        graphql_endpoint_url,
        None,
    ))
}

/// Aws Api Gateway GraphQL Handler for GET and POST requests
#[derive(Clone)]
pub struct GraphQLHandler {
    root_node: Arc<Schema>,
    context: Arc<Context>,
    playground_endpoint: Option<String>,
}

impl GraphQLHandler {
    pub fn new(root_node: Schema, context: Context) -> Self {
        Self {
            root_node: Arc::new(root_node),
            context: Arc::new(context),
            playground_endpoint: None,
        }
    }

    /// Serve GraphQL Playground, posting to `endpoint`, on `GET` requests without parameters
    pub fn with_playground<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.playground_endpoint = Some(endpoint.into());
        self
    }

    pub async fn handle(&self, req: ApiGatewayProxyRequest) -> ApiGatewayProxyResponse {
        if let Some(endpoint) = &self.playground_endpoint {
            if req.http_method == Method::GET && query_parameters(&req).iter().next().is_none() {
                return playground_source(endpoint);
            }
        }
        let gql_req = match GraphQLRequest::try_from(&req) {
            Ok(gql_req) => gql_req,
            Err(err) => {
                tracing::warn!(method = %req.http_method, error = %err, "rejected graphql request");
                return error(FieldError::new(err, Value::null()));
            }
        };
        tracing::info!(
            method = %req.http_method,
            operations = ?gql_req.operation_names(),
            "graphql request"
        );
        gql_req.execute(&self.root_node, &self.context).await
    }
}

impl Service<LambdaEvent<ApiGatewayProxyRequest>> for GraphQLHandler {
    type Response = ApiGatewayProxyResponse;
    type Error = lambda_runtime::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: LambdaEvent<ApiGatewayProxyRequest>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(event.payload).await) })
    }
}
