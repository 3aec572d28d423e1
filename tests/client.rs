mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tweetql::client::operations::{self, movie_client, movie_key, toggle_like, IS_LIKED};
use tweetql::client::{
    Client, ClientError, FetchPolicy, GraphQLBody, GraphQLReply, HttpTransport, LocalTransport,
    QueryRequest, QueryState, Transport,
};
use tweetql::{schema, ClientConfig, GraphQLHandler};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{seeded_context, StubGateway};

/// Records every operation before handing it to the in-process handler
struct Recording {
    inner: LocalTransport,
    calls: AtomicUsize,
    bodies: Mutex<Vec<GraphQLBody>>,
}

impl Recording {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for Recording {
    async fn send(&self, body: &GraphQLBody) -> Result<GraphQLReply, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().push(body.clone());
        self.inner.send(body).await
    }
}

fn recording(handler: GraphQLHandler) -> Recording {
    Recording {
        inner: LocalTransport::new(handler),
        calls: AtomicUsize::new(0),
        bodies: Mutex::new(Vec::new()),
    }
}

fn client() -> Client<Recording> {
    movie_client(recording(GraphQLHandler::new(schema(), seeded_context())))
}

#[tokio::test]
async fn movie_detail_is_fetched_once_then_read_from_cache() {
    let client = client();
    let movie = operations::movie(&client, "10").await.unwrap().unwrap();
    assert_eq!(movie.title, "Heat");
    assert_eq!(movie.rating, 8.3);
    assert!(!movie.is_liked);

    let again = operations::movie(&client, "10").await.unwrap().unwrap();
    assert_eq!(again, movie);
    assert_eq!(client.transport().calls(), 1);

    operations::movie(&client, "11").await.unwrap();
    assert_eq!(client.transport().calls(), 2);
}

#[tokio::test]
async fn cached_results_keep_the_shape_of_their_query() {
    let client = client();
    operations::movie(&client, "10").await.unwrap();
    let data = client
        .query(&QueryRequest::new(operations::GET_MOVIES))
        .await
        .unwrap();
    let heat = data["allMovies"][0].as_object().unwrap();
    assert_eq!(heat["title"], json!("Heat"));
    assert_eq!(heat[IS_LIKED], json!(false));
    assert!(!heat.contains_key("rating"));

    let again = operations::movie(&client, "10").await.unwrap().unwrap();
    assert_eq!(again.rating, 8.3);
    assert_eq!(client.transport().calls(), 2);
}

#[tokio::test]
async fn unknown_movie_reads_as_none() {
    let client = client();
    assert_eq!(operations::movie(&client, "404").await.unwrap(), None);
}

#[tokio::test]
async fn toggling_like_patches_cache_without_server_round_trip() {
    let client = client();
    assert_eq!(toggle_like(&client, "10"), None);

    operations::movie(&client, "10").await.unwrap();
    let request = QueryRequest::new(operations::GET_MOVIE).variable("movieId", "10");
    let mut watcher = client.watch_query(&request);
    assert!(!watcher.borrow().loading);
    assert_eq!(watcher.borrow().data.as_ref().unwrap()["movie"][IS_LIKED], json!(false));

    assert_eq!(toggle_like(&client, "10"), Some(true));
    assert!(watcher.has_changed().unwrap());
    let state = watcher.borrow_and_update().clone();
    assert_eq!(state.data.unwrap()["movie"][IS_LIKED], json!(true));
    assert!(operations::movie(&client, "10").await.unwrap().unwrap().is_liked);

    assert_eq!(toggle_like(&client, "10"), Some(false));
    assert_eq!(
        client.read_fragment(&movie_key("10")).unwrap()[IS_LIKED],
        json!(false)
    );
    assert_eq!(client.transport().calls(), 1);
}

#[tokio::test]
async fn client_only_field_never_reaches_the_server() {
    let client = client();
    operations::movies(&client).await.unwrap();
    toggle_like(&client, "11");
    let movies = operations::movies(&client).await.unwrap();
    assert_eq!(
        movies.iter().map(|m| (m.id, m.is_liked)).collect::<Vec<_>>(),
        vec![(10, false), (11, true)]
    );

    let list = QueryRequest::new(operations::GET_MOVIES).fetch_policy(FetchPolicy::NetworkOnly);
    client.query(&list).await.unwrap();
    assert_eq!(client.transport().calls(), 2);
    for body in client.transport().bodies.lock().iter() {
        assert!(!body.query.contains(IS_LIKED));
    }
    let movies = operations::movies(&client).await.unwrap();
    assert!(movies[1].is_liked);
}

#[tokio::test]
async fn watcher_moves_from_loading_to_data() {
    let client = client();
    let request = QueryRequest::new(operations::GET_MOVIES);
    let mut watcher = client.watch_query(&request);
    assert_eq!(*watcher.borrow(), QueryState::loading());

    client.query(&request).await.unwrap();
    assert!(watcher.has_changed().unwrap());
    let state = watcher.borrow_and_update().clone();
    assert!(!state.loading);
    assert_eq!(state.data.unwrap()["allMovies"][0]["title"], json!("Heat"));

    // patches to entities the list links to reach the list watcher too
    toggle_like(&client, "10");
    assert!(watcher.has_changed().unwrap());
}

#[tokio::test]
async fn watcher_sees_errors() {
    let handler = GraphQLHandler::new(
        schema(),
        tweetql::Context::new(tweetql::EntityStore::seeded(), StubGateway::failing()),
    );
    let client = movie_client(recording(handler));
    let request = QueryRequest::new(operations::GET_MOVIES);
    let watcher = client.watch_query(&request);

    match client.query(&request).await {
        Err(ClientError::GraphQL(messages)) => {
            assert!(messages[0].starts_with("movie service unavailable"))
        }
        other => panic!("unexpected result: {:?}", other),
    }
    let state = watcher.borrow().clone();
    assert!(!state.loading);
    assert!(matches!(state.error, Some(ClientError::GraphQL(_))));
}

#[tokio::test]
async fn tweets_round_trip_through_mutations() {
    let client = client();
    let tweets = operations::tweets(&client).await.unwrap();
    assert_eq!(tweets.len(), 2);
    assert_eq!(tweets[0].author.as_ref().unwrap().full_name, "Doing Lee");

    let posted = operations::post_tweet(&client, "hi", "1").await.unwrap();
    assert_eq!(posted.id, "3");
    assert_eq!(posted.user_id.as_deref(), Some("1"));
    assert_eq!(
        client.read_fragment("Tweet:3").unwrap()["text"],
        json!("hi")
    );

    assert!(operations::delete_tweet(&client, "3").await.unwrap());
    assert!(!operations::delete_tweet(&client, "3").await.unwrap());

    let refreshed =
        QueryRequest::new(operations::ALL_TWEETS).fetch_policy(FetchPolicy::NetworkOnly);
    let data = client.query(&refreshed).await.unwrap();
    assert_eq!(data["allTweets"].as_array().unwrap().len(), 2);

    match operations::post_tweet(&client, "hi", "404").await {
        Err(ClientError::GraphQL(messages)) => assert_eq!(messages, vec!["user 404 not found"]),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn http_transport_posts_json_to_configured_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({
            "query": operations::GET_MOVIE,
            "variables": { "movieId": "10" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "movie": {
                "__typename": "Movie", "id": 10, "title": "Heat",
                "medium_cover_image": "https://img/10.jpg", "rating": 8.3
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        uri: format!("{}/graphql", server.uri()),
    };
    let client = movie_client(HttpTransport::new(&config));
    let movie = operations::movie(&client, "10").await.unwrap().unwrap();
    assert_eq!(movie.title, "Heat");
    assert!(!movie.is_liked);
    operations::movie(&client, "10").await.unwrap();
}

#[tokio::test]
async fn http_transport_reports_status_and_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/invalid"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{ "message": "Unknown field \"nope\" on type \"Query\"" }]
        })))
        .mount(&server)
        .await;

    let client = Client::new(HttpTransport::new(&ClientConfig {
        uri: format!("{}/down", server.uri()),
    }));
    assert_eq!(
        client.query(&QueryRequest::new("{ ping }")).await,
        Err(ClientError::Status(503))
    );

    let client = Client::new(HttpTransport::new(&ClientConfig {
        uri: format!("{}/invalid", server.uri()),
    }));
    assert_eq!(
        client.query(&QueryRequest::new("{ nope }")).await,
        Err(ClientError::GraphQL(vec![
            "Unknown field \"nope\" on type \"Query\"".to_owned()
        ]))
    );
}

#[test]
fn default_client_uri_is_local_server() {
    assert_eq!(ClientConfig::default().uri, "http://localhost:4000/");
}
