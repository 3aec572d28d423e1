//! Client query layer
//!
//! Sends operations through a [`Transport`], keeps a normalized
//! [`InMemoryCache`] of the answers and tells watchers whenever data they
//! read from the cache changes. Fields declared with [`Client::extend_type`]
//! are resolved from the cache alone and never reach the server.

pub mod cache;
pub mod document;
pub mod operations;
pub mod transport;

use failure::Fail;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::watch;

pub use cache::InMemoryCache;
pub use document::Selection;
pub use transport::{GraphQLBody, GraphQLReply, HttpTransport, LocalTransport, Transport};

#[derive(Clone, Debug, Fail, PartialEq)]
pub enum ClientError {
    #[fail(display = "transport failed: {}", _0)]
    Transport(String),
    #[fail(display = "server answered with status {}", _0)]
    Status(u16),
    #[fail(display = "server reported errors: {:?}", _0)]
    GraphQL(Vec<String>),
    #[fail(display = "unexpected response: {}", _0)]
    Decode(String),
    #[fail(display = "invalid operation document: {}", _0)]
    Document(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FetchPolicy {
    /// Answer from the cache when the same operation was fetched before
    CacheFirst,
    /// Always ask the server, then update the cache
    NetworkOnly,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy::CacheFirst
    }
}

/// Operation document plus its variables
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    pub variables: Map<String, Value>,
    pub fetch_policy: FetchPolicy,
}

impl QueryRequest {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            fetch_policy: FetchPolicy::default(),
        }
    }

    pub fn variable<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn fetch_policy(mut self, fetch_policy: FetchPolicy) -> Self {
        self.fetch_policy = fetch_policy;
        self
    }

    fn cache_key(&self) -> String {
        format!("{}|{}", self.query, Value::Object(self.variables.clone()))
    }

    fn selections(&self) -> Result<Vec<Selection>, ClientError> {
        document::parse(&self.query, &self.variables)
    }

    fn body(&self) -> GraphQLBody {
        GraphQLBody {
            query: self.query.clone(),
            variables: self.variables.clone(),
        }
    }
}

/// What a watcher currently sees for its query
#[derive(Clone, Debug, PartialEq)]
pub struct QueryState {
    pub loading: bool,
    pub data: Option<Value>,
    pub error: Option<ClientError>,
}

impl QueryState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
        }
    }

    pub fn ready(data: Value) -> Self {
        Self {
            loading: false,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: ClientError) -> Self {
        Self {
            loading: false,
            data: None,
            error: Some(error),
        }
    }
}

struct Watcher {
    query_key: String,
    sender: watch::Sender<QueryState>,
}

pub struct Client<T> {
    transport: T,
    cache: Mutex<InMemoryCache>,
    watchers: Mutex<Vec<Watcher>>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::with_cache(transport, InMemoryCache::new())
    }

    pub fn with_cache(transport: T, cache: InMemoryCache) -> Self {
        Self {
            transport,
            cache: Mutex::new(cache),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Local schema extension: declares a client-only field on `typename`
    pub fn extend_type<S: Into<String>>(&self, typename: S, field: S, default: Value) {
        self.cache.lock().extend_type(typename, field, default);
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs a query, answering from the cache when the fetch policy allows it
    pub async fn query(&self, request: &QueryRequest) -> Result<Value, ClientError> {
        let query_key = request.cache_key();
        if request.fetch_policy == FetchPolicy::CacheFirst {
            let cached = self.cache.lock().read_result(&query_key);
            if let Some(data) = cached {
                tracing::debug!("query answered from cache");
                return Ok(data);
            }
        }
        let fetched = match request.selections() {
            Ok(selections) => self
                .fetch(request)
                .await
                .map(|data| (selections, data)),
            Err(err) => Err(err),
        };
        match fetched {
            Ok((selections, data)) => {
                let (touched, result) = {
                    let mut cache = self.cache.lock();
                    let touched = cache.write_result(query_key.clone(), selections, &data);
                    (touched, cache.read_result(&query_key))
                };
                self.broadcast(Some(query_key.as_str()), &touched);
                Ok(result.unwrap_or(Value::Null))
            }
            Err(err) => {
                self.fail_watchers(&query_key, &err);
                Err(err)
            }
        }
    }

    ///
    /// Subscribes to the cached result of `request`
    ///
    /// The receiver starts in the loading state unless the cache already holds
    /// an answer; it is updated by [`Client::query`] and by cache patches
    /// touching any entity the result links to.
    ///
    pub fn watch_query(&self, request: &QueryRequest) -> watch::Receiver<QueryState> {
        let query_key = request.cache_key();
        let cached = self.cache.lock().read_result(&query_key);
        let initial = cached.map_or_else(QueryState::loading, QueryState::ready);
        let (sender, receiver) = watch::channel(initial);
        self.watchers.lock().push(Watcher { query_key, sender });
        receiver
    }

    /// Sends a mutation and merges every entity it returns into the cache
    pub async fn mutate(&self, request: &QueryRequest) -> Result<Value, ClientError> {
        let selections = request.selections()?;
        let data = self.fetch(request).await?;
        let touched = self.cache.lock().write_entities(&selections, &data);
        self.broadcast(None, &touched);
        Ok(data)
    }

    /// Cache patch on the entity stored under `key`, e.g. `Movie:12`
    pub fn write_fragment<I>(&self, key: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let changed = self.cache.lock().write_fragment(key, fields);
        if changed {
            self.broadcast(None, &[key.to_owned()]);
        }
    }

    pub fn read_fragment(&self, key: &str) -> Option<Value> {
        self.cache.lock().read_fragment(key)
    }

    async fn fetch(&self, request: &QueryRequest) -> Result<Value, ClientError> {
        let reply = self.transport.send(&request.body()).await?;
        if !reply.errors.is_empty() {
            let messages: Vec<String> = reply.errors.into_iter().map(|err| err.message).collect();
            tracing::warn!(errors = ?messages, "operation failed");
            return Err(ClientError::GraphQL(messages));
        }
        reply
            .data
            .ok_or_else(|| ClientError::Decode("reply without data".into()))
    }

    fn broadcast(&self, query_key: Option<&str>, touched: &[String]) {
        let cache = self.cache.lock();
        self.watchers.lock().retain(|watcher| {
            let affected = query_key == Some(watcher.query_key.as_str())
                || touched
                    .iter()
                    .any(|entity| cache.references(&watcher.query_key, entity));
            if !affected {
                return !watcher.sender.is_closed();
            }
            match cache.read_result(&watcher.query_key) {
                Some(data) => watcher.sender.send(QueryState::ready(data)).is_ok(),
                None => true,
            }
        });
    }

    fn fail_watchers(&self, query_key: &str, error: &ClientError) {
        self.watchers.lock().retain(|watcher| {
            if watcher.query_key != query_key {
                return true;
            }
            watcher.sender.send(QueryState::failed(error.clone())).is_ok()
        });
    }
}
