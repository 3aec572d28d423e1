//! In-memory entity store
//!
//! Tweets and users live only in process memory. Collections sit behind the
//! [`Collection`] trait so every test can build an isolated [`EntityStore`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;
use crate::types::{Tweet, User};

/// Ordered collection of entities
pub trait Collection<T>: Send + Sync {
    /// Snapshot of every item in insertion order
    fn list(&self) -> Vec<T>;

    /// First item matching `predicate`
    fn find(&self, predicate: &dyn Fn(&T) -> bool) -> Option<T>;

    fn append(&self, item: T);

    /// Removes every item matching `predicate`, returning how many were removed
    fn remove_by(&self, predicate: &dyn Fn(&T) -> bool) -> usize;
}

/// [`Collection`] backed by a locked vector
pub struct MemoryCollection<T> {
    items: RwLock<Vec<T>>,
}

impl<T> MemoryCollection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }
}

impl<T> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> Collection<T> for MemoryCollection<T>
where
    T: Clone + Send + Sync,
{
    fn list(&self) -> Vec<T> {
        self.items.read().clone()
    }

    fn find(&self, predicate: &dyn Fn(&T) -> bool) -> Option<T> {
        self.items.read().iter().find(|item| predicate(item)).cloned()
    }

    fn append(&self, item: T) {
        self.items.write().push(item);
    }

    fn remove_by(&self, predicate: &dyn Fn(&T) -> bool) -> usize {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|item| !predicate(item));
        before - items.len()
    }
}

///
/// Monotonic source of tweet ids
///
/// Ids are never derived from collection size, so they stay unique after
/// deletions and under concurrent creation. `u64::MAX` is never handed out;
/// once the counter reaches it the sequence is exhausted.
///
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    pub fn starting_at(next: u64) -> Self {
        Self {
            next: AtomicU64::new(next),
        }
    }

    /// Sequence continuing after the highest numeric id in `ids`
    pub fn after<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Self {
        let highest = ids
            .into_iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self::starting_at(highest.saturating_add(1))
    }

    /// Next unused id, `None` once the sequence is exhausted
    pub fn next_id(&self) -> Option<String> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .ok()
            .map(|id| id.to_string())
    }
}

pub struct EntityStore {
    tweets: Arc<dyn Collection<Tweet>>,
    users: Arc<dyn Collection<User>>,
    tweet_ids: IdSequence,
}

impl EntityStore {
    pub fn new(tweets: Vec<Tweet>, users: Vec<User>) -> Self {
        let tweet_ids = IdSequence::after(tweets.iter().map(|tweet| tweet.id.as_str()));
        Self::with_collections(
            Arc::new(MemoryCollection::new(tweets)),
            Arc::new(MemoryCollection::new(users)),
            tweet_ids,
        )
    }

    pub fn with_collections(
        tweets: Arc<dyn Collection<Tweet>>,
        users: Arc<dyn Collection<User>>,
        tweet_ids: IdSequence,
    ) -> Self {
        Self {
            tweets,
            users,
            tweet_ids,
        }
    }

    /// Store holding the demo users and tweets
    pub fn seeded() -> Self {
        Self::new(
            vec![Tweet::new("1", "first", "2"), Tweet::new("2", "second", "1")],
            vec![User::new("1", "Eunnho", "Kim"), User::new("2", "Doing", "Lee")],
        )
    }

    pub fn tweets(&self) -> Vec<Tweet> {
        self.tweets.list()
    }

    pub fn tweet(&self, id: &str) -> Option<Tweet> {
        self.tweets.find(&|tweet| tweet.id == id)
    }

    pub fn users(&self) -> Vec<User> {
        self.users.list()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.find(&|user| user.id == id)
    }

    /// Appends a tweet by an existing user
    pub fn post_tweet(&self, text: String, user_id: String) -> Result<Tweet, Error> {
        if self.user(&user_id).is_none() {
            return Err(Error::UserNotFound(user_id));
        }
        let id = self.tweet_ids.next_id().ok_or(Error::IdsExhausted)?;
        let tweet = Tweet {
            id,
            text,
            user_id,
        };
        self.tweets.append(tweet.clone());
        tracing::info!(id = %tweet.id, user_id = %tweet.user_id, "tweet posted");
        Ok(tweet)
    }

    /// Removes the tweet with `id`; `false` when there was none
    pub fn delete_tweet(&self, id: &str) -> bool {
        let removed = self.tweets.remove_by(&|tweet| tweet.id == id);
        if removed > 0 {
            tracing::info!(id, "tweet deleted");
        }
        removed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntityStore {
        EntityStore::new(
            vec![Tweet::new("1", "first", "2"), Tweet::new("2", "second", "1")],
            vec![User::new("1", "A", "B"), User::new("2", "C", "D")],
        )
    }

    #[test]
    fn finds_first_match_or_nothing() {
        let store = store();
        assert_eq!(store.tweet("2").map(|t| t.text), Some("second".to_owned()));
        assert_eq!(store.tweet("9"), None);
        assert_eq!(store.user("1").map(|u| u.first_name), Some("A".to_owned()));
        assert_eq!(store.user(""), None);
    }

    #[test]
    fn post_tweet_requires_existing_user() {
        let store = store();
        match store.post_tweet("hi".into(), "7".into()) {
            Err(Error::UserNotFound(id)) => assert_eq!(id, "7"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(store.tweets().len(), 2);
    }

    #[test]
    fn post_tweet_appends_exactly_one() {
        let store = store();
        let tweet = store.post_tweet("hi".into(), "1".into()).unwrap();
        assert_eq!(tweet, Tweet::new("3", "hi", "1"));
        assert_eq!(store.tweets().len(), 3);
        assert_eq!(store.tweets().last(), Some(&tweet));
    }

    #[test]
    fn delete_tweet_is_idempotent() {
        let store = store();
        assert!(store.delete_tweet("1"));
        assert!(!store.delete_tweet("1"));
        assert_eq!(store.tweets(), vec![Tweet::new("2", "second", "1")]);
        assert!(!store.delete_tweet("missing"));
        assert_eq!(store.tweets().len(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_deletion() {
        let store = store();
        assert!(store.delete_tweet("1"));
        let tweet = store.post_tweet("again".into(), "2".into()).unwrap();
        assert_eq!(tweet.id, "3");
        assert!(store.delete_tweet("3"));
        let tweet = store.post_tweet("and again".into(), "2".into()).unwrap();
        assert_eq!(tweet.id, "4");
        let ids: Vec<_> = store.tweets().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["2", "4"]);
    }

    #[test]
    fn concurrent_posts_get_distinct_ids() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .post_tweet(format!("tweet {}", n), "1".into())
                        .unwrap()
                        .id
                })
            })
            .collect();
        let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.tweets().len(), 10);
    }

    #[test]
    fn sequence_skips_non_numeric_ids() {
        let ids = IdSequence::after(vec!["abc", "12", "3"]);
        assert_eq!(ids.next_id().as_deref(), Some("13"));
        assert_eq!(IdSequence::after(Vec::new()).next_id().as_deref(), Some("1"));
    }

    #[test]
    fn sequence_stops_at_the_top_of_the_range() {
        let ids = IdSequence::starting_at(u64::MAX - 1);
        assert_eq!(ids.next_id(), Some((u64::MAX - 1).to_string()));
        assert_eq!(ids.next_id(), None);
        assert_eq!(ids.next_id(), None);
    }

    #[test]
    fn highest_possible_seed_id_exhausts_the_store() {
        let store = EntityStore::new(
            vec![Tweet::new("18446744073709551615", "x", "1")],
            vec![User::new("1", "A", "B")],
        );
        match store.post_tweet("hi".into(), "1".into()) {
            Err(Error::IdsExhausted) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(store.tweets().len(), 1);
    }

    #[test]
    fn collection_remove_by_counts_removed() {
        let collection = MemoryCollection::new(vec![1, 2, 3, 2]);
        assert_eq!(collection.remove_by(&|n| *n == 2), 2);
        assert_eq!(collection.list(), vec![1, 3]);
        assert_eq!(collection.find(&|n| *n > 1), Some(3));
    }
}
