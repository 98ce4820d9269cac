//! Persistence for user credentials and scores.
//!
//! Two hash collections back the service: `users` maps email to password and
//! `scores` maps email to an integer score. Signup and score updates go through
//! single atomic store operations so concurrent requests cannot bypass the
//! duplicate check or drop an increment.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const USERS_KEY: &str = "users";
pub const SCORES_KEY: &str = "scores";

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Stores `password` under `email` unless the email is already registered.
    /// Returns `false` when the user existed and nothing was written.
    async fn create_user(&self, email: &str, password: &str) -> Result<bool>;

    async fn password(&self, email: &str) -> Result<Option<String>>;

    async fn user_exists(&self, email: &str) -> Result<bool>;

    /// All registered `(email, password)` pairs, ordered by email.
    async fn users(&self) -> Result<Vec<(String, String)>>;

    /// Every recorded score. Entries that do not hold an integer are logged and
    /// left out rather than failing the whole read.
    async fn scores(&self) -> Result<HashMap<String, i64>>;

    /// Current score for `email`, `0` when none was ever recorded.
    async fn score(&self, email: &str) -> Result<i64>;

    /// Overwrites the score. Not safe to combine with [`UserStore::score`] as a
    /// read-modify-write; use [`UserStore::increment_score`] for that.
    async fn set_score(&self, email: &str, score: i64) -> Result<()>;

    /// Atomically adds `delta` and returns the new total.
    async fn increment_score(&self, email: &str, delta: i64) -> Result<i64>;
}

/// Redis-backed store. The connection manager reconnects on its own and is
/// cheap to clone, so every call works on its own handle.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = redis::Client::open(uri).context("parsing Redis URI")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("connecting to Redis")?;
        info!("connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl UserStore for RedisStore {
    async fn create_user(&self, email: &str, password: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.hset_nx(USERS_KEY, email, password)
            .await
            .context("storing user")
    }

    async fn password(&self, email: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.hget(USERS_KEY, email)
            .await
            .context("retrieving user")
    }

    async fn user_exists(&self, email: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.hexists(USERS_KEY, email)
            .await
            .context("checking user existence")
    }

    async fn users(&self) -> Result<Vec<(String, String)>> {
        let mut conn = self.conn.clone();
        let users: HashMap<String, String> = conn
            .hgetall(USERS_KEY)
            .await
            .context("retrieving users")?;
        Ok(sorted(users))
    }

    async fn scores(&self) -> Result<HashMap<String, i64>> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn
            .hgetall(SCORES_KEY)
            .await
            .context("retrieving scores")?;
        Ok(parse_scores(raw))
    }

    async fn score(&self, email: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let score: Option<i64> = conn
            .hget(SCORES_KEY, email)
            .await
            .context("retrieving user score")?;
        Ok(score.unwrap_or_default())
    }

    async fn set_score(&self, email: &str, score: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(SCORES_KEY, email, score)
            .await
            .context("writing user score")?;
        Ok(())
    }

    async fn increment_score(&self, email: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.hincr(SCORES_KEY, email, delta)
            .await
            .context("updating user score")
    }
}

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<String, String>,
    scores: HashMap<String, i64>,
}

/// In-process store for tests and local runs without Redis.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, email: &str, password: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(email) {
            return Ok(false);
        }
        inner.users.insert(email.to_string(), password.to_string());
        Ok(true)
    }

    async fn password(&self, email: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.users.get(email).cloned())
    }

    async fn user_exists(&self, email: &str) -> Result<bool> {
        Ok(self.inner.read().await.users.contains_key(email))
    }

    async fn users(&self) -> Result<Vec<(String, String)>> {
        Ok(sorted(self.inner.read().await.users.clone()))
    }

    async fn scores(&self) -> Result<HashMap<String, i64>> {
        Ok(self.inner.read().await.scores.clone())
    }

    async fn score(&self, email: &str) -> Result<i64> {
        Ok(self
            .inner
            .read()
            .await
            .scores
            .get(email)
            .copied()
            .unwrap_or_default())
    }

    async fn set_score(&self, email: &str, score: i64) -> Result<()> {
        self.inner
            .write()
            .await
            .scores
            .insert(email.to_string(), score);
        Ok(())
    }

    async fn increment_score(&self, email: &str, delta: i64) -> Result<i64> {
        let mut inner = self.inner.write().await;
        let entry = inner.scores.entry(email.to_string()).or_default();
        *entry = entry
            .checked_add(delta)
            .context("score increment would overflow")?;
        Ok(*entry)
    }
}

fn parse_scores(raw: HashMap<String, String>) -> HashMap<String, i64> {
    raw.into_iter()
        .filter_map(|(email, value)| match value.trim().parse::<i64>() {
            Ok(score) => Some((email, score)),
            Err(err) => {
                warn!(%email, %value, error = %err, "skipping non-integer score");
                None
            }
        })
        .collect()
}

fn sorted(users: HashMap<String, String>) -> Vec<(String, String)> {
    let mut users: Vec<(String, String)> = users.into_iter().collect();
    users.sort_by(|a, b| a.0.cmp(&b.0));
    users
}
