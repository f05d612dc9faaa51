use serde_json::{Value, json};
use tokio::sync::broadcast;

use super::store::LocalStore;
use crate::error::AppResult;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_DATA_KEY: &str = "userData";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    /// Explicit logout or a 401 from the API.
    LoggedOut,
}

/// Login session persisted alongside the cache.
///
/// `userData` mirrors the profile last seen from the API plus a `token` sub-object that profile
/// refreshes never overwrite.
#[derive(Clone)]
pub struct SessionStore {
    store: LocalStore,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(store: LocalStore) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { store, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn token(&self) -> Option<String> {
        self.store
            .get(AUTH_TOKEN_KEY)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|t| !t.is_empty())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    pub async fn user_data(&self) -> Option<Value> {
        self.store.get(USER_DATA_KEY).await
    }

    pub async fn save_login(&self, token: &str, user: Value) -> AppResult<()> {
        let mut user_data = match user {
            Value::Object(map) => Value::Object(map),
            _ => json!({}),
        };
        user_data["token"] = json!({ "token": token });

        self.store.set(AUTH_TOKEN_KEY, json!(token)).await?;
        self.store.set(USER_DATA_KEY, user_data).await?;
        let _ = self.events.send(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Overlay a fresh profile onto `userData`, keeping the stored `token` sub-object.
    pub async fn merge_profile(&self, profile: &Value) -> AppResult<Value> {
        let mut merged = match self.user_data().await {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        let token = merged.remove("token");

        if let Value::Object(fresh) = profile {
            for (k, v) in fresh {
                if k != "token" {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        if let Some(token) = token {
            merged.insert("token".to_string(), token);
        }

        let merged = Value::Object(merged);
        self.store.set(USER_DATA_KEY, merged.clone()).await?;
        Ok(merged)
    }

    /// 登出：清空整个本地存储（包括缓存）
    pub async fn clear(&self) -> AppResult<()> {
        let result = self.store.clear().await;
        // 没有订阅者时 send 会失败，忽略即可
        let _ = self.events.send(SessionEvent::LoggedOut);
        result
    }
}
