use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::{AppStateResponse, UserProfile};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    /// 加载失败时仍提供一个默认值，页面不至于空白
    Error { message: String, fallback: T },
}

impl<T> LoadState<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            LoadState::Loading => None,
            LoadState::Ready(v) => Some(v),
            LoadState::Error { fallback, .. } => Some(fallback),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Loading => "loading",
            LoadState::Ready(_) => "ready",
            LoadState::Error { .. } => "error",
        }
    }
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn load_profile(&self) -> AppResult<UserProfile>;
}

/// Shared, app-wide view of the logged-in user.
#[derive(Clone)]
pub struct AppState {
    state: Arc<RwLock<LoadState<UserProfile>>>,
    source: Arc<dyn ProfileSource>,
}

impl AppState {
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self {
            state: Arc::new(RwLock::new(LoadState::Loading)),
            source,
        }
    }

    pub async fn current(&self) -> LoadState<UserProfile> {
        self.state.read().await.clone()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.state.read().await.value().cloned()
    }

    pub async fn init(&self) -> LoadState<UserProfile> {
        self.refresh().await
    }

    /// Fetch the profile again. A failure keeps the app usable with a default profile.
    pub async fn refresh(&self) -> LoadState<UserProfile> {
        let next = match self.source.load_profile().await {
            Ok(profile) => LoadState::Ready(profile),
            Err(e) => {
                log::warn!("Failed to load user profile: {e}");
                LoadState::Error {
                    message: e.user_message(),
                    fallback: UserProfile::default(),
                }
            }
        };
        *self.state.write().await = next.clone();
        next
    }

    pub async fn set_profile(&self, profile: UserProfile) {
        *self.state.write().await = LoadState::Ready(profile);
    }

    pub async fn reset(&self) {
        *self.state.write().await = LoadState::Loading;
    }

    pub async fn to_response(&self) -> AppStateResponse {
        let state = self.state.read().await;
        AppStateResponse {
            status: state.label().to_string(),
            profile: state.value().cloned(),
            error: match &*state {
                LoadState::Error { message, .. } => Some(message.clone()),
                _ => None,
            },
        }
    }
}
