use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::store::LocalStore;
use crate::error::AppResult;
use crate::utils::Clock;

/// Well-known cache keys shared with the web client.
pub mod keys {
    pub const NUMBER_TYPES: &str = "numberTypes";
    pub const EMAIL_TYPES: &str = "emailTypes";
    pub const EMAIL_SERVICES: &str = "email_services";
    pub const SAVED_SERVICES: &str = "savedServices";
    pub const SAVED_EMAIL_SERVICES: &str = "savedEmailServices";
    pub const CRYPTO_WALLET: &str = "user_crypto_wallet";
    pub const VIRTUAL_ACCOUNTS: &str = "user_virtual_accounts";
    pub const COUNTRIES_PREFIX: &str = "countries_";
    pub const SERVICES_PREFIX: &str = "services_";

    pub fn countries(number_type: &str) -> String {
        format!("{COUNTRIES_PREFIX}{number_type}")
    }

    pub fn services(country_id: &str, network: &str, number_type: &str) -> String {
        format!("{SERVICES_PREFIX}{country_id}_{network}_{number_type}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Fresh(T),
    Expired,
    Missing,
}

impl<T> CacheLookup<T> {
    pub fn fresh(self) -> Option<T> {
        match self {
            CacheLookup::Fresh(v) => Some(v),
            _ => None,
        }
    }
}

/// Typed cache over [`LocalStore`]; each entry carries its own expiry in epoch milliseconds.
#[derive(Clone)]
pub struct TtlCache {
    store: LocalStore,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(store: LocalStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheLookup<T> {
        let Some(entry) = self.store.get(key).await else {
            return CacheLookup::Missing;
        };

        let expiry = entry.get("expiry").and_then(|v| v.as_i64());
        let now_ms = self.clock.now().timestamp_millis();

        match expiry {
            Some(expiry) if expiry > now_ms => {}
            _ => {
                // 过期或格式不对的条目直接清掉
                if let Err(e) = self.store.remove(key).await {
                    log::warn!("Failed to evict cache entry {key}: {e}");
                }
                return CacheLookup::Expired;
            }
        }

        match entry.get("value").cloned().map(serde_json::from_value::<T>) {
            Some(Ok(value)) => CacheLookup::Fresh(value),
            Some(Err(e)) => {
                log::warn!("Cache entry {key} has unexpected shape: {e}");
                let _ = self.store.remove(key).await;
                CacheLookup::Missing
            }
            None => CacheLookup::Missing,
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> AppResult<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expiry = self.clock.now().timestamp_millis().saturating_add(ttl_ms);
        self.store
            .set(
                key,
                json!({
                    "value": serde_json::to_value(value)?,
                    "expiry": expiry,
                }),
            )
            .await
    }

    pub async fn invalidate(&self, key: &str) -> AppResult<()> {
        self.store.remove(key).await
    }

    pub async fn invalidate_prefixed(&self, prefix: &str) -> AppResult<usize> {
        self.store.remove_prefixed(prefix).await
    }
}
