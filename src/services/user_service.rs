use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::app_state::ProfileSource;
use crate::config::CacheConfig;
use crate::error::{AppError, AppResult};
use crate::external::DspiceApi;
use crate::external::records::ProfileRecord;
use crate::models::*;
use crate::storage::{TtlCache, keys};
use crate::utils::{validate_password, validate_phone};

#[derive(Clone)]
pub struct UserService {
    api: DspiceApi,
    cache: TtlCache,
    account_ttl: Duration,
}

/// 接口有时把资料包在 `user` 里
fn unwrap_user(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
            map.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub(crate) fn profile_from_value(value: &Value) -> AppResult<UserProfile> {
    let record: ProfileRecord = serde_json::from_value(value.clone())
        .map_err(|e| AppError::ExternalApiError(format!("Unexpected profile shape: {e}")))?;
    Ok(record.into())
}

impl UserService {
    pub fn new(api: DspiceApi, cache: TtlCache, config: &CacheConfig) -> Self {
        Self {
            api,
            cache,
            account_ttl: Duration::from_secs(config.account_ttl_secs),
        }
    }

    /// 获取最新资料并合并进本地 userData
    pub async fn get_profile(&self) -> AppResult<UserProfile> {
        let fresh = unwrap_user(self.api.get_profile().await?);
        let merged = self.api.session().merge_profile(&fresh).await?;
        profile_from_value(&merged)
    }

    pub async fn update_profile(&self, request: UpdateProfileRequest) -> AppResult<UserProfile> {
        if request.name.is_none() && request.phone.is_none() {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }

        let mut request = request;
        if let Some(name) = &request.name {
            let name = name.trim();
            if name.len() < 2 || name.len() > 60 {
                return Err(AppError::ValidationError(
                    "Name must be between 2 and 60 characters".to_string(),
                ));
            }
            request.name = Some(name.to_string());
        }
        if let Some(phone) = &request.phone {
            request.phone = Some(validate_phone(phone)?);
        }

        let updated = unwrap_user(self.api.edit_profile(&request).await?);
        // 有的版本只返回 message，此时再拉一次资料
        if updated.is_object() && updated.get("email").is_some() {
            let merged = self.api.session().merge_profile(&updated).await?;
            return profile_from_value(&merged);
        }
        self.get_profile().await
    }

    pub async fn change_password(&self, request: &ChangePasswordRequest) -> AppResult<()> {
        if request.current_password.is_empty() {
            return Err(AppError::ValidationError(
                "Current password is required".to_string(),
            ));
        }
        if request.new_password != request.confirm_password {
            return Err(AppError::ValidationError(
                "New password and confirmation do not match".to_string(),
            ));
        }
        if request.new_password == request.current_password {
            return Err(AppError::ValidationError(
                "New password must be different from the current one".to_string(),
            ));
        }
        validate_password(&request.new_password)?;

        self.api.change_password(request).await
    }

    pub async fn wallet(&self) -> AppResult<Wallet> {
        self.api.wallet().await
    }

    pub async fn virtual_accounts(&self) -> AppResult<Vec<VirtualAccount>> {
        if let Some(cached) = self.cache.get(keys::VIRTUAL_ACCOUNTS).await.fresh() {
            return Ok(cached);
        }
        let accounts = self.api.virtual_accounts().await?;
        self.cache
            .set(keys::VIRTUAL_ACCOUNTS, &accounts, self.account_ttl)
            .await?;
        Ok(accounts)
    }

    pub async fn crypto_wallets(&self) -> AppResult<Vec<CryptoWallet>> {
        if let Some(cached) = self.cache.get(keys::CRYPTO_WALLET).await.fresh() {
            return Ok(cached);
        }
        let wallets = self.api.crypto_wallets().await?;
        self.cache
            .set(keys::CRYPTO_WALLET, &wallets, self.account_ttl)
            .await?;
        Ok(wallets)
    }

    pub async fn transactions(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<WalletTransaction>> {
        let (items, total) = self.api.transactions(params).await?;
        let total = total.unwrap_or_else(|| params.get_offset() as i64 + items.len() as i64);
        Ok(PaginatedResponse::new(items, params, total))
    }

    /// 余额变动后清掉与钱包相关的缓存
    pub async fn invalidate_wallet_caches(&self) -> AppResult<()> {
        self.cache.invalidate(keys::VIRTUAL_ACCOUNTS).await?;
        self.cache.invalidate(keys::CRYPTO_WALLET).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileSource for UserService {
    async fn load_profile(&self) -> AppResult<UserProfile> {
        self.get_profile().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::{LocalStore, SessionStore};
    use crate::utils::SystemClock;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn service(server: &MockServer) -> UserService {
        let store = LocalStore::in_memory();
        let config = ApiConfig {
            base_url: server.url("/api"),
            legacy_base_url: server.url("/legacy"),
            timeout_secs: 5,
        };
        let api = DspiceApi::new(&config, SessionStore::new(store.clone())).unwrap();
        let cache = TtlCache::new(store, Arc::new(SystemClock));
        UserService::new(api, cache, &CacheConfig::default())
    }

    #[tokio::test]
    async fn test_profile_merge_keeps_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user/get");
                then.status(200).json_body(json!({
                    "status": true,
                    "data": {"user": {
                        "id": 7, "name": "Ada", "email": "ada@example.com", "balance": "1,500.50",
                        "stage": {"name": "gold", "discount": 10, "min_order": 3}
                    }}
                }));
            })
            .await;

        let svc = service(&server);
        svc.api.session().save_login("tok", json!({"id": 7})).await.unwrap();

        let profile = svc.get_profile().await.unwrap();
        assert_eq!(profile.balance, 1500.5);
        assert_eq!(profile.stage.min_order_quantity, 3);

        let stored = svc.api.session().user_data().await.unwrap();
        assert_eq!(stored["token"]["token"], "tok");
        assert_eq!(stored["name"], "Ada");
    }

    #[tokio::test]
    async fn test_virtual_accounts_are_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user/accounts");
                then.status(200).json_body(json!({"data": [
                    {"bank_name": "Wema Bank", "account_number": "0123456789", "account_name": "DSPICE/ADA"}
                ]}));
            })
            .await;

        let svc = service(&server);
        let first = svc.virtual_accounts().await.unwrap();
        let second = svc.virtual_accounts().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.hits_async().await, 1);

        svc.invalidate_wallet_caches().await.unwrap();
        svc.virtual_accounts().await.unwrap();
        assert_eq!(mock.hits_async().await, 2);
    }

    #[tokio::test]
    async fn test_change_password_rules() {
        let server = MockServer::start_async().await;
        let svc = service(&server);

        let mismatch = ChangePasswordRequest {
            current_password: "oldpass123".into(),
            new_password: "newpass123".into(),
            confirm_password: "newpass124".into(),
        };
        assert!(matches!(
            svc.change_password(&mismatch).await,
            Err(AppError::ValidationError(_))
        ));

        let same = ChangePasswordRequest {
            current_password: "oldpass123".into(),
            new_password: "oldpass123".into(),
            confirm_password: "oldpass123".into(),
        };
        assert!(svc.change_password(&same).await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile_requires_a_field() {
        let server = MockServer::start_async().await;
        let svc = service(&server);
        let err = svc
            .update_profile(UpdateProfileRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
