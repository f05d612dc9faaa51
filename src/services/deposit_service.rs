use super::app_state::AppState;
use super::user_service::UserService;
use crate::error::{AppError, AppResult};
use crate::external::DspiceApi;
use crate::models::*;

/// 最低充值金额（NGN）
pub const MIN_DEPOSIT: f64 = 100.0;

#[derive(Clone)]
pub struct DepositService {
    api: DspiceApi,
    user_service: UserService,
    app_state: AppState,
}

impl DepositService {
    pub fn new(api: DspiceApi, user_service: UserService, app_state: AppState) -> Self {
        Self {
            api,
            user_service,
            app_state,
        }
    }

    /// Start a gateway payment; the caller sends the user to `redirect_url`.
    pub async fn initiate(&self, amount: f64) -> AppResult<InitiateDepositResponse> {
        if !amount.is_finite() || amount < MIN_DEPOSIT {
            return Err(AppError::ValidationError(format!(
                "Minimum deposit is {MIN_DEPOSIT}"
            )));
        }
        let response = self.api.initiate_deposit(amount).await?;
        log::info!("Deposit initiated: {} ({amount})", response.tx_ref);
        Ok(response)
    }

    /// Confirm a gateway payment after the redirect back.
    pub async fn validate(
        &self,
        request: ValidateDepositRequest,
    ) -> AppResult<ValidateDepositResponse> {
        if request.tx_ref.trim().is_empty() || request.transaction_id.trim().is_empty() {
            return Err(AppError::ValidationError(
                "tx_ref and transaction_id are required".to_string(),
            ));
        }
        let response = self.api.validate_deposit(&request).await?;
        if response.success {
            self.user_service.invalidate_wallet_caches().await?;
            self.app_state.refresh().await;
            log::info!("Deposit {} confirmed", request.tx_ref);
        } else {
            log::warn!("Deposit {} not confirmed", request.tx_ref);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, CacheConfig};
    use crate::storage::{LocalStore, SessionStore, TtlCache};
    use crate::utils::SystemClock;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn service(server: &MockServer) -> DepositService {
        let store = LocalStore::in_memory();
        let config = ApiConfig {
            base_url: server.url("/api"),
            legacy_base_url: server.url("/legacy"),
            timeout_secs: 5,
        };
        let api = DspiceApi::new(&config, SessionStore::new(store.clone())).unwrap();
        let cache = TtlCache::new(store, Arc::new(SystemClock));
        let user_service = UserService::new(api.clone(), cache, &CacheConfig::default());
        let app_state = AppState::new(Arc::new(user_service.clone()));
        DepositService::new(api, user_service, app_state)
    }

    #[tokio::test]
    async fn test_initiate_enforces_minimum() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/deposit/initiate");
                then.status(200).json_body(json!({
                    "status": true,
                    "data": {"link": "https://pay.example/checkout/abc", "tx_ref": "tx-1"}
                }));
            })
            .await;

        let svc = service(&server);
        let err = svc.initiate(50.0).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(mock.hits_async().await, 0);

        let response = svc.initiate(1000.0).await.unwrap();
        assert_eq!(response.redirect_url, "https://pay.example/checkout/abc");
        assert_eq!(response.tx_ref, "tx-1");
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_successful_validation_refreshes_profile() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/deposit/validate")
                    .query_param("tx_ref", "tx-1")
                    .query_param("transaction_id", "99");
                then.status(200).json_body(json!({
                    "status": true,
                    "data": {"status": "successful", "amount": "1000"}
                }));
            })
            .await;
        let profile = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user/get");
                then.status(200).json_body(json!({
                    "status": true,
                    "data": {"id": 7, "name": "Ada", "email": "ada@example.com", "balance": 1000}
                }));
            })
            .await;

        let svc = service(&server);
        let err = svc
            .validate(ValidateDepositRequest {
                tx_ref: " ".to_string(),
                transaction_id: "99".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let response = svc
            .validate(ValidateDepositRequest {
                tx_ref: "tx-1".to_string(),
                transaction_id: "99".to_string(),
            })
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.amount, Some(1000.0));
        assert_eq!(profile.hits_async().await, 1);
        assert_eq!(
            svc.app_state.profile().await.map(|p| p.balance),
            Some(1000.0)
        );
    }
}
