use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::time::Duration;

use super::records::*;
use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::storage::SessionStore;

/// Client for the DSpice REST API.
///
/// Every call attaches the stored bearer token and unwraps the `{ code|status, message, data }`
/// envelope. A 401 wipes the local session before the error is returned.
#[derive(Clone)]
pub struct DspiceApi {
    client: Client,
    base_url: String,
    legacy_base_url: String,
    session: SessionStore,
}

#[derive(Debug, Clone, Copy)]
enum Host {
    Primary,
    Legacy,
}

impl DspiceApi {
    pub fn new(config: &ApiConfig, session: SessionStore) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("dspice-client/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            legacy_base_url: config.legacy_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, host: Host, path: &str) -> String {
        let base = match host {
            Host::Primary => &self.base_url,
            Host::Legacy => &self.legacy_base_url,
        };
        format!("{base}{path}")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.send(self.client.get(self.url(Host::Primary, path))).await
    }

    async fn get_query<T, Q>(&self, path: &str, query: &Q) -> AppResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.client.get(self.url(Host::Primary, path)).query(query))
            .await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> AppResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.client.post(self.url(Host::Primary, path)).json(body))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let builder = match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let request = builder.build()?;
        log::debug!("{} {}", request.method(), request.url().path());

        let response = self.client.execute(request).await?;
        let status = response.status();
        let raw = response.text().await?;
        let body: Value = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw).unwrap_or(Value::String(raw))
        };

        match decode_envelope(status, body) {
            Err(AppError::AuthError(msg)) => {
                log::warn!("Session rejected by API ({status}), logging out");
                if let Err(e) = self.session.clear().await {
                    log::error!("Failed to clear session after 401: {e}");
                }
                Err(AppError::AuthError(msg))
            }
            other => other,
        }
    }

    // ---- auth ----

    pub async fn login(&self, request: &LoginRequest) -> AppResult<LoginData> {
        self.post("/auth/login", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> AppResult<LoginData> {
        self.post("/auth/register", request).await
    }

    // ---- user / wallet ----

    /// Raw profile JSON; callers merge it into the stored `userData`.
    pub async fn get_profile(&self) -> AppResult<Value> {
        self.get("/user/get").await
    }

    pub async fn edit_profile(&self, request: &UpdateProfileRequest) -> AppResult<Value> {
        self.post("/user/edit", request).await
    }

    pub async fn change_password(&self, request: &ChangePasswordRequest) -> AppResult<()> {
        let _: Value = self
            .post(
                "/user/change-password",
                &json!({
                    "current_password": request.current_password,
                    "new_password": request.new_password,
                    "new_password_confirmation": request.confirm_password,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn wallet(&self) -> AppResult<Wallet> {
        let record: WalletRecord = self.get("/user/wallet").await?;
        Ok(record.into())
    }

    pub async fn virtual_accounts(&self) -> AppResult<Vec<VirtualAccount>> {
        let data: ListData<VirtualAccountRecord> = self.get("/user/accounts").await?;
        Ok(data.into_vec().into_iter().map(Into::into).collect())
    }

    /// 加密钱包接口仍在旧主机上
    pub async fn crypto_wallets(&self) -> AppResult<Vec<CryptoWallet>> {
        let builder = self
            .client
            .get(self.url(Host::Legacy, "/user/crypto-wallet"));
        let data: ListData<CryptoWalletRecord> = self.send(builder).await?;
        Ok(data.into_vec().into_iter().map(Into::into).collect())
    }

    pub async fn transactions(
        &self,
        params: &PaginationParams,
    ) -> AppResult<(Vec<WalletTransaction>, Option<i64>)> {
        let data: ListData<TransactionRecord> = self
            .get_query(
                "/user/transactions",
                &[
                    ("page", params.get_page()),
                    ("per_page", params.get_per_page()),
                ],
            )
            .await?;
        let (items, total) = data.into_parts();
        Ok((items.into_iter().map(Into::into).collect(), total))
    }

    // ---- catalog ----

    pub async fn types(&self, kind: RentalKind) -> AppResult<Vec<NumberType>> {
        let path = format!("/{}/types", kind.as_path());
        let data: ListData<NamedRecord> = self.get(&path).await?;
        Ok(data.into_vec().into_iter().map(Into::into).collect())
    }

    pub async fn countries(&self, number_type: Option<&str>) -> AppResult<Vec<Country>> {
        let mut query = Vec::new();
        if let Some(t) = number_type {
            query.push(("type", t));
        }
        let data: ListData<NamedRecord> = self.get_query("/number/countries", &query).await?;
        Ok(data.into_vec().into_iter().map(Into::into).collect())
    }

    pub async fn services(
        &self,
        kind: RentalKind,
        query: &ServiceQuery,
    ) -> AppResult<Vec<ServiceOffer>> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(c) = query.country_id.as_deref() {
            params.push(("countryID", c));
        }
        if let Some(n) = query.network.as_deref() {
            params.push(("network", n));
        }
        if let Some(t) = query.number_type.as_deref() {
            params.push(("type", t));
        }
        let path = format!("/{}/services", kind.as_path());
        let data: ListData<ServiceRecord> = self.get_query(&path, &params).await?;
        Ok(data.into_vec().into_iter().map(Into::into).collect())
    }

    // ---- rentals ----

    pub async fn rental_history(&self, kind: RentalKind) -> AppResult<Vec<Rental>> {
        let path = format!("/{}/history", kind.as_path());
        let data: ListData<RentalRecord> = self.get(&path).await?;
        Ok(data
            .into_vec()
            .into_iter()
            .map(|r| r.into_rental(kind))
            .collect())
    }

    pub async fn book(&self, kind: RentalKind, request: &BookRentalRequest) -> AppResult<Rental> {
        let path = format!("/{}/book", kind.as_path());
        let record: RentalRecord = self.post(&path, request).await?;
        Ok(record.into_rental(kind))
    }

    pub async fn fetch_codes(
        &self,
        kind: RentalKind,
        id: &str,
    ) -> AppResult<Vec<VerificationMessage>> {
        let path = format!("/{}/code/{id}", kind.as_path());
        let data: CodeData = self.get(&path).await?;
        Ok(data.into_messages())
    }

    pub async fn close_rental(&self, kind: RentalKind, id: &str) -> AppResult<()> {
        let path = format!("/{}/close/{id}", kind.as_path());
        let _: Value = self.post(&path, &json!({})).await?;
        Ok(())
    }

    /// Returns the refreshed rental when the API sends one back.
    pub async fn reactivate_rental(&self, kind: RentalKind, id: &str) -> AppResult<Option<Rental>> {
        let path = format!("/{}/reactivate/{id}", kind.as_path());
        let data: Value = self.post(&path, &json!({})).await?;
        Ok(serde_json::from_value::<RentalRecord>(data)
            .ok()
            .map(|r| r.into_rental(kind)))
    }

    // ---- marketplace ----

    pub async fn accounts(&self, query: &ShopQuery) -> AppResult<(Vec<AccountListing>, Option<i64>)> {
        let params = PaginationParams::new(query.page, query.per_page);
        let page = params.get_page().to_string();
        let per_page = params.get_per_page().to_string();
        let mut q: Vec<(&str, &str)> =
            vec![("page", page.as_str()), ("per_page", per_page.as_str())];
        if let Some(c) = query.category.as_deref() {
            q.push(("category", c));
        }
        if let Some(p) = query.platform.as_deref() {
            q.push(("platform", p));
        }
        if let Some(s) = query.search.as_deref() {
            q.push(("search", s));
        }
        let data: ListData<ListingRecord> = self.get_query("/account/list", &q).await?;
        let (items, total) = data.into_parts();
        Ok((items.into_iter().map(Into::into).collect(), total))
    }

    pub async fn account(&self, id: &str) -> AppResult<AccountListing> {
        let record: ListingRecord = self.get(&format!("/account/{id}")).await?;
        Ok(record.into())
    }

    pub async fn purchase(&self, request: &PurchaseRequest) -> AppResult<Order> {
        let record: OrderRecord = self.post("/account/purchase", request).await?;
        Ok(record.into())
    }

    pub async fn orders(&self, params: &PaginationParams) -> AppResult<(Vec<Order>, Option<i64>)> {
        let data: ListData<OrderRecord> = self
            .get_query(
                "/account/orders",
                &[
                    ("page", params.get_page()),
                    ("per_page", params.get_per_page()),
                ],
            )
            .await?;
        let (items, total) = data.into_parts();
        Ok((items.into_iter().map(Into::into).collect(), total))
    }

    pub async fn order_detail(&self, id: &str) -> AppResult<OrderDetail> {
        let record: OrderRecord = self.get(&format!("/account/orders/{id}")).await?;
        Ok(record.into_detail())
    }

    // ---- referral ----

    pub async fn referral_stats(&self) -> AppResult<ReferralStats> {
        let record: ReferralStatsRecord = self.get("/referral/stats").await?;
        Ok(record.into())
    }

    pub async fn referrals(
        &self,
        params: &PaginationParams,
    ) -> AppResult<(Vec<Referral>, Option<i64>)> {
        let data: ListData<ReferralRecord> = self
            .get_query(
                "/referral/list",
                &[
                    ("page", params.get_page()),
                    ("per_page", params.get_per_page()),
                ],
            )
            .await?;
        let (items, total) = data.into_parts();
        Ok((items.into_iter().map(Into::into).collect(), total))
    }

    pub async fn referral_settings(&self) -> AppResult<ReferralSettings> {
        let record: ReferralSettingsRecord = self.get("/referral/settings").await?;
        Ok(record.into())
    }

    pub async fn update_referral_settings(
        &self,
        settings: &ReferralSettings,
    ) -> AppResult<ReferralSettings> {
        let record: ReferralSettingsRecord = self.post("/referral/settings", settings).await?;
        Ok(record.into())
    }

    pub async fn transfer_referral_balance(&self, amount: f64) -> AppResult<TransferResponse> {
        let data: Value = self
            .post("/referral/transfer", &json!({ "amount": amount }))
            .await?;
        let record: TransferRecord =
            serde_json::from_value(data).unwrap_or_default();
        Ok(record.into_response(amount))
    }

    // ---- deposit ----

    pub async fn initiate_deposit(&self, amount: f64) -> AppResult<InitiateDepositResponse> {
        let record: DepositInitRecord = self
            .post("/deposit/initiate", &json!({ "amount": amount }))
            .await?;
        let redirect_url = record.redirect().ok_or_else(|| {
            AppError::ExternalApiError("Payment gateway did not return a redirect URL".to_string())
        })?;
        Ok(InitiateDepositResponse {
            redirect_url: redirect_url.to_string(),
            tx_ref: record.tx_ref().to_string(),
        })
    }

    pub async fn validate_deposit(
        &self,
        request: &ValidateDepositRequest,
    ) -> AppResult<ValidateDepositResponse> {
        let data: Value = self
            .get_query(
                "/deposit/validate",
                &[
                    ("tx_ref", request.tx_ref.as_str()),
                    ("transaction_id", request.transaction_id.as_str()),
                ],
            )
            .await?;
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        let record: DepositValidateRecord =
            serde_json::from_value(data).unwrap_or_default();
        Ok(record.into_response(message))
    }
}

fn envelope_message(body: &Value) -> Option<String> {
    let msg = body
        .get("message")
        .or_else(|| body.get("error"))
        .or_else(|| body.get("msg"))?;
    match msg {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn envelope_code(body: &Value) -> Option<i64> {
    match body.get("code")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn envelope_failed(body: &Value) -> bool {
    let status_failed = match body.get("status") {
        Some(Value::Bool(ok)) => !ok,
        Some(Value::String(s)) => matches!(
            s.to_ascii_lowercase().as_str(),
            "error" | "failed" | "fail" | "false"
        ),
        Some(Value::Number(n)) => n.as_i64().is_some_and(|c| !(200..300).contains(&c)),
        _ => false,
    };
    let success_false = matches!(body.get("success"), Some(Value::Bool(false)));
    let code_failed = envelope_code(body).is_some_and(|c| !(200..300).contains(&c) && c != 0);
    status_failed || success_false || code_failed
}

/// Unwrap a DSpice response into `T` or a normalized error.
pub(crate) fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: Value) -> AppResult<T> {
    let message = envelope_message(&body);

    if status == StatusCode::UNAUTHORIZED || envelope_code(&body) == Some(401) {
        return Err(AppError::AuthError(
            message.unwrap_or_else(|| "Session expired, please log in again".to_string()),
        ));
    }

    if status.is_server_error() {
        return Err(AppError::ExternalApiError(
            message.unwrap_or_else(|| format!("Server error ({})", status.as_u16())),
        ));
    }

    if !status.is_success() || (body.is_object() && envelope_failed(&body)) {
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(
                message.unwrap_or_else(|| "Not found".to_string()),
            ));
        }
        return Err(AppError::ValidationError(message.unwrap_or_else(|| {
            format!("Request failed ({})", status.as_u16())
        })));
    }

    let payload = match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    };

    serde_json::from_value(payload)
        .map_err(|e| AppError::ExternalApiError(format!("Unexpected response shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;
    use httpmock::prelude::*;

    async fn api_for(server: &MockServer) -> DspiceApi {
        let config = ApiConfig {
            base_url: server.url("/api"),
            legacy_base_url: server.url("/legacy"),
            timeout_secs: 5,
        };
        DspiceApi::new(&config, SessionStore::new(LocalStore::in_memory())).unwrap()
    }

    #[test]
    fn test_decode_envelope_variants() {
        let ok: Vec<u32> =
            decode_envelope(StatusCode::OK, json!({"status": true, "data": [1, 2]})).unwrap();
        assert_eq!(ok, vec![1, 2]);

        let bare: Vec<u32> = decode_envelope(StatusCode::OK, json!([3])).unwrap();
        assert_eq!(bare, vec![3]);

        let err = decode_envelope::<Value>(
            StatusCode::OK,
            json!({"code": 400, "message": "Insufficient balance"}),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == "Insufficient balance"));

        let err = decode_envelope::<Value>(
            StatusCode::BAD_GATEWAY,
            json!({"message": "upstream down"}),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ExternalApiError(_)));

        let err = decode_envelope::<Value>(StatusCode::OK, json!({"code": "401"})).unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
    }

    #[test]
    fn test_decode_missing_data_is_null() {
        let v: Option<u32> =
            decode_envelope(StatusCode::OK, json!({"status": "success", "message": "ok", "data": null}))
                .unwrap();
        assert_eq!(v, None);
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/user/wallet")
                    .header("authorization", "Bearer tok-123");
                then.status(200)
                    .json_body(json!({"status": true, "data": {"balance": "2500.75"}}));
            })
            .await;

        let api = api_for(&server).await;
        api.session().save_login("tok-123", json!({})).await.unwrap();

        let wallet = api.wallet().await.unwrap();
        assert_eq!(wallet.balance, 2500.75);
        assert_eq!(wallet.currency, "NGN");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user/get");
                then.status(401).json_body(json!({"message": "Unauthenticated."}));
            })
            .await;

        let api = api_for(&server).await;
        api.session().save_login("stale", json!({"id": 1})).await.unwrap();

        let err = api.get_profile().await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
        assert!(!api.session().is_authenticated().await);
        assert!(api.session().user_data().await.is_none());
    }

    #[tokio::test]
    async fn test_service_filters_forwarded() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/number/services")
                    .query_param("countryID", "234")
                    .query_param("network", "mtn")
                    .query_param("type", "sms");
                then.status(200).json_body(json!({
                    "status": "success",
                    "data": [{"id": 5, "name": "WhatsApp", "price": "850"}]
                }));
            })
            .await;

        let api = api_for(&server).await;
        let services = api
            .services(
                RentalKind::Number,
                &ServiceQuery {
                    country_id: Some("234".into()),
                    network: Some("mtn".into()),
                    number_type: Some("sms".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(services.len(), 1);
        assert_eq!(services[0].price, 850.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_crypto_wallet_uses_legacy_host() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/legacy/user/crypto-wallet");
                then.status(200).json_body(json!({
                    "data": [{"currency": "USDT", "network": "TRC20", "address": "T9xyz"}]
                }));
            })
            .await;

        let api = api_for(&server).await;
        let wallets = api.crypto_wallets().await.unwrap();
        assert_eq!(wallets[0].address, "T9xyz");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_network_failure_is_reqwest_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            legacy_base_url: "http://127.0.0.1:9/api".to_string(),
            timeout_secs: 1,
        };
        let api = DspiceApi::new(&config, SessionStore::new(LocalStore::in_memory())).unwrap();
        let err = api.types(RentalKind::Number).await.unwrap_err();
        assert!(matches!(err, AppError::ReqwestError(_)));
    }
}
