use serde_json::Value;

use super::app_state::{AppState, LoadState};
use super::user_service::profile_from_value;
use crate::error::{AppError, AppResult};
use crate::external::DspiceApi;
use crate::models::*;
use crate::utils::{validate_email, validate_password, validate_phone};
use crate::watch::WatchRegistry;

#[derive(Clone)]
pub struct AuthService {
    api: DspiceApi,
    app_state: AppState,
    registry: WatchRegistry,
}

impl AuthService {
    pub fn new(api: DspiceApi, app_state: AppState, registry: WatchRegistry) -> Self {
        Self {
            api,
            app_state,
            registry,
        }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        validate_email(&request.email)?;
        if request.password.is_empty() {
            return Err(AppError::ValidationError("Password is required".to_string()));
        }

        let request = LoginRequest {
            email: request.email.trim().to_lowercase(),
            password: request.password,
        };
        let data = self.api.login(&request).await?;
        let token = data.token().to_string();
        self.start_session(&token, data.user).await
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let name = request.name.trim();
        if name.len() < 2 {
            return Err(AppError::ValidationError(
                "Name must be at least 2 characters".to_string(),
            ));
        }
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        let phone = request.phone.as_deref().map(validate_phone).transpose()?;

        let request = RegisterRequest {
            name: name.to_string(),
            email: request.email.trim().to_lowercase(),
            phone,
            password: request.password,
            referral_code: request
                .referral_code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        };
        let data = self.api.register(&request).await?;
        let token = data.token().to_string();
        self.start_session(&token, data.user).await
    }

    async fn start_session(&self, token: &str, user: Value) -> AppResult<AuthResponse> {
        if token.trim().is_empty() {
            return Err(AppError::ExternalApiError(
                "Login succeeded but no token was returned".to_string(),
            ));
        }
        self.api.session().save_login(token, user.clone()).await?;

        // 登录后立即刷新一次资料；失败时退回登录响应里的用户信息
        let user = match self.app_state.init().await {
            LoadState::Ready(profile) => profile,
            _ => {
                let profile = profile_from_value(&user).unwrap_or_default();
                self.app_state.set_profile(profile.clone()).await;
                profile
            }
        };
        log::info!("User {} logged in", user.id);
        Ok(AuthResponse { user })
    }

    /// 登出：关闭所有租用视图、清空本地存储、重置应用状态
    pub async fn logout(&self) -> AppResult<()> {
        self.registry.close_all().await;
        self.api.session().clear().await?;
        self.app_state.reset().await;
        Ok(())
    }
}
