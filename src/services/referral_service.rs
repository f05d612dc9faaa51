use super::user_service::UserService;
use crate::error::{AppError, AppResult};
use crate::external::DspiceApi;
use crate::models::*;

#[derive(Clone)]
pub struct ReferralService {
    api: DspiceApi,
    user_service: UserService,
}

impl ReferralService {
    pub fn new(api: DspiceApi, user_service: UserService) -> Self {
        Self { api, user_service }
    }

    pub async fn stats(&self) -> AppResult<ReferralStats> {
        self.api.referral_stats().await
    }

    /// 获取推荐列表
    pub async fn referrals(&self, params: &PaginationParams) -> AppResult<PaginatedResponse<Referral>> {
        let (items, total) = self.api.referrals(params).await?;
        let total = total.unwrap_or_else(|| params.get_offset() as i64 + items.len() as i64);
        Ok(PaginatedResponse::new(items, params, total))
    }

    pub async fn settings(&self) -> AppResult<ReferralSettings> {
        self.api.referral_settings().await
    }

    pub async fn update_settings(&self, settings: ReferralSettings) -> AppResult<ReferralSettings> {
        let code = settings.referral_code.trim();
        if code.len() < 3 || code.len() > 32 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::ValidationError(
                "Referral code must be 3-32 letters or digits".to_string(),
            ));
        }
        let settings = ReferralSettings {
            referral_code: code.to_string(),
            notify_on_signup: settings.notify_on_signup,
        };
        self.api.update_referral_settings(&settings).await
    }

    /// Move referral earnings into the wallet balance.
    pub async fn transfer(&self, amount: f64) -> AppResult<TransferResponse> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::ValidationError(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let response = self.api.transfer_referral_balance(amount).await?;
        self.user_service.invalidate_wallet_caches().await?;
        log::info!("Transferred {} referral earnings to balance", response.transferred);
        Ok(response)
    }
}
