use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReferralStats {
    pub total_referrals: u32,
    pub active_referrals: u32,
    pub total_earned: f64,
    /// 可转入余额的佣金
    pub available: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Referral {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub earned: f64,
    pub joined_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReferralSettings {
    pub referral_code: String,
    pub notify_on_signup: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(example = 1000.0)]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub transferred: f64,
    pub new_balance: Option<f64>,
}
