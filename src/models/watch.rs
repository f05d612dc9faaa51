use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::rental::{Rental, VerificationMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountdownPhase {
    Idle,
    Counting,
    Expired,
}

/// Everything a rental dialog renders, computed at request time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RentalViewSnapshot {
    pub rental: Rental,
    pub phase: CountdownPhase,
    pub remaining_secs: i64,
    /// "1m 0s" / "Expired"
    pub remaining_display: String,
    pub messages: Vec<VerificationMessage>,
    /// 后台轮询失败时显示 "No code found"
    pub poll_note: Option<String>,
    pub can_reactivate: bool,
    pub cooldown_remaining_secs: u64,
}
