use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::utils::{ExpirySource, TimeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RentalKind {
    Number,
    Email,
}

impl RentalKind {
    /// Path segment used by the remote API and the local routes.
    pub fn as_path(&self) -> &'static str {
        match self {
            RentalKind::Number => "number",
            RentalKind::Email => "email",
        }
    }
}

impl std::fmt::Display for RentalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_path())
    }
}

impl FromStr for RentalKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "number" | "numbers" => Ok(RentalKind::Number),
            "email" | "emails" => Ok(RentalKind::Email),
            other => Err(AppError::NotFound(format!("Unknown rental kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Active,
    Expired,
    /// 用户主动关闭
    Closed,
}

impl RentalStatus {
    /// Map the many spellings the API uses onto the three states the client cares about.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" | "pending" | "running" | "1" | "true" | "received" => RentalStatus::Active,
            "closed" | "cancelled" | "canceled" | "refunded" => RentalStatus::Closed,
            _ => RentalStatus::Expired,
        }
    }
}

/// A leased phone number or email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Rental {
    pub id: String,
    pub kind: RentalKind,
    /// 手机号或邮箱地址
    pub contact: String,
    pub owner: Option<String>,
    #[schema(value_type = Option<String>)]
    pub started_at: Option<TimeRef>,
    pub duration_secs: Option<i64>,
    #[schema(value_type = Option<String>)]
    pub expires_at: Option<TimeRef>,
    pub status: RentalStatus,
    pub service: Option<String>,
    pub country: Option<String>,
    pub network: Option<String>,
    pub can_reactivate: bool,
}

impl Rental {
    pub fn expiry_source(&self) -> ExpirySource {
        ExpirySource::resolve(
            self.started_at.as_ref(),
            self.duration_secs,
            self.expires_at.as_ref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationMessage {
    pub sender: Option<String>,
    pub text: String,
    pub code: Option<String>,
    #[schema(value_type = Option<String>)]
    pub received_at: Option<TimeRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookRentalRequest {
    #[schema(example = "whatsapp")]
    pub service_id: String,
    #[schema(example = "234")]
    pub country_id: Option<String>,
    #[schema(example = "mtn")]
    pub network: Option<String>,
    #[schema(example = "sms")]
    #[serde(rename = "type")]
    pub number_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CloseRentalRequest {
    /// 关闭不可撤销，必须显式确认
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RentalListResponse {
    pub active: Vec<Rental>,
    pub inactive: Vec<Rental>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReactivateResponse {
    pub rental: Rental,
    pub cooldown_secs: u64,
}
