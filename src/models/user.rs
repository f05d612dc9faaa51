use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Loyalty tier; drives the shop discount and minimum order quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Stage {
    pub name: String,
    pub discount_percent: f64,
    pub min_order_quantity: u32,
}

impl Default for Stage {
    fn default() -> Self {
        Self {
            name: "starter".to_string(),
            discount_percent: 0.0,
            min_order_quantity: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub balance: f64,
    pub referral_code: Option<String>,
    pub stage: Stage,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Ada Obi")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "+2348012345678")]
    pub phone: Option<String>,
    #[schema(example = "password123")]
    pub password: String,
    #[schema(example = "REF123")]
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserProfile,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Snapshot of the application state store.
#[derive(Debug, Serialize, ToSchema)]
pub struct AppStateResponse {
    /// loading | ready | error
    pub status: String,
    pub profile: Option<UserProfile>,
    pub error: Option<String>,
}
