use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NumberType {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Country {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
}

/// A platform a number or email can be rented for (WhatsApp, Telegram, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceOffer {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub available: Option<u32>,
    /// 租用时长（秒）
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ServiceQuery {
    #[serde(rename = "countryID")]
    pub country_id: Option<String>,
    pub network: Option<String>,
    #[serde(rename = "type")]
    pub number_type: Option<String>,
    /// 按名称过滤（本地）
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountryQuery {
    #[serde(rename = "type")]
    pub number_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToggleSavedRequest {
    pub service_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedServicesResponse {
    pub saved: Vec<String>,
}
