use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Marketplace listing of a ready-made social/media account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountListing {
    pub id: String,
    pub title: String,
    pub platform: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub stock: u32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ShopQuery {
    pub category: Option<String>,
    pub platform: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    pub account_id: String,
    #[schema(example = 1)]
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseResponse {
    pub order: Order,
    /// 按当前等级折扣计算的预估价格
    pub discounted_total: f64,
    pub discount_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: String,
    pub account_id: Option<String>,
    pub title: Option<String>,
    pub quantity: u32,
    pub total: f64,
    pub status: String,
    pub created_at: Option<String>,
}

/// Credentials delivered for a purchased account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLogin {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub extra: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub logins: Vec<OrderLogin>,
}
