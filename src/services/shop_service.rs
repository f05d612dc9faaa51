use super::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::external::DspiceApi;
use crate::models::*;

#[derive(Clone)]
pub struct ShopService {
    api: DspiceApi,
    app_state: AppState,
}

/// 按等级折扣估算总价，保留两位小数
pub fn discounted_total(unit_price: f64, quantity: u32, stage: &Stage) -> f64 {
    let gross = unit_price * quantity as f64;
    let net = gross * (1.0 - stage.discount_percent.clamp(0.0, 100.0) / 100.0);
    (net * 100.0).round() / 100.0
}

impl ShopService {
    pub fn new(api: DspiceApi, app_state: AppState) -> Self {
        Self { api, app_state }
    }

    pub async fn accounts(&self, query: &ShopQuery) -> AppResult<PaginatedResponse<AccountListing>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let (items, total) = self.api.accounts(query).await?;
        let total = total.unwrap_or_else(|| params.get_offset() as i64 + items.len() as i64);
        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn account(&self, id: &str) -> AppResult<AccountListing> {
        self.api.account(id).await
    }

    /// Buy `quantity` of a listing. The stage minimum applies and the stage discount is
    /// previewed in the response; the server charges the final amount.
    pub async fn purchase(&self, request: PurchaseRequest) -> AppResult<PurchaseResponse> {
        if request.quantity == 0 {
            return Err(AppError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let stage = self
            .app_state
            .profile()
            .await
            .map(|p| p.stage)
            .unwrap_or_default();
        if request.quantity < stage.min_order_quantity {
            return Err(AppError::ValidationError(format!(
                "Your {} stage requires a minimum order of {}",
                stage.name, stage.min_order_quantity
            )));
        }

        let listing = self.api.account(&request.account_id).await?;
        if listing.stock < request.quantity {
            return Err(AppError::ValidationError(format!(
                "Only {} left in stock",
                listing.stock
            )));
        }

        let order = self.api.purchase(&request).await?;
        log::info!(
            "Purchased {} x {} (order {})",
            request.quantity,
            request.account_id,
            order.id
        );

        // 余额已变，刷新应用状态中的资料
        self.app_state.refresh().await;

        Ok(PurchaseResponse {
            discounted_total: discounted_total(listing.price, request.quantity, &stage),
            discount_percent: stage.discount_percent,
            order,
        })
    }

    pub async fn orders(&self, params: &PaginationParams) -> AppResult<PaginatedResponse<Order>> {
        let (items, total) = self.api.orders(params).await?;
        let total = total.unwrap_or_else(|| params.get_offset() as i64 + items.len() as i64);
        Ok(PaginatedResponse::new(items, params, total))
    }

    pub async fn order_detail(&self, id: &str) -> AppResult<OrderDetail> {
        self.api.order_detail(id).await
    }
}
