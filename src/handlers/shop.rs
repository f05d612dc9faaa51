use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::ShopService;

#[utoipa::path(
    get,
    path = "/shop/accounts",
    tag = "shop",
    params(
        ("category" = Option<String>, Query, description = "分类"),
        ("platform" = Option<String>, Query, description = "平台"),
        ("search" = Option<String>, Query, description = "关键字"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取账号商品列表成功")
    )
)]
pub async fn list_accounts(
    shop_service: web::Data<ShopService>,
    query: web::Query<ShopQuery>,
) -> Result<HttpResponse> {
    match shop_service.accounts(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/shop/accounts/{id}",
    tag = "shop",
    params(("id" = String, Path, description = "商品 ID")),
    responses(
        (status = 200, description = "获取商品详情成功", body = AccountListing),
        (status = 404, description = "商品不存在")
    )
)]
pub async fn get_account(
    shop_service: web::Data<ShopService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match shop_service.account(&path).await {
        Ok(listing) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": listing
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/shop/purchase",
    tag = "shop",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "购买成功", body = PurchaseResponse),
        (status = 400, description = "数量不足最低起订量或库存不足"),
        (status = 401, description = "未登录")
    )
)]
pub async fn purchase(
    shop_service: web::Data<ShopService>,
    request: web::Json<PurchaseRequest>,
) -> Result<HttpResponse> {
    match shop_service.purchase(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/shop/orders",
    tag = "shop",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取订单列表成功"),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_orders(
    shop_service: web::Data<ShopService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match shop_service.orders(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/shop/orders/{id}",
    tag = "shop",
    params(("id" = String, Path, description = "订单 ID")),
    responses(
        (status = 200, description = "获取订单详情与账号登录信息", body = OrderDetail),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    shop_service: web::Data<ShopService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match shop_service.order_detail(&path).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn shop_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/shop")
            .route("/accounts", web::get().to(list_accounts))
            .route("/accounts/{id}", web::get().to(get_account))
            .route("/purchase", web::post().to(purchase))
            .route("/orders", web::get().to(get_orders))
            .route("/orders/{id}", web::get().to(get_order)),
    );
}
