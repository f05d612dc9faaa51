use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::ReferralService;

#[utoipa::path(
    get,
    path = "/referral/stats",
    tag = "referral",
    responses(
        (status = 200, description = "获取推荐统计成功", body = ReferralStats),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_stats(referral_service: web::Data<ReferralService>) -> Result<HttpResponse> {
    match referral_service.stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/referral/list",
    tag = "referral",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取推荐列表成功"),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_referrals(
    referral_service: web::Data<ReferralService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match referral_service.referrals(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/referral/settings",
    tag = "referral",
    responses(
        (status = 200, description = "获取推荐设置成功", body = ReferralSettings)
    )
)]
pub async fn get_settings(referral_service: web::Data<ReferralService>) -> Result<HttpResponse> {
    match referral_service.settings().await {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settings
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/referral/settings",
    tag = "referral",
    request_body = ReferralSettings,
    responses(
        (status = 200, description = "更新推荐设置成功", body = ReferralSettings),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn update_settings(
    referral_service: web::Data<ReferralService>,
    request: web::Json<ReferralSettings>,
) -> Result<HttpResponse> {
    match referral_service.update_settings(request.into_inner()).await {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settings
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/referral/transfer",
    tag = "referral",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "佣金已转入余额", body = TransferResponse),
        (status = 400, description = "金额无效或佣金不足")
    )
)]
pub async fn transfer(
    referral_service: web::Data<ReferralService>,
    request: web::Json<TransferRequest>,
) -> Result<HttpResponse> {
    match referral_service.transfer(request.amount).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn referral_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/referral")
            .route("/stats", web::get().to(get_stats))
            .route("/list", web::get().to(get_referrals))
            .route("/settings", web::get().to(get_settings))
            .route("/settings", web::put().to(update_settings))
            .route("/transfer", web::post().to(transfer)),
    );
}
