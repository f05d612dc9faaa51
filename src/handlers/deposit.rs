use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::DepositService;

#[utoipa::path(
    post,
    path = "/deposit/initiate",
    tag = "deposit",
    request_body = InitiateDepositRequest,
    responses(
        (status = 200, description = "创建充值订单成功，返回支付跳转地址", body = InitiateDepositResponse),
        (status = 400, description = "金额无效")
    )
)]
pub async fn initiate_deposit(
    deposit_service: web::Data<DepositService>,
    request: web::Json<InitiateDepositRequest>,
) -> Result<HttpResponse> {
    match deposit_service.initiate(request.amount).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/deposit/validate",
    tag = "deposit",
    request_body = ValidateDepositRequest,
    responses(
        (status = 200, description = "充值校验结果", body = ValidateDepositResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn validate_deposit(
    deposit_service: web::Data<DepositService>,
    request: web::Json<ValidateDepositRequest>,
) -> Result<HttpResponse> {
    match deposit_service.validate(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn deposit_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/deposit")
            .route("/initiate", web::post().to(initiate_deposit))
            .route("/validate", web::post().to(validate_deposit)),
    );
}
