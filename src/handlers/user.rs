use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::{AppState, UserService};

#[utoipa::path(
    get,
    path = "/user/profile",
    tag = "user",
    responses(
        (status = 200, description = "获取用户资料成功", body = UserProfile),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    match user_service.get_profile().await {
        Ok(profile) => {
            app_state.set_profile(profile.clone()).await;
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": profile
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/user/profile",
    tag = "user",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "更新用户资料成功", body = UserProfile),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未登录")
    )
)]
pub async fn update_profile(
    user_service: web::Data<UserService>,
    app_state: web::Data<AppState>,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    match user_service.update_profile(request.into_inner()).await {
        Ok(profile) => {
            app_state.set_profile(profile.clone()).await;
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": profile
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/user/change-password",
    tag = "user",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "密码修改成功", body = MessageResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn change_password(
    user_service: web::Data<UserService>,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    match user_service.change_password(&request).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Password updated"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/wallet",
    tag = "user",
    responses(
        (status = 200, description = "获取钱包余额成功", body = Wallet),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_wallet(user_service: web::Data<UserService>) -> Result<HttpResponse> {
    match user_service.wallet().await {
        Ok(wallet) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": wallet
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/accounts",
    tag = "user",
    responses(
        (status = 200, description = "获取充值虚拟账户成功", body = [VirtualAccount]),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_virtual_accounts(user_service: web::Data<UserService>) -> Result<HttpResponse> {
    match user_service.virtual_accounts().await {
        Ok(accounts) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": accounts
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/crypto-wallet",
    tag = "user",
    responses(
        (status = 200, description = "获取加密货币充值地址成功", body = [CryptoWallet]),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_crypto_wallet(user_service: web::Data<UserService>) -> Result<HttpResponse> {
    match user_service.crypto_wallets().await {
        Ok(wallets) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": wallets
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/transactions",
    tag = "user",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取交易记录成功"),
        (status = 401, description = "未登录")
    )
)]
pub async fn get_transactions(
    user_service: web::Data<UserService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match user_service.transactions(&query.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/user/state",
    tag = "user",
    responses(
        (status = 200, description = "应用状态", body = AppStateResponse)
    )
)]
pub async fn get_state(app_state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": app_state.to_response().await
    })))
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::put().to(update_profile))
            .route("/change-password", web::post().to(change_password))
            .route("/wallet", web::get().to(get_wallet))
            .route("/accounts", web::get().to(get_virtual_accounts))
            .route("/crypto-wallet", web::get().to(get_crypto_wallet))
            .route("/transactions", web::get().to(get_transactions))
            .route("/state", web::get().to(get_state)),
    );
}
