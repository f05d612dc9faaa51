use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::error::AppResult;
use crate::models::*;
use crate::services::RentalService;

fn kind_and_id(path: web::Path<(String, String)>) -> AppResult<(RentalKind, String)> {
    let (kind, id) = path.into_inner();
    Ok((kind.parse()?, id))
}

#[utoipa::path(
    get,
    path = "/rentals/{kind}",
    tag = "rentals",
    params(("kind" = String, Path, description = "number | email")),
    responses(
        (status = 200, description = "获取租用记录成功（进行中 / 已结束）", body = RentalListResponse),
        (status = 401, description = "未登录")
    )
)]
pub async fn list_rentals(
    rental_service: web::Data<RentalService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let result = match path.parse::<RentalKind>() {
        Ok(kind) => rental_service.refresh(kind).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/rentals/{kind}/book",
    tag = "rentals",
    params(("kind" = String, Path, description = "number | email")),
    request_body = BookRentalRequest,
    responses(
        (status = 200, description = "租用成功", body = Rental),
        (status = 400, description = "请求参数错误或余额不足")
    )
)]
pub async fn book_rental(
    rental_service: web::Data<RentalService>,
    path: web::Path<String>,
    request: web::Json<BookRentalRequest>,
) -> Result<HttpResponse> {
    let result = match path.parse::<RentalKind>() {
        Ok(kind) => rental_service.book(kind, request.into_inner()).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(rental) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": rental
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/rentals/{kind}/{id}/close",
    tag = "rentals",
    params(
        ("kind" = String, Path, description = "number | email"),
        ("id" = String, Path, description = "租用 ID")
    ),
    request_body = CloseRentalRequest,
    responses(
        (status = 200, description = "已关闭", body = Rental),
        (status = 400, description = "未确认或已不在进行中"),
        (status = 404, description = "租用不存在")
    )
)]
pub async fn close_rental(
    rental_service: web::Data<RentalService>,
    path: web::Path<(String, String)>,
    request: Option<web::Json<CloseRentalRequest>>,
) -> Result<HttpResponse> {
    let confirm = request.map(|r| r.confirm).unwrap_or(false);
    let result = match kind_and_id(path) {
        Ok((kind, id)) => rental_service.close(kind, &id, confirm).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(rental) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": rental
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/rentals/{kind}/{id}/reactivate",
    tag = "rentals",
    params(
        ("kind" = String, Path, description = "number | email"),
        ("id" = String, Path, description = "租用 ID")
    ),
    responses(
        (status = 200, description = "重新激活成功", body = ReactivateResponse),
        (status = 400, description = "不可重新激活"),
        (status = 429, description = "冷却中")
    )
)]
pub async fn reactivate_rental(
    rental_service: web::Data<RentalService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let result = match kind_and_id(path) {
        Ok((kind, id)) => rental_service.reactivate(kind, &id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/rentals/{kind}/{id}/view",
    tag = "rentals",
    params(
        ("kind" = String, Path, description = "number | email"),
        ("id" = String, Path, description = "租用 ID")
    ),
    responses(
        (status = 200, description = "打开租用详情，开始倒计时与轮询", body = RentalViewSnapshot),
        (status = 404, description = "租用不存在")
    )
)]
pub async fn open_view(
    rental_service: web::Data<RentalService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let result = match kind_and_id(path) {
        Ok((kind, id)) => rental_service.open_view(kind, &id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(snapshot) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": snapshot
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/rentals/{kind}/{id}/view",
    tag = "rentals",
    params(
        ("kind" = String, Path, description = "number | email"),
        ("id" = String, Path, description = "租用 ID")
    ),
    responses(
        (status = 200, description = "当前倒计时、验证码与轮询状态", body = RentalViewSnapshot),
        (status = 404, description = "详情未打开")
    )
)]
pub async fn get_view(
    rental_service: web::Data<RentalService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let result = match kind_and_id(path) {
        Ok((kind, id)) => rental_service.view_snapshot(kind, &id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(snapshot) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": snapshot
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/rentals/{kind}/{id}/view",
    tag = "rentals",
    params(
        ("kind" = String, Path, description = "number | email"),
        ("id" = String, Path, description = "租用 ID")
    ),
    responses(
        (status = 200, description = "详情已关闭，计时器停止", body = MessageResponse)
    )
)]
pub async fn close_view(
    rental_service: web::Data<RentalService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    match kind_and_id(path) {
        Ok((kind, id)) => {
            let closed = rental_service.close_view(kind, &id).await;
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": if closed { "View closed" } else { "View was not open" }
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/rentals/{kind}/{id}/reload",
    tag = "rentals",
    params(
        ("kind" = String, Path, description = "number | email"),
        ("id" = String, Path, description = "租用 ID")
    ),
    responses(
        (status = 200, description = "重新获取验证码", body = [VerificationMessage]),
        (status = 502, description = "远端服务错误")
    )
)]
pub async fn reload_codes(
    rental_service: web::Data<RentalService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let result = match kind_and_id(path) {
        Ok((kind, id)) => rental_service.reload(kind, &id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(messages) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": messages
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn rental_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rentals")
            .route("/{kind}", web::get().to(list_rentals))
            .route("/{kind}/book", web::post().to(book_rental))
            .route("/{kind}/{id}/close", web::post().to(close_rental))
            .route("/{kind}/{id}/reactivate", web::post().to(reactivate_rental))
            .route("/{kind}/{id}/view", web::post().to(open_view))
            .route("/{kind}/{id}/view", web::get().to(get_view))
            .route("/{kind}/{id}/view", web::delete().to(close_view))
            .route("/{kind}/{id}/reload", web::post().to(reload_codes)),
    );
}
