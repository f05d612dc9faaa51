use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::error::AppResult;
use crate::models::*;
use crate::services::CatalogService;

async fn types_inner(service: &CatalogService, kind: &str) -> AppResult<Vec<NumberType>> {
    service.types(kind.parse()?).await
}

#[utoipa::path(
    get,
    path = "/catalog/{kind}/types",
    tag = "catalog",
    params(("kind" = String, Path, description = "number | email")),
    responses(
        (status = 200, description = "获取类型列表成功", body = [NumberType]),
        (status = 404, description = "未知的租用类型")
    )
)]
pub async fn get_types(
    catalog_service: web::Data<CatalogService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match types_inner(&catalog_service, &path).await {
        Ok(types) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": types
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/catalog/number/countries",
    tag = "catalog",
    params(("type" = Option<String>, Query, description = "号码类型")),
    responses(
        (status = 200, description = "获取国家列表成功", body = [Country])
    )
)]
pub async fn get_countries(
    catalog_service: web::Data<CatalogService>,
    query: web::Query<CountryQuery>,
) -> Result<HttpResponse> {
    match catalog_service
        .countries(query.number_type.as_deref())
        .await
    {
        Ok(countries) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": countries
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn services_inner(
    service: &CatalogService,
    kind: &str,
    query: &ServiceQuery,
) -> AppResult<PaginatedResponse<ServiceOffer>> {
    service.services(kind.parse()?, query).await
}

#[utoipa::path(
    get,
    path = "/catalog/{kind}/services",
    tag = "catalog",
    params(
        ("kind" = String, Path, description = "number | email"),
        ("countryID" = Option<String>, Query, description = "国家 ID（号码必填）"),
        ("network" = Option<String>, Query, description = "运营商"),
        ("type" = Option<String>, Query, description = "号码类型"),
        ("search" = Option<String>, Query, description = "按名称搜索"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取服务列表成功"),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn get_services(
    catalog_service: web::Data<CatalogService>,
    path: web::Path<String>,
    query: web::Query<ServiceQuery>,
) -> Result<HttpResponse> {
    match services_inner(&catalog_service, &path, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn saved_inner(service: &CatalogService, kind: &str) -> AppResult<Vec<String>> {
    service.saved(kind.parse()?).await
}

#[utoipa::path(
    get,
    path = "/catalog/{kind}/saved",
    tag = "catalog",
    params(("kind" = String, Path, description = "number | email")),
    responses(
        (status = 200, description = "获取收藏的服务", body = SavedServicesResponse)
    )
)]
pub async fn get_saved(
    catalog_service: web::Data<CatalogService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match saved_inner(&catalog_service, &path).await {
        Ok(saved) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SavedServicesResponse { saved }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn toggle_inner(
    service: &CatalogService,
    kind: &str,
    service_id: &str,
) -> AppResult<Vec<String>> {
    service.toggle_saved(kind.parse()?, service_id).await
}

#[utoipa::path(
    post,
    path = "/catalog/{kind}/saved",
    tag = "catalog",
    params(("kind" = String, Path, description = "number | email")),
    request_body = ToggleSavedRequest,
    responses(
        (status = 200, description = "收藏状态已切换", body = SavedServicesResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn toggle_saved(
    catalog_service: web::Data<CatalogService>,
    path: web::Path<String>,
    request: web::Json<ToggleSavedRequest>,
) -> Result<HttpResponse> {
    match toggle_inner(&catalog_service, &path, &request.service_id).await {
        Ok(saved) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SavedServicesResponse { saved }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn catalog_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/catalog")
            .route("/number/countries", web::get().to(get_countries))
            .route("/{kind}/types", web::get().to(get_types))
            .route("/{kind}/services", web::get().to(get_services))
            .route("/{kind}/saved", web::get().to(get_saved))
            .route("/{kind}/saved", web::post().to(toggle_saved)),
    );
}
