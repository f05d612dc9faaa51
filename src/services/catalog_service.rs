use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::{AppError, AppResult};
use crate::external::DspiceApi;
use crate::models::*;
use crate::storage::{TtlCache, keys};

#[derive(Clone)]
pub struct CatalogService {
    api: DspiceApi,
    cache: TtlCache,
    catalog_ttl: Duration,
    services_ttl: Duration,
    saved_ttl: Duration,
}

fn saved_key(kind: RentalKind) -> &'static str {
    match kind {
        RentalKind::Number => keys::SAVED_SERVICES,
        RentalKind::Email => keys::SAVED_EMAIL_SERVICES,
    }
}

impl CatalogService {
    pub fn new(api: DspiceApi, cache: TtlCache, config: &CacheConfig) -> Self {
        Self {
            api,
            cache,
            catalog_ttl: Duration::from_secs(config.catalog_ttl_secs),
            services_ttl: Duration::from_secs(config.services_ttl_secs),
            saved_ttl: Duration::from_secs(config.saved_ttl_secs),
        }
    }

    /// 号码/邮箱类型，缓存一天
    pub async fn types(&self, kind: RentalKind) -> AppResult<Vec<NumberType>> {
        let key = match kind {
            RentalKind::Number => keys::NUMBER_TYPES,
            RentalKind::Email => keys::EMAIL_TYPES,
        };
        if let Some(cached) = self.cache.get(key).await.fresh() {
            return Ok(cached);
        }
        let types = self.api.types(kind).await?;
        self.cache.set(key, &types, self.catalog_ttl).await?;
        Ok(types)
    }

    pub async fn countries(&self, number_type: Option<&str>) -> AppResult<Vec<Country>> {
        let number_type = number_type.map(str::trim).filter(|t| !t.is_empty());
        let key = keys::countries(number_type.unwrap_or("all"));
        if let Some(cached) = self.cache.get(&key).await.fresh() {
            return Ok(cached);
        }
        let countries = self.api.countries(number_type).await?;
        self.cache.set(&key, &countries, self.catalog_ttl).await?;
        Ok(countries)
    }

    async fn all_services(
        &self,
        kind: RentalKind,
        query: &ServiceQuery,
    ) -> AppResult<Vec<ServiceOffer>> {
        let key = match kind {
            RentalKind::Number => {
                let country = query.country_id.as_deref().ok_or_else(|| {
                    AppError::ValidationError("Please select a country".to_string())
                })?;
                keys::services(
                    country,
                    query.network.as_deref().unwrap_or("any"),
                    query.number_type.as_deref().unwrap_or("any"),
                )
            }
            RentalKind::Email => keys::EMAIL_SERVICES.to_string(),
        };
        if let Some(cached) = self.cache.get(&key).await.fresh() {
            return Ok(cached);
        }
        let services = self.api.services(kind, query).await?;
        // 空结果不缓存，服务端可能稍后补货
        if !services.is_empty() {
            self.cache.set(&key, &services, self.services_ttl).await?;
        }
        Ok(services)
    }

    /// Services for the given filters, searched and paged locally (infinite scroll).
    pub async fn services(
        &self,
        kind: RentalKind,
        query: &ServiceQuery,
    ) -> AppResult<PaginatedResponse<ServiceOffer>> {
        let mut services = self.all_services(kind, query).await?;
        if let Some(search) = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
        {
            services.retain(|s| s.name.to_lowercase().contains(&search));
        }
        let params = PaginationParams::new(query.page, query.per_page);
        Ok(PaginatedResponse::from_slice(&services, &params))
    }

    pub async fn saved(&self, kind: RentalKind) -> AppResult<Vec<String>> {
        Ok(self
            .cache
            .get::<Vec<String>>(saved_key(kind))
            .await
            .fresh()
            .unwrap_or_default())
    }

    /// Bookmark a service, or remove the bookmark when it is already saved.
    pub async fn toggle_saved(&self, kind: RentalKind, service_id: &str) -> AppResult<Vec<String>> {
        let service_id = service_id.trim();
        if service_id.is_empty() {
            return Err(AppError::ValidationError("service_id is required".to_string()));
        }
        let mut saved = self.saved(kind).await?;
        match saved.iter().position(|id| id == service_id) {
            Some(index) => {
                saved.remove(index);
            }
            None => saved.push(service_id.to_string()),
        }
        self.cache.set(saved_key(kind), &saved, self.saved_ttl).await?;
        Ok(saved)
    }
}
