use actix_web::web;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::external::DspiceApi;
use crate::handlers;
use crate::services::*;
use crate::storage::{LocalStore, SessionStore, TtlCache};
use crate::utils::Clock;
use crate::watch::WatchRegistry;

/// Every long-lived service, wired once at startup and shared by all workers.
#[derive(Clone)]
pub struct AppContext {
    pub session: SessionStore,
    pub api: DspiceApi,
    pub registry: WatchRegistry,
    pub app_state: AppState,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub catalog_service: CatalogService,
    pub rental_service: RentalService,
    pub shop_service: ShopService,
    pub referral_service: ReferralService,
    pub deposit_service: DepositService,
}

impl AppContext {
    pub fn build(config: &Config, store: LocalStore, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let session = SessionStore::new(store.clone());
        let cache = TtlCache::new(store, clock.clone());
        let api = DspiceApi::new(&config.api, session.clone())?;

        let registry = WatchRegistry::new(
            Arc::new(api.clone()),
            clock.clone(),
            config.watch.clone(),
        );

        let user_service = UserService::new(api.clone(), cache.clone(), &config.cache);
        let app_state = AppState::new(Arc::new(user_service.clone()));
        let auth_service = AuthService::new(api.clone(), app_state.clone(), registry.clone());
        let catalog_service = CatalogService::new(api.clone(), cache, &config.cache);
        let rental_service = RentalService::new(api.clone(), registry.clone(), clock);
        let shop_service = ShopService::new(api.clone(), app_state.clone());
        let referral_service = ReferralService::new(api.clone(), user_service.clone());
        let deposit_service =
            DepositService::new(api.clone(), user_service.clone(), app_state.clone());

        Ok(Self {
            session,
            api,
            registry,
            app_state,
            auth_service,
            user_service,
            catalog_service,
            rental_service,
            shop_service,
            referral_service,
            deposit_service,
        })
    }

    /// Register shared state and the `/api/v1` routes.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.app_state.clone()))
            .app_data(web::Data::new(self.auth_service.clone()))
            .app_data(web::Data::new(self.user_service.clone()))
            .app_data(web::Data::new(self.catalog_service.clone()))
            .app_data(web::Data::new(self.rental_service.clone()))
            .app_data(web::Data::new(self.shop_service.clone()))
            .app_data(web::Data::new(self.referral_service.clone()))
            .app_data(web::Data::new(self.deposit_service.clone()))
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::catalog_config)
                    .configure(handlers::rental_config)
                    .configure(handlers::shop_config)
                    .configure(handlers::referral_config)
                    .configure(handlers::deposit_config),
            );
    }
}
