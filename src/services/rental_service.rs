use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{AppError, AppResult};
use crate::external::DspiceApi;
use crate::models::*;
use crate::utils::{Clock, TimeRef, remaining_seconds};
use crate::watch::WatchRegistry;

/// Local mirror of one kind's rentals, split the way the dashboard shows them.
#[derive(Debug, Clone, Default)]
pub struct RentalBook {
    pub active: Vec<Rental>,
    pub inactive: Vec<Rental>,
}

impl RentalBook {
    pub fn from_history(rentals: Vec<Rental>, clock: &dyn Clock) -> Self {
        let now = clock.now();
        let (active, inactive): (Vec<Rental>, Vec<Rental>) = rentals.into_iter().partition(|r| {
            r.status == RentalStatus::Active && remaining_seconds(&r.expiry_source(), now) > 0
        });
        Self { active, inactive }
    }

    pub fn find(&self, id: &str) -> Option<&Rental> {
        self.active
            .iter()
            .chain(self.inactive.iter())
            .find(|r| r.id == id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|r| r.id == id)
    }

    /// Mark a rental closed and keep it in the inactive list.
    /// Returns false when it was not in the active list.
    pub fn close(&mut self, id: &str) -> bool {
        if let Some(index) = self.active.iter().position(|r| r.id == id) {
            let mut rental = self.active.remove(index);
            rental.status = RentalStatus::Closed;
            rental.can_reactivate = false;
            self.inactive.retain(|r| r.id != id);
            self.inactive.insert(0, rental);
            return true;
        }
        if let Some(rental) = self.inactive.iter_mut().find(|r| r.id == id) {
            rental.status = RentalStatus::Closed;
            rental.can_reactivate = false;
        }
        false
    }

    pub fn activate(&mut self, rental: Rental) {
        self.inactive.retain(|r| r.id != rental.id);
        self.active.retain(|r| r.id != rental.id);
        self.active.insert(0, rental);
    }

    pub fn to_response(&self) -> RentalListResponse {
        RentalListResponse {
            active: self.active.clone(),
            inactive: self.inactive.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RentalService {
    api: DspiceApi,
    registry: WatchRegistry,
    clock: Arc<dyn Clock>,
    books: Arc<RwLock<HashMap<RentalKind, RentalBook>>>,
    cooldowns: Arc<Mutex<HashMap<(RentalKind, String), Instant>>>,
    cooldown: Duration,
}

impl RentalService {
    pub fn new(api: DspiceApi, registry: WatchRegistry, clock: Arc<dyn Clock>) -> Self {
        let cooldown = registry.config().reactivation_cooldown();
        Self {
            api,
            registry,
            clock,
            books: Arc::new(RwLock::new(HashMap::new())),
            cooldowns: Arc::new(Mutex::new(HashMap::new())),
            cooldown,
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// 拉取历史记录，重建本地镜像
    pub async fn refresh(&self, kind: RentalKind) -> AppResult<RentalListResponse> {
        let history = self.api.rental_history(kind).await?;
        let book = RentalBook::from_history(history, self.clock.as_ref());
        let response = book.to_response();
        self.books.write().await.insert(kind, book);
        Ok(response)
    }

    pub async fn cached(&self, kind: RentalKind) -> RentalListResponse {
        self.books
            .read()
            .await
            .get(&kind)
            .map(RentalBook::to_response)
            .unwrap_or(RentalListResponse {
                active: Vec::new(),
                inactive: Vec::new(),
            })
    }

    /// Look a rental up in the mirror, refreshing once when it is not there.
    pub async fn find(&self, kind: RentalKind, id: &str) -> AppResult<Rental> {
        if let Some(rental) = self.find_cached(kind, id).await {
            return Ok(rental);
        }
        self.refresh(kind).await?;
        self.find_cached(kind, id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Rental {id} not found")))
    }

    async fn find_cached(&self, kind: RentalKind, id: &str) -> Option<Rental> {
        self.books
            .read()
            .await
            .get(&kind)
            .and_then(|b| b.find(id))
            .cloned()
    }

    pub async fn book(&self, kind: RentalKind, request: BookRentalRequest) -> AppResult<Rental> {
        if request.service_id.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Please select a service".to_string(),
            ));
        }
        if kind == RentalKind::Number && request.country_id.is_none() {
            return Err(AppError::ValidationError(
                "Please select a country".to_string(),
            ));
        }

        let rental = self.api.book(kind, &request).await?;
        log::info!("Booked {kind} rental {} ({})", rental.id, rental.contact);
        self.books
            .write()
            .await
            .entry(kind)
            .or_default()
            .activate(rental.clone());
        self.registry.open(rental.clone()).await;
        Ok(rental)
    }

    pub async fn fetch_codes(
        &self,
        kind: RentalKind,
        id: &str,
    ) -> AppResult<Vec<VerificationMessage>> {
        self.api.fetch_codes(kind, id).await
    }

    /// Foreground refetch of a rental's messages; errors go back to the caller.
    pub async fn reload(&self, kind: RentalKind, id: &str) -> AppResult<Vec<VerificationMessage>> {
        match self.registry.get(kind, id).await {
            Some(view) => view.reload().await,
            None => self.fetch_codes(kind, id).await,
        }
    }

    pub async fn open_view(&self, kind: RentalKind, id: &str) -> AppResult<RentalViewSnapshot> {
        let rental = self.find(kind, id).await?;
        let view = self.registry.open(rental).await;
        let mut snapshot = view.snapshot();
        snapshot.cooldown_remaining_secs = self.cooldown_remaining(kind, id);
        Ok(snapshot)
    }

    pub async fn view_snapshot(&self, kind: RentalKind, id: &str) -> AppResult<RentalViewSnapshot> {
        let view = self
            .registry
            .get(kind, id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("No open view for rental {id}")))?;
        let mut snapshot = view.snapshot();
        snapshot.cooldown_remaining_secs = self.cooldown_remaining(kind, id);
        Ok(snapshot)
    }

    pub async fn close_view(&self, kind: RentalKind, id: &str) -> bool {
        self.registry.close(kind, id).await
    }

    /// Close a rental for good. The caller must confirm explicitly.
    pub async fn close(&self, kind: RentalKind, id: &str, confirm: bool) -> AppResult<Rental> {
        if !confirm {
            return Err(AppError::ValidationError(
                "Closing a rental cannot be undone, please confirm".to_string(),
            ));
        }
        let rental = self.find(kind, id).await?;
        if rental.status != RentalStatus::Active {
            return Err(AppError::ValidationError(format!(
                "Rental {id} is no longer active"
            )));
        }

        self.api.close_rental(kind, id).await?;

        let closed = {
            let mut books = self.books.write().await;
            let book = books.entry(kind).or_default();
            book.close(id);
            book.find(id).cloned()
        };
        self.registry.close(kind, id).await;
        log::info!("Closed {kind} rental {id}");

        Ok(closed.unwrap_or(Rental {
            status: RentalStatus::Closed,
            can_reactivate: false,
            ..rental
        }))
    }

    pub fn cooldown_remaining(&self, kind: RentalKind, id: &str) -> u64 {
        let Ok(cooldowns) = self.cooldowns.lock() else {
            return 0;
        };
        cooldowns
            .get(&(kind, id.to_string()))
            .map(|until| until.saturating_duration_since(Instant::now()))
            .map(|left| left.as_secs() + u64::from(left.subsec_nanos() > 0))
            .unwrap_or(0)
    }

    /// Put a rental back into service, subject to the local cooldown.
    pub async fn reactivate(&self, kind: RentalKind, id: &str) -> AppResult<ReactivateResponse> {
        let rental = self.find(kind, id).await?;
        if !rental.can_reactivate {
            return Err(AppError::ValidationError(format!(
                "Rental {id} cannot be reactivated"
            )));
        }
        let left = self.cooldown_remaining(kind, id);
        if left > 0 {
            return Err(AppError::RateLimited(format!(
                "Please wait {left}s before reactivating again"
            )));
        }

        let refreshed = self.api.reactivate_rental(kind, id).await?;
        // 服务端已经重新激活，冷却从此刻开始
        if let Ok(mut cooldowns) = self.cooldowns.lock() {
            cooldowns.insert((kind, id.to_string()), Instant::now() + self.cooldown);
        }

        let rental = match refreshed {
            Some(r) if self.is_live(&r) => r,
            _ => self.reactivated_locally(kind, rental).await?,
        };

        self.books
            .write()
            .await
            .entry(kind)
            .or_default()
            .activate(rental.clone());
        self.registry.reopen(rental.clone()).await;
        log::info!("Reactivated {kind} rental {id}");

        Ok(ReactivateResponse {
            rental,
            cooldown_secs: self.cooldown.as_secs(),
        })
    }

    fn is_live(&self, rental: &Rental) -> bool {
        rental.status == RentalStatus::Active
            && remaining_seconds(&rental.expiry_source(), self.clock.now()) > 0
    }

    /// 接口没返回可用记录时：先重新拉历史，找不到就按原来的时长从现在重新计时
    async fn reactivated_locally(&self, kind: RentalKind, rental: Rental) -> AppResult<Rental> {
        if let Ok(history) = self.api.rental_history(kind).await
            && let Some(fresh) = history.into_iter().find(|r| r.id == rental.id)
            && self.is_live(&fresh)
        {
            return Ok(fresh);
        }
        let Some(window) = rental_window_secs(&rental) else {
            log::warn!(
                "Reactivated {kind} rental {} but its new expiry is unknown",
                rental.id
            );
            return Err(AppError::ExternalApiError(format!(
                "Rental {} was reactivated but its new expiry is unknown, please refresh",
                rental.id
            )));
        };
        Ok(Rental {
            status: RentalStatus::Active,
            started_at: Some(TimeRef::Epoch(self.clock.now().timestamp())),
            duration_secs: Some(window),
            expires_at: None,
            ..rental
        })
    }

    /// Drop the mirror, cooldowns and open views (logout).
    pub async fn reset(&self) {
        self.registry.close_all().await;
        self.books.write().await.clear();
        if let Ok(mut cooldowns) = self.cooldowns.lock() {
            cooldowns.clear();
        }
    }
}

/// Length of a rental's window: its duration, or the gap between start and absolute expiry.
fn rental_window_secs(rental: &Rental) -> Option<i64> {
    let from_bounds = || {
        let start = rental.started_at.as_ref()?.parse()?;
        let end = rental.expires_at.as_ref()?.parse()?;
        Some((end - start).num_seconds())
    };
    rental
        .duration_secs
        .filter(|d| *d > 0)
        .or_else(|| from_bounds().filter(|d| *d > 0))
}
