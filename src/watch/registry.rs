use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::view::{CodeSource, RentalView};
use crate::config::WatchConfig;
use crate::models::{Rental, RentalKind};
use crate::utils::Clock;

type ViewKey = (RentalKind, String);

/// Open rental views, one per `(kind, id)`.
#[derive(Clone)]
pub struct WatchRegistry {
    views: Arc<RwLock<HashMap<ViewKey, Arc<RentalView>>>>,
    source: Arc<dyn CodeSource>,
    clock: Arc<dyn Clock>,
    config: WatchConfig,
}

impl WatchRegistry {
    pub fn new(source: Arc<dyn CodeSource>, clock: Arc<dyn Clock>, config: WatchConfig) -> Self {
        Self {
            views: Arc::new(RwLock::new(HashMap::new())),
            source,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Open a view for `rental`, or return the one already open for the same record.
    /// A view opened from an older copy of the rental is replaced.
    pub async fn open(&self, rental: Rental) -> Arc<RentalView> {
        let key = (rental.kind, rental.id.clone());
        let mut views = self.views.write().await;
        if let Some(view) = views.get(&key)
            && view.rental() == rental
        {
            return view.clone();
        }
        if let Some(stale) = views.remove(&key) {
            log::debug!("Rental {} {} changed, replacing its view", rental.kind, rental.id);
            stale.close();
        }
        let view = RentalView::open(
            rental,
            self.source.clone(),
            self.clock.clone(),
            &self.config,
        );
        views.insert(key, view.clone());
        view
    }

    /// Replace any open view with a fresh one (after a reactivation).
    pub async fn reopen(&self, rental: Rental) -> Arc<RentalView> {
        self.close(rental.kind, &rental.id).await;
        self.open(rental).await
    }

    pub async fn get(&self, kind: RentalKind, id: &str) -> Option<Arc<RentalView>> {
        self.views
            .read()
            .await
            .get(&(kind, id.to_string()))
            .cloned()
    }

    pub async fn close(&self, kind: RentalKind, id: &str) -> bool {
        let removed = self.views.write().await.remove(&(kind, id.to_string()));
        match removed {
            Some(view) => {
                view.close();
                true
            }
            None => false,
        }
    }

    pub async fn close_all(&self) -> usize {
        let drained: Vec<_> = self.views.write().await.drain().collect();
        for (_, view) in &drained {
            view.close();
        }
        if !drained.is_empty() {
            log::info!("Closed {} rental view(s)", drained.len());
        }
        drained.len()
    }

    pub async fn len(&self) -> usize {
        self.views.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.views.read().await.is_empty()
    }
}
