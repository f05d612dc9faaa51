//! Background tasks for the application.
//!
//! Call `spawn_all` once during startup to launch them.

use tokio::sync::broadcast::error::RecvError;

use crate::services::{AppState, RentalService};
use crate::storage::{SessionEvent, SessionStore};

/// Spawn all background tasks.
///
/// Notes
/// - The session listener reacts to explicit logouts and to 401s seen by the API client alike.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(session: SessionStore, rentals: RentalService, app_state: AppState) {
    // 会话失效：关闭所有租用视图、清空镜像、重置应用状态
    {
        let mut events = session.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::LoggedOut) => {
                        // 事件排队期间可能已重新登录，此时不能清掉新会话的状态
                        if session.is_authenticated().await {
                            log::debug!("Stale logout event ignored, a new session is active");
                            continue;
                        }
                        rentals.reset().await;
                        app_state.reset().await;
                        log::info!("Session ended, local state reset");
                    }
                    Ok(SessionEvent::LoggedIn) => log::debug!("Session started"),
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("Session listener lagged by {n} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}
