#![allow(dead_code)]

use httpmock::MockServer;
use serde_json::{Value, json};
use std::sync::Arc;

use dspice_client::{AppContext, Config, storage::LocalStore, utils::SystemClock};

pub fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.url("/api");
    config.api.legacy_base_url = server.url("/legacy");
    config.api.timeout_secs = 5;
    config
}

pub fn build_context(server: &MockServer) -> anyhow::Result<AppContext> {
    let ctx = AppContext::build(
        &test_config(server),
        LocalStore::in_memory(),
        Arc::new(SystemClock),
    )?;
    Ok(ctx)
}

/// One live rental (r1) and one expired but reactivatable rental (r2).
pub fn number_history() -> Value {
    json!({
        "status": true,
        "data": [
            {
                "id": "r1",
                "number": "+2348011111111",
                "expires_at": "2099-01-01 00:00:00",
                "status": "active",
                "service": "WhatsApp",
                "can_reactivate": 0
            },
            {
                "id": "r2",
                "number": "+2348022222222",
                "expires_at": "2020-01-01 00:00:00",
                "status": "expired",
                "service": "Telegram",
                "can_reactivate": 1
            }
        ]
    })
}
