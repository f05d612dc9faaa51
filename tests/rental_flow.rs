mod common;

use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

use dspice_client::AppError;
use dspice_client::models::{RentalKind, RentalStatus, UserProfile};
use dspice_client::tasks;
use dspice_client::watch::NO_CODE_FOUND;

#[tokio::test]
async fn close_moves_rental_to_inactive_once() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(200).json_body(common::number_history());
        })
        .await;
    let close = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/number/close/r1");
            then.status(200)
                .json_body(json!({"status": true, "message": "Rental closed"}));
        })
        .await;

    let ctx = common::build_context(&server)?;
    let rentals = &ctx.rental_service;

    let list = rentals.refresh(RentalKind::Number).await?;
    assert_eq!(list.active.len(), 1);
    assert_eq!(list.inactive.len(), 1);

    let err = rentals.close(RentalKind::Number, "r1", false).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(close.hits_async().await, 0);

    let closed = rentals.close(RentalKind::Number, "r1", true).await?;
    assert_eq!(closed.status, RentalStatus::Closed);

    let list = rentals.cached(RentalKind::Number).await;
    assert!(list.active.is_empty());
    assert_eq!(list.inactive.iter().filter(|r| r.id == "r1").count(), 1);

    let err = rentals.close(RentalKind::Number, "r1", true).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(close.hits_async().await, 1);
    Ok(())
}

#[tokio::test]
async fn reactivate_respects_cooldown() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(200).json_body(common::number_history());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/code/r2");
            then.status(200).json_body(json!({"status": true, "data": []}));
        })
        .await;
    let reactivate = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/number/reactivate/r2");
            then.status(200).json_body(json!({
                "status": true,
                "data": {
                    "id": "r2",
                    "number": "+2348022222222",
                    "expires_at": "2099-01-01 00:00:00",
                    "status": "active",
                    "can_reactivate": true
                }
            }));
        })
        .await;

    let ctx = common::build_context(&server)?;
    let rentals = &ctx.rental_service;

    // 未满足条件的租用不能重新激活
    let err = rentals.reactivate(RentalKind::Number, "r1").await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let response = rentals.reactivate(RentalKind::Number, "r2").await?;
    assert_eq!(response.rental.status, RentalStatus::Active);
    assert_eq!(response.cooldown_secs, 180);
    assert!(
        rentals
            .cached(RentalKind::Number)
            .await
            .active
            .iter()
            .any(|r| r.id == "r2")
    );
    assert!(ctx.registry.get(RentalKind::Number, "r2").await.is_some());

    let err = rentals.reactivate(RentalKind::Number, "r2").await.unwrap_err();
    assert!(matches!(err, AppError::RateLimited(_)));
    assert_eq!(reactivate.hits_async().await, 1);

    let left = rentals.cooldown_remaining(RentalKind::Number, "r2");
    assert!(left > 0 && left <= 180);

    rentals.reset().await;
    assert!(ctx.registry.is_empty().await);
    assert_eq!(rentals.cooldown_remaining(RentalKind::Number, "r2"), 0);
    Ok(())
}

#[tokio::test]
async fn failed_fetch_shows_no_code_note() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(200).json_body(common::number_history());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/code/r1");
            then.status(500).json_body(json!({"message": "provider timeout"}));
        })
        .await;

    let ctx = common::build_context(&server)?;
    let rentals = &ctx.rental_service;

    let snapshot = rentals.open_view(RentalKind::Number, "r1").await?;
    assert!(snapshot.remaining_secs > 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let snapshot = rentals.view_snapshot(RentalKind::Number, "r1").await?;
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.poll_note.as_deref(), Some(NO_CODE_FOUND));

    // 手动刷新的错误要返回给调用方
    let err = rentals.reload(RentalKind::Number, "r1").await.unwrap_err();
    assert!(matches!(err, AppError::ExternalApiError(_)));

    assert!(rentals.close_view(RentalKind::Number, "r1").await);
    assert!(rentals.view_snapshot(RentalKind::Number, "r1").await.is_err());
    Ok(())
}

#[tokio::test]
async fn unauthorized_response_resets_local_state() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let history = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(200).json_body(common::number_history());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/code/r1");
            then.status(200).json_body(json!({"status": true, "data": []}));
        })
        .await;

    let ctx = common::build_context(&server)?;
    ctx.session.save_login("tok-abc", json!({"id": 7})).await?;
    tasks::spawn_all(
        ctx.session.clone(),
        ctx.rental_service.clone(),
        ctx.app_state.clone(),
    );

    ctx.rental_service.open_view(RentalKind::Number, "r1").await?;
    assert_eq!(ctx.registry.len().await, 1);

    history.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(401).json_body(json!({"message": "Unauthenticated."}));
        })
        .await;

    let err = ctx
        .rental_service
        .refresh(RentalKind::Number)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AuthError(_)));
    assert!(!ctx.session.is_authenticated().await);

    let mut closed = false;
    for _ in 0..50 {
        if ctx.registry.is_empty().await {
            closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(closed, "views should close after the session ends");
    assert!(ctx.rental_service.cached(RentalKind::Number).await.active.is_empty());
    Ok(())
}

#[tokio::test]
async fn closing_rental_closes_its_open_view() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(200).json_body(common::number_history());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/code/r1");
            then.status(200).json_body(json!({"status": true, "data": []}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/number/close/r1");
            then.status(200).json_body(json!({"status": true}));
        })
        .await;

    let ctx = common::build_context(&server)?;
    let rentals = &ctx.rental_service;

    rentals.open_view(RentalKind::Number, "r1").await?;
    let view = ctx
        .registry
        .get(RentalKind::Number, "r1")
        .await
        .ok_or_else(|| anyhow::anyhow!("view should be open"))?;
    assert!(view.is_polling());

    rentals.close(RentalKind::Number, "r1", true).await?;
    assert!(ctx.registry.get(RentalKind::Number, "r1").await.is_none());
    assert!(view.is_closed());
    assert!(!view.is_polling());
    Ok(())
}

#[tokio::test]
async fn closing_timed_out_rental_reports_closed() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(200).json_body(json!({
                "status": true,
                "data": [{
                    "id": "r6",
                    "number": "+2348066666666",
                    "expires_at": "2020-01-01 00:00:00",
                    "status": "active"
                }]
            }));
        })
        .await;
    let close = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/number/close/r6");
            then.status(200).json_body(json!({"status": true}));
        })
        .await;

    let ctx = common::build_context(&server)?;
    let rentals = &ctx.rental_service;

    let closed = rentals.close(RentalKind::Number, "r6", true).await?;
    assert_eq!(closed.status, RentalStatus::Closed);
    assert!(!closed.can_reactivate);

    let list = rentals.cached(RentalKind::Number).await;
    assert!(list.active.is_empty());
    assert_eq!(list.inactive.len(), 1);
    assert_eq!(list.inactive[0].status, RentalStatus::Closed);

    let err = rentals.close(RentalKind::Number, "r6", true).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(close.hits_async().await, 1);
    Ok(())
}

#[tokio::test]
async fn reactivation_without_record_restarts_the_window() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/history");
            then.status(200).json_body(json!({
                "status": true,
                "data": [
                    {
                        "id": "r4",
                        "number": "+2348044444444",
                        "date": "2024-01-01 00:00:00",
                        "expires_at": "2024-01-01 00:10:00",
                        "status": "expired",
                        "can_reactivate": 1
                    },
                    {
                        "id": "r5",
                        "number": "+2348055555555",
                        "expires_at": "2024-01-01 00:10:00",
                        "status": "expired",
                        "can_reactivate": 1
                    }
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/number/code/r4");
            then.status(200).json_body(json!({"status": true, "data": []}));
        })
        .await;
    for id in ["r4", "r5"] {
        server
            .mock_async(|when, then| {
                when.method(POST).path(format!("/api/number/reactivate/{id}"));
                then.status(200)
                    .json_body(json!({"status": true, "message": "Reactivated"}));
            })
            .await;
    }

    let ctx = common::build_context(&server)?;
    let rentals = &ctx.rental_service;

    // 接口只回了消息：按原来 10 分钟的窗口从现在重新计时
    let response = rentals.reactivate(RentalKind::Number, "r4").await?;
    assert_eq!(response.rental.status, RentalStatus::Active);
    assert_eq!(response.rental.duration_secs, Some(600));

    let snapshot = rentals.view_snapshot(RentalKind::Number, "r4").await?;
    assert!(
        (590..=600).contains(&snapshot.remaining_secs),
        "remaining {}",
        snapshot.remaining_secs
    );
    assert!(snapshot.cooldown_remaining_secs > 0);
    assert!(
        rentals
            .cached(RentalKind::Number)
            .await
            .active
            .iter()
            .any(|r| r.id == "r4")
    );

    // 没有开始时间也没有时长，无法推算新的到期时间
    let err = rentals.reactivate(RentalKind::Number, "r5").await.unwrap_err();
    assert!(matches!(err, AppError::ExternalApiError(_)));
    assert!(
        !rentals
            .cached(RentalKind::Number)
            .await
            .active
            .iter()
            .any(|r| r.id == "r5")
    );
    assert!(ctx.registry.get(RentalKind::Number, "r5").await.is_none());
    assert!(rentals.cooldown_remaining(RentalKind::Number, "r5") > 0);
    Ok(())
}

#[tokio::test]
async fn stale_logout_event_keeps_new_session_state() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let ctx = common::build_context(&server)?;
    tasks::spawn_all(
        ctx.session.clone(),
        ctx.rental_service.clone(),
        ctx.app_state.clone(),
    );

    ctx.session.save_login("tok-old", json!({"id": 7})).await?;
    ctx.session.clear().await?;
    ctx.session.save_login("tok-new", json!({"id": 7})).await?;
    ctx.app_state
        .set_profile(UserProfile {
            name: "Ada".to_string(),
            ..UserProfile::default()
        })
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ctx.session.token().await.as_deref(), Some("tok-new"));
    assert_eq!(
        ctx.app_state.profile().await.map(|p| p.name).as_deref(),
        Some("Ada")
    );
    Ok(())
}
