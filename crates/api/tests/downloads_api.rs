mod common;

use axum::http::header::CACHE_CONTROL;
use axum::http::StatusCode;
use beatstore_core::licensing::LicenseTier;
use beatstore_core::roles::ROLE_USER;
use beatstore_db::repositories::{DownloadRepo, OrderRepo};
use common::{
    build_test_app, completed_event, create_beat, create_user, expect_status, license,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn account_downloads_are_signed_for_the_owner(pool: PgPool) {
    let user = create_user(&pool, "dana@example.com", ROLE_USER).await;
    let other = create_user(&pool, "eve@example.com", ROLE_USER).await;
    let beat = create_beat(&pool, "Night Drive", vec![license(LicenseTier::Basic, 2900)]).await;
    let app = build_test_app(pool.clone());
    app.put_beat_files(&beat).await;
    let token = app.token_for(&user);

    app.post_json(
        "/api/v1/checkout",
        Some(&token),
        json!({ "items": [{ "beat_id": beat.id, "tier": "basic" }] }),
    )
    .await;
    expect_status(app.webhook(completed_event(&app, 1)).await, StatusCode::OK).await;

    let json = expect_status(app.get("/api/v1/downloads", Some(&token)).await, StatusCode::OK).await;
    let grants = json["data"].as_array().unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0]["files"], json!(["mp3", "contract"]));
    assert_eq!(grants[0]["is_expired"], false);
    assert!(grants[0].get("mp3_key").is_none());
    let id = grants[0]["id"].as_i64().unwrap();

    let response = app
        .get(&format!("/api/v1/downloads/{id}/mp3"), Some(&token))
        .await;
    assert_eq!(response.headers()[CACHE_CONTROL], "private, max-age=900");
    let json = expect_status(response, StatusCode::OK).await;
    assert!(json["url"]
        .as_str()
        .unwrap()
        .starts_with(&format!("memory://beats/{}/mp3/", beat.id)));
    assert_eq!(json["filename"], "Night_Drive-basic.mp3");
    assert_eq!(json["expires_in_secs"], 900);

    let contract = app
        .get(&format!("/api/v1/downloads/{id}/contract"), Some(&token))
        .await;
    expect_status(contract, StatusCode::OK).await;

    expect_status(
        app.get(&format!("/api/v1/downloads/{id}/wav"), Some(&token)).await,
        StatusCode::NOT_FOUND,
    )
    .await;
    expect_status(
        app.get(&format!("/api/v1/downloads/{id}/flac"), Some(&token)).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    expect_status(
        app.get(&format!("/api/v1/downloads/{id}/mp3"), None).await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    expect_status(
        app.get(
            &format!("/api/v1/downloads/{id}/mp3"),
            Some(&app.token_for(&other)),
        )
        .await,
        StatusCode::FORBIDDEN,
    )
    .await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn guest_link_allows_three_downloads(pool: PgPool) {
    let beat = create_beat(&pool, "Night Drive", vec![license(LicenseTier::Basic, 2900)]).await;
    let app = build_test_app(pool.clone());
    app.put_beat_files(&beat).await;

    app.post_json(
        "/api/v1/checkout",
        None,
        json!({
            "items": [{ "beat_id": beat.id, "tier": "basic" }],
            "email": "fan@example.com",
        }),
    )
    .await;
    expect_status(app.webhook(completed_event(&app, 1)).await, StatusCode::OK).await;

    let order = OrderRepo::find_by_checkout_session(&pool, "cs_http_1")
        .await
        .unwrap()
        .unwrap();
    assert!(order.is_guest_order);
    assert!(DownloadRepo::list_for_order(&pool, order.id)
        .await
        .unwrap()
        .is_empty());
    let token = order.guest_download_token.clone().unwrap();
    let uri = format!("/api/v1/guest-downloads/{token}");

    let json = expect_status(app.get(&uri, None).await, StatusCode::OK).await;
    assert_eq!(json["data"]["order_number"], order.order_number);
    assert_eq!(json["data"]["remaining"], 3);
    assert_eq!(json["data"]["items"][0]["files"], json!(["mp3", "contract"]));

    let request = json!({ "beat_id": beat.id, "file": "mp3" });
    for expected_count in 1..=3 {
        if expected_count == 2 {
            // Viewing never consumes a download.
            let json = expect_status(app.get(&uri, None).await, StatusCode::OK).await;
            assert_eq!(json["data"]["download_count"], 1);
        }
        let response = app.post_json(&uri, None, request.clone()).await;
        assert_eq!(response.headers()[CACHE_CONTROL], "private, max-age=900");
        let json = expect_status(response, StatusCode::OK).await;
        assert_eq!(json["download_count"], expected_count);
        assert_eq!(json["remaining"], 3 - expected_count);
        assert!(json["url"].as_str().unwrap().starts_with("memory://"));
    }

    let response = app.post_json(&uri, None, request).await;
    let json = expect_status(response, StatusCode::TOO_MANY_REQUESTS).await;
    assert_eq!(json["code"], "QUOTA_EXCEEDED");
    let json = expect_status(app.get(&uri, None).await, StatusCode::TOO_MANY_REQUESTS).await;
    assert_eq!(json["code"], "QUOTA_EXCEEDED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_guest_token_is_not_found(pool: PgPool) {
    let app = build_test_app(pool);
    expect_status(
        app.get("/api/v1/guest-downloads/not-a-token", None).await,
        StatusCode::NOT_FOUND,
    )
    .await;
    let response = app
        .post_json(
            "/api/v1/guest-downloads/not-a-token",
            None,
            json!({ "beat_id": 1, "file": "mp3" }),
        )
        .await;
    expect_status(response, StatusCode::NOT_FOUND).await;
}
