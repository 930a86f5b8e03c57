mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use beatstore_core::licensing::LicenseTier;
use beatstore_core::roles::{ROLE_ADMIN, ROLE_USER};
use beatstore_db::repositories::BeatRepo;
use common::{
    build_test_app, completed_event, create_beat, create_user, expect_status, license, TestApp,
};
use serde_json::json;
use sqlx::PgPool;

const BOUNDARY: &str = "beatstore-test-boundary";

/// Hand-built `multipart/form-data` body.
struct Form {
    body: Vec<u8>,
}

impl Form {
    fn new() -> Self {
        Self { body: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

fn metadata() -> String {
    json!({
        "title": "  Night Drive ",
        "bpm": 140,
        "musical_key": "F minor",
        "genres": ["Trap", "trap", " Drill "],
        "moods": ["Dark"],
        "licenses": [
            license(LicenseTier::Basic, 2900),
            license(LicenseTier::Pro, 9900),
        ],
    })
    .to_string()
}

fn full_form() -> Form {
    Form::new()
        .text("metadata", &metadata())
        .file("preview", "preview.mp3", b"preview")
        .file("cover", "cover art.jpg", b"cover")
        .file("mp3", "full.mp3", b"mp3")
        .file("wav", "full.wav", b"wav")
}

async fn upload(app: &TestApp, token: &str, body: Vec<u8>) -> axum::response::Response {
    let request = Request::post("/api/v1/admin/beats")
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.send(request).await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_routes_require_the_admin_role(pool: PgPool) {
    let user = create_user(&pool, "dana@example.com", ROLE_USER).await;
    let app = build_test_app(pool);

    expect_status(app.get("/api/v1/admin/beats", None).await, StatusCode::UNAUTHORIZED).await;
    expect_status(
        app.get("/api/v1/admin/beats", Some(&app.token_for(&user))).await,
        StatusCode::FORBIDDEN,
    )
    .await;
    expect_status(
        app.get("/api/v1/admin/orders", Some(&app.token_for(&user))).await,
        StatusCode::FORBIDDEN,
    )
    .await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_stores_every_file_and_normalizes_labels(pool: PgPool) {
    let admin = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = build_test_app(pool);
    let token = app.token_for(&admin);

    let body = full_form().file("stems", "stems.zip", b"stems").finish();
    let json = expect_status(upload(&app, &token, body).await, StatusCode::CREATED).await;
    let beat = &json["data"];
    let id = beat["id"].as_i64().unwrap();

    assert_eq!(beat["title"], "Night Drive");
    assert_eq!(beat["genres"], json!(["trap", "drill"]));
    assert_eq!(beat["moods"], json!(["dark"]));
    assert_eq!(beat["is_active"], true);
    assert_eq!(beat["cover_key"], format!("covers/{id}/cover_art.jpg"));
    assert_eq!(beat["stems_key"], format!("beats/{id}/stems/stems.zip"));

    assert_eq!(
        app.storage.keys(),
        vec![
            format!("beats/{id}/mp3/full.mp3"),
            format!("beats/{id}/stems/stems.zip"),
            format!("beats/{id}/wav/full.wav"),
            format!("covers/{id}/cover_art.jpg"),
            format!("previews/{id}/preview.mp3"),
        ]
    );
    let cover = app.storage.get(&format!("covers/{id}/cover_art.jpg")).unwrap();
    assert_eq!(cover.content_type, "image/jpeg");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn incomplete_upload_stores_nothing(pool: PgPool) {
    let admin = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = build_test_app(pool.clone());
    let token = app.token_for(&admin);

    let json = expect_status(
        upload(&app, &token, full_form().finish()).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert!(json["error"].as_str().unwrap().contains("stems"));
    assert!(app.storage.keys().is_empty());

    let bad_bpm = json!({
        "title": "Night Drive",
        "bpm": 0,
        "musical_key": "F minor",
        "licenses": [license(LicenseTier::Basic, 2900)],
    })
    .to_string();
    let body = Form::new()
        .text("metadata", &bad_bpm)
        .file("preview", "p.mp3", b"p")
        .file("cover", "c.jpg", b"c")
        .file("mp3", "a.mp3", b"a")
        .file("wav", "a.wav", b"a")
        .file("stems", "a.zip", b"a")
        .finish();
    expect_status(upload(&app, &token, body).await, StatusCode::BAD_REQUEST).await;
    assert!(app.storage.keys().is_empty());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM beats")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn update_replaces_metadata(pool: PgPool) {
    let admin = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let beat = create_beat(&pool, "Night Drive", vec![license(LicenseTier::Basic, 2900)]).await;
    let app = build_test_app(pool.clone());
    let token = app.token_for(&admin);

    let response = app
        .json_request(
            "PUT",
            &format!("/api/v1/admin/beats/{}", beat.id),
            Some(&token),
            json!({
                "title": "Night Drive (Remix)",
                "bpm": 150,
                "musical_key": "G minor",
                "genres": ["Drill"],
                "licenses": [license(LicenseTier::Basic, 3900)],
                "is_active": true,
            }),
        )
        .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["bpm"], 150);
    assert_eq!(json["data"]["genres"], json!(["drill"]));

    let stored = BeatRepo::find_by_id(&pool, beat.id).await.unwrap().unwrap();
    assert_eq!(stored.licenses.0[0].price, 3900);
    assert_eq!(stored.mp3_key, beat.mp3_key);

    let missing = app
        .json_request(
            "PUT",
            "/api/v1/admin/beats/999999",
            Some(&token),
            json!({
                "title": "Ghost",
                "bpm": 100,
                "musical_key": "C",
                "licenses": [license(LicenseTier::Basic, 100)],
                "is_active": true,
            }),
        )
        .await;
    expect_status(missing, StatusCode::NOT_FOUND).await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn sold_exclusive_cannot_be_reactivated(pool: PgPool) {
    let admin = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let buyer = create_user(&pool, "dana@example.com", ROLE_USER).await;
    let beat = create_beat(
        &pool,
        "Night Drive",
        vec![license(LicenseTier::Exclusive, 49900)],
    )
    .await;
    let app = build_test_app(pool.clone());
    let token = app.token_for(&admin);

    let response = app
        .post_json(
            "/api/v1/checkout",
            Some(&app.token_for(&buyer)),
            json!({ "items": [{ "beat_id": beat.id, "tier": "exclusive" }] }),
        )
        .await;
    expect_status(response, StatusCode::OK).await;
    expect_status(app.webhook(completed_event(&app, 1)).await, StatusCode::OK).await;

    let update = |is_active: bool| {
        json!({
            "title": "Night Drive",
            "bpm": 140,
            "musical_key": "F minor",
            "licenses": [license(LicenseTier::Exclusive, 49900)],
            "is_active": is_active,
        })
    };
    let uri = format!("/api/v1/admin/beats/{}", beat.id);

    let json = expect_status(
        app.json_request("PUT", &uri, Some(&token), update(true)).await,
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(json["code"], "CONFLICT");
    let stored = BeatRepo::find_by_id(&pool, beat.id).await.unwrap().unwrap();
    assert!(!stored.is_active);

    expect_status(
        app.json_request("PUT", &uri, Some(&token), update(false)).await,
        StatusCode::OK,
    )
    .await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_retires_the_beat(pool: PgPool) {
    let admin = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let beat = create_beat(&pool, "Night Drive", vec![license(LicenseTier::Basic, 2900)]).await;
    let app = build_test_app(pool);
    let token = app.token_for(&admin);

    let request = Request::delete(format!("/api/v1/admin/beats/{}", beat.id))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::NO_CONTENT);

    expect_status(
        app.get(&format!("/api/v1/beats/{}", beat.id), None).await,
        StatusCode::NOT_FOUND,
    )
    .await;

    let json = expect_status(
        app.get(&format!("/api/v1/admin/beats/{}", beat.id), Some(&token))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["is_active"], false);

    let json = expect_status(
        app.get("/api/v1/admin/beats?status=inactive", Some(&token))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["total"], 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_order_filters_are_validated(pool: PgPool) {
    let admin = create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = build_test_app(pool);
    let token = app.token_for(&admin);

    expect_status(
        app.get("/api/v1/admin/orders?status=shipped", Some(&token)).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    let json = expect_status(
        app.get("/api/v1/admin/orders?status=completed", Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"], json!([]));
}
