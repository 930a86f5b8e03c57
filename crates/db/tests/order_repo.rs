mod common;

use beatstore_core::access::{grant_expiry, GUEST_DOWNLOAD_LIMIT};
use beatstore_core::licensing::{EntitledFiles, LicenseTier};
use beatstore_db::models::download::CreateDownload;
use beatstore_db::models::status::OrderStatus;
use beatstore_db::repositories::{DownloadRepo, OrderRepo, UserRepo};
use chrono::Utc;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn second_insert_for_same_session_is_ignored(pool: PgPool) {
    let beat = common::create_beat(&pool, "Night Drive", &["trap"], 140).await;
    let user = common::create_user(&pool, "buyer@example.com").await;

    let first = common::insert_order(&pool, &common::user_order("cs_1", user.id, &beat)).await;
    let again = OrderRepo::create(&pool, &common::user_order("cs_1", user.id, &beat))
        .await
        .unwrap();
    assert!(again.is_none());

    let found = OrderRepo::find_by_checkout_session(&pool, "cs_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);
    assert_eq!(found.status().unwrap(), OrderStatus::Completed);
    assert_eq!(found.items.0[0].price, 2900);
}

#[sqlx::test(migrations = "./migrations")]
async fn guest_counter_stops_at_limit(pool: PgPool) {
    let beat = common::create_beat(&pool, "Night Drive", &["trap"], 140).await;
    let order = common::insert_order(&pool, &common::guest_order("cs_guest", &beat)).await;
    let token = order.guest_download_token.clone().unwrap();

    for expected in 1..=GUEST_DOWNLOAD_LIMIT {
        let count = OrderRepo::consume_guest_download(&pool, &token, GUEST_DOWNLOAD_LIMIT)
            .await
            .unwrap();
        assert_eq!(count, Some(expected));
    }
    let refused = OrderRepo::consume_guest_download(&pool, &token, GUEST_DOWNLOAD_LIMIT)
        .await
        .unwrap();
    assert_eq!(refused, None);

    let state = OrderRepo::guest_token_state(&pool, &token).await.unwrap().unwrap();
    assert_eq!(state.guest_download_count, GUEST_DOWNLOAD_LIMIT);
}

#[sqlx::test(migrations = "./migrations")]
async fn refund_ends_guest_link_and_user_grants(pool: PgPool) {
    let beat = common::create_beat(&pool, "Night Drive", &["trap"], 140).await;
    let user = common::create_user(&pool, "buyer@example.com").await;

    let guest = common::insert_order(&pool, &common::guest_order("cs_g", &beat)).await;
    let refunded = OrderRepo::mark_refunded(&pool, guest.id).await.unwrap().unwrap();
    assert_eq!(refunded.status, "refunded");
    assert!(refunded.guest_download_expires_at.unwrap() <= Utc::now());
    let token = guest.guest_download_token.unwrap();
    assert_eq!(
        OrderRepo::consume_guest_download(&pool, &token, GUEST_DOWNLOAD_LIMIT)
            .await
            .unwrap(),
        None
    );

    let order = common::insert_order(&pool, &common::user_order("cs_u", user.id, &beat)).await;
    DownloadRepo::create(
        &pool,
        &CreateDownload {
            order_id: order.id,
            user_id: user.id,
            beat_id: beat.id,
            beat_title: beat.title.clone(),
            license_tier: LicenseTier::Basic,
            expires_at: grant_expiry(Utc::now()),
            files: EntitledFiles {
                mp3: beat.mp3_key.clone(),
                ..Default::default()
            },
        },
    )
    .await
    .unwrap()
    .unwrap();

    OrderRepo::mark_refunded(&pool, order.id).await.unwrap();
    assert_eq!(DownloadRepo::expire_for_order(&pool, order.id).await.unwrap(), 1);
    let grants = DownloadRepo::list_for_order(&pool, order.id).await.unwrap();
    assert!(grants.iter().all(|g| g.expires_at <= Utc::now()));
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_grant_for_order_item_is_ignored(pool: PgPool) {
    let beat = common::create_beat(&pool, "Night Drive", &["trap"], 140).await;
    let user = common::create_user(&pool, "buyer@example.com").await;
    let order = common::insert_order(&pool, &common::user_order("cs_d", user.id, &beat)).await;

    let input = CreateDownload {
        order_id: order.id,
        user_id: user.id,
        beat_id: beat.id,
        beat_title: beat.title.clone(),
        license_tier: LicenseTier::Basic,
        expires_at: grant_expiry(Utc::now()),
        files: EntitledFiles::default(),
    };
    assert!(DownloadRepo::create(&pool, &input).await.unwrap().is_some());
    assert!(DownloadRepo::create(&pool, &input).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn purchases_are_appended_once(pool: PgPool) {
    let user = common::create_user(&pool, "buyer@example.com").await;
    assert!(UserRepo::append_purchase(&pool, user.id, 42).await.unwrap());
    assert!(!UserRepo::append_purchase(&pool, user.id, 42).await.unwrap());

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.purchases, vec![42]);
}

#[sqlx::test(migrations = "./migrations")]
async fn exclusive_sale_is_found_until_refunded(pool: PgPool) {
    let beat = common::create_beat(&pool, "Night Drive", &["trap"], 140).await;
    let user = common::create_user(&pool, "buyer@example.com").await;

    common::insert_order(&pool, &common::user_order("cs_basic", user.id, &beat)).await;
    assert!(!OrderRepo::has_exclusive_sale(&pool, beat.id).await.unwrap());

    let mut input = common::user_order("cs_exclusive", user.id, &beat);
    input.items[0].license_tier = LicenseTier::Exclusive;
    input.items[0].price = 49900;
    let order = common::insert_order(&pool, &input).await;
    assert!(OrderRepo::has_exclusive_sale(&pool, beat.id).await.unwrap());
    assert!(!OrderRepo::has_exclusive_sale(&pool, beat.id + 1).await.unwrap());

    OrderRepo::mark_refunded(&pool, order.id).await.unwrap();
    assert!(!OrderRepo::has_exclusive_sale(&pool, beat.id).await.unwrap());
}
