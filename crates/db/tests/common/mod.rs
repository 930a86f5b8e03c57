//! Row builders shared by the repository tests.

#![allow(dead_code)]

use beatstore_core::access::{generate_guest_token, generate_order_number, guest_expiry};
use beatstore_core::licensing::{License, LicenseTier};
use beatstore_core::locale::Locale;
use beatstore_core::types::DbId;
use beatstore_db::models::beat::{Beat, CreateBeat, Waveform};
use beatstore_db::models::order::{CreateOrder, GuestAccess, Order, OrderItem};
use beatstore_db::models::status::OrderStatus;
use beatstore_db::models::user::{CreateUser, User};
use beatstore_db::repositories::{BeatRepo, OrderRepo, UserRepo};
use chrono::Utc;
use sqlx::PgPool;

pub fn license(tier: LicenseTier, price: i64) -> License {
    License {
        tier,
        price,
        is_available: true,
        features: tier.default_features(),
    }
}

pub async fn create_beat(pool: &PgPool, title: &str, genres: &[&str], bpm: i32) -> Beat {
    let id = BeatRepo::reserve_id(pool).await.unwrap();
    BeatRepo::create(
        pool,
        &CreateBeat {
            id,
            title: title.to_string(),
            bpm,
            musical_key: "A minor".to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            moods: vec!["dark".to_string()],
            tags: vec!["808".to_string()],
            preview_key: format!("previews/{id}/p.mp3"),
            cover_key: format!("covers/{id}/c.jpg"),
            mp3_key: Some(format!("beats/{id}/mp3/a.mp3")),
            wav_key: Some(format!("beats/{id}/wav/a.wav")),
            stems_key: Some(format!("beats/{id}/stems/a.zip")),
            waveform: Waveform::default(),
            licenses: vec![
                license(LicenseTier::Basic, 2900),
                license(LicenseTier::Pro, 9900),
            ],
        },
    )
    .await
    .unwrap()
}

pub async fn create_user(pool: &PgPool, email: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Buyer".to_string(),
            role: "user".to_string(),
        },
    )
    .await
    .unwrap()
}

fn item(beat: &Beat) -> OrderItem {
    OrderItem {
        beat_id: beat.id,
        beat_title: beat.title.clone(),
        license_tier: LicenseTier::Basic,
        price: 2900,
    }
}

pub fn user_order(session_id: &str, user_id: DbId, beat: &Beat) -> CreateOrder {
    CreateOrder {
        order_number: generate_order_number(Utc::now()),
        user_id: Some(user_id),
        items: vec![item(beat)],
        total_amount: 2900,
        currency: "usd".to_string(),
        payment_intent_id: Some(format!("pi_{session_id}")),
        checkout_session_id: session_id.to_string(),
        status: OrderStatus::Completed,
        delivery_email: "buyer@example.com".to_string(),
        guest: None,
        locale: Locale::En,
    }
}

pub fn guest_order(session_id: &str, beat: &Beat) -> CreateOrder {
    CreateOrder {
        user_id: None,
        delivery_email: "fan@example.com".to_string(),
        guest: Some(GuestAccess {
            email: "fan@example.com".to_string(),
            token: generate_guest_token(),
            expires_at: guest_expiry(Utc::now()),
        }),
        ..user_order(session_id, 0, beat)
    }
}

pub async fn insert_order(pool: &PgPool, input: &CreateOrder) -> Order {
    OrderRepo::create(pool, input).await.unwrap().unwrap()
}
