use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    beatstore_db::health_check(&pool).await.unwrap();

    for table in ["users", "user_sessions", "beats", "orders", "downloads"] {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// The `updated_at` trigger fires on every update.
#[sqlx::test(migrations = "./migrations")]
async fn test_updated_at_trigger(pool: PgPool) {
    sqlx::query(
        "INSERT INTO users (email, password_hash, name, updated_at)
         VALUES ('a@example.com', 'x', 'A', NOW() - INTERVAL '1 day')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("UPDATE users SET name = 'B' WHERE email = 'a@example.com'")
        .execute(&pool)
        .await
        .unwrap();

    let (fresh,): (bool,) = sqlx::query_as(
        "SELECT updated_at > NOW() - INTERVAL '1 minute' FROM users WHERE email = 'a@example.com'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(fresh);
}

/// Emails are stored lower-case only.
#[sqlx::test(migrations = "./migrations")]
async fn test_mixed_case_email_rejected(pool: PgPool) {
    let result = sqlx::query(
        "INSERT INTO users (email, password_hash, name) VALUES ('Mixed@Example.com', 'x', 'M')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}
