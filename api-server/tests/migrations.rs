use roster_api::database::MIGRATOR;
use roster_api::test_support::{TestDatabase, TestDatabaseError};

async fn table_count(pool: &sqlx::PgPool, table: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public' AND table_name = $1",
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .expect("lookup succeeded")
}

#[tokio::test]
async fn migrations_apply_and_revert_cleanly() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping migration revert test: TEST_DATABASE_URL not set");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();
    let tables = [
        "countries",
        "companies",
        "users",
        "company_user",
        "failed_entries_users",
    ];

    for table in tables {
        assert_eq!(table_count(&pool, table).await, 1, "{table} should exist");
    }

    MIGRATOR.undo(&pool, 0).await.expect("migrations revert");
    for table in tables {
        assert_eq!(table_count(&pool, table).await, 0, "{table} should be dropped");
    }

    MIGRATOR.run(&pool).await.expect("migrations rerun");
    assert_eq!(table_count(&pool, "users").await, 1);

    test_db.close().await.expect("failed to drop test database");
}
