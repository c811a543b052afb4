use rand::SeedableRng;
use rand::rngs::StdRng;
use roster_api::import::{ImportConfig, ImportCoordinator, Row, RunState, StoreError};
use roster_api::models::{NewFailedEntry, NewUser};
use roster_api::store::{ImportStore, PgImportStore};
use roster_api::test_support::{TestDatabase, TestDatabaseError, TestFixtures};

async fn provision(test: &str) -> Option<TestDatabase> {
    match TestDatabase::new_from_env().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping {test}: TEST_DATABASE_URL not set");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.into(),
        firstname: "Ann".into(),
        lastname: "Lee".into(),
        sex: "F".into(),
        country: "US".into(),
        email: email.into(),
    }
}

#[tokio::test]
async fn bulk_insert_returns_users_in_input_order() {
    let Some(test_db) = provision("bulk_insert_returns_users_in_input_order").await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures.insert_countries(&["US"]).await.expect("countries");
    let company = fixtures.insert_company("Acme").await.expect("company");
    let store = PgImportStore::new(test_db.pool_clone());

    let users = vec![
        new_user("zed1", "z@x.com"),
        new_user("amy2", "a@x.com"),
        new_user("kim3", "k@x.com"),
    ];
    let created = store.insert_users(&users, company).await.expect("insert");

    let names: Vec<&str> = created.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["zed1", "amy2", "kim3"]);
    assert!(created.iter().all(|u| u.created_at.is_some()));
    assert!(store.email_exists("Z@X.COM").await.expect("lookup"));
    assert_eq!(fixtures.count_rows("company_user").await.expect("count"), 3);

    test_db.close().await.expect("drop database");
}

#[tokio::test]
async fn bulk_insert_is_atomic_on_conflict() {
    let Some(test_db) = provision("bulk_insert_is_atomic_on_conflict").await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures.insert_countries(&["US"]).await.expect("countries");
    let company = fixtures.insert_company("Acme").await.expect("company");
    fixtures
        .insert_user("taken", "taken@x.com", "US")
        .await
        .expect("existing user");
    let store = PgImportStore::new(test_db.pool_clone());

    let err = store
        .insert_users(
            &[new_user("fresh", "fresh@x.com"), new_user("taken", "t2@x.com")],
            company,
        )
        .await
        .expect_err("username conflict");

    assert!(matches!(err, StoreError::Conflict { field: "username", .. }));
    assert_eq!(fixtures.count_rows("users").await.expect("count"), 1);

    test_db.close().await.expect("drop database");
}

#[tokio::test]
async fn link_failure_rolls_back_inserted_users() {
    let Some(test_db) = provision("link_failure_rolls_back_inserted_users").await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures.insert_countries(&["US"]).await.expect("countries");
    let store = PgImportStore::new(test_db.pool_clone());

    let err = store
        .insert_users(&[new_user("ann1", "a@x.com"), new_user("bob2", "b@x.com")], 404)
        .await
        .expect_err("no such company");

    assert!(matches!(err, StoreError::Database(_)));
    assert_eq!(fixtures.count_rows("users").await.expect("count"), 0);
    assert_eq!(fixtures.count_rows("company_user").await.expect("count"), 0);

    test_db.close().await.expect("drop database");
}

#[tokio::test]
async fn overlong_value_is_reported_not_truncated() {
    let Some(test_db) = provision("overlong_value_is_reported_not_truncated").await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures.insert_countries(&["US"]).await.expect("countries");
    let company = fixtures.insert_company("Acme").await.expect("company");
    let store = PgImportStore::new(test_db.pool_clone());

    let err = store
        .insert_users(&[new_user(&"u".repeat(300), "a@x.com")], company)
        .await
        .expect_err("username too long");

    assert!(matches!(err, StoreError::ValueTooLong { max: 255, .. }));
    assert_eq!(fixtures.count_rows("users").await.expect("count"), 0);

    test_db.close().await.expect("drop database");
}

#[tokio::test]
async fn failed_entry_first_or_create_is_idempotent() {
    let Some(test_db) = provision("failed_entry_first_or_create_is_idempotent").await else {
        return;
    };
    let store = PgImportStore::new(test_db.pool_clone());
    let entry = NewFailedEntry {
        row_id: 4,
        attribute: "sex".into(),
        error_msg: "The sex format is invalid.".into(),
        firstname: Some("Bob".into()),
        lastname: Some("Ray".into()),
        sex: Some("X".into()),
        email: None,
        country: Some("US".into()),
    };

    let (first, created) = store.first_or_create_failed_entry(&entry).await.expect("create");
    let (again, created_again) = store.first_or_create_failed_entry(&entry).await.expect("find");

    assert!(created);
    assert!(!created_again);
    assert_eq!(first.id, again.id);
    assert!(entry.matches(&again));

    test_db.close().await.expect("drop database");
}

#[tokio::test]
async fn coordinator_imports_into_postgres() {
    let Some(test_db) = provision("coordinator_imports_into_postgres").await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures.insert_countries(&["US", "DE"]).await.expect("countries");
    let company = fixtures.insert_company("Acme").await.expect("company");

    let rows: Vec<Row> = vec![
        [("firstname", "Ann"), ("lastname", "Lee"), ("sex", "F"), ("country", "US"), ("email", "ann@x.com")],
        [("firstname", "Bob"), ("lastname", "Ray"), ("sex", "X"), ("country", "US"), ("email", "bob@x.com")],
        [("firstname", "Cid"), ("lastname", "Orr"), ("sex", "M"), ("country", "DE"), ("email", "cid@x.com")],
    ]
    .into_iter()
    .map(|fields| fields.into_iter().collect())
    .collect();

    let mut importer = ImportCoordinator::with_rng(
        PgImportStore::new(test_db.pool_clone()),
        company,
        ImportConfig::default().with_batch_size(2),
        StdRng::seed_from_u64(1),
    )
    .expect("coordinator");
    let summary = importer.run(rows).await.expect("import");

    assert_eq!(summary.stats.users_created, 2);
    assert_eq!(summary.stats.failed_rows, 1);
    assert_eq!(fixtures.count_rows("users").await.expect("count"), 2);
    assert_eq!(fixtures.count_rows("company_user").await.expect("count"), 2);
    assert_eq!(fixtures.count_rows("failed_entries_users").await.expect("count"), 1);

    test_db.close().await.expect("drop database");
}

#[tokio::test]
async fn longest_valid_names_import_into_postgres() {
    let Some(test_db) = provision("longest_valid_names_import_into_postgres").await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures.insert_countries(&["US"]).await.expect("countries");
    let company = fixtures.insert_company("Acme").await.expect("company");

    let first = "a".repeat(200);
    let last = "a".repeat(200);
    let rows: Vec<Row> = vec![
        [("firstname", "Ann"), ("lastname", "Lee"), ("sex", "F"), ("country", "US"), ("email", "ann@x.com")],
        [("firstname", first.as_str()), ("lastname", last.as_str()), ("sex", "F"), ("country", "US"), ("email", "long@x.com")],
        [("firstname", "Bob"), ("lastname", "Ray"), ("sex", "M"), ("country", "US"), ("email", "bob@x.com")],
    ]
    .into_iter()
    .map(|fields| fields.into_iter().collect())
    .collect();

    let mut importer = ImportCoordinator::with_rng(
        PgImportStore::new(test_db.pool_clone()),
        company,
        ImportConfig::default(),
        StdRng::seed_from_u64(2),
    )
    .expect("coordinator");
    let summary = importer.run(rows).await.expect("import");

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.stats.users_created, 3);
    assert!(importer.failures().is_empty());
    assert_eq!(fixtures.count_rows("users").await.expect("count"), 3);
    assert_eq!(fixtures.count_rows("company_user").await.expect("count"), 3);

    test_db.close().await.expect("drop database");
}
