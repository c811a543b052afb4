use rand::SeedableRng;
use rand::rngs::StdRng;
use roster_api::import::{ImportConfig, ImportCoordinator, ImportError, Row, RunState};
use roster_api::models::NewUser;
use roster_api::store::MemoryImportStore;

const COMPANY: i64 = 7;

fn row(firstname: &str, lastname: &str, sex: &str, country: &str, email: &str) -> Row {
    [
        ("firstname", firstname),
        ("lastname", lastname),
        ("sex", sex),
        ("country", country),
        ("email", email),
    ]
    .into_iter()
    .collect()
}

fn store() -> MemoryImportStore {
    MemoryImportStore::new()
        .with_countries(["US", "DE", "FR"])
        .with_company(COMPANY)
}

fn importer(store: &MemoryImportStore, batch_size: usize) -> ImportCoordinator<MemoryImportStore> {
    ImportCoordinator::with_rng(
        store.clone(),
        COMPANY,
        ImportConfig::default().with_batch_size(batch_size),
        StdRng::seed_from_u64(42),
    )
    .expect("valid rules")
}

#[tokio::test]
async fn valid_row_creates_linked_user_with_generated_username() {
    let store = store();
    let mut importer = importer(&store, 1000);

    let summary = importer
        .run(vec![row("Ann", "Lee", "F", "US", "ann@x.com")])
        .await
        .expect("import completes");

    assert_eq!(summary.state, RunState::Completed);
    assert!(importer.failures().is_empty());

    let users = store.users();
    assert_eq!(users.len(), 1);
    let user = &users[0];
    let suffix: u32 = user
        .username
        .strip_prefix("AnnLee")
        .and_then(|s| s.parse().ok())
        .expect("username is AnnLee followed by a number");
    assert!(suffix <= 1000);
    assert_eq!(user.email, "ann@x.com");
    assert_eq!(user.country, "US");
    assert_eq!(store.links(), vec![(user.id, COMPANY)]);
}

#[tokio::test]
async fn invalid_sex_is_recorded_as_failure() {
    let store = store();
    let mut importer = importer(&store, 1000);

    let summary = importer
        .run(vec![row("Bob", "Ray", "X", "US", "bob@x.com")])
        .await
        .expect("import completes");

    assert_eq!(summary.stats.users_created, 0);
    assert_eq!(summary.stats.failed_rows, 1);
    assert!(store.users().is_empty());

    let failures = importer.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].row, 1);
    assert_eq!(failures[0].attribute, "sex");

    let entries = store.failed_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attribute, "sex");
    assert_eq!(entries[0].sex.as_deref(), Some("X"));
    assert_eq!(entries[0].email.as_deref(), Some("bob@x.com"));
}

#[tokio::test]
async fn existing_email_fails_uniqueness() {
    let store = store().with_user(NewUser {
        username: "AnnLee1".into(),
        firstname: "Ann".into(),
        lastname: "Lee".into(),
        sex: "F".into(),
        country: "US".into(),
        email: "ann@x.com".into(),
    });
    let mut importer = importer(&store, 1000);

    importer
        .run(vec![row("Ann", "Other", "F", "US", "ANN@x.com")])
        .await
        .expect("import completes");

    let failures = importer.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].attribute, "email");
    assert_eq!(failures[0].message, "The email has already been taken.");
    assert_eq!(store.users().len(), 1);
}

#[tokio::test]
async fn identical_names_receive_distinct_usernames() {
    let store = store();
    let mut importer = importer(&store, 1000);

    importer
        .run(vec![
            row("Ann", "Lee", "F", "US", "ann1@x.com"),
            row("Ann", "Lee", "F", "DE", "ann2@x.com"),
        ])
        .await
        .expect("import completes");

    let users = store.users();
    assert_eq!(users.len(), 2);
    assert_ne!(users[0].username, users[1].username);
    assert!(users.iter().all(|u| u.username.starts_with("AnnLee")));
}

#[tokio::test]
async fn duplicate_email_within_one_run_fails_second_row() {
    let store = store();
    let mut importer = importer(&store, 10);

    importer
        .run(vec![
            row("Ann", "Lee", "F", "US", "dup@x.com"),
            row("Bob", "Ray", "M", "US", "dup@x.com"),
        ])
        .await
        .expect("import completes");

    assert_eq!(store.users().len(), 1);
    assert_eq!(importer.failures().len(), 1);
    assert_eq!(importer.failures()[0].row, 2);
    assert_eq!(importer.failures()[0].attribute, "email");
}

#[tokio::test]
async fn batches_of_two_over_five_rows() {
    let store = store();
    let mut importer = importer(&store, 2);

    let rows = (1..=5)
        .map(|n| row("Cam", "Fox", "M", "FR", &format!("cam{n}@x.com")))
        .collect::<Vec<_>>();
    let summary = importer.run(rows).await.expect("import completes");

    assert_eq!(store.insert_batches(), vec![2, 2, 1]);
    assert_eq!(summary.stats.batches, 3);
    assert_eq!(summary.stats.users_created, 5);
    assert_eq!(summary.stats.company_links, 5);
}

#[tokio::test]
async fn batches_of_two_over_four_rows() {
    let store = store();
    let mut importer = importer(&store, 2);

    let rows = (1..=4)
        .map(|n| row("Cam", "Fox", "M", "FR", &format!("cam{n}@x.com")))
        .collect::<Vec<_>>();
    let summary = importer.run(rows).await.expect("import completes");

    assert_eq!(store.insert_batches(), vec![2, 2]);
    assert_eq!(summary.stats.batches, 2);
    assert_eq!(summary.stats.users_created, 4);
}

#[tokio::test]
async fn longest_valid_names_still_import() {
    let store = store();
    let mut importer = importer(&store, 1000);
    let first = "a".repeat(200);
    let last = "b".repeat(200);

    let summary = importer
        .run(vec![
            row("Ann", "Lee", "F", "US", "ann@x.com"),
            row(&first, &last, "F", "US", "long@x.com"),
            row("Bob", "Ray", "M", "US", "bob@x.com"),
        ])
        .await
        .expect("import completes");

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.stats.users_created, 3);
    assert!(importer.failures().is_empty());
    assert!(store.users().iter().all(|u| u.username.chars().count() <= 255));
}

#[tokio::test]
async fn every_row_has_exactly_one_outcome() {
    let store = store();
    let mut importer = importer(&store, 2);

    let rows = vec![
        row("Ann", "Lee", "F", "US", "a@x.com"),
        row("", "Lee", "F", "US", "b@x.com"),
        row("Cid", "Lee", "M", "ZZ", "c@x.com"),
        row("Dee", "Lee", "F", "DE", "d@x.com"),
        row("Eve", "Lee", "Q", "US", "not-an-email"),
    ];
    let summary = importer.run(rows).await.expect("import completes");

    assert_eq!(summary.stats.rows, 5);
    assert_eq!(summary.stats.users_created + summary.stats.failed_rows, 5);
    assert_eq!(summary.stats.users_created, 2);

    let mut failed_rows: Vec<usize> = importer.failures().iter().map(|f| f.row).collect();
    failed_rows.dedup();
    assert_eq!(failed_rows, vec![2, 3, 5]);

    // row 5 fails on two fields and gets one descriptor per field
    let row_five: Vec<&str> = importer
        .failures()
        .iter()
        .filter(|f| f.row == 5)
        .map(|f| f.attribute.as_str())
        .collect();
    assert_eq!(row_five, vec!["sex", "email"]);
    assert_eq!(importer.failures()[1].attribute, "country");
}

#[tokio::test]
async fn reimporting_same_bad_file_does_not_duplicate_failed_entries() {
    let store = store();
    let rows = vec![
        row("Bob", "Ray", "X", "US", "bob@x.com"),
        row("Cid", "Ray", "M", "ZZ", "cid@x.com"),
    ];

    let first = importer(&store, 10).run(rows.clone()).await.expect("first import");
    let second = importer(&store, 10).run(rows).await.expect("second import");

    assert_eq!(first.stats.failures_recorded, 2);
    assert_eq!(second.stats.failures_recorded, 0);
    assert_eq!(second.stats.failures_deduplicated, 2);
    assert_eq!(store.failed_entries().len(), 2);
}

#[tokio::test]
async fn empty_input_completes_without_writes() {
    let store = store();
    let mut importer = importer(&store, 10);

    let summary = importer.run(Vec::new()).await.expect("import completes");

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.stats.rows, 0);
    assert!(store.insert_batches().is_empty());
}

#[tokio::test]
async fn failed_batch_aborts_run_with_row_ids() {
    let store = store();
    store.fail_next_insert("connection reset");
    let mut importer = importer(&store, 2);

    let err = importer
        .run(vec![
            row("Ann", "Lee", "F", "US", "a@x.com"),
            row("Bob", "Lee", "M", "US", "b@x.com"),
            row("Cid", "Lee", "M", "US", "c@x.com"),
        ])
        .await
        .expect_err("first batch fails");

    match err {
        ImportError::BatchWrite { rows, .. } => assert_eq!(rows, vec![1, 2]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(importer.state(), RunState::Aborted);
    assert!(store.users().is_empty());
}
