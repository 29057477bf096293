use inbox_insights::config::DatabaseConfig;
use inbox_insights::db::ConnectionState;
use inbox_insights::models::{Category, Priority, YesNo};
use inbox_insights::schema::EmailRecordInput;
use inbox_insights::store::{EmailStore, RECENT_LIMIT, StoreError};
use inbox_insights::test_support::{TestDatabase, TestDatabaseError};

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new_from_env().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping postgres store test: no postgres available ({err})");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn input(subject: &str, from: &str) -> EmailRecordInput {
    EmailRecordInput {
        subject: Some(subject.to_string()),
        from: Some(from.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn persists_and_lists_newest_first() {
    let Some(test_db) = provision().await else {
        return;
    };
    let store = EmailStore::postgres(DatabaseConfig::from_options(test_db.connect_options()));
    assert_eq!(store.connection_state(), ConnectionState::Unconnected);

    let saved = store
        .save(EmailRecordInput {
            priority: Some("High".into()),
            category: Some("Finance".into()),
            action_required: Some("Yes".into()),
            important_entities: Some(vec!["Q3".into()]),
            deadline: Some("end of week".into()),
            ..input("Budget review", "cfo@co.com")
        })
        .await
        .expect("first save succeeds");
    assert_eq!(store.connection_state(), ConnectionState::Connected);
    assert_eq!(saved.priority, Priority::High);
    assert_eq!(saved.category, Category::Finance);
    assert_eq!(saved.action_required, YesNo::Yes);
    assert_eq!(saved.is_meeting, YesNo::No);
    assert_eq!(saved.created_at, saved.updated_at);

    store
        .save(input("Lunch", "alice@example.com"))
        .await
        .expect("second save succeeds");

    let recent = store.recent().await.expect("query succeeds");
    let subjects: Vec<_> = recent.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Lunch", "Budget review"]);
    assert_eq!(recent[1].id, saved.id);
    assert_eq!(recent[1].important_entities, vec!["Q3"]);
    assert_eq!(recent[1].deadline.as_deref(), Some("end of week"));

    store.close().await;
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn rejects_invalid_records_without_writing() {
    let Some(test_db) = provision().await else {
        return;
    };
    let store = EmailStore::postgres(DatabaseConfig::from_options(test_db.connect_options()));

    let err = store
        .save(EmailRecordInput {
            sentiment: Some("Ecstatic".into()),
            ..input("Party", "fun@co.com")
        })
        .await
        .expect_err("invalid sentiment is rejected");
    assert!(matches!(err, StoreError::Validation(_)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_records")
        .fetch_one(test_db.pool())
        .await
        .expect("count succeeds");
    assert_eq!(count, 0);

    store.close().await;
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn recent_is_capped() {
    let Some(test_db) = provision().await else {
        return;
    };

    sqlx::query(
        "INSERT INTO email_records (subject, sender) SELECT 'bulk ' || n, 'bulk@co.com' FROM generate_series(1, $1) AS n",
    )
    .bind((RECENT_LIMIT + 10) as i32)
    .execute(test_db.pool())
    .await
    .expect("bulk insert succeeds");

    let store = EmailStore::postgres(DatabaseConfig::from_options(test_db.connect_options()));
    let recent = store.recent().await.expect("query succeeds");
    assert_eq!(recent.len() as i64, RECENT_LIMIT);
    assert_eq!(recent[0].subject, format!("bulk {}", RECENT_LIMIT + 10));

    store.close().await;
    test_db.close().await.expect("failed to drop test database");
}
