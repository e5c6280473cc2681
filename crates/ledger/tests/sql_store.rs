use std::time::Duration;

use sea_orm::{Database, DatabaseConnection};
use serde_json::json;
use tokio::sync::mpsc;

use ledger::{
    Accounts, AuthError, AuthProvider, CollectionPath, Fields, Ledger, OrderBy, RemoteStore,
    Session, SqlStore, TransactionDraft,
};
use migration::MigratorTrait;

async fn migrated_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn store_with_db() -> (SqlStore, DatabaseConnection) {
    let db = migrated_db().await;
    let store = SqlStore::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (store, db)
}

fn accounts(db: DatabaseConnection) -> Accounts {
    // Lowest bcrypt cost keeps the tests fast.
    Accounts::builder().database(db).cost(4).build()
}

fn fields(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn documents_round_trip_through_the_database() {
    let (store, _db) = store_with_db().await;
    let path = CollectionPath::new("users/u1/transactions");

    let id = store
        .create(&path, fields(json!({"amount": "10", "date": 2, "tags": ["a"]})))
        .await
        .unwrap();
    store
        .set(&path, "fixed", fields(json!({"amount": "3", "date": 5})))
        .await
        .unwrap();

    let listed = store
        .list(&path, &OrderBy::descending("date"))
        .await
        .unwrap();
    let ids: Vec<&str> = listed.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["fixed", id.as_str()]);

    store
        .merge(&path, &id, fields(json!({"amount": "12"})))
        .await
        .unwrap();
    let merged = store.read(&path, &id).await.unwrap().unwrap();
    assert_eq!(merged.fields.get("amount"), Some(&json!("12")));
    assert_eq!(merged.fields.get("tags"), Some(&json!(["a"])));

    store.delete(&path, &id).await.unwrap();
    store.delete(&path, &id).await.unwrap();
    assert!(store.read(&path, &id).await.unwrap().is_none());
}

#[tokio::test]
async fn collections_are_kept_apart() {
    let (store, _db) = store_with_db().await;
    let live = CollectionPath::transactions("u1");
    let other = CollectionPath::transactions("u2");

    store
        .set(&live, "same-id", fields(json!({"n": 1})))
        .await
        .unwrap();
    store
        .set(&other, "same-id", fields(json!({"n": 2})))
        .await
        .unwrap();

    let doc = store.read(&other, "same-id").await.unwrap().unwrap();
    assert_eq!(doc.fields.get("n"), Some(&json!(2)));
    assert_eq!(
        store
            .list(&live, &OrderBy::ascending("n"))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn ledger_runs_on_the_sql_store() {
    let (store, db) = store_with_db().await;
    let accounts = accounts(db);
    accounts
        .sign_up("alice@example.com", "secret1", Some("Alice"))
        .await
        .unwrap();
    let session = Session::require(&accounts).unwrap();
    let ledger = Ledger::new(store);

    let (views, mut received) = mpsc::unbounded_channel();
    let _subscription = ledger.subscribe(&session, move |view| {
        let _ = views.send(view);
    });

    let id = ledger
        .upsert(&session, &TransactionDraft::new("income", "salary", "1000"), false)
        .await
        .unwrap();

    let view = loop {
        let view = tokio::time::timeout(Duration::from_secs(2), received.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if !view.transactions.is_empty() {
            break view;
        }
    };
    assert_eq!(view.transactions[0].id, id);

    ledger.soft_delete(&session, &id).await.unwrap();
    assert!(ledger.snapshot(&session).await.unwrap().transactions.is_empty());
    assert_eq!(ledger.archive_snapshot(&session).await.unwrap().len(), 1);
}

#[tokio::test]
async fn poller_notices_writes_from_another_store() {
    let db = migrated_db().await;
    let writer = SqlStore::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let watcher = SqlStore::builder()
        .database(db)
        .poll_interval(Duration::from_millis(20))
        .build()
        .await
        .unwrap();
    let path = CollectionPath::transactions("u1");

    let mut stream = watcher.subscribe(path.clone(), OrderBy::ascending("date"));
    let initial = stream.next().await.unwrap().unwrap();
    assert!(initial.is_empty());

    writer
        .set(&path, "t1", fields(json!({"date": 1})))
        .await
        .unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "t1");
}

#[tokio::test]
async fn sign_up_sign_in_and_profile() {
    let accounts = accounts(migrated_db().await);

    let created = accounts
        .sign_up(" Alice@Example.com ", "secret1", None)
        .await
        .unwrap();
    assert_eq!(created.email, "alice@example.com");
    assert_eq!(accounts.current_user(), Some(created.clone()));

    let updated = accounts.update_profile("  Alice  ").await.unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Alice"));

    accounts.sign_out();
    assert_eq!(accounts.current_user(), None);
    assert!(matches!(
        accounts.update_profile("Bob").await,
        Err(AuthError::Unauthenticated)
    ));

    let signed_in = accounts
        .sign_in("alice@example.com", "secret1")
        .await
        .unwrap();
    assert_eq!(signed_in.uid, created.uid);
    assert_eq!(signed_in.display_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn account_errors() {
    let accounts = accounts(migrated_db().await);
    accounts
        .sign_up("alice@example.com", "secret1", None)
        .await
        .unwrap();

    assert!(matches!(
        accounts.sign_up("ALICE@example.com", "secret2", None).await,
        Err(AuthError::EmailInUse(_))
    ));
    assert!(matches!(
        accounts.sign_up("bob@example.com", "12345", None).await,
        Err(AuthError::WeakPassword(6))
    ));
    assert!(matches!(
        accounts.sign_up("not-an-email", "secret1", None).await,
        Err(AuthError::InvalidEmail(_))
    ));
    assert!(matches!(
        accounts.sign_in("alice@example.com", "wrong!").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        accounts.sign_in("nobody@example.com", "secret1").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        accounts.update_profile("   ").await,
        Err(AuthError::InvalidProfile(_))
    ));
}

#[tokio::test]
async fn concurrent_sign_ups_with_one_email_register_once() {
    let accounts = accounts(migrated_db().await);

    let (first, second) = tokio::join!(
        accounts.sign_up("carol@example.com", "secret1", None),
        accounts.sign_up("Carol@example.com", "secret2", None),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AuthError::EmailInUse(email)) if email == "carol@example.com"))
    );
}
