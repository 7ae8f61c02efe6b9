use std::sync::Arc;

use sea_orm::Database;
use tempfile::TempDir;

use engine::{BorrowCmd, Engine, EngineError, MoneyCents, NewBookCmd, RegisterUserCmd};
use migration::MigratorTrait;

const CALLERS: usize = 8;

/// An engine on a file-backed database, so requests really run on separate
/// pool connections. The directory must outlive the engine.
async fn shared_engine() -> (Arc<Engine>, TempDir) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("library.db").display());
    let db = Database::connect(url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    engine
        .register_user(RegisterUserCmd {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    engine.deposit("alice", "100.00").await.unwrap();

    (Arc::new(engine), dir)
}

async fn single_copy(engine: &Engine) -> i32 {
    let category = engine.new_category("Fiction", "").await.unwrap();
    engine
        .new_book(NewBookCmd {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            description: String::new(),
            price: MoneyCents::new(1000),
            image: None,
            quantity: 1,
            category_id: category.id,
        })
        .await
        .unwrap()
        .id
}

fn borrow_cmd(book_id: i32) -> BorrowCmd {
    BorrowCmd::new(book_id, "alice")
        .name("Alice")
        .email("alice@example.com")
        .return_date("2026-11-01")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_never_oversell() {
    let (engine, _dir) = shared_engine().await;
    let book_id = single_copy(&engine).await;

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.borrow(borrow_cmd(book_id)).await })
        })
        .collect();

    let mut ok = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(EngineError::OutOfStock(_)) => out_of_stock += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(out_of_stock, CALLERS - 1);

    assert_eq!(engine.book(book_id).await.unwrap().quantity, 0);
    let overview = engine.profile("alice").await.unwrap();
    assert_eq!(overview.profile.balance, MoneyCents::new(9000));
    assert_eq!(overview.history.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_returns_refund_once() {
    let (engine, _dir) = shared_engine().await;
    let book_id = single_copy(&engine).await;
    let history_id = engine.borrow(borrow_cmd(book_id)).await.unwrap().borrowing.id;

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.return_book(history_id, "alice").await })
        })
        .collect();

    let mut ok = 0;
    let mut already_returned = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(EngineError::AlreadyReturned(_)) => already_returned += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(already_returned, CALLERS - 1);

    assert_eq!(engine.book(book_id).await.unwrap().quantity, 1);
    let overview = engine.profile("alice").await.unwrap();
    assert_eq!(overview.profile.balance, MoneyCents::new(10000));
}
