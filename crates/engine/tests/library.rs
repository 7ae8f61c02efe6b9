use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    AcquisitionKind, BorrowCmd, CatalogQuery, Email, Engine, EngineError, ErrorKind, MailError,
    Mailer, MoneyCents, NewBookCmd, ProfileUpdate, RegisterUserCmd,
};
use migration::MigratorTrait;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &Email) -> Result<(), MailError> {
        Err(MailError::Address(
            "nowhere".parse::<lettre::Address>().unwrap_err(),
        ))
    }
}

async fn connect() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn seed_users(engine: &Engine) {
    for (username, first, last) in [("alice", "Alice", "Liddell"), ("bob", "", "")] {
        engine
            .register_user(RegisterUserCmd {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "secret".to_string(),
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
            })
            .await
            .unwrap();
    }
}

async fn engine_with_db() -> Engine {
    let engine = Engine::builder()
        .database(connect().await)
        .build()
        .await
        .unwrap();
    seed_users(&engine).await;
    engine
}

async fn engine_with_mailer(mailer: Arc<dyn Mailer>) -> Engine {
    let engine = Engine::builder()
        .database(connect().await)
        .mailer(mailer)
        .build()
        .await
        .unwrap();
    seed_users(&engine).await;
    engine
}

/// Adds a book to the first category (creating "Fiction" if needed) and
/// returns its id.
async fn add_book(engine: &Engine, title: &str, price: i64, quantity: i32) -> i32 {
    let category = match engine.categories().await.unwrap().into_iter().next() {
        Some(category) => category,
        None => engine.new_category("Fiction", "Novels").await.unwrap(),
    };
    engine
        .new_book(NewBookCmd {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            description: String::new(),
            price: MoneyCents::new(price),
            image: None,
            quantity,
            category_id: category.id,
        })
        .await
        .unwrap()
        .id
}

fn borrow_cmd(book_id: i32, user: &str) -> BorrowCmd {
    BorrowCmd::new(book_id, user)
        .name("Alice Liddell")
        .email("alice@example.com")
        .return_date("2026-11-01")
}

#[tokio::test]
async fn borrow_and_return_full_cycle() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 1000, 1).await;
    engine.deposit("alice", "10.00").await.unwrap();

    let receipt = engine.borrow(borrow_cmd(book_id, "alice")).await.unwrap();
    assert_eq!(receipt.balance, MoneyCents::ZERO);
    assert_eq!(receipt.book_quantity, 0);
    assert_eq!(receipt.borrowing.kind, AcquisitionKind::Borrow);
    assert!(!receipt.borrowing.is_returned());

    let err = engine
        .borrow(borrow_cmd(book_id, "alice"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::OutOfStock("Dune".to_string()));

    let history_id = receipt.borrowing.id;
    let returned = engine.return_book(history_id, "alice").await.unwrap();
    assert_eq!(returned.balance, MoneyCents::new(1000));
    assert_eq!(returned.book_quantity, 1);
    assert!(returned.borrowing.is_returned());

    let err = engine.return_book(history_id, "alice").await.unwrap_err();
    assert_eq!(err, EngineError::AlreadyReturned("Dune".to_string()));

    let overview = engine.profile("alice").await.unwrap();
    assert_eq!(overview.profile.balance, MoneyCents::new(1000));
    assert_eq!(engine.book(book_id).await.unwrap().quantity, 1);
}

#[tokio::test]
async fn insufficient_balance_changes_nothing() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 1000, 3).await;
    engine.deposit("alice", "9.99").await.unwrap();

    let err = engine
        .borrow(borrow_cmd(book_id, "alice"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientFunds("borrow \"Dune\"".to_string())
    );
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    let overview = engine.profile("alice").await.unwrap();
    assert_eq!(overview.profile.balance, MoneyCents::new(999));
    assert!(overview.history.is_empty());
    assert_eq!(engine.book(book_id).await.unwrap().quantity, 3);
}

#[tokio::test]
async fn out_of_stock_is_checked_before_balance() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 1000, 0).await;

    let err = engine
        .borrow(borrow_cmd(book_id, "alice"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::OutOfStock("Dune".to_string()));
}

#[tokio::test]
async fn borrow_requires_every_field() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 0, 1).await;

    let cmd = BorrowCmd::new(book_id, "alice")
        .name("  ")
        .email("alice@example.com")
        .return_date("2026-11-01");
    let err = engine.borrow(cmd).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("Please fill in all fields.".to_string())
    );

    let cmd = borrow_cmd(book_id, "alice").return_date("next week");
    let err = engine.borrow(cmd).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(engine.book(book_id).await.unwrap().quantity, 1);
}

#[tokio::test]
async fn unknown_book_is_not_found() {
    let engine = engine_with_db().await;
    let err = engine.borrow(borrow_cmd(42, "alice")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = engine.buy(42, "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn buy_debits_and_sends_confirmation() {
    let mailer = Arc::new(RecordingMailer::default());
    let engine = engine_with_mailer(mailer.clone()).await;
    let book_id = add_book(&engine, "Dune", 1250, 2).await;
    engine.deposit("alice", "20").await.unwrap();

    let purchase = engine.buy(book_id, "alice").await.unwrap();
    assert!(purchase.notification_sent);
    assert_eq!(purchase.receipt.balance, MoneyCents::new(750));
    assert_eq!(purchase.receipt.book_quantity, 1);
    assert_eq!(purchase.receipt.borrowing.kind, AcquisitionKind::Purchase);
    assert_eq!(purchase.receipt.borrowing.name, "Alice Liddell");
    assert_eq!(purchase.receipt.borrowing.email, "alice@example.com");

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(sent[0].subject, "Book Purchase Confirmation");
    assert!(sent[0].body.contains("Dear Alice Liddell,"));
    assert!(sent[0].body.contains("\"Dune\" for $12.50"));
}

#[tokio::test]
async fn rejected_buy_sends_no_mail() {
    let mailer = Arc::new(RecordingMailer::default());
    let engine = engine_with_mailer(mailer.clone()).await;
    let book_id = add_book(&engine, "Dune", 1250, 2).await;

    let err = engine.buy(book_id, "alice").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientFunds("buy \"Dune\"".to_string())
    );
    assert!(mailer.sent.lock().unwrap().is_empty());
    assert_eq!(engine.book(book_id).await.unwrap().quantity, 2);
}

#[tokio::test]
async fn mail_failure_keeps_purchase() {
    let engine = engine_with_mailer(Arc::new(FailingMailer)).await;
    let book_id = add_book(&engine, "Dune", 500, 1).await;
    engine.deposit("bob", "5").await.unwrap();

    let purchase = engine.buy(book_id, "bob").await.unwrap();
    assert!(!purchase.notification_sent);
    assert_eq!(purchase.receipt.balance, MoneyCents::ZERO);
    // bob has no full name, the ledger falls back to the username
    assert_eq!(purchase.receipt.borrowing.name, "bob");

    let overview = engine.profile("bob").await.unwrap();
    assert_eq!(overview.history.len(), 1);
}

#[tokio::test]
async fn purchases_cannot_be_returned() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 500, 1).await;
    engine.deposit("alice", "5").await.unwrap();
    let purchase = engine.buy(book_id, "alice").await.unwrap();

    let err = engine
        .return_book(purchase.receipt.borrowing.id, "alice")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotReturnable("Dune".to_string()));

    let overview = engine.profile("alice").await.unwrap();
    assert_eq!(overview.profile.balance, MoneyCents::ZERO);
    assert_eq!(engine.book(book_id).await.unwrap().quantity, 0);
}

#[tokio::test]
async fn foreign_history_row_is_forbidden() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 0, 1).await;
    let receipt = engine.borrow(borrow_cmd(book_id, "alice")).await.unwrap();

    let err = engine
        .return_book(receipt.borrowing.id, "bob")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = engine.return_book(999, "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let history = engine.borrowing_history("alice").await.unwrap();
    assert!(!history[0].is_returned());
}

#[tokio::test]
async fn review_requires_acquisition() {
    let engine = engine_with_db().await;
    let borrowed = add_book(&engine, "Dune", 0, 1).await;
    let bought = add_book(&engine, "Emma", 0, 1).await;

    let err = engine
        .submit_review(borrowed, "alice", "Great!")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotAcquired("Dune".to_string()));

    engine.borrow(borrow_cmd(borrowed, "alice")).await.unwrap();
    engine.buy(bought, "alice").await.unwrap();

    let err = engine
        .submit_review(borrowed, "alice", "   ")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("Review content cannot be empty.".to_string())
    );

    let review = engine
        .submit_review(borrowed, "alice", "  Great!  ")
        .await
        .unwrap();
    assert_eq!(review.content, "Great!");
    engine.submit_review(bought, "alice", "Fine").await.unwrap();

    let details = engine.book_details(borrowed).await.unwrap();
    assert_eq!(details.reviews.len(), 1);
    assert_eq!(details.category.name, "Fiction");
    assert!(!details.book.in_stock());

    let reviews = engine.reviews_for_book(bought).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].username, "alice");

    let mut acquired = engine.acquired_book_ids("alice").await.unwrap();
    acquired.sort_unstable();
    assert_eq!(acquired, vec![borrowed, bought]);
    assert!(engine.acquired_book_ids("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn ownership_is_checked_before_content() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 0, 1).await;
    let err = engine.submit_review(book_id, "bob", "").await.unwrap_err();
    assert_eq!(err, EngineError::NotAcquired("Dune".to_string()));
}

#[tokio::test]
async fn deposit_rules() {
    let engine = engine_with_db().await;

    for bad in ["0", "-5", "0.00"] {
        let err = engine.deposit("alice", bad).await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("Deposit amount must be greater than zero.".to_string())
        );
    }
    for garbage in ["", "ten", "1.234"] {
        let err = engine.deposit("alice", garbage).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    engine.deposit("alice", "2.50").await.unwrap();
    let profile = engine.deposit("alice", "0,75").await.unwrap();
    assert_eq!(profile.balance, MoneyCents::new(325));

    let err = engine.deposit("nobody", "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn deposit_past_the_balance_limit_is_rejected() {
    let engine = engine_with_db().await;
    let first = engine.deposit("alice", "90000000000000000").await.unwrap();
    assert_eq!(first.balance, MoneyCents::new(9_000_000_000_000_000_000));

    let err = engine
        .deposit("alice", "90000000000000000")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidAmount("amount too large".to_string()));

    let overview = engine.profile("alice").await.unwrap();
    assert_eq!(overview.profile.balance, first.balance);
}

#[tokio::test]
async fn catalog_filters_combine() {
    let engine = engine_with_db().await;
    let fiction = engine.new_category("Fiction", "").await.unwrap();
    let science = engine.new_category("Science", "").await.unwrap();
    for (title, category) in [
        ("Dune", fiction.id),
        ("Dune Messiah", fiction.id),
        ("École des femmes", fiction.id),
        ("A Brief History of Time", science.id),
        ("Cosmos", science.id),
    ] {
        engine
            .new_book(NewBookCmd {
                title: title.to_string(),
                author: "Someone".to_string(),
                description: String::new(),
                price: MoneyCents::new(100),
                image: None,
                quantity: 1,
                category_id: category,
            })
            .await
            .unwrap();
    }

    let titles = |books: Vec<engine::Book>| books.into_iter().map(|b| b.title).collect::<Vec<_>>();

    let all = engine.books(&CatalogQuery::default()).await.unwrap();
    assert_eq!(all.len(), 5);

    let dune = engine
        .books(&CatalogQuery::default().title("dUnE"))
        .await
        .unwrap();
    assert_eq!(titles(dune), vec!["Dune", "Dune Messiah"]);

    let science_only = engine
        .books(&CatalogQuery::default().category(science.id))
        .await
        .unwrap();
    assert_eq!(titles(science_only), vec!["A Brief History of Time", "Cosmos"]);

    let both = engine
        .books(&CatalogQuery::default().title("o").category(science.id))
        .await
        .unwrap();
    assert_eq!(titles(both), vec!["A Brief History of Time", "Cosmos"]);

    let none = engine
        .books(&CatalogQuery::default().title("dune").category(science.id))
        .await
        .unwrap();
    assert!(none.is_empty());

    let wildcard = engine
        .books(&CatalogQuery::default().title("%"))
        .await
        .unwrap();
    assert!(wildcard.is_empty());

    for needle in ["École", "école", "ÉCOLE DES"] {
        let found = engine
            .books(&CatalogQuery::default().title(needle))
            .await
            .unwrap();
        assert_eq!(titles(found), vec!["École des femmes"], "{needle}");
    }
}

#[tokio::test]
async fn registration_and_authentication() {
    let engine = engine_with_db().await;

    let err = engine
        .register_user(RegisterUserCmd {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password: "x".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));

    let err = engine
        .register_user(RegisterUserCmd {
            username: "carol".to_string(),
            email: "carol".to_string(),
            password: "x".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(engine.authenticate("alice", "secret").await.unwrap().is_some());
    assert!(engine.authenticate("alice", "wrong").await.unwrap().is_none());
    assert!(engine.authenticate("nobody", "secret").await.unwrap().is_none());

    let overview = engine.profile("bob").await.unwrap();
    assert_eq!(overview.profile.balance, MoneyCents::ZERO);
}

#[tokio::test]
async fn profile_update_keeps_unset_fields() {
    let engine = engine_with_db().await;

    let user = engine
        .update_profile(
            "alice",
            ProfileUpdate {
                first_name: Some("Alicia".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(user.first_name, "Alicia");
    assert_eq!(user.last_name, "Liddell");
    assert_eq!(user.email, "alice@example.com");

    let err = engine
        .update_profile(
            "alice",
            ProfileUpdate {
                email: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn history_is_newest_first() {
    let engine = engine_with_db().await;
    let first = add_book(&engine, "Dune", 0, 1).await;
    let second = add_book(&engine, "Emma", 0, 1).await;
    engine.borrow(borrow_cmd(first, "alice")).await.unwrap();
    engine.borrow(borrow_cmd(second, "alice")).await.unwrap();

    let overview = engine.profile("alice").await.unwrap();
    let titles: Vec<_> = overview
        .history
        .iter()
        .map(|b| b.book_title.as_str())
        .collect();
    assert_eq!(titles, vec!["Emma", "Dune"]);
}

#[tokio::test]
async fn restock_never_goes_negative() {
    let engine = engine_with_db().await;
    let book_id = add_book(&engine, "Dune", 0, 2).await;

    assert_eq!(engine.restock_book(book_id, 3).await.unwrap().quantity, 5);
    let err = engine.restock_book(book_id, -6).await.unwrap_err();
    assert_eq!(err, EngineError::OutOfStock("Dune".to_string()));
    assert_eq!(engine.restock_book(book_id, -5).await.unwrap().quantity, 0);

    let err = engine.restock_book(book_id, i32::MIN).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        engine.restock_book(book_id, i32::MAX).await.unwrap().quantity,
        i32::MAX
    );
    let err = engine.restock_book(book_id, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(engine.book(book_id).await.unwrap().quantity, i32::MAX);
}

#[tokio::test]
async fn catalog_admin_validation() {
    let engine = engine_with_db().await;
    let err = engine
        .new_book(NewBookCmd {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            description: String::new(),
            price: MoneyCents::new(100),
            image: None,
            quantity: 1,
            category_id: 7,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    engine.new_category("Fiction", "").await.unwrap();
    let err = engine.new_category(" Fiction ", "").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("Fiction".to_string()));
}
