//! JSON payloads exchanged by the library HTTP API.
//!
//! Money is always carried as integer cents (`*_minor` fields).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod catalog {
    use super::*;

    /// Query string of the catalog listing: `?q=dune&category=2`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CatalogParams {
        /// Case-insensitive substring of the title.
        pub q: Option<String>,
        pub category: Option<i32>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: i32,
        pub name: String,
        pub description: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BookView {
        pub id: i32,
        pub title: String,
        pub author: String,
        pub description: String,
        pub price_minor: i64,
        pub image: Option<String>,
        pub quantity: i32,
        pub category_id: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CatalogResponse {
        pub books: Vec<BookView>,
        pub categories: Vec<CategoryView>,
        /// Books the caller has borrowed or bought. Empty for anonymous
        /// callers.
        pub acquired_book_ids: Vec<i32>,
        /// Last book the caller selected in this session, if any.
        pub last_viewed_book_id: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BookDetailsResponse {
        pub book: BookView,
        pub category: CategoryView,
        pub reviews: Vec<super::review::ReviewView>,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisterUser {
        pub username: String,
        pub email: String,
        pub password: String,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserView {
        pub username: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
    }
}

pub mod profile {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileResponse {
        pub user: super::user::UserView,
        pub balance_minor: i64,
        /// Newest first.
        pub history: Vec<super::lending::BorrowingView>,
    }

    /// Fields left out keep their current value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub email: Option<String>,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Deposit {
        /// Decimal amount, `.` or `,` as separator, e.g. `"12.50"`.
        pub amount: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DepositResponse {
        pub balance_minor: i64,
    }
}

pub mod lending {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AcquisitionKind {
        Borrow,
        Purchase,
    }

    /// Absent fields deserialize as empty so the engine reports them.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct BorrowRequest {
        pub name: String,
        pub email: String,
        /// `YYYY-MM-DD`.
        pub return_date: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BorrowingView {
        pub id: i32,
        pub book_id: i32,
        pub book_title: String,
        pub kind: AcquisitionKind,
        pub name: String,
        pub email: String,
        pub borrow_date: DateTime<Utc>,
        pub return_date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BorrowResponse {
        pub borrowing: BorrowingView,
        pub balance_minor: i64,
        pub book_quantity: i32,
        /// The date the borrower said they would bring the book back.
        pub requested_return_date: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BuyResponse {
        pub borrowing: BorrowingView,
        pub balance_minor: i64,
        pub book_quantity: i32,
        pub notification_sent: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReturnResponse {
        pub borrowing: BorrowingView,
        pub balance_minor: i64,
        pub book_quantity: i32,
    }
}

pub mod review {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ReviewNew {
        pub content: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ReviewView {
        pub id: i32,
        pub username: String,
        pub book_id: i32,
        pub content: String,
        pub created_at: DateTime<Utc>,
    }
}
