//! Command structs for engine operations.
//!
//! These types group parameters for write operations and catalog queries,
//! keeping call sites readable and avoiding long argument lists.

use crate::MoneyCents;

/// Borrow one copy of a book.
///
/// All borrower fields are required; the requested return date is validated
/// but the ledger only records the actual return.
#[derive(Clone, Debug)]
pub struct BorrowCmd {
    pub book_id: i32,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub return_date: String,
}

impl BorrowCmd {
    #[must_use]
    pub fn new(book_id: i32, user_id: impl Into<String>) -> Self {
        Self {
            book_id,
            user_id: user_id.into(),
            name: String::new(),
            email: String::new(),
            return_date: String::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    #[must_use]
    pub fn return_date(mut self, return_date: impl Into<String>) -> Self {
        self.return_date = return_date.into();
        self
    }
}

/// Filters for the catalog listing. Both filters are optional and combinable.
#[derive(Clone, Debug, Default)]
pub struct CatalogQuery {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub category_id: Option<i32>,
}

impl CatalogQuery {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category_id: i32) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Add a book to the catalog.
#[derive(Clone, Debug)]
pub struct NewBookCmd {
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: MoneyCents,
    pub image: Option<String>,
    pub quantity: i32,
    pub category_id: i32,
}

/// Sign up a new user.
#[derive(Clone, Debug, Default)]
pub struct RegisterUserCmd {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Editable profile fields; `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}
