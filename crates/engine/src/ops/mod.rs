use std::{fmt, sync::Arc};

use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

use crate::{
    Book, Borrowing, Category, LogMailer, Mailer, MoneyCents, ResultEngine, Review, User,
    UserProfile,
};

mod access;
mod accounts;
mod catalog;
mod lending;
mod reviews;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The transaction is rolled back when dropped, so an early `return Err(..)`
/// or `?` inside the block leaves no partial write behind.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The state of a user and of a book right after a borrow, purchase or
/// return committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub borrowing: Borrowing,
    pub balance: MoneyCents,
    pub book_quantity: i32,
    /// Return date announced by the borrower. Only set on borrow.
    pub requested_return_date: Option<NaiveDate>,
}

/// Outcome of a purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Purchase {
    pub receipt: Receipt,
    /// `false` when the confirmation e-mail could not be delivered. The
    /// purchase itself is committed either way.
    pub notification_sent: bool,
}

/// A book with its category and every review, oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookDetails {
    pub book: Book,
    pub category: Category,
    pub reviews: Vec<Review>,
}

/// Everything shown on the profile page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileOverview {
    pub user: User,
    pub profile: UserProfile,
    /// Newest first.
    pub history: Vec<Borrowing>,
}

pub struct Engine {
    database: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    mailer: Option<Arc<dyn Mailer>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Mailer used for purchase confirmations. Defaults to [`LogMailer`].
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> EngineBuilder {
        self.mailer = Some(mailer);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            mailer: self.mailer.unwrap_or_else(|| Arc::new(LogMailer)),
        })
    }
}
