//! Transactional core of the library.
//!
//! [`Engine`] owns the database connection and exposes every operation of
//! the catalog, the account ledger, the lending ledger and the review store.
//! Each write runs inside a single database transaction; stock and balance
//! checks are conditional updates so concurrent requests cannot oversell a
//! book or double-refund a return.

pub use books::Book;
pub use borrowings::{AcquisitionKind, Borrowing};
pub use categories::Category;
pub use commands::{BorrowCmd, CatalogQuery, NewBookCmd, ProfileUpdate, RegisterUserCmd};
pub use error::{EngineError, ErrorKind};
pub use mailer::{Email, LogMailer, MailError, Mailer, SmtpConfig, SmtpMailer};
pub use money::MoneyCents;
pub use ops::{BookDetails, Engine, EngineBuilder, ProfileOverview, Purchase, Receipt};
pub use password::{hash_password, verify_password};
pub use reviews::Review;
pub use user_profiles::UserProfile;
pub use users::User;

mod books;
mod borrowings;
mod categories;
mod commands;
mod error;
mod mailer;
mod money;
mod ops;
mod password;
mod reviews;
mod user_profiles;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
