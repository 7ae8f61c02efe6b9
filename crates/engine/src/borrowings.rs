//! Lending ledger.
//!
//! A row is created for every successful borrow or purchase and is never
//! deleted. `return_date` moves from `NULL` to a timestamp exactly once, and
//! only for borrowed copies.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{EngineError, ResultEngine};

/// How a copy was acquired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquisitionKind {
    /// Lent against the book price, refunded on return.
    Borrow,
    /// Bought; kept by the user.
    Purchase,
}

impl AcquisitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Borrow => "borrow",
            Self::Purchase => "purchase",
        }
    }
}

impl TryFrom<&str> for AcquisitionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "borrow" => Ok(Self::Borrow),
            "purchase" => Ok(Self::Purchase),
            other => Err(EngineError::Validation(format!(
                "invalid acquisition kind: {other}"
            ))),
        }
    }
}

/// One acquisition of a book by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Borrowing {
    pub id: i32,
    pub username: String,
    pub book_id: i32,
    /// Title of the book, joined from the catalog.
    pub book_title: String,
    pub kind: AcquisitionKind,
    pub name: String,
    pub email: String,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl Borrowing {
    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    pub(crate) fn from_models(model: Model, book_title: String) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            kind: AcquisitionKind::try_from(model.kind.as_str())?,
            username: model.user_id,
            book_id: model.book_id,
            book_title,
            name: model.name,
            email: model.email,
            borrow_date: model.borrow_date,
            return_date: model.return_date,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "borrowing_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub book_id: i32,
    pub kind: String,
    pub name: String,
    pub email: String,
    pub borrow_date: DateTimeUtc,
    pub return_date: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::books::Entity",
        from = "Column::BookId",
        to = "super::books::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Book,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::books::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_string() {
        for kind in [AcquisitionKind::Borrow, AcquisitionKind::Purchase] {
            assert_eq!(AcquisitionKind::try_from(kind.as_str()), Ok(kind));
        }
        assert!(AcquisitionKind::try_from("gift").is_err());
    }
}
