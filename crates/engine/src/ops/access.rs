use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, prelude::*, sea_query::OnConflict};

use crate::{
    Borrowing, EngineError, ResultEngine, books, borrowings, categories, user_profiles, users,
};

use super::Engine;

/// Generates a `require_*` lookup that fails with `KeyNotFound` for an
/// integer-keyed entity.
macro_rules! impl_require_by_id {
    ($require_fn:ident, $entity:path, $model:path, $err_msg:literal) => {
        pub(super) async fn $require_fn<C: ConnectionTrait>(
            &self,
            db: &C,
            id: i32,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_require_by_id!(require_book, books::Entity, books::Model, "book not exists");

    impl_require_by_id!(
        require_category,
        categories::Entity,
        categories::Model,
        "category not exists"
    );

    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Returns the profile of `username`, creating it with a zero balance
    /// when missing.
    pub(super) async fn ensure_profile<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
    ) -> ResultEngine<user_profiles::Model> {
        let active = user_profiles::ActiveModel {
            user_id: ActiveValue::Set(username.to_string()),
            balance: ActiveValue::Set(0),
        };
        user_profiles::Entity::insert(active)
            .on_conflict(
                OnConflict::column(user_profiles::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        user_profiles::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("profile not exists".to_string()))
    }

    /// `true` when `username` has borrowed or bought `book_id` at least once.
    pub(super) async fn has_acquired<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
        book_id: i32,
    ) -> ResultEngine<bool> {
        let found = borrowings::Entity::find()
            .filter(borrowings::Column::UserId.eq(username))
            .filter(borrowings::Column::BookId.eq(book_id))
            .one(db)
            .await?;
        Ok(found.is_some())
    }

    /// Loads a ledger row and checks that it belongs to `username`.
    pub(super) async fn require_borrowing_owned<C: ConnectionTrait>(
        &self,
        db: &C,
        borrowing_id: i32,
        username: &str,
    ) -> ResultEngine<borrowings::Model> {
        let model = borrowings::Entity::find_by_id(borrowing_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("borrowing not exists".to_string()))?;
        if model.user_id != username {
            return Err(EngineError::Forbidden(
                "borrowing belongs to another user".to_string(),
            ));
        }
        Ok(model)
    }

    pub(super) async fn borrowing_view<C: ConnectionTrait>(
        &self,
        db: &C,
        borrowing_id: i32,
    ) -> ResultEngine<Borrowing> {
        let (model, book) = borrowings::Entity::find_by_id(borrowing_id)
            .find_also_related(books::Entity)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("borrowing not exists".to_string()))?;
        let title = book.map(|b| b.title).unwrap_or_default();
        Borrowing::from_models(model, title)
    }
}
