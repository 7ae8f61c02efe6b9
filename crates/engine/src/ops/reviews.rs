use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, Review, reviews};

use super::{Engine, with_tx};

impl Engine {
    /// Post a review on a book the user has borrowed or bought.
    ///
    /// Ownership is checked before the content, so a user who never
    /// acquired the book gets `NotAcquired` even for an empty review.
    pub async fn submit_review(
        &self,
        book_id: i32,
        user_id: &str,
        content: &str,
    ) -> ResultEngine<Review> {
        let review = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let book = self.require_book(&db_tx, book_id).await?;
            if !self.has_acquired(&db_tx, user_id, book_id).await? {
                tracing::debug!(user = %user_id, book_id, "review rejected: book not acquired");
                return Err(EngineError::NotAcquired(book.title));
            }

            let content = content.trim();
            if content.is_empty() {
                return Err(EngineError::Validation(
                    "Review content cannot be empty.".to_string(),
                ));
            }

            let active = reviews::ActiveModel {
                user_id: ActiveValue::Set(user_id.to_string()),
                book_id: ActiveValue::Set(book_id),
                content: ActiveValue::Set(content.to_string()),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            let model = active.insert(&db_tx).await?;
            Ok::<_, EngineError>(Review::from(model))
        })?;

        tracing::info!(user = %user_id, book_id, review_id = review.id, "review posted");
        Ok(review)
    }

    /// Reviews of a book, oldest first.
    pub async fn reviews_for_book(&self, book_id: i32) -> ResultEngine<Vec<Review>> {
        self.require_book(&self.database, book_id).await?;
        let models = reviews::Entity::find()
            .filter(reviews::Column::BookId.eq(book_id))
            .order_by_asc(reviews::Column::CreatedAt)
            .order_by_asc(reviews::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Review::from).collect())
    }
}
