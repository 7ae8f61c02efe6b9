use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
    sea_query::Expr,
};

use crate::{
    Book, Category, CatalogQuery, EngineError, NewBookCmd, ResultEngine, books, categories,
    util::normalize_required,
};

use super::{BookDetails, Engine, with_tx};

/// Case-insensitive substring match, with full Unicode case folding.
fn title_matches(title: &str, needle: &str) -> bool {
    title.to_lowercase().contains(needle)
}

impl Engine {
    /// All categories, by name.
    pub async fn categories(&self) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .order_by_asc(categories::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    /// Books matching `query`, ordered by title.
    ///
    /// A blank title filter is ignored. An unknown category yields an empty
    /// list, not an error. SQLite only folds ASCII case, so the title is
    /// matched here rather than with `LIKE`.
    pub async fn books(&self, query: &CatalogQuery) -> ResultEngine<Vec<Book>> {
        let mut select = books::Entity::find();
        if let Some(category_id) = query.category_id {
            select = select.filter(books::Column::CategoryId.eq(category_id));
        }

        let needle = query
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_lowercase);

        let models = select
            .order_by_asc(books::Column::Title)
            .order_by_asc(books::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models
            .into_iter()
            .filter(|model| {
                needle
                    .as_deref()
                    .is_none_or(|needle| title_matches(&model.title, needle))
            })
            .map(Book::from)
            .collect())
    }

    pub async fn book(&self, book_id: i32) -> ResultEngine<Book> {
        Ok(self.require_book(&self.database, book_id).await?.into())
    }

    /// A book with its category and reviews, oldest review first.
    pub async fn book_details(&self, book_id: i32) -> ResultEngine<BookDetails> {
        let book = self.require_book(&self.database, book_id).await?;
        let category = self
            .require_category(&self.database, book.category_id)
            .await?;
        let reviews = self.reviews_for_book(book_id).await?;

        Ok(BookDetails {
            book: book.into(),
            category: category.into(),
            reviews,
        })
    }

    pub async fn new_category(&self, name: &str, description: &str) -> ResultEngine<Category> {
        let name = normalize_required(name, "category name")?;
        let category = with_tx!(self, |db_tx| {
            let existing = categories::Entity::find()
                .filter(categories::Column::Name.eq(name.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(name));
            }

            let active = categories::ActiveModel {
                name: ActiveValue::Set(name.clone()),
                description: ActiveValue::Set(description.trim().to_string()),
                ..Default::default()
            };
            let model = active.insert(&db_tx).await?;
            Ok::<_, EngineError>(Category::from(model))
        })?;

        tracing::info!(category_id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn new_book(&self, cmd: NewBookCmd) -> ResultEngine<Book> {
        let title = normalize_required(&cmd.title, "title")?;
        let author = normalize_required(&cmd.author, "author")?;
        if cmd.price.is_negative() {
            return Err(EngineError::InvalidAmount(
                "price must not be negative".to_string(),
            ));
        }
        if cmd.quantity < 0 {
            return Err(EngineError::Validation(
                "quantity must not be negative".to_string(),
            ));
        }
        let image = cmd
            .image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        let book = with_tx!(self, |db_tx| {
            self.require_category(&db_tx, cmd.category_id).await?;
            let active = books::ActiveModel {
                title: ActiveValue::Set(title),
                author: ActiveValue::Set(author),
                description: ActiveValue::Set(cmd.description.trim().to_string()),
                price: ActiveValue::Set(cmd.price.cents()),
                image: ActiveValue::Set(image),
                quantity: ActiveValue::Set(cmd.quantity),
                category_id: ActiveValue::Set(cmd.category_id),
                ..Default::default()
            };
            let model = active.insert(&db_tx).await?;
            Ok::<_, EngineError>(Book::from(model))
        })?;

        tracing::info!(book_id = book.id, title = %book.title, "book added to catalog");
        Ok(book)
    }

    /// Add (or, with a negative `delta`, remove) copies of a book.
    ///
    /// Removing more copies than are in stock is rejected as `OutOfStock`.
    pub async fn restock_book(&self, book_id: i32, delta: i32) -> ResultEngine<Book> {
        let too_large = || EngineError::Validation("quantity change is too large".to_string());
        let book = with_tx!(self, |db_tx| {
            let book = self.require_book(&db_tx, book_id).await?;
            let guard = if delta < 0 {
                books::Column::Quantity.gte(delta.checked_neg().ok_or_else(too_large)?)
            } else {
                books::Column::Quantity.lte(i32::MAX - delta)
            };
            let updated = books::Entity::update_many()
                .col_expr(
                    books::Column::Quantity,
                    Expr::col(books::Column::Quantity).add(delta),
                )
                .filter(books::Column::Id.eq(book_id))
                .filter(guard)
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(if delta < 0 {
                    EngineError::OutOfStock(book.title)
                } else {
                    too_large()
                });
            }
            Ok::<_, EngineError>(Book::from(self.require_book(&db_tx, book_id).await?))
        })?;

        tracing::info!(book_id, delta, quantity = book.quantity, "book restocked");
        Ok(book)
    }
}
