use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    AcquisitionKind, BorrowCmd, Borrowing, Email, EngineError, MoneyCents, ResultEngine, User,
    books, borrowings, user_profiles,
    util::{normalize_required, parse_date},
};

use super::{Engine, Purchase, Receipt, with_tx};

impl Engine {
    /// Takes one copy out of stock and debits its price from the user.
    ///
    /// Both steps are conditional updates (`quantity > 0`,
    /// `balance >= price`), so the check and the write are a single statement
    /// and a concurrent request cannot slip in between. The stock check runs
    /// first; when the debit fails the caller's transaction is dropped and the
    /// decrement is rolled back with it.
    async fn take_copy(
        &self,
        db_tx: &DatabaseTransaction,
        username: &str,
        book: &books::Model,
        verb: &str,
    ) -> ResultEngine<()> {
        let taken = books::Entity::update_many()
            .col_expr(
                books::Column::Quantity,
                Expr::col(books::Column::Quantity).sub(1),
            )
            .filter(books::Column::Id.eq(book.id))
            .filter(books::Column::Quantity.gt(0))
            .exec(db_tx)
            .await?;
        if taken.rows_affected == 0 {
            tracing::debug!(book_id = book.id, "{verb} rejected: out of stock");
            return Err(EngineError::OutOfStock(book.title.clone()));
        }

        self.ensure_profile(db_tx, username).await?;
        let debited = user_profiles::Entity::update_many()
            .col_expr(
                user_profiles::Column::Balance,
                Expr::col(user_profiles::Column::Balance).sub(book.price),
            )
            .filter(user_profiles::Column::UserId.eq(username))
            .filter(user_profiles::Column::Balance.gte(book.price))
            .exec(db_tx)
            .await?;
        if debited.rows_affected == 0 {
            tracing::debug!(book_id = book.id, "{verb} rejected: insufficient balance");
            return Err(EngineError::InsufficientFunds(format!(
                "{verb} \"{}\"",
                book.title
            )));
        }

        Ok(())
    }

    async fn record_acquisition(
        &self,
        db_tx: &DatabaseTransaction,
        username: &str,
        book: &books::Model,
        kind: AcquisitionKind,
        name: String,
        email: String,
    ) -> ResultEngine<Borrowing> {
        let active = borrowings::ActiveModel {
            user_id: ActiveValue::Set(username.to_string()),
            book_id: ActiveValue::Set(book.id),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            name: ActiveValue::Set(name),
            email: ActiveValue::Set(email),
            borrow_date: ActiveValue::Set(Utc::now()),
            return_date: ActiveValue::Set(None),
            ..Default::default()
        };
        let model = active.insert(db_tx).await?;
        Borrowing::from_models(model, book.title.clone())
    }

    async fn receipt(
        &self,
        db_tx: &DatabaseTransaction,
        borrowing: Borrowing,
    ) -> ResultEngine<Receipt> {
        let profile = self.ensure_profile(db_tx, &borrowing.username).await?;
        let book = self.require_book(db_tx, borrowing.book_id).await?;
        Ok(Receipt {
            borrowing,
            balance: MoneyCents::new(profile.balance),
            book_quantity: book.quantity,
            requested_return_date: None,
        })
    }

    /// Borrow one copy of a book against its price.
    ///
    /// Rejections, in order: missing borrower fields, unknown book, out of
    /// stock, insufficient balance. A rejection leaves balance, stock and
    /// ledger untouched.
    pub async fn borrow(&self, cmd: BorrowCmd) -> ResultEngine<Receipt> {
        let fields = (
            normalize_required(&cmd.name, "name"),
            normalize_required(&cmd.email, "email"),
            normalize_required(&cmd.return_date, "return date"),
        );
        let (Ok(name), Ok(email), Ok(return_date)) = fields else {
            return Err(EngineError::Validation(
                "Please fill in all fields.".to_string(),
            ));
        };
        let due = parse_date(&return_date, "return date")?;

        let mut receipt = with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, &cmd.user_id).await?;
            let book = self.require_book(&db_tx, cmd.book_id).await?;
            self.take_copy(&db_tx, &user.username, &book, "borrow")
                .await?;
            let borrowing = self
                .record_acquisition(
                    &db_tx,
                    &user.username,
                    &book,
                    AcquisitionKind::Borrow,
                    name,
                    email,
                )
                .await?;
            self.receipt(&db_tx, borrowing).await
        })?;
        receipt.requested_return_date = Some(due);

        tracing::info!(
            user = %cmd.user_id,
            book_id = cmd.book_id,
            borrowing_id = receipt.borrowing.id,
            %due,
            "book borrowed"
        );
        Ok(receipt)
    }

    /// Buy one copy of a book and e-mail a confirmation to the buyer.
    ///
    /// The ledger row uses the buyer's name and registered e-mail. The mail
    /// is sent after commit: a delivery failure is logged and reported in
    /// [`Purchase::notification_sent`].
    pub async fn buy(&self, book_id: i32, user_id: &str) -> ResultEngine<Purchase> {
        let (receipt, user, price) = with_tx!(self, |db_tx| {
            let user = User::from(self.require_user(&db_tx, user_id).await?);
            let book = self.require_book(&db_tx, book_id).await?;
            let price = MoneyCents::new(book.price);
            self.take_copy(&db_tx, &user.username, &book, "buy").await?;
            let borrowing = self
                .record_acquisition(
                    &db_tx,
                    &user.username,
                    &book,
                    AcquisitionKind::Purchase,
                    user.display_name(),
                    user.email.clone(),
                )
                .await?;
            let receipt = self.receipt(&db_tx, borrowing).await?;
            Ok::<_, EngineError>((receipt, user, price))
        })?;
        tracing::info!(
            user = %user_id,
            book_id,
            borrowing_id = receipt.borrowing.id,
            %price,
            "book purchased"
        );

        let email = Email::purchase_confirmation(
            &user.email,
            &user.display_name(),
            &receipt.borrowing.book_title,
            price,
        );
        let notification_sent = match self.mailer.send(&email).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(user = %user_id, "purchase confirmation not sent: {err}");
                false
            }
        };

        Ok(Purchase {
            receipt,
            notification_sent,
        })
    }

    /// Return a borrowed copy: refund the price, put the copy back in stock
    /// and stamp `return_date`.
    ///
    /// The stamp is a conditional update on `return_date IS NULL`, so a
    /// second return of the same row is rejected with `AlreadyReturned` and
    /// never refunds twice.
    pub async fn return_book(&self, borrowing_id: i32, user_id: &str) -> ResultEngine<Receipt> {
        let receipt = with_tx!(self, |db_tx| {
            let row = self
                .require_borrowing_owned(&db_tx, borrowing_id, user_id)
                .await?;
            let book = self.require_book(&db_tx, row.book_id).await?;
            if AcquisitionKind::try_from(row.kind.as_str())? == AcquisitionKind::Purchase {
                return Err(EngineError::NotReturnable(book.title));
            }

            let closed = borrowings::Entity::update_many()
                .col_expr(borrowings::Column::ReturnDate, Expr::value(Utc::now()))
                .filter(borrowings::Column::Id.eq(borrowing_id))
                .filter(borrowings::Column::ReturnDate.is_null())
                .exec(&db_tx)
                .await?;
            if closed.rows_affected == 0 {
                tracing::debug!(borrowing_id, "return rejected: already returned");
                return Err(EngineError::AlreadyReturned(book.title));
            }

            self.ensure_profile(&db_tx, user_id).await?;
            let refunded = user_profiles::Entity::update_many()
                .col_expr(
                    user_profiles::Column::Balance,
                    Expr::col(user_profiles::Column::Balance).add(book.price),
                )
                .filter(user_profiles::Column::UserId.eq(user_id))
                .filter(user_profiles::Column::Balance.lte(i64::MAX - book.price))
                .exec(&db_tx)
                .await?;
            if refunded.rows_affected == 0 {
                return Err(EngineError::InvalidAmount(
                    "balance too large to refund".to_string(),
                ));
            }
            books::Entity::update_many()
                .col_expr(
                    books::Column::Quantity,
                    Expr::col(books::Column::Quantity).add(1),
                )
                .filter(books::Column::Id.eq(book.id))
                .exec(&db_tx)
                .await?;

            let borrowing = self.borrowing_view(&db_tx, borrowing_id).await?;
            self.receipt(&db_tx, borrowing).await
        })?;

        tracing::info!(user = %user_id, borrowing_id, "book returned, refund credited");
        Ok(receipt)
    }

    /// Ledger rows of `user_id`, newest first.
    pub async fn borrowing_history(&self, user_id: &str) -> ResultEngine<Vec<Borrowing>> {
        let rows = borrowings::Entity::find()
            .filter(borrowings::Column::UserId.eq(user_id))
            .find_also_related(books::Entity)
            .order_by_desc(borrowings::Column::BorrowDate)
            .order_by_desc(borrowings::Column::Id)
            .all(&self.database)
            .await?;

        rows.into_iter()
            .map(|(model, book)| {
                Borrowing::from_models(model, book.map(|b| b.title).unwrap_or_default())
            })
            .collect()
    }

    /// Ids of the books `user_id` has borrowed or bought, without duplicates.
    pub async fn acquired_book_ids(&self, user_id: &str) -> ResultEngine<Vec<i32>> {
        let mut ids: Vec<i32> = borrowings::Entity::find()
            .filter(borrowings::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| model.book_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
