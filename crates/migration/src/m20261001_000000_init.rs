//! Initial schema migration.
//!
//! It creates the complete schema for the library:
//!
//! - `users`: authentication and contact data
//! - `user_profiles`: one balance per user
//! - `categories`: catalog sections
//! - `books`: catalog entries with price and stock
//! - `borrowing_history`: lending ledger, one row per borrow or purchase
//! - `reviews`: feedback tied to a user and a book

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    Email,
    FirstName,
    LastName,
}

#[derive(Iden)]
enum UserProfiles {
    Table,
    UserId,
    Balance,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
    Description,
}

#[derive(Iden)]
enum Books {
    Table,
    Id,
    Title,
    Author,
    Description,
    Price,
    Image,
    Quantity,
    CategoryId,
}

#[derive(Iden)]
enum BorrowingHistory {
    Table,
    Id,
    UserId,
    BookId,
    Kind,
    Name,
    Email,
    BorrowDate,
    ReturnDate,
}

#[derive(Iden)]
enum Reviews {
    Table,
    Id,
    UserId,
    BookId,
    Content,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(
                        ColumnDef::new(Users::FirstName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::LastName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. User profiles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfiles::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::Balance)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(UserProfiles::Balance).gte(0)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_profiles-user_id")
                            .from(UserProfiles::Table, UserProfiles::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(
                        ColumnDef::new(Categories::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Books
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Books::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Books::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Books::Title).string().not_null())
                    .col(ColumnDef::new(Books::Author).string().not_null())
                    .col(ColumnDef::new(Books::Description).text().not_null())
                    .col(
                        ColumnDef::new(Books::Price)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Books::Price).gte(0)),
                    )
                    .col(ColumnDef::new(Books::Image).string())
                    .col(
                        ColumnDef::new(Books::Quantity)
                            .integer()
                            .not_null()
                            .check(Expr::col(Books::Quantity).gte(0)),
                    )
                    .col(ColumnDef::new(Books::CategoryId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-books-category_id")
                            .from(Books::Table, Books::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-books-category_id")
                    .table(Books::Table)
                    .col(Books::CategoryId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Borrowing history
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BorrowingHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BorrowingHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BorrowingHistory::UserId).string().not_null())
                    .col(ColumnDef::new(BorrowingHistory::BookId).integer().not_null())
                    .col(
                        ColumnDef::new(BorrowingHistory::Kind)
                            .string()
                            .not_null()
                            .default("borrow"),
                    )
                    .col(ColumnDef::new(BorrowingHistory::Name).string().not_null())
                    .col(ColumnDef::new(BorrowingHistory::Email).string().not_null())
                    .col(
                        ColumnDef::new(BorrowingHistory::BorrowDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BorrowingHistory::ReturnDate).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-borrowing_history-user_id")
                            .from(BorrowingHistory::Table, BorrowingHistory::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-borrowing_history-book_id")
                            .from(BorrowingHistory::Table, BorrowingHistory::BookId)
                            .to(Books::Table, Books::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-borrowing_history-user_id-book_id")
                    .table(BorrowingHistory::Table)
                    .col(BorrowingHistory::UserId)
                    .col(BorrowingHistory::BookId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Reviews
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reviews::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reviews::UserId).string().not_null())
                    .col(ColumnDef::new(Reviews::BookId).integer().not_null())
                    .col(ColumnDef::new(Reviews::Content).text().not_null())
                    .col(
                        ColumnDef::new(Reviews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reviews-user_id")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reviews-book_id")
                            .from(Reviews::Table, Reviews::BookId)
                            .to(Books::Table, Books::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-reviews-book_id")
                    .table(Reviews::Table)
                    .col(Reviews::BookId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse order of creation (FK dependencies).
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BorrowingHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Books::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
