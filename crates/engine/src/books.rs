//! The module contains `Book`, a catalog entry with a price and a stock.

use sea_orm::entity::prelude::*;

use crate::MoneyCents;

/// A book of the catalog.
///
/// `quantity` is the number of copies that can still be borrowed or bought;
/// it never goes below zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: MoneyCents,
    /// Path or URL of the cover image, if any.
    pub image: Option<String>,
    pub quantity: i32,
    pub category_id: i32,
}

impl Book {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Price in cents.
    pub price: i64,
    pub image: Option<String>,
    pub quantity: i32,
    pub category_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
    #[sea_orm(has_many = "super::borrowings::Entity")]
    Borrowings,
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::borrowings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrowings.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Book {
    fn from(value: Model) -> Self {
        Self {
            id: value.id,
            title: value.title,
            author: value.author,
            description: value.description,
            price: MoneyCents::new(value.price),
            image: value.image,
            quantity: value.quantity,
            category_id: value.category_id,
        }
    }
}
