//! Conversions from engine values to API payloads.

use api_types::{
    catalog::{BookView, CategoryView},
    lending::{AcquisitionKind, BorrowingView},
    review::ReviewView,
    user::UserView,
};

pub fn book(book: engine::Book) -> BookView {
    BookView {
        id: book.id,
        title: book.title,
        author: book.author,
        description: book.description,
        price_minor: book.price.cents(),
        image: book.image,
        quantity: book.quantity,
        category_id: book.category_id,
    }
}

pub fn category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        description: category.description,
    }
}

pub fn user(user: engine::User) -> UserView {
    UserView {
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}

pub fn borrowing(borrowing: engine::Borrowing) -> BorrowingView {
    BorrowingView {
        id: borrowing.id,
        book_id: borrowing.book_id,
        book_title: borrowing.book_title,
        kind: match borrowing.kind {
            engine::AcquisitionKind::Borrow => AcquisitionKind::Borrow,
            engine::AcquisitionKind::Purchase => AcquisitionKind::Purchase,
        },
        name: borrowing.name,
        email: borrowing.email,
        borrow_date: borrowing.borrow_date,
        return_date: borrowing.return_date,
    }
}

pub fn review(review: engine::Review) -> ReviewView {
    ReviewView {
        id: review.id,
        username: review.username,
        book_id: review.book_id,
        content: review.content,
        created_at: review.created_at,
    }
}
