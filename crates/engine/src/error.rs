//! The module contains the errors the engine can throw.
//!
//! Every error is a terminal outcome of a single user action. They are grouped
//! by [`ErrorKind`] so the HTTP layer can pick a status code:
//!
//! - validation: [`Validation`], [`InvalidAmount`]
//! - business rules: [`OutOfStock`], [`InsufficientFunds`], [`AlreadyReturned`],
//!   [`NotReturnable`], [`NotAcquired`]
//! - authorization: [`Forbidden`]
//!
//!  [`Validation`]: EngineError::Validation
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`OutOfStock`]: EngineError::OutOfStock
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`AlreadyReturned`]: EngineError::AlreadyReturned
//!  [`NotReturnable`]: EngineError::NotReturnable
//!  [`NotAcquired`]: EngineError::NotAcquired
//!  [`Forbidden`]: EngineError::Forbidden
use sea_orm::DbErr;
use thiserror::Error;

/// Coarse classification of an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    BusinessRule,
    Authorization,
    NotFound,
    Conflict,
    Internal,
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" is out of stock.")]
    OutOfStock(String),
    #[error("Insufficient balance to {0}.")]
    InsufficientFunds(String),
    #[error("\"{0}\" has already been returned.")]
    AlreadyReturned(String),
    #[error("\"{0}\" was purchased and cannot be returned.")]
    NotReturnable(String),
    #[error("You can only review books you have purchased or borrowed.")]
    NotAcquired(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidAmount(_) => ErrorKind::Validation,
            Self::OutOfStock(_)
            | Self::InsufficientFunds(_)
            | Self::AlreadyReturned(_)
            | Self::NotReturnable(_)
            | Self::NotAcquired(_) => ErrorKind::BusinessRule,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::ExistingKey(_) => ErrorKind::Conflict,
            Self::PasswordHash(_) | Self::Database(_) => ErrorKind::Internal,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::OutOfStock(a), Self::OutOfStock(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::AlreadyReturned(a), Self::AlreadyReturned(b)) => a == b,
            (Self::NotReturnable(a), Self::NotReturnable(b)) => a == b,
            (Self::NotAcquired(a), Self::NotAcquired(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::PasswordHash(a), Self::PasswordHash(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_messages_are_user_facing() {
        assert_eq!(
            EngineError::OutOfStock("Dune".to_string()).to_string(),
            "\"Dune\" is out of stock."
        );
        assert_eq!(
            EngineError::InsufficientFunds("borrow \"Dune\"".to_string()).to_string(),
            "Insufficient balance to borrow \"Dune\"."
        );
        assert_eq!(
            EngineError::AlreadyReturned("Dune".to_string()).to_string(),
            "\"Dune\" has already been returned."
        );
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            EngineError::Validation("x".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::NotAcquired("x".to_string()).kind(),
            ErrorKind::BusinessRule
        );
        assert_eq!(
            EngineError::Forbidden("x".to_string()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            EngineError::Database(DbErr::Custom("x".to_string())).kind(),
            ErrorKind::Internal
        );
    }
}
