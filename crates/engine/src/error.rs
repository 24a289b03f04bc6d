//! The module contains the errors the engine can return.
//!
//! State-machine violations are surfaced to the caller:
//!
//! - [`AlreadyClosed`] when a closed period is closed again.
//! - [`InvalidPeriod`] when a period is not the one an operation expects.
//! - [`PeriodClosed`] when a write would touch a closed period.
//!
//! [`DuplicateExpansion`] only exists so the store can report a lost insert
//! race; the expander absorbs it.
//!
//!  [`AlreadyClosed`]: EngineError::AlreadyClosed
//!  [`InvalidPeriod`]: EngineError::InvalidPeriod
//!  [`PeriodClosed`]: EngineError::PeriodClosed
//!  [`DuplicateExpansion`]: EngineError::DuplicateExpansion
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Period {0} is already closed")]
    AlreadyClosed(String),
    #[error("Period closed: {0}")]
    PeriodClosed(String),
    #[error("Duplicate expansion: {0}")]
    DuplicateExpansion(String),
    #[error("Category mismatch: {0}")]
    CategoryMismatch(String),
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid kind: {0}")]
    InvalidKind(String),
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidPeriod(a), Self::InvalidPeriod(b)) => a == b,
            (Self::AlreadyClosed(a), Self::AlreadyClosed(b)) => a == b,
            (Self::PeriodClosed(a), Self::PeriodClosed(b)) => a == b,
            (Self::DuplicateExpansion(a), Self::DuplicateExpansion(b)) => a == b,
            (Self::CategoryMismatch(a), Self::CategoryMismatch(b)) => a == b,
            (Self::ConcurrencyConflict(a), Self::ConcurrencyConflict(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::InvalidTemplate(a), Self::InvalidTemplate(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
