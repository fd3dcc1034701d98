//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`MissingInvoiceNumber`] thrown when a command carries no `#<digits>` token.
//! - [`MissingOperatorPrefix`] thrown when the operation does not start with an operator.
//! - [`Evaluation`] thrown when the expression cannot be computed.
//! - [`Persistence`] thrown when the store is not reachable.
//!
//!  [`MissingInvoiceNumber`]: EngineError::MissingInvoiceNumber
//!  [`MissingOperatorPrefix`]: EngineError::MissingOperatorPrefix
//!  [`Evaluation`]: EngineError::Evaluation
//!  [`Persistence`]: EngineError::Persistence
use sea_orm::DbErr;
use thiserror::Error;

use crate::evaluator::EvaluationError;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invoice number is required!")]
    MissingInvoiceNumber,
    #[error("Operation must start with one of +, -, *, /")]
    MissingOperatorPrefix,
    #[error("Invalid operation fragment: \"{0}\"")]
    InvalidOperationFragment(String),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Persistence(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingInvoiceNumber, Self::MissingInvoiceNumber) => true,
            (Self::MissingOperatorPrefix, Self::MissingOperatorPrefix) => true,
            (Self::InvalidOperationFragment(a), Self::InvalidOperationFragment(b)) => a == b,
            (Self::Evaluation(a), Self::Evaluation(b)) => a == b,
            (Self::InvalidRecord(a), Self::InvalidRecord(b)) => a == b,
            (Self::Persistence(a), Self::Persistence(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
