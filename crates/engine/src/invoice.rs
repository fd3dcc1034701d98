//! The `InvoiceState` is a named running calculation inside a chat.
//!
//! The total is a cache of the operation fragments: replaying them from 0
//! through the evaluator, rounding after every step, gives the total back.

use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    evaluator::{Evaluator, round_to_integer},
    invoices,
};

/// Operators an operation fragment may start with.
pub(crate) const OPERATORS: &[char] = &['+', '-', '*', '/'];

/// Current state of one invoice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceState {
    pub number: String,
    pub total: i64,
    /// Raw fragments in application order.
    pub operations: Vec<String>,
}

impl InvoiceState {
    /// Fresh zero-state, nothing applied yet.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            total: 0,
            operations: Vec::new(),
        }
    }

    /// The textual log rendered to users: the fragments concatenated.
    pub fn history(&self) -> String {
        self.operations.concat()
    }

    /// Compute the state after `fragment` without touching any store.
    pub(crate) fn applied(&self, fragment: &str, evaluator: &dyn Evaluator) -> ResultEngine<Self> {
        let total = step(self.total, fragment, evaluator)?;
        let mut operations = self.operations.clone();
        operations.push(fragment.to_string());
        Ok(Self {
            number: self.number.clone(),
            total,
            operations,
        })
    }
}

/// Fold `operations` over a seed of 0, the way the ledger applied them.
pub fn replay(operations: &[String], evaluator: &dyn Evaluator) -> ResultEngine<i64> {
    operations
        .iter()
        .try_fold(0, |total, fragment| step(total, fragment, evaluator))
}

fn step(seed: i64, fragment: &str, evaluator: &dyn Evaluator) -> ResultEngine<i64> {
    if !fragment.starts_with(OPERATORS) {
        return Err(EngineError::InvalidOperationFragment(fragment.to_string()));
    }
    let value = evaluator.evaluate(&format!("{seed}{fragment}"))?;
    Ok(round_to_integer(value)?)
}

impl TryFrom<invoices::Model> for InvoiceState {
    type Error = EngineError;

    fn try_from(model: invoices::Model) -> Result<Self, Self::Error> {
        let operations: Vec<String> = serde_json::from_str(&model.operations).map_err(|err| {
            EngineError::InvalidRecord(format!(
                "operations of invoice {} are not valid: {err}",
                model.number
            ))
        })?;
        Ok(Self {
            number: model.number,
            total: model.total,
            operations,
        })
    }
}
