//! The invoice ledger: the only writer of invoice state.

use serde::Serialize;

use crate::{
    InvoiceState, ResultEngine, evaluator::Evaluator, invoice::replay, store::LedgerStore,
};

/// An invoice whose stored total disagrees with its replayed history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub number: String,
    pub stored: i64,
    pub replayed: i64,
}

/// Per-(chat, invoice) totals and histories.
///
/// The ledger does no locking of its own; [`Engine`](crate::Engine) takes the
/// chat and invoice locks around every call it makes.
#[derive(Clone, Copy, Debug)]
pub struct Ledger<'a> {
    store: &'a dyn LedgerStore,
    evaluator: &'a dyn Evaluator,
}

impl<'a> Ledger<'a> {
    pub(crate) fn new(store: &'a dyn LedgerStore, evaluator: &'a dyn Evaluator) -> Self {
        Self { store, evaluator }
    }

    /// Existing state, or a fresh zero-state that is not persisted.
    pub async fn get_or_create(&self, chat_id: &str, number: &str) -> ResultEngine<InvoiceState> {
        Ok(self
            .store
            .find_invoice(chat_id, number)
            .await?
            .unwrap_or_else(|| InvoiceState::new(number)))
    }

    /// Evaluate `<current.total><fragment>`, round it, append `fragment` to
    /// the history and persist the result together with the chat reference.
    ///
    /// Nothing is written when the fragment is rejected or evaluation fails.
    pub async fn apply(
        &self,
        chat_id: &str,
        current: &InvoiceState,
        fragment: &str,
    ) -> ResultEngine<InvoiceState> {
        let updated = current.applied(fragment, self.evaluator)?;
        self.store.save_invoice(chat_id, &updated).await?;
        tracing::debug!(
            chat_id,
            invoice = %updated.number,
            total = updated.total,
            "invoice updated"
        );
        Ok(updated)
    }

    /// Delete every invoice of the chat. The chat index goes in the same
    /// store write. No-op for unknown chats.
    pub async fn clear_chat(&self, chat_id: &str) -> ResultEngine<()> {
        self.store.delete_chat(chat_id).await
    }

    /// Replay every invoice of the chat from 0 and report totals that do not
    /// match. With `fix`, drifted totals are overwritten with the replay.
    pub async fn recompute(&self, chat_id: &str, fix: bool) -> ResultEngine<Vec<Drift>> {
        let mut drifts = Vec::new();
        for number in self.store.invoice_numbers(chat_id).await? {
            let Some(mut invoice) = self.store.find_invoice(chat_id, &number).await? else {
                continue;
            };
            let replayed = replay(&invoice.operations, self.evaluator)?;
            if replayed == invoice.total {
                continue;
            }

            tracing::warn!(
                chat_id,
                invoice = %number,
                stored = invoice.total,
                replayed,
                "invoice total drifted from its history"
            );
            drifts.push(Drift {
                number,
                stored: invoice.total,
                replayed,
            });
            if fix {
                invoice.total = replayed;
                self.store.save_invoice(chat_id, &invoice).await?;
            }
        }
        Ok(drifts)
    }
}
