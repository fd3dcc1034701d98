//! The chat index: which invoice numbers a chat has touched, in order.

use crate::{ResultEngine, store::ChatSummary, store::LedgerStore};

#[derive(Clone, Copy, Debug)]
pub struct ChatIndex<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> ChatIndex<'a> {
    pub(crate) fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    /// Track `number` in the chat. Registering twice keeps the first position.
    pub async fn register_reference(&self, chat_id: &str, number: &str) -> ResultEngine<()> {
        self.store.register_reference(chat_id, number).await
    }

    /// First-referenced-first. Empty for unknown chats.
    pub async fn list_invoice_numbers(&self, chat_id: &str) -> ResultEngine<Vec<String>> {
        self.store.invoice_numbers(chat_id).await
    }

    /// Drop the chat's tracked set. The chat's invoices go with it.
    pub async fn clear(&self, chat_id: &str) -> ResultEngine<()> {
        self.store.delete_chat(chat_id).await
    }

    pub async fn chats(&self) -> ResultEngine<Vec<ChatSummary>> {
        self.store.chats().await
    }
}
