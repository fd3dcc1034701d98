//! Persistence seam of the engine.
//!
//! The ledger and the chat index never talk to a storage technology
//! directly: they go through [`LedgerStore`]. Two implementations ship with
//! the engine, [`MemoryStore`] (plain maps, lost on restart) and
//! [`DatabaseStore`] (sea-orm, schema from the `migration` crate).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{InvoiceState, ResultEngine};

mod database;
mod memory;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

/// A chat known to the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatSummary {
    pub chat_id: String,
    pub created_at: DateTime<Utc>,
    pub invoices: usize,
}

#[async_trait]
pub trait LedgerStore: Send + Sync + std::fmt::Debug {
    async fn find_invoice(&self, chat_id: &str, number: &str)
    -> ResultEngine<Option<InvoiceState>>;

    /// Register `invoice.number` in the chat and upsert the invoice, as one
    /// write. The chat is created if missing.
    async fn save_invoice(&self, chat_id: &str, invoice: &InvoiceState) -> ResultEngine<()>;

    /// Add `number` to the chat's tracked set. Registering twice is a no-op.
    async fn register_reference(&self, chat_id: &str, number: &str) -> ResultEngine<()>;

    /// Tracked invoice numbers in registration order.
    async fn invoice_numbers(&self, chat_id: &str) -> ResultEngine<Vec<String>>;

    /// Drop the chat with its invoices and tracked numbers, as one write.
    async fn delete_chat(&self, chat_id: &str) -> ResultEngine<()>;

    async fn chat_exists(&self, chat_id: &str) -> ResultEngine<bool>;

    async fn create_chat(&self, chat_id: &str) -> ResultEngine<()>;

    async fn chats(&self) -> ResultEngine<Vec<ChatSummary>>;
}
