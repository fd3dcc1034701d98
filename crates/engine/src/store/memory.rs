use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{InvoiceState, ResultEngine};

use super::{ChatSummary, LedgerStore};

#[derive(Debug)]
struct ChatEntry {
    created_at: DateTime<Utc>,
    numbers: Vec<String>,
    invoices: HashMap<String, InvoiceState>,
}

impl ChatEntry {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            numbers: Vec::new(),
            invoices: HashMap::new(),
        }
    }

    fn register(&mut self, number: &str) {
        if !self.numbers.iter().any(|n| n == number) {
            self.numbers.push(number.to_string());
        }
    }
}

/// In-process store. Every operation holds one lock over all chats, so each
/// write is atomic by construction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chats: Mutex<HashMap<String, ChatEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn find_invoice(
        &self,
        chat_id: &str,
        number: &str,
    ) -> ResultEngine<Option<InvoiceState>> {
        let guard = self.chats.lock().await;
        Ok(guard
            .get(chat_id)
            .and_then(|chat| chat.invoices.get(number))
            .cloned())
    }

    async fn save_invoice(&self, chat_id: &str, invoice: &InvoiceState) -> ResultEngine<()> {
        let mut guard = self.chats.lock().await;
        let chat = guard
            .entry(chat_id.to_string())
            .or_insert_with(ChatEntry::new);
        chat.register(&invoice.number);
        chat.invoices.insert(invoice.number.clone(), invoice.clone());
        Ok(())
    }

    async fn register_reference(&self, chat_id: &str, number: &str) -> ResultEngine<()> {
        let mut guard = self.chats.lock().await;
        guard
            .entry(chat_id.to_string())
            .or_insert_with(ChatEntry::new)
            .register(number);
        Ok(())
    }

    async fn invoice_numbers(&self, chat_id: &str) -> ResultEngine<Vec<String>> {
        let guard = self.chats.lock().await;
        Ok(guard
            .get(chat_id)
            .map(|chat| chat.numbers.clone())
            .unwrap_or_default())
    }

    async fn delete_chat(&self, chat_id: &str) -> ResultEngine<()> {
        self.chats.lock().await.remove(chat_id);
        Ok(())
    }

    async fn chat_exists(&self, chat_id: &str) -> ResultEngine<bool> {
        Ok(self.chats.lock().await.contains_key(chat_id))
    }

    async fn create_chat(&self, chat_id: &str) -> ResultEngine<()> {
        self.chats
            .lock()
            .await
            .entry(chat_id.to_string())
            .or_insert_with(ChatEntry::new);
        Ok(())
    }

    async fn chats(&self) -> ResultEngine<Vec<ChatSummary>> {
        let guard = self.chats.lock().await;
        let mut chats: Vec<ChatSummary> = guard
            .iter()
            .map(|(chat_id, chat)| ChatSummary {
                chat_id: chat_id.clone(),
                created_at: chat.created_at,
                invoices: chat.invoices.len(),
            })
            .collect();
        chats.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.chat_id.cmp(&b.chat_id))
        });
        Ok(chats)
    }
}
