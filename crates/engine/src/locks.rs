//! Per-chat and per-invoice serialization.
//!
//! Invoice operations hold the chat lock shared and their invoice lock
//! exclusively; clearing a chat holds the chat lock exclusively. Reads of a
//! whole chat (history, total) hold the chat lock shared.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type InvoiceKey = (String, String);

#[derive(Debug, Default)]
pub(crate) struct ChatLocks {
    chats: Mutex<HashMap<String, Arc<RwLock<()>>>>,
    invoices: Mutex<HashMap<InvoiceKey, Arc<Mutex<()>>>>,
}

/// Held while one invoice is read, computed and written back.
pub(crate) struct InvoiceGuard {
    _invoice: OwnedMutexGuard<()>,
    _chat: OwnedRwLockReadGuard<()>,
}

impl ChatLocks {
    async fn chat_lock(&self, chat_id: &str) -> Arc<RwLock<()>> {
        let mut chats = self.chats.lock().await;
        // Entries only the registry points to have no holder and no waiter.
        chats.retain(|_, lock| Arc::strong_count(lock) > 1);
        chats
            .entry(chat_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    pub(crate) async fn read(&self, chat_id: &str) -> OwnedRwLockReadGuard<()> {
        self.chat_lock(chat_id).await.read_owned().await
    }

    /// Exclusive access to a chat.
    pub(crate) async fn write(&self, chat_id: &str) -> OwnedRwLockWriteGuard<()> {
        self.chat_lock(chat_id).await.write_owned().await
    }

    pub(crate) async fn invoice(&self, chat_id: &str, number: &str) -> InvoiceGuard {
        let chat = self.read(chat_id).await;
        let invoice = {
            let mut invoices = self.invoices.lock().await;
            invoices.retain(|_, lock| Arc::strong_count(lock) > 1);
            invoices
                .entry((chat_id.to_string(), number.to_string()))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        InvoiceGuard {
            _invoice: invoice.lock_owned().await,
            _chat: chat,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_invoice_is_serialized() {
        let locks = ChatLocks::default();
        let first = locks.invoice("chat", "#1").await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.invoice("chat", "#1")).await;
        assert!(blocked.is_err());

        drop(first);
        let again =
            tokio::time::timeout(Duration::from_millis(50), locks.invoice("chat", "#1")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn different_invoices_do_not_block() {
        let locks = ChatLocks::default();
        let _first = locks.invoice("chat", "#1").await;
        let second =
            tokio::time::timeout(Duration::from_millis(50), locks.invoice("chat", "#2")).await;
        assert!(second.is_ok());
        let other_chat =
            tokio::time::timeout(Duration::from_millis(50), locks.invoice("other", "#1")).await;
        assert!(other_chat.is_ok());
    }

    #[tokio::test]
    async fn clearing_waits_for_invoice_operations() {
        let locks = ChatLocks::default();
        let op = locks.invoice("chat", "#1").await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.write("chat")).await;
        assert!(blocked.is_err());

        drop(op);
        let cleared = tokio::time::timeout(Duration::from_millis(50), locks.write("chat")).await;
        assert!(cleared.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_forgotten() {
        let locks = ChatLocks::default();
        drop(locks.read("a").await);
        drop(locks.invoice("b", "#1").await);
        drop(locks.write("c").await);

        let _held = locks.invoice("d", "#1").await;
        assert_eq!(locks.chats.lock().await.len(), 1);
        assert_eq!(locks.invoices.lock().await.len(), 1);

        let _other = locks.read("e").await;
        let chats = locks.chats.lock().await;
        assert!(chats.contains_key("d"), "held locks stay registered");
        assert!(chats.contains_key("e"));
    }
}
