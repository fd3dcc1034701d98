//! Invoice ledger engine.
//!
//! Chats keep named invoices (`#1`, `#2`, ...) whose totals are updated by
//! short arithmetic operations. The [`Engine`] owns the store, the evaluator
//! and the lock registry; transports only call [`Engine::interpret`].

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use commands::{Command, Operation};
pub use error::EngineError;
pub use evaluator::{Calculator, EvaluationError, Evaluator};
pub use index::ChatIndex;
pub use invoice::{InvoiceState, replay};
pub use ledger::{Drift, Ledger};
pub use store::{ChatSummary, DatabaseStore, LedgerStore, MemoryStore};

pub mod commands;
mod error;
mod evaluator;
mod index;
mod invoice;
mod ledger;
mod locks;
mod store;

mod chat_invoices;
mod chats;
mod invoices;

type ResultEngine<T> = Result<T, EngineError>;

#[derive(Debug)]
pub struct Engine {
    store: Arc<dyn LedgerStore>,
    evaluator: Arc<dyn Evaluator>,
    locks: locks::ChatLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self.store.as_ref(), self.evaluator.as_ref())
    }

    pub fn index(&self) -> ChatIndex<'_> {
        ChatIndex::new(self.store.as_ref())
    }

    /// Invoices of the chat in registration order, read under the chat lock
    /// so a concurrent clear is never seen half done.
    pub async fn invoices(&self, chat_id: &str) -> ResultEngine<Vec<InvoiceState>> {
        let _guard = self.locks.read(chat_id).await;
        let ledger = self.ledger();
        let mut invoices = Vec::new();
        for number in self.index().list_invoice_numbers(chat_id).await? {
            invoices.push(ledger.get_or_create(chat_id, &number).await?);
        }
        Ok(invoices)
    }

    /// Check every invoice of the chat against its history, see
    /// [`Ledger::recompute`].
    pub async fn recompute(&self, chat_id: &str, fix: bool) -> ResultEngine<Vec<Drift>> {
        let _guard = self.locks.write(chat_id).await;
        self.ledger().recompute(chat_id, fix).await
    }

    pub async fn chats(&self) -> ResultEngine<Vec<ChatSummary>> {
        self.index().chats().await
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: Option<DatabaseConnection>,
    store: Option<Arc<dyn LedgerStore>>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

impl EngineBuilder {
    /// Persist through sea-orm. The schema must already be migrated.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = Some(db);
        self
    }

    /// Use a custom store. Ignored when a database is set.
    pub fn store(mut self, store: Arc<dyn LedgerStore>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> EngineBuilder {
        self.evaluator = Some(evaluator);
        self
    }

    /// Construct `Engine`. Without a database or a store the engine keeps
    /// everything in memory.
    ///
    /// Fails when the database does not answer.
    pub async fn build(self) -> ResultEngine<Engine> {
        let store: Arc<dyn LedgerStore> = match (self.database, self.store) {
            (Some(db), _) => {
                db.ping().await?;
                Arc::new(DatabaseStore::new(db))
            }
            (None, Some(store)) => store,
            (None, None) => Arc::new(MemoryStore::new()),
        };

        Ok(Engine {
            store,
            evaluator: self.evaluator.unwrap_or_else(|| Arc::new(Calculator)),
            locks: locks::ChatLocks::default(),
        })
    }
}
