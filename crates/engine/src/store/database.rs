use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};

use crate::{EngineError, InvoiceState, ResultEngine, chat_invoices, chats, invoices};

use super::{ChatSummary, LedgerStore};

/// Store backed by a sea-orm connection. Every mutation runs inside one
/// database transaction.
#[derive(Clone, Debug)]
pub struct DatabaseStore {
    database: DatabaseConnection,
}

impl DatabaseStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

async fn ensure_chat<C: ConnectionTrait>(db: &C, chat_id: &str) -> ResultEngine<()> {
    let exists = chats::Entity::find_by_id(chat_id.to_string())
        .one(db)
        .await?
        .is_some();
    if !exists {
        chats::ActiveModel {
            id: ActiveValue::Set(chat_id.to_string()),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn ensure_reference<C: ConnectionTrait>(
    db: &C,
    chat_id: &str,
    number: &str,
) -> ResultEngine<()> {
    let exists = chat_invoices::Entity::find()
        .filter(chat_invoices::Column::ChatId.eq(chat_id))
        .filter(chat_invoices::Column::Number.eq(number))
        .one(db)
        .await?
        .is_some();
    if !exists {
        chat_invoices::ActiveModel {
            chat_id: ActiveValue::Set(chat_id.to_string()),
            number: ActiveValue::Set(number.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

fn encode_operations(invoice: &InvoiceState) -> ResultEngine<String> {
    serde_json::to_string(&invoice.operations).map_err(|err| {
        EngineError::InvalidRecord(format!(
            "cannot encode operations of invoice {}: {err}",
            invoice.number
        ))
    })
}

#[async_trait]
impl LedgerStore for DatabaseStore {
    async fn find_invoice(
        &self,
        chat_id: &str,
        number: &str,
    ) -> ResultEngine<Option<InvoiceState>> {
        invoices::Entity::find_by_id((chat_id.to_string(), number.to_string()))
            .one(&self.database)
            .await?
            .map(InvoiceState::try_from)
            .transpose()
    }

    async fn save_invoice(&self, chat_id: &str, invoice: &InvoiceState) -> ResultEngine<()> {
        let operations = encode_operations(invoice)?;

        let db_tx = self.database.begin().await?;
        ensure_chat(&db_tx, chat_id).await?;
        ensure_reference(&db_tx, chat_id, &invoice.number).await?;

        let existing =
            invoices::Entity::find_by_id((chat_id.to_string(), invoice.number.clone()))
                .one(&db_tx)
                .await?;
        let model = invoices::ActiveModel {
            chat_id: ActiveValue::Set(chat_id.to_string()),
            number: ActiveValue::Set(invoice.number.clone()),
            total: ActiveValue::Set(invoice.total),
            history: ActiveValue::Set(invoice.history()),
            operations: ActiveValue::Set(operations),
            updated_at: ActiveValue::Set(Utc::now()),
        };
        if existing.is_some() {
            model.update(&db_tx).await?;
        } else {
            model.insert(&db_tx).await?;
        }

        db_tx.commit().await?;
        Ok(())
    }

    async fn register_reference(&self, chat_id: &str, number: &str) -> ResultEngine<()> {
        let db_tx = self.database.begin().await?;
        ensure_chat(&db_tx, chat_id).await?;
        ensure_reference(&db_tx, chat_id, number).await?;
        db_tx.commit().await?;
        Ok(())
    }

    async fn invoice_numbers(&self, chat_id: &str) -> ResultEngine<Vec<String>> {
        let references = chat_invoices::Entity::find()
            .filter(chat_invoices::Column::ChatId.eq(chat_id))
            .order_by_asc(chat_invoices::Column::Id)
            .all(&self.database)
            .await?;
        Ok(references.into_iter().map(|r| r.number).collect())
    }

    async fn delete_chat(&self, chat_id: &str) -> ResultEngine<()> {
        // Explicit deletes: SQLite only cascades when foreign keys are enabled
        // on the connection.
        let db_tx = self.database.begin().await?;
        invoices::Entity::delete_many()
            .filter(invoices::Column::ChatId.eq(chat_id))
            .exec(&db_tx)
            .await?;
        chat_invoices::Entity::delete_many()
            .filter(chat_invoices::Column::ChatId.eq(chat_id))
            .exec(&db_tx)
            .await?;
        chats::Entity::delete_by_id(chat_id.to_string())
            .exec(&db_tx)
            .await?;
        db_tx.commit().await?;
        Ok(())
    }

    async fn chat_exists(&self, chat_id: &str) -> ResultEngine<bool> {
        Ok(chats::Entity::find_by_id(chat_id.to_string())
            .one(&self.database)
            .await?
            .is_some())
    }

    async fn create_chat(&self, chat_id: &str) -> ResultEngine<()> {
        ensure_chat(&self.database, chat_id).await
    }

    async fn chats(&self) -> ResultEngine<Vec<ChatSummary>> {
        let models = chats::Entity::find()
            .order_by_asc(chats::Column::CreatedAt)
            .order_by_asc(chats::Column::Id)
            .all(&self.database)
            .await?;

        let mut summaries = Vec::with_capacity(models.len());
        for model in models {
            let invoices = invoices::Entity::find()
                .filter(invoices::Column::ChatId.eq(model.id.clone()))
                .count(&self.database)
                .await?;
            summaries.push(ChatSummary {
                chat_id: model.id,
                created_at: model.created_at,
                invoices: usize::try_from(invoices).unwrap_or(usize::MAX),
            });
        }
        Ok(summaries)
    }
}
