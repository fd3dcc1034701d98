//! Initial schema migration.
//!
//! - `chats`: conversations that touched at least one invoice
//! - `invoices`: running totals keyed by `(chat_id, number)`
//! - `chat_invoices`: invoice numbers per chat, in registration order

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Chats {
    Table,
    Id,
    CreatedAt,
}

#[derive(Iden)]
enum Invoices {
    Table,
    ChatId,
    Number,
    Total,
    History,
    Operations,
    UpdatedAt,
}

#[derive(Iden)]
enum ChatInvoices {
    Table,
    Id,
    ChatId,
    Number,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chats::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Chats::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Chats::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::ChatId).string().not_null())
                    .col(ColumnDef::new(Invoices::Number).string().not_null())
                    .col(
                        ColumnDef::new(Invoices::Total)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Invoices::History)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::Operations)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Invoices::ChatId)
                            .col(Invoices::Number),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-chat_id")
                            .from(Invoices::Table, Invoices::ChatId)
                            .to(Chats::Table, Chats::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatInvoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatInvoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatInvoices::ChatId).string().not_null())
                    .col(ColumnDef::new(ChatInvoices::Number).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-chat_invoices-chat_id")
                            .from(ChatInvoices::Table, ChatInvoices::ChatId)
                            .to(Chats::Table, Chats::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-chat_invoices-chat_id-number-unique")
                    .table(ChatInvoices::Table)
                    .col(ChatInvoices::ChatId)
                    .col(ChatInvoices::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatInvoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Chats::Table).to_owned())
            .await?;
        Ok(())
    }
}
