pub use sea_orm_migration::prelude::*;

mod m20261018_090000_init;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261018_090000_init::Migration)]
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;

    use super::*;

    #[tokio::test]
    async fn schema_goes_up_and_down() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        Migrator::up(&db, None).await.unwrap();
        let manager = SchemaManager::new(&db);
        for table in ["chats", "invoices", "chat_invoices"] {
            assert!(manager.has_table(table).await.unwrap(), "{table} missing");
        }
        assert!(manager.has_column("invoices", "history").await.unwrap());

        Migrator::down(&db, Some(1)).await.unwrap();
        assert!(!manager.has_table("invoices").await.unwrap());

        Migrator::refresh(&db).await.unwrap();
        assert!(manager.has_table("chat_invoices").await.unwrap());
    }
}
