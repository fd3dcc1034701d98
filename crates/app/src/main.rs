use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tally={level},telegram_bot={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    // Without a working store there is nothing to serve.
    let engine = Arc::new(build_engine(&settings.database).await?);

    let Some(telegram) = settings.telegram else {
        tracing::warn!("No telegram settings found, nothing to run");
        return Ok(());
    };

    let mut builder = telegram_bot::Bot::builder()
        .token(&telegram.token)
        .engine(engine)
        .admins_only(telegram.admins_only);
    if let Some(webhook) = telegram.webhook {
        builder = builder.webhook(&webhook.url, webhook.bind, webhook.secret_token)?;
    }
    let bot = builder.build()?;

    tasks.spawn(async move {
        tracing::info!("Found telegram settings...");
        if let Err(err) = bot.run().await {
            tracing::error!("telegram bot stopped: {err}");
        }
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn build_engine(
    config: &Database,
) -> Result<engine::Engine, Box<dyn std::error::Error + Send + Sync>> {
    let builder = match config {
        Database::Memory => {
            tracing::warn!("Using the in-memory store, invoices are lost on restart");
            engine::Engine::builder()
        }
        Database::Sqlite(path) => {
            let database = sea_orm::Database::connect(format!("sqlite:{path}?mode=rwc")).await?;
            Migrator::up(&database, None).await?;
            engine::Engine::builder().database(database)
        }
    };

    Ok(builder.build().await?)
}
