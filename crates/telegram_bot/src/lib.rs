//! Telegram bot.
//!
//! The bot is a transport adapter: every text message that passes the
//! acceptance filter and the sender check is handed to
//! [`Engine::interpret`](engine::Engine::interpret) and the reply, if any, is
//! sent back to the same chat.

use std::{net::SocketAddr, sync::Arc};

use engine::Engine;
use reqwest::Url;
use teloxide::{prelude::*, update_listeners::webhooks, utils::command::BotCommands};

mod commands;
mod handlers;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("telegram token is missing")]
    MissingToken,
    #[error("engine is missing")]
    MissingEngine,
    #[error("invalid webhook url {url:?}: {reason}")]
    InvalidWebhookUrl { url: String, reason: String },
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
}

#[derive(Clone)]
pub struct ConfigParameters {
    engine: Arc<Engine>,
    admins_only: bool,
}

/// Where Telegram delivers updates when long polling is not used.
#[derive(Clone, Debug)]
pub struct Webhook {
    pub url: Url,
    pub bind: SocketAddr,
    pub secret_token: Option<String>,
}

pub struct Bot {
    token: String,
    engine: Arc<Engine>,
    admins_only: bool,
    webhook: Option<Webhook>,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Serve updates until ctrl-c.
    pub async fn run(&self) -> Result<(), BotError> {
        tracing::info!("Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);
        bot.set_my_commands(commands::Commands::bot_commands())
            .await?;

        let parameters = ConfigParameters {
            engine: self.engine.clone(),
            admins_only: self.admins_only,
        };

        let mut dispatcher = Dispatcher::builder(bot.clone(), handlers::schema())
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::trace!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build();

        match &self.webhook {
            None => dispatcher.dispatch().await,
            Some(webhook) => {
                tracing::info!(url = %webhook.url, bind = %webhook.bind, "Listening for webhook updates");
                let mut options = webhooks::Options::new(webhook.bind, webhook.url.clone());
                if let Some(secret) = &webhook.secret_token {
                    options = options.secret_token(secret.clone());
                }
                let listener = webhooks::axum(bot, options).await?;
                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text(
                            "An error from the update listener",
                        ),
                    )
                    .await;
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    engine: Option<Arc<Engine>>,
    admins_only: bool,
    webhook: Option<Webhook>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    pub fn engine(mut self, engine: Arc<Engine>) -> BotBuilder {
        self.engine = Some(engine);
        self
    }

    /// Accept commands from group administrators and owners only.
    pub fn admins_only(mut self, admins_only: bool) -> BotBuilder {
        self.admins_only = admins_only;
        self
    }

    pub fn webhook(
        mut self,
        url: &str,
        bind: SocketAddr,
        secret_token: Option<String>,
    ) -> Result<BotBuilder, BotError> {
        let url = Url::parse(url).map_err(|err| BotError::InvalidWebhookUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        self.webhook = Some(Webhook {
            url,
            bind,
            secret_token,
        });
        Ok(self)
    }

    pub fn build(self) -> Result<Bot, BotError> {
        tracing::info!("Initializing telegram bot...");
        if self.token.trim().is_empty() {
            return Err(BotError::MissingToken);
        }
        let engine = self.engine.ok_or(BotError::MissingEngine)?;

        Ok(Bot {
            token: self.token,
            engine,
            admins_only: self.admins_only,
            webhook: self.webhook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine() -> Arc<Engine> {
        Arc::new(Engine::builder().build().await.unwrap())
    }

    #[tokio::test]
    async fn build_requires_token() {
        let err = Bot::builder().engine(engine().await).build().err();
        assert!(matches!(err, Some(BotError::MissingToken)));
    }

    #[tokio::test]
    async fn build_requires_engine() {
        let err = Bot::builder().token("123:abc").build().err();
        assert!(matches!(err, Some(BotError::MissingEngine)));
    }

    #[tokio::test]
    async fn webhook_url_is_validated() {
        let bind: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        let err = Bot::builder().webhook("not a url", bind, None).err();
        assert!(matches!(err, Some(BotError::InvalidWebhookUrl { .. })));

        let bot = Bot::builder()
            .token("123:abc")
            .engine(engine().await)
            .admins_only(true)
            .webhook("https://example.org/bot/secret", bind, Some("s3cret".into()))
            .unwrap()
            .build()
            .unwrap();
        let webhook = bot.webhook.unwrap();
        assert_eq!(webhook.url.path(), "/bot/secret");
        assert_eq!(webhook.secret_token.as_deref(), Some("s3cret"));
        assert!(bot.admins_only);
    }
}
