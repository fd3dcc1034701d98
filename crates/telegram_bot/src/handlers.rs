use engine::Command;
use teloxide::{
    RequestError,
    dispatching::{HandlerExt, UpdateHandler},
    prelude::*,
    types::User,
    utils::command::BotCommands,
};

use crate::{ConfigParameters, commands::Commands};

const USAGE: &str = "Keep running totals for your invoices.\n\n\
#1 +100 adds 100 to invoice #1\n\
#1 *2 doubles it, -, / work too\n\
#1 +(20-5)*2 full expressions are fine, $ is ignored\n\n\
history shows every invoice of this chat\n\
total shows them with the sum of all totals\n\
clear forgets everything in this chat";

/// Slash commands first, then every other text message.
pub(crate) fn schema() -> UpdateHandler<RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Commands>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message))
}

async fn handle_command(bot: Bot, msg: Message, cmd: Commands) -> ResponseResult<()> {
    let text = match cmd {
        Commands::Help => format!("{USAGE}\n\n{}", Commands::descriptions()),
        Commands::Start => USAGE.to_string(),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, cfg: ConfigParameters) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // Chatter is dropped before any call to Telegram.
    if Command::parse(text).is_none() {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    if cfg.admins_only
        && !msg.chat.is_private()
        && !is_privileged(&bot, chat_id, msg.from.as_ref()).await?
    {
        tracing::debug!(chat_id = chat_id.0, "command from non administrator ignored");
        return Ok(());
    }

    if let Some(reply) = cfg.engine.interpret(&chat_id.0.to_string(), text).await {
        bot.send_message(chat_id, reply).await?;
    }
    Ok(())
}

async fn is_privileged(bot: &Bot, chat_id: ChatId, from: Option<&User>) -> ResponseResult<bool> {
    let Some(from) = from else {
        return Ok(false);
    };
    let member = bot.get_chat_member(chat_id, from.id).await?;
    Ok(member.is_privileged())
}
