//! Slash commands understood by the bot. Ledger commands are plain text and
//! never go through here.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Invoice tally commands:")]
pub enum Commands {
    #[command(description = "Show how to use the bot.")]
    Help,
    #[command(description = "Start using the bot.")]
    Start,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_slash_commands() {
        assert!(matches!(
            Commands::parse("/help", "tally_bot"),
            Ok(Commands::Help)
        ));
        assert!(matches!(
            Commands::parse("/start@tally_bot", "tally_bot"),
            Ok(Commands::Start)
        ));
        assert!(Commands::parse("#1 +100", "tally_bot").is_err());
    }
}
