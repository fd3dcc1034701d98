//! The command interpreter.
//!
//! One text message in, at most one reply out. Text that does not look like
//! a ledger command is ignored without touching any state.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    Engine, EngineError, EvaluationError, InvoiceState, ResultEngine, invoice::OPERATORS,
};

pub const NO_HISTORY: &str = "There's no history";
pub const NO_HISTORY_TO_TOTAL: &str = "There's no history to calculate the total";
pub const HISTORY_CLEARED: &str = "History cleared! 🎉";
pub const INVOICE_REQUIRED: &str = "Invoice number is required!";
pub const OPERATOR_REQUIRED: &str = "Your input should be prefixed with an operation like : +,-,*,/";
pub const CHECK_MESSAGE: &str = "Please check your message 😐";
pub const STORAGE_UNAVAILABLE: &str = "Storage is unavailable right now, please try again later.";

static INVOICE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[0-9]+").expect("valid regex"));

// `+100`, `*$3` at the start, or `#12 +100` anywhere.
static LOOKS_LIKE_OPERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+\-*/]\$?[0-9]|#[0-9]+\s*\$?\s*[+\-*/]").expect("valid regex")
});

/// A classified incoming message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Total,
    Clear,
    History,
    /// Raw (trimmed) text of an invoice operation.
    InvoiceOp(String),
}

impl Command {
    /// Classify `text`, or `None` when it is not meant for the ledger.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("total") {
            Some(Self::Total)
        } else if text.eq_ignore_ascii_case("clear") {
            Some(Self::Clear)
        } else if text.eq_ignore_ascii_case("history") {
            Some(Self::History)
        } else if LOOKS_LIKE_OPERATION.is_match(text) {
            Some(Self::InvoiceOp(text.to_string()))
        } else {
            None
        }
    }
}

/// An invoice operation split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    /// The `#<digits>` token.
    pub number: String,
    /// What is left once the token and any `$` are removed, trimmed.
    pub fragment: String,
}

impl Operation {
    pub fn parse(text: &str) -> ResultEngine<Self> {
        let number = INVOICE_TOKEN
            .find(text)
            .ok_or(EngineError::MissingInvoiceNumber)?
            .as_str()
            .to_string();

        let fragment = INVOICE_TOKEN
            .replacen(text, 1, "")
            .replace('$', "")
            .trim()
            .to_string();
        if !fragment.starts_with(OPERATORS) {
            return Err(EngineError::MissingOperatorPrefix);
        }

        Ok(Self { number, fragment })
    }
}

fn history_lines(invoices: &[InvoiceState]) -> String {
    invoices
        .iter()
        .map(|invoice| {
            format!(
                "Total for {}: {} = {}",
                invoice.number,
                invoice.history(),
                invoice.total
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_pure_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

/// User-facing text for a failed command. Details go to the log only.
pub fn user_message_for_error(chat_id: &str, err: &EngineError) -> &'static str {
    match err {
        EngineError::MissingInvoiceNumber => INVOICE_REQUIRED,
        EngineError::MissingOperatorPrefix | EngineError::InvalidOperationFragment(_) => {
            OPERATOR_REQUIRED
        }
        EngineError::Evaluation(err) => {
            tracing::warn!(chat_id, "evaluation failed: {err}");
            CHECK_MESSAGE
        }
        EngineError::Persistence(err) => {
            tracing::error!(chat_id, "database error: {err}");
            STORAGE_UNAVAILABLE
        }
        EngineError::InvalidRecord(err) => {
            tracing::error!(chat_id, "invalid stored record: {err}");
            STORAGE_UNAVAILABLE
        }
    }
}

impl Engine {
    /// Run one message through the interpreter.
    ///
    /// Returns `None` when the text is not a ledger command. Every failure is
    /// turned into a reply, none escapes to the caller.
    pub async fn interpret(&self, chat_id: &str, text: &str) -> Option<String> {
        let command = Command::parse(text)?;
        tracing::debug!(chat_id, ?command, "command received");

        match self.execute(chat_id, command).await {
            Ok(reply) => Some(reply),
            Err(err) => Some(user_message_for_error(chat_id, &err).to_string()),
        }
    }

    /// Run an already classified command.
    pub async fn execute(&self, chat_id: &str, command: Command) -> ResultEngine<String> {
        match command {
            Command::Total => self.total(chat_id).await,
            Command::Clear => self.clear(chat_id).await,
            Command::History => self.history(chat_id).await,
            Command::InvoiceOp(text) => self.operate(chat_id, &text).await,
        }
    }

    /// Every invoice of the chat followed by the sum of their totals.
    pub async fn total(&self, chat_id: &str) -> ResultEngine<String> {
        let invoices = self.invoices(chat_id).await?;
        if invoices.is_empty() {
            return Ok(NO_HISTORY_TO_TOTAL.to_string());
        }

        let sum = invoices
            .iter()
            .try_fold(0i64, |acc, invoice| acc.checked_add(invoice.total))
            .ok_or(EvaluationError::Overflow)?;
        Ok(format!(
            "History:\n{}\n\nSum Total = {sum}",
            history_lines(&invoices)
        ))
    }

    /// One line per invoice, in registration order.
    pub async fn history(&self, chat_id: &str) -> ResultEngine<String> {
        let invoices = self.invoices(chat_id).await?;
        if invoices.is_empty() {
            return Ok(NO_HISTORY.to_string());
        }
        Ok(format!("History:\n{}", history_lines(&invoices)))
    }

    /// Forget the chat. Succeeds whether or not anything existed.
    pub async fn clear(&self, chat_id: &str) -> ResultEngine<String> {
        let _guard = self.locks.write(chat_id).await;
        self.ledger().clear_chat(chat_id).await?;
        self.index().clear(chat_id).await?;
        tracing::info!(chat_id, "chat cleared");
        Ok(HISTORY_CLEARED.to_string())
    }

    /// Apply an invoice operation such as `#1 +100`.
    pub async fn operate(&self, chat_id: &str, text: &str) -> ResultEngine<String> {
        let operation = Operation::parse(text)?;

        let _guard = self.locks.invoice(chat_id, &operation.number).await;
        let ledger = self.ledger();
        let current = ledger.get_or_create(chat_id, &operation.number).await?;
        let updated = ledger.apply(chat_id, &current, &operation.fragment).await?;

        let echo = if is_pure_digits(&operation.fragment) {
            ""
        } else {
            operation.fragment.as_str()
        };
        Ok(format!(
            "Current total for {} is {}:\n{echo} = {}",
            updated.number, updated.total, updated.total
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(Command::parse("total"), Some(Command::Total));
        assert_eq!(Command::parse("  TOTAL "), Some(Command::Total));
        assert_eq!(Command::parse("Clear"), Some(Command::Clear));
        assert_eq!(Command::parse("history"), Some(Command::History));
    }

    #[test]
    fn keywords_must_match_exactly() {
        assert_eq!(
            Command::parse("total please"),
            None,
            "a keyword followed by text is not a command"
        );
    }

    #[test]
    fn operations_are_accepted() {
        assert_eq!(
            Command::parse("#1 +100"),
            Some(Command::InvoiceOp("#1 +100".to_string()))
        );
        assert_eq!(
            Command::parse("+100 #1"),
            Some(Command::InvoiceOp("+100 #1".to_string()))
        );
        assert_eq!(
            Command::parse("#12 $ *3"),
            Some(Command::InvoiceOp("#12 $ *3".to_string()))
        );
        assert_eq!(
            Command::parse("+100"),
            Some(Command::InvoiceOp("+100".to_string()))
        );
        assert_eq!(
            Command::parse("-$5 #2"),
            Some(Command::InvoiceOp("-$5 #2".to_string()))
        );
    }

    #[test]
    fn chatter_is_ignored() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("#1 is paid"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("+ hello"), None);
        assert_eq!(Command::parse("+٣ #1"), None, "only ASCII digits count");
        assert_eq!(Command::parse("#٣ +5"), None);
    }

    #[test]
    fn operation_strips_token_and_dollars() {
        let op = Operation::parse("#1 +$100").unwrap();
        assert_eq!(op.number, "#1");
        assert_eq!(op.fragment, "+100");

        let op = Operation::parse("*2 #42").unwrap();
        assert_eq!(op.number, "#42");
        assert_eq!(op.fragment, "*2");
    }

    #[test]
    fn operation_only_uses_the_first_token() {
        let op = Operation::parse("#1 +#2").unwrap();
        assert_eq!(op.number, "#1");
        assert_eq!(op.fragment, "+#2");
    }

    #[test]
    fn operation_requires_invoice_number() {
        assert_eq!(
            Operation::parse("+100"),
            Err(EngineError::MissingInvoiceNumber)
        );
    }

    #[test]
    fn invoice_token_is_ascii_digits_only() {
        assert_eq!(
            Operation::parse("#٣ +5"),
            Err(EngineError::MissingInvoiceNumber)
        );
        let op = Operation::parse("+5 #٣ #7").unwrap();
        assert_eq!(op.number, "#7");
    }

    #[test]
    fn operation_requires_operator_prefix() {
        assert_eq!(
            Operation::parse("5 #1 +3"),
            Err(EngineError::MissingOperatorPrefix)
        );
    }

    #[test]
    fn pure_digits_detection() {
        assert!(is_pure_digits("100"));
        assert!(!is_pure_digits("+100"));
        assert!(!is_pure_digits(""));
    }
}
