use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::Engine;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "tally_admin")]
#[command(about = "Admin utilities for Tally (inspect, check and clear chats)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./tally.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known chats.
    Chats,
    /// Print the chat history, as the bot would.
    History(ChatArgs),
    /// Print the chat totals, as the bot would.
    Total(ChatArgs),
    /// Delete every invoice of a chat.
    Clear(ClearArgs),
    /// Replay every invoice and report totals that drifted.
    Check(CheckArgs),
    /// Run one message through the interpreter.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct ChatArgs {
    #[arg(long)]
    chat: String,
}

#[derive(Args, Debug)]
struct ClearArgs {
    #[arg(long)]
    chat: String,
    /// Do not ask for confirmation.
    #[arg(long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[arg(long)]
    chat: String,
    /// Overwrite drifted totals with the replayed ones.
    #[arg(long)]
    fix: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    chat: String,
    /// Message text, e.g. `#1 +100`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    text: Vec<String>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Ask a yes/no question on stderr. Anything but `y` is a no.
fn confirm(prompt: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(format!("{prompt} [y/N] "))
    )?;
    out.flush()?;

    let answer = loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => break true,
            KeyCode::Char(_) | KeyCode::Enter | KeyCode::Esc => break false,
            _ => {}
        }
    };

    execute!(out, Print(if answer { "y\r\n" } else { "n\r\n" }))?;
    out.flush()?;
    Ok(answer)
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Chats => {
            let chats = engine.chats().await?;
            if chats.is_empty() {
                println!("no chats");
            }
            for chat in chats {
                println!(
                    "{}\t{}\t{} invoices",
                    chat.chat_id,
                    chat.created_at.to_rfc3339(),
                    chat.invoices
                );
            }
        }
        Command::History(args) => println!("{}", engine.history(&args.chat).await?),
        Command::Total(args) => println!("{}", engine.total(&args.chat).await?),
        Command::Clear(args) => {
            if !args.yes && !confirm(&format!("Clear every invoice of chat {}?", args.chat))? {
                eprintln!("aborted");
                std::process::exit(1);
            }
            println!("{}", engine.clear(&args.chat).await?);
        }
        Command::Check(args) => {
            let drifts = engine.recompute(&args.chat, args.fix).await?;
            if drifts.is_empty() {
                println!("all totals match their history");
                return Ok(());
            }
            for drift in &drifts {
                println!(
                    "{}: stored {} replayed {}",
                    drift.number, drift.stored, drift.replayed
                );
            }
            if args.fix {
                println!("fixed {} invoices", drifts.len());
            } else {
                std::process::exit(1);
            }
        }
        Command::Run(args) => {
            let text = args.text.join(" ");
            match engine.interpret(&args.chat, &text).await {
                Some(reply) => println!("{reply}"),
                None => eprintln!("not a ledger command, ignored"),
            }
        }
    }

    Ok(())
}
