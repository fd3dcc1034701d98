//! Schema runner: `migration [up|down|fresh|refresh|status] [steps]`.
//!
//! The database comes from `DATABASE_URL`, the same variable `tally_admin`
//! reads.

use migration::Migrator;
use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./tally.db?mode=rwc";
const USAGE: &str = "usage: migration [up|down|fresh|refresh|status] [steps]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "up".to_string());
    let steps = args.next().map(|raw| raw.parse::<u32>()).transpose()?;

    let url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&url).await?;

    match command.as_str() {
        "up" => Migrator::up(&db, steps).await?,
        // One step unless told otherwise.
        "down" => Migrator::down(&db, steps.or(Some(1))).await?,
        "fresh" => Migrator::fresh(&db).await?,
        "refresh" => Migrator::refresh(&db).await?,
        "status" => Migrator::status(&db).await?,
        other => {
            eprintln!("unknown command {other:?}\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
