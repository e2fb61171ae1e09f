use chrono::Utc;
use homeboard_core::{App, AppError};
use homeboard_services::{Planner, PlannerClient, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize core
    homeboard_core::init()?;

    if let Err(err) = run().await {
        tracing::error!("Homeboard failed: {}", err);
        eprintln!("{}", err.user_message());
        return Err(err.into());
    }

    Ok(())
}

async fn run() -> Result<(), AppError> {
    // Create and initialize application
    let app = App::new()?;
    app.initialize()?;

    let store = SqliteStore::open(app.database_path())?;
    let client = PlannerClient::new(Planner::new(store, app.config()));

    tracing::info!("Homeboard started");

    let board = client.week_board(Utc::now()).await?;

    println!("Homeboard - week of {}", board.window.week_key);
    for day in &board.days {
        let marker = if day.is_past { " (past)" } else { "" };
        println!("\n{} {}{}", day.date.format("%A"), day.date_key, marker);

        for entry in &day.events {
            let when = match entry.event.time() {
                Some(time) => time.format("%H:%M").to_string(),
                None => "all day".to_string(),
            };
            let done = if entry.is_past { " ✓" } else { "" };
            println!("  {:>7}  {}{}", when, entry.event.title, done);
        }
        for task in &day.tasks {
            let check = if task.completed { "x" } else { " " };
            println!("  [{}] {} ({})", check, task.title, task.board);
        }
    }

    if !board.overflow.is_empty() {
        println!("\nOverflow");
        for task in &board.overflow {
            let check = if task.completed { "x" } else { " " };
            println!("  [{}] {} ({})", check, task.title, task.board);
        }
    }

    if !board.notes.is_empty() {
        println!("\nNotes ({} unseen)", board.unseen_notes());
        for note in &board.notes {
            println!("  {}: {}", note.author, note.content);
        }
    }

    // Graceful shutdown
    app.shutdown()?;

    Ok(())
}
