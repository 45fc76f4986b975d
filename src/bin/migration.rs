use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use feathers_pos::{config, db, migrator::Migrator, seed};

/// Schema and starter-data maintenance for the POS database
#[derive(Debug, Parser)]
#[command(name = "feathers-migrate", version, about)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply every pending migration (default)
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop every table and re-apply all migrations
    Fresh,
    /// List applied and pending migrations
    Status,
    /// Apply pending migrations, then load the starter menu, stock and staff
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    info!("Connecting to database");
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            Migrator::up(&pool, None).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Schema rebuilt from scratch");
        }
        Command::Status => {
            Migrator::status(&pool).await?;
        }
        Command::Seed => {
            Migrator::up(&pool, None).await?;
            let summary = seed::seed_defaults(&pool).await?;
            if summary.seeded {
                info!(
                    inventory_items = summary.inventory_items,
                    menu_items = summary.menu_items,
                    recipe_lines = summary.recipe_lines,
                    employees = summary.employees,
                    "Starter data loaded"
                );
            } else {
                info!("Menu already populated; nothing seeded");
            }
        }
    }

    Ok(())
}
