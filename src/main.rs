use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use canopy::app::AppContext;
use canopy::cli::{commands, Cli, Commands, DaemonAction};
use canopy::config::Config;
use canopy::daemon::{self, Daemon};

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("canopy=info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }

    let log_file = match &cli.command {
        Commands::Daemon {
            action: DaemonAction::Start { log, .. },
        } => log.clone().or_else(|| config.daemon.log_file.clone()),
        _ => None,
    };
    init_tracing(log_file.as_deref())?;

    // These do not touch the database.
    match &cli.command {
        Commands::Daemon {
            action: DaemonAction::Stop,
        } => {
            let pid = daemon::stop_daemon()?;
            println!("Daemon stopped (PID {})", pid);
            return Ok(());
        }
        Commands::Daemon {
            action: DaemonAction::Status,
        } => {
            println!("{}", daemon::daemon_status());
            return Ok(());
        }
        _ => {}
    }

    let owner = config.resolve_owner(cli.owner.as_deref());
    let ctx = AppContext::new(&config)?;

    match cli.command {
        Commands::Add { url, folder } => {
            commands::add_feed(&ctx, &owner, &url, folder.as_deref()).await?;
        }
        Commands::Mkdir { title, parent } => {
            commands::make_folder(&ctx, &owner, &title, parent.as_deref())?;
        }
        Commands::Rename { key, title } => {
            commands::rename(&ctx, &owner, &key, &title)?;
        }
        Commands::Remove { key } => {
            commands::remove(&ctx, &owner, &key)?;
        }
        Commands::Update { key } => {
            commands::update(&ctx, &owner, key.as_deref()).await?;
        }
        Commands::UpdateAll => {
            commands::update_all(&ctx).await?;
        }
        Commands::Tree => {
            commands::print_tree(&ctx, &owner)?;
        }
        Commands::Entries { feed } => {
            commands::list_entries(&ctx, &owner, &feed)?;
        }
        Commands::Read { key, entry, link } => {
            commands::read(&ctx, &owner, &key, entry.as_deref(), link.as_deref())?;
        }
        Commands::Import { path, folder } => {
            commands::import_opml(&ctx, &owner, &path, folder.as_deref()).await?;
        }
        Commands::Daemon { action } => match action {
            DaemonAction::Start {
                interval,
                no_initial_update,
                log,
            } => {
                if let Some(interval) = interval {
                    config.daemon.interval = interval;
                }
                if no_initial_update {
                    config.daemon.update_on_start = false;
                }
                let mut daemon_config = config.daemon.to_daemon_config()?;
                daemon_config.log_file = log.or(daemon_config.log_file);

                Daemon::new(Arc::new(ctx), daemon_config).run().await?;
            }
            DaemonAction::Stop | DaemonAction::Status => {}
        },
    }

    Ok(())
}
