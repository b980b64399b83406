use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Mutex;
use taskdeck_core::{AppState, Category, CategoryFilter, Priority, SortKey, StatusFilter};
use tracing_subscriber::EnvFilter;

mod backend;
mod commands;
mod config;
mod rest_auth;
mod rest_store;
mod state;
mod tui;
mod worker;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TASKDECK_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version = VERSION, about = "Personal task manager backed by a hosted store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage ~/.taskdeck/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Sign in (password is prompted)
    Signin {
        #[arg(long)]
        email: String,
    },

    /// Create an account; a confirmation email is sent
    Signup {
        #[arg(long)]
        email: String,
    },

    Signout,

    /// Show the signed-in account
    Whoami,

    /// List tasks (defaults come from [view] in the config)
    List {
        /// all | completed | pending
        #[arg(long)]
        status: Option<StatusFilter>,

        /// all | personal | work | shopping | health
        #[arg(long)]
        category: Option<CategoryFilter>,

        /// date | priority | category | name
        #[arg(long)]
        sort: Option<SortKey>,
    },

    /// Add a task
    Add {
        text: String,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        priority: Option<Priority>,

        /// YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },

    /// Flip a task between pending and completed
    Toggle {
        /// Task id or a unique prefix of it
        id: String,
    },

    /// Delete a task
    Rm { id: String },

    /// Change fields of a task
    Edit {
        id: String,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        #[arg(long)]
        clear_due: bool,
    },

    /// Completion summary, overall and per category
    Stats,

    /// Interactive terminal UI
    Tui {
        /// In-memory board, no sign-in, nothing saved
        #[arg(long)]
        local: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("TASKDECK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// The terminal UI owns the screen, so its logs go to ~/.taskdeck/taskdeck.log.
fn init_file_logging() -> Result<()> {
    let path = state::log_path()?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Tui { .. } => init_file_logging()?,
        _ => init_stderr_logging(),
    }

    let cfg = config::load_config()?;
    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => show_config(&cfg)?,
        },
        Command::Signin { email } => commands::signin(&cfg, email).await?,
        Command::Signup { email } => commands::signup(&cfg, email).await?,
        Command::Signout => commands::signout(&cfg).await?,
        Command::Whoami => commands::whoami(&cfg).await?,
        Command::List { status, category, sort } => {
            commands::list(&cfg, commands::ListArgs { status, category, sort }).await?
        }
        Command::Add {
            text,
            category,
            priority,
            due,
        } => commands::add(&cfg, text, category, priority, due).await?,
        Command::Toggle { id } => commands::toggle(&cfg, id).await?,
        Command::Rm { id } => commands::remove(&cfg, id).await?,
        Command::Edit {
            id,
            text,
            category,
            priority,
            due,
            clear_due,
        } => {
            let args = commands::EditArgs {
                text,
                category,
                priority,
                due,
                clear_due,
            };
            commands::edit(&cfg, id, args).await?
        }
        Command::Stats => commands::stats(&cfg).await?,
        Command::Tui { local } => run_tui(&cfg, local)?,
    }

    Ok(())
}

fn run_tui(cfg: &config::Config, local: bool) -> Result<()> {
    let view = cfg.view_options()?;
    if local {
        tracing::info!("starting local board");
        return tokio::task::block_in_place(|| tui::run_tui(AppState::local().with_view(view), None));
    }

    let backend = backend::Backend::new(cfg.require_backend()?);
    let worker = worker::WorkerHandle::spawn(
        rest_store::RestStore::new(backend.clone()),
        rest_auth::RestAuth::new(backend),
    );
    tracing::info!("starting persisted board");
    tokio::task::block_in_place(|| tui::run_tui(AppState::persisted().with_view(view), Some(worker)))
}

fn show_config(cfg: &config::Config) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    let mut shown = cfg.clone();
    if shown.backend.anon_key.chars().count() > 8 {
        let head: String = shown.backend.anon_key.chars().take(8).collect();
        shown.backend.anon_key = format!("{head}...");
    }
    print!("{}", toml::to_string_pretty(&shown).context("serialize config")?);
    Ok(())
}
