//! Cradle command line
//!
//! Guest-mode front end over the local data layer: children, care logs and
//! the field codec, stored under the configured data directory.

mod app;
mod log_cmd;

use anyhow::Context;
use app::App;
use clap::{Parser, Subcommand};
use log_cmd::LogCommand;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "cradle")]
#[command(about = "Local infant-care log with encrypted fields", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Guest mode
    Guest {
        #[command(subcommand)]
        action: GuestAction,
    },

    /// Children (guest mode)
    Child {
        #[command(subcommand)]
        action: ChildAction,
    },

    /// Care logs for the active child
    Log {
        #[command(subcommand)]
        kind: LogCommand,
    },

    /// Raw table access
    Table {
        #[command(subcommand)]
        action: TableAction,
    },

    /// Encrypt a value with the field key
    Encrypt {
        /// Plaintext
        text: String,
    },

    /// Decrypt an envelope with the field key
    Decrypt {
        /// Envelope (hex IV + base64 ciphertext)
        envelope: String,
    },
}

#[derive(Subcommand)]
enum GuestAction {
    /// Enter guest mode
    Enter,
    /// Leave guest mode (local data is kept)
    Exit,
    /// Show the current mode
    Status,
}

#[derive(Subcommand)]
enum ChildAction {
    /// Add a child; the first one becomes active
    Add {
        /// Display name
        name: String,
    },
    /// List children
    List,
    /// Make a child active
    Select {
        /// Child id
        id: String,
    },
}

#[derive(Subcommand)]
enum TableAction {
    /// Print every row of a table as stored
    List {
        /// Table name
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::open(cli.config.as_deref())?;

    match cli.command {
        Commands::Guest { action } => run_guest(&app, action)?,
        Commands::Child { action } => run_child(&app, action)?,
        Commands::Log { kind } => log_cmd::run(&app, kind)?,
        Commands::Table {
            action: TableAction::List { name },
        } => {
            app::print_json(&app.session.store().list(&name))?;
        }
        Commands::Encrypt { text } => {
            println!("{}", app.codec.encrypt(&text)?);
        }
        Commands::Decrypt { envelope } => {
            let plaintext = app
                .codec
                .decrypt(&envelope)
                .context("Not a valid envelope for this field key")?;
            println!("{}", plaintext);
        }
    }

    Ok(())
}

fn run_guest(app: &App, action: GuestAction) -> anyhow::Result<()> {
    match action {
        GuestAction::Enter => {
            let guest_id = app.session.enter_guest()?;
            info!("Guest mode on");
            println!("Guest mode on ({})", guest_id);
        }
        GuestAction::Exit => {
            app.session.exit_guest()?;
            println!("Guest mode off; local data kept");
        }
        GuestAction::Status => {
            if app.session.is_guest() {
                let active = app.session.active_child()?;
                println!("Mode: guest");
                match active {
                    Some(child) => println!("Active child: {} ({})", child.name, child.id),
                    None => println!("Active child: none"),
                }
            } else {
                println!("Mode: signed out");
            }
            println!("Data directory: {}", app.data_dir.display());
        }
    }
    Ok(())
}

fn run_child(app: &App, action: ChildAction) -> anyhow::Result<()> {
    app.require_guest()?;
    match action {
        ChildAction::Add { name } => {
            let child = app.session.create_child(&name)?;
            println!("{}", child.id);
        }
        ChildAction::List => {
            app::print_json(&app.session.children()?)?;
        }
        ChildAction::Select { id } => {
            app.session.set_active_child_id(&id)?;
            println!("Active child: {}", id);
        }
    }
    Ok(())
}
