//! Binary entrypoint for the busboard CLI.
//!
//! Commands:
//! - `start` - run the interactive console board
//! - `init` - create a starter `config.toml`
//! - `status` - print account/listing counts and the persisted session
//! - `bootstrap-admin --email <addr>` - interactively create the first
//!   admin account (roles are fixed at registration, and only the admin
//!   panel can register drivers, so the first admin must come from here)
//!
//! See the library crate docs for module-level details: `busboard::`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::sync::Arc;

use busboard::backend::local::LocalBackend;
use busboard::backend::{Direction, DocumentStore, IdentityProvider};
use busboard::board::{auth, ConsoleApp, Role, Tone};
use busboard::config::Config;
use busboard::validation::{validate_email, validate_password};

#[derive(Parser)]
#[command(name = "busboard")]
#[command(about = "A role-based bus information board")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive console board
    Start,
    /// Initialize a new configuration file
    Init,
    /// Show board status and statistics
    Status,
    /// Create the first admin account
    BootstrapAdmin {
        /// Email address for the admin account
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            info!("Starting {} v{}", config.board.name, env!("CARGO_PKG_VERSION"));
            println!("{}", config.board.welcome_message);
            let backend = Arc::new(open_backend(&config).await?);
            let app = ConsoleApp::new(backend.clone(), backend);
            app.run().await?;
        }
        Commands::Init => {
            info!("Initializing new board configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            println!("Wrote {}. Next: busboard bootstrap-admin --email <addr>", cli.config);
        }
        Commands::Status => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let backend = open_backend(&config).await?;
            let profiles = backend
                .query_collection(auth::USERS_COLLECTION, "createdAt", Direction::Descending)
                .await?;
            let buses = backend
                .query_collection(
                    busboard::board::listings::BUSES_COLLECTION,
                    "timestamp",
                    Direction::Descending,
                )
                .await?;
            println!("Board:     {}", config.board.name);
            println!("Data dir:  {}", config.backend.data_dir);
            println!("Profiles:  {}", profiles.len());
            println!("Listings:  {}", buses.len());
            match backend.current_identity() {
                Some(id) => println!("Session:   {} ({})", id.email, id.uid),
                None => println!("Session:   none"),
            }
        }
        Commands::BootstrapAdmin { email } => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            if let Err(e) = validate_email(&email) {
                println!("Error: {}", e);
                return Ok(());
            }
            let pass1 = rpassword::prompt_password("Admin password: ")?;
            if let Err(e) = validate_password(&pass1) {
                println!("Error: {}", e);
                return Ok(());
            }
            let pass2 = rpassword::prompt_password("Confirm password: ")?;
            if pass1 != pass2 {
                println!("Error: passwords do not match.");
                return Ok(());
            }

            let backend = open_backend(&config).await?;
            let mut outcome: Vec<(Tone, String)> = Vec::new();
            auth::register(&backend, &backend, &email, &pass1, Role::Admin, &mut outcome).await;
            // Bootstrapping should not leave the CLI signed in as the admin.
            if backend.current_identity().is_some() {
                let _ = backend.end_session().await;
            }
            for (tone, text) in &outcome {
                match tone {
                    Tone::Success => println!("{}", text),
                    _ => println!("Error: {}", text),
                }
            }
        }
    }

    Ok(())
}

async fn open_backend(config: &Config) -> Result<LocalBackend> {
    let params = config.security.as_ref().and_then(|s| s.argon2_params());
    LocalBackend::new_with_params(&config.backend.data_dir, params).await
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new().create(true).append(true).open(&file) {
            let sink = std::sync::Arc::new(std::sync::Mutex::new(f));
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                writeln!(fmt, "{}", line)
            });
        } else {
            eprintln!("Could not open log file {}; logging to stderr only", file);
            builder.format(default_format);
        }
    } else {
        builder.format(default_format);
    }
    let _ = builder.try_init();
}

fn default_format(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record<'_>,
) -> std::io::Result<()> {
    use std::io::Write;
    writeln!(
        fmt,
        "{} [{}] {}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        record.level(),
        record.args()
    )
}
