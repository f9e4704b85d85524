use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use classplan::{
    AuthError, AuthProvider, Backend, Config, MemoryStore, PersonType, RemoteStore, RestStore,
    SqliteStore, StaticAuth, SyncStore,
};
use commands::{
    ConfigCommand, CourseCommand, ImportCommand, PersonCommand, ScheduleCommand, SessionCommand,
};

#[derive(Parser)]
#[command(name = "classplan")]
#[command(version)]
#[command(about = "Manage teachers, assistants, courses and teaching sessions", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage teachers
    Teacher(PersonCommand),

    /// Manage teaching assistants
    Assistant(PersonCommand),

    /// Manage courses
    Course(CourseCommand),

    /// Manage teaching sessions
    Session(SessionCommand),

    /// Import records from a file
    Import(ImportCommand),

    /// Show the session schedule
    Schedule(ScheduleCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classplan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Builds the configured backend and the session that gates it.
async fn connect(
    config: &Config,
) -> Result<(Arc<dyn RemoteStore>, StaticAuth), Box<dyn std::error::Error>> {
    match config.backend.value {
        Backend::Sqlite => {
            let path = config.database_path.value.clone();
            tracing::debug!("Opening {}", path.display());
            let remote: Arc<dyn RemoteStore> = Arc::new(SqliteStore::open(path).await?);
            Ok((remote, StaticAuth::signed_in("local", "")))
        }
        Backend::Memory => {
            let remote: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
            Ok((remote, StaticAuth::signed_in("local", "")))
        }
        Backend::Rest => {
            let url = config
                .remote
                .url
                .clone()
                .ok_or("REST backend needs remote.url in the config or CLASSPLAN_REMOTE_URL")?;
            let auth = StaticAuth::new();
            match (&config.remote.access_token, &config.remote.api_key) {
                (Some(token), _) => auth.sign_in("user", token.clone()),
                (None, Some(key)) => auth.sign_in("api-key", key.clone()),
                (None, None) => {}
            }
            let key = config.remote.api_key.clone().unwrap_or_default();
            let store = match auth.current_session() {
                Some(session) => RestStore::for_session(url, key, &session),
                None => RestStore::new(url, key),
            };
            let remote: Arc<dyn RemoteStore> = Arc::new(store);
            Ok((remote, auth))
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config, cli.config),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    let (remote, auth) = connect(&config).await?;
    // A missing API key would otherwise wait forever for a sign-in
    if auth.current_session().is_none() {
        return Err(AuthError::NotSignedIn.into());
    }
    let store = SyncStore::mount(remote, &auth).await?;

    let snap = store.snapshot();
    tracing::debug!(
        "{} course(s), {} session(s) loaded",
        snap.courses.len(),
        snap.sessions.len()
    );

    match command {
        Commands::Teacher(cmd) => cmd.run(&store, PersonType::Teacher).await,
        Commands::Assistant(cmd) => cmd.run(&store, PersonType::Assistant).await,
        Commands::Course(cmd) => cmd.run(&store).await,
        Commands::Session(cmd) => cmd.run(&store).await,
        Commands::Import(cmd) => cmd.run(&store).await,
        Commands::Schedule(cmd) => cmd.run(&store),
        Commands::Config(_) => Ok(()),
    }
}
