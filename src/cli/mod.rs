use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use crate::auth::SharedSecretVerifier;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::server;

#[derive(Parser)]
#[command(name = "lessons-api")]
#[command(about = "Life lessons REST backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Listen port, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Issue a locally signed bearer token (requires AUTH_JWT_SECRET)")]
    Token {
        #[arg(long, help = "Principal email")]
        email: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(config).await
        }
        Commands::Migrate => {
            if config.uses_memory_store() {
                bail!("the in-memory store has no migrations");
            }
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::Token { email } => {
            let secret = config
                .identity
                .jwt_secret
                .context("AUTH_JWT_SECRET is not set")?;
            let verifier = SharedSecretVerifier::new(secret, config.identity.token_expiry_hours);
            println!("{}", verifier.issue(&email)?);
            Ok(())
        }
    }
}
