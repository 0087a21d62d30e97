//! Ledger operator CLI
//!
//! Runs audits and chain verification against the store, and manages the
//! candidates, roles and session tokens a deployment needs.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::error;

use vote_ledger::audit::Auditor;
use vote_ledger::config::AppConfig;
use vote_ledger::database::Database;
use vote_ledger::identity::{IdentityProvider, Role};
use vote_ledger::ledger::Ledger;

#[derive(Parser)]
#[command(name = "ledger-cli")]
#[command(about = "Vote ledger operator tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL (overrides configuration)
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the genesis block if the ledger is empty
    Init,

    /// Run a full audit and print the JSON report
    Audit,

    /// Verify hashes and chain linkage only
    Verify,

    /// Issue a session token for a user
    IssueToken {
        /// User identifier
        #[arg(short, long)]
        user: String,

        /// Also set the user's role (voter, admin)
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Set a user's role
    SetRole {
        /// User identifier
        #[arg(short, long)]
        user: String,

        /// Role (voter, admin)
        #[arg(short, long)]
        role: String,
    },

    /// Register a candidate
    AddCandidate {
        /// Candidate name
        #[arg(short, long)]
        name: String,

        /// Candidate description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Image URL
        #[arg(long)]
        image_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vote_ledger=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let database = Database::connect(&config.database_url, 1).await?;
    database.run_migrations().await?;

    match cli.command {
        Commands::Init => {
            let ledger = Ledger::new(database, config.election_id.clone());
            let genesis = ledger.initialize().await?;
            println!("Genesis block: {}", genesis.hash);
        }
        Commands::Audit => {
            let report = Auditor::new(database).audit().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_compromised() {
                error!("Audit found {} violations", report.report.len());
                std::process::exit(1);
            }
        }
        Commands::Verify => {
            let ledger = Ledger::new(database, config.election_id.clone());
            let result = ledger.verify().await?;
            println!("{}", result.summary());
            for violation in &result.violations {
                println!("  {}", serde_json::to_string(violation)?);
            }
            if !result.is_valid() {
                std::process::exit(1);
            }
        }
        Commands::IssueToken { user, role } => {
            if let Some(role) = role {
                let role: Role = role.parse().map_err(|e: String| anyhow!(e))?;
                database.set_role(&user, role.as_str()).await?;
            }
            let provider = IdentityProvider::new(database, &config.auth);
            println!("{}", provider.issue_token(&user)?);
        }
        Commands::SetRole { user, role } => {
            let role: Role = role.parse().map_err(|e: String| anyhow!(e))?;
            database.set_role(&user, role.as_str()).await?;
            println!("{} is now {}", user, role);
        }
        Commands::AddCandidate {
            name,
            description,
            image_url,
        } => {
            let id = database
                .create_candidate(&name, &description, image_url.as_deref())
                .await?;
            println!("Candidate {} registered with id {}", name, id);
        }
    }

    Ok(())
}
