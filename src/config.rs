use serde::{Deserialize, Serialize};
use std::env;

use crate::error::LedgerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub election_id: String,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub issuer: String,
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("VOTE_LEDGER")
        .try_parsing(true)
        .prefix_separator("__")
        .separator("__")
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file and the environment.
    ///
    /// Environment keys use the `VOTE_LEDGER__` prefix with `__` as the nesting
    /// separator, e.g. `VOTE_LEDGER__AUTH__JWT_SECRET`. The session secret has
    /// no default and must be supplied.
    pub fn load() -> Result<Self, LedgerError> {
        let file = env::var("VOTE_LEDGER_CONFIG").unwrap_or_else(|_| "vote-ledger".to_string());
        Self::load_from(&file, environment(), env::var("DATABASE_URL").ok())
    }

    fn load_from(
        file: &str,
        environment: config::Environment,
        database_url: Option<String>,
    ) -> Result<Self, LedgerError> {
        let mut builder = config::Config::builder()
            .set_default("database_url", "sqlite://vote-ledger.db?mode=rwc")?
            .set_default("max_connections", 5)?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 3000)?
            .set_default("election_id", "default")?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("auth.issuer", "vote-ledger")?
            .add_source(config::File::with_name(file).required(false))
            .add_source(environment);

        if let Some(database_url) = database_url {
            builder = builder.set_override("database_url", database_url)?;
        }

        let settings = builder.build()?;
        if settings.get_string("auth.jwt_secret").is_err() {
            return Err(LedgerError::ConfigError(
                "auth.jwt_secret must be set (VOTE_LEDGER__AUTH__JWT_SECRET)".to_string(),
            ));
        }

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.election_id.trim().is_empty() {
            return Err(LedgerError::ConfigError(
                "election_id must not be empty".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(LedgerError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.auth.jwt_secret.len() < 16 {
            return Err(LedgerError::ConfigError(format!(
                "auth.jwt_secret is too short ({} bytes, minimum 16)",
                self.auth.jwt_secret.len()
            )));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
