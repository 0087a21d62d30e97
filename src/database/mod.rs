pub mod models;
pub mod queries;
pub mod schema;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::database::models::{Candidate, VoteRecord, VoteSnapshot};
use crate::database::queries::Queries;

/// Handle to the relational store. Cheap to clone; all clones share one pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect(database_url, 5).await
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Connected to {} (max {} connections)", database_url, max_connections);
        Ok(Database { pool })
    }

    /// Single-connection in-memory store with the schema applied.
    ///
    /// The connection is never recycled, since closing it discards the data.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let database = Database { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        for statement in schema::statements(schema::INITIAL_SCHEMA) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }

        debug!("Schema applied");
        Ok(())
    }

    pub async fn find_vote_by_user(&self, user_id: &str) -> Result<Option<VoteRecord>, sqlx::Error> {
        Queries::find_vote_by_user(&self.pool, user_id).await
    }

    pub async fn list_votes(&self) -> Result<Vec<VoteSnapshot>, sqlx::Error> {
        Queries::list_votes(&self.pool).await
    }

    pub async fn get_candidate(&self, candidate_id: i64) -> Result<Option<Candidate>, sqlx::Error> {
        Queries::get_candidate(&self.pool, candidate_id).await
    }

    pub async fn list_candidates(&self) -> Result<Vec<Candidate>, sqlx::Error> {
        Queries::list_candidates(&self.pool).await
    }

    pub async fn create_candidate(
        &self,
        name: &str,
        description: &str,
        image_url: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let id = Queries::insert_candidate(&self.pool, name, description, image_url).await?;
        info!("Created candidate {} ({})", name, id);
        Ok(id)
    }

    pub async fn get_role(&self, user_id: &str) -> Result<Option<String>, sqlx::Error> {
        Ok(Queries::get_profile(&self.pool, user_id)
            .await?
            .map(|profile| profile.role))
    }

    pub async fn set_role(&self, user_id: &str, role: &str) -> Result<(), sqlx::Error> {
        Queries::upsert_profile(&self.pool, user_id, role).await
    }
}
