#![allow(dead_code)]

use vote_ledger::api::AppState;
use vote_ledger::config::{AppConfig, AuthConfig};
use vote_ledger::database::Database;
use vote_ledger::identity::{Identity, Role};
use vote_ledger::ledger::Ledger;

pub const ELECTION: &str = "test-election";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        election_id: ELECTION.to_string(),
        auth: AuthConfig {
            jwt_secret: "integration-test-secret-0123".to_string(),
            token_ttl_secs: 300,
            issuer: "vote-ledger".to_string(),
        },
    }
}

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory()
        .await
        .expect("Failed to create test database")
}

/// In-memory database with an initialized ledger and three candidates.
pub async fn setup_election() -> (Database, Ledger, Vec<i64>) {
    let db = setup_test_db().await;
    let ledger = Ledger::new(db.clone(), ELECTION);
    ledger.initialize().await.expect("Failed to initialize ledger");
    let candidates = seed_candidates(&db).await;
    (db, ledger, candidates)
}

pub async fn seed_candidates(db: &Database) -> Vec<i64> {
    let mut ids = Vec::new();
    for (name, description) in [
        ("Ada Lovelace", "Analytical engines for all"),
        ("Grace Hopper", "Fewer bugs, more compilers"),
        ("Alan Turing", "Decidedly undecidable"),
    ] {
        ids.push(
            db.create_candidate(name, description, None)
                .await
                .expect("Failed to create candidate"),
        );
    }
    ids
}

pub async fn setup_state() -> (Database, AppState, Vec<i64>) {
    let db = setup_test_db().await;
    let state = AppState::new(test_config(), db.clone());
    state.ledger().initialize().await.expect("Failed to initialize ledger");
    let candidates = seed_candidates(&db).await;
    (db, state, candidates)
}

pub fn voter(user_id: &str) -> Identity {
    Identity::new(user_id, Role::Voter)
}

pub fn admin(user_id: &str) -> Identity {
    Identity::new(user_id, Role::Admin)
}

/// Overwrite one text column of a stored block, bypassing the ledger API.
pub async fn tamper_block(db: &Database, index: i64, column: &str, value: &str) {
    let sql = format!("UPDATE blocks SET {} = ? WHERE block_index = ?", column);
    sqlx::query(&sql)
        .bind(value)
        .bind(index)
        .execute(db.pool())
        .await
        .expect("Failed to tamper with block");
}
