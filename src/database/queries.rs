use sqlx::{Executor, Sqlite};

use crate::database::models::*;

/// Typed queries against the relational store.
///
/// Every query takes any SQLite executor, so the same call works on the pool
/// or inside an open transaction (`&mut *tx`).
pub struct Queries;

impl Queries {
    pub async fn list_blocks<'e, E>(executor: E) -> Result<Vec<BlockRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BlockRow>(
            r#"
            SELECT block_index, timestamp, payload, previous_hash, hash, nonce
            FROM blocks
            ORDER BY block_index ASC
            "#,
        )
        .fetch_all(executor)
        .await
    }

    /// All block rows with every column cast to text, ordered by index.
    pub async fn list_raw_blocks<'e, E>(executor: E) -> Result<Vec<RawBlockRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, RawBlockRow>(
            r#"
            SELECT CAST(block_index AS TEXT) AS block_index,
                   CAST(timestamp AS TEXT) AS timestamp,
                   CAST(payload AS TEXT) AS payload,
                   CAST(previous_hash AS TEXT) AS previous_hash,
                   CAST(hash AS TEXT) AS hash,
                   CAST(nonce AS TEXT) AS nonce
            FROM blocks
            ORDER BY block_index ASC
            "#,
        )
        .fetch_all(executor)
        .await
    }

    pub async fn latest_block<'e, E>(executor: E) -> Result<Option<BlockRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BlockRow>(
            r#"
            SELECT block_index, timestamp, payload, previous_hash, hash, nonce
            FROM blocks
            ORDER BY block_index DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(executor)
        .await
    }

    pub async fn first_block<'e, E>(executor: E) -> Result<Option<BlockRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BlockRow>(
            r#"
            SELECT block_index, timestamp, payload, previous_hash, hash, nonce
            FROM blocks
            ORDER BY block_index ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(executor)
        .await
    }

    pub async fn count_blocks<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blocks")
            .fetch_one(executor)
            .await
    }

    /// Fails with a unique violation when `block_index` or `previous_hash` is taken.
    pub async fn insert_block<'e, E>(executor: E, row: &BlockRow) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO blocks (block_index, timestamp, payload, previous_hash, hash, nonce)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.block_index)
        .bind(row.timestamp)
        .bind(&row.payload)
        .bind(&row.previous_hash)
        .bind(&row.hash)
        .bind(row.nonce)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn ensure_ledger_head<'e, E>(executor: E, election_id: &str) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT OR IGNORE INTO ledger_heads (election_id) VALUES (?)")
            .bind(election_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Take the per-election append lock. Returns false if the election has no head row.
    pub async fn lock_ledger_head<'e, E>(executor: E, election_id: &str) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE ledger_heads
            SET appended = appended + 1, updated_at = CURRENT_TIMESTAMP
            WHERE election_id = ?
            "#,
        )
        .bind(election_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn find_vote_by_user<'e, E>(
        executor: E,
        user_id: &str,
    ) -> Result<Option<VoteRecord>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, VoteRecord>("SELECT user_id, candidate_id FROM votes WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Fails with a unique violation when the user already has a vote row.
    pub async fn insert_vote<'e, E>(
        executor: E,
        user_id: &str,
        candidate_id: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO votes (user_id, candidate_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(candidate_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_votes<'e, E>(executor: E) -> Result<Vec<VoteSnapshot>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, VoteSnapshot>(
            r#"
            SELECT user_id, CAST(candidate_id AS TEXT) AS candidate_id
            FROM votes
            ORDER BY id ASC
            "#,
        )
        .fetch_all(executor)
        .await
    }

    pub async fn count_votes_for_candidate<'e, E>(
        executor: E,
        candidate_id: i64,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE candidate_id = ?")
            .bind(candidate_id)
            .fetch_one(executor)
            .await
    }

    pub async fn get_candidate<'e, E>(
        executor: E,
        candidate_id: i64,
    ) -> Result<Option<Candidate>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Candidate>(
            "SELECT id, name, description, image_url, vote_count FROM candidates WHERE id = ?",
        )
        .bind(candidate_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_candidates<'e, E>(executor: E) -> Result<Vec<Candidate>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Candidate>(
            "SELECT id, name, description, image_url, vote_count FROM candidates ORDER BY id ASC",
        )
        .fetch_all(executor)
        .await
    }

    pub async fn insert_candidate<'e, E>(
        executor: E,
        name: &str,
        description: &str,
        image_url: Option<&str>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO candidates (name, description, image_url) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(image_url)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn delete_candidate<'e, E>(executor: E, candidate_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM candidates WHERE id = ?")
            .bind(candidate_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Atomic in-store increment; returns false if the candidate row is gone.
    pub async fn increment_tally<'e, E>(executor: E, candidate_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE candidates SET vote_count = vote_count + 1 WHERE id = ?")
            .bind(candidate_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_profile<'e, E>(executor: E, user_id: &str) -> Result<Option<Profile>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Profile>("SELECT id, role FROM profiles WHERE id = ?")
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn upsert_profile<'e, E>(executor: E, user_id: &str, role: &str) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, role) VALUES (?, ?)
            ON CONFLICT (id) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(executor)
        .await?;

        Ok(())
    }
}
