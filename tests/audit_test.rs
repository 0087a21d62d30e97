//! Auditor integration tests
//! Chain verification and ledger / vote-table reconciliation

use serde_json::json;
use vote_ledger::audit::{AuditStatus, Auditor, FindingKind, Severity};
use vote_ledger::database::queries::Queries;
use vote_ledger::database::Database;
use vote_ledger::ledger::canonical_json;
use vote_ledger::voting::VoteCoordinator;

mod common;
use common::*;

/// Initialized election with `alice`, `bob` and `carol` having voted for
/// the first, second and third candidate.
async fn voted_election() -> (Database, VoteCoordinator, Vec<i64>) {
    let (db, ledger, candidates) = setup_election().await;
    let coordinator = VoteCoordinator::new(db.clone(), ledger);
    for (user, candidate) in ["alice", "bob", "carol"].iter().zip(candidates.iter()) {
        coordinator.submit_vote(&voter(user), *candidate).await.unwrap();
    }
    (db, coordinator, candidates)
}

async fn execute(db: &Database, sql: &str) {
    sqlx::query(sql).execute(db.pool()).await.unwrap();
}

#[tokio::test]
async fn test_empty_ledger_audit() {
    let db = setup_test_db().await;

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Empty);
    assert!(report.report.is_empty());
    assert!(report.last_block_hash.is_none());
}

#[tokio::test]
async fn test_genesis_only_is_secure() {
    let (db, ledger, _) = setup_election().await;
    let genesis = ledger.latest().await.unwrap();

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Secure);
    assert_eq!(report.total_blocks_verified, Some(1));
    assert_eq!(report.votes_reconciled, Some(0));
    assert_eq!(report.last_block_hash, Some(genesis.hash));
}

#[tokio::test]
async fn test_untouched_election_is_secure() {
    let (db, coordinator, _) = voted_election().await;
    let tail = coordinator.ledger().latest().await.unwrap();

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Secure);
    assert_eq!(report.total_blocks_verified, Some(4));
    assert_eq!(report.votes_reconciled, Some(3));
    assert_eq!(report.last_block_hash, Some(tail.hash));
    assert!(report.highest_severity().is_none());
}

#[tokio::test]
async fn test_audit_does_not_modify_stores() {
    let (db, coordinator, _) = voted_election().await;
    let before = coordinator.ledger().blocks().await.unwrap();
    let votes_before = db.list_votes().await.unwrap();

    let auditor = Auditor::new(db.clone());
    auditor.audit().await.unwrap();
    auditor.audit().await.unwrap();

    assert_eq!(coordinator.ledger().blocks().await.unwrap(), before);
    assert_eq!(db.list_votes().await.unwrap(), votes_before);
}

#[tokio::test]
async fn test_edited_block_payload() {
    let (db, coordinator, candidates) = voted_election().await;

    let mut payload = coordinator.ledger().blocks().await.unwrap()[1].payload.clone();
    payload["candidate_id"] = json!(candidates[1]);
    tamper_block(&db, 1, "payload", &canonical_json(&payload)).await;

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Compromised);
    assert_eq!(report.total_errors, Some(2));

    let tampering = report.entries_of(FindingKind::DataTampering);
    assert_eq!(tampering.len(), 1);
    assert_eq!(tampering[0].block_index, Some(1));
    assert_eq!(tampering[0].severity, Severity::Critical);

    let inconsistent = report.entries_of(FindingKind::InconsistentData);
    assert_eq!(inconsistent.len(), 1);
    assert_eq!(inconsistent[0].block_index, Some(1));
    assert_eq!(inconsistent[0].details["voter_id"], "alice");
    assert_eq!(
        inconsistent[0].details["blockchain_choice"],
        candidates[1].to_string()
    );
    assert_eq!(
        inconsistent[0].details["database_choice"],
        candidates[0].to_string()
    );

    assert!(report.entries_of(FindingKind::BrokenChain).is_empty());
    assert_eq!(report.highest_severity(), Some(Severity::Critical));
}

#[tokio::test]
async fn test_relinked_block() {
    let (db, _coordinator, _) = voted_election().await;

    tamper_block(&db, 2, "previous_hash", &"f".repeat(64)).await;

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Compromised);

    let broken = report.entries_of(FindingKind::BrokenChain);
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].block_index, Some(2));
    assert_eq!(broken[0].details["stored_previous_hash"], "f".repeat(64));

    // The link is part of the hashed content, so the block also fails its hash.
    let tampering = report.entries_of(FindingKind::DataTampering);
    assert_eq!(tampering.len(), 1);
    assert_eq!(tampering[0].block_index, Some(2));
}

#[tokio::test]
async fn test_edited_vote_row() {
    let (db, _coordinator, candidates) = voted_election().await;

    sqlx::query("UPDATE votes SET candidate_id = ? WHERE user_id = ?")
        .bind(candidates[2])
        .bind("bob")
        .execute(db.pool())
        .await
        .unwrap();

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Compromised);
    assert_eq!(report.report.len(), 1);

    let entry = &report.report[0];
    assert_eq!(entry.kind, FindingKind::InconsistentData);
    assert_eq!(entry.severity, Severity::High);
    assert_eq!(entry.block_index, Some(2));
    assert_eq!(entry.details["blockchain_choice"], candidates[1].to_string());
    assert_eq!(entry.details["database_choice"], candidates[2].to_string());
}

#[tokio::test]
async fn test_deleted_vote_row() {
    let (db, _coordinator, _) = voted_election().await;

    execute(&db, "DELETE FROM votes WHERE user_id = 'carol'").await;

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Compromised);
    assert_eq!(report.report.len(), 1);

    let entry = &report.report[0];
    assert_eq!(entry.kind, FindingKind::MissingData);
    assert_eq!(entry.severity, Severity::Warning);
    assert_eq!(entry.block_index, Some(3));
    assert_eq!(entry.details["voter_id"], "carol");
}

#[tokio::test]
async fn test_vote_row_without_block() {
    let (db, _coordinator, candidates) = voted_election().await;

    Queries::insert_vote(db.pool(), "mallory", candidates[0])
        .await
        .unwrap();

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Compromised);

    let orphans = report.entries_of(FindingKind::OrphanVote);
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].block_index, None);
    assert_eq!(orphans[0].details["voter_id"], "mallory");
}

#[tokio::test]
async fn test_textual_candidate_id_in_vote_row_matches() {
    let (db, _coordinator, candidates) = voted_election().await;

    // Written back as text; it still names the same candidate.
    sqlx::query("UPDATE votes SET candidate_id = ? WHERE user_id = 'alice'")
        .bind(candidates[0].to_string())
        .execute(db.pool())
        .await
        .unwrap();

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Secure);
}

#[tokio::test]
async fn test_compromised_report_serialization() {
    let (db, _coordinator, _) = voted_election().await;
    execute(&db, "DELETE FROM votes WHERE user_id = 'alice'").await;

    let report = Auditor::new(db).audit().await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["status"], "COMPROMISED");
    assert_eq!(value["total_errors"], 1);
    assert_eq!(value["report"][0]["kind"], "MISSING_DATA");
    assert_eq!(value["report"][0]["severity"], "WARNING");
    assert!(value.get("last_block_hash").is_none());
}

#[tokio::test]
async fn test_block_column_with_wrong_type() {
    let (db, _coordinator, _) = voted_election().await;

    execute(&db, "UPDATE blocks SET timestamp = 'yesterday' WHERE block_index = 2").await;

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Compromised);
    assert_eq!(report.report.len(), 1);

    let entry = &report.report[0];
    assert_eq!(entry.kind, FindingKind::DataTampering);
    assert_eq!(entry.severity, Severity::Critical);
    assert_eq!(entry.block_index, Some(2));
    assert_eq!(entry.details["unreadable_fields"], json!(["timestamp"]));
}

#[tokio::test]
async fn test_block_with_negative_index() {
    let (db, coordinator, _) = voted_election().await;
    let moved = coordinator.ledger().blocks().await.unwrap()[2].hash.clone();

    execute(&db, "UPDATE blocks SET block_index = -2 WHERE block_index = 2").await;

    let report = Auditor::new(db).audit().await.unwrap();
    assert_eq!(report.status, AuditStatus::Compromised);

    let tampering = report.entries_of(FindingKind::DataTampering);
    assert_eq!(tampering.len(), 1);
    assert_eq!(tampering[0].block_index, None);
    assert_eq!(tampering[0].details["stored_block_index"], "-2");
    assert_eq!(tampering[0].details["stored_hash"], moved);

    let broken = report.entries_of(FindingKind::BrokenChain);
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].block_index, Some(3));
}
